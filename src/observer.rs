//! Observer hook that sees every chunk written to a pipe.
//!
//! The observer runs synchronously on the producer's thread, after the
//! bytes have been accepted by the pipe. It receives its own copy of the
//! bytes, so later changes to the writer's buffer are never visible to it.
//! A slow observer stalls the producer.

use std::sync::Arc;

use parking_lot::RwLock;

/// Callback receiving a copy of each chunk written to a pipe.
///
/// # Example
///
/// ```
/// use piped_buffer::{observer, BufferedPipe};
///
/// let pipe = BufferedPipe::new().unwrap();
/// pipe.set_observer(Some(observer(|chunk| {
///     println!("{} bytes buffered", chunk.len());
/// })));
/// ```
pub type Observer = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

/// Creates an [`Observer`] from a closure.
pub fn observer<F>(f: F) -> Observer
where
    F: Fn(Vec<u8>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Shared, replaceable reference to the current observer.
///
/// Clones share the same slot, so a handle taken before a pipe is split can
/// swap the observer while the producer keeps writing. Each notification
/// reads the slot once: a concurrent swap makes either the old or the new
/// observer fire for a given write, never both and never neither.
#[derive(Clone, Default)]
pub struct ObserverSlot {
    inner: Arc<RwLock<Option<Observer>>>,
}

impl ObserverSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the observer. `None` removes it.
    ///
    /// Affects writes that start notifying after this call returns.
    pub fn set(&self, observer: Option<Observer>) {
        *self.inner.write() = observer;
    }

    /// Returns the current observer, if any.
    pub fn get(&self) -> Option<Observer> {
        self.inner.read().clone()
    }

    /// Returns `true` if an observer is registered.
    pub fn is_set(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Hands a copy of `chunk` to the current observer.
    ///
    /// Returns `true` if an observer was invoked. Empty chunks are skipped.
    pub(crate) fn notify(&self, chunk: &[u8]) -> bool {
        if chunk.is_empty() {
            return false;
        }
        // Clone out of the lock so the callback can swap the slot itself.
        let Some(observer) = self.get() else {
            return false;
        };
        observer(chunk.to_vec());
        true
    }
}

impl std::fmt::Debug for ObserverSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSlot")
            .field("is_set", &self.is_set())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_notify_without_observer() {
        let slot = ObserverSlot::new();
        assert!(!slot.is_set());
        assert!(!slot.notify(&[1, 2, 3]));
    }

    #[test]
    fn test_notify_passes_copy() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();

        let slot = ObserverSlot::new();
        slot.set(Some(observer(move |chunk| {
            received_clone.lock().push(chunk);
        })));

        let mut source = vec![1u8, 2, 3];
        assert!(slot.notify(&source));
        source[0] = 99;

        assert_eq!(*received.lock(), vec![vec![1u8, 2, 3]]);
    }

    #[test]
    fn test_notify_skips_empty_chunk() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let slot = ObserverSlot::new();
        slot.set(Some(observer(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        })));

        assert!(!slot.notify(&[]));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_clones_share_slot() {
        let slot = ObserverSlot::new();
        let handle = slot.clone();

        handle.set(Some(observer(|_| {})));
        assert!(slot.is_set());

        handle.set(None);
        assert!(!slot.is_set());
    }

    #[test]
    fn test_observer_can_replace_itself() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let slot = ObserverSlot::new();
        let slot_clone = slot.clone();
        slot.set(Some(observer(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            slot_clone.set(None);
        })));

        assert!(slot.notify(&[1]));
        assert!(!slot.notify(&[2]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
