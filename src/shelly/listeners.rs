use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};

type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Returned by [`Listeners::on`], needed to unregister the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

/// Set of callbacks for one kind of change event.
pub struct Listeners<T> {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerHandle, Listener<T>)>>,
}

impl<T: Copy> Listeners<T> {
    pub fn new() -> Self {
        Listeners {
            next_id: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn on(&self, listener: impl Fn(T) + Send + Sync + 'static) -> ListenerHandle {
        let handle = ListenerHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Listener<T> = Arc::new(listener);

        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((handle, listener));

        handle
    }

    /// Returns false if the handle was not registered.
    pub fn off(&self, handle: ListenerHandle) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(h, _)| *h != handle);

        listeners.len() != before
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn emit(&self, value: T) {
        // Listeners may register or unregister while being called
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in snapshot {
            listener(value);
        }
    }
}

impl<T: Copy> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}
