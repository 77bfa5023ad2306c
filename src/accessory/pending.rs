use std::sync::{Mutex, PoisonError};

/// Value of a command that has been sent to the device but not yet seen
/// confirmed. `None` means nothing is in flight.
#[derive(Debug, Default)]
pub struct Pending<T>(Mutex<Option<T>>);

impl<T: Copy + PartialEq> Pending<T> {
    pub fn new() -> Self {
        Pending(Mutex::new(None))
    }

    pub fn get(&self) -> Option<T> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `value` as in flight, replacing any other pending value.
    /// Returns false, leaving the marker untouched, if `value` is already
    /// pending.
    pub fn try_set(&self, value: T) -> bool {
        let mut pending = self.0.lock().unwrap_or_else(PoisonError::into_inner);

        if *pending == Some(value) {
            false
        } else {
            *pending = Some(value);
            true
        }
    }

    /// Clears the marker only if it still holds `value`, so that the outcome
    /// of an older command never clears a newer one.
    pub fn clear_if(&self, value: T) -> bool {
        let mut pending = self.0.lock().unwrap_or_else(PoisonError::into_inner);

        if *pending == Some(value) {
            *pending = None;
            true
        } else {
            false
        }
    }

    pub fn clear(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let pending = Pending::<bool>::new();

        assert_eq!(pending.get(), None);
    }

    #[test]
    fn try_set_rejects_value_already_pending() {
        let pending = Pending::new();

        assert!(pending.try_set(true));
        assert!(!pending.try_set(true));
        assert_eq!(pending.get(), Some(true));
    }

    #[test]
    fn try_set_overwrites_other_value() {
        let pending = Pending::new();
        pending.try_set(true);

        assert!(pending.try_set(false));
        assert_eq!(pending.get(), Some(false));
    }

    #[test]
    fn clear_if_matches_only() {
        let pending = Pending::new();
        pending.try_set(40u8);

        assert!(!pending.clear_if(60));
        assert_eq!(pending.get(), Some(40));

        assert!(pending.clear_if(40));
        assert_eq!(pending.get(), None);
        assert!(!pending.clear_if(40));
    }

    #[test]
    fn clear_drops_any_value() {
        let pending = Pending::new();
        pending.try_set(80u8);
        pending.clear();

        assert_eq!(pending.get(), None);
        assert!(pending.try_set(80));
    }
}
