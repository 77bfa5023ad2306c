use tokio::sync::watch;

/// A single bridge-visible value. Updates are pushed to every subscriber.
pub struct Characteristic<T> {
    pub name: &'static str,
    value: watch::Sender<T>,
}

impl<T: Clone> Characteristic<T> {
    pub fn new(name: &'static str, initial: T) -> Self {
        let (value, _) = watch::channel(initial);
        Characteristic { name, value }
    }

    pub fn value(&self) -> T {
        self.value.borrow().clone()
    }

    /// Notifies subscribers even when the value did not change.
    pub fn update_value(&self, value: T) {
        self.value.send_replace(value);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.value.subscribe()
    }
}

/// A dimmable light service: power plus brightness level (0-100).
pub struct LightbulbService {
    pub name: String,
    pub subtype: String,
    pub on: Characteristic<bool>,
    pub brightness: Characteristic<u8>,
}

impl LightbulbService {
    pub fn new(name: String, subtype: String) -> Self {
        LightbulbService {
            name,
            subtype,
            on: Characteristic::new("On", false),
            brightness: Characteristic::new("Brightness", 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repeated_values_still_notify() {
        let characteristic = Characteristic::new("On", false);
        let mut rx = characteristic.subscribe();

        characteristic.update_value(false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());

        characteristic.update_value(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
        assert!(characteristic.value());
    }

    #[test]
    fn updates_without_subscribers() {
        let characteristic = Characteristic::new("Brightness", 0u8);

        characteristic.update_value(80);

        assert_eq!(characteristic.value(), 80);
    }
}
