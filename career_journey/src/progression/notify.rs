//! Listener registry shared by the observable stores.

/// Handle returned by `subscribe`, used to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

pub(crate) struct Listeners<F: ?Sized> {
    next_id: u64,
    entries: Vec<(Subscription, Box<F>)>,
}

impl<F: ?Sized> Default for Listeners<F> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<F: ?Sized> Listeners<F> {
    pub(crate) fn add(&mut self, listener: Box<F>) -> Subscription {
        let subscription = Subscription(self.next_id);
        self.next_id += 1;
        self.entries.push((subscription, listener));
        subscription
    }

    pub(crate) fn remove(&mut self, subscription: Subscription) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != subscription);
        self.entries.len() != before
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<F>> {
        self.entries.iter_mut().map(|(_, listener)| listener)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove() {
        let mut listeners: Listeners<dyn FnMut(bool)> = Listeners::default();
        let first = listeners.add(Box::new(|_| {}));
        let second = listeners.add(Box::new(|_| {}));
        assert_ne!(first, second);
        assert_eq!(listeners.len(), 2);

        assert!(listeners.remove(first));
        assert!(!listeners.remove(first));
        assert_eq!(listeners.len(), 1);
    }
}
