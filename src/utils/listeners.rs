//! Registry of event listeners.

use std::cell::RefCell;

use futures::{channel::mpsc, stream::LocalBoxStream};

/// Registry of listeners, each receiving every emitted event through its own
/// [`LocalBoxStream`].
#[derive(Debug)]
pub struct Listeners<T>(RefCell<Vec<mpsc::UnboundedSender<T>>>);

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self(RefCell::new(Vec::new()))
    }
}

impl<T> Listeners<T>
where
    T: Clone + 'static,
{
    /// Registers a new listener.
    ///
    /// Dropping the returned [`LocalBoxStream`] unregisters the listener.
    pub fn subscribe(&self) -> LocalBoxStream<'static, T> {
        let (tx, rx) = mpsc::unbounded();
        self.0.borrow_mut().push(tx);
        Box::pin(rx)
    }

    /// Delivers the provided `event` to all the registered listeners.
    pub fn emit(&self, event: T) {
        self.0
            .borrow_mut()
            .retain(|sub| sub.unbounded_send(event.clone()).is_ok());
    }

    /// Unregisters all the listeners, ending their streams.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Returns the number of listeners alive.
    pub fn count(&self) -> usize {
        let mut subs = self.0.borrow_mut();
        subs.retain(|sub| !sub.is_closed());
        subs.len()
    }
}
