use calloop::channel::Sender;

/// One-shot delivery of a worker thread's result into the UI event loop.
///
/// Workers never touch overlay or catalog state; they hand a value to the loop
/// and the loop's callback applies it on the UI thread. Consuming `self` keeps
/// each handoff to a single message.
pub struct Handoff<T> {
    sender: Sender<T>,
}

impl<T> Handoff<T> {
    pub fn new(sender: Sender<T>) -> Self {
        Self { sender }
    }

    /// Returns `false` when the loop side is gone.
    pub fn deliver(self, value: T) -> bool {
        self.sender.send(value).is_ok()
    }
}
