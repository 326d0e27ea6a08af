// Copyright (c) 2024 Mike Tsao

use crossbeam::channel::{Receiver, Sender};

/// A convenience struct to bundle both halves of a crossbeam channel together.
///
/// Owners that hand out receivers (the processing context, for example) keep
/// the sender half here so that both ends live exactly as long as the owner.
#[derive(Debug)]
pub struct CrossbeamChannel<T> {
    #[allow(missing_docs)]
    pub sender: Sender<T>,
    #[allow(missing_docs)]
    pub receiver: Receiver<T>,
}
impl<T> Default for CrossbeamChannel<T> {
    fn default() -> Self {
        let (sender, receiver) = crossbeam::channel::unbounded();
        Self { sender, receiver }
    }
}
impl<T> CrossbeamChannel<T> {
    /// A channel that holds at most `capacity` messages.
    pub fn new_bounded(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam::channel::bounded(capacity);
        Self { sender, receiver }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_channel_refuses_when_full() {
        let channel = CrossbeamChannel::<u8>::new_bounded(2);
        assert!(channel.sender.try_send(1).is_ok());
        assert!(channel.sender.try_send(2).is_ok());
        assert!(channel.sender.try_send(3).is_err());
        assert_eq!(channel.receiver.len(), 2);
    }
}
