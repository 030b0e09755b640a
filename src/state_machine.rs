//! The deterministic command applier: a pluggable trait boundary plus the
//! one concrete implementation (a FIFO queue) this crate ships and tests
//! against.

use crate::log::Command;

/// Result of applying a single command to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    /// `enqueue` always succeeds with no payload.
    Enqueued,
    /// `dequeue` succeeded, yielding the message that was at the head.
    Dequeued(String),
    /// `dequeue` was applied against an empty queue. This is a benign
    /// sentinel, not an error: the log entry still commits and is applied
    /// exactly once.
    DequeueEmpty,
}

/// A deterministic applier: given a committed command, updates state and
/// returns a result. Implementations must be deterministic so that every
/// node which applies the same prefix of commands reaches the same state.
pub trait StateMachine: Send {
    fn apply(&mut self, command: &Command) -> ApplyResult;
}

/// The default state machine: a FIFO string queue.
#[derive(Debug, Default)]
pub struct FifoQueue {
    queue: std::collections::VecDeque<String>,
}

impl FifoQueue {
    pub fn new() -> Self {
        FifoQueue { queue: std::collections::VecDeque::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

impl StateMachine for FifoQueue {
    fn apply(&mut self, command: &Command) -> ApplyResult {
        match command {
            Command::Enqueue(message) => {
                self.queue.push_back(message.clone());
                ApplyResult::Enqueued
            }
            Command::Dequeue => match self.queue.pop_front() {
                Some(message) => ApplyResult::Dequeued(message),
                None => ApplyResult::DequeueEmpty,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_then_dequeue_is_fifo() {
        let mut q = FifoQueue::new();
        assert_eq!(q.apply(&Command::Enqueue("a".into())), ApplyResult::Enqueued);
        assert_eq!(q.apply(&Command::Enqueue("b".into())), ApplyResult::Enqueued);
        assert_eq!(q.apply(&Command::Dequeue), ApplyResult::Dequeued("a".into()));
        assert_eq!(q.apply(&Command::Dequeue), ApplyResult::Dequeued("b".into()));
    }

    #[test]
    fn dequeue_from_empty_is_benign() {
        let mut q = FifoQueue::new();
        assert_eq!(q.apply(&Command::Dequeue), ApplyResult::DequeueEmpty);
    }
}
