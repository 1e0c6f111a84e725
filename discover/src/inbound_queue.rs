//! A bounded single-consumer queue between the transport's message
//! callback (synchronous, called from an ephemeral per-datagram task)
//! and the dispatcher. Caps memory under a receive storm; once full,
//! the oldest queued datagram is dropped to make room for the newest
//! rather than applying backpressure to the transport.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

pub struct InboundQueue<T> {
    buffer: Mutex<VecDeque<T>>,
    notify: Notify,
    capacity: usize,
}

impl<T> InboundQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Pushes `item`, dropping the oldest queued item first if already
    /// at capacity. Returns `true` if a drop occurred.
    pub fn push(&self, item: T) -> bool {
        let mut buffer = self.buffer.lock().unwrap();
        let dropped = if buffer.len() >= self.capacity {
            buffer.pop_front();
            true
        } else {
            false
        };
        buffer.push_back(item);
        drop(buffer);
        self.notify.notify_one();
        dropped
    }

    /// Waits for and removes the oldest queued item. Cancel-safe: fine
    /// to use inside `tokio::select!`.
    pub async fn pop(&self) -> T {
        loop {
            if let Some(item) = self.buffer.lock().unwrap().pop_front() {
                return item;
            }
            self.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_beyond_capacity_drops_oldest() {
        let queue: InboundQueue<u32> = InboundQueue::new(2);
        assert!(!queue.push(1));
        assert!(!queue.push(2));
        assert!(queue.push(3)); // drops 1
        assert_eq!(queue.buffer.lock().unwrap().clone(), VecDeque::from([2, 3]));
    }

    #[tokio::test]
    async fn pop_returns_in_fifo_order() {
        let queue: InboundQueue<u32> = InboundQueue::new(4);
        queue.push(1);
        queue.push(2);
        assert_eq!(queue.pop().await, 1);
        assert_eq!(queue.pop().await, 2);
    }

    #[tokio::test]
    async fn pop_waits_for_a_push() {
        let queue = std::sync::Arc::new(InboundQueue::<u32>::new(4));
        let q = std::sync::Arc::clone(&queue);
        let handle = tokio::spawn(async move { q.pop().await });
        tokio::task::yield_now().await;
        queue.push(42);
        assert_eq!(handle.await.unwrap(), 42);
    }
}
