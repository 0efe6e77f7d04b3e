use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the request queue is empty")]
pub struct EmptyQueue;

/// Ordered pending work. Processing order is enqueue order.
#[derive(Debug, Clone)]
pub struct RequestQueue<T> {
    items: VecDeque<T>,
}

impl<T> Default for RequestQueue<T> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }
}

impl<T: PartialEq> RequestQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Enqueues `item` unless an equal item is already waiting.
    /// Returns whether it was added.
    pub fn enqueue_unique(&mut self, item: T) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.enqueue(item);
        true
    }

    pub fn peek(&self) -> Result<&T, EmptyQueue> {
        self.items.front().ok_or(EmptyQueue)
    }

    pub fn dequeue(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: PartialEq> FromIterator<T> for RequestQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T: PartialEq> Extend<T> for RequestQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue: RequestQueue<&str> = ["Koi", "Rasputin"].into_iter().collect();
        queue.enqueue("Toxic");
        assert_eq!(queue.peek(), Ok(&"Koi"));
        assert_eq!(queue.dequeue(), Some("Koi"));
        assert_eq!(queue.dequeue(), Some("Rasputin"));
        assert_eq!(queue.count(), 1);
        assert_eq!(queue.dequeue(), Some("Toxic"));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_peek_empty_fails() {
        let queue: RequestQueue<String> = RequestQueue::new();
        assert_eq!(queue.peek(), Err(EmptyQueue));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_unique_skips_duplicates() {
        let mut queue = RequestQueue::new();
        assert!(queue.enqueue_unique("Koi".to_string()));
        assert!(!queue.enqueue_unique("Koi".to_string()));
        assert!(queue.contains(&"Koi".to_string()));
        assert_eq!(queue.count(), 1);
    }
}
