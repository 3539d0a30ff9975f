use std::collections::VecDeque;

use parking_lot::Mutex;

/// Closed, pre-sized buffer of work items for one collection run.
///
/// Items are supplied once at construction; there is no way to push more.
/// Taking never blocks: an empty queue is the signal for a worker to retire.
#[derive(Debug)]
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> WorkQueue<T> {
    pub fn new(items: Vec<T>) -> Self {
        let capacity = items.len();
        Self {
            items: Mutex::new(VecDeque::from(items)),
            capacity,
        }
    }

    /// Remove the next item, or `None` once the queue has been drained.
    pub fn take(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Iterator that keeps taking until the queue is empty.
    pub fn drain(&self) -> Drain<'_, T> {
        Drain { queue: self }
    }

    /// Number of items the queue was filled with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

pub struct Drain<'a, T> {
    queue: &'a WorkQueue<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.take()
    }
}
