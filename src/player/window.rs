//! Bounded FIFO windows shared between the game and network threads

use parking_lot::Mutex;
use std::collections::VecDeque;

/// A bounded, thread-safe FIFO window
///
/// Pushing past capacity evicts the oldest values first.
#[derive(Debug)]
pub struct RollingWindow<T> {
    values: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T: Copy> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        RollingWindow {
            values: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, value: T) {
        let mut values = self.values.lock();
        Self::push_bounded(&mut values, self.capacity, value);
    }

    pub fn extend<I: IntoIterator<Item = T>>(&self, iter: I) {
        let mut values = self.values.lock();
        for value in iter {
            Self::push_bounded(&mut values, self.capacity, value);
        }
    }

    /// Push and return the window contents as one atomic step
    pub fn push_and_snapshot(&self, value: T) -> Vec<T> {
        let mut values = self.values.lock();
        Self::push_bounded(&mut values, self.capacity, value);
        values.iter().copied().collect()
    }

    fn push_bounded(values: &mut VecDeque<T>, capacity: usize, value: T) {
        if capacity == 0 {
            return;
        }
        values.push_back(value);
        while values.len() > capacity {
            values.pop_front();
        }
    }

    /// Up to the last `n` values, oldest first
    pub fn latest(&self, n: usize) -> Vec<T> {
        let values = self.values.lock();
        let skip = values.len().saturating_sub(n);
        values.iter().skip(skip).copied().collect()
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.values.lock().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.values.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_latest_is_chronological() {
        let window = RollingWindow::new(10);
        for v in [1i64, 2, 3, 4] {
            window.push(v);
        }

        assert_eq!(window.latest(2), vec![3, 4]);
        assert_eq!(window.latest(10), vec![1, 2, 3, 4]);
        assert!(RollingWindow::<i64>::new(3).latest(2).is_empty());
    }

    #[test]
    fn test_evicts_oldest_first() {
        let window = RollingWindow::new(3);
        for v in 1..=5i64 {
            window.push(v);
            assert!(window.len() <= 3);
        }
        assert_eq!(window.snapshot(), vec![3, 4, 5]);

        window.extend([6, 7]);
        assert_eq!(window.snapshot(), vec![5, 6, 7]);
    }

    #[test]
    fn test_push_and_snapshot() {
        let window = RollingWindow::new(2);
        window.push(1.0);
        assert_eq!(window.push_and_snapshot(2.0), vec![1.0, 2.0]);
        assert_eq!(window.push_and_snapshot(3.0), vec![2.0, 3.0]);
    }

    #[test]
    fn test_concurrent_pushes_stay_bounded() {
        let window = Arc::new(RollingWindow::new(16));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let window = Arc::clone(&window);
                thread::spawn(move || {
                    for i in 0..500i64 {
                        window.push(t * 1000 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(window.len(), 16);
    }
}
