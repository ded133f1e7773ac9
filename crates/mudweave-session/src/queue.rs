//! Accumulate-and-drain text queues.
//!
//! A [`LineQueue`] carries text between threads without framing: writers
//! append, a reader takes everything written so far in one go. Consumers
//! that care about lines buffer partial lines themselves.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct QueueState {
    buf: String,
    closed: bool,
}

/// Thread-safe text buffer with blocking drain.
#[derive(Debug, Default)]
pub struct LineQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl LineQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append text and wake a blocked reader. Writes after
    /// [`LineQueue::close`] are dropped.
    pub fn write(&self, data: &str) {
        if data.is_empty() {
            return;
        }
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.buf.push_str(data);
        self.ready.notify_all();
    }

    /// Append text followed by a newline.
    pub fn writeln(&self, data: &str) {
        self.write(&format!("{data}\n"));
    }

    /// Take everything accumulated so far.
    ///
    /// With `blocking` the call waits until there is data or the queue is
    /// closed. Returns an empty string only when not blocking, or when the
    /// queue is closed and drained.
    pub fn read(&self, blocking: bool) -> String {
        let mut state = self.lock();
        while blocking && state.buf.is_empty() && !state.closed {
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        std::mem::take(&mut state.buf)
    }

    /// Like a blocking [`LineQueue::read`], giving up after `timeout`.
    pub fn read_timeout(&self, timeout: Duration) -> String {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while state.buf.is_empty() && !state.closed {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            state = self
                .ready
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        std::mem::take(&mut state.buf)
    }

    /// Whether unread text is waiting.
    pub fn has_data(&self) -> bool {
        !self.lock().buf.is_empty()
    }

    /// Close the queue and wake every blocked reader. Text already written
    /// can still be read.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    /// Whether [`LineQueue::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_read_drains_everything() {
        let queue = LineQueue::new();
        queue.write("look\n");
        queue.write("n");
        assert!(queue.has_data());
        assert_eq!(queue.read(false), "look\nn");
        assert!(!queue.has_data());
        assert_eq!(queue.read(false), "");
    }

    #[test]
    fn test_writeln() {
        let queue = LineQueue::new();
        queue.writeln("score");
        assert_eq!(queue.read(false), "score\n");
    }

    #[test]
    fn test_blocking_read_wakes_on_write() {
        let queue = Arc::new(LineQueue::new());
        let reader = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.read(true))
        };
        thread::sleep(Duration::from_millis(20));
        queue.write("hello");
        assert_eq!(reader.join().unwrap(), "hello");
    }

    #[test]
    fn test_close_unblocks_reader() {
        let queue = Arc::new(LineQueue::new());
        let reader = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.read(true))
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(reader.join().unwrap(), "");
        assert!(queue.is_closed());
        queue.write("late");
        assert!(!queue.has_data());
    }

    #[test]
    fn test_read_timeout() {
        let queue = LineQueue::new();
        assert_eq!(queue.read_timeout(Duration::from_millis(10)), "");
        queue.write("x");
        assert_eq!(queue.read_timeout(Duration::from_millis(10)), "x");
    }

    #[test]
    fn test_concurrent_writers() {
        let queue = Arc::new(LineQueue::new());
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for _ in 0..100 {
                        queue.write("a");
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }
        assert_eq!(queue.read(false).len(), 400);
    }
}
