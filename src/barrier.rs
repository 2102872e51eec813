//! The completion barrier the orchestrator waits on: initialized to the
//! member count, decremented exactly once per member as it shuts down,
//! and observed via a blocking wait once all members have been launched.

use std::sync::{Condvar, Mutex};

pub struct CompletionBarrier {
    remaining: Mutex<usize>,
    drained: Condvar,
}

impl CompletionBarrier {
    pub fn new(member_count: usize) -> Self {
        CompletionBarrier {
            remaining: Mutex::new(member_count),
            drained: Condvar::new(),
        }
    }

    /// Decrements the barrier by one. Called from a member's `shutdown()`;
    /// idempotence of the decrement itself is the caller's responsibility
    /// (each member must only ever call this once — see
    /// `CouncilMember::shutdown`).
    pub fn decrement(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        debug_assert!(*remaining > 0, "completion barrier decremented past zero");
        if *remaining > 0 {
            *remaining -= 1;
        }
        if *remaining == 0 {
            self.drained.notify_all();
        }
    }

    /// Blocks until every member has decremented the barrier.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        while *remaining > 0 {
            remaining = self.drained.wait(remaining).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_returns_once_every_member_decrements() {
        let barrier = Arc::new(CompletionBarrier::new(3));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let b = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                b.decrement();
            }));
        }

        barrier.wait();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn wait_returns_immediately_for_zero_members() {
        let barrier = CompletionBarrier::new(0);
        barrier.wait();
    }
}
