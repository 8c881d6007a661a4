use std::collections::VecDeque;
use std::time::Duration;

/// Opaque handle to one scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[cfg(test)]
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Deferred-callback capability. A scheduled timer later comes back to its
/// owner as the returned handle; cancelling an already fired or unknown
/// handle is a no-op.
pub trait Scheduler {
    fn schedule(&mut self, delay: Duration) -> TimerHandle;
    fn cancel(&mut self, handle: TimerHandle);
}

/// Pending timers of one session, oldest first.
#[derive(Debug)]
pub struct BoundedTimerQueue {
    handles: VecDeque<TimerHandle>,
    capacity: usize,
}

impl Default for BoundedTimerQueue {
    fn default() -> Self {
        Self::with_capacity(Self::CAPACITY)
    }
}

impl BoundedTimerQueue {
    pub const CAPACITY: usize = 10;

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            handles: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Append a handle. At capacity the oldest entry is evicted and returned
    /// so the caller can cancel it.
    pub fn enqueue(&mut self, handle: TimerHandle) -> Option<TimerHandle> {
        let evicted = if self.handles.len() >= self.capacity {
            self.handles.pop_front()
        } else {
            None
        };
        self.handles.push_back(handle);
        evicted
    }

    /// Forget a handle whose timer has fired. Returns whether it was held.
    pub fn release(&mut self, handle: TimerHandle) -> bool {
        match self.handles.iter().position(|h| *h == handle) {
            Some(idx) => {
                self.handles.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Cancel every held handle and empty the queue.
    pub fn drain_and_cancel(&mut self, scheduler: &mut impl Scheduler) -> usize {
        let count = self.handles.len();
        for handle in self.handles.drain(..) {
            scheduler.cancel(handle);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    #[cfg(test)]
    pub fn oldest(&self) -> Option<TimerHandle> {
        self.handles.front().copied()
    }

    #[cfg(test)]
    pub fn contains(&self, handle: TimerHandle) -> bool {
        self.handles.contains(&handle)
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::BTreeMap;

    use super::*;

    /// Virtual clock. Timers fire only when the test advances time.
    #[derive(Debug, Default)]
    pub struct ManualScheduler {
        now: u64,
        next_id: u64,
        pending: BTreeMap<TimerHandle, u64>,
        pub cancelled: Vec<TimerHandle>,
        pub delays: Vec<Duration>,
    }

    impl ManualScheduler {
        pub fn now(&self) -> u64 {
            self.now
        }

        pub fn pending(&self) -> usize {
            self.pending.len()
        }

        pub fn is_pending(&self, handle: TimerHandle) -> bool {
            self.pending.contains_key(&handle)
        }

        /// Pop the earliest due timer, advancing the clock to its deadline.
        pub fn fire_next(&mut self) -> Option<TimerHandle> {
            let (&handle, &due) = self
                .pending
                .iter()
                .min_by_key(|(handle, due)| (**due, handle.id()))?;
            self.pending.remove(&handle);
            self.now = self.now.max(due);
            Some(handle)
        }
    }

    impl Scheduler for ManualScheduler {
        fn schedule(&mut self, delay: Duration) -> TimerHandle {
            self.next_id += 1;
            let handle = TimerHandle::new(self.next_id);
            self.pending
                .insert(handle, self.now + delay.as_millis() as u64);
            self.delays.push(delay);
            handle
        }

        fn cancel(&mut self, handle: TimerHandle) {
            if self.pending.remove(&handle).is_some() {
                self.cancelled.push(handle);
            }
        }
    }
}
