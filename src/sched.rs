/*! Event scheduler.

The whole stack runs on one cooperative thread. Two primitives drive
it:

 - [TimerQueue], a monotonic min-heap of `(deadline, token)` entries.
   Arming an already-armed token replaces its deadline; cancelling is
   idempotent. Expired tokens are handed back to the caller in
   deadline order; the queue never invokes callbacks, so nothing can
   block inside it.
 - [Poller], a `poll(2)` wrapper over the daemon's file descriptors.
   Ready descriptors are reported in a fixed priority order, so e.g.
   the RCP bus is always drained before the management bus.

One dispatch step of the daemon: compute the sleep from
[TimerQueue::poll_at], block in [Poller::wait], fire every expired
timer, then service ready descriptors in priority order.
*/

#![allow(unsafe_code)]

use std::collections::BinaryHeap;
use std::vec::Vec;

use crate::time::Instant;

/// The daemon's readiness sources, in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PollSource {
    Rcp,
    Timer,
    Tun,
    Rpl,
    Dhcp,
    Mgmt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry<T> {
    deadline: Instant,
    seq: u64,
    token: T,
}

// BinaryHeap is a max-heap; reverse the ordering to pop the earliest
// deadline first. Ties break on arming order.
impl<T: Eq> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then(other.seq.cmp(&self.seq))
    }
}

impl<T: Eq> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A monotonic priority queue of timer deadlines.
///
/// Tokens identify timers; the queue stores no callbacks. Stale heap
/// entries left behind by a rearm or a cancel are skipped lazily when
/// they surface.
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    armed: Vec<(T, u64)>,
    next_seq: u64,
}

impl<T: Copy + Eq> TimerQueue<T> {
    pub fn new() -> TimerQueue<T> {
        TimerQueue {
            heap: BinaryHeap::new(),
            armed: Vec::new(),
            next_seq: 0,
        }
    }

    /// Arm `token` to fire at `deadline`. Re-arming an armed token
    /// replaces its deadline.
    pub fn arm(&mut self, token: T, deadline: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;

        match self.armed.iter_mut().find(|(t, _)| *t == token) {
            Some((_, armed_seq)) => *armed_seq = seq,
            None => self.armed.push((token, seq)),
        }
        self.heap.push(Entry {
            deadline,
            seq,
            token,
        });
    }

    /// Disarm `token`. Cancelling an idle token is a no-op.
    pub fn cancel(&mut self, token: T) {
        self.armed.retain(|(t, _)| *t != token);
    }

    /// Return whether `token` is currently armed.
    pub fn is_armed(&self, token: T) -> bool {
        self.armed.iter().any(|(t, _)| *t == token)
    }

    /// Return the earliest live deadline, if any.
    pub fn poll_at(&mut self) -> Option<Instant> {
        while let Some(entry) = self.heap.peek() {
            if self.is_live(entry) {
                return Some(entry.deadline);
            }
            self.heap.pop();
        }
        None
    }

    /// Pop the next timer with `deadline <= now`, in deadline order.
    /// The token is disarmed before it is returned.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        while let Some(entry) = self.heap.peek() {
            if entry.deadline > now {
                return None;
            }
            let entry = self.heap.pop().unwrap();
            if self.is_live(&entry) {
                self.armed.retain(|(t, _)| *t != entry.token);
                return Some(entry.token);
            }
        }
        None
    }

    fn is_live(&self, entry: &Entry<T>) -> bool {
        self.armed
            .iter()
            .any(|(t, seq)| *t == entry.token && *seq == entry.seq)
    }
}

impl<T: Copy + Eq> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A `poll(2)` wrapper reporting readiness in fixed priority order.
#[derive(Debug, Default)]
pub struct Poller {
    fds: Vec<(PollSource, i32)>,
}

impl Poller {
    pub fn new() -> Poller {
        Poller { fds: Vec::new() }
    }

    /// Register a file descriptor for a readiness source. A source
    /// registered twice keeps the last descriptor.
    pub fn register(&mut self, source: PollSource, fd: i32) {
        match self.fds.iter_mut().find(|(s, _)| *s == source) {
            Some((_, old_fd)) => *old_fd = fd,
            None => {
                self.fds.push((source, fd));
                self.fds.sort_by_key(|(s, _)| *s);
            }
        }
    }

    pub fn unregister(&mut self, source: PollSource) {
        self.fds.retain(|(s, _)| *s != source);
    }

    /// Block until a descriptor is readable or `timeout` elapses.
    /// `None` blocks indefinitely. Ready sources are returned in
    /// dispatch priority order.
    ///
    /// A descriptor in error state (`POLLERR`/`POLLHUP`) is reported
    /// as ready so its owner observes the failure on the next read.
    pub fn wait(&mut self, timeout: Option<crate::time::Duration>) -> std::io::Result<Vec<PollSource>> {
        let mut pollfds: Vec<libc::pollfd> = self
            .fds
            .iter()
            .map(|&(_, fd)| libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        let timeout_ms = match timeout {
            Some(t) => t.total_millis().min(i32::MAX as u64) as i32,
            None => -1,
        };

        let ret = unsafe {
            libc::poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, timeout_ms)
        };
        if ret < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(Vec::new());
            }
            return Err(err);
        }

        Ok(self
            .fds
            .iter()
            .zip(&pollfds)
            .filter(|(_, pfd)| pfd.revents & (libc::POLLIN | libc::POLLERR | libc::POLLHUP) != 0)
            .map(|(&(source, _), _)| source)
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Token {
        A,
        B,
        C,
    }

    #[test]
    fn fires_in_deadline_order() {
        let mut queue = TimerQueue::new();
        queue.arm(Token::B, Instant::from_millis(20));
        queue.arm(Token::A, Instant::from_millis(10));
        queue.arm(Token::C, Instant::from_millis(30));

        assert_eq!(queue.poll_at(), Some(Instant::from_millis(10)));

        let now = Instant::from_millis(25);
        assert_eq!(queue.poll(now), Some(Token::A));
        assert_eq!(queue.poll(now), Some(Token::B));
        assert_eq!(queue.poll(now), None);
        assert_eq!(queue.poll_at(), Some(Instant::from_millis(30)));
    }

    #[test]
    fn rearm_replaces_deadline() {
        let mut queue = TimerQueue::new();
        queue.arm(Token::A, Instant::from_millis(10));
        queue.arm(Token::A, Instant::from_millis(50));

        assert_eq!(queue.poll(Instant::from_millis(20)), None);
        assert_eq!(queue.poll(Instant::from_millis(50)), Some(Token::A));
        assert_eq!(queue.poll(Instant::from_millis(50)), None);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut queue = TimerQueue::new();
        queue.arm(Token::A, Instant::from_millis(10));
        queue.cancel(Token::A);
        queue.cancel(Token::A);
        assert!(!queue.is_armed(Token::A));
        assert_eq!(queue.poll(Instant::from_millis(100)), None);
        assert_eq!(queue.poll_at(), None);
    }

    #[test]
    fn fired_token_is_disarmed() {
        let mut queue = TimerQueue::new();
        queue.arm(Token::A, Instant::from_millis(10));
        assert_eq!(queue.poll(Instant::from_millis(10)), Some(Token::A));
        assert!(!queue.is_armed(Token::A));

        // rearming after expiry works
        queue.arm(Token::A, Instant::from_millis(20));
        assert!(queue.is_armed(Token::A));
    }

    #[test]
    fn poller_priority_order() {
        let mut poller = Poller::new();
        poller.register(PollSource::Mgmt, 100);
        poller.register(PollSource::Rcp, 101);
        poller.register(PollSource::Timer, 102);
        assert_eq!(
            poller.fds.iter().map(|(s, _)| *s).collect::<Vec<_>>(),
            vec![PollSource::Rcp, PollSource::Timer, PollSource::Mgmt]
        );
    }

    #[test]
    fn timeout_elapses() {
        let mut poller = Poller::new();
        let before = std::time::Instant::now();
        let ready = poller.wait(Some(Duration::from_millis(10))).unwrap();
        assert!(ready.is_empty());
        assert!(before.elapsed() >= std::time::Duration::from_millis(10));
    }
}
