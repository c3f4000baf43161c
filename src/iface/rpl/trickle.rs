//! Implementation of the Trickle timer defined in [RFC 6206], used to
//! pace DIO transmissions. The DODAG configuration option carries the
//! parameters: `Imin = 2^dio_interval_min` ms, `Imax = Imin <<
//! dio_interval_doublings`, and the redundancy constant `k`.
//!
//! Unlike the RFC, the first interval is started at `Imin` instead of
//! a random value in [Imin, Imax]: a freshly (re)attached node should
//! advertise quickly, and this only affects the start of an interval
//! series.
//!
//! [RFC 6206]: https://datatracker.ietf.org/doc/html/rfc6206

use crate::rand::Rand;
use crate::time::{Duration, Instant};

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct TrickleTimer {
    i_min: u32,
    i_max: u32,
    k: usize,

    i: Duration,
    t: Duration,
    t_exp: Instant,
    i_exp: Instant,
    counter: usize,
}

impl TrickleTimer {
    /// Create a new Trickle timer. `i_min` and `i_max` are exponents
    /// of a millisecond count, `i_max` counted up from `i_min` as in
    /// the DODAG configuration option.
    pub(crate) fn new(i_min: u32, i_max: u32, k: usize, now: Instant, rand: &mut Rand) -> Self {
        let mut timer = Self {
            i_min,
            i_max,
            k,
            i: Duration::ZERO,
            t: Duration::ZERO,
            t_exp: Instant::ZERO,
            i_exp: Instant::ZERO,
            counter: 0,
        };

        timer.i = Duration::from_millis(2u64.pow(timer.i_min));
        timer.i_exp = now + timer.i;
        timer.counter = 0;

        timer.set_t(now, rand);

        timer
    }

    /// Poll the Trickle timer. Returns `true` when a message can be
    /// transmitted, which happens when `t` expires.
    pub(crate) fn poll(&mut self, now: Instant, rand: &mut Rand) -> bool {
        let can_transmit = self.can_transmit() && self.t_expired(now);

        if can_transmit {
            self.set_t(now, rand);
        }

        if self.i_expired(now) {
            self.expire(now, rand);
        }

        can_transmit
    }

    /// Returns the Instant at which the Trickle timer should be polled
    /// again. Polling earlier is harmless, polling later is not
    /// correct.
    pub(crate) fn poll_at(&self) -> Instant {
        self.t_exp.min(self.i_exp)
    }

    /// Signal the Trickle timer that a consistency has been heard,
    /// increasing its counter.
    pub(crate) fn hear_consistent(&mut self) {
        self.counter += 1;
    }

    /// Signal the Trickle timer that an inconsistency has been heard.
    /// This resets the timer when the current interval is not already
    /// the smallest possible.
    pub(crate) fn hear_inconsistency(&mut self, now: Instant, rand: &mut Rand) {
        let i = Duration::from_millis(2u64.pow(self.i_min));
        if self.i > i {
            self.reset(i, now, rand);
        }
    }

    /// Check if the Trickle timer can transmit. Returns `false` when
    /// the consistency counter reached the redundancy constant. A
    /// redundancy constant of 0 disables suppression (Wi-SUN FAN).
    pub(crate) fn can_transmit(&self) -> bool {
        self.k == 0 || self.counter < self.k
    }

    /// Double the interval when it expired.
    fn expire(&mut self, now: Instant, rand: &mut Rand) {
        let max_interval = Duration::from_millis(2u64.pow(self.i_max));
        let i = if self.i >= max_interval {
            max_interval
        } else {
            self.i + self.i
        };

        self.reset(i, now, rand);
    }

    pub(crate) fn reset(&mut self, i: Duration, now: Instant, rand: &mut Rand) {
        self.i = i;
        self.i_exp = now + self.i;
        self.counter = 0;
        self.set_t(now, rand);
    }

    pub(crate) fn max_expiration(&self) -> Duration {
        Duration::from_millis(2u64.pow(self.i_max))
    }

    pub(crate) fn min_expiration(&self) -> Duration {
        Duration::from_millis(2u64.pow(self.i_min))
    }

    /// Draw `t` uniformly from [I/2, I).
    fn set_t(&mut self, now: Instant, rand: &mut Rand) {
        let half = self.i.total_micros() / 2;
        let t = Duration::from_micros(rand.rand_range(half, self.i.total_micros() - 1));

        self.t = t;
        self.t_exp = now + t;
    }

    fn t_expired(&self, now: Instant) -> bool {
        now >= self.t_exp
    }

    fn i_expired(&self, now: Instant) -> bool {
        now >= self.i_exp
    }

    #[cfg(test)]
    pub(crate) fn set_counter(&mut self, value: usize) {
        self.counter = value;
    }

    #[cfg(test)]
    pub(crate) fn interval(&self) -> Duration {
        self.i
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(k: usize) -> (TrickleTimer, Rand) {
        let mut rand = Rand::new(1234);
        let timer = TrickleTimer::new(6, 6 + 4, k, Instant::ZERO, &mut rand);
        (timer, rand)
    }

    #[test]
    fn intervals_double_up_to_max() {
        let (mut trickle, mut rand) = timer(0);
        let mut now = Instant::ZERO;
        let mut previous_i = trickle.interval();

        while now <= Instant::from_secs(100) {
            trickle.poll(now, &mut rand);

            if now < Instant::ZERO + trickle.max_expiration() {
                // t is always in [I/2, I).
                assert!(trickle.i / 2 <= trickle.t);
                assert!(trickle.t < trickle.i);
            }

            if previous_i != trickle.interval() {
                // A new interval is double the previous one.
                assert_eq!(previous_i * 2, trickle.interval());
                assert_eq!(trickle.counter, 0);
                previous_i = trickle.interval();
            }

            now += Duration::from_millis(1);
        }

        assert_eq!(trickle.interval(), trickle.max_expiration());
    }

    #[test]
    fn inconsistency_resets_to_min() {
        let (mut trickle, mut rand) = timer(0);
        let mut now = Instant::ZERO;

        // run past a few doublings
        while now <= Instant::from_secs(10) {
            trickle.poll(now, &mut rand);
            now += Duration::from_millis(1);
        }
        assert!(trickle.interval() > trickle.min_expiration());

        trickle.set_counter(3);
        trickle.hear_inconsistency(now, &mut rand);
        assert_eq!(trickle.interval(), trickle.min_expiration());
        assert_eq!(trickle.counter, 0);
    }

    #[test]
    fn redundancy_suppresses_transmission() {
        let (mut trickle, mut rand) = timer(1);
        let mut now = Instant::ZERO;
        let mut transmissions = 0;

        while now <= Instant::from_secs(100) {
            trickle.hear_consistent();
            if trickle.poll(now, &mut rand) {
                transmissions += 1;
            }
            now += Duration::from_millis(1);
        }

        // the counter always reaches k before t fires
        assert_eq!(transmissions, 0);
    }

    #[test]
    fn zero_redundancy_never_suppresses() {
        let (mut trickle, mut rand) = timer(0);
        let mut now = Instant::ZERO;
        let mut transmissions = 0;

        while now <= Instant::from_secs(100) {
            trickle.hear_consistent();
            if trickle.poll(now, &mut rand) {
                transmissions += 1;
            }
            now += Duration::from_millis(1);
        }

        assert!(transmissions > 0);
    }
}
