//! Playback scheduling for inbound model audio
//!
//! Inbound chunks arrive in variably-sized bursts, but output must be
//! gapless and strictly ordered. The scheduler keeps a monotonic
//! next-start cursor on the output clock: each buffer starts at
//! `max(now, next_start)` and the cursor advances by the buffer's duration.

/// A decoded audio segment ready for output.
#[derive(Debug, Clone)]
pub struct PlaybackBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PlaybackBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Assigns non-overlapping start times to decoded buffers.
#[derive(Debug)]
pub struct PlaybackScheduler {
    next_start: f64,
    scheduled_any: bool,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self {
            next_start: 0.0,
            scheduled_any: false,
        }
    }

    /// Schedule a buffer against the output clock, returning its start time.
    ///
    /// Start times are non-decreasing, never earlier than `now`, and never
    /// overlap the previously scheduled buffer.
    pub fn schedule(&mut self, buffer: &PlaybackBuffer, now: f64) -> f64 {
        let start = now.max(self.next_start);
        self.next_start = start + buffer.duration_secs();
        self.scheduled_any = true;
        start
    }

    /// Whether scheduled audio is still playing at `now`.
    ///
    /// Derived from the schedule, not the inbound stream, so it may lag the
    /// true end of remote speech by up to one buffer's duration.
    pub fn is_speaking(&self, now: f64) -> bool {
        self.scheduled_any && now < self.next_start
    }

    /// Output-clock time at which the current schedule drains.
    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    /// Forget all scheduled audio (session teardown).
    pub fn reset(&mut self) {
        self.next_start = 0.0;
        self.scheduled_any = false;
    }
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half_second() -> PlaybackBuffer {
        PlaybackBuffer::new(vec![0.0; 12000], 24000)
    }

    #[test]
    fn back_to_back_chunks_schedule_without_gaps() {
        let mut sched = PlaybackScheduler::new();
        let b = half_second();

        let s1 = sched.schedule(&b, 1.0);
        let s2 = sched.schedule(&b, 1.0);
        let s3 = sched.schedule(&b, 1.0);

        assert_eq!(s1, 1.0);
        assert_eq!(s2, s1 + 0.5);
        assert_eq!(s3, s2 + 0.5);
    }

    #[test]
    fn never_schedules_into_the_past() {
        let mut sched = PlaybackScheduler::new();
        let b = half_second();

        sched.schedule(&b, 0.0);
        // Clock has moved well past the drained schedule
        let start = sched.schedule(&b, 10.0);
        assert_eq!(start, 10.0);
    }

    #[test]
    fn start_times_are_non_decreasing_for_arbitrary_arrivals() {
        let mut sched = PlaybackScheduler::new();
        let arrivals = [0.0, 0.1, 0.9, 0.95, 3.0, 3.01];
        let durations = [0.5, 0.2, 0.7, 0.1, 0.3, 0.4];

        let mut prev_start = f64::NEG_INFINITY;
        let mut prev_end = 0.0;
        for (&now, &dur) in arrivals.iter().zip(durations.iter()) {
            let buf = PlaybackBuffer::new(vec![0.0; (dur * 24000.0) as usize], 24000);
            let start = sched.schedule(&buf, now);
            assert!(start >= prev_start);
            assert!(start >= prev_end - 1e-9, "buffers must not overlap");
            assert!(start >= now, "must not schedule into the past");
            prev_start = start;
            prev_end = start + buf.duration_secs();
        }
    }

    #[test]
    fn speaking_is_derived_from_the_schedule() {
        let mut sched = PlaybackScheduler::new();
        assert!(!sched.is_speaking(0.0));

        sched.schedule(&half_second(), 1.0);
        assert!(sched.is_speaking(1.2));
        assert!(!sched.is_speaking(1.5));
        assert!(!sched.is_speaking(2.0));
    }
}
