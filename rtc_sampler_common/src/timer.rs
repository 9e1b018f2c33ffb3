use crate::counter::counter_diff;
use crate::error::TimerError;
use crate::ticks::{check_timeout_ticks, TickConfig};

#[cfg(feature = "defmt")]
use defmt::Format;

#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimerMode {
    /// Expires once, then stays stopped.
    SingleShot,
    /// Re-arms itself after every expiry.
    Repeated,
}

/// Handle of a timer allocated by a [`TimerDriver`].
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimerId(pub u8);

/// A hardware timer service with room for one timer instance.
pub trait TimerDriver {
    /// Bring up the counter. Must be called exactly once, before anything else.
    fn init(&mut self) -> Result<(), TimerError>;

    /// Allocate the timer. Fails with `NoMem` if it has already been allocated.
    fn create(&mut self, mode: TimerMode) -> Result<TimerId, TimerError>;

    /// Arm the timer to expire `ticks` ticks from now, and every `ticks` after that in
    /// repeated mode.
    fn start(&mut self, id: TimerId, ticks: u32) -> Result<(), TimerError>;

    /// Disarm the timer, discarding any pending expiry.
    fn stop(&mut self, id: TimerId) -> Result<(), TimerError>;

    /// Acknowledge a pending expiry.
    ///
    /// Returns `true` if the timer had expired. In repeated mode the next deadline is
    /// scheduled relative to the one that just passed.
    fn service(&mut self, id: TimerId) -> bool;

    /// Current value of the free-running counter.
    fn counter(&self) -> u32;

    /// Clock the counter runs at.
    fn tick_config(&self) -> TickConfig;
}

#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimerState {
    /// Driver initialized, timer allocated, not yet started.
    Created,
    Running,
    Stopped,
}

/// One counter reading, taken on timer expiry.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Sample {
    pub counter: u32,
    /// Number of expiries before this one, wrapping.
    pub sequence: u32,
    /// Ticks since the previous sample, or since the timer was started for the first one.
    pub elapsed_ticks: u32,
}

/// State written by the expiry handler.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SampleContext {
    /// Last sampled counter value.
    pub counter_value: u32,
    /// Expiries handled since creation, wrapping.
    pub expirations: u32,
    /// Counter value the next sample's `elapsed_ticks` is measured from.
    reference: u32,
}

/// A repeated timer that samples the counter each time it expires.
pub struct RepeatedTimer<D: TimerDriver> {
    driver: D,
    id: TimerId,
    ticks: u32,
    state: TimerState,
    context: SampleContext,
}

impl<D: TimerDriver> RepeatedTimer<D> {
    /// Initialize `driver` and allocate a repeated timer on it.
    pub fn new(mut driver: D) -> Result<Self, TimerError> {
        driver.init()?;
        let id = driver.create(TimerMode::Repeated)?;
        debug!("Created repeated timer {}", id.0);

        Ok(Self {
            driver,
            id,
            ticks: 0,
            state: TimerState::Created,
            context: SampleContext::default(),
        })
    }

    /// Convert `period_us` into ticks and start the timer.
    ///
    /// Returns the tick count the timer was armed with. Starting a running timer re-arms
    /// it with the new period.
    pub fn start(&mut self, period_us: u32) -> Result<u32, TimerError> {
        let config = self.driver.tick_config();
        let ticks = config.timeout_ticks(period_us)?;
        self.start_ticks(ticks)?;

        info!(
            "Timer period {}us -> {} ticks ({}us actual)",
            period_us,
            ticks,
            config.ticks_to_us(ticks)
        );
        Ok(ticks)
    }

    /// Start the timer with a period already expressed in ticks.
    pub fn start_ticks(&mut self, ticks: u32) -> Result<(), TimerError> {
        check_timeout_ticks(ticks)?;
        self.driver.start(self.id, ticks)?;
        self.ticks = ticks;
        self.context.reference = self.driver.counter();
        self.state = TimerState::Running;
        Ok(())
    }

    /// Stop the timer. No further samples are produced until it is started again.
    pub fn stop(&mut self) -> Result<(), TimerError> {
        if self.state != TimerState::Running {
            return Ok(());
        }
        self.state = TimerState::Stopped;
        self.driver.stop(self.id)
    }

    /// Expiry handler, called from the timer interrupt.
    ///
    /// Reads the counter into the context and returns it as a [`Sample`]. Returns `None` if
    /// the timer is not running or has not actually expired.
    pub fn on_timeout(&mut self) -> Option<Sample> {
        if self.state != TimerState::Running || !self.driver.service(self.id) {
            return None;
        }

        let counter = self.driver.counter();
        let sample = Sample {
            counter,
            sequence: self.context.expirations,
            elapsed_ticks: counter_diff(counter, self.context.reference),
        };

        self.context.counter_value = counter;
        self.context.reference = counter;
        self.context.expirations = self.context.expirations.wrapping_add(1);
        trace!("The Counter Value is: {}", counter);

        Some(sample)
    }

    pub fn context(&self) -> &SampleContext {
        &self.context
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Ticks per period the timer was last started with, zero before the first start.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::MAX_COUNTER;
    use crate::sim::{Fault, SimRtc};

    const PERIOD_US: u32 = 509;

    fn running_timer() -> RepeatedTimer<SimRtc> {
        let mut timer = RepeatedTimer::new(SimRtc::new()).unwrap();
        assert_eq!(timer.start(PERIOD_US), Ok(17));
        timer
    }

    /// Advance the simulated counter one tick at a time, running the expiry handler after
    /// each tick the way the interrupt would.
    fn run(timer: &mut RepeatedTimer<SimRtc>, ticks: u32) -> Vec<Sample> {
        let mut samples = vec![];
        for _ in 0..ticks {
            timer.driver_mut().tick();
            if let Some(sample) = timer.on_timeout() {
                samples.push(sample);
            }
        }
        samples
    }

    #[test]
    fn one_invocation_per_period() {
        let mut timer = running_timer();
        assert_eq!(timer.state(), TimerState::Running);

        let periods = 100;
        let samples = run(&mut timer, 17 * periods);
        assert_eq!(samples.len(), periods as usize);
        assert_eq!(timer.context().expirations, periods);

        // Just short of the next expiry
        assert!(run(&mut timer, 16).is_empty());
        assert_eq!(run(&mut timer, 1).len(), 1);
    }

    #[test]
    fn samples_are_spaced_one_period_apart() {
        let mut timer = running_timer();
        let samples = run(&mut timer, 17 * 10);

        for (i, sample) in samples.iter().enumerate() {
            assert_eq!(sample.sequence, i as u32);
            assert_eq!(sample.elapsed_ticks, 17);
            assert_eq!(sample.counter, 17 * (i as u32 + 1));
        }
        assert_eq!(timer.context().counter_value, 170);
    }

    #[test]
    fn counter_is_monotonic_across_wrap() {
        let mut timer = RepeatedTimer::new(SimRtc::starting_at(MAX_COUNTER - 40)).unwrap();
        timer.start(PERIOD_US).unwrap();

        let samples = run(&mut timer, 17 * 8);
        assert_eq!(samples.len(), 8);

        let mut wrapped = false;
        let mut previous = MAX_COUNTER - 40;
        for sample in samples {
            assert_eq!(counter_diff(sample.counter, previous), 17);
            assert_eq!(sample.elapsed_ticks, 17);
            wrapped |= sample.counter < previous;
            previous = sample.counter;
        }
        assert!(wrapped);
    }

    #[test]
    fn stop_ends_invocations() {
        let mut timer = running_timer();
        assert_eq!(run(&mut timer, 17 * 3).len(), 3);

        timer.stop().unwrap();
        assert_eq!(timer.state(), TimerState::Stopped);
        assert!(run(&mut timer, 17 * 50).is_empty());
        assert_eq!(timer.context().expirations, 3);

        // Stopping twice is harmless
        timer.stop().unwrap();
    }

    #[test]
    fn stop_discards_pending_expiry() {
        let mut timer = running_timer();
        for _ in 0..17 {
            timer.driver_mut().tick();
        }
        timer.stop().unwrap();
        assert_eq!(timer.on_timeout(), None);
    }

    #[test]
    fn restart_after_stop() {
        let mut timer = running_timer();
        run(&mut timer, 17 * 2);
        timer.stop().unwrap();
        run(&mut timer, 5);

        timer.start(PERIOD_US).unwrap();
        let samples = run(&mut timer, 17 * 2);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].elapsed_ticks, 17);
        assert_eq!(samples[0].sequence, 2);
        assert_eq!(samples[0].counter, 17 * 2 + 5 + 17);
    }

    #[test]
    fn spurious_interrupt_yields_nothing() {
        let mut timer = RepeatedTimer::new(SimRtc::new()).unwrap();
        assert_eq!(timer.state(), TimerState::Created);
        assert_eq!(timer.on_timeout(), None);

        timer.start(PERIOD_US).unwrap();
        assert_eq!(timer.on_timeout(), None);
    }

    #[test]
    fn init_failure_is_reported() {
        let rtc = SimRtc::new().with_fault(Fault::Init);
        assert_eq!(RepeatedTimer::new(rtc).err(), Some(TimerError::InvalidState));
    }

    #[test]
    fn create_failure_is_reported() {
        let rtc = SimRtc::new().with_fault(Fault::Create);
        assert_eq!(RepeatedTimer::new(rtc).err(), Some(TimerError::NoMem));
    }

    #[test]
    fn start_failure_halts_sampling() {
        let mut timer = RepeatedTimer::new(SimRtc::new().with_fault(Fault::Start)).unwrap();
        assert_eq!(timer.start(PERIOD_US), Err(TimerError::InvalidParam));
        assert_eq!(timer.state(), TimerState::Created);
        assert!(run(&mut timer, 17 * 20).is_empty());
        assert_eq!(timer.context().expirations, 0);
    }

    #[test]
    fn unschedulable_period_is_rejected() {
        let mut timer = RepeatedTimer::new(SimRtc::new()).unwrap();
        assert_eq!(timer.start(100), Err(TimerError::TicksOutOfRange(3)));
        assert_eq!(timer.state(), TimerState::Created);
        assert!(run(&mut timer, 100).is_empty());
    }

    #[test]
    fn restart_while_running_changes_period() {
        let mut timer = running_timer();
        run(&mut timer, 17);
        assert_eq!(timer.start(1_000), Ok(33));
        assert_eq!(timer.ticks(), 33);

        let samples = run(&mut timer, 33 * 3);
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| s.elapsed_ticks == 33));
    }

    #[test]
    fn raw_ticks_below_minimum_are_rejected() {
        let mut timer = RepeatedTimer::new(SimRtc::new()).unwrap();
        assert_eq!(timer.start_ticks(0), Err(TimerError::InvalidParam));
        assert_eq!(timer.start_ticks(1), Err(TimerError::InvalidParam));
        assert_eq!(timer.start_ticks(MAX_COUNTER + 1), Err(TimerError::InvalidParam));
        assert_eq!(timer.state(), TimerState::Created);
        assert_eq!(timer.ticks(), 0);
        assert!(run(&mut timer, 100).is_empty());
    }

    #[test]
    fn sampling_resumes_after_late_service() {
        let mut timer = RepeatedTimer::new(SimRtc::new()).unwrap();
        timer.start_ticks(10).unwrap();

        // Interrupt held off past the second deadline
        for _ in 0..25 {
            timer.driver_mut().tick();
        }
        let late = timer.on_timeout().unwrap();
        assert_eq!(late.counter, 25);

        let samples = run(&mut timer, 1_000);
        assert_eq!(samples.len(), 100);
        assert!(samples.iter().all(|s| s.elapsed_ticks == 10));
    }
}
