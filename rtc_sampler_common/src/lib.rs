#![cfg_attr(not(any(test, feature = "std")), no_std)]

// Must come first so the logging macros are visible to the other modules.
mod fmt;

pub mod counter;
pub mod error;
pub mod ticks;
pub mod timer;

#[cfg(any(test, feature = "std"))]
pub mod sim;

pub use counter::{counter_add, counter_diff, next_deadline, MAX_COUNTER};
pub use error::TimerError;
pub use ticks::{
    check_timeout_ticks, rounded_div, TickConfig, LFCLK_FREQ, MAX_PRESCALER, MIN_TIMEOUT_TICKS,
};
pub use timer::{RepeatedTimer, Sample, SampleContext, TimerDriver, TimerId, TimerMode, TimerState};

/// Sampling period of the counter.
pub const SAMPLE_PERIOD_US: u32 = 509;
