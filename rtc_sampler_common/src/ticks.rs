use crate::counter::MAX_COUNTER;
use crate::error::TimerError;

#[cfg(feature = "defmt")]
use defmt::Format;

/// Frequency of the low-frequency clock feeding the nRF RTC peripherals.
pub const LFCLK_FREQ: u32 = 32_768;

/// Largest value the 12-bit RTC prescaler register accepts.
pub const MAX_PRESCALER: u32 = 0x0FFF;

/// Shortest timeout the RTC can reliably schedule. Compare values closer than this to the
/// running counter may be missed.
pub const MIN_TIMEOUT_TICKS: u32 = 5;

const MICROS_PER_SECOND: u64 = 1_000_000;
const MILLIS_PER_SECOND: u64 = 1_000;

/// Integer division rounding to the nearest integer, halves rounding up.
///
/// Computed from the remainder instead of `(n + d / 2) / d`, so it is valid for all of `u64`.
/// Panics if `d` is zero.
pub const fn rounded_div(n: u64, d: u64) -> u64 {
    let q = n / d;
    let r = n % d;
    if r >= d - r {
        q + 1
    } else {
        q
    }
}

/// Check that a timeout of `ticks` can be scheduled on the RTC.
pub fn check_timeout_ticks(ticks: u32) -> Result<u32, TimerError> {
    if (MIN_TIMEOUT_TICKS..=MAX_COUNTER).contains(&ticks) {
        Ok(ticks)
    } else {
        Err(TimerError::InvalidParam)
    }
}

/// Clock feeding a counter: input frequency and the prescaler register value.
///
/// The counter increments at `clock_hz / (prescaler + 1)`.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TickConfig {
    pub clock_hz: u32,
    pub prescaler: u32,
}

impl TickConfig {
    /// RTC driven straight from LFCLK, one tick every ~30.5us.
    pub const RTC_DEFAULT: TickConfig = TickConfig::new(LFCLK_FREQ, 0);

    pub const fn new(clock_hz: u32, prescaler: u32) -> Self {
        Self { clock_hz, prescaler }
    }

    /// Effective counter frequency in Hz, rounded.
    pub const fn tick_hz(&self) -> u32 {
        rounded_div(self.clock_hz as u64, self.prescaler as u64 + 1) as u32
    }

    /// Ticks in `period_us` microseconds, rounded to nearest.
    ///
    /// The product is formed in 64 bits; any `u32` period times any `u32` clock fits.
    pub const fn us_to_ticks(&self, period_us: u32) -> u64 {
        rounded_div(
            period_us as u64 * self.clock_hz as u64,
            MICROS_PER_SECOND * (self.prescaler as u64 + 1),
        )
    }

    /// Ticks in `period_ms` milliseconds, rounded to nearest.
    pub const fn ms_to_ticks(&self, period_ms: u32) -> u64 {
        rounded_div(
            period_ms as u64 * self.clock_hz as u64,
            MILLIS_PER_SECOND * (self.prescaler as u64 + 1),
        )
    }

    /// Duration of `ticks` ticks in microseconds, rounded to nearest.
    ///
    /// This is the period the hardware actually produces for a converted timeout.
    pub const fn ticks_to_us(&self, ticks: u32) -> u64 {
        rounded_div(
            ticks as u64 * MICROS_PER_SECOND * (self.prescaler as u64 + 1),
            self.clock_hz as u64,
        )
    }

    /// Checked conversion of a period into a timeout the RTC can schedule.
    ///
    /// Fails if the prescaler does not fit the 12-bit register, or if the rounded tick count
    /// falls outside `MIN_TIMEOUT_TICKS..=MAX_COUNTER`. One timeout never spans more than a
    /// single wrap of the 24-bit counter.
    pub fn timeout_ticks(&self, period_us: u32) -> Result<u32, TimerError> {
        if self.prescaler > MAX_PRESCALER {
            return Err(TimerError::PrescalerOutOfRange(self.prescaler));
        }
        if self.clock_hz == 0 {
            return Err(TimerError::InvalidParam);
        }

        let ticks = self.us_to_ticks(period_us);
        if ticks < MIN_TIMEOUT_TICKS as u64 || ticks > MAX_COUNTER as u64 {
            return Err(TimerError::TicksOutOfRange(ticks));
        }

        Ok(ticks as u32)
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self::RTC_DEFAULT
    }
}
