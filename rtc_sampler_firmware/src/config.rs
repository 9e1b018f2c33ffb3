/// Timer configuration:
/// Base clock is low-frequency clock at 32,768Hz.
/// Prescaler is a 12-bit integer. Setting this greater than 2^12 - 1 will result in
/// an error on startup. At 0 the counter ticks every ~30.5us.
pub const RTC_PRESCALER: u32 = 0x000;

/// Period between counter samples, in microseconds. Rounded to 17 ticks (~519us)
/// with the prescaler above.
pub const SAMPLE_PERIOD_US: u32 = rtc_sampler_common::SAMPLE_PERIOD_US;

/// Samples buffered between the RTC1 interrupt and the logging task.
pub const SAMPLE_QUEUE_DEPTH: usize = 8;
