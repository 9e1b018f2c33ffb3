use thiserror_no_std::Error;

#[cfg(feature = "defmt")]
use defmt::Format;

/// Failure of a timer driver call.
///
/// Every variant maps onto the status code the vendor SDK returns for the same condition,
/// see [`TimerError::code`].
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("timer driver is in the wrong state for this call")]
    InvalidState,
    #[error("invalid parameter passed to the timer driver")]
    InvalidParam,
    #[error("no free timer slot")]
    NoMem,
    #[error("prescaler {0} does not fit the 12-bit register")]
    PrescalerOutOfRange(u32),
    #[error("timeout of {0} ticks is outside the counter range")]
    TicksOutOfRange(u64),
}

impl TimerError {
    pub const NRF_ERROR_NO_MEM: u32 = 4;
    pub const NRF_ERROR_INVALID_PARAM: u32 = 7;
    pub const NRF_ERROR_INVALID_STATE: u32 = 8;

    /// Non-zero status code, as reported by `APP_ERROR_CHECK` style handlers.
    pub fn code(&self) -> u32 {
        match self {
            TimerError::InvalidState => Self::NRF_ERROR_INVALID_STATE,
            TimerError::NoMem => Self::NRF_ERROR_NO_MEM,
            TimerError::InvalidParam
            | TimerError::PrescalerOutOfRange(_)
            | TimerError::TicksOutOfRange(_) => Self::NRF_ERROR_INVALID_PARAM,
        }
    }
}
