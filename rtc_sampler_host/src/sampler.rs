use std::time::Duration;
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::{self, MissedTickBehavior};
use rtc_sampler_common::sim::SimRtc;
use rtc_sampler_common::{RepeatedTimer, Sample, TickConfig, TimerError};

/// Samples buffered between the timer and the logging task.
pub const SAMPLE_QUEUE_DEPTH: usize = 64;

#[derive(thiserror::Error, Debug)]
pub enum SamplerError {
    #[error("Timer driver failed: {} (status {})", .0, .0.code())]
    Timer(TimerError),
    #[error("Sample channel closed")]
    ChannelClosed,
    #[error("Logging task failed: {:?}", .0)]
    Logger(#[from] JoinError),
}

impl From<TimerError> for SamplerError {
    fn from(err: TimerError) -> Self {
        SamplerError::Timer(err)
    }
}

/// Run a repeated timer on a simulated RTC until `limit` samples are taken, or until
/// interrupted with Ctrl-C if there is no limit.
///
/// The simulated counter is advanced one timer period at a time, on a real-time interval of
/// the period the hardware would produce. Samples are logged by a separate task.
///
/// Returns the number of samples logged.
pub async fn run(config: TickConfig, period_us: u32, limit: Option<u32>) -> Result<u32, SamplerError> {
    let mut timer = RepeatedTimer::new(SimRtc::new().with_config(config))?;
    let ticks = timer.start(period_us)?;
    info!("Timer Started");

    let (sender, receiver) = mpsc::channel(SAMPLE_QUEUE_DEPTH);
    let logger = tokio::spawn(log_samples(receiver));

    let mut interval = time::interval(Duration::from_micros(config.ticks_to_us(ticks)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut taken: u32 = 0;
    while limit.map_or(true, |limit| taken < limit) {
        tokio::select! {
            _ = interval.tick() => {},
            _ = &mut ctrl_c => {
                warn!("Interrupted after {} samples", taken);
                break;
            }
        }

        for _ in 0..ticks {
            timer.driver_mut().tick();
            if let Some(sample) = timer.on_timeout() {
                sender.send(sample).await.or(Err(SamplerError::ChannelClosed))?;
                taken += 1;
            }
        }
    }

    timer.stop()?;
    debug!("Timer stopped in state {:?}", timer.state());

    // Closing the channel lets the logger drain and finish
    drop(sender);
    let logged = logger.await?;

    Ok(logged)
}

async fn log_samples(mut receiver: mpsc::Receiver<Sample>) -> u32 {
    let mut logged = 0;
    while let Some(sample) = receiver.recv().await {
        info!("The Counter Value is :- {}", sample.counter);
        debug!("{:?}", sample);
        logged += 1;
    }
    logged
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtc_sampler_common::{LFCLK_FREQ, SAMPLE_PERIOD_US};

    #[tokio::test]
    async fn takes_requested_samples() {
        let logged = run(TickConfig::RTC_DEFAULT, SAMPLE_PERIOD_US, Some(5)).await.unwrap();
        assert_eq!(logged, 5);
    }

    #[tokio::test]
    async fn long_run_keeps_sampling() {
        // One Ctrl-C listener for the whole run, polled on every beat
        let logged = run(TickConfig::RTC_DEFAULT, SAMPLE_PERIOD_US, Some(300)).await.unwrap();
        assert_eq!(logged, 300);
    }

    #[tokio::test]
    async fn zero_samples() {
        let logged = run(TickConfig::RTC_DEFAULT, SAMPLE_PERIOD_US, Some(0)).await.unwrap();
        assert_eq!(logged, 0);
    }

    #[tokio::test]
    async fn short_period_fails_before_sampling() {
        let err = run(TickConfig::RTC_DEFAULT, 100, Some(5)).await.unwrap_err();
        assert!(matches!(err, SamplerError::Timer(TimerError::TicksOutOfRange(3))));
    }

    #[tokio::test]
    async fn bad_prescaler_fails() {
        let config = TickConfig::new(LFCLK_FREQ, 0x1000);
        let err = run(config, SAMPLE_PERIOD_US, Some(5)).await.unwrap_err();
        assert!(matches!(err, SamplerError::Timer(TimerError::PrescalerOutOfRange(0x1000))));
    }
}
