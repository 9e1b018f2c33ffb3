mod sampler;

use std::process::ExitCode;
use clap::Parser;
use log::{error, info};
use rtc_sampler_common::{TickConfig, LFCLK_FREQ, SAMPLE_PERIOD_US};

/// Samples a simulated RTC counter every period, the way the firmware samples RTC1.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Sampling period in microseconds
    #[arg(long, default_value_t = SAMPLE_PERIOD_US)]
    period_us: u32,

    /// Input clock of the counter in Hz
    #[arg(long, default_value_t = LFCLK_FREQ)]
    clock_hz: u32,

    /// Prescaler register value, the counter runs at clock_hz / (prescaler + 1)
    #[arg(long, default_value_t = 0)]
    prescaler: u32,

    /// Stop after this many samples. Runs until Ctrl-C if omitted.
    #[arg(long)]
    samples: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    pretty_env_logger::init();

    let args = Args::parse();
    let config = TickConfig::new(args.clock_hz, args.prescaler);

    match sampler::run(config, args.period_us, args.samples).await {
        Ok(logged) => {
            info!("Logged {} samples. Exiting gracefully.", logged);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
