#![no_main]
#![no_std]

mod config;
mod rtc_timer;

use rtic::app;
use cortex_m::asm;

use defmt_rtt as _;
use panic_probe as _;

use nrf52810_hal as hal;
use hal::pac;

#[app(device = pac, peripherals = true, dispatchers = [SWI3])]
mod app {
    use super::*;

    use defmt::{info, unwrap, warn};
    use rtic_sync::{channel::{Receiver, Sender}, make_channel};

    use rtc_sampler_common::{RepeatedTimer, Sample};

    use crate::config::{SAMPLE_PERIOD_US, SAMPLE_QUEUE_DEPTH};
    use crate::rtc_timer::RtcTimer;

    type SampleSender = Sender<'static, Sample, SAMPLE_QUEUE_DEPTH>;
    type SampleReceiver = Receiver<'static, Sample, SAMPLE_QUEUE_DEPTH>;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        timer: RepeatedTimer<RtcTimer>,
        samples: SampleSender,
        dropped: u32,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        let p = cx.device;

        // Any driver failure here is fatal, panic-probe reports it over RTT
        let mut timer = unwrap!(RepeatedTimer::new(RtcTimer::new(p.RTC1, p.CLOCK)));
        let ticks = unwrap!(timer.start(SAMPLE_PERIOD_US));

        let (sender, receiver) = make_channel!(Sample, SAMPLE_QUEUE_DEPTH);
        unwrap!(log_samples::spawn(receiver).ok());

        info!("Timer Started, sampling every {} ticks", ticks);

        (
            Shared {},
            Local {
                timer,
                samples: sender,
                dropped: 0,
            }
        )
    }

    #[idle]
    fn idle(_: idle::Context) -> ! {
        loop {
            asm::wfi();
        }
    }

    /// Fires on every RTC1 compare match. Samples the counter and hands it to the logger.
    #[task(binds = RTC1, priority = 2, local = [timer, samples, dropped])]
    fn timer_callback(cx: timer_callback::Context) {
        let timer: &mut RepeatedTimer<RtcTimer> = cx.local.timer;
        let Some(sample) = timer.on_timeout() else {
            return;
        };

        if cx.local.samples.try_send(sample).is_err() {
            let dropped: &mut u32 = cx.local.dropped;
            *dropped = dropped.wrapping_add(1);
            warn!("Sample queue full, {} samples dropped", *dropped);
        }
    }

    #[task(priority = 1)]
    async fn log_samples(_: log_samples::Context, mut samples: SampleReceiver) {
        while let Ok(sample) = samples.recv().await {
            info!("The Counter Value is :- {}", sample.counter);
        }
    }
}
