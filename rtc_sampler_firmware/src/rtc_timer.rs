use nrf52810_hal::{clocks, pac, rtc};

use rtc_sampler_common::{
    check_timeout_ticks, counter_add, next_deadline, TickConfig, TimerDriver, TimerError,
    TimerId, TimerMode, LFCLK_FREQ, MAX_PRESCALER,
};

use crate::config::RTC_PRESCALER;

type LfClocks = clocks::Clocks<clocks::Internal, clocks::ExternalOscillator, clocks::LfOscStarted>;

const RTC_TIMER: TimerId = TimerId(0);

/// Compare channel used for the timer, and the matching event / interrupt.
const COMPARE: rtc::RtcCompareReg = rtc::RtcCompareReg::Compare0;
const COMPARE_EVENT: rtc::RtcInterrupt = rtc::RtcInterrupt::Compare0;

/// The RTC cannot reliably trigger on a compare value less than this far ahead of COUNTER.
const MIN_COMPARE_LEAD: u32 = 2;

struct Slot {
    mode: TimerMode,
    armed: bool,
    ticks: u32,
    deadline: u32,
}

/// Timer driver on top of real-time counter 1 (RTC1) and the low-frequency clock.
///
/// The counter runs free from `init` onwards and is never cleared; the timer is a
/// compare channel that gets moved forward on every expiry.
pub struct RtcTimer {
    raw: Option<(pac::RTC1, pac::CLOCK)>,
    rtc: Option<rtc::Rtc<pac::RTC1>>,
    _clocks: Option<LfClocks>,
    slot: Option<Slot>,
}

impl RtcTimer {
    pub fn new(rtc1: pac::RTC1, clock: pac::CLOCK) -> Self {
        Self {
            raw: Some((rtc1, clock)),
            rtc: None,
            _clocks: None,
            slot: None,
        }
    }

    fn parts(&mut self, id: TimerId) -> Result<(&mut rtc::Rtc<pac::RTC1>, &mut Slot), TimerError> {
        if id != RTC_TIMER {
            return Err(TimerError::InvalidState);
        }
        match (self.rtc.as_mut(), self.slot.as_mut()) {
            (Some(rtc), Some(slot)) => Ok((rtc, slot)),
            _ => Err(TimerError::InvalidState),
        }
    }
}

impl TimerDriver for RtcTimer {
    /// Start LFCLK, then configure RTC1 with the prescaler from `config` and start counting.
    fn init(&mut self) -> Result<(), TimerError> {
        if RTC_PRESCALER > MAX_PRESCALER {
            return Err(TimerError::PrescalerOutOfRange(RTC_PRESCALER));
        }
        let (rtc1, clock) = self.raw.take().ok_or(TimerError::InvalidState)?;

        let clocks = setup_clocks(clock);
        let mut rtc1 = rtc::Rtc::new(rtc1, RTC_PRESCALER).map_err(|_| TimerError::InvalidParam)?;
        rtc1.enable_counter();

        self.rtc = Some(rtc1);
        self._clocks = Some(clocks);
        Ok(())
    }

    fn create(&mut self, mode: TimerMode) -> Result<TimerId, TimerError> {
        if self.rtc.is_none() {
            return Err(TimerError::InvalidState);
        }
        if self.slot.is_some() {
            return Err(TimerError::NoMem);
        }
        self.slot = Some(Slot {
            mode,
            armed: false,
            ticks: 0,
            deadline: 0,
        });
        Ok(RTC_TIMER)
    }

    fn start(&mut self, id: TimerId, ticks: u32) -> Result<(), TimerError> {
        let (rtc, slot) = self.parts(id)?;
        check_timeout_ticks(ticks)?;

        let deadline = counter_add(rtc.get_counter(), ticks);
        rtc.set_compare(COMPARE, deadline).map_err(|_| TimerError::InvalidParam)?;
        rtc.reset_event(COMPARE_EVENT);
        rtc.enable_event(COMPARE_EVENT);
        // RTIC unmasks RTC1 in the NVIC for the task bound to it
        rtc.enable_interrupt(COMPARE_EVENT, None);

        slot.armed = true;
        slot.ticks = ticks;
        slot.deadline = deadline;
        Ok(())
    }

    fn stop(&mut self, id: TimerId) -> Result<(), TimerError> {
        let (rtc, slot) = self.parts(id)?;
        rtc.disable_interrupt(COMPARE_EVENT, None);
        rtc.disable_event(COMPARE_EVENT);
        rtc.reset_event(COMPARE_EVENT);
        slot.armed = false;
        Ok(())
    }

    fn service(&mut self, id: TimerId) -> bool {
        let Ok((rtc, slot)) = self.parts(id) else {
            return false;
        };
        if !slot.armed || !rtc.is_event_triggered(COMPARE_EVENT) {
            return false;
        }
        rtc.reset_event(COMPARE_EVENT);

        match slot.mode {
            TimerMode::Repeated => {
                let now = rtc.get_counter();
                // Serviced so late that the next deadline already passed: restart from now
                let next = next_deadline(slot.deadline, slot.ticks, now, MIN_COMPARE_LEAD);
                // Compare value is masked to 24 bits, cannot be out of range
                let _ = rtc.set_compare(COMPARE, next);
                slot.deadline = next;
            }
            TimerMode::SingleShot => {
                rtc.disable_interrupt(COMPARE_EVENT, None);
                slot.armed = false;
            }
        }
        true
    }

    fn counter(&self) -> u32 {
        self.rtc.as_ref().map(|rtc| rtc.get_counter()).unwrap_or(0)
    }

    fn tick_config(&self) -> TickConfig {
        TickConfig::new(LFCLK_FREQ, RTC_PRESCALER)
    }
}

/// Start the low-frequency clock from the external 32.768kHz crystal. The RTC counts
/// nothing until LFCLK runs.
fn setup_clocks(clock: pac::CLOCK) -> LfClocks
{
    // NoExternalNoBypass does NOT mean "No external oscillator": It means no external signal
    // provided to the external oscillator. The crystal itself needs no external signal.
    clocks::Clocks::new(clock)
        .set_lfclk_src_external(clocks::LfOscConfiguration::NoExternalNoBypass)
        .start_lfclk()
}
