//! Simulated RTC for host builds and tests.
//!
//! Behaves like RTC1 with a single compare channel: a 24-bit counter advanced by hand with
//! [`SimRtc::tick`], and a compare event that stays pending until serviced.

use crate::counter::{counter_add, next_deadline, MAX_COUNTER};
use crate::error::TimerError;
use crate::ticks::{check_timeout_ticks, TickConfig};
use crate::timer::{TimerDriver, TimerId, TimerMode};

const SIM_TIMER: TimerId = TimerId(0);

/// Driver call to fail on purpose.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Fault {
    /// `init` fails with `InvalidState`.
    Init,
    /// `create` fails with `NoMem`.
    Create,
    /// `start` fails with `InvalidParam`.
    Start,
}

#[derive(Debug, Copy, Clone)]
struct Slot {
    mode: TimerMode,
    armed: bool,
    ticks: u32,
    deadline: u32,
    pending: bool,
}

#[derive(Debug, Clone)]
pub struct SimRtc {
    config: TickConfig,
    counter: u32,
    initialized: bool,
    slot: Option<Slot>,
    fault: Option<Fault>,
}

impl SimRtc {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Simulated RTC whose counter starts at `counter`, useful to exercise wraparound.
    pub fn starting_at(counter: u32) -> Self {
        Self {
            config: TickConfig::RTC_DEFAULT,
            counter: counter & MAX_COUNTER,
            initialized: false,
            slot: None,
            fault: None,
        }
    }

    pub fn with_config(mut self, config: TickConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Advance the counter by one tick, raising the compare event if a deadline is reached.
    pub fn tick(&mut self) {
        self.counter = counter_add(self.counter, 1);
        if let Some(slot) = self.slot.as_mut() {
            if slot.armed && slot.deadline == self.counter {
                slot.pending = true;
            }
        }
    }

    /// Whether an expiry is waiting to be serviced, i.e. the interrupt line is raised.
    pub fn is_pending(&self) -> bool {
        self.slot.map(|slot| slot.pending).unwrap_or(false)
    }

    pub fn is_armed(&self) -> bool {
        self.slot.map(|slot| slot.armed).unwrap_or(false)
    }

    fn check_fault(&self, fault: Fault, err: TimerError) -> Result<(), TimerError> {
        if self.fault == Some(fault) {
            Err(err)
        } else {
            Ok(())
        }
    }

    fn slot_mut(&mut self, id: TimerId) -> Result<&mut Slot, TimerError> {
        if id != SIM_TIMER {
            return Err(TimerError::InvalidState);
        }
        self.slot.as_mut().ok_or(TimerError::InvalidState)
    }
}

impl Default for SimRtc {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDriver for SimRtc {
    fn init(&mut self) -> Result<(), TimerError> {
        self.check_fault(Fault::Init, TimerError::InvalidState)?;
        if self.initialized {
            return Err(TimerError::InvalidState);
        }
        self.initialized = true;
        Ok(())
    }

    fn create(&mut self, mode: TimerMode) -> Result<TimerId, TimerError> {
        self.check_fault(Fault::Create, TimerError::NoMem)?;
        if !self.initialized {
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
            pending: false,
        });
        Ok(SIM_TIMER)
    }

    fn start(&mut self, id: TimerId, ticks: u32) -> Result<(), TimerError> {
        self.check_fault(Fault::Start, TimerError::InvalidParam)?;
        check_timeout_ticks(ticks)?;
        let counter = self.counter;
        let slot = self.slot_mut(id)?;
        slot.armed = true;
        slot.pending = false;
        slot.ticks = ticks;
        slot.deadline = counter_add(counter, ticks);
        Ok(())
    }

    fn stop(&mut self, id: TimerId) -> Result<(), TimerError> {
        let slot = self.slot_mut(id)?;
        slot.armed = false;
        slot.pending = false;
        Ok(())
    }

    fn service(&mut self, id: TimerId) -> bool {
        let now = self.counter;
        let Ok(slot) = self.slot_mut(id) else {
            return false;
        };
        if !slot.pending {
            return false;
        }

        slot.pending = false;
        match slot.mode {
            TimerMode::Repeated => {
                // The compare only matches on the exact tick, a deadline at `now` is missed
                slot.deadline = next_deadline(slot.deadline, slot.ticks, now, 1);
            }
            TimerMode::SingleShot => slot.armed = false,
        }
        true
    }

    fn counter(&self) -> u32 {
        self.counter
    }

    fn tick_config(&self) -> TickConfig {
        self.config
    }
}
