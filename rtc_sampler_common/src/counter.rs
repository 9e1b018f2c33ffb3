//! Arithmetic on the free-running 24-bit RTC counter.

/// Highest value of the RTC COUNTER register. The counter wraps to zero after this.
pub const MAX_COUNTER: u32 = 0x00FF_FFFF;

/// Forward distance from `then` to `now`, accounting for one wrap of the counter.
pub const fn counter_diff(now: u32, then: u32) -> u32 {
    now.wrapping_sub(then) & MAX_COUNTER
}

/// Counter value `ticks` ticks after `counter`.
pub const fn counter_add(counter: u32, ticks: u32) -> u32 {
    counter.wrapping_add(ticks) & MAX_COUNTER
}

/// Deadline following `deadline` for a timer repeating every `ticks` ticks.
///
/// Normally `deadline + ticks`. If that is already behind `now`, or closer than `min_lead`
/// ticks ahead of it, the compare would not fire until the counter wraps, so the next
/// period is counted from `now` instead.
pub const fn next_deadline(deadline: u32, ticks: u32, now: u32, min_lead: u32) -> u32 {
    let next = counter_add(deadline, ticks);
    let lead = counter_diff(next, now);
    if lead < min_lead || lead > ticks {
        counter_add(now, ticks)
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_without_wrap() {
        assert_eq!(counter_diff(17, 0), 17);
        assert_eq!(counter_diff(1_000, 983), 17);
        assert_eq!(counter_diff(42, 42), 0);
    }

    #[test]
    fn diff_across_wrap() {
        assert_eq!(counter_diff(0, MAX_COUNTER), 1);
        assert_eq!(counter_diff(10, MAX_COUNTER - 6), 17);
    }

    #[test]
    fn add_wraps() {
        assert_eq!(counter_add(MAX_COUNTER, 1), 0);
        assert_eq!(counter_add(MAX_COUNTER - 6, 17), 10);
        assert_eq!(counter_add(100, 17), 117);
        assert_eq!(counter_diff(counter_add(MAX_COUNTER - 3, 17), MAX_COUNTER - 3), 17);
    }

    #[test]
    fn next_deadline_keeps_phase() {
        // Serviced 3 ticks late, next deadline still one period after the previous one
        assert_eq!(next_deadline(10, 10, 13, 1), 20);
        assert_eq!(next_deadline(MAX_COUNTER - 4, 10, MAX_COUNTER - 1, 1), 5);
    }

    #[test]
    fn next_deadline_after_missed_period() {
        // The deadline at 20 already passed at 25, restart from now
        assert_eq!(next_deadline(10, 10, 25, 1), 35);
        // Exactly at the next deadline, which will not match again until the wrap
        assert_eq!(next_deadline(10, 10, 20, 1), 30);
        // Too close for the hardware to catch
        assert_eq!(next_deadline(10, 10, 19, 2), 29);
        assert_eq!(next_deadline(10, 10, 18, 2), 20);
    }
}
