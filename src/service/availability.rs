//! Free-slot computation over a fixed 09:00-17:00 UTC working day.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::models::calendar::BusySlot;

pub const WORKDAY_START_HOUR: u32 = 9;
pub const WORKDAY_END_HOUR: u32 = 17;

/// Working-hours window for `date`. Dates are read as UTC days.
pub fn working_window(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let at = |hour| {
        let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
        date.and_time(time).and_utc()
    };
    (at(WORKDAY_START_HOUR), at(WORKDAY_END_HOUR))
}

/// Gaps between `busy` intervals inside `[window_start, window_end)`.
/// `busy` must be ordered by start; the cursor never moves backwards, so
/// overlapping events cannot re-open time already covered.
pub fn free_slots(
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    busy: &[BusySlot],
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut slots = Vec::new();
    let mut cursor = window_start;
    for slot in busy {
        if cursor >= window_end {
            break;
        }
        let start = slot.start.min(window_end);
        if cursor < start {
            slots.push((cursor, start));
        }
        cursor = cursor.max(slot.end);
    }
    if cursor < window_end {
        slots.push((cursor, window_end));
    }
    slots
}

fn clock(at: DateTime<Utc>) -> String {
    at.format("%I:%M %p").to_string()
}

pub fn render_availability(date: NaiveDate, busy: &[BusySlot]) -> String {
    if busy.is_empty() {
        return format!("The entire day from 9 AM to 5 PM is free on {}.", date);
    }

    let (window_start, window_end) = working_window(date);
    let slots = free_slots(window_start, window_end, busy);
    if slots.is_empty() {
        return format!("No availability on {} between 9 AM and 5 PM.", date);
    }

    let listed: Vec<String> = slots
        .iter()
        .map(|(start, end)| format!("{} to {}", clock(*start), clock(*end)))
        .collect();
    format!("Available slots on {}: {}.", date, listed.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 18).unwrap()
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 18, hour, minute, 0).unwrap()
    }

    #[test]
    fn empty_day_short_circuits() {
        assert_eq!(
            render_availability(day(), &[]),
            "The entire day from 9 AM to 5 PM is free on 2024-07-18."
        );
    }

    #[test]
    fn fully_booked_day_is_explicit() {
        let busy = [BusySlot::new(at(9, 0), at(17, 0))];
        assert_eq!(
            render_availability(day(), &busy),
            "No availability on 2024-07-18 between 9 AM and 5 PM."
        );
    }

    #[test]
    fn gaps_around_meetings() {
        let busy = [
            BusySlot::new(at(10, 0), at(11, 0)),
            BusySlot::new(at(13, 30), at(14, 0)),
        ];
        assert_eq!(
            render_availability(day(), &busy),
            "Available slots on 2024-07-18: 09:00 AM to 10:00 AM, 11:00 AM to 01:30 PM, 02:00 PM to 05:00 PM."
        );
    }

    #[test]
    fn overlapping_events_do_not_reopen_time() {
        let busy = [
            BusySlot::new(at(9, 0), at(12, 0)),
            BusySlot::new(at(10, 0), at(11, 0)),
        ];
        let (start, end) = working_window(day());
        assert_eq!(free_slots(start, end, &busy), vec![(at(12, 0), at(17, 0))]);
    }

    #[test]
    fn events_outside_hours_are_clamped() {
        let busy = [
            BusySlot::new(at(7, 0), at(9, 30)),
            BusySlot::new(at(16, 0), at(19, 0)),
        ];
        let (start, end) = working_window(day());
        assert_eq!(free_slots(start, end, &busy), vec![(at(9, 30), at(16, 0))]);
    }

    #[test]
    fn all_day_event_leaves_nothing() {
        let midnight = at(0, 0);
        let busy = [BusySlot::new(midnight, midnight + chrono::Duration::days(1))];
        assert_eq!(
            render_availability(day(), &busy),
            "No availability on 2024-07-18 between 9 AM and 5 PM."
        );
    }

    #[test]
    fn back_to_back_events_leave_no_gap() {
        let busy = [
            BusySlot::new(at(9, 0), at(12, 0)),
            BusySlot::new(at(12, 0), at(17, 0)),
        ];
        let (start, end) = working_window(day());
        assert!(free_slots(start, end, &busy).is_empty());
    }
}
