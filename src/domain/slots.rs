//! Free-slot derivation for a consultant's day: a weekly availability
//! template minus the intervals already claimed by bookings.
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

pub const SESSION_LENGTH_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Copy)]
pub struct BookedInterval {
    pub start: NaiveDateTime,
    pub duration_minutes: i32,
}

impl BookedInterval {
    fn end(&self) -> NaiveDateTime {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// Generate the ordered free slots for `date`. `windows` are the
/// availability ranges for that weekday (overlapping windows act as a
/// union); `bookings` are the intervals that already block time. Slots are
/// half-open: a slot ending exactly where a booking starts does not
/// conflict.
pub fn free_slots(
    date: NaiveDate,
    windows: &[(NaiveTime, NaiveTime)],
    bookings: &[BookedInterval],
    session_minutes: i64,
) -> Vec<Slot> {
    let session = Duration::minutes(session_minutes);
    let mut slots = Vec::new();

    for &(window_start, window_end) in windows {
        let window_end = date.and_time(window_end);
        let mut cursor = date.and_time(window_start);

        while cursor + session <= window_end {
            let slot_start = cursor;
            let slot_end = cursor + session;
            let conflict = bookings
                .iter()
                .any(|booked| slot_start < booked.end() && slot_end > booked.start);
            if !conflict {
                slots.push(Slot {
                    start_time: slot_start.time(),
                    end_time: slot_end.time(),
                });
            }
            cursor += session;
        }
    }

    slots.sort_by_key(|slot| slot.start_time);
    slots.dedup();
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        // A Monday.
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn booked(h: u32, m: u32, duration_minutes: i32) -> BookedInterval {
        BookedInterval {
            start: date().and_time(time(h, m)),
            duration_minutes,
        }
    }

    #[test]
    fn one_hour_window_yields_two_half_hour_slots() {
        let slots = free_slots(date(), &[(time(9, 0), time(10, 0))], &[], 30);
        assert_eq!(
            slots,
            vec![
                Slot { start_time: time(9, 0), end_time: time(9, 30) },
                Slot { start_time: time(9, 30), end_time: time(10, 0) },
            ]
        );
    }

    #[test]
    fn booking_removes_its_slot() {
        let windows = [(time(9, 0), time(10, 0))];
        let slots = free_slots(date(), &windows, &[booked(9, 30, 30)], 30);
        assert_eq!(
            slots,
            vec![Slot { start_time: time(9, 0), end_time: time(9, 30) }]
        );

        // Booking the remaining slot empties the window.
        let slots = free_slots(
            date(),
            &windows,
            &[booked(9, 30, 30), booked(9, 0, 30)],
            30,
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn long_booking_blocks_every_overlapped_slot() {
        let windows = [(time(9, 0), time(11, 0))];
        let slots = free_slots(date(), &windows, &[booked(9, 30, 60)], 30);
        assert_eq!(
            slots,
            vec![
                Slot { start_time: time(9, 0), end_time: time(9, 30) },
                Slot { start_time: time(10, 30), end_time: time(11, 0) },
            ]
        );
    }

    #[test]
    fn overlap_is_half_open() {
        // A booking starting exactly at a slot's end does not block it.
        let windows = [(time(9, 0), time(9, 30))];
        let slots = free_slots(date(), &windows, &[booked(9, 30, 30)], 30);
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn slot_spilling_past_window_end_is_dropped() {
        let windows = [(time(9, 0), time(9, 45))];
        let slots = free_slots(date(), &windows, &[], 30);
        assert_eq!(
            slots,
            vec![Slot { start_time: time(9, 0), end_time: time(9, 30) }]
        );
    }

    #[test]
    fn windows_merge_as_a_union() {
        let windows = [
            (time(14, 0), time(15, 0)),
            (time(9, 0), time(10, 0)),
            // Duplicate of part of the first window.
            (time(14, 0), time(14, 30)),
        ];
        let slots = free_slots(date(), &windows, &[], 30);
        let starts: Vec<NaiveTime> = slots.iter().map(|slot| slot.start_time).collect();
        assert_eq!(
            starts,
            vec![time(9, 0), time(9, 30), time(14, 0), time(14, 30)]
        );
    }

    #[test]
    fn empty_window_set_yields_no_slots() {
        assert!(free_slots(date(), &[], &[], 30).is_empty());
    }
}
