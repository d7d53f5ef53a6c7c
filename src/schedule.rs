//! Appointment slot arithmetic done on the client before anything is sent.

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::error::{ClientError, ClientResult};
use crate::models::{Appointment, NewAppointment, clock};

pub const DEFAULT_DURATION_MIN: u32 = 30;

/// Quick-pick durations offered when booking.
pub const DURATION_PRESETS_MIN: [u32; 6] = [15, 30, 45, 60, 90, 120];

/// Wall-clock end of a slot; wraps past midnight like a clock face.
pub fn end_time(start: NaiveTime, duration_min: u32) -> NaiveTime {
    let minutes = Duration::minutes(i64::from(duration_min));
    let (end, _wrapped_days) = start.overflowing_add_signed(minutes);
    end
}

/// `end_time` over `HH:MM` strings.
pub fn end_time_str(start: &str, duration_min: u32) -> ClientResult<String> {
    let start = parse_clock(start)?;
    Ok(end_time(start, duration_min).format(clock::FORMAT).to_string())
}

pub fn parse_clock(raw: &str) -> ClientResult<NaiveTime> {
    clock::parse(raw)
        .ok_or_else(|| ClientError::InvalidRequest(format!("time must be HH:MM, got {raw:?}")))
}

/// The server rejects slots that end at or before they start.
pub fn validate_slot(start: NaiveTime, end: NaiveTime) -> ClientResult<()> {
    if end <= start {
        return Err(ClientError::InvalidRequest(
            "time_end must be after time_start".into(),
        ));
    }
    Ok(())
}

/// Half-open overlap: back-to-back slots do not collide.
pub fn overlaps(a: (NaiveTime, NaiveTime), b: (NaiveTime, NaiveTime)) -> bool {
    a.0 < b.1 && a.1 > b.0
}

/// First appointment on `existing` that would clash with the proposed slot
/// for the same doctor and day. `exclude` skips the appointment being edited.
pub fn find_conflict<'a>(
    existing: &'a [Appointment],
    doctor: i64,
    date: NaiveDate,
    slot: (NaiveTime, NaiveTime),
    exclude: Option<i64>,
) -> Option<&'a Appointment> {
    existing.iter().find(|a| {
        a.doctor == doctor
            && a.date == date
            && Some(a.id) != exclude
            && overlaps((a.time_start, a.time_end), slot)
    })
}

impl NewAppointment {
    /// Booking draft whose end is `start + duration_min`.
    pub fn with_duration(
        patient: i64,
        doctor: i64,
        date: NaiveDate,
        time_start: NaiveTime,
        duration_min: u32,
    ) -> ClientResult<Self> {
        let time_end = end_time(time_start, duration_min);
        validate_slot(time_start, time_end)?;
        Ok(Self {
            patient,
            doctor,
            date,
            time_start,
            time_end,
            status: None,
            note: None,
        })
    }
}
