//! MS-DOS date/time fields.
//!
//! Two 16-bit words in local time with two-second resolution:
//!
//! ```text
//! time: hour(5) minute(6) second/2(5)
//! date: year-1980(7) month(4) day(5)
//! ```
//!
//! Only years 1980..=2107 are representable. Exact times live in the
//! extended timestamp field; these words are kept for other tools.

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Timelike, Utc};

/// DOS encoding of 1980-01-01 00:00:00, used for unrepresentable times.
pub const DOS_EPOCH: (u16, u16) = (0, (1 << 5) | 1);

/// Encode a timestamp as `(dos_time, dos_date)`.
pub fn to_dos(ts: DateTime<Utc>) -> (u16, u16) {
    let local = ts.with_timezone(&Local);
    let year = local.year();
    if !(1980..=2107).contains(&year) {
        return DOS_EPOCH;
    }
    let time = (local.hour() << 11) | (local.minute() << 5) | (local.second() / 2);
    let date = (((year - 1980) as u32) << 9) | (local.month() << 5) | local.day();
    (time as u16, date as u16)
}

/// Decode `(dos_time, dos_date)`; `None` for the zero date or invalid fields.
pub fn from_dos(time: u16, date: u16) -> Option<DateTime<Utc>> {
    if date == 0 {
        return None;
    }
    let year = 1980 + i32::from(date >> 9);
    let month = u32::from((date >> 5) & 0x0f);
    let day = u32::from(date & 0x1f);
    let hour = u32::from(time >> 11);
    let minute = u32::from((time >> 5) & 0x3f);
    let second = u32::from(time & 0x1f) * 2;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
