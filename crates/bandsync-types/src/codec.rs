//! Binary codec helpers for the band's wire format.
//!
//! The protocol packs multi-byte integers big-endian and transmits calendar
//! timestamps as five individual bytes with the year offset from a fixed
//! epoch. These helpers are pure functions shared by request assembly and
//! response parsing.

use time::{Date, Month, PrimitiveDateTime, Time};

use crate::error::{ParseError, ParseResult};

/// Year that a packed year byte of `0` corresponds to.
pub const YEAR_EPOCH: i32 = 2000;

/// Number of bytes in a packed date/time (year, month, day, hour, minute).
pub const PACKED_DATETIME_BYTES: usize = 5;

/// Decode a big-endian unsigned integer of arbitrary length.
///
/// Accumulates every byte in the buffer, so a single byte widens to its
/// unsigned value and an empty buffer decodes to `0`. Buffers longer than
/// four bytes keep the low 32 bits, matching the device SDK's accumulator.
///
/// # Examples
///
/// ```
/// use bandsync_types::codec::be_uint;
///
/// assert_eq!(be_uint(&[0x00, 0x03]), 3);
/// assert_eq!(be_uint(&[0x01, 0x00]), 256);
/// assert_eq!(be_uint(&[0xFF]), 255);
/// ```
#[must_use]
pub fn be_uint(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

/// Pack a date/time into the five-byte wire layout.
///
/// Layout: `[year - 2000, month (1-12), day, hour, minute]`. Seconds are not
/// transmitted. The caller guarantees the year falls in the representable
/// range (2000-2255); out-of-range years truncate like the device firmware.
#[must_use]
pub fn pack_datetime(dt: PrimitiveDateTime) -> [u8; PACKED_DATETIME_BYTES] {
    [
        (dt.year() - YEAR_EPOCH) as u8,
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
    ]
}

/// Unpack a five-byte wire date/time back into a [`PrimitiveDateTime`].
///
/// # Errors
///
/// Returns [`ParseError::InsufficientBytes`] if `data` contains fewer than
/// [`PACKED_DATETIME_BYTES`] bytes, or [`ParseError::InvalidValue`] if the
/// month, day, hour, or minute fields are out of calendar range.
pub fn unpack_datetime(data: &[u8]) -> ParseResult<PrimitiveDateTime> {
    if data.len() < PACKED_DATETIME_BYTES {
        return Err(ParseError::InsufficientBytes {
            expected: PACKED_DATETIME_BYTES,
            actual: data.len(),
        });
    }

    let month = Month::try_from(data[1])
        .map_err(|e| ParseError::InvalidValue(e.to_string()))?;
    let date = Date::from_calendar_date(YEAR_EPOCH + i32::from(data[0]), month, data[2])
        .map_err(|e| ParseError::InvalidValue(e.to_string()))?;
    let time = Time::from_hms(data[3], data[4], 0)
        .map_err(|e| ParseError::InvalidValue(e.to_string()))?;

    Ok(PrimitiveDateTime::new(date, time))
}
