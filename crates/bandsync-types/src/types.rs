//! Core types for reconstructed band sleep data.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use time::{Date, Month};

use crate::error::{ParseError, ParseResult};

/// Minimum number of bytes in a sleep index chunk.
///
/// Layout from offset 1 (offset 0 is the response header):
/// `year - 2000`, `month (1-12)`, `day`, then three big-endian `u16` minute
/// totals: deep, light, awake.
pub const MIN_SLEEP_INDEX_BYTES: usize = 10;

/// Minimum number of bytes in a sleep detail chunk.
///
/// Byte 0 is the response header, byte 1 the per-day index; any remaining
/// bytes are one stage sample per minute.
pub const MIN_SLEEP_DETAIL_BYTES: usize = 2;

/// One minute of recorded sleep, as reported by the band.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new stages in
/// future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
#[repr(u8)]
pub enum SleepStage {
    /// Awake or restless.
    Awake = 0,
    /// Light sleep.
    Light = 1,
    /// Deep sleep.
    Deep = 2,
}

impl TryFrom<u8> for SleepStage {
    type Error = ParseError;

    /// Convert a wire sample byte to a `SleepStage`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bandsync_types::SleepStage;
    ///
    /// assert_eq!(SleepStage::try_from(0), Ok(SleepStage::Awake));
    /// assert_eq!(SleepStage::try_from(2), Ok(SleepStage::Deep));
    /// assert!(SleepStage::try_from(7).is_err());
    /// ```
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SleepStage::Awake),
            1 => Ok(SleepStage::Light),
            2 => Ok(SleepStage::Deep),
            _ => Err(ParseError::InvalidValue(format!(
                "unknown sleep stage: 0x{value:02X}"
            ))),
        }
    }
}

impl fmt::Display for SleepStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SleepStage::Awake => write!(f, "Awake"),
            SleepStage::Light => write!(f, "Light"),
            SleepStage::Deep => write!(f, "Deep"),
        }
    }
}

/// One calendar day's sleep summary plus its minute-level detail.
///
/// The summary fields are populated by the index phase of a sync; the
/// [`stages`](Self::stages) vector is filled in by the record phase. An entry
/// is only surfaced to callers once both phases have completed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DailySleep {
    /// Day the sleep was recorded (the entry's day key).
    pub date: Date,
    /// Minutes of deep sleep.
    pub deep_minutes: u16,
    /// Minutes of light sleep.
    pub light_minutes: u16,
    /// Minutes awake during the sleep window.
    pub awake_minutes: u16,
    /// Minute-level stage samples, in recorded order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub stages: Vec<SleepStage>,
}

impl DailySleep {
    /// Parse a `DailySleep` summary from a sleep index chunk.
    ///
    /// `data` is the full chunk including the header byte; fields are read
    /// from the fixed offsets documented on [`MIN_SLEEP_INDEX_BYTES`]. The
    /// caller is responsible for header validation.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InsufficientBytes`] for a short buffer, or
    /// [`ParseError::InvalidValue`] if the date fields are out of calendar
    /// range.
    #[must_use = "parsing returns a Result that should be handled"]
    pub fn parse_index(data: &[u8]) -> ParseResult<Self> {
        use bytes::Buf;

        if data.len() < MIN_SLEEP_INDEX_BYTES {
            return Err(ParseError::InsufficientBytes {
                expected: MIN_SLEEP_INDEX_BYTES,
                actual: data.len(),
            });
        }

        let month = Month::try_from(data[2])
            .map_err(|e| ParseError::InvalidValue(e.to_string()))?;
        let date = Date::from_calendar_date(
            crate::codec::YEAR_EPOCH + i32::from(data[1]),
            month,
            data[3],
        )
        .map_err(|e| ParseError::InvalidValue(e.to_string()))?;

        let mut buf = &data[4..];
        let deep_minutes = buf.get_u16();
        let light_minutes = buf.get_u16();
        let awake_minutes = buf.get_u16();

        Ok(DailySleep {
            date,
            deep_minutes,
            light_minutes,
            awake_minutes,
            stages: Vec::new(),
        })
    }

    /// Merge minute-level samples from a sleep detail chunk into this entry.
    ///
    /// Samples append in arrival order. Bytes that do not decode to a
    /// [`SleepStage`] are skipped; the link can carry noise and a bad sample
    /// must not discard the rest of the chunk.
    pub fn merge_detail(&mut self, samples: &[u8]) {
        self.stages
            .extend(samples.iter().filter_map(|&b| SleepStage::try_from(b).ok()));
    }

    /// Total minutes across the summary fields.
    #[must_use]
    pub fn total_minutes(&self) -> u32 {
        u32::from(self.deep_minutes) + u32::from(self.light_minutes) + u32::from(self.awake_minutes)
    }
}
