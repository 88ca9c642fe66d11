//! `${json:timestamp}` in its formatted and epoch forms.
//!
//! | Key | Output |
//! |-----|--------|
//! | none | the instant formatted with the configured pattern and zone |
//! | `epoch` | nanoseconds since the epoch, integer |
//! | `epoch:divisor=1e9` | seconds, float (`,integral` for an integer) |
//! | `epoch:divisor=1e6` | milliseconds, float (`,integral` for an integer) |
//! | `epoch:divisor=D` | nanoseconds divided by `D` (`,integral` truncates) |

use std::str::FromStr;
use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, Utc};
use jsonlayout_writer::JsonWriter;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{RenderError, TemplateError};

const NAME: &str = "timestamp";

static EPOCH_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^epoch(:divisor=([^,]+)(,integral)?)?$").expect("epoch key pattern is valid")
});

/// The zone formatted timestamps are rendered in.
///
/// Parsed from `UTC` (also `Z` or `GMT`), `local`, or a fixed offset such as
/// `+05:30`.
///
/// ```rust
/// use jsonlayout::TimeZoneSpec;
///
/// assert_eq!("UTC".parse::<TimeZoneSpec>().unwrap(), TimeZoneSpec::Utc);
/// assert!(matches!("-03:00".parse::<TimeZoneSpec>(), Ok(TimeZoneSpec::Fixed(_))));
/// assert!("Mars/Olympus".parse::<TimeZoneSpec>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeZoneSpec {
    Utc,
    Local,
    Fixed(FixedOffset),
}

impl FromStr for TimeZoneSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UTC" | "utc" | "Z" | "GMT" => Ok(TimeZoneSpec::Utc),
            "local" | "Local" => Ok(TimeZoneSpec::Local),
            offset => offset
                .parse::<FixedOffset>()
                .map(TimeZoneSpec::Fixed)
                .map_err(|_| format!("unknown time zone {:?}", offset)),
        }
    }
}

/// A validated strftime pattern bound to a zone.
#[derive(Debug, Clone)]
pub(crate) struct TimestampFormat {
    pattern: String,
    zone: TimeZoneSpec,
}

impl TimestampFormat {
    pub(crate) fn new(pattern: &str, zone: TimeZoneSpec) -> Result<Self, String> {
        if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
            return Err(format!("invalid timestamp pattern {:?}", pattern));
        }
        let format = Self {
            pattern: pattern.to_string(),
            zone,
        };
        // some specifiers only fail once they meet a value
        let mut probe = String::new();
        format
            .write(&Utc::now(), &mut probe)
            .map_err(|_| format!("timestamp pattern {:?} cannot be formatted", pattern))?;
        Ok(format)
    }

    pub(crate) fn write(
        &self,
        instant: &DateTime<Utc>,
        out: &mut dyn std::fmt::Write,
    ) -> std::fmt::Result {
        match self.zone {
            TimeZoneSpec::Utc => write!(out, "{}", instant.format(&self.pattern)),
            TimeZoneSpec::Local => write!(
                out,
                "{}",
                instant.with_timezone(&Local).format(&self.pattern)
            ),
            TimeZoneSpec::Fixed(offset) => write!(
                out,
                "{}",
                instant.with_timezone(&offset).format(&self.pattern)
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum TimestampResolver {
    Formatted(Arc<TimestampFormat>),
    EpochNanos,
    EpochSeconds { integral: bool },
    EpochMillis { integral: bool },
    EpochDivided { divisor: f64, integral: bool },
}

impl TimestampResolver {
    pub(crate) fn create(
        format: &Arc<TimestampFormat>,
        key: Option<&str>,
    ) -> Result<Self, TemplateError> {
        let key = match key {
            None | Some("") => return Ok(TimestampResolver::Formatted(Arc::clone(format))),
            Some(key) => key,
        };
        let captures = EPOCH_KEY.captures(key).ok_or_else(|| TemplateError::UnknownKey {
            resolver: NAME,
            key: key.to_string(),
        })?;

        let Some(divisor_text) = captures.get(2) else {
            return Ok(TimestampResolver::EpochNanos);
        };
        let invalid = |reason: &str| TemplateError::InvalidKey {
            resolver: NAME,
            key: key.to_string(),
            reason: reason.to_string(),
        };
        let divisor: f64 = divisor_text
            .as_str()
            .parse()
            .map_err(|_| invalid("divisor is not a number"))?;
        if divisor == 0.0 || !divisor.is_finite() {
            return Err(invalid("divisor must be a non-zero finite number"));
        }
        let integral = captures.get(3).is_some();

        Ok(if divisor == 1e9 {
            TimestampResolver::EpochSeconds { integral }
        } else if divisor == 1e6 {
            TimestampResolver::EpochMillis { integral }
        } else if divisor == 1.0 {
            TimestampResolver::EpochNanos
        } else {
            TimestampResolver::EpochDivided { divisor, integral }
        })
    }

    pub(crate) fn resolve(
        &self,
        instant: &DateTime<Utc>,
        writer: &mut JsonWriter,
    ) -> Result<(), RenderError> {
        let seconds = instant.timestamp();
        let nanos = instant.timestamp_subsec_nanos();
        match self {
            TimestampResolver::Formatted(format) => {
                writer.write_string_with(|out| format.write(instant, out))?
            }
            TimestampResolver::EpochNanos => match seconds
                .checked_mul(1_000_000_000)
                .and_then(|n| n.checked_add(i64::from(nanos)))
            {
                Some(epoch_nanos) => writer.write_i64(epoch_nanos)?,
                None => writer.write_f64(seconds as f64 * 1e9 + f64::from(nanos))?,
            },
            TimestampResolver::EpochSeconds { integral: true } => writer.write_i64(seconds)?,
            TimestampResolver::EpochSeconds { integral: false } => {
                writer.write_f64(seconds as f64 + f64::from(nanos) / 1e9)?
            }
            TimestampResolver::EpochMillis { integral: true } => {
                writer.write_i64(instant.timestamp_millis())?
            }
            TimestampResolver::EpochMillis { integral: false } => {
                let millis = instant.timestamp_millis();
                let nanos_of_milli = nanos % 1_000_000;
                writer.write_f64(millis as f64 + f64::from(nanos_of_milli) / 1e6)?
            }
            TimestampResolver::EpochDivided { divisor, integral } => {
                // 1e9 * (s / d) + n / d keeps more precision than (s * 1e9 + n) / d
                let quotient = 1e9 * (seconds as f64 / divisor) + f64::from(nanos) / divisor;
                if *integral {
                    writer.write_i64(quotient as i64)?
                } else {
                    writer.write_f64(quotient)?
                }
            }
        }
        Ok(())
    }
}
