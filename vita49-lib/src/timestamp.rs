//! Conversion of packet header timestamps to SigMF datetime strings.
use chrono::{DateTime, Local};
use hifitime::{Duration, Epoch};
use tracing::warn;

use crate::packet::{Header, Tsf, Tsi};

/// Picoseconds per nanosecond.
const PS_PER_NS: u64 = 1_000;

/// Derive a capture datetime from a context packet header.
///
/// UTC timestamps are rendered in local time without an offset as
/// `YYYY-MM-DDTHH:MM:SS`, followed by `.` and the unpadded picosecond count if the
/// fractional timestamp is real-time, so 5 ps reads as `.5`. GPS timestamps, including any real-time
/// fraction, are converted to UTC and rendered as `YYYY-MM-DDTHH:MM:SS.mmm`.
///
/// Returns `None` if the header has no integer timestamp or its epoch is not
/// UTC or GPS.
#[must_use]
pub fn capture_datetime(header: &Header) -> Option<String> {
    let secs = header.integer_timestamp?;
    let picos = match header.tsf {
        Tsf::RealTime => header.fractional_timestamp,
        _ => None,
    };
    match header.tsi {
        Tsi::Utc => utc(secs, picos),
        Tsi::Gps => Some(gps(secs, picos)),
        Tsi::None | Tsi::Other => None,
    }
}

fn utc(secs: u32, picos: Option<u64>) -> Option<String> {
    let Some(dt) = DateTime::from_timestamp(i64::from(secs), 0) else {
        warn!(secs, "UTC timestamp out of range");
        return None;
    };
    let mut s = dt
        .with_timezone(&Local)
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string();
    if let Some(picos) = picos {
        s.push_str(&format!(".{picos}"));
    }
    Some(s)
}

fn gps(secs: u32, picos: Option<u64>) -> String {
    let nanos = picos.unwrap_or_default() / PS_PER_NS;
    let dur = Duration::compose(0, 0, 0, 0, u64::from(secs), 0, 0, nanos);
    let (y, m, d, hh, mm, ss, ns) = Epoch::from_gpst_duration(dur).to_gregorian_utc();
    format!(
        "{y:04}-{m:02}-{d:02}T{hh:02}:{mm:02}:{ss:02}.{:03}",
        ns / 1_000_000
    )
}
