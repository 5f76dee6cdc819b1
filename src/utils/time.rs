use crate::error::{NodeError, Result};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Current UTC time truncated to whole seconds.
///
/// Block timestamps carry second resolution: the canonical textual form used
/// for hashing and on the wire has no sub-second component, so anything finer
/// would be lost on the first round trip.
pub fn now_secs() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_opt(now.timestamp(), 0)
        .single()
        .expect("current time should always be representable")
}

/// Canonical textual form of a block timestamp (RFC 3339, seconds precision,
/// `Z` suffix). This exact string enters the hash preimage and the wire
/// format, so every node must produce it identically.
pub fn format_rfc3339(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a wire timestamp back into UTC.
pub fn parse_rfc3339(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NodeError::Serialization(format!("Invalid timestamp {text:?}: {e}")))
}
