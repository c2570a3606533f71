//! Timestamp Codec - `YYYY-MM-DD at HH:MM (ABBR)`
//!
//! Store files stamp entries with a local wall-clock time followed by a
//! parenthesised timezone abbreviation. Only abbreviations present in the
//! injected [`ZoneTable`] are accepted, and only their offsets can be
//! formatted back.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone, Timelike, Utc};
use std::cmp::Ordering;

use crate::error::{Result, StoreError};

/// chrono format for the date-time portion (everything before the zone).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d at %H:%M";

const SECONDS_PER_DAY: i32 = 86_400;

/// Shape of the date-time portion: `YYYY-MM-DD at HH:MM`, `D` a digit.
const TIMESTAMP_SHAPE: &[u8] = b"DDDD-DD-DD at DD:DD";

/// A wall-clock date-time paired with a fixed UTC offset.
///
/// Equality is structural: the same instant written in two zones is two
/// different timestamps. Use [`Timestamp::cmp_instant`] to order them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    local: NaiveDateTime,
    offset: FixedOffset,
    utc: DateTime<Utc>,
}

impl Timestamp {
    /// Fails when `local` shifted by `offset` leaves chrono's range.
    pub fn new(local: NaiveDateTime, offset: FixedOffset) -> Result<Self> {
        let naive_utc = local
            .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
            .ok_or_else(|| {
                StoreError::TimestampParse(format!("{local} at offset {offset} is out of range"))
            })?;
        Ok(Self { local, offset, utc: Utc.from_utc_datetime(&naive_utc) })
    }

    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The absolute instant this timestamp denotes.
    pub fn to_utc(&self) -> DateTime<Utc> {
        self.utc
    }

    /// Compares by absolute instant, ignoring which zone wrote it.
    pub fn cmp_instant(&self, other: &Self) -> Ordering {
        self.to_utc().cmp(&other.to_utc())
    }
}

/// Abbreviation -> offset table. Lookups go in insertion order, so the first
/// abbreviation registered for an offset is the one used when formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTable {
    zones: Vec<(String, i32)>,
}

impl ZoneTable {
    pub fn empty() -> Self {
        Self { zones: Vec::new() }
    }

    /// Registers `abbr` at `offset_seconds` east of UTC.
    pub fn insert(&mut self, abbr: impl Into<String>, offset_seconds: i32) -> Result<()> {
        let abbr = abbr.into();
        if abbr.is_empty() || abbr.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
            return Err(StoreError::InvalidConfig(format!(
                "invalid timezone abbreviation '{abbr}'"
            )));
        }
        if offset_seconds.abs() >= SECONDS_PER_DAY {
            return Err(StoreError::InvalidConfig(format!(
                "offset for {abbr} out of range: {offset_seconds}s"
            )));
        }
        if self.offset_seconds(&abbr).is_some() {
            return Err(StoreError::InvalidConfig(format!(
                "duplicate timezone abbreviation '{abbr}'"
            )));
        }
        self.zones.push((abbr, offset_seconds));
        Ok(())
    }

    fn offset_seconds(&self, abbr: &str) -> Option<i32> {
        self.zones
            .iter()
            .find(|(name, _)| name == abbr)
            .map(|(_, secs)| *secs)
    }

    pub fn offset_of(&self, abbr: &str) -> Option<FixedOffset> {
        self.offset_seconds(abbr).and_then(FixedOffset::east_opt)
    }

    pub fn abbreviation_of(&self, offset: FixedOffset) -> Option<&str> {
        let secs = offset.local_minus_utc();
        self.zones
            .iter()
            .find(|(_, s)| *s == secs)
            .map(|(name, _)| name.as_str())
    }

    /// `(abbreviation, offset seconds east of UTC)` in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.zones.iter().map(|(name, secs)| (name.as_str(), *secs))
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl Default for ZoneTable {
    /// CST, CDT and UTC: the zones store files are written in.
    fn default() -> Self {
        Self {
            zones: vec![
                ("CST".to_string(), -6 * 3600),
                ("CDT".to_string(), -5 * 3600),
                ("UTC".to_string(), 0),
            ],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimestampCodec {
    zones: ZoneTable,
}

impl TimestampCodec {
    pub fn new(zones: ZoneTable) -> Self {
        Self { zones }
    }

    pub fn zones(&self) -> &ZoneTable {
        &self.zones
    }

    /// Parses `YYYY-MM-DD at HH:MM (ABBR)`.
    ///
    /// The last whitespace-separated token is the zone; the rest is rejoined
    /// with single spaces and parsed as the date-time.
    pub fn parse(&self, text: &str) -> Result<Timestamp> {
        let mut tokens: Vec<&str> = text.split_whitespace().collect();
        let zone_token = tokens
            .pop()
            .ok_or_else(|| StoreError::TimestampParse("empty timestamp".to_string()))?;

        let abbr = zone_token
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .ok_or_else(|| {
                StoreError::TimestampParse(format!("missing timezone in '{text}'"))
            })?;
        let offset = self.zones.offset_of(abbr).ok_or_else(|| {
            StoreError::TimestampParse(format!("unknown timezone: {zone_token}"))
        })?;

        let date_time = tokens.join(" ");
        if !has_timestamp_shape(&date_time) {
            return Err(StoreError::TimestampParse(format!(
                "'{text}' does not match YYYY-MM-DD at HH:MM"
            )));
        }
        let local = NaiveDateTime::parse_from_str(&date_time, TIMESTAMP_FORMAT)
            .map_err(|e| StoreError::TimestampParse(format!("'{text}': {e}")))?;

        Timestamp::new(local, offset)
    }

    pub fn format(&self, timestamp: &Timestamp) -> Result<String> {
        let abbr = self
            .zones
            .abbreviation_of(timestamp.offset())
            .ok_or(StoreError::NoCanonicalZone(timestamp.offset()))?;
        Ok(format!("{} ({abbr})", timestamp.local().format(TIMESTAMP_FORMAT)))
    }

    /// Current UTC time, truncated to the minute.
    pub fn now(&self) -> Timestamp {
        let now = Utc::now().naive_utc();
        let truncated = now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);
        Timestamp {
            local: truncated,
            offset: Utc.fix(),
            utc: Utc.from_utc_datetime(&truncated),
        }
    }
}

/// chrono accepts signed years of any width and lets a literal space match
/// nothing, so the layout is checked byte by byte first.
fn has_timestamp_shape(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == TIMESTAMP_SHAPE.len()
        && bytes.iter().zip(TIMESTAMP_SHAPE).all(|(&b, &shape)| match shape {
            b'D' => b.is_ascii_digit(),
            literal => b == literal,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TimestampCodec {
        TimestampCodec::default()
    }

    #[test]
    fn test_format_inverts_parse_for_known_zones() {
        for text in [
            "2024-03-09 at 17:45 (CST)",
            "2023-11-30 at 00:05 (CDT)",
            "1999-12-31 at 23:59 (UTC)",
        ] {
            let ts = codec().parse(text).unwrap();
            assert_eq!(codec().format(&ts).unwrap(), text);
        }
    }

    #[test]
    fn test_parse_collapses_whitespace() {
        let ts = codec().parse("  2024-01-01   at 10:00\t(UTC) ").unwrap();
        assert_eq!(codec().format(&ts).unwrap(), "2024-01-01 at 10:00 (UTC)");
    }

    #[test]
    fn test_parse_rejects_unknown_zone() {
        let err = codec().parse("2024-01-01 at 10:00 (XYZ)").unwrap_err();
        assert!(matches!(err, StoreError::TimestampParse(_)));
        assert!(err.to_string().contains("(XYZ)"));
    }

    #[test]
    fn test_parse_requires_parenthesised_zone() {
        assert!(codec().parse("2024-01-01 at 10:00 UTC").is_err());
        assert!(codec().parse("").is_err());
        assert!(codec().parse("(UTC)").is_err());
    }

    #[test]
    fn test_parse_follows_gregorian_calendar() {
        assert!(codec().parse("2024-02-29 at 12:00 (UTC)").is_ok());
        assert!(codec().parse("2023-02-29 at 12:00 (UTC)").is_err());
        assert!(codec().parse("2024-01-01 at 24:00 (UTC)").is_err());
        assert!(codec().parse("2024-01-01 10:00 (UTC)").is_err());
    }

    #[test]
    fn test_instant_ordering_accounts_for_offset() {
        let cst = codec().parse("2024-01-01 at 10:00 (CST)").unwrap();
        let utc = codec().parse("2024-01-01 at 15:00 (UTC)").unwrap();
        assert_eq!(cst.cmp_instant(&utc), Ordering::Greater);

        let cdt = codec().parse("2024-01-01 at 11:00 (CDT)").unwrap();
        assert_eq!(cst.cmp_instant(&cdt), Ordering::Equal);
    }

    #[test]
    fn test_format_rejects_offset_outside_table() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let local = NaiveDateTime::parse_from_str("2024-01-01 at 10:00", TIMESTAMP_FORMAT).unwrap();
        let err = codec().format(&Timestamp::new(local, offset).unwrap()).unwrap_err();
        assert!(matches!(err, StoreError::NoCanonicalZone(_)));
    }

    #[test]
    fn test_parse_rejects_loose_layouts() {
        for text in [
            "24-01-01 at 10:00 (UTC)",
            "-0001-01-01 at 10:00 (UTC)",
            "+262142-12-31 at 23:59 (CST)",
            "2024-01-01at 10:00 (UTC)",
            "2024-01-01 at10:00 (UTC)",
            "2024-1-01 at 10:00 (UTC)",
            "2024-01-01 at 9:05 (UTC)",
            "2024-01-01 at 10:00:00 (UTC)",
            "２０２４-01-01 at 10:00 (UTC)",
        ] {
            assert!(
                matches!(codec().parse(text), Err(StoreError::TimestampParse(_))),
                "accepted {text}"
            );
        }
    }

    #[test]
    fn test_out_of_range_instant_is_an_error() {
        let local = NaiveDateTime::MAX;
        let cst = FixedOffset::west_opt(6 * 3600).unwrap();
        assert!(matches!(Timestamp::new(local, cst), Err(StoreError::TimestampParse(_))));
    }

    #[test]
    fn test_equality_is_structural() {
        let cst = codec().parse("2024-01-01 at 10:00 (CST)").unwrap();
        let cdt = codec().parse("2024-01-01 at 11:00 (CDT)").unwrap();
        assert_eq!(cst.to_utc(), cdt.to_utc());
        assert_ne!(cst, cdt);
    }

    #[test]
    fn test_now_is_utc_and_whole_minutes() {
        let now = codec().now();
        assert_eq!(now.offset().local_minus_utc(), 0);
        assert_eq!(now.local().second(), 0);
        assert_eq!(now.local().nanosecond(), 0);
        assert!(codec().format(&now).unwrap().ends_with(" (UTC)"));
    }

    #[test]
    fn test_zone_table_rejects_duplicates_and_bad_offsets() {
        let mut table = ZoneTable::default();
        assert!(table.insert("UTC", 0).is_err());
        assert!(table.insert("JST", 9 * 3600).is_ok());
        assert!(table.insert("BAD", SECONDS_PER_DAY).is_err());
        assert!(table.insert("(X)", 0).is_err());
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_custom_table_is_honoured() {
        let mut table = ZoneTable::empty();
        table.insert("JST", 9 * 3600).unwrap();
        let codec = TimestampCodec::new(table);
        assert!(codec.parse("2024-01-01 at 10:00 (UTC)").is_err());
        let ts = codec.parse("2024-01-01 at 10:00 (JST)").unwrap();
        assert_eq!(ts.to_utc().to_rfc3339(), "2024-01-01T01:00:00+00:00");
    }
}
