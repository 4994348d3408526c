use crate::{
    Result,
    constants::{
        DEFAULT_LINK_PRODUCT_ID, DEFAULT_LINK_VENDOR_ID, DEFAULT_READER_PRODUCT_ID,
        DEFAULT_READER_VENDOR_ID, ENTRY_SEPARATOR, TAG_TRIM_CHARS, TIMESTAMP_FORMAT,
    },
    error::Error,
};
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized RFID tag identifier.
///
/// Reader sentinels (`;`, `?`) and surrounding whitespace are stripped and
/// the value is lower-cased. Equality is exact string match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagId(String);

impl TagId {
    /// Create a new tag identifier from raw scanned or stored text.
    ///
    /// # Errors
    /// Returns `Error::InvalidTag` if:
    /// - Nothing is left after stripping sentinels and whitespace
    /// - The value contains the record separator or inner whitespace
    pub fn new(raw: &str) -> Result<Self> {
        let cleaned = raw
            .trim_matches(|c: char| TAG_TRIM_CHARS.contains(&c) || c.is_whitespace())
            .to_lowercase();

        if cleaned.is_empty() {
            return Err(Error::InvalidTag(format!("empty identifier in {raw:?}")));
        }

        if cleaned.contains(ENTRY_SEPARATOR) || cleaned.chars().any(char::is_whitespace) {
            return Err(Error::InvalidTag(format!(
                "identifier {cleaned:?} contains a separator"
            )));
        }

        Ok(TagId(cleaned))
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TagId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TagId::new(s)
    }
}

/// A persisted authorization record: `<tagid>_<timestamp>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedEntry {
    tag: TagId,
    enrolled_at: String,
}

impl AuthorizedEntry {
    /// Create an entry from a tag and an already formatted timestamp.
    pub fn new(tag: TagId, enrolled_at: impl Into<String>) -> Self {
        Self {
            tag,
            enrolled_at: enrolled_at.into(),
        }
    }

    /// Create an entry stamped with `at`, formatted per [`TIMESTAMP_FORMAT`].
    pub fn stamped<Tz>(tag: TagId, at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self::new(tag, at.format(TIMESTAMP_FORMAT).to_string())
    }

    /// Create an entry stamped with the current local time.
    pub fn enroll_now(tag: TagId) -> Self {
        Self::stamped(tag, &Local::now())
    }

    /// Parse one persisted line.
    ///
    /// The identifier is everything before the first separator; a line with
    /// no separator is an identifier with an empty timestamp.
    ///
    /// # Errors
    /// Returns `Error::InvalidEntry` if the identifier portion is not a valid tag.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (tag, enrolled_at) = line.split_once(ENTRY_SEPARATOR).unwrap_or((line, ""));

        let tag = TagId::new(tag)
            .map_err(|e| Error::InvalidEntry(format!("{line:?}: {e}")))?;

        Ok(Self::new(tag, enrolled_at))
    }

    /// The tag this entry authorizes.
    #[must_use]
    pub fn tag(&self) -> &TagId {
        &self.tag
    }

    /// The enrollment timestamp as persisted.
    #[must_use]
    pub fn enrolled_at(&self) -> &str {
        &self.enrolled_at
    }
}

impl fmt::Display for AuthorizedEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.enrolled_at.is_empty() {
            write!(f, "{}", self.tag)
        } else {
            write!(f, "{}{}{}", self.tag, ENTRY_SEPARATOR, self.enrolled_at)
        }
    }
}

/// Session mode of the controller.
///
/// In `Normal` mode a completed scan is checked against the authorized set;
/// in `Enrollment` mode the next completed scan is added to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Normal,
    Enrollment,
}

impl SessionMode {
    /// Check if a transition to `target` is allowed.
    ///
    /// Entering enrollment while already enrolling is allowed: the request
    /// is acknowledged again and the mode stays put.
    ///
    /// ```
    /// use keybox_core::SessionMode;
    ///
    /// assert!(SessionMode::Normal.can_transition_to(&SessionMode::Enrollment));
    /// assert!(SessionMode::Enrollment.can_transition_to(&SessionMode::Enrollment));
    /// assert!(!SessionMode::Normal.can_transition_to(&SessionMode::Normal));
    /// ```
    #[must_use]
    pub fn can_transition_to(&self, target: &SessionMode) -> bool {
        matches!(
            (self, target),
            (SessionMode::Normal, SessionMode::Enrollment)
                | (SessionMode::Enrollment, SessionMode::Normal | SessionMode::Enrollment)
        )
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionMode::Normal => write!(f, "Normal"),
            SessionMode::Enrollment => write!(f, "Enrollment"),
        }
    }
}

/// Outcome of a completed scan, as recorded in the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessOutcome {
    Granted,
    Denied,
    Enrolled,
}

impl AccessOutcome {
    /// Log representation of the outcome.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessOutcome::Granted => "GRANTED",
            AccessOutcome::Denied => "DENIED",
            AccessOutcome::Enrolled => "ENROLLED",
        }
    }
}

impl fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// USB bus identity (vendor/product pair) used for device discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl BusIdentity {
    #[must_use]
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    /// Default identity of the RFID reader.
    #[must_use]
    pub const fn reader() -> Self {
        Self::new(DEFAULT_READER_VENDOR_ID, DEFAULT_READER_PRODUCT_ID)
    }

    /// Default identity of the lock microcontroller.
    #[must_use]
    pub const fn control_link() -> Self {
        Self::new(DEFAULT_LINK_VENDOR_ID, DEFAULT_LINK_PRODUCT_ID)
    }

    /// Check whether a probed vendor/product pair matches this identity.
    #[must_use]
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

impl fmt::Display for BusIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use rstest::rstest;

    #[rstest]
    #[case("12345", "12345")]
    #[case(";12345?", "12345")]
    #[case("  0042 \n", "0042")]
    #[case("AbC9", "abc9")]
    fn test_tag_id_normalization(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(TagId::new(raw).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case(";?")]
    #[case("   ")]
    #[case("12_34")]
    #[case("12 34")]
    fn test_tag_id_rejects(#[case] raw: &str) {
        assert!(matches!(TagId::new(raw), Err(Error::InvalidTag(_))));
    }

    #[test]
    fn test_entry_parse_takes_portion_before_first_separator() {
        let entry = AuthorizedEntry::parse("12345_01Jan2024_10:00").unwrap();
        assert_eq!(entry.tag().as_str(), "12345");
        assert_eq!(entry.enrolled_at(), "01Jan2024_10:00");
        assert_eq!(entry.to_string(), "12345_01Jan2024_10:00");
    }

    #[test]
    fn test_entry_parse_without_separator() {
        let entry = AuthorizedEntry::parse("777\n").unwrap();
        assert_eq!(entry.tag().as_str(), "777");
        assert_eq!(entry.enrolled_at(), "");
        assert_eq!(entry.to_string(), "777");
    }

    #[test]
    fn test_entry_parse_rejects_empty_identifier() {
        assert!(matches!(
            AuthorizedEntry::parse("_01Jan2024_10:00"),
            Err(Error::InvalidEntry(_))
        ));
    }

    #[test]
    fn test_entry_stamped_format() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let at = offset.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let entry = AuthorizedEntry::stamped(TagId::new("54321").unwrap(), &at);

        assert_eq!(entry.to_string(), "54321_01January2024_10:00");
        assert_eq!(
            AuthorizedEntry::parse(&entry.to_string()).unwrap().tag(),
            entry.tag()
        );
    }

    #[test]
    fn test_session_mode_default_and_display() {
        assert_eq!(SessionMode::default(), SessionMode::Normal);
        assert_eq!(SessionMode::Enrollment.to_string(), "Enrollment");
    }

    #[test]
    fn test_access_outcome_serialization() {
        let json = serde_json::to_string(&AccessOutcome::Granted).unwrap();
        assert_eq!(json, "\"GRANTED\"");
        assert_eq!(AccessOutcome::Enrolled.as_str(), "ENROLLED");
    }

    #[test]
    fn test_bus_identity_defaults() {
        assert!(BusIdentity::reader().matches(0x0801, 0x0001));
        assert!(BusIdentity::control_link().matches(0x2341, 0x0043));
        assert!(!BusIdentity::control_link().matches(0x2341, 0x0001));
        assert_eq!(BusIdentity::reader().to_string(), "0801:0001");
    }
}
