//! Document information dictionary.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

/// Document metadata read from the trailer's `Info` dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    /// Document title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Document author
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,

    /// Creator application
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,

    /// PDF producer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,

    /// Creation date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    /// PDF version from the file header (e.g., "1.7")
    pub pdf_version: String,

    /// Whether the file carried an `/Encrypt` dictionary
    pub encrypted: bool,
}

impl Metadata {
    /// Create metadata with a PDF version and nothing else.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            pdf_version: version.into(),
            ..Default::default()
        }
    }
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSSOHH'mm'`) to UTC.
///
/// Only the year is required. Missing fields default to the start of the
/// period and a missing offset is read as UTC.
pub fn parse_pdf_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let field = |range: std::ops::Range<usize>, default: u32| {
        s.get(range)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    };
    let month = field(4..6, 1);
    let day = field(6..8, 1);
    let hour = field(8..10, 0);
    let minute = field(10..12, 0);
    let second = field(12..14, 0);

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    let local = DateTime::from_naive_utc_and_offset(naive, Utc);

    let offset_minutes = match s.get(14..15) {
        Some(sign @ ("+" | "-")) => {
            let hours = i64::from(field(15..17, 0));
            let minutes = i64::from(field(18..20, 0));
            let total = hours * 60 + minutes;
            if sign == "-" {
                -total
            } else {
                total
            }
        }
        _ => 0,
    };

    Some(local - Duration::minutes(offset_minutes))
}
