use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DISASTER_TYPES: &[&str] = &[
    "Earthquake",
    "Flood",
    "Hurricane",
    "Tornado",
    "Wildfire",
    "Landslide",
    "Tsunami",
    "Volcanic Eruption",
    "Drought",
    "Cyclone",
    "Storm",
    "Heat Wave",
    "Cold Wave",
    "Other",
];

pub const SEVERITY_LEVELS: &[&str] = &["Low", "Medium", "High", "Critical"];

/// One disaster submission as stored on-chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub reporter: String,
    pub reporter_name: String,
    pub email: String,
    pub disaster_type: String,
    pub img_url: String,
    pub latitude: String,
    pub longitude: String,
    pub city: String,
    pub state: String,
    pub date: String,
    pub severity: String,
    pub impact: String,
}

/// Report fields supplied by the user; the contract records the sender.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReport {
    pub reporter_name: String,
    pub email: String,
    pub disaster_type: String,
    pub img_url: String,
    pub latitude: String,
    pub longitude: String,
    pub city: String,
    pub state: String,
    pub date: String,
    pub severity: String,
    pub impact: String,
}

impl NewReport {
    pub fn into_report(self, reporter: impl Into<String>) -> Report {
        Report {
            reporter: reporter.into(),
            reporter_name: self.reporter_name,
            email: self.email,
            disaster_type: self.disaster_type,
            img_url: self.img_url,
            latitude: self.latitude,
            longitude: self.longitude,
            city: self.city,
            state: self.state,
            date: self.date,
            severity: self.severity,
            impact: self.impact,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedReport {
    pub index: u64,
    #[serde(flatten)]
    pub report: Report,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportImage {
    pub reporter: String,
    pub timestamp: String,
    pub image_url: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeverityClass {
    Danger,
    Warning,
    Calm,
    Neutral,
}

pub fn severity_class(severity: &str) -> SeverityClass {
    match severity.to_lowercase().as_str() {
        "high" | "critical" => SeverityClass::Danger,
        "medium" | "moderate" => SeverityClass::Warning,
        "low" | "minor" => SeverityClass::Calm,
        _ => SeverityClass::Neutral,
    }
}

/// Case-insensitive address equality; empty never matches.
pub fn same_address(a: &str, b: &str) -> bool {
    !a.is_empty() && a.eq_ignore_ascii_case(b)
}

/// `0x1234...abcd`
pub fn format_address(address: &str) -> String {
    shorten(address, 6, 4)
}

/// `0x123456...abcdef`, the longer form used on detail pages.
pub fn short_reporter(address: &str) -> String {
    shorten(address, 8, 6)
}

fn shorten(s: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= head + tail {
        return s.to_string();
    }
    let start: String = chars[..head].iter().collect();
    let end: String = chars[chars.len() - tail..].iter().collect();
    format!("{start}...{end}")
}

/// `March 5, 2024`; unparseable input is returned unchanged.
pub fn format_long_date(date: &str) -> String {
    match parse_date(date) {
        Some(d) => d.format("%B %-d, %Y").to_string(),
        None => date.to_string(),
    }
}

/// `3/5/2024`; unparseable input is returned unchanged.
pub fn format_short_date(date: &str) -> String {
    match parse_date(date) {
        Some(d) => d.format("%-m/%-d/%Y").to_string(),
        None => date.to_string(),
    }
}

fn parse_date(date: &str) -> Option<NaiveDate> {
    let trimmed = date.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

impl Report {
    pub fn is_owned_by(&self, account: &str) -> bool {
        same_address(account, &self.reporter)
    }

    pub fn severity_class(&self) -> SeverityClass {
        severity_class(&self.severity)
    }

    pub fn location(&self) -> String {
        format!("{}, {}", self.city, self.state)
    }

    /// Maps link, only when both coordinates are present.
    pub fn maps_url(&self) -> Option<String> {
        if self.latitude.trim().is_empty() || self.longitude.trim().is_empty() {
            return None;
        }
        Some(format!(
            "https://maps.google.com/?q={},{}",
            urlencoding::encode(self.latitude.trim()),
            urlencoding::encode(self.longitude.trim())
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_classes_are_case_insensitive() {
        assert_eq!(severity_class("CRITICAL"), SeverityClass::Danger);
        assert_eq!(severity_class("high"), SeverityClass::Danger);
        assert_eq!(severity_class("Moderate"), SeverityClass::Warning);
        assert_eq!(severity_class("minor"), SeverityClass::Calm);
        assert_eq!(severity_class("extreme"), SeverityClass::Neutral);
    }

    #[test]
    fn address_shortening() {
        let addr = "0x52908400098527886E0F7030069857D2E4169EE7";
        assert_eq!(format_address(addr), "0x5290...9EE7");
        assert_eq!(short_reporter(addr), "0x529084...169EE7");
        assert_eq!(format_address("0x12"), "0x12");
    }

    #[test]
    fn ownership_ignores_case() {
        let report = Report {
            reporter: "0xAbCd000000000000000000000000000000000001".into(),
            ..Default::default()
        };
        assert!(report.is_owned_by("0xabcd000000000000000000000000000000000001"));
        assert!(!report.is_owned_by(""));
        assert!(!report.is_owned_by("0xabcd000000000000000000000000000000000002"));
    }

    #[test]
    fn dates_format_or_pass_through() {
        assert_eq!(format_long_date("2024-03-05"), "March 5, 2024");
        assert_eq!(format_short_date("2024-03-05T10:00:00Z"), "3/5/2024");
        assert_eq!(format_long_date("yesterday"), "yesterday");
    }

    #[test]
    fn maps_url_needs_both_coordinates() {
        let mut r = Report {
            latitude: "40.7128".into(),
            ..Default::default()
        };
        assert!(r.maps_url().is_none());
        r.longitude = "-74.0060".into();
        assert_eq!(
            r.maps_url().as_deref(),
            Some("https://maps.google.com/?q=40.7128,-74.0060")
        );
    }
}
