//! Application routes.
//!
//! ## Supported Routes
//!
//! - `/` - Landing page
//! - `/reports` - All reports, newest first
//! - `/reports/<index>` - One report with its images
//! - `/create-report` - Report form
//!
//! ## Robust Parsing
//!
//! The parser accepts the forms a browser or a CLI user is likely to hand it:
//! - Path only: `/reports/3`, `reports/3`
//! - Web hash routing: `#/reports/3`
//! - Full URLs: `https://app.example/reports/3`
//! - Trailing and repeated slashes: `//reports//3/`
//! - Query and fragment stripping: `/reports?utm=1#top`
//!
//! ## Example
//!
//! ```rust,ignore
//! use disaster_reports::router::{parse, Route};
//!
//! match parse("/reports/7") {
//!     Some(Route::ReportDetail { index }) => println!("report {index}"),
//!     _ => {}
//! }
//! ```

use std::fmt;

/// Strip query and fragment from URL path
#[inline]
fn strip_query_frag(s: &str) -> &str {
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'?' || b == b'#' {
            return &s[..i];
        }
    }
    s
}

/// Drop `scheme://authority` from a full URL, leaving the path
#[inline]
fn after_authority(raw: &str) -> Option<&str> {
    let pos = raw.find("://")?;
    let scheme = &raw[..pos];
    if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
        return None;
    }
    let rest = &raw[pos + 3..];
    Some(rest.find('/').map_or("", |slash| &rest[slash..]))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Landing: `/`
    Landing,
    /// Report list: `/reports`
    Reports,
    /// Report detail: `/reports/<index>`
    ReportDetail { index: u64 },
    /// Report form: `/create-report`
    CreateReport,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Landing => "/".to_string(),
            Route::Reports => "/reports".to_string(),
            Route::ReportDetail { index } => format!("/reports/{index}"),
            Route::CreateReport => "/create-report".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Parse a route from various URL formats
///
/// Returns `None` for unknown pages and malformed report indices.
pub fn parse(raw: &str) -> Option<Route> {
    let s = raw.trim();

    let path = if let Some(rest) = after_authority(s) {
        rest
    } else if let Some(rest) = s.strip_prefix('#') {
        // Hash routing: #/reports/3
        rest
    } else {
        s
    };

    let path = strip_query_frag(path);
    let mut segments = path.split('/').filter(|s| !s.is_empty());

    let route = match segments.next() {
        None => Route::Landing,
        Some(page) => match page.to_ascii_lowercase().as_str() {
            "reports" => match segments.next() {
                None => Route::Reports,
                Some(index) => Route::ReportDetail {
                    index: index.parse::<u64>().ok()?,
                },
            },
            "create-report" => Route::CreateReport,
            _ => return None,
        },
    };

    // Nothing may follow a complete route
    if segments.next().is_some() {
        return None;
    }
    Some(route)
}
