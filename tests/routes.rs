//! Route parsing tests - the paths the browser and CLI hand to the router

use disaster_reports::router::{parse, Route};

#[test]
fn every_page_has_a_stable_path() {
    let pages = [
        ("/", Route::Landing),
        ("/reports", Route::Reports),
        ("/reports/0", Route::ReportDetail { index: 0 }),
        ("/create-report", Route::CreateReport),
    ];
    for (path, route) in pages {
        assert_eq!(parse(path), Some(route), "parsing {path}");
        assert_eq!(route.path(), path);
    }
}

#[test]
fn hash_routes_from_the_browser() {
    assert_eq!(parse("#/reports/17"), Some(Route::ReportDetail { index: 17 }));
    assert_eq!(parse("#/create-report?draft=1"), Some(Route::CreateReport));
}

#[test]
fn shared_links_resolve() {
    assert_eq!(
        parse("https://disaster.example/reports/2?utm_source=share"),
        Some(Route::ReportDetail { index: 2 })
    );
}

#[test]
fn unknown_pages_are_rejected() {
    assert_eq!(parse("/admin"), None);
    assert_eq!(parse("/reports/latest"), None);
    assert_eq!(parse("/reports/99999999999999999999999"), None);
}
