//! Page controllers: what each screen loads, holds and does.
//!
//! Rendering is left to the front-end; every failure here becomes a toast.

use crate::contract::{ReportReader, ReportWriter};
use crate::errors::user_message;
use crate::models::{IndexedReport, Report, ReportImage};
use crate::notify::{Notifier, Toast};
use crate::router::Route;
use crate::submission::{SubmissionFlow, SubmitOutcome};
use serde::Serialize;
use std::sync::Arc;

pub const LOAD_REPORTS_ERROR: &str = "Failed to load disaster reports. Please try again.";
pub const DELETE_REPORT_PROMPT: &str =
    "Are you sure you want to delete this report? This action cannot be undone.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum ReportsView {
    Loading,
    Loaded(Vec<IndexedReport>),
    Empty,
    Error(String),
}

pub struct ReportsPage {
    reader: Arc<ReportReader>,
    notifier: Arc<dyn Notifier>,
    view: ReportsView,
}

impl ReportsPage {
    pub fn new(reader: Arc<ReportReader>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            reader,
            notifier,
            view: ReportsView::Loading,
        }
    }

    pub fn view(&self) -> &ReportsView {
        &self.view
    }

    pub async fn load(&mut self) -> &ReportsView {
        self.view = ReportsView::Loading;
        self.view = match self.reader.all_reports().await {
            Ok(reports) if reports.is_empty() => ReportsView::Empty,
            Ok(reports) => {
                self.notifier.notify(Toast::info(
                    "Reports loaded",
                    format!("Found {} disaster reports", reports.len()),
                ));
                ReportsView::Loaded(reports)
            }
            Err(e) => {
                log::error!("❌ Error fetching reports: {e:#}");
                self.notifier.notify(Toast::error(
                    "Error loading reports",
                    "Failed to fetch disaster reports",
                ));
                ReportsView::Error(LOAD_REPORTS_ERROR.to_string())
            }
        };
        &self.view
    }

    pub async fn refresh(&mut self) -> &ReportsView {
        self.notifier.notify(Toast::info(
            "Refreshing reports",
            "Loading latest disaster reports...",
        ));
        self.load().await
    }

    pub fn open(&self, index: u64) -> Route {
        Route::ReportDetail { index }
    }
}

/// What the detail screen renders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailSnapshot<'a> {
    pub index: u64,
    pub report: Option<&'a Report>,
    pub images: &'a [ReportImage],
    pub is_owner: bool,
}

pub struct ReportDetailPage {
    reader: Arc<ReportReader>,
    writer: Arc<ReportWriter>,
    notifier: Arc<dyn Notifier>,
    index: u64,
    account: Option<String>,
    report: Option<Report>,
    images: Vec<ReportImage>,
    new_image_url: String,
}

impl ReportDetailPage {
    pub fn new(
        reader: Arc<ReportReader>,
        writer: Arc<ReportWriter>,
        notifier: Arc<dyn Notifier>,
        index: u64,
    ) -> Self {
        Self {
            reader,
            writer,
            notifier,
            index,
            account: None,
            report: None,
            images: Vec::new(),
            new_image_url: String::new(),
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn images(&self) -> &[ReportImage] {
        &self.images
    }

    pub fn snapshot(&self) -> DetailSnapshot<'_> {
        DetailSnapshot {
            index: self.index,
            report: self.report.as_ref(),
            images: &self.images,
            is_owner: self.is_owner(),
        }
    }

    pub fn new_image_url(&self) -> &str {
        &self.new_image_url
    }

    pub fn set_new_image_url(&mut self, url: impl Into<String>) {
        self.new_image_url = url.into();
    }

    /// Track the session's account; empty means disconnected.
    pub fn set_account(&mut self, account: Option<&str>) {
        self.account = account.filter(|a| !a.is_empty()).map(str::to_string);
    }

    pub fn is_owner(&self) -> bool {
        match (&self.account, &self.report) {
            (Some(account), Some(report)) => report.is_owned_by(account),
            _ => false,
        }
    }

    /// Load report and images. Returns where to go when the report is missing.
    pub async fn load(&mut self) -> Option<Route> {
        match self.reader.report(self.index).await {
            Ok(report) => {
                self.report = Some(report);
                self.images = self.fetch_images().await;
                None
            }
            Err(e) => {
                log::error!("❌ Error fetching report {}: {e:#}", self.index);
                self.report = None;
                self.images.clear();
                self.notifier.notify(Toast::error(
                    "Report not found",
                    "The requested report does not exist",
                ));
                Some(Route::Reports)
            }
        }
    }

    async fn fetch_images(&self) -> Vec<ReportImage> {
        self.reader
            .report_images(self.index)
            .await
            .unwrap_or_else(|e| {
                log::error!("❌ Error fetching report images: {e:#}");
                Vec::new()
            })
    }

    /// Attach the pending URL to the report (owner only).
    pub async fn add_image(&mut self) -> bool {
        let url = self.new_image_url.trim().to_string();
        if !self.is_owner() || url.is_empty() {
            return false;
        }

        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let result = async {
            let pending = self.writer.add_report_image(self.index, &url, &timestamp).await?;
            self.notifier.notify(Toast::info(
                "Adding image...",
                "Transaction submitted to blockchain",
            ));
            pending.wait().await
        }
        .await;

        match result {
            Ok(_) => {
                self.notifier.notify(Toast::info(
                    "Image added successfully",
                    "The image has been added to the report",
                ));
                self.images = self.fetch_images().await;
                self.new_image_url.clear();
                true
            }
            Err(e) => {
                log::error!("❌ Error adding image: {e:#}");
                self.notifier.notify(Toast::error(
                    "Failed to add image",
                    user_message(&e, "Failed to add image"),
                ));
                false
            }
        }
    }

    /// Remove one image (owner only); the held list is re-fetched afterwards.
    pub async fn delete_image(&mut self, image_index: u64) -> bool {
        if !self.is_owner() {
            return false;
        }

        let result = async {
            let pending = self
                .writer
                .delete_report_image(self.index, image_index)
                .await?;
            self.notifier.notify(Toast::info(
                "Deleting image...",
                "Transaction submitted to blockchain",
            ));
            pending.wait().await
        }
        .await;

        match result {
            Ok(_) => {
                self.notifier.notify(Toast::info(
                    "Image deleted",
                    "The image has been removed from the report",
                ));
                self.images = self.fetch_images().await;
                true
            }
            Err(e) => {
                log::error!("❌ Error deleting image: {e:#}");
                self.notifier.notify(Toast::error(
                    "Failed to delete image",
                    user_message(&e, "Failed to delete image"),
                ));
                false
            }
        }
    }

    /// Delete the report (owner only) once `confirm` agrees to
    /// [`DELETE_REPORT_PROMPT`]. Returns where to go on success.
    pub async fn delete_report(&mut self, confirm: impl FnOnce(&str) -> bool) -> Option<Route> {
        if !self.is_owner() || !confirm(DELETE_REPORT_PROMPT) {
            return None;
        }

        let result = async {
            let pending = self.writer.delete_report(self.index).await?;
            self.notifier.notify(Toast::info(
                "Deleting report...",
                "Transaction submitted to blockchain",
            ));
            pending.wait().await
        }
        .await;

        match result {
            Ok(_) => {
                self.notifier.notify(Toast::info(
                    "Report deleted",
                    "The disaster report has been removed",
                ));
                Some(Route::Reports)
            }
            Err(e) => {
                log::error!("❌ Error deleting report: {e:#}");
                self.notifier.notify(Toast::error(
                    "Failed to delete report",
                    user_message(&e, "Failed to delete report"),
                ));
                None
            }
        }
    }
}

pub struct CreateReportPage {
    flow: SubmissionFlow,
}

impl CreateReportPage {
    pub fn new(flow: SubmissionFlow) -> Self {
        Self { flow }
    }

    pub fn flow(&self) -> &SubmissionFlow {
        &self.flow
    }

    pub fn flow_mut(&mut self) -> &mut SubmissionFlow {
        &mut self.flow
    }

    pub fn back(&self) -> Route {
        Route::Landing
    }

    /// Submit the form; a successful write navigates to the report list.
    pub async fn submit(&mut self, account: Option<&str>) -> Option<Route> {
        match self.flow.submit(account).await {
            SubmitOutcome::Submitted { navigate_to, .. } => Some(navigate_to),
            SubmitOutcome::Rejected | SubmitOutcome::Failed(_) => None,
        }
    }
}
