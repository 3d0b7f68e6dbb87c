//! Report form and the submission state machine.
//!
//! ```text
//! Disconnected -> ConnectedUnverified -> ConnectedVerified -> Submitting -> Submitted
//!                                               ^                  |
//!                                               +--- Failed(msg) <-+
//! ```

use crate::contract::ReportWriter;
use crate::errors::user_message;
use crate::models::NewReport;
use crate::notify::{Notifier, Toast};
use crate::router::Route;
use crate::verification::{VerificationEvent, VerificationGate};
use anyhow::{anyhow, bail, Result};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Today's date as the form default (`YYYY-MM-DD`, UTC).
pub fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// Editable form fields; mirrors [`NewReport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportForm {
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

impl Default for ReportForm {
    fn default() -> Self {
        Self {
            reporter_name: String::new(),
            email: String::new(),
            disaster_type: String::new(),
            img_url: String::new(),
            latitude: String::new(),
            longitude: String::new(),
            city: String::new(),
            state: String::new(),
            date: today(),
            severity: String::new(),
            impact: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormError {
    Missing(Vec<&'static str>),
    InvalidEmail,
}

impl FormError {
    pub fn toast(&self) -> Toast {
        match self {
            FormError::Missing(fields) => Toast::error(
                "Missing required fields",
                format!("Please fill in: {}", fields.join(", ")),
            ),
            FormError::InvalidEmail => {
                Toast::error("Invalid email", "Please enter a valid email address")
            }
        }
    }
}

impl ReportForm {
    pub const FIELDS: &'static [&'static str] = &[
        "reporter_name",
        "email",
        "disaster_type",
        "img_url",
        "latitude",
        "longitude",
        "city",
        "state",
        "date",
        "severity",
        "impact",
    ];

    const REQUIRED: &'static [&'static str] = &[
        "reporter_name",
        "email",
        "disaster_type",
        "city",
        "state",
        "severity",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut String> {
        Some(match name {
            "reporter_name" => &mut self.reporter_name,
            "email" => &mut self.email,
            "disaster_type" => &mut self.disaster_type,
            "img_url" => &mut self.img_url,
            "latitude" => &mut self.latitude,
            "longitude" => &mut self.longitude,
            "city" => &mut self.city,
            "state" => &mut self.state,
            "date" => &mut self.date,
            "severity" => &mut self.severity,
            "impact" => &mut self.impact,
            _ => return None,
        })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        Some(match name {
            "reporter_name" => &self.reporter_name,
            "email" => &self.email,
            "disaster_type" => &self.disaster_type,
            "img_url" => &self.img_url,
            "latitude" => &self.latitude,
            "longitude" => &self.longitude,
            "city" => &self.city,
            "state" => &self.state,
            "date" => &self.date,
            "severity" => &self.severity,
            "impact" => &self.impact,
            _ => return None,
        })
    }

    /// Set a field by name.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        match self.field_mut(name) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => bail!("Unknown form field '{name}'"),
        }
    }

    /// Set every field present in a JSON object. Strings and numbers are
    /// taken as text, `null` clears the field.
    pub fn apply_json(&mut self, data: &Value) -> Result<()> {
        let fields = data
            .as_object()
            .ok_or_else(|| anyhow!("Form data must be a JSON object"))?;
        for (name, value) in fields {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Null => String::new(),
                other => bail!("Form field '{name}' must be text, got {other}"),
            };
            self.set(name, text)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<NewReport, FormError> {
        let missing: Vec<&'static str> = Self::REQUIRED
            .iter()
            .copied()
            .filter(|f| self.get(f).map_or(true, |v| v.trim().is_empty()))
            .collect();
        if !missing.is_empty() {
            return Err(FormError::Missing(missing));
        }
        if !is_valid_email(&self.email) {
            return Err(FormError::InvalidEmail);
        }

        Ok(NewReport {
            reporter_name: self.reporter_name.clone(),
            email: self.email.clone(),
            disaster_type: self.disaster_type.clone(),
            img_url: self.img_url.clone(),
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            date: self.date.clone(),
            severity: self.severity.clone(),
            impact: self.impact.clone(),
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    Disconnected,
    ConnectedUnverified,
    ConnectedVerified,
    Submitting,
    Submitted,
    /// The last write failed. Verification is kept, so acknowledging the
    /// error (or the next connection sync) returns to `ConnectedVerified`.
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Written and confirmed; go here next.
    Submitted { navigate_to: Route, tx_hash: String },
    /// Refused before any write (not connected, unverified, invalid form).
    Rejected,
    /// The write or its confirmation failed.
    Failed(String),
}

impl SubmitOutcome {
    /// Shape handed to the browser front-end.
    pub fn to_json(&self) -> Value {
        match self {
            SubmitOutcome::Submitted {
                navigate_to,
                tx_hash,
            } => json!({
                "status": "submitted",
                "navigateTo": navigate_to.path(),
                "txHash": tx_hash,
            }),
            SubmitOutcome::Rejected => json!({"status": "rejected"}),
            SubmitOutcome::Failed(msg) => json!({"status": "failed", "error": msg}),
        }
    }
}

pub struct SubmissionFlow {
    writer: ReportWriter,
    notifier: Arc<dyn Notifier>,
    gate: VerificationGate,
    form: ReportForm,
    state: SubmissionState,
    last_error: Option<String>,
}

impl SubmissionFlow {
    pub fn new(writer: ReportWriter, notifier: Arc<dyn Notifier>, gate: VerificationGate) -> Self {
        Self {
            writer,
            notifier,
            gate,
            form: ReportForm::new(),
            state: SubmissionState::Disconnected,
            last_error: None,
        }
    }

    pub fn form(&self) -> &ReportForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ReportForm {
        &mut self.form
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.state == SubmissionState::Submitting
    }

    fn connected_state(&self) -> SubmissionState {
        if self.gate.is_satisfied() {
            SubmissionState::ConnectedVerified
        } else {
            SubmissionState::ConnectedUnverified
        }
    }

    /// Follow the wallet session's connection status.
    pub fn sync_connection(&mut self, account: Option<&str>) {
        if self.is_submitting() {
            return;
        }
        self.state = match account {
            Some(a) if !a.is_empty() => self.connected_state(),
            _ => SubmissionState::Disconnected,
        };
    }

    /// Dismiss a failed attempt; the form and verification are kept.
    pub fn acknowledge_failure(&mut self) {
        if matches!(self.state, SubmissionState::Failed(_)) {
            self.state = self.connected_state();
        }
    }

    pub fn on_verification(&mut self, event: &VerificationEvent) {
        if self.gate.apply(event) && self.state == SubmissionState::ConnectedUnverified {
            self.state = SubmissionState::ConnectedVerified;
        }
    }

    pub async fn submit(&mut self, account: Option<&str>) -> SubmitOutcome {
        let Some(account) = account.filter(|a| !a.is_empty()) else {
            self.state = SubmissionState::Disconnected;
            self.notifier.notify(Toast::error(
                "Wallet not connected",
                "Please connect your wallet to submit a report",
            ));
            return SubmitOutcome::Rejected;
        };

        if !self.gate.is_satisfied() {
            self.state = SubmissionState::ConnectedUnverified;
            self.notifier.notify(Toast::error(
                "Verification required",
                "Please verify your identity before submitting a report",
            ));
            return SubmitOutcome::Rejected;
        }

        let report = match self.form.validate() {
            Ok(r) => r,
            Err(e) => {
                self.notifier.notify(e.toast());
                return SubmitOutcome::Rejected;
            }
        };

        self.state = SubmissionState::Submitting;
        self.last_error = None;
        log::info!("📝 Submitting {} report for {account}", report.disaster_type);

        match self.write(&report).await {
            Ok(tx_hash) => {
                self.notifier.notify(Toast::info(
                    "Report created successfully!",
                    "Your disaster report has been recorded on the Celo blockchain",
                ));
                self.form.reset();
                self.gate.consume();
                self.state = SubmissionState::Submitted;
                SubmitOutcome::Submitted {
                    navigate_to: Route::Reports,
                    tx_hash,
                }
            }
            Err(e) => {
                log::error!("❌ Error creating report: {e:#}");
                let msg = user_message(&e, "Failed to create report");
                self.notifier
                    .notify(Toast::error("Failed to create report", msg.clone()));
                self.state = SubmissionState::Failed(msg.clone());
                self.last_error = Some(msg.clone());
                SubmitOutcome::Failed(msg)
            }
        }
    }

    async fn write(&self, report: &NewReport) -> Result<String> {
        self.notifier.notify(Toast::info(
            "Creating report...",
            "Please confirm the transaction in your wallet",
        ));
        let pending = self.writer.create_report(report).await?;
        self.notifier.notify(Toast::info(
            "Transaction submitted",
            "Transaction sent, waiting for confirmation...",
        ));
        let receipt = pending.wait().await?;
        Ok(receipt.hash)
    }
}
