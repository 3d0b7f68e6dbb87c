//! Identity-proof widget configuration and the one-shot verification gate.
//!
//! The proof itself is produced and checked by an external service; this
//! module only describes the request and tracks whether a success event has
//! been seen for the current report.

use crate::config::NetworkConfig;
use crate::models::same_address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "Disaster Management";
pub const VERIFICATION_SCOPE: &str = "Disaster-Management";
pub const MINIMUM_AGE: u32 = 18;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointType {
    Celo,
    StagingCelo,
}

impl EndpointType {
    pub fn for_network(net: &NetworkConfig) -> Self {
        if net.chain_id == NetworkConfig::celo_mainnet().chain_id {
            EndpointType::Celo
        } else {
            EndpointType::StagingCelo
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disclosures {
    pub minimum_age: u32,
}

/// Payload handed to the verification widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfAppConfig {
    pub app_name: String,
    pub scope: String,
    pub endpoint: String,
    pub endpoint_type: EndpointType,
    pub user_id: String,
    pub user_id_type: String,
    pub disclosures: Disclosures,
}

impl SelfAppConfig {
    pub fn new(net: &NetworkConfig, contract_address: &str, account: &str) -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            scope: VERIFICATION_SCOPE.to_string(),
            endpoint: contract_address.to_lowercase(),
            endpoint_type: EndpointType::for_network(net),
            user_id: account.to_string(),
            user_id_type: "hex".to_string(),
            disclosures: Disclosures {
                minimum_age: MINIMUM_AGE,
            },
        }
    }
}

/// Callback outcome from the widget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationEvent {
    Success,
    Error(String),
}

/// Outcome document the verification app hands back when the front-end is
/// not a browser (the CLI reads it from a file).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub status: String,
    pub scope: String,
    pub user_id: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl VerificationResult {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Invalid verification result")
    }

    /// Only a success issued for this scope and `account` counts.
    pub fn into_event(self, account: &str) -> VerificationEvent {
        if self.scope != VERIFICATION_SCOPE {
            return VerificationEvent::Error(format!(
                "Verification was issued for scope {}",
                self.scope
            ));
        }
        if !same_address(&self.user_id, account) {
            return VerificationEvent::Error(
                "Verification belongs to a different account".to_string(),
            );
        }
        match self.status.as_str() {
            "success" => VerificationEvent::Success,
            _ => VerificationEvent::Error(
                self.error.unwrap_or_else(|| "Verification failed".to_string()),
            ),
        }
    }
}

/// Tracks whether the next submission may proceed.
#[derive(Clone, Debug, Default)]
pub struct VerificationGate {
    required: bool,
    verified: bool,
}

impl VerificationGate {
    pub fn new(required: bool) -> Self {
        Self {
            required,
            verified: false,
        }
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_satisfied(&self) -> bool {
        !self.required || self.verified
    }

    /// Returns true when the event moved the gate to verified.
    pub fn apply(&mut self, event: &VerificationEvent) -> bool {
        match event {
            VerificationEvent::Success => {
                log::info!("🪪 Identity verified");
                self.verified = true;
                true
            }
            VerificationEvent::Error(msg) => {
                log::warn!("⚠️ Identity verification failed: {msg}");
                false
            }
        }
    }

    /// Use up the verification after a successful submission.
    pub fn consume(&mut self) {
        self.verified = false;
    }
}
