//! Provider-shaped errors and user-facing message extraction.

use serde_json::Value;
use std::fmt;

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED: i64 = 4001;
/// EIP-1193: the requested method is not authorized.
pub const UNAUTHORIZED: i64 = 4100;
/// EIP-1193: the provider does not support the method.
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// The wallet does not know the requested chain.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// JSON-RPC internal error, used for transport failures.
pub const INTERNAL_ERROR: i64 = -32603;

/// Error as surfaced by a wallet provider or JSON-RPC node.
///
/// Mirrors the shapes wallets actually return: a numeric `code`, a
/// `message`, sometimes a decoded revert `reason`, and sometimes a nested
/// `data.message` carrying the node's own explanation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
    pub reason: Option<String>,
    pub data_message: Option<String>,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            reason: None,
            data_message: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_data_message(mut self, msg: impl Into<String>) -> Self {
        self.data_message = Some(msg.into());
        self
    }

    /// Build from a JSON-RPC `error` object.
    pub fn from_json(err: &Value) -> Self {
        let code = err.get("code").and_then(|c| c.as_i64()).unwrap_or(INTERNAL_ERROR);
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_default()
            .to_string();
        let reason = err
            .get("reason")
            .and_then(|r| r.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let data_message = err
            .get("data")
            .and_then(|d| d.get("message"))
            .and_then(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self {
            code,
            message,
            reason,
            data_message,
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == UNRECOGNIZED_CHAIN
    }

    /// Message first, reason second. Used for connect and network prompts.
    pub fn summary(&self) -> Option<&str> {
        non_empty(&self.message).or(self.reason.as_deref())
    }

    /// Reason, then message, then `data.message`. Used for transaction failures.
    pub fn detail(&self) -> Option<&str> {
        self.reason
            .as_deref()
            .or_else(|| non_empty(&self.message))
            .or(self.data_message.as_deref())
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail() {
            Some(msg) => write!(f, "{msg} (code {})", self.code),
            None => write!(f, "provider error {}", self.code),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Failures of the network check / switch / add flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkError {
    /// The provider could not report its chain id.
    Query(ProviderError),
    /// The wallet lacked the chain and refused or failed to add it.
    NotAdded {
        network: String,
        source: ProviderError,
    },
    /// The wallet refused or failed to switch.
    SwitchFailed {
        network: String,
        source: ProviderError,
    },
}

impl NetworkError {
    pub fn provider_error(&self) -> &ProviderError {
        match self {
            NetworkError::Query(e) => e,
            NetworkError::NotAdded { source, .. } => source,
            NetworkError::SwitchFailed { source, .. } => source,
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::Query(e) => write!(
                f,
                "Could not read the wallet network: {}",
                e.summary().unwrap_or("unknown error")
            ),
            NetworkError::NotAdded { network, source } => write!(
                f,
                "Please manually add {network} to your wallet: {}",
                source.summary().unwrap_or("Failed to add network")
            ),
            NetworkError::SwitchFailed { network, source } => write!(
                f,
                "Please switch to {network} network: {}",
                source.summary().unwrap_or("Network switch failed")
            ),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Turn any failure into the text shown to the user.
///
/// Provider errors anywhere in the chain are preferred, in
/// `reason` > `message` > `data.message` order; otherwise the outermost
/// error message is used, and `fallback` covers empty messages.
pub fn user_message(err: &anyhow::Error, fallback: &str) -> String {
    message_with(err, fallback, ProviderError::detail)
}

/// Like [`user_message`] but `message` wins over `reason`, the order wallet
/// connection failures are reported in.
pub fn connect_message(err: &anyhow::Error, fallback: &str) -> String {
    message_with(err, fallback, ProviderError::summary)
}

fn message_with(
    err: &anyhow::Error,
    fallback: &str,
    pick: fn(&ProviderError) -> Option<&str>,
) -> String {
    for cause in err.chain() {
        if let Some(net) = cause.downcast_ref::<NetworkError>() {
            return net.to_string();
        }
        if let Some(pe) = cause.downcast_ref::<ProviderError>() {
            if let Some(msg) = pick(pe) {
                return msg.to_string();
            }
        }
    }
    let msg = err.to_string();
    if msg.trim().is_empty() {
        fallback.to_string()
    } else {
        msg
    }
}
