//! User-facing notifications ("toasts").
//!
//! Every recoverable failure in the session, pages and submission flow ends
//! up here instead of propagating.

use crate::provider::MaybeSendSync;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    Default,
    Destructive,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Destructive,
        }
    }

    pub fn is_error(&self) -> bool {
        self.variant == ToastVariant::Destructive
    }
}

pub trait Notifier: MaybeSendSync {
    fn notify(&self, toast: Toast);
}

/// Writes toasts to the log.
#[derive(Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        match toast.variant {
            ToastVariant::Default => log::info!("🔔 {}: {}", toast.title, toast.description),
            ToastVariant::Destructive => log::warn!("🚨 {}: {}", toast.title, toast.description),
        }
    }
}

/// Forwards toasts to a channel (UI thread, CLI printer, tests).
pub struct ChannelNotifier {
    tx: UnboundedSender<Toast>,
}

impl ChannelNotifier {
    pub fn new(tx: UnboundedSender<Toast>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, toast: Toast) {
        log::debug!("toast: {} / {}", toast.title, toast.description);
        let _ = self.tx.send(toast);
    }
}
