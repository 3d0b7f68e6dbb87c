//! JS -> Rust surface for the browser front-end.
//!
//! The page scripts own rendering. [`WebClient`] owns everything else: the
//! `window.ethereum` session, contract reads and writes, and the submission
//! flow. Async methods return Promises resolving to JSON strings; toasts queue
//! up until the page drains them.

#![cfg(target_arch = "wasm32")]

use crate::config::{Config, NetworkConfig};
use crate::contract::{ReportReader, ReportWriter};
use crate::notify::{ChannelNotifier, Notifier, Toast};
use crate::pages::{ReportDetailPage, ReportsPage};
use crate::provider::{InjectedProvider, Transport, WalletProvider};
use crate::rpc::HttpTransport;
use crate::session::WalletSession;
use crate::storage::LocalStorage;
use crate::submission::SubmissionFlow;
use crate::verification::{SelfAppConfig, VerificationEvent, VerificationGate};
use js_sys::Promise;
use serde::Serialize;
use std::rc::Rc;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::sync::Mutex;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

/// Install the panic hook and console logger. Call once on page load.
#[wasm_bindgen]
pub fn disaster_reports_init() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
    log::info!("🚀 disaster-reports web client ready");
}

/// Normalise a location hash (`#/reports/3`) into a route path, or `null`.
///
/// # Example
/// ```javascript
/// window.wasm_bindgen.disaster_reports_route(location.hash); // "/reports/3"
/// ```
#[wasm_bindgen]
pub fn disaster_reports_route(hash: String) -> Option<String> {
    crate::router::parse(&hash).map(|r| r.path())
}

#[wasm_bindgen]
pub fn disaster_reports_valid_email(email: String) -> bool {
    crate::submission::is_valid_email(&email)
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_json::to_string(value).map(JsValue::from).map_err(js_err)
}

fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

#[wasm_bindgen]
pub struct WebClient {
    network: NetworkConfig,
    contract_address: String,
    has_wallet: bool,
    reader: Arc<ReportReader>,
    writer: Arc<ReportWriter>,
    notifier: Arc<dyn Notifier>,
    toasts: UnboundedReceiver<Toast>,
    session: Rc<Mutex<WalletSession>>,
    flow: Rc<Mutex<SubmissionFlow>>,
}

#[wasm_bindgen]
impl WebClient {
    /// `network` is a preset name (`celo` or `alfajores`).
    #[wasm_bindgen(constructor)]
    pub fn new(
        network: String,
        contract_address: String,
        require_verification: bool,
    ) -> Result<WebClient, JsValue> {
        let network = NetworkConfig::preset(&network).map_err(js_err)?;
        let defaults = Config::default();

        let provider: Option<Arc<dyn WalletProvider>> =
            InjectedProvider::detect().map(|p| Arc::new(p) as Arc<dyn WalletProvider>);
        if provider.is_none() {
            log::warn!("👛 No injected wallet found");
        }

        let rpc: Arc<dyn Transport> = Arc::new(HttpTransport::new(
            network.rpc_url.clone(),
            defaults.rpc_timeout_ms,
        ));
        let reader = Arc::new(ReportReader::new(rpc.clone(), &contract_address).map_err(js_err)?);
        let writer = || {
            ReportWriter::new(provider.clone(), network.clone(), &contract_address)
                .map(|w| w.with_receipt_timing(defaults.receipt_poll_ms, defaults.receipt_timeout_ms))
                .map_err(js_err)
        };

        let (tx, toasts) = unbounded_channel();
        let notifier: Arc<dyn Notifier> = Arc::new(ChannelNotifier::new(tx));
        let session = WalletSession::new(
            provider.clone(),
            rpc,
            network.clone(),
            Arc::new(LocalStorage),
            notifier.clone(),
        );
        let flow = SubmissionFlow::new(
            writer()?,
            notifier.clone(),
            VerificationGate::new(require_verification),
        );

        Ok(WebClient {
            has_wallet: provider.is_some(),
            writer: Arc::new(writer()?),
            network,
            contract_address,
            reader,
            notifier,
            toasts,
            session: Rc::new(Mutex::new(session)),
            flow: Rc::new(Mutex::new(flow)),
        })
    }

    #[wasm_bindgen(getter)]
    pub fn has_wallet(&self) -> bool {
        self.has_wallet
    }

    /// Session state JSON, or `null` while an operation holds the session.
    pub fn state_json(&self) -> Option<String> {
        let session = self.session.try_lock().ok()?;
        serde_json::to_string(session.state()).ok()
    }

    /// Toasts queued since the last call, as a JSON array.
    pub fn drain_toasts_json(&mut self) -> String {
        let mut out = Vec::new();
        while let Ok(toast) = self.toasts.try_recv() {
            out.push(toast);
        }
        serde_json::to_string(&out).unwrap_or_else(|e| {
            log::error!("Failed to serialize toasts: {e}");
            "[]".to_string()
        })
    }

    /// Rehydrate the session and start listening to wallet events.
    pub fn mount(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            let mut session = session.lock().await;
            session.mount().await;
            to_json(session.state())
        })
    }

    pub fn connect(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            let mut session = session.lock().await;
            session.connect().await;
            to_json(session.state())
        })
    }

    pub fn disconnect(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            let mut session = session.lock().await;
            session.disconnect().await;
            to_json(session.state())
        })
    }

    /// Apply queued `accountsChanged` / `chainChanged` events.
    pub fn pump_events(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            let mut session = session.lock().await;
            session.pump_events().await;
            to_json(session.state())
        })
    }

    /// Resolves to `{"status": "loaded" | "empty" | "error", "data": ...}`.
    pub fn list_reports(&self) -> Promise {
        let mut page = ReportsPage::new(self.reader.clone(), self.notifier.clone());
        future_to_promise(async move { to_json(page.load().await) })
    }

    /// Resolves to the detail snapshot, or `{"redirect": "/reports"}`.
    pub fn report_detail(&self, index: u32) -> Promise {
        let mut page = self.detail_page(index);
        let session = self.session.clone();
        future_to_promise(async move {
            if let Some(route) = load_detail(&mut page, &session).await {
                return to_json(&serde_json::json!({ "redirect": route.path() }));
            }
            to_json(&page.snapshot())
        })
    }

    pub fn add_image(&self, index: u32, url: String) -> Promise {
        let mut page = self.detail_page(index);
        let session = self.session.clone();
        future_to_promise(async move {
            if let Some(route) = load_detail(&mut page, &session).await {
                return to_json(&serde_json::json!({ "redirect": route.path() }));
            }
            page.set_new_image_url(url);
            page.add_image().await;
            to_json(&page.snapshot())
        })
    }

    pub fn delete_image(&self, index: u32, image_index: u32) -> Promise {
        let mut page = self.detail_page(index);
        let session = self.session.clone();
        future_to_promise(async move {
            if let Some(route) = load_detail(&mut page, &session).await {
                return to_json(&serde_json::json!({ "redirect": route.path() }));
            }
            if confirm("Are you sure you want to delete this image?") {
                page.delete_image(u64::from(image_index)).await;
            }
            to_json(&page.snapshot())
        })
    }

    /// Resolves to the route to open next, or `null` when nothing happened.
    pub fn delete_report(&self, index: u32) -> Promise {
        let mut page = self.detail_page(index);
        let session = self.session.clone();
        future_to_promise(async move {
            let next = match load_detail(&mut page, &session).await {
                Some(route) => Some(route),
                None => page.delete_report(confirm).await,
            };
            Ok(next.map(|r| JsValue::from(r.path())).unwrap_or(JsValue::NULL))
        })
    }

    /// JSON for the identity widget, bound to the connected account.
    pub fn self_app_json(&self) -> Result<String, JsValue> {
        let session = self.session.try_lock().map_err(js_err)?;
        let account = session
            .account()
            .ok_or_else(|| JsValue::from_str("Wallet not connected"))?;
        let cfg = SelfAppConfig::new(&self.network, &self.contract_address, account);
        serde_json::to_string(&cfg).map_err(js_err)
    }

    /// Widget `onSuccess` callback.
    pub fn verification_succeeded(&self) -> Promise {
        self.verification(VerificationEvent::Success)
    }

    /// Widget `onError` callback.
    pub fn verification_failed(&self, reason: String) -> Promise {
        self.verification(VerificationEvent::Error(reason))
    }

    /// Submit the form (a JSON object keyed by field name).
    pub fn submit_report(&self, form_json: String) -> Promise {
        let session = self.session.clone();
        let flow = self.flow.clone();
        future_to_promise(async move {
            let data: serde_json::Value = serde_json::from_str(&form_json).map_err(js_err)?;
            let account = session.lock().await.account().map(str::to_string);
            let mut flow = flow.lock().await;
            flow.sync_connection(account.as_deref());
            flow.form_mut().apply_json(&data).map_err(js_err)?;
            let outcome = flow.submit(account.as_deref()).await;
            flow.acknowledge_failure();
            to_json(&outcome.to_json())
        })
    }
}

impl WebClient {
    fn detail_page(&self, index: u32) -> ReportDetailPage {
        ReportDetailPage::new(
            self.reader.clone(),
            self.writer.clone(),
            self.notifier.clone(),
            u64::from(index),
        )
    }

    fn verification(&self, event: VerificationEvent) -> Promise {
        let session = self.session.clone();
        let flow = self.flow.clone();
        future_to_promise(async move {
            let account = session.lock().await.account().map(str::to_string);
            let mut flow = flow.lock().await;
            flow.sync_connection(account.as_deref());
            flow.on_verification(&event);
            Ok(JsValue::from(format!("{:?}", flow.state())))
        })
    }
}

async fn load_detail(
    page: &mut ReportDetailPage,
    session: &Mutex<WalletSession>,
) -> Option<crate::router::Route> {
    let account = session.lock().await.account().map(str::to_string);
    page.set_account(account.as_deref());
    page.load().await
}
