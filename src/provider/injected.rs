//! `window.ethereum` bridge for web builds.
//!
//! Requests go through `ethereum.request({method, params})`; values cross the
//! JS boundary as JSON text. Event listeners are JS closures registered with
//! `ethereum.on(...)` and removed with `ethereum.removeListener(...)`.

use super::{ListenerId, ProviderEvent, Transport, WalletProvider};
use crate::errors::ProviderError;
use async_trait::async_trait;
use js_sys::{Function, Object, Promise, Reflect, JSON};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

type JsListener = Closure<dyn FnMut(JsValue)>;

pub struct InjectedProvider {
    ethereum: JsValue,
    next_id: Cell<ListenerId>,
    closures: RefCell<HashMap<ListenerId, (JsListener, JsListener)>>,
}

impl InjectedProvider {
    /// `None` when no wallet extension injected `window.ethereum`.
    pub fn detect() -> Option<Self> {
        let win = web_sys::window()?;
        let ethereum = Reflect::get(&JsValue::from(win), &JsValue::from_str("ethereum")).ok()?;
        if ethereum.is_undefined() || ethereum.is_null() {
            return None;
        }
        Some(Self {
            ethereum,
            next_id: Cell::new(0),
            closures: RefCell::new(HashMap::new()),
        })
    }

    fn method(&self, name: &str) -> Option<Function> {
        Reflect::get(&self.ethereum, &JsValue::from_str(name))
            .ok()
            .filter(|f| f.is_function())
            .map(Function::from)
    }
}

fn to_js(v: &Value) -> Result<JsValue, ProviderError> {
    JSON::parse(&v.to_string()).map_err(|_| ProviderError::internal("params not representable in JS"))
}

fn from_js(v: &JsValue) -> Value {
    if v.is_undefined() {
        return Value::Null;
    }
    JSON::stringify(v)
        .ok()
        .and_then(|s| s.as_string())
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(Value::Null)
}

fn js_error(err: JsValue) -> ProviderError {
    // Wallet errors are plain objects ({code, message, data}) or Error instances
    let mut parsed = ProviderError::from_json(&from_js(&err));
    if parsed.message.is_empty() {
        if let Ok(m) = Reflect::get(&err, &JsValue::from_str("message")) {
            parsed.message = m.as_string().unwrap_or_default();
        }
    }
    if parsed.message.is_empty() {
        parsed.message = err.as_string().unwrap_or_default();
    }
    parsed
}

#[async_trait(?Send)]
impl Transport for InjectedProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let request = self
            .method("request")
            .ok_or_else(|| ProviderError::internal("ethereum.request is not available"))?;

        let args = Object::new();
        Reflect::set(&args, &JsValue::from_str("method"), &JsValue::from_str(method))
            .map_err(js_error)?;
        if !params.is_null() {
            Reflect::set(&args, &JsValue::from_str("params"), &to_js(&params)?)
                .map_err(js_error)?;
        }

        let promise = request
            .call1(&self.ethereum, &JsValue::from(args))
            .map_err(js_error)?;
        let out = JsFuture::from(Promise::from(promise))
            .await
            .map_err(js_error)?;
        Ok(from_js(&out))
    }
}

impl WalletProvider for InjectedProvider {
    fn subscribe(&self, tx: UnboundedSender<ProviderEvent>) -> ListenerId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);

        let Some(on) = self.method("on") else {
            log::warn!("ethereum.on is not available; wallet events disabled");
            return id;
        };

        let accounts_tx = tx.clone();
        let accounts = Closure::wrap(Box::new(move |v: JsValue| {
            let list = serde_json::from_value::<Vec<String>>(from_js(&v)).unwrap_or_default();
            let _ = accounts_tx.send(ProviderEvent::AccountsChanged(list));
        }) as Box<dyn FnMut(JsValue)>);

        let chain = Closure::wrap(Box::new(move |v: JsValue| {
            let _ = tx.send(ProviderEvent::ChainChanged(v.as_string().unwrap_or_default()));
        }) as Box<dyn FnMut(JsValue)>);

        let _ = on.call2(
            &self.ethereum,
            &JsValue::from_str("accountsChanged"),
            accounts.as_ref().unchecked_ref(),
        );
        let _ = on.call2(
            &self.ethereum,
            &JsValue::from_str("chainChanged"),
            chain.as_ref().unchecked_ref(),
        );

        self.closures.borrow_mut().insert(id, (accounts, chain));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        let Some((accounts, chain)) = self.closures.borrow_mut().remove(&id) else {
            return;
        };
        if let Some(remove) = self.method("removeListener") {
            let _ = remove.call2(
                &self.ethereum,
                &JsValue::from_str("accountsChanged"),
                accounts.as_ref().unchecked_ref(),
            );
            let _ = remove.call2(
                &self.ethereum,
                &JsValue::from_str("chainChanged"),
                chain.as_ref().unchecked_ref(),
            );
        }
    }
}
