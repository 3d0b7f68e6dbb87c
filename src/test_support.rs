//! Scripted wallet + in-memory contract used by unit tests.

use crate::abi::{self, ContractFunction};
use crate::errors::ProviderError;
use crate::models::{Report, ReportImage};
use crate::provider::{ListenerId, Listeners, ProviderEvent, Transport, WalletProvider};
use crate::rpc::{decode_hex_data, encode_hex_data, parse_quantity};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

pub const ALICE: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
pub const BOB: &str = "0x8617E340B3D01FA5F11F306F4090FD50E238070D";

#[derive(Default)]
struct State {
    chain_id: u64,
    account: String,
    authorized: Vec<String>,
    balance_wei: String,
    reports: Vec<Report>,
    images: Vec<Vec<ReportImage>>,
    broken_indices: Vec<u64>,
    fail_connect: Option<ProviderError>,
    fail_switch: Option<ProviderError>,
    fail_add: Option<ProviderError>,
    fail_revoke: bool,
    fail_chain_id: bool,
    fail_send: Option<ProviderError>,
    revert_receipts: bool,
    receipt_delay: u32,
    receipts: HashMap<String, (u32, bool)>,
    tx_counter: u64,
    calls: Vec<(String, Value)>,
}

pub struct ScriptedWallet {
    state: Mutex<State>,
    listeners: Listeners,
}

impl ScriptedWallet {
    pub fn new(chain_id: u64) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                chain_id,
                account: ALICE.to_string(),
                balance_wei: "0x1bc16d674ec80000".to_string(), // 2 CELO
                ..Default::default()
            }),
            listeners: Listeners::default(),
        })
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_account(&self, account: &str) {
        self.with(|s| s.account = account.to_string());
    }

    pub fn authorize(&self) {
        self.with(|s| s.authorized = vec![s.account.clone()]);
    }

    pub fn chain_id(&self) -> u64 {
        self.with(|s| s.chain_id)
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.with(|s| s.chain_id = chain_id);
    }

    pub fn fail_connect_with(&self, code: i64, msg: &str) {
        self.fail_connect_with_error(ProviderError::new(code, msg));
    }

    pub fn fail_connect_with_error(&self, err: ProviderError) {
        self.with(|s| s.fail_connect = Some(err));
    }

    pub fn fail_switch_with(&self, code: i64, msg: &str) {
        self.with(|s| s.fail_switch = Some(ProviderError::new(code, msg)));
    }

    pub fn fail_add_with(&self, code: i64, msg: &str) {
        self.with(|s| s.fail_add = Some(ProviderError::new(code, msg)));
    }

    pub fn fail_revoke(&self) {
        self.with(|s| s.fail_revoke = true);
    }

    pub fn fail_chain_id(&self) {
        self.with(|s| s.fail_chain_id = true);
    }

    pub fn fail_send_with(&self, err: ProviderError) {
        self.with(|s| s.fail_send = Some(err));
    }

    pub fn revert_receipts(&self) {
        self.with(|s| s.revert_receipts = true);
    }

    /// Receipts show up only after this many `eth_getTransactionReceipt` polls.
    pub fn delay_receipts(&self, polls: u32) {
        self.with(|s| s.receipt_delay = polls);
    }

    pub fn break_report(&self, index: u64) {
        self.with(|s| s.broken_indices.push(index));
    }

    pub fn seed_report(&self, report: Report) -> u64 {
        self.with(|s| {
            s.reports.push(report);
            s.images.push(Vec::new());
            (s.reports.len() - 1) as u64
        })
    }

    pub fn seed_image(&self, index: u64, image: ReportImage) {
        self.with(|s| s.images[index as usize].push(image));
    }

    pub fn reports(&self) -> Vec<Report> {
        self.with(|s| s.reports.clone())
    }

    pub fn images(&self, index: u64) -> Vec<ReportImage> {
        self.with(|s| s.images[index as usize].clone())
    }

    pub fn count(&self, method: &str) -> usize {
        self.with(|s| s.calls.iter().filter(|(m, _)| m == method).count())
    }

    /// Number of `eth_call`s made to a given contract function.
    pub fn call_count(&self, f: ContractFunction) -> usize {
        let selector = encode_hex_data(&f.selector());
        self.with(|s| {
            s.calls
                .iter()
                .filter(|(m, p)| {
                    m == "eth_call"
                        && p[0]["data"]
                            .as_str()
                            .is_some_and(|d| d.starts_with(&selector))
                })
                .count()
        })
    }

    pub fn last_params(&self, method: &str) -> Option<Value> {
        self.with(|s| {
            s.calls
                .iter()
                .rev()
                .find(|(m, _)| m == method)
                .map(|(_, p)| p.clone())
        })
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn emit(&self, event: ProviderEvent) {
        self.listeners.emit(&event);
    }

    fn handle(&self, method: &str, params: &Value) -> Result<Value, ProviderError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push((method.to_string(), params.clone()));
        match method {
            "eth_chainId" => {
                if s.fail_chain_id {
                    return Err(ProviderError::internal("chain id unavailable"));
                }
                Ok(json!(format!("0x{:x}", s.chain_id)))
            }
            "eth_accounts" => Ok(json!(s.authorized)),
            "eth_requestAccounts" => {
                if let Some(e) = s.fail_connect.clone() {
                    return Err(e);
                }
                s.authorized = vec![s.account.clone()];
                Ok(json!(s.authorized))
            }
            "wallet_switchEthereumChain" => {
                if let Some(e) = s.fail_switch.clone() {
                    return Err(e);
                }
                s.chain_id = parse_quantity(&params[0]["chainId"]).unwrap_or_default();
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                if let Some(e) = s.fail_add.clone() {
                    return Err(e);
                }
                s.chain_id = parse_quantity(&params[0]["chainId"]).unwrap_or_default();
                Ok(Value::Null)
            }
            "wallet_revokePermissions" => {
                if s.fail_revoke {
                    return Err(ProviderError::new(4200, "method not supported"));
                }
                s.authorized.clear();
                Ok(Value::Null)
            }
            "eth_getBalance" => Ok(json!(s.balance_wei)),
            "eth_call" => eth_call(&s, &params[0]),
            "eth_sendTransaction" => {
                if let Some(e) = s.fail_send.clone() {
                    return Err(e);
                }
                send_transaction(&mut s, &params[0])
            }
            "eth_getTransactionReceipt" => {
                let hash = params[0].as_str().unwrap_or_default().to_string();
                let Some((remaining, ok)) = s.receipts.get_mut(&hash) else {
                    return Ok(Value::Null);
                };
                if *remaining > 0 {
                    *remaining -= 1;
                    return Ok(Value::Null);
                }
                Ok(json!({
                    "transactionHash": hash,
                    "blockNumber": "0x10",
                    "status": if *ok { "0x1" } else { "0x0" },
                }))
            }
            other => Err(ProviderError::new(4200, format!("unsupported {other}"))),
        }
    }
}

fn eth_call(s: &State, call: &Value) -> Result<Value, ProviderError> {
    let data = decode_hex_data(&call["data"])?;
    let f = abi::function_for_selector(&data[..4])
        .ok_or_else(|| ProviderError::new(-32000, "execution reverted"))?;
    let args = f
        .decode_args(&data[4..])
        .map_err(|e| ProviderError::internal(e.to_string()))?;
    let index = |i: usize| abi::as_u64(&args[i]).unwrap_or(u64::MAX);
    let revert = || ProviderError::new(-32000, "execution reverted").with_reason("Invalid index");

    let out = match f.name {
        "getDisasterReportLength" => vec![abi::uint(s.reports.len() as u64)],
        "getDisasterReport" => {
            let i = index(0);
            if s.broken_indices.contains(&i) {
                return Err(ProviderError::internal("upstream timeout"));
            }
            let report = s.reports.get(i as usize).ok_or_else(revert)?;
            abi::encode_report(report).map_err(|e| ProviderError::internal(e.to_string()))?
        }
        "getDisasterImages" => {
            let images = s.images.get(index(0) as usize).ok_or_else(revert)?;
            abi::encode_images(images).map_err(|e| ProviderError::internal(e.to_string()))?
        }
        _ => return Err(ProviderError::new(-32000, "not a view function")),
    };
    Ok(json!(encode_hex_data(&f.encode_output(&out))))
}

fn send_transaction(s: &mut State, tx: &Value) -> Result<Value, ProviderError> {
    let from = tx["from"].as_str().unwrap_or_default().to_string();
    let data = decode_hex_data(&tx["data"])?;
    let f = abi::function_for_selector(&data[..4])
        .ok_or_else(|| ProviderError::new(-32000, "execution reverted"))?;
    let args = f
        .decode_args(&data[4..])
        .map_err(|e| ProviderError::internal(e.to_string()))?;
    let index = |i: usize| abi::as_u64(&args[i]).unwrap_or(u64::MAX) as usize;

    match f.name {
        "createDisasterReport" => {
            let fields =
                abi::new_report_from_args(&args).map_err(|e| ProviderError::internal(e.to_string()))?;
            s.reports.push(fields.into_report(from));
            s.images.push(Vec::new());
        }
        "deleteDisasterReport" => {
            let i = index(0);
            if i < s.reports.len() {
                s.reports.remove(i);
                s.images.remove(i);
            }
        }
        "addDisasterImage" => {
            let i = index(0);
            let image = ReportImage {
                reporter: from,
                image_url: abi_string(&args[1]),
                timestamp: abi_string(&args[2]),
            };
            if let Some(list) = s.images.get_mut(i) {
                list.push(image);
            }
        }
        "deleteDisasterImage" => {
            let (i, j) = (index(0), index(1));
            if let Some(list) = s.images.get_mut(i) {
                if j < list.len() {
                    list.remove(j);
                }
            }
        }
        _ => return Err(ProviderError::new(-32000, "not a mutating function")),
    }

    s.tx_counter += 1;
    let hash = format!("0x{:064x}", s.tx_counter);
    let ok = !s.revert_receipts;
    let delay = s.receipt_delay;
    s.receipts.insert(hash.clone(), (delay, ok));
    Ok(json!(hash))
}

fn abi_string(v: &alloy_dyn_abi::DynSolValue) -> String {
    match v {
        alloy_dyn_abi::DynSolValue::String(s) => s.clone(),
        _ => String::new(),
    }
}

#[async_trait]
impl Transport for ScriptedWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.handle(method, &params)
    }
}

impl WalletProvider for ScriptedWallet {
    fn subscribe(&self, tx: UnboundedSender<ProviderEvent>) -> ListenerId {
        self.listeners.add(tx)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

pub fn sample_report(reporter: &str, disaster_type: &str) -> Report {
    Report {
        reporter: reporter.to_string(),
        reporter_name: "Ana Cruz".into(),
        email: "ana@example.org".into(),
        disaster_type: disaster_type.to_string(),
        img_url: String::new(),
        latitude: "14.5995".into(),
        longitude: "120.9842".into(),
        city: "Manila".into(),
        state: "NCR".into(),
        date: "2024-07-24".into(),
        severity: "High".into(),
        impact: "Flooded streets".into(),
    }
}
