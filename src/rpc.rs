//! Direct JSON-RPC 2.0 over HTTP, shared by native and web builds.

use crate::errors::ProviderError;
use crate::provider::Transport;
use alloy_primitives::U256;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

static HTTP: OnceLock<reqwest::Client> = OnceLock::new();
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn http_client() -> &'static reqwest::Client {
    HTTP.get_or_init(|| {
        #[cfg(not(target_arch = "wasm32"))]
        {
            reqwest::Client::builder()
                .pool_max_idle_per_host(8)
                .tcp_nodelay(true)
                .build()
                .unwrap_or_default()
        }

        #[cfg(target_arch = "wasm32")]
        {
            reqwest::Client::new()
        }
    })
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[cfg(target_arch = "wasm32")]
pub(crate) async fn sleep_ms(ms: u64) {
    gloo_timers::future::sleep(Duration::from_millis(ms)).await;
}

pub async fn rpc_post(
    url: &str,
    method: &str,
    params: Value,
    timeout_ms: u64,
) -> Result<Value, ProviderError> {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let body = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});

    // Small, bounded retry on transient HTTP failures
    let mut attempt = 0u32;
    loop {
        let req = http_client().post(url).json(&body);
        #[cfg(not(target_arch = "wasm32"))]
        let req = req.timeout(Duration::from_millis(timeout_ms));
        #[cfg(target_arch = "wasm32")]
        let _ = timeout_ms;

        let res = req
            .send()
            .await
            .map_err(|e| ProviderError::internal(format!("{method}: {e}")))?;

        if res.status().is_success() {
            let v: Value = res
                .json()
                .await
                .map_err(|e| ProviderError::internal(format!("{method}: invalid json: {e}")))?;
            if let Some(err) = v.get("error") {
                log::debug!("⚠️ {method} returned rpc error: {err}");
                return Err(ProviderError::from_json(err));
            }
            if let Some(r) = v.get("result") {
                return Ok(r.clone());
            }
            return Err(ProviderError::internal("invalid rpc payload (no result)"));
        }

        // Retry only on transient statuses
        if matches!(res.status().as_u16(), 429 | 500 | 502 | 503 | 504) && attempt < 2 {
            attempt += 1;
            log::warn!("🔁 {method}: http {} retry={attempt}", res.status());
            sleep_ms(150 * attempt as u64).await;
            continue;
        }
        return Err(ProviderError::internal(format!("http {}", res.status())));
    }
}

/// Plain HTTP JSON-RPC endpoint with no signer.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    url: String,
    timeout_ms: u64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            url: url.into(),
            timeout_ms,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Transport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        rpc_post(&self.url, method, params, self.timeout_ms).await
    }
}

fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Parse a hex quantity (`"0xa4ec"`) or a plain JSON number.
pub fn parse_quantity(v: &Value) -> Option<u64> {
    match v {
        Value::String(s) => u64::from_str_radix(strip_0x(s), 16).ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

pub fn parse_u256(v: &Value) -> Option<U256> {
    let s = v.as_str()?;
    let digits = strip_0x(s);
    if digits.is_empty() {
        return Some(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).ok()
}

/// Decode `0x`-prefixed hex data returned by `eth_call`.
pub fn decode_hex_data(v: &Value) -> Result<Vec<u8>, ProviderError> {
    let s = v
        .as_str()
        .ok_or_else(|| ProviderError::internal("expected hex string result"))?;
    hex::decode(strip_0x(s)).map_err(|e| ProviderError::internal(format!("bad hex data: {e}")))
}

pub fn encode_hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities_parse_from_hex_and_numbers() {
        assert_eq!(parse_quantity(&json!("0xa4ec")), Some(42220));
        assert_eq!(parse_quantity(&json!("0x0")), Some(0));
        assert_eq!(parse_quantity(&json!(7)), Some(7));
        assert_eq!(parse_quantity(&json!("zz")), None);
        assert_eq!(parse_quantity(&Value::Null), None);
    }

    #[test]
    fn u256_parses_wei_balances() {
        let v = parse_u256(&json!("0xde0b6b3a7640000")).unwrap();
        assert_eq!(v, U256::from(1_000_000_000_000_000_000u64));
        assert_eq!(parse_u256(&json!("0x")), Some(U256::ZERO));
    }

    #[test]
    fn hex_data_roundtrips_through_strings() {
        let s = encode_hex_data(&[0xde, 0xad]);
        assert_eq!(s, "0xdead");
        assert_eq!(decode_hex_data(&json!(s)).unwrap(), vec![0xde, 0xad]);
        assert!(decode_hex_data(&json!(1)).is_err());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_chain_id_from_forno() {
        let t = HttpTransport::new("https://forno.celo.org", 8000);
        let v = t.request("eth_chainId", json!([])).await.unwrap();
        assert_eq!(parse_quantity(&v), Some(42220));
    }
}
