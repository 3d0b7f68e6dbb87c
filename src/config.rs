use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Static description of the target chain. No logic beyond formatting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub ticker: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    pub explorer_url: String,
}

fn default_decimals() -> u8 {
    18
}

impl NetworkConfig {
    pub fn celo_mainnet() -> Self {
        Self {
            chain_id: 42220,
            name: "Celo Mainnet".to_string(),
            rpc_url: "https://forno.celo.org".to_string(),
            ticker: "CELO".to_string(),
            decimals: 18,
            explorer_url: "https://celoscan.io".to_string(),
        }
    }

    pub fn celo_alfajores() -> Self {
        Self {
            chain_id: 44787,
            name: "Celo Alfajores Testnet".to_string(),
            rpc_url: "https://alfajores-forno.celo-testnet.org".to_string(),
            ticker: "CELO".to_string(),
            decimals: 18,
            explorer_url: "https://alfajores.celoscan.io".to_string(),
        }
    }

    /// Look up a built-in network by name.
    pub fn preset(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "celo" | "mainnet" | "celo-mainnet" => Ok(Self::celo_mainnet()),
            "alfajores" | "testnet" | "celo-alfajores" => Ok(Self::celo_alfajores()),
            _ => Err(anyhow!(
                "Invalid network '{name}'. Valid options: celo, alfajores"
            )),
        }
    }

    /// Load a network description from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read network file {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let cfg: NetworkConfig = toml::from_str(raw).context("Invalid network TOML")?;
        validate_url(&cfg.rpc_url, "rpc_url")?;
        validate_url(&cfg.explorer_url, "explorer_url")?;
        Ok(cfg)
    }

    /// Chain id in the `0x`-prefixed form wallets expect.
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }

    pub fn tx_url(&self, hash: &str) -> String {
        format!("{}/tx/{hash}", self.explorer_url.trim_end_matches('/'))
    }

    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{address}", self.explorer_url.trim_end_matches('/'))
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::celo_mainnet()
    }
}

pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x1234567890123456789012345678901234567890";

/// Shared configuration flags, flattened into the CLI.
/// Configuration priority: CLI args > Environment variables > Network file > Defaults
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Built-in network preset: celo or alfajores
    #[arg(long, env = "NETWORK")]
    pub network: Option<String>,

    /// TOML file describing the target network (overrides the preset)
    #[arg(long, env = "NETWORK_FILE")]
    pub network_file: Option<PathBuf>,

    /// Read-only JSON-RPC endpoint (overrides the network's rpc_url)
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Wallet provider endpoint (EIP-1193 bridge, e.g. Frame)
    #[arg(long, env = "WALLET_RPC_URL")]
    pub wallet_rpc_url: Option<String>,

    /// Disaster report contract address
    #[arg(long, env = "CONTRACT_ADDRESS")]
    pub contract_address: Option<String>,

    /// RPC request timeout in milliseconds (1000-60000)
    #[arg(long, env = "RPC_TIMEOUT_MS")]
    pub rpc_timeout_ms: Option<u64>,

    /// Receipt polling interval in milliseconds (100-10000)
    #[arg(long, env = "RECEIPT_POLL_MS")]
    pub receipt_poll_ms: Option<u64>,

    /// Give up waiting for a receipt after this many milliseconds (5000-600000)
    #[arg(long, env = "RECEIPT_TIMEOUT_MS")]
    pub receipt_timeout_ms: Option<u64>,

    /// Wallet account/chain polling interval in milliseconds (250-60000)
    #[arg(long, env = "EVENT_POLL_MS")]
    pub event_poll_ms: Option<u64>,

    /// File holding persisted session flags
    #[arg(long, env = "STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Pinning service API key
    #[arg(long, env = "PINATA_API_KEY", hide_env_values = true)]
    pub pinata_api_key: Option<String>,

    /// Pinning service secret key
    #[arg(long, env = "PINATA_SECRET_API_KEY", hide_env_values = true)]
    pub pinata_secret_api_key: Option<String>,

    /// Require identity verification before each submission
    #[arg(long, env = "REQUIRE_VERIFICATION")]
    pub require_verification: Option<bool>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub network: NetworkConfig,
    pub wallet_rpc_url: String,
    pub contract_address: String,
    pub rpc_timeout_ms: u64,
    pub receipt_poll_ms: u64,
    pub receipt_timeout_ms: u64,
    pub event_poll_ms: u64,
    pub state_file: PathBuf,
    pub pinata_api_key: Option<String>,
    pub pinata_secret_api_key: Option<String>,
    pub require_verification: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            wallet_rpc_url: "http://127.0.0.1:1248".to_string(),
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            rpc_timeout_ms: 8000,
            receipt_poll_ms: 1000,
            receipt_timeout_ms: 120_000,
            event_poll_ms: 2000,
            state_file: PathBuf::from(".disaster-reports.json"),
            pinata_api_key: None,
            pinata_secret_api_key: None,
            require_verification: false,
        }
    }
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

/// Resolve the final configuration from parsed arguments.
pub fn resolve(args: ConfigArgs) -> Result<Config> {
    let defaults = Config::default();

    let mut network = match args.network_file {
        Some(ref path) => NetworkConfig::from_toml_file(path)?,
        None => match args.network.as_deref() {
            Some(name) => NetworkConfig::preset(name)?,
            None => NetworkConfig::default(),
        },
    };
    if let Some(url) = args.rpc_url {
        network.rpc_url = url;
    }
    validate_url(&network.rpc_url, "RPC_URL")?;

    let wallet_rpc_url = args.wallet_rpc_url.unwrap_or(defaults.wallet_rpc_url);
    validate_url(&wallet_rpc_url, "WALLET_RPC_URL")?;

    let contract_address = args
        .contract_address
        .unwrap_or(defaults.contract_address);
    validate_address(&contract_address, "CONTRACT_ADDRESS")?;

    let rpc_timeout_ms = validate_in_range(
        args.rpc_timeout_ms.unwrap_or(defaults.rpc_timeout_ms),
        1000,
        60000,
        "RPC_TIMEOUT_MS",
    )?;
    let receipt_poll_ms = validate_in_range(
        args.receipt_poll_ms.unwrap_or(defaults.receipt_poll_ms),
        100,
        10000,
        "RECEIPT_POLL_MS",
    )?;
    let receipt_timeout_ms = validate_in_range(
        args.receipt_timeout_ms.unwrap_or(defaults.receipt_timeout_ms),
        5000,
        600000,
        "RECEIPT_TIMEOUT_MS",
    )?;
    let event_poll_ms = validate_in_range(
        args.event_poll_ms.unwrap_or(defaults.event_poll_ms),
        250,
        60000,
        "EVENT_POLL_MS",
    )?;

    // Empty keys count as absent so the mock pinning path kicks in
    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

    Ok(Config {
        network,
        wallet_rpc_url,
        contract_address,
        rpc_timeout_ms,
        receipt_poll_ms,
        receipt_timeout_ms,
        event_poll_ms,
        state_file: args.state_file.unwrap_or(defaults.state_file),
        pinata_api_key: non_empty(args.pinata_api_key),
        pinata_secret_api_key: non_empty(args.pinata_secret_api_key),
        require_verification: args.require_verification.unwrap_or(false),
    })
}

/// Validate URL format (basic check)
fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

fn validate_address(addr: &str, name: &str) -> Result<()> {
    addr.parse::<alloy_primitives::Address>()
        .map(|_| ())
        .map_err(|e| anyhow!("{name} is not a valid address: {e}"))
}

impl Config {
    pub fn has_pinning_credentials(&self) -> bool {
        self.pinata_api_key.is_some() && self.pinata_secret_api_key.is_some()
    }

    /// Human-readable configuration summary.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "Network: {} (chain {})",
                self.network.name, self.network.chain_id
            ),
            format!("RPC URL: {}", self.network.rpc_url),
            format!("Wallet URL: {}", self.wallet_rpc_url),
            format!("Contract: {}", self.contract_address),
            format!("RPC Timeout: {}ms", self.rpc_timeout_ms),
            format!(
                "Receipts: poll {}ms, timeout {}ms",
                self.receipt_poll_ms, self.receipt_timeout_ms
            ),
        ];
        lines.push(if self.has_pinning_credentials() {
            "Pinning: Configured".to_string()
        } else {
            "Pinning: mock (no credentials)".to_string()
        });
        if self.require_verification {
            lines.push("Identity verification: required".to_string());
        }
        lines
    }
}
