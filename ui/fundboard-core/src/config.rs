//! Runtime configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::abi;
use crate::error::ConfigError;
use crate::types::Address;

const PREFIX: &str = "FUNDBOARD_";
const INJECTED_PREFIX: &str = "FUNDBOARD_INJECTED_";
const FLAGS_PREFIX: &str = "FUNDBOARD_PROVIDER_FLAGS_";

pub const DEFAULT_RPC_URL: &str = "https://sepolia.base.org";
pub const DEFAULT_CHAIN_ID: u64 = 84532;
pub const DEFAULT_CHAIN_NAME: &str = "Base Sepolia";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Endpoint used for contract reads.
    pub rpc_url: String,
    pub contract_address: Address,
    /// Network the app expects the wallet to be on.
    pub chain_id: u64,
    pub chain_name: String,
    pub currency_symbol: String,
    /// Delay between a write being accepted and the one refresh that follows it.
    pub refresh_delay: Duration,
    pub toast_duration: Duration,
    pub rpc_timeout: Duration,
    /// `(global name, endpoint)` pairs for injected wallet providers.
    pub injected_providers: Vec<(String, String)>,
    /// `(global name, flags)` a provider reports about itself, e.g.
    /// `isCoinbaseWallet` on a shared `ethereum` provider.
    pub provider_flags: Vec<(String, Vec<String>)>,
    pub api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with(PREFIX))
            .collect();
        Self::from_vars(vars)
    }

    /// Builds the config from explicit `(name, value)` pairs.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self, ConfigError> {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        let get = |name: &str| {
            vars.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let contract_raw =
            get("FUNDBOARD_CONTRACT_ADDRESS").ok_or(ConfigError::Missing("FUNDBOARD_CONTRACT_ADDRESS"))?;
        let contract_address = abi::parse_address(&contract_raw).map_err(|e| ConfigError::Invalid {
            var: "FUNDBOARD_CONTRACT_ADDRESS".into(),
            reason: e.to_string(),
        })?;

        let mut injected_providers: Vec<(String, String)> = vars
            .iter()
            .filter_map(|(k, v)| {
                let global = k.strip_prefix(INJECTED_PREFIX)?;
                let url = v.trim();
                (!global.is_empty() && !url.is_empty())
                    .then(|| (canonical_global(global), url.to_string()))
            })
            .collect();
        injected_providers.sort();

        let mut provider_flags: Vec<(String, Vec<String>)> = vars
            .iter()
            .filter_map(|(k, v)| {
                let global = k.strip_prefix(FLAGS_PREFIX)?;
                let flags: Vec<String> = v
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_string)
                    .collect();
                (!global.is_empty() && !flags.is_empty()).then(|| (canonical_global(global), flags))
            })
            .collect();
        provider_flags.sort();

        Ok(Self {
            rpc_url: get("FUNDBOARD_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            contract_address,
            chain_id: parse_num(get("FUNDBOARD_CHAIN_ID"), "FUNDBOARD_CHAIN_ID", DEFAULT_CHAIN_ID)?,
            chain_name: get("FUNDBOARD_CHAIN_NAME").unwrap_or_else(|| DEFAULT_CHAIN_NAME.to_string()),
            currency_symbol: get("FUNDBOARD_CURRENCY_SYMBOL").unwrap_or_else(|| "ETH".to_string()),
            refresh_delay: Duration::from_millis(parse_num(
                get("FUNDBOARD_REFRESH_DELAY_MS"),
                "FUNDBOARD_REFRESH_DELAY_MS",
                2000,
            )?),
            toast_duration: Duration::from_millis(parse_num(
                get("FUNDBOARD_TOAST_DURATION_MS"),
                "FUNDBOARD_TOAST_DURATION_MS",
                5000,
            )?),
            rpc_timeout: Duration::from_millis(parse_num(
                get("FUNDBOARD_RPC_TIMEOUT_MS"),
                "FUNDBOARD_RPC_TIMEOUT_MS",
                10_000,
            )?),
            injected_providers,
            provider_flags,
            api_key: get("FUNDBOARD_API_KEY"),
        })
    }
}

/// Env var names are upper case; the well-known provider globals are not.
fn canonical_global(raw: &str) -> String {
    match raw.to_ascii_uppercase().as_str() {
        "ETHEREUM" => "ethereum".to_string(),
        "COINBASEWALLETPROVIDER" => "CoinbaseWalletProvider".to_string(),
        _ => raw.to_string(),
    }
}

fn parse_num(value: Option<String>, var: &str, default: u64) -> Result<u64, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            reason: format!("expected an integer, got {v:?}"),
        }),
    }
}
