//! Wallet session: connector detection, connection state, signing capability.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use primitive_types::{H256, U256};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::abi;
use crate::config::AppConfig;
use crate::contract::{ChainWriter, ContractSigner};
use crate::error::{ChainError, WalletError};
use crate::notify::ToastChannel;
use crate::rpc::{HttpTransport, RpcTransport};
use crate::types::{Address, Severity};

/// Current wallet connection state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

/// Outcome of comparing the wallet's chain to the one the app expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkStatus {
    Disconnected,
    Correct,
    Wrong { actual: u64 },
}

/// Unsigned call the wallet is asked to sign and broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Vec<u8>,
}

/// Capabilities of an external wallet provider.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;
    async fn chain_id(&self) -> Result<u64, WalletError>;
    async fn balance(&self, account: Address) -> Result<U256, WalletError>;
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<H256, WalletError>;
}

// ---------------------------------------------------------------------------
// RpcWalletProvider
// ---------------------------------------------------------------------------

/// Wallet provider reached through its JSON-RPC endpoint.
pub struct RpcWalletProvider<T> {
    transport: T,
}

impl<T: RpcTransport> RpcWalletProvider<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        self.transport
            .request(method, params)
            .await
            .map_err(ChainError::into_wallet_error)
    }
}

fn decode_err(e: impl std::fmt::Display) -> WalletError {
    WalletError::Provider(format!("unexpected wallet response: {e}"))
}

#[async_trait]
impl<T: RpcTransport> WalletProvider for RpcWalletProvider<T> {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let result = self.call("eth_requestAccounts", json!([])).await?;
        let list = result.as_array().ok_or_else(|| decode_err("accounts not a list"))?;
        list.iter()
            .map(|v| {
                let text = v.as_str().ok_or_else(|| decode_err("account not a string"))?;
                abi::parse_address(text).map_err(decode_err)
            })
            .collect()
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        let result = self.call("eth_chainId", json!([])).await?;
        let text = result.as_str().ok_or_else(|| decode_err("chain id not a string"))?;
        let id = abi::parse_quantity(text).map_err(decode_err)?;
        if id > U256::from(u64::MAX) {
            return Err(decode_err("chain id out of range"));
        }
        Ok(id.low_u64())
    }

    async fn balance(&self, account: Address) -> Result<U256, WalletError> {
        let result = self
            .call("eth_getBalance", json!([abi::format_address(&account), "latest"]))
            .await?;
        let text = result.as_str().ok_or_else(|| decode_err("balance not a string"))?;
        abi::parse_quantity(text).map_err(decode_err)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<H256, WalletError> {
        let params = json!([{
            "from": abi::format_address(&tx.from),
            "to": abi::format_address(&tx.to),
            "data": abi::to_hex(&tx.data),
        }]);
        let result = self.call("eth_sendTransaction", params).await?;
        let text = result.as_str().ok_or_else(|| decode_err("hash not a string"))?;
        let bytes = abi::from_hex(text).map_err(decode_err)?;
        if bytes.len() != 32 {
            return Err(decode_err("hash is not 32 bytes"));
        }
        Ok(H256::from_slice(&bytes))
    }
}

// ---------------------------------------------------------------------------
// MockWalletProvider
// ---------------------------------------------------------------------------

/// Scriptable wallet provider for tests.
pub struct MockWalletProvider {
    accounts: Vec<Address>,
    chain_id: Mutex<u64>,
    balance: Mutex<U256>,
    connect_error: Mutex<Option<WalletError>>,
    send_error: Mutex<Option<WalletError>>,
    sent: Mutex<Vec<TransactionRequest>>,
    connect_calls: Mutex<usize>,
}

impl MockWalletProvider {
    pub fn new(accounts: Vec<Address>, chain_id: u64) -> Self {
        Self {
            accounts,
            chain_id: Mutex::new(chain_id),
            balance: Mutex::new(U256::zero()),
            connect_error: Mutex::new(None),
            send_error: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            connect_calls: Mutex::new(0),
        }
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        *self.chain_id.lock() = chain_id;
    }

    pub fn set_balance(&self, balance: U256) {
        *self.balance.lock() = balance;
    }

    pub fn fail_connect(&self, error: Option<WalletError>) {
        *self.connect_error.lock() = error;
    }

    pub fn fail_send(&self, error: Option<WalletError>) {
        *self.send_error.lock() = error;
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().clone()
    }

    pub fn connect_calls(&self) -> usize {
        *self.connect_calls.lock()
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        *self.connect_calls.lock() += 1;
        if let Some(e) = self.connect_error.lock().clone() {
            return Err(e);
        }
        Ok(self.accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(*self.chain_id.lock())
    }

    async fn balance(&self, _account: Address) -> Result<U256, WalletError> {
        Ok(*self.balance.lock())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<H256, WalletError> {
        if let Some(e) = self.send_error.lock().clone() {
            return Err(e);
        }
        let mut sent = self.sent.lock();
        sent.push(tx);
        Ok(H256::from_low_u64_be(sent.len() as u64))
    }
}

// ---------------------------------------------------------------------------
// Connectors and detection
// ---------------------------------------------------------------------------

/// A configured wallet connector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectorSpec {
    pub id: String,
    pub name: String,
    pub icon: String,
    /// Injected provider globals, any of which makes this connector usable.
    pub provider_globals: Vec<String>,
    /// `(global, flag)` pairs: the global also counts when its provider
    /// reports the flag, as a shared `ethereum` provider does.
    pub flagged_globals: Vec<(String, String)>,
}

/// A connector whose provider is actually present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectedWallet {
    pub id: String,
    pub name: String,
    pub icon: String,
}

pub fn default_connectors() -> Vec<ConnectorSpec> {
    vec![
        ConnectorSpec {
            id: "metaMask".into(),
            name: "MetaMask".into(),
            icon: "🦊".into(),
            provider_globals: vec!["ethereum".into()],
            flagged_globals: vec![],
        },
        ConnectorSpec {
            id: "coinbaseWallet".into(),
            name: "Coinbase Wallet".into(),
            icon: "💙".into(),
            provider_globals: vec!["CoinbaseWalletProvider".into()],
            flagged_globals: vec![("ethereum".into(), "isCoinbaseWallet".into())],
        },
    ]
}

/// Wallet providers injected into this process, keyed by global name.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn WalletProvider>>,
    flags: HashMap<String, HashSet<String>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One JSON-RPC provider per `FUNDBOARD_INJECTED_<GLOBAL>` entry.
    pub fn from_config(config: &AppConfig) -> Result<Self, ChainError> {
        let mut registry = Self::new();
        for (global, url) in &config.injected_providers {
            let transport = HttpTransport::new(url.clone(), config.rpc_timeout, None)?;
            registry.insert(global.clone(), Arc::new(RpcWalletProvider::new(transport)));
        }
        for (global, flags) in &config.provider_flags {
            registry.set_flags(global.clone(), flags.iter().cloned());
        }
        Ok(registry)
    }

    pub fn insert(&mut self, global: impl Into<String>, provider: Arc<dyn WalletProvider>) {
        self.providers.insert(global.into(), provider);
    }

    /// Records the identity flags (`isCoinbaseWallet`, ...) the provider
    /// under `global` reports about itself.
    pub fn set_flags(&mut self, global: impl Into<String>, flags: impl IntoIterator<Item = String>) {
        self.flags.insert(global.into(), flags.into_iter().collect());
    }

    pub fn contains(&self, global: &str) -> bool {
        self.providers.contains_key(global)
    }

    fn has_flag(&self, global: &str, flag: &str) -> bool {
        self.flags.get(global).is_some_and(|f| f.contains(flag))
    }

    fn lookup(&self, spec: &ConnectorSpec) -> Option<Arc<dyn WalletProvider>> {
        let flagged = spec
            .flagged_globals
            .iter()
            .filter(|(g, flag)| self.has_flag(g, flag))
            .map(|(g, _)| g);
        spec.provider_globals
            .iter()
            .chain(flagged)
            .find_map(|g| self.providers.get(g).cloned())
    }
}

/// Configured connectors that have a provider present, in configured order.
pub fn detect_connectors(specs: &[ConnectorSpec], registry: &ProviderRegistry) -> Vec<DetectedWallet> {
    specs
        .iter()
        .filter(|s| registry.lookup(s).is_some())
        .map(|s| DetectedWallet {
            id: s.id.clone(),
            name: s.name.clone(),
            icon: s.icon.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// WalletSession
// ---------------------------------------------------------------------------

/// What a write flow needs from the wallet at submission time.
#[derive(Clone, Default)]
pub struct WalletContext {
    pub account: Option<Address>,
    pub signer: Option<Arc<dyn ChainWriter>>,
}

impl WalletContext {
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
    pub connector: Option<String>,
}

struct SessionState {
    status: ConnectionStatus,
    account: Option<Address>,
    chain_id: Option<u64>,
    connector: Option<String>,
    provider: Option<Arc<dyn WalletProvider>>,
}

struct SessionShared {
    state: RwLock<SessionState>,
    connectors: Vec<ConnectorSpec>,
    registry: ProviderRegistry,
    contract: Address,
    revision: watch::Sender<u64>,
}

/// Shared handle to the wallet connection.
#[derive(Clone)]
pub struct WalletSession {
    shared: Arc<SessionShared>,
}

impl WalletSession {
    pub fn new(connectors: Vec<ConnectorSpec>, registry: ProviderRegistry, contract: Address) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(SessionShared {
                state: RwLock::new(SessionState {
                    status: ConnectionStatus::Disconnected,
                    account: None,
                    chain_id: None,
                    connector: None,
                    provider: None,
                }),
                connectors,
                registry,
                contract,
                revision,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    fn bump(&self) {
        self.shared.revision.send_modify(|r| *r += 1);
    }

    pub fn available_connectors(&self) -> Vec<DetectedWallet> {
        detect_connectors(&self.shared.connectors, &self.shared.registry)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let st = self.shared.state.read();
        SessionSnapshot {
            status: st.status.clone(),
            account: st.account,
            chain_id: st.chain_id,
            connector: st.connector.clone(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state.read().status == ConnectionStatus::Connected
    }

    /// Single connection attempt. Any failure other than an attempt already
    /// being in flight produces exactly one error toast; nothing is retried.
    pub async fn connect(
        &self,
        connector_id: &str,
        toasts: &ToastChannel,
    ) -> Result<Address, WalletError> {
        let result = self.try_connect(connector_id).await;
        if let Err(e) = &result {
            if *e != WalletError::ConnectInFlight {
                toasts.add_toast(format!("Failed to connect wallet: {e}"), Severity::Error);
            }
        }
        result
    }

    async fn try_connect(&self, connector_id: &str) -> Result<Address, WalletError> {
        let spec = self
            .shared
            .connectors
            .iter()
            .find(|c| c.id == connector_id)
            .ok_or_else(|| WalletError::UnknownConnector(connector_id.to_string()))?;
        let provider = self
            .shared
            .registry
            .lookup(spec)
            .ok_or_else(|| WalletError::NotInstalled(spec.name.clone()))?;

        {
            let mut st = self.shared.state.write();
            if st.status == ConnectionStatus::Connecting {
                return Err(WalletError::ConnectInFlight);
            }
            st.status = ConnectionStatus::Connecting;
        }
        self.bump();

        let outcome = async {
            let accounts = provider.request_accounts().await?;
            let account = accounts.first().copied().ok_or(WalletError::NoAccounts)?;
            let chain_id = provider.chain_id().await?;
            Ok::<_, WalletError>((account, chain_id))
        }
        .await;

        let result = {
            let mut st = self.shared.state.write();
            if st.status != ConnectionStatus::Connecting {
                // Disconnected while the request was outstanding.
                return Err(WalletError::Rejected("connection cancelled".into()));
            }
            match outcome {
                Ok((account, chain_id)) => {
                    st.status = ConnectionStatus::Connected;
                    st.account = Some(account);
                    st.chain_id = Some(chain_id);
                    st.connector = Some(spec.id.clone());
                    st.provider = Some(provider);
                    info!(connector = %spec.name, account = %abi::format_address(&account), chain_id, "wallet connected");
                    Ok(account)
                }
                Err(e) => {
                    warn!(connector = %spec.name, error = %e, "wallet connection failed");
                    st.status = ConnectionStatus::Error(e.to_string());
                    st.account = None;
                    st.chain_id = None;
                    st.connector = None;
                    st.provider = None;
                    Err(e)
                }
            }
        };
        self.bump();
        result
    }

    pub fn disconnect(&self) {
        {
            let mut st = self.shared.state.write();
            st.status = ConnectionStatus::Disconnected;
            st.account = None;
            st.chain_id = None;
            st.connector = None;
            st.provider = None;
        }
        info!("wallet disconnected");
        self.bump();
    }

    pub fn network_status(&self, expected_chain_id: u64) -> NetworkStatus {
        let st = self.shared.state.read();
        match (&st.status, st.chain_id) {
            (ConnectionStatus::Connected, Some(id)) if id == expected_chain_id => NetworkStatus::Correct,
            (ConnectionStatus::Connected, Some(id)) => NetworkStatus::Wrong { actual: id },
            _ => NetworkStatus::Disconnected,
        }
    }

    /// Re-reads the provider's active chain.
    pub async fn sync_chain(&self) -> Result<Option<u64>, WalletError> {
        let provider = self.shared.state.read().provider.clone();
        let Some(provider) = provider else {
            return Ok(None);
        };
        let chain_id = provider.chain_id().await?;
        let changed = {
            let mut st = self.shared.state.write();
            let changed = st.provider.is_some() && st.chain_id != Some(chain_id);
            if changed {
                st.chain_id = Some(chain_id);
            }
            changed
        };
        if changed {
            self.bump();
        }
        Ok(Some(chain_id))
    }

    /// Native balance of the active account; `None` when disconnected.
    pub async fn balance(&self) -> Result<Option<U256>, WalletError> {
        let (provider, account) = {
            let st = self.shared.state.read();
            (st.provider.clone(), st.account)
        };
        match (provider, account) {
            (Some(p), Some(a)) => p.balance(a).await.map(Some),
            _ => Ok(None),
        }
    }

    pub fn context(&self) -> WalletContext {
        let st = self.shared.state.read();
        if st.status != ConnectionStatus::Connected {
            return WalletContext::default();
        }
        let signer = match (&st.provider, st.account) {
            (Some(p), Some(a)) => {
                Some(Arc::new(ContractSigner::new(p.clone(), self.shared.contract, a))
                    as Arc<dyn ChainWriter>)
            }
            _ => None,
        };
        WalletContext {
            account: st.account,
            signer,
        }
    }
}
