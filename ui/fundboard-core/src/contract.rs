//! Read and write clients for the funding contract.
//!
//! ```text
//! ChainReader ── FundingContract ── eth_call ──────────────▶ RPC endpoint
//! ChainWriter ── ContractSigner ─── eth_sendTransaction ──▶ wallet provider
//! ```
//!
//! Both clients are stateless and perform exactly one request per call.
//! [`MockChain`] implements both traits in memory for tests.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use primitive_types::{H256, U256};
use serde_json::json;

use crate::abi::{self, Token};
use crate::error::ChainError;
use crate::rpc::RpcTransport;
use crate::types::{Address, CampaignId, OnChainCampaign, PendingTx};
use crate::wallet::{TransactionRequest, WalletProvider};

/// The contract's public view functions.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn total_donations(&self) -> Result<U256, ChainError>;
    async fn get_donation(&self, id: CampaignId) -> Result<OnChainCampaign, ChainError>;
    async fn get_total_donated(&self, id: CampaignId) -> Result<U256, ChainError>;
}

/// The contract's state-changing functions. A returned [`PendingTx`] only
/// means the transaction was accepted for submission.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    async fn create_donation(
        &self,
        target_amount: U256,
        description: &str,
    ) -> Result<PendingTx, ChainError>;
    async fn donate(&self, id: CampaignId, amount: U256) -> Result<PendingTx, ChainError>;
}

// ---------------------------------------------------------------------------
// FundingContract: reads over eth_call
// ---------------------------------------------------------------------------

pub struct FundingContract<T> {
    transport: T,
    address: Address,
}

impl<T: RpcTransport> FundingContract<T> {
    pub fn new(transport: T, address: Address) -> Self {
        Self { transport, address }
    }

    async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        let params = json!([
            { "to": abi::format_address(&self.address), "data": abi::to_hex(&data) },
            "latest"
        ]);
        let result = self.transport.request("eth_call", params).await?;
        let text = result
            .as_str()
            .ok_or_else(|| ChainError::Decode("eth_call result is not a string".into()))?;
        Ok(abi::from_hex(text)?)
    }
}

#[async_trait]
impl<T: RpcTransport> ChainReader for FundingContract<T> {
    async fn total_donations(&self) -> Result<U256, ChainError> {
        let out = self.call(abi::encode_call(abi::TOTAL_DONATIONS, &[])).await?;
        Ok(abi::decode_uint(&out, 0)?)
    }

    async fn get_donation(&self, id: CampaignId) -> Result<OnChainCampaign, ChainError> {
        let data = abi::encode_call(abi::GET_DONATION, &[Token::Uint(U256::from(id))]);
        let out = self.call(data).await?;
        Ok(abi::decode_campaign(&out)?)
    }

    async fn get_total_donated(&self, id: CampaignId) -> Result<U256, ChainError> {
        let data = abi::encode_call(abi::GET_TOTAL_DONATED, &[Token::Uint(U256::from(id))]);
        let out = self.call(data).await?;
        Ok(abi::decode_uint(&out, 0)?)
    }
}

// ---------------------------------------------------------------------------
// ContractSigner: writes through the connected wallet
// ---------------------------------------------------------------------------

/// Write client bound to one account of a connected wallet provider.
pub struct ContractSigner {
    provider: Arc<dyn WalletProvider>,
    contract: Address,
    from: Address,
}

impl ContractSigner {
    pub fn new(provider: Arc<dyn WalletProvider>, contract: Address, from: Address) -> Self {
        Self {
            provider,
            contract,
            from,
        }
    }

    async fn send(&self, data: Vec<u8>) -> Result<PendingTx, ChainError> {
        let hash = self
            .provider
            .send_transaction(TransactionRequest {
                from: self.from,
                to: self.contract,
                data,
            })
            .await?;
        Ok(PendingTx { hash })
    }
}

#[async_trait]
impl ChainWriter for ContractSigner {
    async fn create_donation(
        &self,
        target_amount: U256,
        description: &str,
    ) -> Result<PendingTx, ChainError> {
        let data = abi::encode_call(
            abi::CREATE_DONATION,
            &[Token::Uint(target_amount), Token::String(description.to_string())],
        );
        self.send(data).await
    }

    async fn donate(&self, id: CampaignId, amount: U256) -> Result<PendingTx, ChainError> {
        let data = abi::encode_call(
            abi::DONATE,
            &[Token::Uint(U256::from(id)), Token::Uint(amount)],
        );
        self.send(data).await
    }
}

// ---------------------------------------------------------------------------
// MockChain
// ---------------------------------------------------------------------------

/// In-memory contract for tests.
///
/// Reads are served from a campaign list. Writes mutate it immediately
/// unless [`MockChain::apply_writes`] is switched off. Every call is recorded.
pub struct MockChain {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    campaigns: Vec<OnChainCampaign>,
    failing: HashSet<CampaignId>,
    count_error: Option<String>,
    write_error: Option<String>,
    apply_writes: bool,
    calls: Vec<String>,
    tx_counter: u64,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                apply_writes: true,
                ..MockState::default()
            }),
        }
    }

    pub fn with_campaigns(campaigns: impl IntoIterator<Item = OnChainCampaign>) -> Self {
        let chain = Self::new();
        for c in campaigns {
            chain.push_campaign(c);
        }
        chain
    }

    pub fn push_campaign(&self, campaign: OnChainCampaign) -> CampaignId {
        let mut st = self.state.lock();
        st.campaigns.push(campaign);
        (st.campaigns.len() - 1) as CampaignId
    }

    /// Makes every `getDonation` / `getTotalDonated` read of `id` fail.
    pub fn fail_record(&self, id: CampaignId) {
        self.state.lock().failing.insert(id);
    }

    pub fn fail_count(&self, reason: impl Into<String>) {
        self.state.lock().count_error = Some(reason.into());
    }

    /// Makes every write fail with `reason` (e.g. a signer rejection).
    pub fn reject_writes(&self, reason: Option<String>) {
        self.state.lock().write_error = reason;
    }

    /// When `false`, writes are accepted but not reflected in reads,
    /// emulating a transaction that has not been mined yet.
    pub fn apply_writes(&self, apply: bool) {
        self.state.lock().apply_writes = apply;
    }

    pub fn set_total_donated(&self, id: CampaignId, total: U256) {
        if let Some(c) = self.state.lock().campaigns.get_mut(id as usize) {
            c.total_donated = total;
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn read(&self, call: String, id: CampaignId) -> Result<OnChainCampaign, ChainError> {
        let mut st = self.state.lock();
        st.calls.push(call);
        if st.failing.contains(&id) {
            return Err(ChainError::Transport(format!("mock read of {id} failed")));
        }
        st.campaigns.get(id as usize).cloned().ok_or(ChainError::Rpc {
            code: 3,
            message: "execution reverted: invalid donation id".into(),
        })
    }

    fn next_tx(st: &mut MockState) -> PendingTx {
        st.tx_counter += 1;
        PendingTx {
            hash: H256::from_low_u64_be(st.tx_counter),
        }
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn total_donations(&self) -> Result<U256, ChainError> {
        let mut st = self.state.lock();
        st.calls.push("totalDonations".into());
        if let Some(reason) = &st.count_error {
            return Err(ChainError::Transport(reason.clone()));
        }
        Ok(U256::from(st.campaigns.len()))
    }

    async fn get_donation(&self, id: CampaignId) -> Result<OnChainCampaign, ChainError> {
        self.read(format!("getDonation({id})"), id)
    }

    async fn get_total_donated(&self, id: CampaignId) -> Result<U256, ChainError> {
        self.read(format!("getTotalDonated({id})"), id)
            .map(|c| c.total_donated)
    }
}

#[async_trait]
impl ChainWriter for MockChain {
    async fn create_donation(
        &self,
        target_amount: U256,
        description: &str,
    ) -> Result<PendingTx, ChainError> {
        let mut st = self.state.lock();
        st.calls.push(format!("createDonation({target_amount})"));
        if let Some(reason) = &st.write_error {
            return Err(ChainError::Transport(reason.clone()));
        }
        if st.apply_writes {
            let timestamp = 1_700_000_000 + st.campaigns.len() as u64;
            st.campaigns.push(OnChainCampaign {
                target_amount,
                total_donated: U256::zero(),
                creator: Address::repeat_byte(0xcc),
                timestamp,
                description: description.to_string(),
            });
        }
        Ok(Self::next_tx(&mut st))
    }

    async fn donate(&self, id: CampaignId, amount: U256) -> Result<PendingTx, ChainError> {
        let mut st = self.state.lock();
        st.calls.push(format!("donate({id},{amount})"));
        if let Some(reason) = &st.write_error {
            return Err(ChainError::Transport(reason.clone()));
        }
        let apply = st.apply_writes;
        let campaign = st.campaigns.get_mut(id as usize).ok_or(ChainError::Rpc {
            code: 3,
            message: "execution reverted: invalid donation id".into(),
        })?;
        if apply {
            campaign.total_donated = campaign.total_donated.saturating_add(amount);
        }
        Ok(Self::next_tx(&mut st))
    }
}

const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn check() {
        assert_send_sync::<MockChain>();
        assert_send_sync::<ContractSigner>();
    }
    let _ = check;
};
