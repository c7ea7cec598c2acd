//! Campaign records and the progress metric derived from them.

use primitive_types::{H160, H256, U256, U512};

/// 20-byte account identifier.
pub type Address = H160;

/// Index assigned to a campaign by the contract at creation time.
pub type CampaignId = u64;

/// Raw `getDonation(id)` tuple as returned by the contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnChainCampaign {
    pub target_amount: U256,
    pub total_donated: U256,
    pub creator: Address,
    pub timestamp: u64,
    pub description: String,
}

/// Client-local snapshot of one campaign.
///
/// `progress` is always derived from `total_donated` and `target_amount`;
/// the only way to change either amount is through [`CampaignRecord::set_total_donated`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CampaignRecord {
    pub id: CampaignId,
    pub target_amount: U256,
    pub total_donated: U256,
    pub creator: Address,
    pub timestamp: u64,
    pub description: String,
    pub progress: u8,
}

impl CampaignRecord {
    pub fn from_chain(id: CampaignId, raw: OnChainCampaign) -> Self {
        let progress = compute_progress(raw.total_donated, raw.target_amount);
        Self {
            id,
            target_amount: raw.target_amount,
            total_donated: raw.total_donated,
            creator: raw.creator,
            timestamp: raw.timestamp,
            description: raw.description,
            progress,
        }
    }

    /// Replaces the donated total and recomputes progress against the
    /// (immutable) target.
    pub fn set_total_donated(&mut self, total_donated: U256) {
        self.total_donated = total_donated;
        self.progress = compute_progress(total_donated, self.target_amount);
    }
}

/// `min(100, floor(total * 100 / target))`, or 0 for a zero target.
///
/// The product is taken at 512 bits so any pair of `U256` inputs is exact.
pub fn compute_progress(total_donated: U256, target_amount: U256) -> u8 {
    if target_amount.is_zero() {
        return 0;
    }
    let scaled = total_donated.full_mul(U256::from(100u8));
    let pct = scaled / U512::from(target_amount);
    if pct >= U512::from(100u8) {
        100
    } else {
        pct.low_u64() as u8
    }
}

/// Handle returned once a transaction has been accepted for submission.
/// It says nothing about whether the transaction has been mined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: H256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn icon(self) -> &'static str {
        match self {
            Self::Success => "✓",
            Self::Error => "✕",
            Self::Warning => "⚠",
            Self::Info => "ℹ",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}
