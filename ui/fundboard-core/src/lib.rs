//! Client-side state for the FundBoard crowdfunding contract: the campaign
//! cache, wallet session, toast queue and the create/donate flows. The
//! desktop UI in `fundboard-ui` renders these; nothing here depends on it.

pub mod abi;
pub mod actions;
pub mod config;
pub mod contract;
pub mod error;
pub mod format;
pub mod notify;
pub mod rpc;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod wallet;

pub use actions::{Actions, CreateCampaignForm, DonateForm, SubmitOutcome};
pub use config::AppConfig;
pub use contract::{ChainReader, ChainWriter, ContractSigner, FundingContract, MockChain};
pub use error::{AbiError, ChainError, ConfigError, WalletError};
pub use notify::{Toast, ToastChannel, ToastId};
pub use scheduler::{ManualScheduler, Scheduler, TaskHandle, TokioScheduler};
pub use store::{CampaignStore, FetchOutcome, LoadReport, RefreshOutcome};
pub use types::{Address, CampaignId, CampaignRecord, OnChainCampaign, PendingTx, Severity};
pub use wallet::{
    ConnectionStatus, NetworkStatus, ProviderRegistry, WalletContext, WalletProvider,
    WalletSession,
};
