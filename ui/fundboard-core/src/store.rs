//! Client-side campaign cache.
//!
//! ## Refresh model
//!
//! The cache is pull-based. [`CampaignStore::bulk_load`] replaces the whole
//! sequence; [`CampaignStore::refresh_one`] re-reads one record's donated
//! total after a donation. Neither reads its own write: the caller schedules
//! one refresh a fixed delay after submitting a transaction. If the
//! transaction has not been mined by then, the refresh observes the old
//! state and the cache stays stale until the next refresh. This is a known
//! limitation of the fixed-delay policy, not an error.
//!
//! ## Partial failure
//!
//! Every per-record read during a bulk load produces a [`FetchOutcome`].
//! Failed reads are logged and skipped; the rest are kept in index order.
//! Only a failure to read the record count fails the whole load, and then
//! the cache is emptied.
//!
//! ## Concurrency
//!
//! Loads are not mutually excluded. Overlapping loads race and the last one
//! to finish wins. Locks are never held across an `.await`.
//!
//! ## Stale contexts
//!
//! [`CampaignStore::invalidate`] bumps an epoch. Reads that started under an
//! older epoch still complete, but their results are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use primitive_types::U256;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::contract::ChainReader;
use crate::error::ChainError;
use crate::types::{CampaignId, CampaignRecord};

/// Result of reading one record during a bulk load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded(CampaignRecord),
    Skipped { id: CampaignId, reason: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: Vec<CampaignId>,
    pub skipped: Vec<(CampaignId, String)>,
    /// `false` when the store was invalidated while the load was running.
    pub applied: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated { progress: u8 },
    NotCached,
    Discarded,
}

#[derive(Default)]
struct StoreState {
    campaigns: Vec<CampaignRecord>,
    loads_in_flight: usize,
    /// Set when the last applied bulk load could not read the count.
    load_error: Option<String>,
}

struct StoreShared {
    state: RwLock<StoreState>,
    epoch: AtomicU64,
    revision: watch::Sender<u64>,
}

/// Shared handle to the campaign cache.
#[derive(Clone)]
pub struct CampaignStore {
    shared: Arc<StoreShared>,
}

impl Default for CampaignStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CampaignStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(StoreShared {
                state: RwLock::new(StoreState::default()),
                epoch: AtomicU64::new(0),
                revision,
            }),
        }
    }

    pub fn campaigns(&self) -> Vec<CampaignRecord> {
        self.shared.state.read().campaigns.clone()
    }

    pub fn get(&self, id: CampaignId) -> Option<CampaignRecord> {
        self.shared
            .state
            .read()
            .campaigns
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// Why the last bulk load produced nothing, if it failed outright. An
    /// empty cache with no error means the contract has no campaigns.
    pub fn load_error(&self) -> Option<String> {
        self.shared.state.read().load_error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.read().loads_in_flight > 0
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Drops the results of every read currently in flight.
    pub fn invalidate(&self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
    }

    fn epoch(&self) -> u64 {
        self.shared.epoch.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.shared.revision.send_modify(|r| *r += 1);
    }

    fn set_loading(&self, starting: bool) {
        {
            let mut st = self.shared.state.write();
            if starting {
                st.loads_in_flight += 1;
            } else {
                st.loads_in_flight = st.loads_in_flight.saturating_sub(1);
            }
        }
        self.bump();
    }

    /// Replaces the cache with every record the contract currently reports.
    pub async fn bulk_load(&self, reader: &dyn ChainReader) -> Result<LoadReport, ChainError> {
        let epoch = self.epoch();
        self.set_loading(true);
        let fetched = fetch_all(reader).await;
        let current = self.epoch() == epoch;

        let result = match fetched {
            Ok(outcomes) => {
                let mut report = LoadReport {
                    applied: current,
                    ..LoadReport::default()
                };
                let mut campaigns = Vec::with_capacity(outcomes.len());
                for outcome in outcomes {
                    match outcome {
                        FetchOutcome::Loaded(record) => {
                            report.loaded.push(record.id);
                            campaigns.push(record);
                        }
                        FetchOutcome::Skipped { id, reason } => report.skipped.push((id, reason)),
                    }
                }
                if current {
                    let mut st = self.shared.state.write();
                    st.campaigns = campaigns;
                    st.load_error = None;
                }
                info!(
                    loaded = report.loaded.len(),
                    skipped = report.skipped.len(),
                    applied = current,
                    "campaigns loaded"
                );
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "failed to load campaigns");
                if current {
                    let mut st = self.shared.state.write();
                    st.campaigns.clear();
                    st.load_error = Some(e.to_string());
                }
                Err(e)
            }
        };
        self.set_loading(false);
        result
    }

    /// Re-reads the donated total of one cached record.
    pub async fn refresh_one(
        &self,
        reader: &dyn ChainReader,
        id: CampaignId,
    ) -> Result<RefreshOutcome, ChainError> {
        if self.get(id).is_none() {
            return Ok(RefreshOutcome::NotCached);
        }
        let epoch = self.epoch();
        let total = reader.get_total_donated(id).await.map_err(|e| {
            warn!(id, error = %e, "failed to refresh campaign");
            e
        })?;
        if self.epoch() != epoch {
            return Ok(RefreshOutcome::Discarded);
        }
        let outcome = self.apply_total(id, total);
        if matches!(outcome, RefreshOutcome::Updated { .. }) {
            self.bump();
        }
        Ok(outcome)
    }

    fn apply_total(&self, id: CampaignId, total: U256) -> RefreshOutcome {
        let mut st = self.shared.state.write();
        match st.campaigns.iter_mut().find(|c| c.id == id) {
            Some(record) => {
                record.set_total_donated(total);
                RefreshOutcome::Updated {
                    progress: record.progress,
                }
            }
            None => RefreshOutcome::NotCached,
        }
    }
}

/// Reads the count and then each record in turn.
pub async fn fetch_all(reader: &dyn ChainReader) -> Result<Vec<FetchOutcome>, ChainError> {
    let count = reader.total_donations().await?;
    if count > U256::from(u64::MAX) {
        return Err(ChainError::Decode(format!("campaign count {count} out of range")));
    }
    let count = count.low_u64();

    let mut outcomes = Vec::new();
    for id in 0..count {
        let outcome = match reader.get_donation(id).await {
            Ok(raw) => FetchOutcome::Loaded(CampaignRecord::from_chain(id, raw)),
            Err(e) => {
                warn!(id, error = %e, "skipping campaign");
                FetchOutcome::Skipped {
                    id,
                    reason: e.to_string(),
                }
            }
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
