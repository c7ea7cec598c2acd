//! End-to-end flows over the mock chain and a virtual clock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fundboard_core::actions::{MSG_CREATED, MSG_DONATED, MSG_LOAD_FAILED};
use fundboard_core::{
    Actions, Address, CampaignId, CampaignStore, ChainError, ChainWriter, CreateCampaignForm,
    DonateForm, ManualScheduler, MockChain, OnChainCampaign, PendingTx, RefreshOutcome, Severity,
    SubmitOutcome, ToastChannel, WalletContext,
};
use primitive_types::U256;
use tokio::sync::Notify;

const REFRESH: Duration = Duration::from_millis(2000);

fn campaign(target: u64, donated: u64, description: &str) -> OnChainCampaign {
    OnChainCampaign {
        target_amount: U256::from(target),
        total_donated: U256::from(donated),
        creator: Address::repeat_byte(0xab),
        timestamp: 1_700_000_000,
        description: description.into(),
    }
}

struct Harness {
    chain: Arc<MockChain>,
    sched: Arc<ManualScheduler>,
    store: CampaignStore,
    toasts: ToastChannel,
    actions: Actions,
}

impl Harness {
    fn new(chain: MockChain) -> Self {
        let chain = Arc::new(chain);
        let sched = Arc::new(ManualScheduler::new());
        let store = CampaignStore::new();
        let toasts = ToastChannel::new(sched.clone(), Duration::from_millis(5000));
        let actions = Actions::new(
            chain.clone(),
            store.clone(),
            toasts.clone(),
            sched.clone(),
            REFRESH,
        );
        Self {
            chain,
            sched,
            store,
            toasts,
            actions,
        }
    }

    fn wallet(&self) -> WalletContext {
        WalletContext {
            account: Some(Address::repeat_byte(0x01)),
            signer: Some(self.chain.clone() as Arc<dyn ChainWriter>),
        }
    }

    fn messages(&self) -> Vec<(String, Severity)> {
        self.toasts
            .toasts()
            .into_iter()
            .map(|t| (t.message, t.severity))
            .collect()
    }
}

#[tokio::test]
async fn partial_load_keeps_readable_records_in_order() {
    let chain = MockChain::with_campaigns(vec![
        campaign(100, 0, "a"),
        campaign(100, 0, "b"),
        campaign(100, 0, "c"),
    ]);
    chain.fail_record(1);
    let h = Harness::new(chain);

    let report = h.store.bulk_load(h.chain.as_ref()).await.unwrap();
    let ids: Vec<CampaignId> = h.store.campaigns().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![0, 2]);
    assert_eq!(report.skipped.len(), 1);
}

#[tokio::test]
async fn unreadable_count_is_reported_not_shown_as_empty() {
    let h = Harness::new(MockChain::new());
    h.chain.fail_count("connection refused");

    assert!(h.actions.load_campaigns().await.is_none());
    assert!(h.store.campaigns().is_empty());
    assert_eq!(
        h.store.load_error().as_deref(),
        Some("network error: connection refused")
    );
    let messages = h.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].1, Severity::Error);
    assert!(messages[0].0.starts_with(MSG_LOAD_FAILED));
    assert!(messages[0].0.contains("connection refused"));
}

#[tokio::test]
async fn empty_contract_loads_without_error() {
    let h = Harness::new(MockChain::new());
    let report = h.actions.load_campaigns().await.unwrap();
    assert!(report.loaded.is_empty());
    assert_eq!(h.store.load_error(), None);
    assert!(h.messages().is_empty());
}

#[tokio::test]
async fn donation_refresh_updates_progress() {
    let h = Harness::new(MockChain::with_campaigns(vec![campaign(200, 50, "water")]));
    h.store.bulk_load(h.chain.as_ref()).await.unwrap();
    assert_eq!(h.store.get(0).unwrap().progress, 25);

    let form = DonateForm::new();
    form.open(0);
    form.set_amount("200");
    let outcome = h.actions.submit_donate(&form, &h.wallet()).await;
    assert!(matches!(outcome, SubmitOutcome::Submitted(_)));
    assert_eq!(h.messages(), vec![(MSG_DONATED.to_string(), Severity::Success)]);
    assert!(!form.inputs().open);
    assert_eq!(form.inputs().selected, None);

    // Nothing is re-read until the delay elapses.
    assert_eq!(h.store.get(0).unwrap().progress, 25);
    h.chain.clear_calls();
    h.sched.advance(REFRESH).await;
    assert_eq!(h.chain.calls(), vec!["getTotalDonated(0)"]);

    let record = h.store.get(0).unwrap();
    assert_eq!(record.total_donated, U256::from(250));
    assert_eq!(record.progress, 100);
}

#[tokio::test]
async fn create_triggers_one_bulk_load_after_delay() {
    let h = Harness::new(MockChain::with_campaigns(vec![campaign(10, 0, "old")]));
    h.store.bulk_load(h.chain.as_ref()).await.unwrap();
    h.chain.clear_calls();

    let form = CreateCampaignForm::new();
    form.set_target_amount("500");
    form.set_description("school roof");
    let outcome = h.actions.submit_create(&form, &h.wallet()).await;
    assert_eq!(
        outcome,
        SubmitOutcome::Submitted(PendingTx {
            hash: primitive_types::H256::from_low_u64_be(1)
        })
    );
    assert_eq!(h.messages(), vec![(MSG_CREATED.to_string(), Severity::Success)]);
    assert_eq!(h.store.campaigns().len(), 1);

    h.sched.advance(REFRESH - Duration::from_millis(1)).await;
    assert_eq!(h.store.campaigns().len(), 1);

    h.sched.advance(Duration::from_millis(1)).await;
    let cached = h.store.campaigns();
    assert_eq!(cached.len(), 2);
    assert_eq!(cached[1].description, "school roof");
    assert_eq!(cached[1].target_amount, U256::from(500));
    assert_eq!(
        h.chain.calls(),
        vec![
            "createDonation(500)",
            "totalDonations",
            "getDonation(0)",
            "getDonation(1)"
        ]
    );

    // One refresh per write; nothing further is scheduled.
    h.chain.clear_calls();
    h.sched.advance(Duration::from_secs(60)).await;
    assert!(h.chain.calls().is_empty());
}

#[tokio::test]
async fn unmined_donation_leaves_cache_stale() {
    let h = Harness::new(MockChain::with_campaigns(vec![campaign(200, 50, "x")]));
    h.store.bulk_load(h.chain.as_ref()).await.unwrap();
    h.chain.apply_writes(false);

    let form = DonateForm::new();
    form.open(0);
    form.set_amount("100");
    h.actions.submit_donate(&form, &h.wallet()).await;
    h.sched.advance(REFRESH).await;
    assert_eq!(h.store.get(0).unwrap().total_donated, U256::from(50));

    // Mined later; the cache is not refreshed again on its own.
    h.chain.set_total_donated(0, U256::from(150));
    h.sched.advance(Duration::from_secs(30)).await;
    assert_eq!(h.store.get(0).unwrap().total_donated, U256::from(50));

    let outcome = h.store.refresh_one(h.chain.as_ref(), 0).await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Updated { progress: 75 });
}

#[tokio::test]
async fn invalidated_store_ignores_scheduled_refresh_results() {
    let h = Harness::new(MockChain::with_campaigns(vec![campaign(100, 0, "x")]));
    h.store.bulk_load(h.chain.as_ref()).await.unwrap();

    let form = DonateForm::new();
    form.open(0);
    form.set_amount("40");
    h.actions.submit_donate(&form, &h.wallet()).await;

    // Invalidation only affects reads already running; a later refresh
    // starts under the new epoch and applies normally.
    h.store.invalidate();
    h.sched.advance(REFRESH).await;
    assert_eq!(h.store.get(0).unwrap().progress, 40);
}

/// Writer that blocks until released. `entered` fires once the wallet has
/// the request.
struct SlowWriter {
    inner: Arc<MockChain>,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl SlowWriter {
    fn wallet(inner: Arc<MockChain>) -> (WalletContext, Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let writer = SlowWriter {
            inner,
            entered: entered.clone(),
            release: release.clone(),
        };
        let wallet = WalletContext {
            account: Some(Address::repeat_byte(0x01)),
            signer: Some(Arc::new(writer) as Arc<dyn ChainWriter>),
        };
        (wallet, entered, release)
    }
}

#[async_trait]
impl ChainWriter for SlowWriter {
    async fn create_donation(
        &self,
        target_amount: U256,
        description: &str,
    ) -> Result<PendingTx, ChainError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.create_donation(target_amount, description).await
    }

    async fn donate(&self, id: CampaignId, amount: U256) -> Result<PendingTx, ChainError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.donate(id, amount).await
    }
}

async fn settle(pending: impl Fn() -> bool) {
    for _ in 0..32 {
        if !pending() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("submission never finished");
}

#[tokio::test]
async fn double_submit_sends_one_transaction() {
    let h = Harness::new(MockChain::new());
    let (wallet, _entered, release) = SlowWriter::wallet(h.chain.clone());
    let form = CreateCampaignForm::new();
    form.set_target_amount("10");
    form.set_description("d");

    let first = h.actions.submit_create(&form, &wallet);
    let second = async {
        tokio::task::yield_now().await;
        assert!(form.is_pending());
        h.actions.submit_create(&form, &wallet).await
    };
    let unblock = async {
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        release.notify_one();
    };
    let (a, b, ()) = tokio::join!(first, second, unblock);

    assert!(matches!(a, SubmitOutcome::Submitted(_)));
    assert_eq!(b, SubmitOutcome::Busy);
    assert_eq!(h.chain.calls(), vec!["createDonation(10)"]);
    assert!(!form.is_pending());
    assert_eq!(h.messages().len(), 1);
}

#[tokio::test]
async fn create_finishes_after_its_caller_is_dropped() {
    let h = Harness::new(MockChain::new());
    let (wallet, entered, release) = SlowWriter::wallet(h.chain.clone());
    let form = Arc::new(CreateCampaignForm::new());
    form.set_target_amount("75");
    form.set_description("late reply");

    let caller = tokio::spawn({
        let actions = h.actions.clone();
        let form = form.clone();
        async move { actions.spawn_create(form, wallet).await }
    });
    entered.notified().await;
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());

    // The gate stays held, so a second click cannot send a duplicate.
    assert!(form.is_pending());
    assert_eq!(
        h.actions.submit_create(&form, &h.wallet()).await,
        SubmitOutcome::Busy
    );

    release.notify_one();
    settle(|| form.is_pending()).await;
    assert_eq!(h.messages(), vec![(MSG_CREATED.to_string(), Severity::Success)]);
    assert_eq!(form.inputs().description, "");
    assert_eq!(h.chain.calls(), vec!["createDonation(75)"]);

    h.sched.advance(REFRESH).await;
    let cached = h.store.campaigns();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].description, "late reply");
}

#[tokio::test]
async fn donation_survives_disconnect_while_pending() {
    let h = Harness::new(MockChain::with_campaigns(vec![campaign(100, 0, "x")]));
    h.store.bulk_load(h.chain.as_ref()).await.unwrap();
    let (wallet, entered, release) = SlowWriter::wallet(h.chain.clone());
    let form = Arc::new(DonateForm::new());
    form.open(0);
    form.set_amount("60");

    let handle = h.actions.spawn_donate(form.clone(), wallet);
    assert!(form.is_pending());
    entered.notified().await;
    drop(handle);
    // What a disconnect does to the view while the wallet still holds the
    // request.
    h.store.invalidate();

    release.notify_one();
    settle(|| form.is_pending()).await;
    assert_eq!(h.messages(), vec![(MSG_DONATED.to_string(), Severity::Success)]);
    assert!(!form.inputs().open);

    h.sched.advance(REFRESH).await;
    assert_eq!(h.store.get(0).unwrap().progress, 60);
}

#[tokio::test]
async fn rejected_create_reports_reason_and_keeps_inputs() {
    let h = Harness::new(MockChain::new());
    h.chain.reject_writes(Some("insufficient funds".into()));
    let form = CreateCampaignForm::new();
    form.set_target_amount("10");
    form.set_description("d");

    let outcome = h.actions.submit_create(&form, &h.wallet()).await;
    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    let messages = h.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].1, Severity::Error);
    assert!(messages[0].0.starts_with("Failed to create donation campaign"));
    assert!(messages[0].0.contains("insufficient funds"));
    assert_eq!(form.inputs().target_amount, "10");

    h.sched.advance(REFRESH).await;
    assert_eq!(h.chain.calls(), vec!["createDonation(10)"]);
}

#[tokio::test]
async fn toast_can_be_dismissed_before_expiry() {
    let h = Harness::new(MockChain::new());
    let id = h.toasts.add_toast("hello", Severity::Info);
    assert_eq!(h.toasts.toasts().len(), 1);
    assert!(h.toasts.remove_toast(id));
    assert!(h.toasts.toasts().is_empty());
    h.sched.advance(Duration::from_secs(10)).await;
    assert!(h.toasts.toasts().is_empty());
}
