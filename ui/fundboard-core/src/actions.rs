//! Create and donate flows.
//!
//! Each flow validates locally, submits at most one transaction per form at
//! a time, reports the result as exactly one toast and, on success, schedules
//! one deferred refresh of the campaign cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::contract::{ChainReader, ChainWriter};
use crate::error::ChainError;
use crate::format::parse_amount;
use crate::notify::ToastChannel;
use crate::scheduler::Scheduler;
use crate::store::{CampaignStore, LoadReport};
use crate::types::{CampaignId, PendingTx};
use crate::wallet::WalletContext;

pub const MSG_CONNECT_FIRST: &str = "Please connect your wallet first";
pub const MSG_FILL_ALL_FIELDS: &str = "Please fill in all fields";
pub const MSG_SELECT_AND_AMOUNT: &str = "Please select a donation and enter an amount";
pub const MSG_INVALID_AMOUNT: &str = "Please enter a valid whole-number amount";
pub const MSG_NO_SIGNER: &str = "Wallet client not available";
pub const MSG_CREATED: &str = "Donation campaign created successfully!";
pub const MSG_DONATED: &str = "Donation sent successfully!";
pub const MSG_LOAD_FAILED: &str = "Failed to load donations";

/// What happened to one submit request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Another submission from the same form is still outstanding.
    Busy,
    /// A local precondition failed; a toast was shown and nothing was sent.
    Invalid(&'static str),
    Submitted(PendingTx),
    Failed(String),
}

// ---------------------------------------------------------------------------
// SubmitGate
// ---------------------------------------------------------------------------

/// Single-flight guard for one form.
#[derive(Debug, Default)]
pub struct SubmitGate {
    in_flight: AtomicBool,
}

/// Held while a submission is outstanding; releases the gate on drop. Owns
/// its gate so a detached submission can carry it.
#[derive(Debug)]
pub struct SubmitPermit {
    gate: Arc<SubmitGate>,
}

impl SubmitGate {
    pub fn try_acquire(self: &Arc<Self>) -> Option<SubmitPermit> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitPermit { gate: self.clone() })
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for SubmitPermit {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateInputs {
    pub target_amount: String,
    pub description: String,
}

#[derive(Debug, Default)]
pub struct CreateCampaignForm {
    inputs: Mutex<CreateInputs>,
    gate: Arc<SubmitGate>,
}

impl CreateCampaignForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inputs(&self) -> CreateInputs {
        self.inputs.lock().clone()
    }

    pub fn set_target_amount(&self, value: impl Into<String>) {
        self.inputs.lock().target_amount = value.into();
    }

    pub fn set_description(&self, value: impl Into<String>) {
        self.inputs.lock().description = value.into();
    }

    pub fn is_pending(&self) -> bool {
        self.gate.is_pending()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DonateInputs {
    pub selected: Option<CampaignId>,
    pub amount: String,
    pub open: bool,
}

#[derive(Debug, Default)]
pub struct DonateForm {
    inputs: Mutex<DonateInputs>,
    gate: Arc<SubmitGate>,
}

impl DonateForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inputs(&self) -> DonateInputs {
        self.inputs.lock().clone()
    }

    /// Opens the modal for `id`.
    pub fn open(&self, id: CampaignId) {
        let mut inputs = self.inputs.lock();
        inputs.selected = Some(id);
        inputs.open = true;
    }

    /// Closes the modal and forgets the selection and amount. Refused while
    /// a donation is outstanding.
    pub fn close(&self) -> bool {
        if self.gate.is_pending() {
            return false;
        }
        *self.inputs.lock() = DonateInputs::default();
        true
    }

    pub fn set_amount(&self, value: impl Into<String>) {
        self.inputs.lock().amount = value.into();
    }

    pub fn is_pending(&self) -> bool {
        self.gate.is_pending()
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The collaborators every write flow needs.
#[derive(Clone)]
pub struct Actions {
    reader: Arc<dyn ChainReader>,
    store: CampaignStore,
    toasts: ToastChannel,
    scheduler: Arc<dyn Scheduler>,
    refresh_delay: Duration,
}

impl Actions {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        store: CampaignStore,
        toasts: ToastChannel,
        scheduler: Arc<dyn Scheduler>,
        refresh_delay: Duration,
    ) -> Self {
        Self {
            reader,
            store,
            toasts,
            scheduler,
            refresh_delay,
        }
    }

    fn reject(&self, message: &'static str, fatal: bool) -> SubmitOutcome {
        if fatal {
            self.toasts.error(message);
        } else {
            self.toasts.warning(message);
        }
        SubmitOutcome::Invalid(message)
    }

    fn signer(&self, wallet: &WalletContext) -> Result<Arc<dyn ChainWriter>, SubmitOutcome> {
        wallet
            .signer
            .clone()
            .ok_or_else(|| self.reject(MSG_NO_SIGNER, true))
    }

    pub async fn submit_create(
        &self,
        form: &CreateCampaignForm,
        wallet: &WalletContext,
    ) -> SubmitOutcome {
        match form.gate.try_acquire() {
            Some(permit) => self.run_create(permit, form, wallet).await,
            None => SubmitOutcome::Busy,
        }
    }

    /// Takes the form's gate now and runs the create flow on its own task.
    /// Dropping the handle does not cancel the flow: the toast, the cleared
    /// inputs and the scheduled reload still happen once the wallet answers.
    pub fn spawn_create(
        &self,
        form: Arc<CreateCampaignForm>,
        wallet: WalletContext,
    ) -> JoinHandle<SubmitOutcome> {
        let permit = form.gate.try_acquire();
        let actions = self.clone();
        tokio::spawn(async move {
            match permit {
                Some(permit) => actions.run_create(permit, &form, &wallet).await,
                None => SubmitOutcome::Busy,
            }
        })
    }

    async fn run_create(
        &self,
        _permit: SubmitPermit,
        form: &CreateCampaignForm,
        wallet: &WalletContext,
    ) -> SubmitOutcome {
        if !wallet.is_connected() {
            return self.reject(MSG_CONNECT_FIRST, false);
        }
        let inputs = form.inputs();
        if inputs.target_amount.trim().is_empty() || inputs.description.trim().is_empty() {
            return self.reject(MSG_FILL_ALL_FIELDS, false);
        }
        let Some(target) = parse_amount(&inputs.target_amount) else {
            return self.reject(MSG_INVALID_AMOUNT, false);
        };
        let signer = match self.signer(wallet) {
            Ok(s) => s,
            Err(outcome) => return outcome,
        };

        match signer.create_donation(target, &inputs.description).await {
            Ok(tx) => {
                info!(hash = ?tx.hash, %target, "campaign creation submitted");
                *form.inputs.lock() = CreateInputs::default();
                self.toasts.success(MSG_CREATED);
                self.schedule_bulk_load();
                SubmitOutcome::Submitted(tx)
            }
            Err(e) => self.fail("Failed to create donation campaign", e),
        }
    }

    pub async fn submit_donate(&self, form: &DonateForm, wallet: &WalletContext) -> SubmitOutcome {
        match form.gate.try_acquire() {
            Some(permit) => self.run_donate(permit, form, wallet).await,
            None => SubmitOutcome::Busy,
        }
    }

    /// Detached counterpart of [`submit_donate`](Self::submit_donate); see
    /// [`spawn_create`](Self::spawn_create).
    pub fn spawn_donate(
        &self,
        form: Arc<DonateForm>,
        wallet: WalletContext,
    ) -> JoinHandle<SubmitOutcome> {
        let permit = form.gate.try_acquire();
        let actions = self.clone();
        tokio::spawn(async move {
            match permit {
                Some(permit) => actions.run_donate(permit, &form, &wallet).await,
                None => SubmitOutcome::Busy,
            }
        })
    }

    async fn run_donate(
        &self,
        _permit: SubmitPermit,
        form: &DonateForm,
        wallet: &WalletContext,
    ) -> SubmitOutcome {
        if !wallet.is_connected() {
            return self.reject(MSG_CONNECT_FIRST, false);
        }
        let inputs = form.inputs();
        let Some(id) = inputs.selected else {
            return self.reject(MSG_SELECT_AND_AMOUNT, false);
        };
        if inputs.amount.trim().is_empty() {
            return self.reject(MSG_SELECT_AND_AMOUNT, false);
        }
        let Some(amount) = parse_amount(&inputs.amount) else {
            return self.reject(MSG_INVALID_AMOUNT, false);
        };
        let signer = match self.signer(wallet) {
            Ok(s) => s,
            Err(outcome) => return outcome,
        };

        match signer.donate(id, amount).await {
            Ok(tx) => {
                info!(hash = ?tx.hash, id, %amount, "donation submitted");
                *form.inputs.lock() = DonateInputs::default();
                self.toasts.success(MSG_DONATED);
                self.schedule_refresh_one(id);
                SubmitOutcome::Submitted(tx)
            }
            Err(e) => self.fail("Failed to send donation", e),
        }
    }

    /// Full reload of the cache. A failure to read the count is shown as
    /// one error toast and kept on the store for the list to display.
    pub async fn load_campaigns(&self) -> Option<LoadReport> {
        match self.store.bulk_load(self.reader.as_ref()).await {
            Ok(report) => Some(report),
            Err(e) => {
                self.toasts.error(format!("{MSG_LOAD_FAILED}: {e}"));
                None
            }
        }
    }

    fn fail(&self, context: &str, error: ChainError) -> SubmitOutcome {
        warn!(error = %error, "{context}");
        let reason = error.to_string();
        let message = if reason.is_empty() {
            context.to_string()
        } else {
            format!("{context}: {reason}")
        };
        self.toasts.error(message);
        SubmitOutcome::Failed(reason)
    }

    /// Best-effort: the transaction may not be mined when this runs.
    fn schedule_bulk_load(&self) {
        let store = self.store.clone();
        let reader = self.reader.clone();
        self.scheduler.schedule(
            self.refresh_delay,
            async move {
                if let Err(e) = store.bulk_load(reader.as_ref()).await {
                    warn!(error = %e, "scheduled reload failed");
                }
            }
            .boxed(),
        );
    }

    fn schedule_refresh_one(&self, id: CampaignId) {
        let store = self.store.clone();
        let reader = self.reader.clone();
        self.scheduler.schedule(
            self.refresh_delay,
            async move {
                if let Err(e) = store.refresh_one(reader.as_ref(), id).await {
                    warn!(id, error = %e, "scheduled refresh failed");
                }
            }
            .boxed(),
        );
    }

    pub fn store(&self) -> &CampaignStore {
        &self.store
    }

    pub fn toasts(&self) -> &ToastChannel {
        &self.toasts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockChain;
    use crate::scheduler::ManualScheduler;
    use crate::types::{Address, Severity};
    use primitive_types::U256;

    struct Fixture {
        chain: Arc<MockChain>,
        sched: Arc<ManualScheduler>,
        actions: Actions,
    }

    fn fixture() -> Fixture {
        let chain = Arc::new(MockChain::new());
        let sched = Arc::new(ManualScheduler::new());
        let toasts = ToastChannel::new(sched.clone(), Duration::from_secs(60));
        let actions = Actions::new(
            chain.clone(),
            CampaignStore::new(),
            toasts,
            sched.clone(),
            Duration::from_secs(2),
        );
        Fixture {
            chain,
            sched,
            actions,
        }
    }

    fn connected(chain: &Arc<MockChain>) -> WalletContext {
        WalletContext {
            account: Some(Address::repeat_byte(1)),
            signer: Some(chain.clone() as Arc<dyn ChainWriter>),
        }
    }

    fn only_toast(actions: &Actions) -> (String, Severity) {
        let toasts = actions.toasts().toasts();
        assert_eq!(toasts.len(), 1, "expected exactly one toast, got {toasts:?}");
        (toasts[0].message.clone(), toasts[0].severity)
    }

    #[tokio::test]
    async fn disconnected_create_warns_without_calls() {
        let f = fixture();
        let form = CreateCampaignForm::new();
        form.set_target_amount("100");
        form.set_description("x");

        let outcome = f.actions.submit_create(&form, &WalletContext::default()).await;
        assert_eq!(outcome, SubmitOutcome::Invalid(MSG_CONNECT_FIRST));
        assert_eq!(only_toast(&f.actions), (MSG_CONNECT_FIRST.to_string(), Severity::Warning));
        assert!(f.chain.calls().is_empty());
        assert_eq!(f.sched.pending(), 1); // toast expiry only
    }

    #[tokio::test]
    async fn empty_fields_warn() {
        let f = fixture();
        let form = CreateCampaignForm::new();
        form.set_target_amount("100");

        let outcome = f.actions.submit_create(&form, &connected(&f.chain)).await;
        assert_eq!(outcome, SubmitOutcome::Invalid(MSG_FILL_ALL_FIELDS));
        assert_eq!(only_toast(&f.actions).1, Severity::Warning);
        assert!(f.chain.calls().is_empty());
        assert_eq!(form.inputs().target_amount, "100");
    }

    #[tokio::test]
    async fn missing_signer_is_error() {
        let f = fixture();
        let form = CreateCampaignForm::new();
        form.set_target_amount("100");
        form.set_description("x");
        let wallet = WalletContext {
            account: Some(Address::repeat_byte(1)),
            signer: None,
        };

        let outcome = f.actions.submit_create(&form, &wallet).await;
        assert_eq!(outcome, SubmitOutcome::Invalid(MSG_NO_SIGNER));
        assert_eq!(only_toast(&f.actions), (MSG_NO_SIGNER.to_string(), Severity::Error));
    }

    #[tokio::test]
    async fn invalid_amount_warns() {
        let f = fixture();
        let form = DonateForm::new();
        form.open(0);
        form.set_amount("1.5");

        let outcome = f.actions.submit_donate(&form, &connected(&f.chain)).await;
        assert_eq!(outcome, SubmitOutcome::Invalid(MSG_INVALID_AMOUNT));
        assert!(f.chain.calls().is_empty());
        assert!(form.inputs().open);
    }

    #[tokio::test]
    async fn create_success_clears_form_and_schedules_reload() {
        let f = fixture();
        let form = CreateCampaignForm::new();
        form.set_target_amount("1000");
        form.set_description("clean water");

        let outcome = f.actions.submit_create(&form, &connected(&f.chain)).await;
        assert!(matches!(outcome, SubmitOutcome::Submitted(_)));
        assert_eq!(form.inputs(), CreateInputs::default());
        assert!(!form.is_pending());
        assert_eq!(only_toast(&f.actions), (MSG_CREATED.to_string(), Severity::Success));
        assert!(f.actions.store().campaigns().is_empty());

        f.sched.advance(Duration::from_millis(1999)).await;
        assert!(f.actions.store().campaigns().is_empty());
        f.sched.advance(Duration::from_millis(1)).await;
        let cached = f.actions.store().campaigns();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].description, "clean water");
    }

    #[tokio::test]
    async fn failed_write_keeps_inputs_and_reports_reason() {
        let f = fixture();
        f.chain.reject_writes(Some("User rejected the request.".into()));
        f.chain.push_campaign(crate::types::OnChainCampaign {
            target_amount: U256::from(10),
            total_donated: U256::zero(),
            creator: Address::zero(),
            timestamp: 0,
            description: "x".into(),
        });
        let form = DonateForm::new();
        form.open(0);
        form.set_amount("5");

        let outcome = f.actions.submit_donate(&form, &connected(&f.chain)).await;
        assert_eq!(
            outcome,
            SubmitOutcome::Failed("network error: User rejected the request.".into())
        );
        let (message, severity) = only_toast(&f.actions);
        assert_eq!(severity, Severity::Error);
        assert!(message.contains("User rejected the request."));
        assert_eq!(
            form.inputs(),
            DonateInputs {
                selected: Some(0),
                amount: "5".into(),
                open: true,
            }
        );
        // Only the toast expiry; no refresh after a failure.
        assert_eq!(f.sched.pending(), 1);
    }

    #[test]
    fn gate_is_single_flight() {
        let gate = Arc::new(SubmitGate::default());
        let first = gate.try_acquire();
        assert!(first.is_some());
        assert!(gate.try_acquire().is_none());
        assert!(gate.is_pending());
        drop(first);
        assert!(!gate.is_pending());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn modal_close_refused_while_pending() {
        let form = DonateForm::new();
        form.open(3);
        form.set_amount("9");
        let permit = form.gate.try_acquire();
        assert!(!form.close());
        assert!(form.inputs().open);
        drop(permit);
        assert!(form.close());
        assert_eq!(form.inputs(), DonateInputs::default());
    }
}
