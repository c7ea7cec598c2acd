//! Shared handles for the UI, provided once through Dioxus context.

use std::sync::Arc;

use dioxus::prelude::*;
use tokio::sync::watch;

use fundboard_core::contract::FundingContract;
use fundboard_core::rpc::HttpTransport;
use fundboard_core::wallet::default_connectors;
use fundboard_core::{
    Actions, AppConfig, CampaignStore, ChainError, ChainReader, CreateCampaignForm, DonateForm,
    ProviderRegistry, Scheduler, ToastChannel, TokioScheduler, WalletSession,
};

/// Everything the components need. Cheap to clone; all fields are handles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: CampaignStore,
    pub toasts: ToastChannel,
    pub session: WalletSession,
    pub actions: Actions,
    pub create_form: Arc<CreateCampaignForm>,
    pub donate_form: Arc<DonateForm>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, ChainError> {
        let transport = HttpTransport::new(
            config.rpc_url.clone(),
            config.rpc_timeout,
            config.api_key.clone(),
        )?;
        let reader: Arc<dyn ChainReader> =
            Arc::new(FundingContract::new(transport, config.contract_address));
        let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler);
        let store = CampaignStore::new();
        let toasts = ToastChannel::new(scheduler.clone(), config.toast_duration);
        let registry = ProviderRegistry::from_config(&config)?;
        let session = WalletSession::new(default_connectors(), registry, config.contract_address);
        let actions = Actions::new(
            reader,
            store.clone(),
            toasts.clone(),
            scheduler,
            config.refresh_delay,
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            toasts,
            session,
            actions,
            create_form: Arc::new(CreateCampaignForm::new()),
            donate_form: Arc::new(DonateForm::new()),
        })
    }
}

/// Bumped after form inputs change so inputs re-render from the form state.
#[derive(Clone, Copy)]
pub struct FormTick(pub Signal<u64>);

impl FormTick {
    pub fn bump(mut self) {
        let next = *self.0.peek() + 1;
        self.0.set(next);
    }

    /// Subscribes the calling component.
    pub fn track(&self) {
        let _ = self.0.read();
    }
}

/// Mirrors a core revision counter into a signal so the calling component
/// re-renders whenever the core state behind it changes.
pub fn use_revision(make: impl FnOnce() -> watch::Receiver<u64>) -> Signal<u64> {
    let mut revision = use_signal(|| 0u64);
    let rx = use_hook(make);
    use_future(move || {
        let mut rx = rx.clone();
        async move {
            while rx.changed().await.is_ok() {
                let value = *rx.borrow_and_update();
                revision.set(value);
            }
        }
    });
    revision
}
