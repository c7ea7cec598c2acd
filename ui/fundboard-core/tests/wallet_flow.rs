use std::sync::Arc;
use std::time::Duration;

use fundboard_core::abi;
use fundboard_core::wallet::{default_connectors, MockWalletProvider};
use fundboard_core::{
    Actions, Address, CampaignStore, ConnectionStatus, CreateCampaignForm, ManualScheduler,
    MockChain, NetworkStatus, ProviderRegistry, Severity, SubmitOutcome, ToastChannel,
    WalletError, WalletSession,
};
use primitive_types::U256;

const CONTRACT: Address = Address::repeat_byte(0x77);

fn setup(provider: Arc<MockWalletProvider>) -> (WalletSession, ToastChannel, Arc<ManualScheduler>) {
    let mut registry = ProviderRegistry::new();
    registry.insert("ethereum", provider);
    let session = WalletSession::new(default_connectors(), registry, CONTRACT);
    let sched = Arc::new(ManualScheduler::new());
    let toasts = ToastChannel::new(sched.clone(), Duration::from_secs(5));
    (session, toasts, sched)
}

#[tokio::test]
async fn connect_then_create_goes_through_the_wallet() {
    let account = Address::repeat_byte(0x0a);
    let provider = Arc::new(MockWalletProvider::new(vec![account], 84532));
    let (session, toasts, sched) = setup(provider.clone());

    let detected: Vec<String> = session
        .available_connectors()
        .into_iter()
        .map(|w| w.id)
        .collect();
    assert_eq!(detected, vec!["metaMask"]);

    assert_eq!(session.connect("metaMask", &toasts).await, Ok(account));
    assert_eq!(session.snapshot().status, ConnectionStatus::Connected);
    assert_eq!(session.network_status(84532), NetworkStatus::Correct);
    assert!(toasts.toasts().is_empty());

    let chain = Arc::new(MockChain::new());
    let actions = Actions::new(
        chain,
        CampaignStore::new(),
        toasts.clone(),
        sched,
        Duration::from_secs(2),
    );
    let form = CreateCampaignForm::new();
    form.set_target_amount("1000");
    form.set_description("library books");

    let outcome = actions.submit_create(&form, &session.context()).await;
    assert!(matches!(outcome, SubmitOutcome::Submitted(_)));

    let sent = provider.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].from, account);
    assert_eq!(sent[0].to, CONTRACT);
    assert_eq!(
        &sent[0].data[..4],
        &abi::selector(abi::CREATE_DONATION)[..]
    );
    assert_eq!(abi::decode_uint(&sent[0].data[4..], 0).unwrap(), U256::from(1000));
}

#[tokio::test]
async fn rejected_connect_toasts_once_and_is_not_retried() {
    let provider = Arc::new(MockWalletProvider::new(vec![Address::repeat_byte(1)], 84532));
    provider.fail_connect(Some(WalletError::Rejected("User rejected the request.".into())));
    let (session, toasts, _sched) = setup(provider.clone());

    let err = session.connect("metaMask", &toasts).await.unwrap_err();
    assert_eq!(err, WalletError::Rejected("User rejected the request.".into()));
    assert_eq!(provider.connect_calls(), 1);

    let shown = toasts.toasts();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].severity, Severity::Error);
    assert!(shown[0].message.contains("User rejected the request."));
    assert!(matches!(session.snapshot().status, ConnectionStatus::Error(_)));
    assert!(!session.context().is_connected());
}

#[tokio::test]
async fn wrong_network_is_reported_until_switched() {
    let provider = Arc::new(MockWalletProvider::new(vec![Address::repeat_byte(1)], 1));
    let (session, toasts, _sched) = setup(provider.clone());
    session.connect("metaMask", &toasts).await.unwrap();
    assert_eq!(session.network_status(84532), NetworkStatus::Wrong { actual: 1 });

    provider.set_chain_id(84532);
    assert_eq!(session.sync_chain().await, Ok(Some(84532)));
    assert_eq!(session.network_status(84532), NetworkStatus::Correct);

    session.disconnect();
    assert_eq!(session.network_status(84532), NetworkStatus::Disconnected);
}

#[tokio::test]
async fn missing_connector_is_not_installed() {
    let provider = Arc::new(MockWalletProvider::new(vec![Address::repeat_byte(1)], 1));
    let (session, toasts, _sched) = setup(provider);
    let err = session.connect("coinbaseWallet", &toasts).await.unwrap_err();
    assert!(matches!(err, WalletError::NotInstalled(_)));
    assert_eq!(toasts.toasts().len(), 1);
}
