use std::time::Duration;

use dioxus::prelude::*;
use tracing::debug;

use fundboard_core::format::{format_balance, truncate_address, ETHER_DECIMALS};
use fundboard_core::wallet::DetectedWallet;
use fundboard_core::{ConnectionStatus, NetworkStatus};

use crate::state::{use_revision, AppState};

const CHAIN_POLL: Duration = Duration::from_secs(4);

fn connect(app: &AppState, connector_id: String) {
    let session = app.session.clone();
    let toasts = app.toasts.clone();
    spawn(async move {
        // Failures are already toasted by the session.
        let _ = session.connect(&connector_id, &toasts).await;
    });
}

#[component]
pub fn WalletConnect() -> Element {
    let app = use_context::<AppState>();
    let wallet_rev = use_revision({
        let session = app.session.clone();
        move || session.subscribe()
    });
    let mut open = use_signal(|| false);

    // The wallet can switch networks behind our back.
    use_future({
        let session = app.session.clone();
        move || {
            let session = session.clone();
            async move {
                loop {
                    tokio::time::sleep(CHAIN_POLL).await;
                    if let Err(e) = session.sync_chain().await {
                        debug!(error = %e, "chain id poll failed");
                    }
                }
            }
        }
    });

    let balance = use_resource({
        let session = app.session.clone();
        move || {
            let _ = wallet_rev();
            let session = session.clone();
            async move { session.balance().await }
        }
    });

    let _ = wallet_rev.read();
    let snapshot = app.session.snapshot();
    let detected = app.session.available_connectors();

    if detected.is_empty() {
        return rsx! {};
    }

    if let (ConnectionStatus::Connected, Some(account)) = (&snapshot.status, snapshot.account) {
        let network = app.session.network_status(app.config.chain_id);
        let wrong = matches!(network, NetworkStatus::Wrong { .. });
        let network_text = match network {
            NetworkStatus::Correct => format!("Connected to {}", app.config.chain_name),
            _ => format!("Switch to {}", app.config.chain_name),
        };
        let balance_text = match &*balance.read() {
            Some(Ok(Some(wei))) => format_balance(*wei, ETHER_DECIMALS, &app.config.currency_symbol),
            _ => "Loading...".to_string(),
        };
        let session = app.session.clone();
        let store = app.store.clone();

        return rsx! {
            div { class: "wallet-connected",
                button {
                    class: if wrong { "wallet-address wrong-network-blink" } else { "wallet-address" },
                    onclick: move |_| { let cur = *open.read(); open.set(!cur); },
                    "{truncate_address(&account)}"
                }
                if *open.read() {
                    div { class: "wallet-menu",
                        div { class: "network-status",
                            span {
                                class: if wrong { "network-wrong" } else { "network-correct" },
                                "{network_text}"
                            }
                        }
                        div { class: "balance-section",
                            span { class: "balance-label", "Balance:" }
                            span { class: "balance-value", "{balance_text}" }
                        }
                        button {
                            class: "btn btn-disconnect",
                            onclick: move |_| {
                                session.disconnect();
                                store.invalidate();
                                open.set(false);
                            },
                            "Disconnect"
                        }
                    }
                    div { class: "menu-backdrop", onclick: move |_| open.set(false) }
                }
            }
        };
    }

    let connecting = snapshot.status == ConnectionStatus::Connecting;

    if let [only] = detected.as_slice() {
        let id = only.id.clone();
        let title = format!("Connect {}", only.name);
        let icon = only.icon.clone();
        let app_for_click = app.clone();
        return rsx! {
            button {
                class: "wallet-single",
                title: "{title}",
                disabled: connecting,
                onclick: move |_| connect(&app_for_click, id.clone()),
                span { class: "wallet-icon", "{icon}" }
            }
        };
    }

    rsx! {
        div { class: "wallet-dropdown",
            button {
                class: "btn btn-primary",
                disabled: connecting,
                onclick: move |_| { let cur = *open.read(); open.set(!cur); },
                if connecting { "Connecting..." } else { "Connect Wallet" }
            }
            if *open.read() {
                div { class: "wallet-menu",
                    for wallet in detected {
                        ConnectorItem { key: "{wallet.id}", wallet: wallet.clone(), open }
                    }
                }
                div { class: "menu-backdrop", onclick: move |_| open.set(false) }
            }
        }
    }
}

#[component]
fn ConnectorItem(wallet: DetectedWallet, open: Signal<bool>) -> Element {
    let app = use_context::<AppState>();
    let mut open = open;
    let DetectedWallet { id, name, icon } = wallet;

    rsx! {
        button {
            class: "wallet-menu-item",
            onclick: move |_| {
                open.set(false);
                connect(&app, id.clone());
            },
            span { class: "wallet-icon", "{icon}" }
            span { "{name}" }
        }
    }
}
