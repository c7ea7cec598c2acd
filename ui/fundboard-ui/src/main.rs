#![allow(non_snake_case)]

mod components;
mod state;

use dioxus::prelude::*;
use tracing::error;
use tracing_subscriber::EnvFilter;

use fundboard_core::{AppConfig, ConnectionStatus};
use state::{use_revision, AppState, FormTick};

const STYLE: &str = include_str!("../assets/style.css");

#[derive(Routable, Clone, PartialEq)]
enum Route {
    #[layout(Layout)]
    #[route("/")]
    Browse {},
    #[route("/create")]
    Create {},
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let app_state = match AppConfig::from_env().map_err(|e| e.to_string()).and_then(|config| {
        AppState::new(config).map_err(|e| e.to_string())
    }) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "startup failed");
            eprintln!("fundboard: {e}");
            std::process::exit(2);
        }
    };

    dioxus::LaunchBuilder::desktop()
        .with_context(app_state)
        .launch(App);
}

#[component]
fn App() -> Element {
    use_context_provider(|| FormTick(Signal::new(0)));

    rsx! {
        document::Style { {STYLE} }
        Router::<Route> {}
        components::toasts::ToastContainer {}
    }
}

// ---------------------------------------------------------------------------
// Layout: top bar + tabs + content
// ---------------------------------------------------------------------------

#[component]
fn Layout() -> Element {
    let app = use_context::<AppState>();
    let wallet_rev = use_revision({
        let session = app.session.clone();
        move || session.subscribe()
    });
    let _ = wallet_rev.read();

    // Initial load on mount; anything still in flight at teardown is dropped.
    use_future({
        let actions = app.actions.clone();
        move || {
            let actions = actions.clone();
            async move {
                actions.load_campaigns().await;
            }
        }
    });
    use_drop({
        let store = app.store.clone();
        move || store.invalidate()
    });

    let connected = app.session.snapshot().status == ConnectionStatus::Connected;

    rsx! {
        div { class: "app-container",
            components::layout::TopBar {}
            div { class: "main-content",
                if connected {
                    components::layout::Tabs {}
                    Outlet::<Route> {}
                    components::donate_modal::DonateModal {}
                } else {
                    p { class: "no-wallet",
                        "Please connect your wallet to use the funding platform"
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Route components
// ---------------------------------------------------------------------------

#[component]
fn Browse() -> Element {
    rsx! { components::campaign_list::CampaignList {} }
}

#[component]
fn Create() -> Element {
    rsx! { components::create_campaign::CreateCampaignPage {} }
}
