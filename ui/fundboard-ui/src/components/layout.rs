use dioxus::prelude::*;

use super::wallet_connect::WalletConnect;
use crate::state::AppState;
use crate::Route;

#[component]
pub fn TopBar() -> Element {
    let app = use_context::<AppState>();
    let chain_name = app.config.chain_name.clone();

    rsx! {
        header { class: "topbar",
            div { class: "topbar-left",
                span { class: "brand-icon", "◈" }
                span { class: "brand-text", "FundBoard" }
                div { class: "topbar-divider" }
                span { class: "topbar-label", "{chain_name}" }
            }
            div { class: "topbar-right",
                WalletConnect {}
            }
        }
    }
}

#[component]
pub fn Tabs() -> Element {
    rsx! {
        nav { class: "tabs",
            TabLink { to: Route::Browse {}, label: "Browse Campaigns" }
            TabLink { to: Route::Create {}, label: "Create Campaign" }
        }
    }
}

#[component]
fn TabLink(to: Route, label: &'static str) -> Element {
    rsx! {
        Link { class: "tab", active_class: "active", to: to, "{label}" }
    }
}
