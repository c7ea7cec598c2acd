use dioxus::prelude::*;

use fundboard_core::format::{progress_line, truncate_address};
use fundboard_core::CampaignRecord;

use crate::state::{use_revision, AppState, FormTick};

#[component]
pub fn CampaignList() -> Element {
    let app = use_context::<AppState>();
    let store_rev = use_revision({
        let store = app.store.clone();
        move || store.subscribe()
    });

    let _ = store_rev.read();
    let campaigns = app.store.campaigns();
    let loading = app.store.is_loading();
    let load_error = app.store.load_error();
    let failed = load_error.is_some();
    let reason = load_error.unwrap_or_default();

    rsx! {
        div { class: "browse-section",
            if loading {
                p { class: "loading", "Loading donations..." }
            } else if failed {
                p { class: "load-error", "Could not load donations: {reason}" }
            } else if campaigns.is_empty() {
                p { class: "empty", "No donation campaigns yet" }
            } else {
                div { class: "donations-list",
                    for record in campaigns {
                        CampaignCard { key: "{record.id}", record }
                    }
                }
            }
        }
    }
}

#[component]
fn CampaignCard(record: CampaignRecord) -> Element {
    let app = use_context::<AppState>();
    let tick = use_context::<FormTick>();
    let id = record.id;

    rsx! {
        div { class: "donation-card",
            h3 { class: "card-title", "{record.description}" }
            p { class: "card-creator", "Creator: {truncate_address(&record.creator)}" }
            div { class: "progress-container",
                div { class: "progress-bar", style: "width: {record.progress}%" }
            }
            p { class: "progress-text", "{progress_line(&record)}" }
            button {
                class: "btn btn-donate",
                onclick: move |_| {
                    app.donate_form.open(id);
                    tick.bump();
                },
                "Donate to This Campaign"
            }
        }
    }
}
