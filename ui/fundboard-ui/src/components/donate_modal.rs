use dioxus::prelude::*;

use crate::state::{AppState, FormTick};

#[component]
pub fn DonateModal() -> Element {
    let app = use_context::<AppState>();
    let tick = use_context::<FormTick>();

    tick.track();
    let inputs = app.donate_form.inputs();
    let Some(id) = inputs.selected.filter(|_| inputs.open) else {
        return rsx! {};
    };
    let pending = app.donate_form.is_pending();
    let title = app
        .store
        .get(id)
        .map(|c| c.description)
        .unwrap_or_default();

    let on_send = {
        let app = app.clone();
        move |_| {
            let flow = app
                .actions
                .spawn_donate(app.donate_form.clone(), app.session.context());
            tick.bump();
            spawn_forever(async move {
                let _ = flow.await;
                tick.bump();
            });
        }
    };

    let close = {
        let form = app.donate_form.clone();
        move |_| {
            if form.close() {
                tick.bump();
            }
        }
    };
    let close_x = close.clone();
    let form_amount = app.donate_form.clone();

    rsx! {
        div { class: "modal-backdrop",
            div { class: "modal",
                div { class: "modal-header",
                    h2 { class: "modal-title", "Donate to: {title}" }
                    button {
                        class: "close-button",
                        disabled: pending,
                        onclick: close_x,
                        "✕"
                    }
                }
                div { class: "modal-content",
                    div { class: "form-group",
                        label { "Donation Amount" }
                        input {
                            class: "input",
                            r#type: "number",
                            min: "0",
                            placeholder: "Enter donation amount",
                            disabled: pending,
                            value: "{inputs.amount}",
                            oninput: move |e| {
                                form_amount.set_amount(e.value());
                                tick.bump();
                            },
                        }
                    }
                }
                div { class: "modal-footer",
                    button {
                        class: "btn btn-secondary",
                        disabled: pending,
                        onclick: close,
                        "Cancel"
                    }
                    button {
                        class: "btn btn-primary",
                        disabled: pending,
                        onclick: on_send,
                        if pending { "Sending..." } else { "Send Donation" }
                    }
                }
            }
        }
    }
}
