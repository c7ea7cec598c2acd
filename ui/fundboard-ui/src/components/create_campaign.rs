use dioxus::prelude::*;

use fundboard_core::SubmitOutcome;

use crate::state::{AppState, FormTick};
use crate::Route;

#[component]
pub fn CreateCampaignPage() -> Element {
    let app = use_context::<AppState>();
    let tick = use_context::<FormTick>();
    let nav = use_navigator();

    tick.track();
    let inputs = app.create_form.inputs();
    let pending = app.create_form.is_pending();

    let on_submit = {
        let app = app.clone();
        move |_| {
            // The write runs on its own task. The waiter lives at the root so
            // it still re-renders after this page unmounts.
            let flow = app
                .actions
                .spawn_create(app.create_form.clone(), app.session.context());
            tick.bump();
            spawn_forever(async move {
                let outcome = flow.await;
                tick.bump();
                if matches!(outcome, Ok(SubmitOutcome::Submitted(_))) {
                    nav.push(Route::Browse {});
                }
            });
        }
    };

    let form_amount = app.create_form.clone();
    let form_desc = app.create_form.clone();

    rsx! {
        div { class: "form-section",
            h2 { class: "form-title", "Create a New Campaign" }

            div { class: "form-group",
                label { "Target Amount" }
                input {
                    class: "input",
                    r#type: "number",
                    min: "0",
                    placeholder: "Enter target amount",
                    disabled: pending,
                    value: "{inputs.target_amount}",
                    oninput: move |e| {
                        form_amount.set_target_amount(e.value());
                        tick.bump();
                    },
                }
            }

            div { class: "form-group",
                label { "Description" }
                textarea {
                    class: "textarea",
                    placeholder: "Describe your campaign",
                    disabled: pending,
                    value: "{inputs.description}",
                    oninput: move |e| {
                        form_desc.set_description(e.value());
                        tick.bump();
                    },
                }
            }

            button {
                class: "btn btn-primary",
                disabled: pending,
                onclick: on_submit,
                if pending { "Creating..." } else { "Create Campaign" }
            }
        }
    }
}
