use dioxus::prelude::*;

use fundboard_core::Toast;

use crate::state::{use_revision, AppState};

#[component]
pub fn ToastContainer() -> Element {
    let app = use_context::<AppState>();
    let rev = use_revision({
        let toasts = app.toasts.clone();
        move || toasts.subscribe()
    });

    let _ = rev.read();
    let toasts = app.toasts.toasts();

    rsx! {
        div { class: "toast-container",
            for toast in toasts {
                ToastItem { key: "{toast.id.0}", toast }
            }
        }
    }
}

#[component]
fn ToastItem(toast: Toast) -> Element {
    let app = use_context::<AppState>();
    let id = toast.id;
    let class = format!("toast toast-{}", toast.severity.css_class());

    rsx! {
        div { class: "{class}", role: "alert",
            div { class: "toast-content",
                span { class: "toast-icon", "{toast.severity.icon()}" }
                span { class: "toast-message", "{toast.message}" }
            }
            button {
                class: "toast-close",
                aria_label: "Close notification",
                onclick: move |_| {
                    app.toasts.remove_toast(id);
                },
                "✕"
            }
        }
    }
}
