pub mod campaign_list;
pub mod create_campaign;
pub mod donate_modal;
pub mod layout;
pub mod toasts;
pub mod wallet_connect;
