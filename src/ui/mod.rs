pub mod chat_view;
pub mod markdown;
pub mod settings_panel;
pub mod tooltip;
