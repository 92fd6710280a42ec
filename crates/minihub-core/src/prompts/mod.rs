//! Prompt templates for generating and editing apps, and the app-context document.

pub mod app_context;
pub mod app_create;
pub mod app_edit;

pub use app_context::app_context_document;
pub use app_create::{app_create_prompt, APP_CREATE_TEMPLATE};
pub use app_edit::{app_edit_prompt, APP_EDIT_TEMPLATE};
