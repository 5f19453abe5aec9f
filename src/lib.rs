#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod chat;
pub mod config;
pub mod error;
pub mod memory;
pub mod persistence;
pub mod providers;
pub mod utils;

pub use chat::ChatSession;
pub use config::Config;
pub use error::{ConvoError, Result};
pub use memory::{MemoryRegistry, MemoryStore, MemoryStoreFactory};
