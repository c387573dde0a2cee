// src/lib.rs

pub mod auth;
pub mod client;
pub mod config;
pub mod llm;
pub mod prompt;
pub mod state;
pub mod studio;
pub mod types;

pub use client::AuthClient;
pub use config::{ForgeConfig, CONFIG};
pub use studio::{Completion, Studio, StudioError, StudioResult};
