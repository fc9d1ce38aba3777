//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `ZSK_LOG_LEVEL` and `ZSK_PARTNER_CHAT_ID` env overrides.
//!
//! # Module layout
//!
//! - **types** — Public configuration structs consumed by the worker
//!   (`Config`, `PartnerConfig`, `CollectorConfig`, etc.).
//! - **raw** — Raw TOML deserialization types (`RawConfig`, `RawPartner`, …).
//!   These mirror the file shape and use serde defaults; kept private.
//! - **load** — Loading logic: `merge_toml`, `load_raw_merged`, `load`,
//!   `load_from`.

mod load;
mod raw;
mod types;

pub use load::{load, load_from};
pub use types::*;
