//! Bootstrap layer — modules that run before the worker starts.
//!
//! - **logger** — tracing-subscriber initialisation.

pub mod logger;
