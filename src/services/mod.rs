// src/services/mod.rs
//! Thin wrappers over endpoints whose work happens entirely server-side.

pub mod admin;
pub mod ai;

pub use admin::AdminService;
pub use ai::AiService;
