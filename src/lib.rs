//! Servidor REST de citas MollyVet.
//!
//! Une los crates del workspace: `lifecycle` (reglas de estado),
//! `vet-persistence` (SQLite) y `vet-notify` (correo y calendario), y los
//! expone con axum bajo `/api`.
pub mod api;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod session;
mod main_lib;

pub use main_lib::{build_state, init_tracing, AppState};
