//! A client for an expense-tracking REST backend.
//!
//! The client keeps all page state in a single reducer-driven [`store::Store`]. Page controllers in
//! [`controllers`] fetch from a [`api::Backend`], commit responses as actions and record failures
//! as normalized messages in the store's error slots.

pub mod api;
pub mod args;
pub mod commands;
mod config;
pub mod controllers;
mod error;
mod export;
pub mod format;
pub mod forms;
pub mod model;
pub mod preferences;
pub mod store;
mod utils;


pub use api::Mode;
pub use config::Config;
pub use error::{normalize, ApiError, Error, Result, FALLBACK_MESSAGE};
