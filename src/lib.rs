//! Terminal chat client for a remote AI chat assistant.
//!
//! The conversation core ([`store`], [`controller`]) is independent of the
//! terminal; [`api`] talks to the backend and [`app`] drives the TUI.

pub mod api;
pub mod app;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod logging;
pub mod store;
pub mod ui;
