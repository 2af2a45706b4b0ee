//! chatlens is a tolerant client for a live-stream chat analytics backend.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] performs HTTP calls through a [`api::Transport`], maps every
//!   failure onto one [`api::ApiError`] shape, and defines the domain records.
//! - [`core`] holds configuration, the async resource container that drives
//!   fetches and guards against stale results, and the response normalizers
//!   that turn any known payload shape into a fixed structure.
//! - [`services`] binds each backend endpoint to its normalizer.
//! - [`utils`] carries URL resolution and logging setup.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod services;
pub mod utils;
