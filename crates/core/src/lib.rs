//! Owldoor Core - Shared types library.
//!
//! This crate provides common types used across all Owldoor components:
//! - `storefront` - Backend facade between the storefront page and Firebase
//! - `cli` - Command-line tools for catalog seeding and order administration
//!
//! # Architecture
//!
//! The core crate contains only types - no network access, no backend
//! clients. Identifier generation reads the system clock and a thread-local
//! RNG, nothing else.
//!
//! # Modules
//!
//! - [`types`] - Document IDs, emails, won prices, and entity statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
