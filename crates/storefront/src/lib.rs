//! Owldoor Storefront library.
//!
//! The backend facade between the storefront page and the managed
//! identity + document service (Firebase Authentication and Cloud
//! Firestore). Every page-level intent is one async method on
//! [`Storefront`], and every method answers with an [`Outcome`], which
//! serializes to the `{success, ...}` shape the page renders.
//!
//! # Layers
//!
//! - [`backend`] - `IdentityProvider` / `DocumentStore` traits, the Firebase
//!   REST implementation, and an in-memory implementation for tests
//! - [`services`] - Auth, order, inquiry/quote, and catalog logic on top of
//!   the traits
//! - [`session`] - The signed-in user, published on a watch channel
//! - [`presentation`] - Turns session changes into header widget state
//! - [`facade`] - [`Storefront`], the handle the page talks to

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod facade;
pub mod models;
pub mod outcome;
pub mod presentation;
pub mod services;
pub mod session;

pub use config::StorefrontConfig;
pub use error::StorefrontError;
pub use facade::{FacadeOptions, InitError, Storefront};
pub use outcome::Outcome;
