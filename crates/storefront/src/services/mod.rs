//! Storefront services.
//!
//! Each service borrows the backend traits and implements one area of the
//! facade on top of them:
//!
//! - [`auth`] - Sign-up, sign-in (password and federated), profile documents
//! - [`orders`] - Order creation, status updates, listing
//! - [`requests`] - Inquiries and quote requests
//! - [`catalog`] - Cached product reads and the seed catalog

pub mod auth;
pub mod catalog;
pub mod orders;
pub mod requests;
