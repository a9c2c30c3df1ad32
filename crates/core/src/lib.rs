//! Marketstall Core - Shared domain types.
//!
//! This crate provides the types shared between the storefront binary and its
//! integration tests:
//! - `storefront` - Public-facing e-commerce site backed by a REST API
//! - `integration-tests` - End-to-end tests against a mock backend
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! The backend API owns all persistent data; these types describe what the
//! storefront receives from it and sends back.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, roles and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
