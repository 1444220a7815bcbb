//! Doorstep - COD checkout gateway.
//!
//! Library surface for the `doorstep-server` binary and its integration
//! tests.
//!
//! # Architecture
//!
//! - Axum web framework exposing a small JSON API
//! - Shopify Admin REST API for customers, orders, and marketing events
//! - Meta Graph API for server-side conversion events
//! - An SMS/WhatsApp vendor gateway for one-time code delivery
//! - `PostgreSQL` for shops, verification records, and local order copies
//!
//! The stores and external gateways are trait objects so tests can swap in
//! in-memory fakes and counting stubs; see [`db::memory`] and the
//! integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod meta;
pub mod models;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;
