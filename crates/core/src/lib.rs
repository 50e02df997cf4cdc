//! EcomCloth Core - Shared types library.
//!
//! This crate provides the domain types used across all EcomCloth components:
//! - `storefront` - Catalog and cart HTTP service
//! - `cli` - Command-line tools for inspecting durable cart storage
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! access, no HTTP. Cart mutations are expressed as pure transitions
//! (`Cart -> Cart`); persisting the result is the caller's job.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and prices
//! - [`cart`] - Cart lines, identity keys and cart transitions
//! - [`catalog`] - The static product catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod types;

pub use cart::{Cart, CartDecodeError, CartItem, CartLine, CartOp, LineKey};
pub use catalog::{Category, Product};
pub use types::*;
