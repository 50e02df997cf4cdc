//! EcomCloth Storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused:
//!
//! - [`storage`] - durable key-value stores and the cross-tab change bus
//! - [`cart`] - the per-tab cart state manager
//! - [`tabs`] - the registry of open tab sessions
//! - [`routes`] - the axum HTTP API

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod storage;
pub mod tabs;
