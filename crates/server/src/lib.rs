//! Tidesync server library.
//!
//! This crate provides the sync service as a library, allowing it to be
//! tested and reused by the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod shopify;
pub mod state;
pub mod sync;
