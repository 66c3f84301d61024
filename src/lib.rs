//! Client SDK for a library-management REST API.
//! Bearer-token sessions with durable storage and transparent refresh on
//! 401, plus typed catalog operations (search, detail, borrow, return,
//! borrowed list). The `cli` module backs the interactive binary.

pub mod auth;
pub mod catalog;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
