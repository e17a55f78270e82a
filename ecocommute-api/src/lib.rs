//! # EcoCommute API Server Library
//!
//! HTTP surface of EcoCommute: weekly commute logging, points, challenges,
//! rewards and company leaderboards.
//!
//! ## Modules
//!
//! - `app`: Application state, identity middleware and router builder
//! - `config`: Layered configuration
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
