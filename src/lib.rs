//! Patient Registry Backend Library
//!
//! Users register and log in, then manage their own patients, a shared
//! doctor directory and the assignments between the two.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod middleware;
pub mod policy;
pub mod records;
pub mod state;
pub mod validation;
