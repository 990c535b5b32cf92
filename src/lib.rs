// src/lib.rs

//! BTC Map community notifier library.
//!
//! Detects businesses newly listed inside a community boundary and announces
//! each one through an external publish command, advancing a checkpoint only
//! after a fully successful run.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
