//! herdbook: milk-production aggregation and a client for the farm API

pub mod cli;
pub mod services;
pub mod types;
