//! Configuration and the classification record

pub mod config;
pub mod models;
