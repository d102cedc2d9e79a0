// src/lib.rs

pub mod agent;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod provider;
pub mod server;
pub mod store;
pub mod tools;
