//! Core connector: configuration, credentials, transport and the ModernMT client

pub mod client;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod http;
pub mod models;
