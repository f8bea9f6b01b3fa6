//! Job-level processing on top of the core client

pub mod data;
pub mod job;
