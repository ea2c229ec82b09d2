//! Error types shared by handlers and services

pub mod types;

pub use types::ApiError;
