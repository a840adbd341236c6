//! Core functionality for the gateway.
//!
//! This module contains fundamental components used throughout the application:
//! - Configuration management
//! - Error handling
//! - Metrics collection
//! - HTTP middleware

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;

// Re-export commonly used types
pub use config::{AppConfig, AudioConfig, ServerConfig};
pub use error::{AppError, Result};
pub use metrics::{get_metrics, init_metrics, Metrics};
pub use middleware::{request_id_middleware, MetricsMiddleware};
