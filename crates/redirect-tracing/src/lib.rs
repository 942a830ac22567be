//! Tracing setup for mirror-redirect: fmt logging with optional OTLP export,
//! plus span macros shared by discovery and the redirector.

pub mod config;
pub mod otlp;
pub mod spans;

pub use config::{OtlpProtocol, TracingConfig};
pub use otlp::{init_tracing, TracingGuard};
