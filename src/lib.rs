//! pricing-recorder - record distributor pricing and stock
//!
//! Logs into the 21st Century Distributing portal, fetches manufacturer
//! listing pages, and writes the parsed rows to CSV or JSON.

pub mod commands;
pub mod config;
pub mod format;
pub mod portal;

pub use config::{Config, Credentials, OutputFormat};
pub use portal::{PortalError, PriceRecord};
