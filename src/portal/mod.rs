//! Portal-specific modules for the HTTP session, parsing, and data models.

pub mod client;
pub mod error;
pub mod models;
pub mod parser;
pub mod selectors;

pub use client::{FetchedPage, PortalClient, PortalSession};
pub use error::PortalError;
pub use models::{FlatRecord, PriceRecord};
pub use parser::{ListingPage, Parser};
