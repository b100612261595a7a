//! HTTP client for the NetLab distributor catalog API.
//!
//! Wraps `reqwest` with NetLab-specific XML envelope handling and a
//! lock-guarded bearer-token cache. Every operation checks the embedded
//! `status/code` element and surfaces API-level failures as
//! [`NetlabError::Api`]. Retries are deliberately NOT performed here;
//! that is the sync orchestrator's responsibility.

pub mod client;
pub mod error;
mod token;
mod xml;

pub use client::NetlabClient;
pub use error::NetlabError;
