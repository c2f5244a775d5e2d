//! Posting gateway.
//!
//! The one place where event-driven postings cross into the ledger, each in
//! its own unit of work, with every failure logged and contained.

pub mod gateway;

pub use gateway::{GatewayStats, PostingGateway, PostingOutcome};
