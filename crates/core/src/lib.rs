//! # NZIS Core
//!
//! Core business logic for the NZIS referral import system.
//!
//! This crate owns everything between the referral data contract
//! (`nzis-referral`) and the outer surfaces:
//! - the append-only [`ReferralStore`] with one JSON file per referral
//! - the batch import pipeline with per-record accept/reject reporting
//! - startup-resolved [`CoreConfig`] and registry loading
//!
//! **No presentation concerns**: CLIs and any future service interfaces
//! belong in their own crates and consume this one.

pub mod config;
pub mod constants;
pub mod error;
pub mod store;

pub use config::{resolve_data_dir, CoreConfig};
pub use error::{StoreError, StoreResult};
pub use store::{ImportReport, RejectReason, RejectedReferral, ReferralStore};
