//! # NZIS Referral Model
//!
//! Canonical model of a referral record as imported from the national health
//! information system (NZIS), and the rules that make one well-formed.
//!
//! The crate separates the wire shape from the domain model:
//! - [`ReferralWire`] is the exact JSON layout of the NZIS feed, every field
//!   optional so partial records still parse and can be reported in full.
//! - [`ReferralRecord`] is the typed record obtained through [`validate`],
//!   with invariants carried in the field types.
//!
//! Between the two sit [`normalize`] (deterministic, idempotent formatting),
//! [`validate`] (all violations reported, tagged with field key and reason
//! code), and the code [`Registry`] that gives external NZIS codes explicit
//! meaning. All operations are pure functions over immutable input.
//!
//! **No storage concerns**: persistence and import pipelines live in
//! `nzis-core`; this crate owns the data contract only.

pub mod error;
pub mod normalize;
pub mod record;
pub mod registry;
pub mod validation;
pub mod wire;

pub use error::{ReferralError, ReferralResult};
pub use normalize::normalize;
pub use record::{
    compare_issued_then_id, ConditionCode, PersonalId, ProvisionNumber, ReferenceId,
    ReferralRecord, WorkflowStage,
};
pub use registry::Registry;
pub use validation::{validate, validate_now, ReasonCode, ValidationError};
pub use wire::{parse_json, parse_json_batch, render_json, ReferralWire};
