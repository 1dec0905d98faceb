//! # LIMS Core
//!
//! Core business logic for laboratory result entry and sample reception.
//!
//! This crate contains pure domain operations:
//! - Classifying lab results against reference ranges ([`flag`])
//! - Result sets and the submission gate ([`result_set`], [`submission`])
//! - Pre-analytical verification at reception ([`verification`])
//! - Sample lifecycle and worklists ([`sample`], [`worklist`])
//! - An in-memory, version-checked store and audit sinks ([`store`], [`audit`])
//!
//! **No API concerns**: HTTP servers, request parsing and authentication belong in
//! `api-rest` or `api-shared`.

pub mod audit;
pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod fixtures;
pub mod flag;
pub mod result_set;
pub mod sample;
pub mod service;
pub mod store;
pub mod submission;
pub mod validation;
pub mod verification;
pub mod worklist;

pub use audit::{AuditEvent, AuditEventKind, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use config::CoreConfig;
pub use document::ResultSetDocument;
pub use error::{LimsError, LimsResult};
pub use flag::{classify, parse_result_value, ReferenceRange, ResultFlag};
pub use result_set::{FlagSummary, Parameter, ParameterGroup, ResultSet, ResultSetStatus};
pub use service::{ReceptionService, ResultEntryService};
pub use store::{ResultSetStore, SampleStore};
pub use submission::{evaluate_submission, RejectionReason, SubmissionDecision};
pub use verification::{
    evaluate_acceptance, AcceptanceDecision, RejectionCategory, SampleRejection,
    VerificationCheck, VerificationChecklist,
};
pub use worklist::{paginate, Page, WorklistFilter, WorklistQuery};

pub use lims_types::NonEmptyText;
