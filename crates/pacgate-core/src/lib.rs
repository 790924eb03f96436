//! # pacgate-core -- Foundational Types for the PAC Gateway
//!
//! Domain model shared by every crate in the workspace:
//!
//! - [`document`]: fiscal documents, their lifecycle status, and the
//!   append-only processing history.
//! - [`company`]: tenants, their per-environment PAC accounts, and the
//!   API keys ERPs use to submit documents.
//! - [`identity`]: identifier newtypes ([`CompanyId`], [`DocumentId`]).
//! - [`schema`]: JSON Schema validation of inbound PAC documents.
//! - [`payload`]: typed view over the inbound document body.
//! - [`mapper`]: pure transformation from an inbound payload into a
//!   pending [`NewFiscalDocument`].
//! - [`error`]: the error taxonomy used across crate boundaries.
//!
//! ## Crate Policy
//!
//! - No I/O. Persistence and network calls live in `pacgate-api` and
//!   `pacgate-pac-client`.
//! - No `.unwrap()` outside tests.

pub mod company;
pub mod document;
pub mod error;
pub mod identity;
pub mod mapper;
pub mod payload;
pub mod schema;

pub use company::{ApiKey, ApiKeyStatus, Company, Environment, PacAccount, PacConfig};
pub use document::{
    DocumentStatus, DocumentType, FiscalDocument, NewFiscalDocument, ProcessingStep, StepKind,
    StepStatus,
};
pub use error::{FieldViolation, PacgateError, ValidationErrors};
pub use identity::{CompanyId, DocumentId};
pub use mapper::DocumentMapper;
pub use schema::{DocumentSchema, SchemaError};
