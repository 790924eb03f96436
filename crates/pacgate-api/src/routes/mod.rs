//! # API Route Modules
//!
//! - `documents`: tenant routes (API key). Document intake, dashboard reads,
//!   and the PAC submission trigger.
//! - `companies`: operator routes (admin token). Tenant registration, PAC
//!   accounts, API key lifecycle, and recovery of interrupted submissions.

pub mod companies;
pub mod documents;
