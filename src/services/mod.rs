//! Studio services driven by the CLI.
//!
//! ARCHITECTURE
//! ============
//! Each service is a set of free async functions over a shared [`Studio`]
//! handle. Services own validation, provider calls and persistence, so the
//! command layer stays a thin translation from arguments to calls.
//!
//! [`Studio`]: crate::state::Studio

pub mod concept;
pub mod export;
pub mod generation;
pub mod intake;
pub mod projects;
pub mod request;
pub mod sections;
pub mod toast;
