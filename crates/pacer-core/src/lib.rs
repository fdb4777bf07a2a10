//! pacer core - shared types, defaults, and error handling
//!
//! This crate provides the foundational types used by the learning core
//! and the control daemon.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;
pub mod util;

pub use error::{PacerError, Result};
pub use types::*;
