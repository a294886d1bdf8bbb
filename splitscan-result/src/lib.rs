//! Error types and result definitions for the split-scan crates.
//!
//! Every crate in the workspace returns [`Result<T>`] with the shared
//! [`Error`] enum, so failures propagate across crate boundaries with `?`.
//!
//! # Error Categories
//!
//! - **Per-range failures** ([`Error::UnsupportedFormat`],
//!   [`Error::ScannerPrepareFailure`], [`Error::ScannerProcessFailure`]):
//!   recovered by the split processor, the scan range is cancelled
//! - **Fragment-fatal** ([`Error::MetadataInconsistency`], [`Error::ScanAborted`]):
//!   abort the whole scan
//! - **Plumbing** ([`Error::Io`], [`Error::Arrow`], [`Error::InvalidArgumentError`],
//!   [`Error::NotFound`], [`Error::Internal`])

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
