//! Docfeat Domain Layer
//!
//! This crate contains the data model shared by every other docfeat crate.
//! It has ZERO external dependencies and defines the value types and trait
//! interfaces the infrastructure layers implement.
//!
//! ## Key Concepts
//!
//! - **Document**: one input file, identified by its filename, rendered once
//! - **Feature**: a named attribute extracted from documents (e.g. "Revenue")
//! - **GlobalSchema**: the ordered, batch-wide set of known feature names
//! - **ExtractedRow**: one document's feature values plus its source filename
//! - **ResultTable**: the aligned, CSV-ready table produced at the end of a batch
//!
//! ## Architecture
//!
//! - No external crate dependencies
//! - Pure data and invariants only
//! - Model and rendering backends live in other crates behind the traits in [`traits`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod feature;
pub mod row;
pub mod traits;

/// Literal value marking an absent or unextractable feature value
pub const MISSING_SENTINEL: &str = "N/A";

/// Default header of the column identifying the originating document
pub const DEFAULT_FILENAME_COLUMN: &str = "Source file";

// Re-exports for convenience
pub use document::{Attachment, Document, DocumentContent};
pub use feature::{FeatureMap, FeatureName, GlobalSchema};
pub use row::{ExtractedRow, ResultTable};
pub use traits::{CompletionClient, CompletionRequest, DocumentSource};

/// Returns true when `value` should be treated as missing
///
/// The sentinel is matched after trimming; blank values also count as missing.
///
/// # Examples
///
/// ```
/// use docfeat_domain::is_missing;
///
/// assert!(is_missing("N/A"));
/// assert!(is_missing("  "));
/// assert!(!is_missing("$5M"));
/// ```
pub fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed == MISSING_SENTINEL
}
