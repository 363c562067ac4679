//! Redaction and reconciliation of secrets inside configuration trees.
//!
//! This module provides:
//! - The carrier shapes that hold secrets (`carrier`)
//! - Findings passed from strip to patch (`finding`)
//! - Previously known secrets used for classification (`baseline`)
//! - Which parts of a document get scanned (`scope`)
//! - Strip: locate and blank secrets (`strip`)
//! - Patch: reinsert secrets after the round-trip (`patch`)
//!
//! Typical flow:
//!
//! ```text
//! let (redacted, redaction) = strip(tree, &ScanScope::blueprint(), baseline.as_ref());
//! let returned = /* send `redacted` to the remote step */;
//! let (patched, report) = patch(returned, &redaction.findings, &redaction.unchanged);
//! report.into_result()?;
//! ```

pub mod baseline;
pub mod carrier;
pub mod finding;
pub mod patch;
pub mod scope;
pub mod strip;

// Re-export the most commonly used items.
pub use baseline::Baseline;
pub use carrier::CarrierKind;
pub use finding::{Finding, FindingStatus, Redaction};
pub use patch::{
    patch, patch_credentials, patch_endpoint_auth, patch_in_place, NamedSecrets, PatchReport,
};
pub use scope::ScanScope;
pub use strip::{strip, strip_in_place};
