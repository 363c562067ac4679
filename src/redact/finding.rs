//! Findings exchanged between strip and patch.

use std::fmt;

use zeroize::Zeroizing;

use super::carrier::CarrierKind;
use crate::errors::SecretsError;
use crate::tree::TreePath;

/// How a located secret compares with the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingStatus {
    /// No baseline entry, or the baseline holds a different value.
    NewOrChanged,
    /// The baseline already holds this exact value.
    Unchanged,
}

/// A located secret.
///
/// The value lives only in memory and is wiped on drop.  `Debug` never
/// prints it.
#[derive(Clone)]
pub struct Finding {
    pub path: TreePath,
    pub name: String,
    pub kind: CarrierKind,
    pub context: String,
    pub status: FindingStatus,
    value: Zeroizing<String>,
}

impl Finding {
    pub fn new(
        kind: CarrierKind,
        path: TreePath,
        name: impl Into<String>,
        value: impl Into<String>,
        context: impl Into<String>,
        status: FindingStatus,
    ) -> Self {
        Self {
            path,
            name: name.into(),
            kind,
            context: context.into(),
            status,
            value: Zeroizing::new(value.into()),
        }
    }

    /// The plaintext.  Callers must not log or persist it.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finding")
            .field("path", &self.path.to_string())
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("context", &self.context)
            .field("status", &self.status)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Everything `strip` learned about one tree.
#[derive(Debug, Default)]
pub struct Redaction {
    /// New or changed secrets, blanked in the redacted tree.
    pub findings: Vec<Finding>,
    /// Secrets matching the baseline, left in place.
    pub unchanged: Vec<Finding>,
    /// Carrier-looking shapes that were skipped, as `UnsupportedCarrier`.
    pub skipped: Vec<SecretsError>,
}

impl Redaction {
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty() && self.unchanged.is_empty()
    }

    /// All findings regardless of status.
    pub fn all(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().chain(self.unchanged.iter())
    }

    /// Re-address every finding recorded under `from` to live under `onto`.
    ///
    /// Used when a sub-document was stripped on its own and the enclosing
    /// document is the one that gets patched.  Findings outside `from` are
    /// left as they are.
    pub fn rebind(&mut self, from: &TreePath, onto: &TreePath) {
        for finding in self.findings.iter_mut().chain(self.unchanged.iter_mut()) {
            if let Some(path) = finding.path.rebind(from, onto) {
                finding.path = path;
            }
        }
    }
}
