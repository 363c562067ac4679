//! Patch: reinsert secrets into a tree that came back from the remote step.
//!
//! Callers rely on one contract: the remote step preserves the shape of
//! every ancestor of a recorded path (collection order and membership).
//! When that contract is broken for a finding, the finding is reported as
//! a `PathResolutionFailure` and the rest of the batch still applies.

use std::collections::{BTreeSet, HashMap};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::carrier::CarrierKind;
use super::finding::Finding;
use super::strip::{AUTHENTICATION_FIELD, CREDENTIALS_FIELD};
use crate::errors::{Result, SecretsError};
use crate::tree::TreePath;

/// Outcome of a `patch` pass.
#[derive(Debug, Default)]
pub struct PatchReport {
    /// New or changed secrets written back.
    pub applied: usize,
    /// Unchanged secrets flagged as "not modified".
    pub marked_unchanged: usize,
    /// One `PathResolutionFailure` per new or changed secret not written back.
    pub failures: Vec<SecretsError>,
    /// Unchanged findings whose path no longer resolves.
    pub stale_unchanged: Vec<TreePath>,
}

impl PatchReport {
    /// True when every new or changed secret was reinserted.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn an incomplete patch into `IncompletePatch`.
    pub fn into_result(self) -> Result<usize> {
        if self.failures.is_empty() {
            Ok(self.applied)
        } else {
            Err(SecretsError::IncompletePatch(self.failures.len()))
        }
    }
}

/// Patch `tree`, returning it with the report.
pub fn patch(mut tree: Value, findings: &[Finding], unchanged: &[Finding]) -> (Value, PatchReport) {
    let report = patch_in_place(&mut tree, findings, unchanged);
    (tree, report)
}

/// Patch `tree` in place.
pub fn patch_in_place(
    tree: &mut Value,
    findings: &[Finding],
    unchanged: &[Finding],
) -> PatchReport {
    let mut report = PatchReport::default();

    for finding in unchanged {
        let marked = finding
            .path
            .resolve_mut(tree)
            .map(|node| finding.kind.mark_unchanged(node))
            .unwrap_or(false);
        if marked {
            report.marked_unchanged += 1;
        } else {
            debug!(
                path = %finding.path,
                name = %finding.name,
                "unchanged secret no longer resolves"
            );
            report.stale_unchanged.push(finding.path.clone());
        }
    }

    for finding in findings {
        let depth = match finding.path.resolve_mut(tree) {
            Ok(node) => {
                if finding.kind.reinsert(node, finding.value()) {
                    report.applied += 1;
                    continue;
                }
                // The node exists but is no longer an object.
                finding.path.len()
            }
            Err(e) => e.depth,
        };
        warn!(path = %finding.path, name = %finding.name, depth, "secret could not be reinserted");
        report.failures.push(SecretsError::PathResolutionFailure {
            name: finding.name.clone(),
            path: finding.path.to_string(),
            depth,
        });
    }

    info!(
        applied = report.applied,
        marked_unchanged = report.marked_unchanged,
        failures = report.failures.len(),
        "patched secrets into tree"
    );
    report
}

/// Secret values keyed by the enclosing object's own identity: the
/// credential name, or the basic-auth username.
#[derive(Default)]
pub struct NamedSecrets {
    values: HashMap<String, Zeroizing<String>>,
}

impl NamedSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), Zeroizing::new(value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|v| v.as_str())
    }

    /// Collect the values of every finding of `kind`.
    pub fn from_findings<'a>(
        findings: impl IntoIterator<Item = &'a Finding>,
        kind: CarrierKind,
    ) -> Self {
        let mut named = Self::new();
        for finding in findings.into_iter().filter(|f| f.kind == kind) {
            named.insert(finding.name.clone(), finding.value());
        }
        named
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn names(&self) -> BTreeSet<&str> {
        self.values.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for NamedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedSecrets").field("names", &self.names()).finish()
    }
}

/// Reinsert credential secrets by credential name.
///
/// Returns the names from `secrets` that matched no credential.
pub fn patch_credentials(tree: &mut Value, secrets: &NamedSecrets) -> Vec<String> {
    let mut missing = secrets.names();

    if let Some(credentials) = tree.get_mut(CREDENTIALS_FIELD).and_then(Value::as_array_mut) {
        for credential in credentials.iter_mut() {
            let Some(name) = credential
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
            else {
                continue;
            };
            let Some(value) = secrets.get(&name) else {
                continue;
            };
            let Some(object) = credential.as_object_mut() else {
                continue;
            };
            let secret = object
                .entry("secret")
                .or_insert_with(|| Value::Object(Map::new()));
            if CarrierKind::Credential.reinsert(secret, value) {
                debug!(%name, "credential secret reinserted");
                missing.remove(name.as_str());
            }
        }
    }

    missing.into_iter().map(str::to_string).collect()
}

/// Reinsert the password of a top-level basic-auth block by username.
///
/// Looks at `authentication` on the root, then under `attrs`.  Returns the
/// names from `secrets` that were not placed.
pub fn patch_endpoint_auth(tree: &mut Value, secrets: &NamedSecrets) -> Vec<String> {
    let mut missing = secrets.names();

    let owners = [TreePath::root(), TreePath::root().key("attrs")];
    for owner in &owners {
        let auth_path = owner.key(AUTHENTICATION_FIELD);
        let Ok(auth) = auth_path.resolve_mut(tree) else {
            continue;
        };
        let Some(object) = auth.as_object_mut() else {
            continue;
        };
        let Some(username) = object
            .get("username")
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            continue;
        };
        let Some(value) = secrets.get(&username) else {
            continue;
        };
        let password = object
            .entry("password")
            .or_insert_with(|| Value::Object(Map::new()));
        if CarrierKind::BasicAuth.reinsert(password, value) {
            debug!(path = %auth_path, %username, "endpoint password reinserted");
            missing.remove(username.as_str());
        }
    }

    missing.into_iter().map(str::to_string).collect()
}
