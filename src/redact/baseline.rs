//! Previously known secrets, used to avoid re-submitting unchanged values.

use std::collections::HashMap;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::finding::Finding;

/// Context string → `{name: value}` of secrets known from an earlier
/// decompilation.  Read-only to the redaction engine.
#[derive(Default)]
pub struct Baseline {
    entries: HashMap<String, HashMap<String, Zeroizing<String>>>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name = value` under `context`.
    pub fn insert(
        &mut self,
        context: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.entries
            .entry(context.into())
            .or_default()
            .insert(name.into(), Zeroizing::new(value.into()));
    }

    /// Build a baseline from findings of an earlier strip.
    pub fn from_findings<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut baseline = Self::new();
        for finding in findings {
            baseline.insert(finding.context.clone(), finding.name.clone(), finding.value());
        }
        baseline
    }

    /// Whether `baseline[context][name] == value`, compared in constant time.
    pub fn matches(&self, context: &str, name: &str, value: &str) -> bool {
        self.entries
            .get(context)
            .and_then(|names| names.get(name))
            .is_some_and(|known| bool::from(known.as_bytes().ct_eq(value.as_bytes())))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Baseline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Baseline")
            .field("contexts", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_requires_context_name_and_value() {
        let mut baseline = Baseline::new();
        baseline.insert("variable:app_profile_list.Default:variable_list", "db_password", "x");

        let ctx = "variable:app_profile_list.Default:variable_list";
        assert!(baseline.matches(ctx, "db_password", "x"));
        assert!(!baseline.matches(ctx, "db_password", "y"));
        assert!(!baseline.matches(ctx, "other", "x"));
        assert!(!baseline.matches(
            "variable:app_profile_list.Other:variable_list",
            "db_password",
            "x"
        ));
        assert_eq!(baseline.len(), 1);
    }

    #[test]
    fn debug_lists_contexts_only() {
        let mut baseline = Baseline::new();
        baseline.insert("ctx", "n", "topsecret");
        let rendered = format!("{baseline:?}");
        assert!(rendered.contains("ctx"));
        assert!(!rendered.contains("topsecret"));
    }
}
