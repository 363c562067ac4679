//! Strip: locate secret carriers and blank their values.
//!
//! Depth-first walk over the root and the collections named by a
//! `ScanScope`.  Each carrier found produces a `Finding`; new or changed
//! values are replaced by the "not modified" placeholder, values that
//! match the baseline are left in place.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::baseline::Baseline;
use super::carrier::{CarrierKind, SECRET_VARIABLE_TYPE};
use super::finding::{Finding, FindingStatus, Redaction};
use super::scope::ScanScope;
use crate::errors::SecretsError;
use crate::tree::TreePath;

pub const CREDENTIALS_FIELD: &str = "credential_definition_list";
pub const AUTHENTICATION_FIELD: &str = "authentication";
const VARIABLES_FIELD: &str = "variable_list";
const HEADERS_FIELD: &str = "headers";
const ACTIONS_FIELD: &str = "action_list";
const TASKS_FIELD: &str = "task_definition_list";

/// Sub-path from a substrate to its Windows guest customization data.
const WINDOWS_DATA_PATH: [&str; 4] = [
    "create_spec",
    "resources",
    "guest_customization",
    "windows_data",
];

/// Password fields inside `windows_data` and the names findings get.
const GUEST_PASSWORD_FIELDS: [(&str, &str); 2] =
    [("password", "admin_password"), ("domain_password", "domain_password")];

/// Strip `tree`, returning the redacted tree and what was found.
pub fn strip(
    mut tree: Value,
    scope: &ScanScope,
    baseline: Option<&Baseline>,
) -> (Value, Redaction) {
    let redaction = strip_in_place(&mut tree, scope, baseline);
    (tree, redaction)
}

/// Strip `tree` in place.
pub fn strip_in_place(
    tree: &mut Value,
    scope: &ScanScope,
    baseline: Option<&Baseline>,
) -> Redaction {
    let mut scanner = Scanner {
        baseline,
        out: Redaction::default(),
    };
    let root = Cursor::root();

    scanner.scan_credentials(tree, &root);
    scanner.scan_entity(tree, &root);

    for key in &scope.object_lists {
        let Some(entities) = tree.get_mut(key.as_str()).and_then(Value::as_array_mut) else {
            continue;
        };
        for (index, entity) in entities.iter_mut().enumerate() {
            let here = root.key(key).entry(index, entity);
            scanner.scan_entity(entity, &here);
        }
    }

    for key in &scope.objects {
        if let Some(entity) = tree.get_mut(key.as_str()).filter(|v| v.is_object()) {
            scanner.scan_entity(entity, &root.key(key));
        }
    }

    for key in &scope.variable_lists {
        scanner.scan_variables(tree, &root, key);
    }

    info!(
        findings = scanner.out.findings.len(),
        unchanged = scanner.out.unchanged.len(),
        skipped = scanner.out.skipped.len(),
        "stripped secrets from tree"
    );
    scanner.out
}

/// Position of the walk: the path so far plus the position-independent
/// labels used to build context strings.
#[derive(Debug, Clone)]
struct Cursor {
    path: TreePath,
    labels: Vec<String>,
}

impl Cursor {
    fn root() -> Self {
        Self {
            path: TreePath::root(),
            labels: Vec::new(),
        }
    }

    fn key(&self, key: &str) -> Self {
        let mut labels = self.labels.clone();
        labels.push(key.to_string());
        Self {
            path: self.path.key(key),
            labels,
        }
    }

    /// Step into a sequence entry.  Named entries contribute their name,
    /// never their index.
    fn entry(&self, index: usize, node: &Value) -> Self {
        let mut labels = self.labels.clone();
        if let Some(name) = node.get("name").and_then(Value::as_str) {
            labels.push(name.to_string());
        }
        Self {
            path: self.path.index(index),
            labels,
        }
    }

    /// `<kind>:<enclosing labels>:<field>`.
    fn context(&self, kind: CarrierKind, field: &str) -> String {
        format!("{}:{}:{}", kind, self.labels.join("."), field)
    }
}

fn name_of(node: &Value, field: &str) -> String {
    node.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

struct Scanner<'b> {
    baseline: Option<&'b Baseline>,
    out: Redaction,
}

impl Scanner<'_> {
    fn scan_credentials(&mut self, root: &mut Value, at: &Cursor) {
        let Some(credentials) = root.get_mut(CREDENTIALS_FIELD).and_then(Value::as_array_mut) else {
            return;
        };
        let context = at.context(CarrierKind::Credential, CREDENTIALS_FIELD);
        for (index, credential) in credentials.iter_mut().enumerate() {
            let name = name_of(credential, "name");
            let path = at.path.key(CREDENTIALS_FIELD).index(index).key("secret");
            match credential.get_mut("secret") {
                Some(secret) => {
                    self.capture(CarrierKind::Credential, secret, path, context.clone(), name)
                }
                None => debug!(%path, %name, "credential has no secret blob"),
            }
        }
    }

    /// Any object that may own variables, actions, tasks, authentication
    /// or a guest customization block.
    fn scan_entity(&mut self, entity: &mut Value, at: &Cursor) {
        self.scan_authentication(entity, at);
        if let Some(attrs) = entity.get_mut("attrs").filter(|v| v.is_object()) {
            self.scan_authentication(attrs, &at.key("attrs"));
        }
        self.scan_variables(entity, at, VARIABLES_FIELD);
        self.scan_actions(entity, at);
        self.scan_tasks(entity, at);
        self.scan_guest_customization(entity, at);
    }

    fn scan_actions(&mut self, owner: &mut Value, at: &Cursor) {
        let Some(actions) = owner.get_mut(ACTIONS_FIELD).and_then(Value::as_array_mut) else {
            return;
        };
        for (index, action) in actions.iter_mut().enumerate() {
            let here = at.key(ACTIONS_FIELD).entry(index, action);
            if let Some(runbook) = action.get_mut("runbook").filter(|v| v.is_object()) {
                self.scan_entity(runbook, &here.key("runbook"));
            }
        }
    }

    fn scan_tasks(&mut self, owner: &mut Value, at: &Cursor) {
        let Some(tasks) = owner.get_mut(TASKS_FIELD).and_then(Value::as_array_mut) else {
            return;
        };
        for (index, task) in tasks.iter_mut().enumerate() {
            let here = at.key(TASKS_FIELD).entry(index, task);
            self.scan_variables(task, &here, VARIABLES_FIELD);

            if task.get("type").and_then(Value::as_str) != Some("HTTP") {
                continue;
            }
            if let Some(attrs) = task.get_mut("attrs").filter(|v| v.is_object()) {
                let attrs_at = here.key("attrs");
                self.scan_authentication(attrs, &attrs_at);
                self.scan_variables(attrs, &attrs_at, HEADERS_FIELD);
            }
        }
    }

    /// Scan a `variable_list`-shaped collection named `field` on `owner`.
    fn scan_variables(&mut self, owner: &mut Value, at: &Cursor, field: &str) {
        let Some(variables) = owner.get_mut(field).and_then(Value::as_array_mut) else {
            return;
        };
        let context = at.context(CarrierKind::Variable, field);
        for (index, variable) in variables.iter_mut().enumerate() {
            let here = at.key(field).entry(index, variable);

            if variable.get("type").and_then(Value::as_str) == Some(SECRET_VARIABLE_TYPE) {
                let name = name_of(variable, "name");
                let path = here.path.clone();
                self.capture(CarrierKind::Variable, variable, path, context.clone(), name);
            }

            // Dynamic options fetched over HTTP carry their own auth and headers.
            let Some(options) = variable.get_mut("options") else {
                continue;
            };
            if options.get("type").and_then(Value::as_str) != Some("HTTP") {
                continue;
            }
            if let Some(attrs) = options.get_mut("attrs").filter(|v| v.is_object()) {
                let attrs_at = here.key("options").key("attrs");
                self.scan_authentication(attrs, &attrs_at);
                self.scan_variables(attrs, &attrs_at, HEADERS_FIELD);
            }
        }
    }

    fn scan_authentication(&mut self, owner: &mut Value, at: &Cursor) {
        let Some(auth) = owner.get_mut(AUTHENTICATION_FIELD).and_then(Value::as_object_mut) else {
            return;
        };
        let declared = auth
            .get("auth_type")
            .or_else(|| auth.get("type"))
            .and_then(Value::as_str);
        if declared.is_some_and(|t| t != "basic") {
            return;
        }
        let username = auth
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let Some(password) = auth.get_mut("password") else {
            return;
        };
        let path = at.path.key(AUTHENTICATION_FIELD).key("password");
        let context = at.context(CarrierKind::BasicAuth, AUTHENTICATION_FIELD);
        self.capture(CarrierKind::BasicAuth, password, path, context, username);
    }

    fn scan_guest_customization(&mut self, substrate: &mut Value, at: &Cursor) {
        let windows_data: TreePath = WINDOWS_DATA_PATH.into_iter().collect();
        let Ok(node) = windows_data.resolve_mut(substrate) else {
            return;
        };
        let base = at.path.join(&windows_data);
        for (field, name) in GUEST_PASSWORD_FIELDS {
            if let Some(password) = node.get_mut(field) {
                let path = base.key(field);
                let context = at.context(CarrierKind::GuestCustomization, field);
                let kind = CarrierKind::GuestCustomization;
                self.capture(kind, password, path, context, name.to_string());
            }
        }
    }

    fn capture(
        &mut self,
        kind: CarrierKind,
        node: &mut Value,
        path: TreePath,
        context: String,
        name: String,
    ) {
        let value = match kind.secret_value(node) {
            Ok(Some(value)) => value.to_string(),
            Ok(None) => {
                debug!(%kind, %path, %name, "carrier holds no value");
                return;
            }
            Err(reason) => {
                warn!(%kind, %path, %name, reason, "skipping unsupported carrier");
                self.out.skipped.push(SecretsError::UnsupportedCarrier {
                    kind: kind.as_str(),
                    path: path.to_string(),
                    reason,
                });
                return;
            }
        };

        // Credentials have no per-field baseline: always stripped.
        let unchanged = kind != CarrierKind::Credential
            && self
                .baseline
                .is_some_and(|baseline| baseline.matches(&context, &name, &value));

        if unchanged {
            debug!(%kind, %path, %name, %context, "secret unchanged from baseline");
            self.out
                .unchanged
                .push(Finding::new(kind, path, name, value, context, FindingStatus::Unchanged));
        } else {
            debug!(%kind, %path, %name, %context, "stripping secret");
            kind.redact(node);
            self.out
                .findings
                .push(Finding::new(kind, path, name, value, context, FindingStatus::NewOrChanged));
        }
    }
}
