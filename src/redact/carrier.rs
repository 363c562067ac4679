//! The fixed document shapes known to hold a secret value.
//!
//! Every carrier points at a "secret-bearing node": a JSON object that
//! holds the plaintext under `value` and a modification marker under
//! `attrs.is_secret_modified`.
//!
//! | kind                  | secret-bearing node                                  |
//! |-----------------------|------------------------------------------------------|
//! | `Credential`          | `credential_definition_list[i].secret`               |
//! | `BasicAuth`           | `<owner>.authentication.password`                    |
//! | `Variable`            | the `variable_list[i]` / `headers[i]` entry itself   |
//! | `GuestCustomization`  | `...guest_customization.windows_data.<password>`     |

use std::fmt;

use serde_json::{json, Map, Value};

/// Declared variable type that marks a typed variable as secret.
pub const SECRET_VARIABLE_TYPE: &str = "SECRET";

/// Key of the modification marker inside `attrs`.
const MODIFIED_FLAG: &str = "is_secret_modified";

/// The polymorphic set of secret carriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarrierKind {
    /// `{name, secret: {value, ...}}` in the top-level credential list.
    Credential,
    /// `{username, password: {value, ...}}` under an `authentication` field.
    BasicAuth,
    /// A `variable_list`-shaped entry whose declared type is `SECRET`.
    Variable,
    /// Windows admin/domain password in a VM guest customization block.
    GuestCustomization,
}

impl CarrierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::BasicAuth => "basic_auth",
            Self::Variable => "variable",
            Self::GuestCustomization => "guest_customization",
        }
    }

    /// Read the plaintext held by a secret-bearing node.
    ///
    /// `Ok(None)` means the carrier holds no value (absent, null or empty)
    /// and is not a finding.  `Err` names why the shape cannot be handled.
    pub fn secret_value<'a>(&self, node: &'a Value) -> Result<Option<&'a str>, &'static str> {
        let Some(object) = node.as_object() else {
            return Err("secret-bearing node is not an object");
        };
        match object.get("value") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err("secret value is not a string"),
        }
    }

    /// Remove the plaintext and leave the "not modified" placeholder.
    pub fn redact(&self, node: &mut Value) {
        match self {
            // The whole secret blob is replaced.
            Self::Credential => *node = json!({ "attrs": placeholder_attrs() }),
            Self::BasicAuth | Self::Variable | Self::GuestCustomization => {
                if let Some(object) = node.as_object_mut() {
                    object.remove("value");
                    object.insert("attrs".to_string(), Value::Object(placeholder_attrs()));
                }
            }
        }
    }

    /// Flag the node as "not modified" without touching its value.
    pub fn mark_unchanged(&self, node: &mut Value) -> bool {
        set_modified(node, false)
    }

    /// Write `value` back into the node and flag it as "modified".
    pub fn reinsert(&self, node: &mut Value, value: &str) -> bool {
        if !set_modified(node, true) {
            return false;
        }
        match node.as_object_mut() {
            Some(object) => {
                object.insert("value".to_string(), Value::String(value.to_string()));
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for CarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn placeholder_attrs() -> Map<String, Value> {
    let mut attrs = Map::new();
    attrs.insert(MODIFIED_FLAG.to_string(), Value::Bool(false));
    attrs.insert("secret_reference".to_string(), Value::Null);
    attrs
}

/// Set `attrs.is_secret_modified`, keeping whatever else the remote side
/// put into `attrs`.  Returns `false` if `node` is not an object.
fn set_modified(node: &mut Value, modified: bool) -> bool {
    let Some(object) = node.as_object_mut() else {
        return false;
    };
    let attrs = object
        .entry("attrs")
        .or_insert_with(|| Value::Object(Map::new()));
    if !attrs.is_object() {
        *attrs = Value::Object(Map::new());
    }
    if let Some(attrs) = attrs.as_object_mut() {
        attrs.insert(MODIFIED_FLAG.to_string(), Value::Bool(modified));
    }
    true
}
