//! Integration tests for strip / patch over blueprint-shaped JSON trees.

use blueprint_secrets::errors::SecretsError;
use blueprint_secrets::redact::{
    patch, patch_credentials, patch_endpoint_auth, strip, Baseline, CarrierKind, FindingStatus,
    NamedSecrets, ScanScope,
};
use blueprint_secrets::tree::TreePath;
use serde_json::{json, Value};

/// A blueprint with one secret of every kind.
fn blueprint() -> Value {
    json!({
        "name": "shop",
        "credential_definition_list": [
            { "name": "admin", "username": "root", "secret": { "value": "s3cr3t", "attrs": {} } }
        ],
        "service_definition_list": [
            {
                "name": "Web",
                "variable_list": [
                    { "name": "port", "type": "LOCAL", "value": "8080" },
                    { "name": "api_token", "type": "SECRET", "value": "tok-1", "attrs": {} }
                ],
                "action_list": [
                    {
                        "name": "restart",
                        "runbook": {
                            "name": "restart_runbook",
                            "task_definition_list": [
                                {
                                    "name": "notify",
                                    "type": "HTTP",
                                    "attrs": {
                                        "authentication": {
                                            "auth_type": "basic",
                                            "username": "hook",
                                            "password": { "value": "hook-pass" }
                                        },
                                        "headers": [
                                            {
                                                "name": "X-Api-Key",
                                                "type": "SECRET",
                                                "value": "hdr-key"
                                            },
                                            { "name": "Accept", "type": "LOCAL", "value": "json" }
                                        ]
                                    }
                                }
                            ]
                        }
                    }
                ]
            }
        ],
        "substrate_definition_list": [
            {
                "name": "WinVM",
                "create_spec": { "resources": { "guest_customization": { "windows_data": {
                    "password": { "value": "admin-pw" },
                    "domain_password": { "value": "domain-pw" }
                } } } }
            }
        ],
        "app_profile_list": [
            {
                "name": "Default",
                "variable_list": [
                    { "name": "region", "type": "LOCAL", "value": "eu" },
                    { "name": "replicas", "type": "LOCAL", "value": "2" },
                    { "name": "db_password", "type": "SECRET", "value": "pg-pass", "attrs": {} },
                    {
                        "name": "flavour",
                        "type": "LOCAL",
                        "options": {
                            "type": "HTTP",
                            "attrs": {
                                "authentication": {
                                    "username": "lookup",
                                    "password": { "value": "lookup-pw" }
                                },
                                "headers": [
                                    { "name": "Token", "type": "SECRET", "value": "opt-token" }
                                ]
                            }
                        }
                    }
                ]
            }
        ]
    })
}

fn paths(findings: &[blueprint_secrets::redact::Finding]) -> Vec<String> {
    findings.iter().map(|f| f.path.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Strip
// ---------------------------------------------------------------------------

#[test]
fn credential_is_blanked_and_recorded() {
    let tree = json!({
        "credential_definition_list": [ { "name": "admin", "secret": { "value": "s3cr3t" } } ]
    });
    let (redacted, redaction) = strip(tree, &ScanScope::blueprint(), None);

    assert_eq!(
        redacted["credential_definition_list"][0]["secret"],
        json!({ "attrs": { "is_secret_modified": false, "secret_reference": null } })
    );
    assert_eq!(redaction.findings.len(), 1);
    let finding = &redaction.findings[0];
    assert_eq!(finding.kind, CarrierKind::Credential);
    assert_eq!(finding.path.to_string(), "credential_definition_list[0].secret");
    assert_eq!(finding.name, "admin");
    assert_eq!(finding.value(), "s3cr3t");
    assert_eq!(finding.status, FindingStatus::NewOrChanged);
}

#[test]
fn every_carrier_kind_is_found() {
    let (_, redaction) = strip(blueprint(), &ScanScope::blueprint(), None);
    let mut found = paths(&redaction.findings);
    found.sort();

    let mut expected = vec![
        "credential_definition_list[0].secret",
        "service_definition_list[0].variable_list[1]",
        "service_definition_list[0].action_list[0].runbook.task_definition_list[0].attrs.authentication.password",
        "service_definition_list[0].action_list[0].runbook.task_definition_list[0].attrs.headers[0]",
        "substrate_definition_list[0].create_spec.resources.guest_customization.windows_data.password",
        "substrate_definition_list[0].create_spec.resources.guest_customization.windows_data.domain_password",
        "app_profile_list[0].variable_list[2]",
        "app_profile_list[0].variable_list[3].options.attrs.authentication.password",
        "app_profile_list[0].variable_list[3].options.attrs.headers[0]",
    ];
    expected.sort();
    assert_eq!(found, expected);
    assert!(redaction.unchanged.is_empty());
    assert!(redaction.skipped.is_empty());
}

#[test]
fn redacted_tree_holds_no_plaintext() {
    let (redacted, redaction) = strip(blueprint(), &ScanScope::blueprint(), None);
    let text = serde_json::to_string(&redacted).unwrap();

    for finding in &redaction.findings {
        assert!(!text.contains(finding.value()), "{} leaked", finding.path);
    }
    // Non-secret values survive.
    assert!(text.contains("8080"));
    assert!(text.contains("\"json\""));
}

#[test]
fn names_and_contexts_identify_secrets() {
    let (_, redaction) = strip(blueprint(), &ScanScope::blueprint(), None);
    let by_path = |p: &str| {
        redaction
            .findings
            .iter()
            .find(|f| f.path.to_string() == p)
            .unwrap_or_else(|| panic!("no finding at {p}"))
    };

    let hook = by_path(
        "service_definition_list[0].action_list[0].runbook.task_definition_list[0].attrs.authentication.password",
    );
    assert_eq!(hook.kind, CarrierKind::BasicAuth);
    assert_eq!(hook.name, "hook");
    assert_eq!(
        hook.context,
        "basic_auth:service_definition_list.Web.action_list.restart.runbook.task_definition_list.notify.attrs:authentication"
    );

    let admin = by_path(
        "substrate_definition_list[0].create_spec.resources.guest_customization.windows_data.password",
    );
    assert_eq!(admin.kind, CarrierKind::GuestCustomization);
    assert_eq!(admin.name, "admin_password");
    assert_eq!(admin.value(), "admin-pw");

    let db = by_path("app_profile_list[0].variable_list[2]");
    assert_eq!(db.context, "variable:app_profile_list.Default:variable_list");
}

#[test]
fn baseline_match_is_left_in_place() {
    let mut baseline = Baseline::new();
    baseline.insert("variable:app_profile_list.Default:variable_list", "db_password", "pg-pass");

    let (redacted, redaction) = strip(blueprint(), &ScanScope::blueprint(), Some(&baseline));

    assert_eq!(
        redacted["app_profile_list"][0]["variable_list"][2]["value"],
        json!("pg-pass")
    );
    assert_eq!(paths(&redaction.unchanged), ["app_profile_list[0].variable_list[2]"]);
    assert_eq!(redaction.unchanged[0].status, FindingStatus::Unchanged);
    let stripped = paths(&redaction.findings);
    assert!(!stripped.contains(&"app_profile_list[0].variable_list[2]".to_string()));
}

#[test]
fn baseline_with_changed_value_still_strips() {
    let mut baseline = Baseline::new();
    baseline.insert("variable:app_profile_list.Default:variable_list", "db_password", "old-pass");

    let (redacted, redaction) = strip(blueprint(), &ScanScope::blueprint(), Some(&baseline));

    assert!(redaction.unchanged.is_empty());
    assert!(redacted["app_profile_list"][0]["variable_list"][2].get("value").is_none());
}

#[test]
fn credentials_ignore_the_baseline() {
    let (_, first) = strip(blueprint(), &ScanScope::blueprint(), None);
    let baseline = Baseline::from_findings(first.all());

    let (_, second) = strip(blueprint(), &ScanScope::blueprint(), Some(&baseline));

    assert_eq!(paths(&second.findings), ["credential_definition_list[0].secret"]);
    assert_eq!(second.unchanged.len(), first.findings.len() - 1);
}

#[test]
fn runbook_scope_walks_endpoint_definitions() {
    let tree = json!({
        "runbook": {
            "task_definition_list": [
                { "name": "t", "type": "EXEC", "variable_list": [
                    { "name": "key", "type": "SECRET", "value": "k" }
                ] }
            ]
        },
        "endpoint_definition_list": [
            {
                "name": "linux",
                "attrs": {
                    "authentication": {
                        "type": "basic",
                        "username": "ops",
                        "password": { "value": "p" }
                    }
                }
            }
        ]
    });
    let (_, redaction) = strip(tree, &ScanScope::runbook(), None);
    let mut found = paths(&redaction.findings);
    found.sort();
    assert_eq!(
        found,
        [
            "endpoint_definition_list[0].attrs.authentication.password",
            "runbook.task_definition_list[0].variable_list[0]",
        ]
    );
}

#[test]
fn non_http_task_auth_is_not_scanned() {
    let tree = json!({
        "task_definition_list": [
            { "name": "t", "type": "EXEC", "attrs": {
                "authentication": { "username": "u", "password": { "value": "p" } }
            } }
        ]
    });
    let (_, redaction) = strip(tree, &ScanScope::runbook(), None);
    assert!(redaction.is_empty());
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

#[test]
fn patch_restores_every_stripped_value() {
    let original = blueprint();
    let (redacted, redaction) = strip(original.clone(), &ScanScope::blueprint(), None);

    let (patched, report) = patch(redacted, &redaction.findings, &redaction.unchanged);

    assert!(report.is_complete());
    assert_eq!(report.applied, redaction.findings.len());
    for finding in &redaction.findings {
        let node = finding.path.resolve(&patched).unwrap();
        assert_eq!(node["value"], json!(finding.value()), "{}", finding.path);
        assert_eq!(node["attrs"]["is_secret_modified"], json!(true));
    }
    // Everything outside the carriers is untouched.
    assert_eq!(
        patched["service_definition_list"][0]["variable_list"][0],
        original["service_definition_list"][0]["variable_list"][0]
    );
    assert_eq!(patched["name"], original["name"]);
}

#[test]
fn patch_marks_unchanged_as_not_modified() {
    let mut baseline = Baseline::new();
    baseline.insert("variable:app_profile_list.Default:variable_list", "db_password", "pg-pass");
    let (redacted, redaction) = strip(blueprint(), &ScanScope::blueprint(), Some(&baseline));

    let (patched, report) = patch(redacted, &redaction.findings, &redaction.unchanged);

    assert_eq!(report.marked_unchanged, 1);
    let db = &patched["app_profile_list"][0]["variable_list"][2];
    assert_eq!(db["value"], json!("pg-pass"));
    assert_eq!(db["attrs"]["is_secret_modified"], json!(false));
}

#[test]
fn missing_ancestor_fails_only_that_finding() {
    let (mut redacted, redaction) = strip(blueprint(), &ScanScope::blueprint(), None);
    // The remote step dropped the whole profile.
    redacted["app_profile_list"] = json!([]);

    let (patched, report) = patch(redacted, &redaction.findings, &redaction.unchanged);

    let profile_findings = redaction
        .findings
        .iter()
        .filter(|f| f.path.to_string().starts_with("app_profile_list"))
        .count();
    assert_eq!(report.failures.len(), profile_findings);
    assert_eq!(report.applied, redaction.findings.len() - profile_findings);
    for failure in &report.failures {
        match failure {
            SecretsError::PathResolutionFailure { path, depth, .. } => {
                assert!(path.starts_with("app_profile_list[0]"));
                assert_eq!(*depth, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(patched["credential_definition_list"][0]["secret"]["value"], json!("s3cr3t"));
    assert!(matches!(
        report.into_result(),
        Err(SecretsError::IncompletePatch(n)) if n == profile_findings
    ));
}

#[test]
fn single_missing_entry_is_one_failure() {
    let tree = json!({
        "app_profile_list": [ { "name": "Default", "variable_list": [
            { "name": "db_password", "type": "SECRET", "value": "pg-pass" }
        ] } ],
        "variable_list": [ { "name": "root_secret", "type": "SECRET", "value": "r" } ]
    });
    let (mut redacted, redaction) = strip(tree, &ScanScope::blueprint(), None);
    redacted["app_profile_list"].as_array_mut().unwrap().clear();

    let (patched, report) = patch(redacted, &redaction.findings, &redaction.unchanged);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.applied, 1);
    assert_eq!(patched["variable_list"][0]["value"], json!("r"));
}

#[test]
fn rebind_lets_a_substripped_document_patch_its_parent() {
    let runbook = json!({
        "task_definition_list": [
            { "name": "t", "type": "EXEC", "variable_list": [
                { "name": "key", "type": "SECRET", "value": "k" }
            ] }
        ]
    });
    let (redacted_runbook, mut redaction) = strip(runbook, &ScanScope::new(), None);

    let mut parent = json!({ "action_list": [ { "name": "a", "runbook": {} } ] });
    parent["action_list"][0]["runbook"] = redacted_runbook;

    let onto = TreePath::root().key("action_list").index(0).key("runbook");
    redaction.rebind(&TreePath::root(), &onto);

    let (patched, report) = patch(parent, &redaction.findings, &redaction.unchanged);
    assert!(report.is_complete());
    let task = &patched["action_list"][0]["runbook"]["task_definition_list"][0];
    assert_eq!(task["variable_list"][0]["value"], json!("k"));
}

#[test]
fn patch_by_name_for_credentials_and_endpoints() {
    let (mut redacted, redaction) = strip(blueprint(), &ScanScope::blueprint(), None);
    let secrets = NamedSecrets::from_findings(&redaction.findings, CarrierKind::Credential);
    assert_eq!(secrets.len(), 1);

    assert!(patch_credentials(&mut redacted, &secrets).is_empty());
    assert_eq!(redacted["credential_definition_list"][0]["secret"]["value"], json!("s3cr3t"));

    let mut endpoint = json!({
        "name": "ep",
        "attrs": { "authentication": { "username": "ops", "password": { "attrs": {} } } }
    });
    let mut creds = NamedSecrets::new();
    creds.insert("ops", "ops-pass");
    creds.insert("nobody", "x");

    let missing = patch_endpoint_auth(&mut endpoint, &creds);
    assert_eq!(missing, ["nobody"]);
    assert_eq!(endpoint["attrs"]["authentication"]["password"]["value"], json!("ops-pass"));
}

// ---------------------------------------------------------------------------
// Property-based tests
// ---------------------------------------------------------------------------

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    /// Shape of one generated entity: its own secrets plus nested runbooks.
    #[derive(Debug, Clone)]
    struct EntityShape {
        variables: Vec<String>,
        password: Option<String>,
        headers: Vec<String>,
        actions: Vec<EntityShape>,
    }

    impl EntityShape {
        fn secret_count(&self) -> usize {
            self.variables.len()
                + usize::from(self.password.is_some())
                + self.headers.len()
                + self.actions.iter().map(EntityShape::secret_count).sum::<usize>()
        }
    }

    fn secret() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9!#%&*+=?@^_~-]{1,24}"
    }

    fn own_secrets() -> impl Strategy<Value = (Vec<String>, Option<String>, Vec<String>)> {
        (
            prop::collection::vec(secret(), 0..4),
            prop::option::of(secret()),
            prop::collection::vec(secret(), 0..3),
        )
    }

    fn entity() -> impl Strategy<Value = EntityShape> {
        let leaf = own_secrets().prop_map(|(variables, password, headers)| EntityShape {
            variables,
            password,
            headers,
            actions: Vec::new(),
        });
        leaf.prop_recursive(3, 24, 3, |inner| {
            (own_secrets(), prop::collection::vec(inner, 0..3)).prop_map(
                |((variables, password, headers), actions)| EntityShape {
                    variables,
                    password,
                    headers,
                    actions,
                },
            )
        })
    }

    fn tree() -> impl Strategy<Value = (Vec<String>, Vec<EntityShape>)> {
        (
            prop::collection::vec(secret(), 0..4),
            prop::collection::vec(entity(), 0..3),
        )
    }

    /// A variable list with every secret interleaved with a plain entry.
    fn variables(prefix: &str, secrets: &[String]) -> Value {
        let entries = secrets
            .iter()
            .enumerate()
            .flat_map(|(i, value)| {
                [
                    json!({ "name": format!("{prefix}_plain{i}"), "type": "LOCAL", "value": "x" }),
                    json!({ "name": format!("{prefix}{i}"), "type": "SECRET", "value": value }),
                ]
            })
            .collect();
        Value::Array(entries)
    }

    fn build_entity(shape: &EntityShape, name: &str) -> Value {
        let mut entity = json!({
            "name": name,
            "variable_list": variables("var", &shape.variables)
        });

        if let Some(password) = &shape.password {
            entity["authentication"] = json!({
                "type": "basic",
                "username": "user",
                "password": { "value": password }
            });
        }
        if !shape.headers.is_empty() {
            entity["task_definition_list"] = json!([{
                "name": "call",
                "type": "HTTP",
                "attrs": { "headers": variables("hdr", &shape.headers) }
            }]);
        }
        if !shape.actions.is_empty() {
            let actions = shape
                .actions
                .iter()
                .enumerate()
                .map(|(i, child)| {
                    json!({ "name": format!("action{i}"), "runbook": build_entity(child, "rb") })
                })
                .collect();
            entity["action_list"] = Value::Array(actions);
        }
        entity
    }

    fn build_tree(credentials: &[String], services: &[EntityShape]) -> Value {
        let credentials: Vec<Value> = credentials
            .iter()
            .enumerate()
            .map(|(i, value)| json!({ "name": format!("cred{i}"), "secret": { "value": value } }))
            .collect();
        let services: Vec<Value> = services
            .iter()
            .enumerate()
            .map(|(i, shape)| build_entity(shape, &format!("service{i}")))
            .collect();
        json!({
            "name": "generated",
            "credential_definition_list": credentials,
            "service_definition_list": services
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn strip_then_patch_restores_every_value((credentials, services) in tree()) {
            let original = build_tree(&credentials, &services);
            let expected = credentials.len()
                + services.iter().map(EntityShape::secret_count).sum::<usize>();

            let (redacted, redaction) = strip(original.clone(), &ScanScope::blueprint(), None);
            prop_assert_eq!(redaction.findings.len(), expected);
            prop_assert!(redaction.unchanged.is_empty());

            for finding in &redaction.findings {
                let blanked = finding.path.resolve(&redacted).unwrap();
                prop_assert!(blanked.get("value").is_none());
            }

            let (patched, report) = patch(redacted, &redaction.findings, &[]);
            prop_assert!(report.is_complete());
            prop_assert_eq!(report.applied, expected);

            for finding in &redaction.findings {
                let before = finding.path.resolve(&original).unwrap();
                let after = finding.path.resolve(&patched).unwrap();
                prop_assert_eq!(&after["value"], &before["value"]);
            }
        }

        #[test]
        fn baseline_keeps_every_known_secret((credentials, services) in tree()) {
            let original = build_tree(&credentials, &services);
            let (_, first) = strip(original.clone(), &ScanScope::blueprint(), None);
            let baseline = Baseline::from_findings(&first.findings);

            let (redacted, second) = strip(original, &ScanScope::blueprint(), Some(&baseline));

            // Credentials are always stripped; everything else is known.
            prop_assert_eq!(second.findings.len(), credentials.len());
            prop_assert!(second.findings.iter().all(|f| f.kind == CarrierKind::Credential));
            prop_assert_eq!(second.unchanged.len(), first.findings.len() - credentials.len());

            for finding in &second.unchanged {
                prop_assert_eq!(finding.status, FindingStatus::Unchanged);
                let node = finding.path.resolve(&redacted).unwrap();
                prop_assert_eq!(&node["value"], &json!(finding.value()));
            }
        }
    }
}
