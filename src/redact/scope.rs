//! Which parts of a document the scanner walks.

/// The top-level collections a strip pass covers.
///
/// The root itself is always scanned (credentials, authentication,
/// variables, actions).  On top of that:
/// - every entry of each `object_lists` collection is scanned as an entity,
/// - each `objects` field is scanned as a single entity,
/// - each `variable_lists` collection is scanned as a `variable_list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanScope {
    pub object_lists: Vec<String>,
    pub objects: Vec<String>,
    pub variable_lists: Vec<String>,
}

impl ScanScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lists<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.object_lists.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_objects<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.objects.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_variable_lists<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variable_lists.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Blueprint resources: services, packages, substrates, profiles.
    pub fn blueprint() -> Self {
        Self::new().with_lists([
            "service_definition_list",
            "package_definition_list",
            "substrate_definition_list",
            "app_profile_list",
        ])
    }

    /// Runbook resources: the runbook itself plus its endpoints.
    pub fn runbook() -> Self {
        Self::new()
            .with_objects(["runbook"])
            .with_lists(["endpoint_definition_list"])
    }

    /// A standalone endpoint: the root only.
    pub fn endpoint() -> Self {
        Self::new()
    }

    /// Provider resources: auth schema, endpoint schema, resource types.
    pub fn provider() -> Self {
        Self::new()
            .with_variable_lists(["auth_schema_list"])
            .with_objects(["endpoint_schema"])
            .with_lists(["resource_type_list"])
    }

    /// Look up a preset by document kind name.
    pub fn for_document(kind: &str) -> Option<Self> {
        match kind {
            "blueprint" => Some(Self::blueprint()),
            "runbook" => Some(Self::runbook()),
            "endpoint" => Some(Self::endpoint()),
            "provider" => Some(Self::provider()),
            _ => None,
        }
    }
}
