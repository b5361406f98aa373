//! Shared typed models used across construction, storage, and query layers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Element variants
// ---------------------------------------------------------------------------

/// Member visibility derived from Python naming conventions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    /// `__x` is private, `_x` is protected, dunder names and everything else
    /// are public.
    pub fn from_name(name: &str) -> Self {
        let is_dunder = name.len() > 4 && name.starts_with("__") && name.ends_with("__");
        if is_dunder {
            Visibility::Public
        } else if name.starts_with("__") {
            Visibility::Private
        } else if name.starts_with('_') {
            Visibility::Protected
        } else {
            Visibility::Public
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

/// The closed set of structural element variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Package,
    Module,
    Classifier {
        /// Raw base-type tokens, captured verbatim and resolved later.
        declared_base_names: Vec<String>,
    },
    Member {
        visibility: Visibility,
    },
}

impl ElementKind {
    pub fn classifier(declared_base_names: Vec<String>) -> Self {
        ElementKind::Classifier {
            declared_base_names,
        }
    }

    pub fn member(name: &str) -> Self {
        ElementKind::Member {
            visibility: Visibility::from_name(name),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            ElementKind::Package => ElementType::Package,
            ElementKind::Module => ElementType::Module,
            ElementKind::Classifier { .. } => ElementType::Class,
            ElementKind::Member { .. } => ElementType::Unknown,
        }
    }

    /// Packages and modules expand structurally during queries.
    pub fn is_container(&self) -> bool {
        matches!(self, ElementKind::Package | ElementKind::Module)
    }

    pub fn is_classifier(&self) -> bool {
        matches!(self, ElementKind::Classifier { .. })
    }
}

/// Element type as exposed on the ViewState transport shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Package,
    Module,
    Class,
    Unknown,
}

impl ElementType {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Package => "package",
            ElementType::Module => "module",
            ElementType::Class => "class",
            ElementType::Unknown => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Relationships
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelationshipKind {
    Inheritance,
    Composition,
    Aggregation,
    Association,
    Dependency,
}

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 5] = [
        RelationshipKind::Inheritance,
        RelationshipKind::Composition,
        RelationshipKind::Aggregation,
        RelationshipKind::Association,
        RelationshipKind::Dependency,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipKind::Inheritance => "INHERITANCE",
            RelationshipKind::Composition => "COMPOSITION",
            RelationshipKind::Aggregation => "AGGREGATION",
            RelationshipKind::Association => "ASSOCIATION",
            RelationshipKind::Dependency => "DEPENDENCY",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single, directed, immutable relationship between two elements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source_fqn: String,
    pub target_fqn: String,
    pub kind: RelationshipKind,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Relationship {
    pub fn new(
        source_fqn: impl Into<String>,
        target_fqn: impl Into<String>,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            source_fqn: source_fqn.into(),
            target_fqn: target_fqn.into(),
            kind,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// The endpoint opposite `fqn`; the target for self-relationships.
    pub fn other_end(&self, fqn: &str) -> &str {
        if self.source_fqn == fqn {
            &self.target_fqn
        } else {
            &self.source_fqn
        }
    }
}

/// Which endpoint of a relationship must match a lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

// ---------------------------------------------------------------------------
// Query / ViewState
// ---------------------------------------------------------------------------

/// A predicate descriptor applied to relational edges during traversal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterRule {
    #[serde(rename = "exclude_types")]
    ExcludeKinds(BTreeSet<RelationshipKind>),
}

impl FilterRule {
    pub fn exclude<I: IntoIterator<Item = RelationshipKind>>(kinds: I) -> Self {
        FilterRule::ExcludeKinds(kinds.into_iter().collect())
    }

    pub fn excludes(&self, relationship: &Relationship) -> bool {
        match self {
            FilterRule::ExcludeKinds(kinds) => kinds.contains(&relationship.kind),
        }
    }
}

/// An immutable request for a bounded subgraph of the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub root_fqns: Vec<String>,
    #[serde(default = "default_depth")]
    pub depth: usize,
    #[serde(default)]
    pub filter_rules: Vec<FilterRule>,
}

fn default_depth() -> usize {
    1
}

impl Default for Query {
    fn default() -> Self {
        Self {
            root_fqns: Vec::new(),
            depth: default_depth(),
            filter_rules: Vec::new(),
        }
    }
}

impl Query {
    pub fn new<I, S>(root_fqns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root_fqns: root_fqns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_filter(mut self, rule: FilterRule) -> Self {
        self.filter_rules.push(rule);
        self
    }

    pub fn is_filtered(&self, relationship: &Relationship) -> bool {
        self.filter_rules.iter().any(|rule| rule.excludes(relationship))
    }
}

/// Serialized element record on the ViewState.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub fqn: String,
    pub name: String,
    pub element_type: ElementType,
    pub parent_fqn: Option<String>,
}

/// Serialized relationship record on the ViewState.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source_fqn: String,
    pub target_fqn: String,
    pub relationship_type: RelationshipKind,
}

/// Flat transfer object produced by a query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub root_fqns: Vec<String>,
}

impl ViewState {
    pub fn node(&self, fqn: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.fqn == fqn)
    }

    pub fn node_fqns(&self) -> BTreeSet<&str> {
        self.nodes.iter().map(|n| n.fqn.as_str()).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Build diagnostics
// ---------------------------------------------------------------------------

/// A non-fatal per-file failure recorded during model construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub path: PathBuf,
    pub message: String,
}

/// Summary of the currently loaded project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub project_name: String,
    pub top_level_fqns: Vec<String>,
    pub element_count: usize,
    pub relationship_count: usize,
    pub warnings: Vec<ParseWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_from_name() {
        assert_eq!(Visibility::from_name("run"), Visibility::Public);
        assert_eq!(Visibility::from_name("__init__"), Visibility::Public);
        assert_eq!(Visibility::from_name("_helper"), Visibility::Protected);
        assert_eq!(Visibility::from_name("__secret"), Visibility::Private);
        assert_eq!(Visibility::from_name("__"), Visibility::Private);
    }

    #[test]
    fn test_element_type_mapping() {
        assert_eq!(ElementKind::Package.element_type(), ElementType::Package);
        assert_eq!(ElementKind::Module.element_type(), ElementType::Module);
        assert_eq!(ElementKind::classifier(vec![]).element_type(), ElementType::Class);
        assert_eq!(ElementKind::member("run").element_type(), ElementType::Unknown);
    }

    #[test]
    fn test_filter_rule_json_shape() {
        let rule: FilterRule =
            serde_json::from_str(r#"{"exclude_types": ["COMPOSITION", "INHERITANCE"]}"#).unwrap();
        let rel = Relationship::new("a.B", "a.C", RelationshipKind::Composition);
        assert!(rule.excludes(&rel));
        let dep = Relationship::new("a.B", "a.C", RelationshipKind::Dependency);
        assert!(!rule.excludes(&dep));
    }

    #[test]
    fn test_query_defaults_from_json() {
        let query: Query = serde_json::from_str(r#"{"root_fqns": ["proj"]}"#).unwrap();
        assert_eq!(query.depth, 1);
        assert!(query.filter_rules.is_empty());
    }

    #[test]
    fn test_view_state_transport_shape() {
        let view = ViewState {
            nodes: vec![NodeRecord {
                fqn: "proj".to_string(),
                name: "proj".to_string(),
                element_type: ElementType::Package,
                parent_fqn: None,
            }],
            edges: vec![EdgeRecord {
                source_fqn: "proj.m.A".to_string(),
                target_fqn: "proj.m.B".to_string(),
                relationship_type: RelationshipKind::Inheritance,
            }],
            root_fqns: vec!["proj".to_string()],
        };
        let value: serde_json::Value = serde_json::from_str(&view.to_json().unwrap()).unwrap();
        assert_eq!(value["nodes"][0]["element_type"], "package");
        assert!(value["nodes"][0]["parent_fqn"].is_null());
        assert_eq!(value["edges"][0]["relationship_type"], "INHERITANCE");
    }

    #[test]
    fn test_other_end() {
        let rel = Relationship::new("a.B", "a.C", RelationshipKind::Inheritance);
        assert_eq!(rel.other_end("a.B"), "a.C");
        assert_eq!(rel.other_end("a.C"), "a.B");
    }
}
