//! Element tree, FQN registry, and relationship index.
//!
//! Elements live in an arena addressed by [`ElementId`]. Ownership flows
//! from each element's child map; the parent link is a plain index used for
//! lookups only. Positions are fixed once an element is attached, so the
//! FQN derived from the tree never changes after registration.

use indexmap::IndexMap;

use crate::errors::{CartographerError, CartographerResult};
use crate::models::{Direction, ElementKind, NodeRecord, ParseWarning, Relationship};

/// Stable index of an element inside a [`Model`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A structural element of the code base.
#[derive(Clone, Debug)]
pub struct Element {
    name: String,
    parent: Option<ElementId>,
    children: IndexMap<String, ElementId>,
    kind: ElementKind,
}

impl Element {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn child(&self, name: &str) -> Option<ElementId> {
        self.children.get(name).copied()
    }

    /// Children in declaration order.
    pub fn children(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.children.values().copied()
    }

    pub fn declared_base_names(&self) -> &[String] {
        match &self.kind {
            ElementKind::Classifier {
                declared_base_names,
            } => declared_base_names,
            _ => &[],
        }
    }
}

/// The root container for the whole code base representation.
///
/// Built once per project load and read-only afterwards.
#[derive(Clone, Debug)]
pub struct Model {
    elements: Vec<Element>,
    registry: IndexMap<String, ElementId>,
    relationships: Vec<Relationship>,
    warnings: Vec<ParseWarning>,
}

fn validate_name(name: &str) -> CartographerResult<()> {
    if name.is_empty() || name.contains('.') {
        return Err(CartographerError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl Model {
    /// Create a model whose root package is named `project_name` and is
    /// registered under that name.
    pub fn new(project_name: &str) -> CartographerResult<Self> {
        validate_name(project_name)?;
        let mut model = Self {
            elements: vec![Element {
                name: project_name.to_string(),
                parent: None,
                children: IndexMap::new(),
                kind: ElementKind::Package,
            }],
            registry: IndexMap::new(),
            relationships: Vec::new(),
            warnings: Vec::new(),
        };
        model.register(model.root())?;
        Ok(model)
    }

    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    pub fn project_name(&self) -> &str {
        &self.elements[0].name
    }

    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    // -- Tree ---------------------------------------------------------------

    /// Attach a new element named `name` under `parent`.
    ///
    /// The element is not registered; call [`Model::register`] right after.
    pub fn add_child(
        &mut self,
        parent: ElementId,
        name: &str,
        kind: ElementKind,
    ) -> CartographerResult<ElementId> {
        validate_name(name)?;
        if self.elements[parent.0].children.contains_key(name) {
            return Err(CartographerError::DuplicateSiblingName {
                parent: self.fqn(parent),
                name: name.to_string(),
            });
        }
        let id = ElementId(self.elements.len());
        self.elements.push(Element {
            name: name.to_string(),
            parent: Some(parent),
            children: IndexMap::new(),
            kind,
        });
        self.elements[parent.0].children.insert(name.to_string(), id);
        Ok(id)
    }

    /// Insert `id` into the FQN registry under its tree-derived FQN.
    pub fn register(&mut self, id: ElementId) -> CartographerResult<()> {
        let fqn = self.fqn(id);
        if self.registry.contains_key(&fqn) {
            return Err(CartographerError::DuplicateFqn(fqn));
        }
        self.registry.insert(fqn, id);
        Ok(())
    }

    /// `add_child` followed by `register`.
    pub fn add_registered_child(
        &mut self,
        parent: ElementId,
        name: &str,
        kind: ElementKind,
    ) -> CartographerResult<ElementId> {
        let id = self.add_child(parent, name, kind)?;
        self.register(id)?;
        Ok(id)
    }

    /// Dot-joined ancestor names; the root contributes only its own name.
    pub fn fqn(&self, id: ElementId) -> String {
        let mut parts = vec![self.elements[id.0].name.as_str()];
        let mut current = self.elements[id.0].parent;
        while let Some(parent) = current {
            parts.push(self.elements[parent.0].name.as_str());
            current = self.elements[parent.0].parent;
        }
        parts.reverse();
        parts.join(".")
    }

    // -- Registry -----------------------------------------------------------

    pub fn id_by_fqn(&self, fqn: &str) -> Option<ElementId> {
        self.registry.get(fqn).copied()
    }

    pub fn get_by_fqn(&self, fqn: &str) -> Option<&Element> {
        self.id_by_fqn(fqn).map(|id| self.element(id))
    }

    /// Registered `(fqn, id)` pairs in registration order.
    pub fn registered(&self) -> impl Iterator<Item = (&str, ElementId)> + '_ {
        self.registry.iter().map(|(fqn, id)| (fqn.as_str(), *id))
    }

    /// Every registered classifier whose local name is `name`, in
    /// registration order. Ambiguity is returned as-is.
    pub fn classifiers_named(&self, name: &str) -> Vec<ElementId> {
        self.registry
            .values()
            .copied()
            .filter(|id| {
                let element = self.element(*id);
                element.kind.is_classifier() && element.name == name
            })
            .collect()
    }

    /// Serialized form used on the ViewState.
    pub fn node_record(&self, id: ElementId) -> NodeRecord {
        let element = self.element(id);
        NodeRecord {
            fqn: self.fqn(id),
            name: element.name.clone(),
            element_type: element.kind.element_type(),
            parent_fqn: element.parent.map(|p| self.fqn(p)),
        }
    }

    // -- Relationship index -------------------------------------------------

    /// Append a relationship. The index is not deduplicated.
    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Linear scan of the relationship index, preserving insertion order.
    /// A relationship matching on both ends is returned once.
    pub fn get_relationships(&self, fqn: &str, direction: Direction) -> Vec<&Relationship> {
        let outgoing = matches!(direction, Direction::Outgoing | Direction::Both);
        let incoming = matches!(direction, Direction::Incoming | Direction::Both);
        self.relationships
            .iter()
            .filter(|rel| {
                (outgoing && rel.source_fqn == fqn) || (incoming && rel.target_fqn == fqn)
            })
            .collect()
    }

    // -- Diagnostics --------------------------------------------------------

    pub fn add_warning(&mut self, warning: ParseWarning) {
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }
}
