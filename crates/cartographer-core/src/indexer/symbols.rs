//! Hierarchy pass: packages, modules, classifiers and members.
//!
//! Only the file's own declarations are touched here; nothing outside the
//! current file needs to exist yet.

use std::collections::HashMap;

use tracing::debug;
use tree_sitter::Node;

use crate::errors::CartographerResult;
use crate::indexer::filesystem::ModulePath;
use crate::indexer::parser::{
    dotted_name, is_class_scope_block, node_text, unwrap_decorated, ParsedUnit,
};
use crate::models::ElementKind;
use crate::store::{ElementId, Model};

/// What the hierarchy pass placed for one file.
#[derive(Clone, Debug)]
pub struct FileOutline {
    /// The module element, or the package itself for an initializer.
    pub module: ElementId,
    /// Syntax node id of each accepted class definition to its classifier.
    pub classes: HashMap<usize, ElementId>,
}

impl FileOutline {
    pub fn classifier_for(&self, node: Node) -> Option<ElementId> {
        self.classes.get(&node.id()).copied()
    }
}

/// Run the hierarchy pass for one parsed file.
pub fn build_hierarchy(model: &mut Model, unit: &ParsedUnit) -> CartographerResult<FileOutline> {
    let module = ensure_module_structure(model, &unit.module_path)?;
    let mut outline = FileOutline {
        module,
        classes: HashMap::new(),
    };
    let mut walker = HierarchyWalker {
        model,
        source: &unit.source,
        outline: &mut outline,
    };
    walker.walk(unit.root_node(), module, false)?;
    Ok(outline)
}

/// Create any missing package levels and the module, reusing what exists.
pub fn ensure_module_structure(
    model: &mut Model,
    module_path: &ModulePath,
) -> CartographerResult<ElementId> {
    let mut current = model.root();
    let segments = &module_path.segments;
    for (i, segment) in segments.iter().enumerate() {
        let is_module = !module_path.is_package_init && i + 1 == segments.len();
        let kind = if is_module {
            ElementKind::Module
        } else {
            ElementKind::Package
        };
        current = ensure_child(model, current, segment, kind)?;
    }
    Ok(current)
}

fn ensure_child(
    model: &mut Model,
    parent: ElementId,
    name: &str,
    kind: ElementKind,
) -> CartographerResult<ElementId> {
    if let Some(existing) = model.element(parent).child(name) {
        if !model.element(existing).kind().is_container() {
            debug!(
                "Reusing non-container {} as a {kind:?} level",
                model.fqn(existing)
            );
        }
        return Ok(existing);
    }
    model.add_registered_child(parent, name, kind)
}

/// Raw base tokens from a class definition's superclass list.
pub fn base_tokens(class: Node, source: &str) -> Vec<String> {
    let Some(arguments) = class.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    let mut tokens = Vec::new();
    let mut cursor = arguments.walk();
    for arg in arguments.named_children(&mut cursor) {
        let token = match arg.kind() {
            "identifier" | "attribute" => dotted_name(arg, source),
            "subscript" => arg
                .child_by_field_name("value")
                .and_then(|value| dotted_name(value, source)),
            _ => None,
        };
        if let Some(token) = token {
            tokens.push(token);
        }
    }
    tokens
}

struct HierarchyWalker<'a> {
    model: &'a mut Model,
    source: &'a str,
    outline: &'a mut FileOutline,
}

impl HierarchyWalker<'_> {
    fn walk(
        &mut self,
        node: Node,
        container: ElementId,
        class_body: bool,
    ) -> CartographerResult<()> {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            let definition = unwrap_decorated(child);
            match definition.kind() {
                "class_definition" => self.visit_class(definition, container)?,
                "function_definition" => {
                    if class_body {
                        self.add_member(definition, container)?;
                    }
                    if let Some(body) = definition.child_by_field_name("body") {
                        self.walk(body, container, false)?;
                    }
                }
                kind => {
                    let nested = class_body && is_class_scope_block(kind);
                    self.walk(child, container, nested)?
                }
            }
        }
        Ok(())
    }

    fn visit_class(&mut self, class: Node, container: ElementId) -> CartographerResult<()> {
        let Some(name_node) = class.child_by_field_name("name") else {
            return Ok(());
        };
        let name = node_text(name_node, self.source);
        if self.model.element(container).child(name).is_some() {
            debug!(
                "Skipping duplicate definition {}.{name}",
                self.model.fqn(container)
            );
            return Ok(());
        }

        let bases = base_tokens(class, self.source);
        let id = self
            .model
            .add_registered_child(container, name, ElementKind::classifier(bases))?;
        self.outline.classes.insert(class.id(), id);

        if let Some(body) = class.child_by_field_name("body") {
            self.walk(body, id, true)?;
        }
        Ok(())
    }

    fn add_member(&mut self, function: Node, class: ElementId) -> CartographerResult<()> {
        let Some(name_node) = function.child_by_field_name("name") else {
            return Ok(());
        };
        let name = node_text(name_node, self.source);
        if self.model.element(class).child(name).is_some() {
            debug!(
                "Skipping duplicate definition {}.{name}",
                self.model.fqn(class)
            );
            return Ok(());
        }
        self.model
            .add_registered_child(class, name, ElementKind::member(name))?;
        Ok(())
    }
}
