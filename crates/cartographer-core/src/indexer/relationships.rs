//! Relationship pass: inheritance and composition edges.
//!
//! Runs after every file's hierarchy is registered. Resolution is
//! best-effort; names that do not resolve are dropped without a trace.

use tree_sitter::Node;

use crate::indexer::imports::AliasTable;
use crate::indexer::names::{classifiers_for_parameter, NameResolver};
use crate::indexer::parser::{
    dotted_name, function_parameters, is_class_scope_block, node_text, unwrap_decorated,
    ParsedUnit,
};
use crate::indexer::symbols::FileOutline;
use crate::models::{Relationship, RelationshipKind};
use crate::store::{ElementId, Model};

pub const VIA_BASE_CLASS: &str = "base_class";
pub const VIA_CONSTRUCTOR_ANNOTATION: &str = "constructor_annotation";
pub const VIA_PARAMETER_NAME: &str = "parameter_name";
pub const VIA_FIELD_ASSIGNMENT: &str = "field_assignment";

const CONSTRUCTOR: &str = "__init__";

/// Relationships discovered in one file, in source order.
pub fn collect_relationships(
    model: &Model,
    unit: &ParsedUnit,
    outline: &FileOutline,
) -> Vec<Relationship> {
    let aliases = AliasTable::from_tree(unit.root_node(), &unit.source, &unit.module_path);
    let module_fqn = model.fqn(outline.module);
    let mut collector = RelationshipCollector {
        model,
        resolver: NameResolver::new(model, &aliases, &module_fqn),
        source: &unit.source,
        outline,
        out: Vec::new(),
    };
    collector.walk(unit.root_node(), None, false);
    collector.out
}

struct RelationshipCollector<'a> {
    model: &'a Model,
    resolver: NameResolver<'a>,
    source: &'a str,
    outline: &'a FileOutline,
    out: Vec<Relationship>,
}

impl RelationshipCollector<'_> {
    fn walk(&mut self, node: Node, classifier: Option<ElementId>, class_body: bool) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            let definition = unwrap_decorated(child);
            match definition.kind() {
                "class_definition" => self.visit_class(definition, classifier),
                "function_definition" => {
                    if let (true, Some(owner)) = (class_body, classifier) {
                        self.visit_method(definition, owner);
                    }
                    if let Some(body) = definition.child_by_field_name("body") {
                        self.walk(body, classifier, false);
                    }
                }
                kind => {
                    let nested = class_body && is_class_scope_block(kind);
                    self.walk(child, classifier, nested)
                }
            }
        }
    }

    fn visit_class(&mut self, class: Node, enclosing: Option<ElementId>) {
        let Some(id) = self.outline.classifier_for(class) else {
            // Duplicate definition dropped by the hierarchy pass; its
            // body still belongs to the enclosing scope.
            if let Some(body) = class.child_by_field_name("body") {
                self.walk(body, enclosing, false);
            }
            return;
        };

        let model = self.model;
        for token in model.element(id).declared_base_names() {
            if let Some(base) = self.resolver.resolve_classifier(token) {
                self.emit(id, base, RelationshipKind::Inheritance, VIA_BASE_CLASS, token);
            }
        }

        if let Some(body) = class.child_by_field_name("body") {
            self.walk(body, Some(id), true);
        }
    }

    fn visit_method(&mut self, function: Node, owner: ElementId) {
        let params = function_parameters(function, self.source);
        let Some(receiver) = params.first().filter(|p| !p.is_variadic) else {
            return;
        };
        let receiver = receiver.name.clone();

        let is_constructor = function
            .child_by_field_name("name")
            .is_some_and(|n| node_text(n, self.source) == CONSTRUCTOR);
        if is_constructor {
            for param in params.iter().skip(1).filter(|p| !p.is_variadic) {
                let annotated = param
                    .annotation
                    .as_deref()
                    .and_then(|token| {
                        self.resolver
                            .resolve_classifier(token)
                            .map(|id| (token, id))
                    });
                match annotated {
                    Some((token, target)) => self.emit(
                        owner,
                        target,
                        RelationshipKind::Composition,
                        VIA_CONSTRUCTOR_ANNOTATION,
                        token,
                    ),
                    None => {
                        for target in classifiers_for_parameter(self.model, &param.name) {
                            self.emit(
                                owner,
                                target,
                                RelationshipKind::Composition,
                                VIA_PARAMETER_NAME,
                                &param.name,
                            );
                        }
                    }
                }
            }
        }

        if let Some(body) = function.child_by_field_name("body") {
            self.scan_field_assignments(body, owner, &receiver);
        }
    }

    /// `<receiver>.<attr> = Call(...)` anywhere in a method body, nested
    /// class bodies excluded.
    fn scan_field_assignments(&mut self, node: Node, owner: ElementId, receiver: &str) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            match current.kind() {
                "class_definition" => continue,
                "assignment" => {
                    if let Some(token) = self.constructed_field_type(current, receiver) {
                        if let Some(target) = self.resolver.resolve_classifier(&token) {
                            self.emit(
                                owner,
                                target,
                                RelationshipKind::Composition,
                                VIA_FIELD_ASSIGNMENT,
                                &token,
                            );
                        }
                    }
                }
                _ => {}
            }
            let mut cursor = current.walk();
            let children: Vec<Node> = current.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }

    fn constructed_field_type(&self, assignment: Node, receiver: &str) -> Option<String> {
        let left = assignment.child_by_field_name("left")?;
        if left.kind() != "attribute" {
            return None;
        }
        let object = left.child_by_field_name("object")?;
        if object.kind() != "identifier" || node_text(object, self.source) != receiver {
            return None;
        }
        let right = assignment.child_by_field_name("right")?;
        if right.kind() != "call" {
            return None;
        }
        dotted_name(right.child_by_field_name("function")?, self.source)
    }

    fn emit(
        &mut self,
        source: ElementId,
        target: ElementId,
        kind: RelationshipKind,
        via: &str,
        token: &str,
    ) {
        let relationship = Relationship::new(self.model.fqn(source), self.model.fqn(target), kind)
            .with_metadata("via", via)
            .with_metadata("token", token);
        self.out.push(relationship);
    }
}

/// Run the relationship pass for one file and append its edges.
pub fn resolve_relationships(model: &mut Model, unit: &ParsedUnit, outline: &FileOutline) -> usize {
    let found = collect_relationships(model, unit, outline);
    let count = found.len();
    for relationship in found {
        model.add_relationship(relationship);
    }
    count
}
