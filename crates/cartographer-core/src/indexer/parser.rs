//! Python parsing wrapper and syntax-tree helpers shared by both passes.

use std::path::PathBuf;

use tree_sitter::{Node, Parser, Tree};

use crate::errors::{CartographerError, CartographerResult};
use crate::indexer::filesystem::ModulePath;

/// A successfully parsed source file.
pub struct ParsedUnit {
    pub relative_path: PathBuf,
    pub module_path: ModulePath,
    pub source: String,
    pub tree: Tree,
}

impl ParsedUnit {
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

pub fn new_parser() -> CartographerResult<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| CartographerError::Parse(format!("Failed to set language: {e}")))?;
    Ok(parser)
}

/// Parse `source`; any syntax error in the tree fails the whole file.
pub fn parse_source(parser: &mut Parser, source: &str) -> Result<Tree, String> {
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| "parser produced no tree".to_string())?;
    let root = tree.root_node();
    if root.has_error() {
        let line = first_error_line(root).unwrap_or(0);
        return Err(format!("invalid syntax near line {}", line + 1));
    }
    Ok(tree)
}

fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error())
        .find_map(first_error_line)
}

// ---------------------------------------------------------------------------
// Syntax helpers
// ---------------------------------------------------------------------------

pub fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Rebuild `a.b.c` from an identifier or a chain of attribute accesses on
/// identifiers. Anything else (calls, subscripts) yields `None`.
pub fn dotted_name(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "identifier" => Some(node_text(node, source).to_string()),
        "dotted_name" => {
            let mut cursor = node.walk();
            let parts: Vec<&str> = node
                .named_children(&mut cursor)
                .map(|n| node_text(n, source))
                .collect();
            Some(parts.join("."))
        }
        "attribute" => {
            let object = dotted_name(node.child_by_field_name("object")?, source)?;
            let attribute = node_text(node.child_by_field_name("attribute")?, source);
            Some(format!("{object}.{attribute}"))
        }
        _ => None,
    }
}

/// The function/class definition wrapped by a decorated definition, or the
/// node itself.
pub fn unwrap_decorated(node: Node) -> Node {
    if node.kind() == "decorated_definition" {
        if let Some(definition) = node.child_by_field_name("definition") {
            return definition;
        }
    }
    node
}

/// Compound statements whose nested definitions still belong to the
/// enclosing class body (`if TYPE_CHECKING:`, `try:`, `with ...:`).
pub fn is_class_scope_block(kind: &str) -> bool {
    matches!(
        kind,
        "block"
            | "if_statement"
            | "elif_clause"
            | "else_clause"
            | "try_statement"
            | "except_clause"
            | "finally_clause"
            | "with_statement"
    )
}

/// One declared parameter of a function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    /// Annotation expression text, when the parameter is annotated.
    pub annotation: Option<String>,
    /// `*args` / `**kwargs`.
    pub is_variadic: bool,
}

/// Declared parameters of a `function_definition`, in order. The bare `*`
/// and `/` separators are dropped.
pub fn function_parameters(function: Node, source: &str) -> Vec<Parameter> {
    let Some(params) = function.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut parameters = Vec::new();
    let mut cursor = params.walk();
    for child in params.named_children(&mut cursor) {
        let annotation = child
            .child_by_field_name("type")
            .and_then(type_expression)
            .and_then(|expr| annotation_name(expr, source));
        match child.kind() {
            "identifier" => parameters.push(Parameter {
                name: node_text(child, source).to_string(),
                annotation: None,
                is_variadic: false,
            }),
            "typed_parameter" => {
                let Some(first) = child.named_child(0) else {
                    continue;
                };
                match first.kind() {
                    "identifier" => parameters.push(Parameter {
                        name: node_text(first, source).to_string(),
                        annotation,
                        is_variadic: false,
                    }),
                    "list_splat_pattern" | "dictionary_splat_pattern" => {
                        parameters.push(splat_parameter(first, source))
                    }
                    _ => {}
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                if let Some(name) = child.child_by_field_name("name") {
                    parameters.push(Parameter {
                        name: node_text(name, source).to_string(),
                        annotation,
                        is_variadic: false,
                    });
                }
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                parameters.push(splat_parameter(child, source))
            }
            _ => {}
        }
    }
    parameters
}

fn splat_parameter(node: Node, source: &str) -> Parameter {
    let name = node
        .named_child(0)
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default();
    Parameter {
        name,
        annotation: None,
        is_variadic: true,
    }
}

fn type_expression(type_node: Node) -> Option<Node> {
    if type_node.kind() == "type" {
        type_node.named_child(0)
    } else {
        Some(type_node)
    }
}

/// A resolvable name for an annotation: an identifier, a dotted chain, or a
/// string forward reference holding one of those.
fn annotation_name(expr: Node, source: &str) -> Option<String> {
    if expr.kind() == "string" {
        let raw = node_text(expr, source)
            .trim_matches(|c| c == '"' || c == '\'')
            .trim();
        let valid = !raw.is_empty()
            && raw.split('.').all(|part| {
                !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_')
            });
        return valid.then(|| raw.to_string());
    }
    dotted_name(expr, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Tree {
        let mut parser = new_parser().unwrap();
        parse_source(&mut parser, source).unwrap()
    }

    fn first_function(tree: &Tree) -> Node<'_> {
        fn find(node: Node) -> Option<Node> {
            if node.kind() == "function_definition" {
                return Some(node);
            }
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            children.into_iter().find_map(find)
        }
        find(tree.root_node()).unwrap()
    }

    #[test]
    fn test_parse_valid_source() {
        let tree = parse("class A:\n    pass\n");
        assert_eq!(tree.root_node().kind(), "module");
    }

    #[test]
    fn test_parse_syntax_error_reported() {
        let mut parser = new_parser().unwrap();
        let err = parse_source(&mut parser, "class A(\n    def broken\n").unwrap_err();
        assert!(err.contains("invalid syntax"));
    }

    #[test]
    fn test_function_parameters_shapes() {
        let source = "def __init__(self, bus: EventBus, repo: 'models.Repo', name='x', *args, store: Store = None, **kwargs):\n    pass\n";
        let tree = parse(source);
        let params = function_parameters(first_function(&tree), source);
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["self", "bus", "repo", "name", "args", "store", "kwargs"]);
        assert_eq!(params[1].annotation.as_deref(), Some("EventBus"));
        assert_eq!(params[2].annotation.as_deref(), Some("models.Repo"));
        assert_eq!(params[3].annotation, None);
        assert!(params[4].is_variadic);
        assert_eq!(params[5].annotation.as_deref(), Some("Store"));
        assert!(params[6].is_variadic);
    }

    #[test]
    fn test_function_parameters_unresolvable_annotation() {
        let source = "def f(self, items: list[int], other: A | None):\n    pass\n";
        let tree = parse(source);
        let params = function_parameters(first_function(&tree), source);
        assert_eq!(params.len(), 3);
        assert_eq!(params[1].annotation, None);
        assert_eq!(params[2].annotation, None);
    }

    #[test]
    fn test_dotted_name_from_attribute_chain() {
        let source = "x = pkg.models.User\n";
        let tree = parse(source);
        let assignment = tree
            .root_node()
            .named_child(0)
            .and_then(|stmt| stmt.named_child(0))
            .unwrap();
        let right = assignment.child_by_field_name("right").unwrap();
        assert_eq!(dotted_name(right, source).as_deref(), Some("pkg.models.User"));
    }
}
