//! Text and Graphviz DOT output for query results.
//!
//! Renderers only see the [`ViewState`]; they never touch the model.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;

use crate::errors::CartographerResult;
use crate::models::{EdgeRecord, ElementType, NodeRecord, RelationshipKind, ViewState};

pub trait Renderer {
    fn render(&self, view: &ViewState, out: &mut dyn Write) -> CartographerResult<()>;

    /// Render into a `String`.
    fn render_to_string(&self, view: &ViewState) -> CartographerResult<String> {
        let mut buffer = Vec::new();
        self.render(view, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn relationship_marker(kind: RelationshipKind) -> char {
    match kind {
        RelationshipKind::Inheritance => 'I',
        RelationshipKind::Composition => 'C',
        RelationshipKind::Aggregation => 'A',
        RelationshipKind::Association => 'S',
        RelationshipKind::Dependency => 'D',
    }
}

// ---------------------------------------------------------------------------
// Text tree
// ---------------------------------------------------------------------------

/// Containment tree with each node's outgoing edges listed beneath it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextRenderer;

struct TextTree<'a> {
    children: BTreeMap<&'a str, Vec<&'a NodeRecord>>,
    edges: BTreeMap<&'a str, Vec<&'a EdgeRecord>>,
}

impl TextTree<'_> {
    fn write_node(
        &self,
        out: &mut dyn Write,
        node: &NodeRecord,
        prefix: &str,
        is_last: bool,
    ) -> CartographerResult<()> {
        let connector = if is_last { "└── " } else { "├── " };
        writeln!(out, "{prefix}{connector}{}", node.name)?;
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });

        if let Some(edges) = self.edges.get(node.fqn.as_str()) {
            for edge in edges {
                writeln!(
                    out,
                    "{child_prefix}[{}] -> {}",
                    relationship_marker(edge.relationship_type),
                    edge.target_fqn
                )?;
            }
        }

        if let Some(children) = self.children.get(node.fqn.as_str()) {
            for (i, child) in children.iter().enumerate() {
                self.write_node(out, child, &child_prefix, i + 1 == children.len())?;
            }
        }
        Ok(())
    }
}

impl Renderer for TextRenderer {
    fn render(&self, view: &ViewState, out: &mut dyn Write) -> CartographerResult<()> {
        if view.nodes.is_empty() {
            return Ok(());
        }
        let present: HashSet<&str> = view.nodes.iter().map(|n| n.fqn.as_str()).collect();

        let mut roots = Vec::new();
        let mut children: BTreeMap<&str, Vec<&NodeRecord>> = BTreeMap::new();
        for node in &view.nodes {
            match node.parent_fqn.as_deref() {
                Some(parent) if present.contains(parent) => {
                    children.entry(parent).or_default().push(node)
                }
                _ => roots.push(node),
            }
        }
        roots.sort_by(|a, b| a.name.cmp(&b.name));
        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| a.name.cmp(&b.name));
        }

        let mut edges: BTreeMap<&str, Vec<&EdgeRecord>> = BTreeMap::new();
        for edge in &view.edges {
            edges.entry(edge.source_fqn.as_str()).or_default().push(edge);
        }
        for outgoing in edges.values_mut() {
            outgoing.sort_by(|a, b| a.target_fqn.cmp(&b.target_fqn));
        }

        let tree = TextTree { children, edges };
        for (i, root) in roots.iter().enumerate() {
            tree.write_node(out, root, "", i + 1 == roots.len())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Graphviz DOT
// ---------------------------------------------------------------------------

/// DOT source suitable for `dot -Tsvg`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DotRenderer;

fn fill_color(element_type: ElementType) -> &'static str {
    match element_type {
        ElementType::Package => "#E6F2FA",
        ElementType::Module => "#F5F5F5",
        ElementType::Class => "#FFFFFF",
        ElementType::Unknown => "#CCCCCC",
    }
}

fn edge_style(kind: RelationshipKind) -> &'static str {
    match kind {
        RelationshipKind::Inheritance => "arrowhead=empty, dir=back",
        RelationshipKind::Composition => "arrowhead=diamond, style=dashed",
        RelationshipKind::Aggregation => "arrowhead=odiamond, style=dashed",
        RelationshipKind::Association => "arrowhead=vee, style=dotted",
        RelationshipKind::Dependency => "arrowhead=normal, style=dashed",
    }
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

impl Renderer for DotRenderer {
    fn render(&self, view: &ViewState, out: &mut dyn Write) -> CartographerResult<()> {
        writeln!(out, "digraph cartographer {{")?;
        writeln!(out, "    graph [rankdir=TB, splines=ortho];")?;
        writeln!(out, "    node [shape=box, style=filled];")?;
        for node in &view.nodes {
            writeln!(
                out,
                "    {} [label={}, fillcolor={}];",
                quoted(&node.fqn),
                quoted(&node.name),
                quoted(fill_color(node.element_type))
            )?;
        }
        for edge in &view.edges {
            writeln!(
                out,
                "    {} -> {} [{}];",
                quoted(&edge.source_fqn),
                quoted(&edge.target_fqn),
                edge_style(edge.relationship_type)
            )?;
        }
        writeln!(out, "}}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(fqn: &str, element_type: ElementType) -> NodeRecord {
        let (parent, name) = match fqn.rsplit_once('.') {
            Some((parent, name)) => (Some(parent.to_string()), name.to_string()),
            None => (None, fqn.to_string()),
        };
        NodeRecord {
            fqn: fqn.to_string(),
            name,
            element_type,
            parent_fqn: parent,
        }
    }

    fn edge(source: &str, target: &str, kind: RelationshipKind) -> EdgeRecord {
        EdgeRecord {
            source_fqn: source.to_string(),
            target_fqn: target.to_string(),
            relationship_type: kind,
        }
    }

    fn view() -> ViewState {
        ViewState {
            nodes: vec![
                node("proj", ElementType::Package),
                node("proj.shapes", ElementType::Module),
                node("proj.shapes.Square", ElementType::Class),
                node("proj.shapes.Circle", ElementType::Class),
                node("proj.shapes.Shape", ElementType::Class),
            ],
            edges: vec![
                edge("proj.shapes.Square", "proj.shapes.Shape", RelationshipKind::Inheritance),
                edge("proj.shapes.Circle", "proj.shapes.Shape", RelationshipKind::Inheritance),
                edge("proj.shapes.Circle", "proj.shapes.Canvas", RelationshipKind::Composition),
            ],
            root_fqns: vec!["proj".to_string()],
        }
    }

    #[test]
    fn test_text_renderer_tree() {
        let text = TextRenderer.render_to_string(&view()).unwrap();
        let expected = "\
└── proj
    └── shapes
        ├── Circle
        │   [C] -> proj.shapes.Canvas
        │   [I] -> proj.shapes.Shape
        ├── Shape
        └── Square
            [I] -> proj.shapes.Shape
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_text_renderer_detached_roots() {
        let view = ViewState {
            nodes: vec![
                node("proj.b.Beta", ElementType::Class),
                node("proj.a.Alpha", ElementType::Class),
            ],
            edges: vec![],
            root_fqns: vec![],
        };
        let text = TextRenderer.render_to_string(&view).unwrap();
        assert_eq!(text, "├── Alpha\n└── Beta\n");
        assert_eq!(TextRenderer.render_to_string(&ViewState::default()).unwrap(), "");
    }

    #[test]
    fn test_dot_renderer() {
        let dot = DotRenderer.render_to_string(&view()).unwrap();
        assert!(dot.starts_with("digraph cartographer {\n"));
        assert!(dot.contains("\"proj\" [label=\"proj\", fillcolor=\"#E6F2FA\"];"));
        assert!(dot.contains(
            "\"proj.shapes.Square\" -> \"proj.shapes.Shape\" [arrowhead=empty, dir=back];"
        ));
        assert!(dot.contains("[arrowhead=diamond, style=dashed]"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_dot_quoting() {
        assert_eq!(quoted("a\"b"), "\"a\\\"b\"");
    }
}
