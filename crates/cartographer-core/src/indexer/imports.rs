//! Per-file alias tables built from Python import statements.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::indexer::filesystem::ModulePath;
use crate::indexer::parser::{dotted_name, node_text};

/// Locally visible name to project-root-relative dotted path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    /// Collect every import statement under `root`, at any nesting level.
    /// Later bindings of the same name overwrite earlier ones.
    pub fn from_tree(root: Node, source: &str, module_path: &ModulePath) -> Self {
        let mut table = Self::default();
        let mut stack = vec![root];
        let mut imports = Vec::new();
        while let Some(node) = stack.pop() {
            match node.kind() {
                "import_statement" | "import_from_statement" => imports.push(node),
                _ => {
                    let mut cursor = node.walk();
                    let children: Vec<Node> = node.named_children(&mut cursor).collect();
                    stack.extend(children.into_iter().rev());
                }
            }
        }
        imports.sort_by_key(|n| n.start_byte());

        for node in imports {
            if node.kind() == "import_statement" {
                table.add_import(node, source);
            } else {
                table.add_from_import(node, source, module_path);
            }
        }
        table
    }

    pub fn insert(&mut self, alias: impl Into<String>, path: impl Into<String>) {
        self.entries.insert(alias.into(), path.into());
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries.get(alias).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `import a.b.c` binds `a`; `import a.b as x` binds `x` to `a.b`.
    fn add_import(&mut self, node: Node, source: &str) {
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            match name.kind() {
                "dotted_name" => {
                    let Some(path) = dotted_name(name, source) else {
                        continue;
                    };
                    let head = path.split('.').next().unwrap_or_default().to_string();
                    self.insert(head.clone(), head);
                }
                "aliased_import" => {
                    let path = name
                        .child_by_field_name("name")
                        .and_then(|n| dotted_name(n, source));
                    let alias = name.child_by_field_name("alias").map(|n| node_text(n, source));
                    if let (Some(path), Some(alias)) = (path, alias) {
                        self.insert(alias, path);
                    }
                }
                _ => {}
            }
        }
    }

    fn add_from_import(&mut self, node: Node, source: &str, module_path: &ModulePath) {
        let Some(module) = node.child_by_field_name("module_name") else {
            return;
        };
        let base = match module.kind() {
            "relative_import" => match resolve_relative(module, source, module_path) {
                Some(base) => base,
                None => return,
            },
            _ => match dotted_name(module, source) {
                Some(base) => base,
                None => return,
            },
        };

        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            let (imported, local) = match name.kind() {
                "dotted_name" => match dotted_name(name, source) {
                    Some(imported) => {
                        let local = imported.clone();
                        (imported, local)
                    }
                    None => continue,
                },
                "aliased_import" => {
                    let imported = name
                        .child_by_field_name("name")
                        .and_then(|n| dotted_name(n, source));
                    let alias = name.child_by_field_name("alias").map(|n| node_text(n, source));
                    match (imported, alias) {
                        (Some(imported), Some(alias)) => (imported, alias.to_string()),
                        _ => continue,
                    }
                }
                _ => continue,
            };
            self.insert(local, join_path(&base, &imported));
        }
    }
}

/// Resolve `..pkg.mod` against the importing module: one dot is the
/// containing package, each further dot trims one more segment.
fn resolve_relative(node: Node, source: &str, module_path: &ModulePath) -> Option<String> {
    let mut level = 0;
    let mut module = None;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "import_prefix" => level = node_text(child, source).matches('.').count(),
            "dotted_name" => module = dotted_name(child, source),
            _ => {}
        }
    }

    let package = module_path.package_segments();
    let trim = level.checked_sub(1)?;
    if trim > package.len() {
        return None;
    }
    let base = package[..package.len() - trim].join(".");
    Some(match module {
        Some(module) => join_path(&base, &module),
        None => base,
    })
}

fn join_path(base: &str, rest: &str) -> String {
    if base.is_empty() {
        rest.to_string()
    } else {
        format!("{base}.{rest}")
    }
}
