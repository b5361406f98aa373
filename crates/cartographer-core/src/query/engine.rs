//! Bounded traversal of the element tree plus the relationship index.
//!
//! Containment edges (package/module to child) are free; relationship edges
//! cost one depth unit and are followed in both directions. The frontier is
//! a 0-1 deque: free expansions go to the front, paid ones to the back, so
//! every element is settled at its cheapest depth.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::models::{Direction, EdgeRecord, NodeRecord, Query, RelationshipKind, ViewState};
use crate::store::{ElementId, Model};

/// Run `query` against a built model.
pub fn execute(model: &Model, query: &Query) -> ViewState {
    let mut traversal = Traversal::new(model, query);
    for root in &query.root_fqns {
        match model.id_by_fqn(root) {
            Some(id) => traversal.offer(id, 0, false),
            None => debug!("Dropping unresolved root {root}"),
        }
    }
    traversal.run();
    traversal.finish()
}

struct Traversal<'a> {
    model: &'a Model,
    query: &'a Query,
    frontier: VecDeque<(ElementId, usize)>,
    best: HashMap<ElementId, usize>,
    in_view: HashSet<ElementId>,
    nodes: Vec<NodeRecord>,
    edge_keys: HashSet<(String, String, RelationshipKind)>,
    edges: Vec<EdgeRecord>,
}

impl<'a> Traversal<'a> {
    fn new(model: &'a Model, query: &'a Query) -> Self {
        Self {
            model,
            query,
            frontier: VecDeque::new(),
            best: HashMap::new(),
            in_view: HashSet::new(),
            nodes: Vec::new(),
            edge_keys: HashSet::new(),
            edges: Vec::new(),
        }
    }

    fn offer(&mut self, id: ElementId, depth: usize, free: bool) {
        if self.in_view.contains(&id) {
            return;
        }
        if self.best.get(&id).is_some_and(|&known| known <= depth) {
            return;
        }
        self.best.insert(id, depth);
        if free {
            self.frontier.push_front((id, depth));
        } else {
            self.frontier.push_back((id, depth));
        }
    }

    fn run(&mut self) {
        let model = self.model;
        while let Some((id, depth)) = self.frontier.pop_front() {
            if !self.in_view.insert(id) {
                continue;
            }
            self.nodes.push(model.node_record(id));

            let element = model.element(id);
            if element.kind().is_container() {
                let children: Vec<ElementId> = element.children().collect();
                for child in children.into_iter().rev() {
                    self.offer(child, depth, true);
                }
            }

            if depth < self.query.depth {
                self.follow_relationships(id, depth);
            }
        }
    }

    fn follow_relationships(&mut self, id: ElementId, depth: usize) {
        let model = self.model;
        let fqn = model.fqn(id);
        for rel in model.get_relationships(&fqn, Direction::Both) {
            if self.query.is_filtered(rel) {
                continue;
            }
            let Some(other) = model.id_by_fqn(rel.other_end(&fqn)) else {
                continue;
            };
            let key = (rel.source_fqn.clone(), rel.target_fqn.clone(), rel.kind);
            if self.edge_keys.insert(key) {
                self.edges.push(EdgeRecord {
                    source_fqn: rel.source_fqn.clone(),
                    target_fqn: rel.target_fqn.clone(),
                    relationship_type: rel.kind,
                });
            }
            self.offer(other, depth + 1, false);
        }
    }

    /// Add any edge endpoint that never made it into the node list.
    fn finish(mut self) -> ViewState {
        let endpoints: Vec<String> = self
            .edges
            .iter()
            .flat_map(|e| [e.source_fqn.clone(), e.target_fqn.clone()])
            .collect();
        for fqn in endpoints {
            if let Some(id) = self.model.id_by_fqn(&fqn) {
                if self.in_view.insert(id) {
                    self.nodes.push(self.model.node_record(id));
                }
            }
        }
        ViewState {
            nodes: self.nodes,
            edges: self.edges,
            root_fqns: self.query.root_fqns.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ElementKind, FilterRule, Relationship};
    use std::collections::BTreeSet;

    /// proj
    ///   m: Base (member run), Derived(Base)
    ///   n: Service composes Base
    ///   o: Far associates Service
    fn model() -> Model {
        let mut model = Model::new("proj").unwrap();
        let root = model.root();
        let m = model.add_registered_child(root, "m", ElementKind::Module).unwrap();
        let base = model
            .add_registered_child(m, "Base", ElementKind::classifier(vec![]))
            .unwrap();
        model
            .add_registered_child(base, "run", ElementKind::member("run"))
            .unwrap();
        model
            .add_registered_child(m, "Derived", ElementKind::classifier(vec!["Base".into()]))
            .unwrap();
        let n = model.add_registered_child(root, "n", ElementKind::Module).unwrap();
        model
            .add_registered_child(n, "Service", ElementKind::classifier(vec![]))
            .unwrap();
        let o = model.add_registered_child(root, "o", ElementKind::Module).unwrap();
        model
            .add_registered_child(o, "Far", ElementKind::classifier(vec![]))
            .unwrap();

        model.add_relationship(Relationship::new(
            "proj.m.Derived",
            "proj.m.Base",
            RelationshipKind::Inheritance,
        ));
        model.add_relationship(Relationship::new(
            "proj.n.Service",
            "proj.m.Base",
            RelationshipKind::Composition,
        ));
        model.add_relationship(Relationship::new(
            "proj.o.Far",
            "proj.n.Service",
            RelationshipKind::Association,
        ));
        model
    }

    fn fqns(view: &ViewState) -> Vec<&str> {
        view.nodes.iter().map(|n| n.fqn.as_str()).collect()
    }

    fn edge_set(view: &ViewState) -> BTreeSet<(String, String, RelationshipKind)> {
        view.edges
            .iter()
            .map(|e| (e.source_fqn.clone(), e.target_fqn.clone(), e.relationship_type))
            .collect()
    }

    #[test]
    fn test_depth_zero_returns_only_root() {
        let model = model();
        let view = execute(&model, &Query::new(["proj.m.Base"]).with_depth(0));
        assert_eq!(fqns(&view), vec!["proj.m.Base"]);
        assert!(view.edges.is_empty());
        assert_eq!(view.root_fqns, vec!["proj.m.Base"]);
    }

    #[test]
    fn test_structural_children_are_free() {
        let model = model();
        let view = execute(&model, &Query::new(["proj"]).with_depth(0));
        assert_eq!(
            fqns(&view),
            vec![
                "proj",
                "proj.m",
                "proj.m.Base",
                "proj.m.Derived",
                "proj.n",
                "proj.n.Service",
                "proj.o",
                "proj.o.Far"
            ]
        );
        assert!(view.edges.is_empty());
    }

    #[test]
    fn test_relational_expansion_costs_depth() {
        let model = model();
        let view = execute(&model, &Query::new(["proj.m.Base"]).with_depth(1));
        assert_eq!(fqns(&view), vec!["proj.m.Base", "proj.m.Derived", "proj.n.Service"]);
        assert_eq!(view.edges.len(), 2);

        let view = execute(&model, &Query::new(["proj.m.Base"]).with_depth(2));
        assert!(view.node("proj.o.Far").is_some());
        assert_eq!(view.edges.len(), 3);
    }

    #[test]
    fn test_inheritance_scenario_from_project_root() {
        let model = model();
        let view = execute(&model, &Query::new(["proj"]).with_depth(2));
        let inheritance: Vec<&EdgeRecord> = view
            .edges
            .iter()
            .filter(|e| e.relationship_type == RelationshipKind::Inheritance)
            .collect();
        assert_eq!(inheritance.len(), 1);
        assert_eq!(inheritance[0].source_fqn, "proj.m.Derived");
        assert_eq!(inheritance[0].target_fqn, "proj.m.Base");
    }

    #[test]
    fn test_depth_monotonicity() {
        let model = model();
        for root in ["proj", "proj.m", "proj.m.Derived", "proj.o.Far"] {
            for depth in 0..4 {
                let small = execute(&model, &Query::new([root]).with_depth(depth));
                let large = execute(&model, &Query::new([root]).with_depth(depth + 1));
                assert!(small.node_fqns().is_subset(&large.node_fqns()));
                assert!(edge_set(&small).is_subset(&edge_set(&large)));
            }
        }
    }

    #[test]
    fn test_filter_excludes_kind_and_unreachable_nodes() {
        let model = model();
        let query = Query::new(["proj.m.Derived"])
            .with_depth(3)
            .with_filter(FilterRule::exclude([RelationshipKind::Composition]));
        let view = execute(&model, &query);
        assert_eq!(fqns(&view), vec!["proj.m.Derived", "proj.m.Base"]);
        assert!(view
            .edges
            .iter()
            .all(|e| e.relationship_type != RelationshipKind::Composition));
    }

    #[test]
    fn test_duplicate_relationships_collapse_by_kind() {
        let mut model = model();
        model.add_relationship(Relationship::new(
            "proj.m.Derived",
            "proj.m.Base",
            RelationshipKind::Inheritance,
        ));
        model.add_relationship(Relationship::new(
            "proj.m.Derived",
            "proj.m.Base",
            RelationshipKind::Composition,
        ));
        model.add_relationship(Relationship::new(
            "proj.m.Base",
            "proj.m.Derived",
            RelationshipKind::Composition,
        ));
        let view = execute(&model, &Query::new(["proj.m.Derived"]).with_depth(1));
        let between: Vec<(&str, &str, RelationshipKind)> = view
            .edges
            .iter()
            .map(|e| (e.source_fqn.as_str(), e.target_fqn.as_str(), e.relationship_type))
            .collect();
        assert_eq!(
            between,
            vec![
                ("proj.m.Derived", "proj.m.Base", RelationshipKind::Inheritance),
                ("proj.m.Derived", "proj.m.Base", RelationshipKind::Composition),
                ("proj.m.Base", "proj.m.Derived", RelationshipKind::Composition),
            ]
        );
    }

    #[test]
    fn test_unresolved_roots_and_dangling_relationships() {
        let mut model = model();
        model.add_relationship(Relationship::new(
            "proj.m.Base",
            "external.Thing",
            RelationshipKind::Dependency,
        ));
        let view = execute(
            &model,
            &Query::new(["proj.missing", "proj.m.Base", "proj.m.Base"]).with_depth(1),
        );
        assert_eq!(view.root_fqns.len(), 3);
        assert_eq!(view.nodes[0].fqn, "proj.m.Base");
        assert!(view.edges.iter().all(|e| e.target_fqn != "external.Thing"));
        let nodes = view.node_fqns();
        for edge in &view.edges {
            assert!(nodes.contains(edge.source_fqn.as_str()));
            assert!(nodes.contains(edge.target_fqn.as_str()));
        }
    }

    #[test]
    fn test_structural_path_wins_over_relational_path() {
        // Base is reached relationally from Service before the module walk
        // gets to it; it must still expand as a depth-0 element.
        let mut model = Model::new("proj").unwrap();
        let root = model.root();
        let a = model.add_registered_child(root, "a", ElementKind::Module).unwrap();
        model
            .add_registered_child(a, "Service", ElementKind::classifier(vec![]))
            .unwrap();
        let b = model.add_registered_child(root, "b", ElementKind::Module).unwrap();
        model
            .add_registered_child(b, "Base", ElementKind::classifier(vec![]))
            .unwrap();
        let c = model.add_registered_child(root, "c", ElementKind::Module).unwrap();
        model
            .add_registered_child(c, "Leaf", ElementKind::classifier(vec![]))
            .unwrap();
        for (source, kind) in [
            ("proj.a.Service", RelationshipKind::Composition),
            ("proj.c.Leaf", RelationshipKind::Inheritance),
            ("proj.x.Gone", RelationshipKind::Dependency),
        ] {
            model.add_relationship(Relationship::new(source, "proj.b.Base", kind));
        }

        let query = Query::new(["proj.a", "proj.b"]).with_depth(1);
        let view = execute(&model, &query);
        assert_eq!(view.edges.len(), 2);
        assert!(view.node("proj.c.Leaf").is_some());
    }
}
