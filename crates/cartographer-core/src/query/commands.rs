//! Immutable query transforms issued by interactive clients.

use crate::models::{FilterRule, Query};

/// Produces a new query from the current one without mutating it.
pub trait QueryCommand {
    fn apply(&self, current: &Query) -> Query;
}

/// Replace the roots with a single element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FocusOnNode {
    pub fqn: String,
}

impl FocusOnNode {
    pub fn new(fqn: impl Into<String>) -> Self {
        Self { fqn: fqn.into() }
    }
}

impl QueryCommand for FocusOnNode {
    fn apply(&self, current: &Query) -> Query {
        Query {
            root_fqns: vec![self.fqn.clone()],
            ..current.clone()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangeDepth {
    pub depth: usize,
}

impl QueryCommand for ChangeDepth {
    fn apply(&self, current: &Query) -> Query {
        current.clone().with_depth(self.depth)
    }
}

/// Append a filter rule after the existing ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddFilter {
    pub rule: FilterRule,
}

impl QueryCommand for AddFilter {
    fn apply(&self, current: &Query) -> Query {
        current.clone().with_filter(self.rule.clone())
    }
}

/// Apply `commands` left to right.
pub fn apply_all(start: &Query, commands: &[&dyn QueryCommand]) -> Query {
    commands
        .iter()
        .fold(start.clone(), |query, command| command.apply(&query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RelationshipKind;

    #[test]
    fn test_focus_replaces_roots_only() {
        let current = Query::new(["proj.a", "proj.b"]).with_depth(3);
        let next = FocusOnNode::new("proj.c").apply(&current);
        assert_eq!(next.root_fqns, vec!["proj.c"]);
        assert_eq!(next.depth, 3);
        assert_eq!(current.root_fqns.len(), 2);
    }

    #[test]
    fn test_change_depth() {
        let current = Query::new(["proj"]);
        let next = ChangeDepth { depth: 0 }.apply(&current);
        assert_eq!(next.depth, 0);
        assert_eq!(current.depth, 1);
    }

    #[test]
    fn test_add_filter_keeps_existing_rules() {
        let first = FilterRule::exclude([RelationshipKind::Dependency]);
        let second = FilterRule::exclude([RelationshipKind::Composition]);
        let current = Query::new(["proj"]).with_filter(first.clone());
        let next = AddFilter {
            rule: second.clone(),
        }
        .apply(&current);
        assert_eq!(next.filter_rules, vec![first, second]);
        assert_eq!(current.filter_rules.len(), 1);
    }

    #[test]
    fn test_apply_all_in_order() {
        let focus = FocusOnNode::new("proj.m");
        let deeper = ChangeDepth { depth: 4 };
        let shallower = ChangeDepth { depth: 2 };
        let commands: [&dyn QueryCommand; 3] = [&focus, &deeper, &shallower];
        let query = apply_all(&Query::default(), &commands);
        assert_eq!(query.root_fqns, vec!["proj.m"]);
        assert_eq!(query.depth, 2);
    }
}
