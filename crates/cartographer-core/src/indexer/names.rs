//! Best-effort resolution of source-level names to registered elements.

use std::sync::LazyLock;

use regex::Regex;

use crate::indexer::imports::AliasTable;
use crate::store::{ElementId, Model};

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").unwrap());

/// Resolves raw name tokens seen in one module.
pub struct NameResolver<'a> {
    model: &'a Model,
    aliases: &'a AliasTable,
    module_fqn: &'a str,
}

impl<'a> NameResolver<'a> {
    pub fn new(model: &'a Model, aliases: &'a AliasTable, module_fqn: &'a str) -> Self {
        Self {
            model,
            aliases,
            module_fqn,
        }
    }

    /// Candidate FQNs for `token`, most specific first:
    /// exact alias, aliased first segment, project-qualified, module-local.
    pub fn candidates(&self, token: &str) -> Vec<String> {
        let root = self.model.project_name();
        let mut out = Vec::with_capacity(4);
        if let Some(path) = self.aliases.get(token) {
            out.push(format!("{root}.{path}"));
        }
        if let Some((head, rest)) = token.split_once('.') {
            if let Some(path) = self.aliases.get(head) {
                out.push(format!("{root}.{path}.{rest}"));
            }
        }
        out.push(format!("{root}.{token}"));
        out.push(format!("{}.{token}", self.module_fqn));
        out
    }

    /// First candidate present in the registry.
    pub fn resolve(&self, token: &str) -> Option<ElementId> {
        if token.is_empty() {
            return None;
        }
        self.candidates(token)
            .iter()
            .find_map(|fqn| self.model.id_by_fqn(fqn))
    }

    /// Like [`NameResolver::resolve`], but only a classifier counts.
    pub fn resolve_classifier(&self, token: &str) -> Option<ElementId> {
        self.resolve(token)
            .filter(|id| self.model.element(*id).kind().is_classifier())
    }
}

/// `event_bus` -> `EventBus`, `eventBus` -> `EventBus`.
pub fn pascal_case(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    for word in WORD_RE.find_iter(name) {
        let mut chars = word.as_str().chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    (!out.is_empty()).then_some(out)
}

/// Every classifier whose local name is the PascalCase form of `param`.
/// Ambiguous matches are all returned.
pub fn classifiers_for_parameter(model: &Model, param: &str) -> Vec<ElementId> {
    match pascal_case(param) {
        Some(candidate) => model.classifiers_named(&candidate),
        None => Vec::new(),
    }
}
