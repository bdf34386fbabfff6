//! Keyword → entry variant table. The registry *is* the grammar: the
//! interpreter knows no keywords of its own.

use super::validator::Constraint;
use serde::Deserialize;
use std::collections::HashMap;

/// How an entry turns its arguments into document content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Ignores arguments; a structural wrapper around a block.
    Base,
    /// Exactly one mapping, merged into the entry's slot.
    Map,
    /// Exactly one non-mapping value, stored as a string.
    Scalar,
    /// A scalar then an optional mapping, keyed (or appended) by the scalar.
    ScalarPlusMap,
}

/// Declared behaviour flags of a keyword.
#[derive(Debug, Clone, Default)]
pub struct EntryOptions {
    pub allow_block: bool,
    pub cumulative: bool,
    /// Children write into this entry's value instead of its scope.
    pub nested: bool,
    /// At least one of these must be an ancestor. Empty means anywhere.
    pub require_parent: Vec<String>,
    pub validate: Option<Constraint>,
}

impl EntryOptions {
    /// Overlays `other` on these options: flags set in either stay set, and a
    /// parent list or constraint given in `other` replaces the current one.
    pub fn merge(mut self, other: EntryOptions) -> Self {
        self.allow_block |= other.allow_block;
        self.cumulative |= other.cumulative;
        self.nested |= other.nested;
        if !other.require_parent.is_empty() {
            self.require_parent = other.require_parent;
        }
        if other.validate.is_some() {
            self.validate = other.validate;
        }
        self
    }
}

/// Variant plus options: everything needed to construct an entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawSpec")]
pub struct EntrySpec {
    pub kind: EntryKind,
    pub options: EntryOptions,
}

impl EntrySpec {
    pub fn new(kind: EntryKind) -> Self {
        Self {
            kind,
            options: EntryOptions::default(),
        }
    }

    pub fn base() -> Self {
        Self::new(EntryKind::Base)
    }

    pub fn map() -> Self {
        Self::new(EntryKind::Map)
    }

    pub fn scalar() -> Self {
        Self::new(EntryKind::Scalar)
    }

    pub fn scalar_plus_map() -> Self {
        Self::new(EntryKind::ScalarPlusMap)
    }

    pub fn with_options(mut self, options: EntryOptions) -> Self {
        self.options = self.options.merge(options);
        self
    }

    pub fn allow_block(mut self) -> Self {
        self.options.allow_block = true;
        self
    }

    pub fn cumulative(mut self) -> Self {
        self.options.cumulative = true;
        self
    }

    pub fn nested(mut self) -> Self {
        self.options.nested = true;
        self
    }

    pub fn require_parent<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options
            .require_parent
            .extend(parents.into_iter().map(Into::into));
        self
    }

    pub fn validate(mut self, constraint: Constraint) -> Self {
        self.options.validate = Some(constraint);
        self
    }
}

/// Flat on-disk shape of an `EntrySpec`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSpec {
    kind: EntryKind,
    #[serde(default)]
    allow_block: bool,
    #[serde(default)]
    cumulative: bool,
    #[serde(default)]
    nested: bool,
    #[serde(default)]
    require_parent: Vec<String>,
    #[serde(default)]
    validate: Option<Constraint>,
}

impl From<RawSpec> for EntrySpec {
    fn from(raw: RawSpec) -> Self {
        EntrySpec {
            kind: raw.kind,
            options: EntryOptions {
                allow_block: raw.allow_block,
                cumulative: raw.cumulative,
                nested: raw.nested,
                require_parent: raw.require_parent,
                validate: raw.validate,
            },
        }
    }
}

/// Read-only for the duration of a run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct EntryRegistry {
    entries: HashMap<String, EntrySpec>,
}

impl EntryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, keyword: impl Into<String>, spec: EntrySpec) -> Self {
        self.insert(keyword, spec);
        self
    }

    pub fn insert(&mut self, keyword: impl Into<String>, spec: EntrySpec) {
        self.entries.insert(keyword.into(), spec);
    }

    pub fn resolve(&self, keyword: &str) -> Option<&EntrySpec> {
        self.entries.get(keyword)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let registry = EntryRegistry::new()
            .with("web", EntrySpec::map().allow_block())
            .with("host", EntrySpec::scalar().require_parent(["web"]));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve("web").map(|s| s.kind), Some(EntryKind::Map));
        assert!(registry.resolve("web").is_some_and(|s| s.options.allow_block));
        assert_eq!(
            registry.resolve("host").map(|s| s.options.require_parent.clone()),
            Some(vec!["web".to_string()])
        );
        assert!(registry.resolve("queue").is_none());
    }

    #[test]
    fn test_with_options_merges() {
        let spec = EntrySpec::scalar_plus_map()
            .require_parent(["messaging"])
            .with_options(EntryOptions {
                cumulative: true,
                require_parent: vec!["web".into()],
                ..EntryOptions::default()
            });

        assert!(spec.options.cumulative);
        assert!(!spec.options.allow_block);
        assert_eq!(spec.options.require_parent, vec!["web"]);
    }

    #[test]
    fn test_deserialise_registry() {
        let json = r#"{
            "web": { "kind": "map", "allow_block": true,
                     "validate": { "optional": ["host", "context"] } },
            "job": { "kind": "scalar_plus_map", "cumulative": true, "require_parent": ["jobs"] }
        }"#;
        let registry: EntryRegistry = serde_json::from_str(json).unwrap();

        let web = registry.resolve("web").unwrap();
        assert_eq!(web.kind, EntryKind::Map);
        assert!(web.options.allow_block && !web.options.cumulative);
        assert_eq!(web.options.validate.as_ref().map(|c| c.optional.len()), Some(2));

        let job = registry.resolve("job").unwrap();
        assert_eq!(job.kind, EntryKind::ScalarPlusMap);
        assert!(job.options.cumulative);

        let bad = r#"{ "web": { "kind": "map", "allow_blocks": true } }"#;
        assert!(serde_json::from_str::<EntryRegistry>(bad).is_err());
    }
}
