//! One keyword invocation and the dispatch that creates it.
//!
//! An `Entry` lives only while its call (and its block) is processed. It
//! holds explicit references to the shared document and registry; nested
//! calls get a fresh entry whose parent chain is this entry's chain plus
//! its own name.

use super::ast::{Block, Call};
use super::registry::{EntryKind, EntryRegistry, EntrySpec};
use super::validator::Validator;
use crate::error::ConfigurationError;
use crate::model::{Document, Map, Seg, Slot, Value, get_or_create};

/// Evaluation context of a statement list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Ancestor keywords, root first.
    pub parents: Vec<String>,
    /// Mapping that entries created in this frame write their keys into.
    pub scope: Slot,
    /// Block parameter name, for `w.keyword` calls.
    pub receiver: Option<String>,
}

impl Frame {
    pub fn root() -> Self {
        Self::default()
    }
}

/// Resolves each call through the registry and processes it, in order.
///
/// At the top level a lone identifier that names no keyword is inert and
/// skipped. Inside a block, and for anything with parentheses, arguments,
/// a block or a receiver, the keyword must resolve.
pub fn dispatch(
    calls: &[Call],
    frame: &Frame,
    document: &mut Document,
    registry: &EntryRegistry,
) -> Result<(), ConfigurationError> {
    for call in calls {
        if let Some(receiver) = &call.receiver {
            if frame.receiver.as_deref() != Some(receiver.as_str()) {
                return Err(ConfigurationError::at(
                    format!("undefined receiver '{receiver}' for '{}'", call.keyword),
                    call.line,
                ));
            }
        }

        let spec = match registry.resolve(&call.keyword) {
            Some(spec) => spec,
            None if call.bare && call.receiver.is_none() && frame.parents.is_empty() => {
                tracing::debug!(name = %call.keyword, line = call.line, "ignoring inert identifier");
                continue;
            }
            None => {
                let message = match frame.parents.last() {
                    Some(parent) => format!("unknown keyword '{}' inside '{parent}'", call.keyword),
                    None => format!("unknown keyword '{}'", call.keyword),
                };
                return Err(ConfigurationError::at(message, call.line));
            }
        };

        tracing::debug!(
            keyword = %call.keyword,
            line = call.line,
            depth = frame.parents.len(),
            "dispatch"
        );
        let mut entry = Entry::new(&call.keyword, spec, frame, Some(call.line), document, registry)?;
        entry.process(&call.args, call.block.as_ref())?;
    }
    Ok(())
}

pub struct Entry<'a> {
    name: String,
    spec: &'a EntrySpec,
    parents: Vec<String>,
    scope: Slot,
    line: Option<usize>,
    document: &'a mut Document,
    registry: &'a EntryRegistry,
}

impl<'a> Entry<'a> {
    /// Fails when a required parent is missing from `frame.parents`, before
    /// any argument is looked at.
    pub fn new(
        name: &str,
        spec: &'a EntrySpec,
        frame: &Frame,
        line: Option<usize>,
        document: &'a mut Document,
        registry: &'a EntryRegistry,
    ) -> Result<Self, ConfigurationError> {
        let required = &spec.options.require_parent;
        if !required.is_empty() && !required.iter().any(|p| frame.parents.contains(p)) {
            return Err(ConfigurationError::new(
                format!("'{name}' only allowed inside {}", required.join(" or ")),
                line,
            ));
        }

        Ok(Self {
            name: name.to_string(),
            spec,
            parents: frame.parents.clone(),
            scope: frame.scope.clone(),
            line,
            document,
            registry,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn process(
        &mut self,
        args: &[Value],
        block: Option<&Block>,
    ) -> Result<(), ConfigurationError> {
        if block.is_some() && !self.spec.options.allow_block {
            return Err(self.error(format!("'{}' is not allowed a block", self.name)));
        }
        let current = self.process_args(args)?;
        if let Some(block) = block {
            self.eval_block(block, &current)?;
        }
        Ok(())
    }

    /// Writes the arguments into the document and returns the slot of the
    /// value this call produced.
    pub fn process_args(&mut self, args: &[Value]) -> Result<Slot, ConfigurationError> {
        match self.spec.kind {
            EntryKind::Base => {
                if !args.is_empty() {
                    tracing::warn!(keyword = %self.name, line = ?self.line, "arguments ignored");
                }
                Ok(self.scope.clone())
            }
            EntryKind::Map => self.process_map(args),
            EntryKind::Scalar => self.process_scalar(args),
            EntryKind::ScalarPlusMap => self.process_scalar_plus_map(args),
        }
    }

    /// Runs a block's calls with this entry as their parent. They write into
    /// this entry's scope, or into `current` when the entry is `nested`.
    pub fn eval_block(&mut self, block: &Block, current: &[Seg]) -> Result<(), ConfigurationError> {
        let scope = if self.spec.options.nested {
            let holds_map = current.is_empty() || self.document.node(current).is_some_and(Value::is_map);
            if !holds_map {
                let found = self.document.node(current).map_or("nothing", Value::type_name);
                return Err(self.error(format!(
                    "'{}' cannot hold nested entries, its value is a {found}",
                    self.name
                )));
            }
            current.to_vec()
        } else {
            self.scope.clone()
        };

        let mut parents = self.parents.clone();
        parents.push(self.name.clone());
        let frame = Frame {
            parents,
            scope,
            receiver: block.param.clone(),
        };
        dispatch(&block.body, &frame, self.document, self.registry)
    }

    /// This entry's value in its scope, created as an empty mapping (or an
    /// empty list for cumulative entries) on first read.
    pub fn local_config(&mut self) -> Result<&mut Value, ConfigurationError> {
        let cumulative = self.spec.options.cumulative;
        let name = self.name.clone();
        Ok(get_or_create(self.scope_map()?, &name, cumulative))
    }

    pub fn validate_options(&self, value: &Value) -> Result<(), ConfigurationError> {
        if let Some(constraint) = &self.spec.options.validate {
            let validator = Validator::new(constraint, &self.name, value);
            if !validator.is_valid() {
                return Err(self.error(validator.message()));
            }
        }
        Ok(())
    }

    fn process_map(&mut self, args: &[Value]) -> Result<Slot, ConfigurationError> {
        let hash = match args {
            [Value::Map(hash)] => hash,
            _ => {
                return Err(self.error(format!(
                    "'{}' takes a mapping (and only a mapping)",
                    self.name
                )));
            }
        };
        self.validate_options(&args[0])?;

        let merged = match self.local_config()? {
            Value::Map(local) => {
                merge(local, hash);
                true
            }
            _ => false,
        };
        let slot = self.key_slot();
        if !merged {
            return Err(self.slot_mismatch(&slot, "a mapping"));
        }
        Ok(slot)
    }

    fn process_scalar(&mut self, args: &[Value]) -> Result<Slot, ConfigurationError> {
        let thing = match args {
            [thing] if !thing.is_map() => thing,
            _ => {
                return Err(self.error(format!(
                    "'{}' takes only one non-mapping option",
                    self.name
                )));
            }
        };
        self.validate_options(thing)?;

        let name = self.name.clone();
        self.scope_map()?.insert(name, Value::Str(thing.to_string()));
        Ok(self.key_slot())
    }

    fn process_scalar_plus_map(&mut self, args: &[Value]) -> Result<Slot, ConfigurationError> {
        let (thing, hash) = match args {
            [thing] if !thing.is_map() => (thing, Map::new()),
            [thing, Value::Map(hash)] if !thing.is_map() => (thing, hash.clone()),
            _ => {
                return Err(self.error(format!(
                    "'{}' takes a value and an optional mapping",
                    self.name
                )));
            }
        };
        self.validate_options(&Value::Map(hash.clone()))?;

        let key = thing.to_string();
        let mut slot = self.key_slot();

        if self.spec.options.cumulative {
            let appended = match self.local_config()? {
                Value::List(list) => {
                    list.push(Value::List(vec![Value::Str(key), Value::Map(hash)]));
                    Some(list.len() - 1)
                }
                _ => None,
            };
            let Some(index) = appended else {
                return Err(self.slot_mismatch(&slot, "a list"));
            };
            slot.extend([Seg::Index(index), Seg::Index(1)]);
            return Ok(slot);
        }

        let mut inner_slot = slot.clone();
        inner_slot.push(Seg::Key(key.clone()));
        let mismatch = match self.local_config()? {
            Value::Map(local) => match get_or_create(local, &key, false) {
                Value::Map(inner) => {
                    merge(inner, &hash);
                    None
                }
                _ => Some(inner_slot.clone()),
            },
            _ => Some(slot),
        };
        if let Some(bad) = mismatch {
            return Err(self.slot_mismatch(&bad, "a mapping"));
        }
        Ok(inner_slot)
    }

    fn scope_map(&mut self) -> Result<&mut Map, ConfigurationError> {
        let line = self.line;
        let name = &self.name;
        self.document.scope_mut(&self.scope).ok_or_else(|| {
            ConfigurationError::new(format!("'{name}' is inside a value that is not a mapping"), line)
        })
    }

    fn key_slot(&self) -> Slot {
        let mut slot = self.scope.clone();
        slot.push(Seg::Key(self.name.clone()));
        slot
    }

    fn slot_mismatch(&self, slot: &[Seg], expected: &str) -> ConfigurationError {
        let found = self.document.node(slot).map_or("nothing", Value::type_name);
        self.error(format!(
            "'{}' already holds a {found}, expected {expected}",
            self.name
        ))
    }

    fn error(&self, message: String) -> ConfigurationError {
        ConfigurationError::new(message, self.line)
    }
}

/// Last write wins for keys present in both.
fn merge(into: &mut Map, from: &Map) {
    into.extend(from.iter().map(|(k, v)| (k.clone(), v.clone())));
}
