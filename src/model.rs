use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered mapping used for both script mappings and document nodes.
pub type Map = IndexMap<String, Value>;

/// Argument values and document nodes share one tagged union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(Map),
}

impl Value {
    pub fn empty_map() -> Self {
        Value::Map(Map::new())
    }

    pub fn empty_list() -> Self {
        Value::List(Vec::new())
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "mapping",
        }
    }
}

/// String form of a value: what a scalar becomes when stored as a key or
/// as a scalar entry. `nil` is empty, floats keep a fractional digit.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k} => {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Map(m)
    }
}

/// One step from a mapping or list into a child node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seg {
    Key(String),
    Index(usize),
}

/// Location of a node inside the document, from the root.
pub type Slot = Vec<Seg>;

/// The accumulated output of one interpretation run.
///
/// Keys are created on first access: `get_or_create` materialises an empty
/// mapping (or list) and keeps it, even if nothing is written afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    root: Map,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level get-or-create: an absent key becomes an empty mapping.
    pub fn get_or_create(&mut self, key: &str) -> &mut Value {
        get_or_create(&mut self.root, key, false)
    }

    /// Read without materialising anything.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    pub fn root(&self) -> &Map {
        &self.root
    }

    pub fn into_map(self) -> Map {
        self.root
    }

    /// Resolves `slot` to a node, without creating intermediate keys.
    pub fn node(&self, slot: &[Seg]) -> Option<&Value> {
        let (first, rest) = slot.split_first()?;
        let mut node = match first {
            Seg::Key(k) => self.root.get(k)?,
            Seg::Index(_) => return None,
        };
        for seg in rest {
            node = match (seg, node) {
                (Seg::Key(k), Value::Map(m)) => m.get(k)?,
                (Seg::Index(i), Value::List(l)) => l.get(*i)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Resolves `slot` to a mapping; the empty slot is the root. Missing
    /// keys along the way are vivified as empty mappings. `None` if the
    /// path crosses or ends on something that is not a mapping.
    pub fn scope_mut(&mut self, slot: &[Seg]) -> Option<&mut Map> {
        if slot.is_empty() {
            return Some(&mut self.root);
        }
        self.node_mut(slot)?.as_map_mut()
    }

    /// Resolves `slot` to any node, vivifying missing keys as mappings.
    pub fn node_mut(&mut self, slot: &[Seg]) -> Option<&mut Value> {
        let (first, rest) = slot.split_first()?;
        let mut node = match first {
            Seg::Key(k) => get_or_create(&mut self.root, k, false),
            Seg::Index(_) => return None,
        };
        for seg in rest {
            node = match (seg, node) {
                (Seg::Key(k), Value::Map(m)) => get_or_create(m, k, false),
                (Seg::Index(i), Value::List(l)) => l.get_mut(*i)?,
                _ => return None,
            };
        }
        Some(node)
    }
}

/// Explicit get-or-create on a mapping: the default is an empty list when
/// `list` is set, an empty mapping otherwise. The default stays in `map`.
pub fn get_or_create<'m>(map: &'m mut Map, key: &str, list: bool) -> &'m mut Value {
    map.entry(key.to_string()).or_insert_with(|| {
        if list {
            Value::empty_list()
        } else {
            Value::empty_map()
        }
    })
}
