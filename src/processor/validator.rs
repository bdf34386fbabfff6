//! Value constraints checked before an entry writes to the document.
//!
//! A `Constraint` describes which option keys a mapping may (or must) carry
//! and what each option's value may be; scalar values are checked with the
//! whole-value rules. `Validator` runs one constraint against one value and
//! collects every failure, so the reported message lists them all.

use crate::model::{Map, Value};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Integer,
    Float,
    /// integer or float
    Number,
    Boolean,
    List,
    Map,
}

impl ValueKind {
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ValueKind::String, Value::Str(_))
                | (ValueKind::Integer, Value::Int(_))
                | (ValueKind::Float, Value::Float(_))
                | (ValueKind::Number, Value::Int(_) | Value::Float(_))
                | (ValueKind::Boolean, Value::Bool(_))
                | (ValueKind::List, Value::List(_))
                | (ValueKind::Map, Value::Map(_))
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "a string",
            ValueKind::Integer => "an integer",
            ValueKind::Float => "a float",
            ValueKind::Number => "a number",
            ValueKind::Boolean => "a boolean",
            ValueKind::List => "a list",
            ValueKind::Map => "a mapping",
        };
        f.write_str(name)
    }
}

/// Rule for one option key: its name plus optional value restrictions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawRule")]
pub struct OptionRule {
    pub name: String,
    pub one_of: Option<Vec<Value>>,
    pub kind: Option<ValueKind>,
}

impl OptionRule {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            one_of: None,
            kind: None,
        }
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

impl From<&str> for OptionRule {
    fn from(name: &str) -> Self {
        OptionRule::named(name)
    }
}

/// Registry files may spell a rule as a bare key name or as an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRule {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        one_of: Option<Vec<Value>>,
        #[serde(default)]
        kind: Option<ValueKind>,
    },
}

impl From<RawRule> for OptionRule {
    fn from(raw: RawRule) -> Self {
        match raw {
            RawRule::Name(name) => OptionRule::named(name),
            RawRule::Detailed { name, one_of, kind } => OptionRule { name, one_of, kind },
        }
    }
}

/// Caller-supplied check with a description of what it expects.
#[derive(Clone)]
pub struct Predicate {
    pub description: String,
    check: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl Predicate {
    pub fn new<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            check: Arc::new(check),
        }
    }

    pub fn test(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Constraints attached to an entry's `validate` option.
///
/// When `required` or `optional` is non-empty the value must be a mapping
/// and any key not named by either list is rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Constraint {
    #[serde(default)]
    pub required: Vec<OptionRule>,
    #[serde(default)]
    pub optional: Vec<OptionRule>,
    #[serde(default)]
    pub one_of: Option<Vec<Value>>,
    #[serde(default)]
    pub kind: Option<ValueKind>,
    #[serde(skip)]
    pub predicate: Option<Predicate>,
}

impl Constraint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, rule: impl Into<OptionRule>) -> Self {
        self.required.push(rule.into());
        self
    }

    pub fn allow(mut self, rule: impl Into<OptionRule>) -> Self {
        self.optional.push(rule.into());
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn satisfies<F>(mut self, description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Predicate::new(description, check));
        self
    }

    fn declares_options(&self) -> bool {
        !self.required.is_empty() || !self.optional.is_empty()
    }

    fn rule(&self, key: &str) -> Option<&OptionRule> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .find(|r| r.name == key)
    }
}

/// One validation of `value` (supplied to entry `field`) against a constraint.
pub struct Validator<'a> {
    constraint: &'a Constraint,
    field: &'a str,
    value: &'a Value,
    messages: Vec<String>,
}

impl<'a> Validator<'a> {
    pub fn new(constraint: &'a Constraint, field: &'a str, value: &'a Value) -> Self {
        let mut validator = Self {
            constraint,
            field,
            value,
            messages: Vec::new(),
        };
        validator.validate();
        validator
    }

    pub fn is_valid(&self) -> bool {
        self.messages.is_empty()
    }

    /// Every failure, joined. Empty when the value is valid.
    pub fn message(&self) -> String {
        self.messages.join(", ")
    }

    fn validate(&mut self) {
        let value = self.value;
        if self.constraint.declares_options() {
            match value {
                Value::Map(options) => {
                    self.validate_required(options);
                    self.validate_known(options);
                }
                other => self.messages.push(format!(
                    "'{}' expects a mapping of options, got {}",
                    self.field,
                    other.type_name()
                )),
            }
        }
        self.validate_whole();
    }

    fn validate_required(&mut self, options: &Map) {
        let constraint = self.constraint;
        for rule in &constraint.required {
            if !options.contains_key(&rule.name) {
                self.messages.push(format!(
                    "option `{}` is required for '{}'",
                    rule.name, self.field
                ));
            }
        }
    }

    fn validate_known(&mut self, options: &Map) {
        let constraint = self.constraint;
        for (key, value) in options {
            match constraint.rule(key) {
                Some(rule) => self.validate_option(rule, value),
                None => {
                    let valid: Vec<&str> = constraint
                        .required
                        .iter()
                        .chain(constraint.optional.iter())
                        .map(|r| r.name.as_str())
                        .collect();
                    self.messages.push(format!(
                        "`{key}` is not a valid option for '{}'; valid options are: {}",
                        self.field,
                        valid.join(", ")
                    ));
                }
            }
        }
    }

    fn validate_option(&mut self, rule: &OptionRule, value: &Value) {
        let target = format!("`{}` of '{}'", rule.name, self.field);
        if let Some(msg) = check_value(&target, value, rule.kind, rule.one_of.as_deref()) {
            self.messages.push(msg);
        }
    }

    fn validate_whole(&mut self) {
        let target = format!("'{}'", self.field);
        let c = self.constraint;
        if let Some(msg) = check_value(&target, self.value, c.kind, c.one_of.as_deref()) {
            self.messages.push(msg);
        }
        if let Some(predicate) = &c.predicate {
            if !predicate.test(self.value) {
                self.messages.push(format!(
                    "`{}` is not a valid value for {target}; expected {}",
                    self.value, predicate.description
                ));
            }
        }
    }
}

fn check_value(
    target: &str,
    value: &Value,
    kind: Option<ValueKind>,
    one_of: Option<&[Value]>,
) -> Option<String> {
    if let Some(kind) = kind {
        if !kind.accepts(value) {
            return Some(format!(
                "`{value}` is not a valid value for {target}; expected {kind}, got {}",
                value.type_name()
            ));
        }
    }
    if let Some(allowed) = one_of {
        if !allowed.contains(value) {
            let names: Vec<String> = allowed.iter().map(ToString::to_string).collect();
            return Some(format!(
                "`{value}` is not a valid value for {target}; expected one of: {}",
                names.join(", ")
            ));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, Value)]) -> Value {
        Value::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn test_option_rules() {
        let constraint = Constraint::new()
            .require("host")
            .allow(OptionRule::named("mode").one_of(["jvm", "native"]))
            .allow(OptionRule::named("port").kind(ValueKind::Integer));

        let test_cases = vec![
            (options(&[("host", Value::from("a"))]), ""),
            (
                options(&[("host", Value::from("a")), ("port", Value::Int(80)), ("mode", Value::from("jvm"))]),
                "",
            ),
            (options(&[]), "option `host` is required for 'web'"),
            (
                options(&[("host", Value::from("a")), ("hots", Value::Int(1))]),
                "`hots` is not a valid option for 'web'; valid options are: host, mode, port",
            ),
            (
                options(&[("host", Value::from("a")), ("mode", Value::from("wasm"))]),
                "`wasm` is not a valid value for `mode` of 'web'; expected one of: jvm, native",
            ),
            (
                options(&[("port", Value::from("80"))]),
                "option `host` is required for 'web', `80` is not a valid value for `port` of 'web'; expected an integer, got string",
            ),
            (Value::from("a"), "'web' expects a mapping of options, got string"),
        ];

        for (value, expected) in test_cases {
            let validator = Validator::new(&constraint, "web", &value);
            assert_eq!(validator.is_valid(), expected.is_empty(), "value: {value}");
            assert_eq!(validator.message(), expected);
        }
    }

    #[test]
    fn test_whole_value_rules() {
        let enumerated = Constraint::new().one_of(["dev", "prod"]);
        assert!(Validator::new(&enumerated, "env", &Value::from("dev")).is_valid());
        assert_eq!(
            Validator::new(&enumerated, "env", &Value::from("qa")).message(),
            "`qa` is not a valid value for 'env'; expected one of: dev, prod"
        );

        let positive = Constraint::new().satisfies("a positive integer", |v| {
            matches!(v, Value::Int(i) if *i > 0)
        });
        assert!(Validator::new(&positive, "pool", &Value::Int(3)).is_valid());
        assert_eq!(
            Validator::new(&positive, "pool", &Value::Int(0)).message(),
            "`0` is not a valid value for 'pool'; expected a positive integer"
        );
    }

    #[test]
    fn test_empty_constraint_accepts_anything() {
        let constraint = Constraint::new();
        for value in [Value::Null, Value::Int(1), Value::Map(Map::new())] {
            assert!(Validator::new(&constraint, "x", &value).is_valid());
        }
    }

    #[test]
    fn test_deserialise_constraint() {
        let json = r#"{
            "required": ["host", {"name": "mode", "one_of": ["jvm", "native"]}],
            "optional": [{"name": "port", "kind": "integer"}]
        }"#;
        let constraint: Constraint = serde_json::from_str(json).unwrap();

        assert_eq!(constraint.required[0], OptionRule::named("host"));
        assert_eq!(
            constraint.required[1],
            OptionRule::named("mode").one_of(["jvm", "native"])
        );
        assert_eq!(constraint.optional[0].kind, Some(ValueKind::Integer));
        assert!(constraint.predicate.is_none());

        assert!(serde_json::from_str::<Constraint>(r#"{"requird": []}"#).is_err());
    }
}
