//! The functional core: script text + registry → configuration document.
pub mod ast;
pub mod entry;
pub mod lexer;
pub mod registry;
pub mod script_parser;
pub mod validator;

pub use entry::{Entry, Frame};
pub use registry::{EntryKind, EntryOptions, EntryRegistry, EntrySpec};
pub use validator::{Constraint, OptionRule, ValueKind, Validator};

use crate::error::ConfigurationError;
use crate::model::Document;

/// Parses `script` and evaluates its top-level calls against `registry`.
///
/// All or nothing: the first violation aborts the run and no document is
/// returned.
pub fn interpret(script: &str, registry: &EntryRegistry) -> Result<Document, ConfigurationError> {
    let parsed = script_parser::parse_script(script)?;
    tracing::debug!(calls = parsed.calls.len(), keywords = registry.len(), "script parsed");

    let mut document = Document::new();
    entry::dispatch(&parsed.calls, &Frame::root(), &mut document, registry)?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Map, Value};
    use pretty_assertions::assert_eq;

    fn hash(pairs: &[(&str, Value)]) -> Value {
        Value::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    fn doc(pairs: &[(&str, Value)]) -> Map {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_single_map_entry() {
        let registry = EntryRegistry::new().with("foo", EntrySpec::map());
        let document = interpret(r#"foo({ "a" => 1 })"#, &registry).unwrap();
        assert_eq!(document.into_map(), doc(&[("foo", hash(&[("a", Value::Int(1))]))]));
    }

    #[test]
    fn test_block_children_share_scope() {
        let registry = EntryRegistry::new()
            .with("foo", EntrySpec::map().allow_block())
            .with("bar", EntrySpec::scalar_plus_map());
        let document =
            interpret(r#"foo({ "a" => 1 }) { bar("x", {"y" => 2}) }"#, &registry).unwrap();

        assert_eq!(
            document.into_map(),
            doc(&[
                ("foo", hash(&[("a", Value::Int(1))])),
                ("bar", hash(&[("x", hash(&[("y", Value::Int(2))]))])),
            ])
        );
    }

    #[test]
    fn test_nested_children_write_into_value() {
        let registry = EntryRegistry::new()
            .with("web", EntrySpec::map().allow_block().nested())
            .with("host", EntrySpec::scalar().require_parent(["web"]))
            .with("ssl", EntrySpec::map().require_parent(["web"]));
        let script = r#"
web({ "context" => "/" }) {
  host "example.com"
  ssl verify: true
}
"#;
        let document = interpret(script, &registry).unwrap();

        assert_eq!(
            document.into_map(),
            doc(&[(
                "web",
                hash(&[
                    ("context", Value::from("/")),
                    ("host", Value::from("example.com")),
                    ("ssl", hash(&[("verify", Value::Bool(true))])),
                ])
            )])
        );
    }

    #[test]
    fn test_nested_into_cumulative_pair() {
        let registry = EntryRegistry::new()
            .with("job", EntrySpec::scalar_plus_map().cumulative().allow_block().nested())
            .with("retries", EntrySpec::scalar().require_parent(["job"]));
        let script = "job Mailer do\n  retries 3\nend\njob Reaper\n";
        let document = interpret(script, &registry).unwrap();

        assert_eq!(
            document.get("job"),
            Some(&Value::List(vec![
                Value::List(vec![Value::from("Mailer"), hash(&[("retries", Value::from("3"))])]),
                Value::List(vec![Value::from("Reaper"), Value::empty_map()]),
            ]))
        );
    }

    #[test]
    fn test_scalar_overwrites_and_cumulative_appends() {
        let registry = EntryRegistry::new()
            .with("item", EntrySpec::scalar())
            .with("job", EntrySpec::scalar_plus_map().cumulative());
        let script = "item('x')\nitem('y')\njob 'a'\njob 'b', cron: '* * *'\njob 'c'";
        let document = interpret(script, &registry).unwrap();

        assert_eq!(document.get("item"), Some(&Value::from("y")));
        let jobs = match document.get("job") {
            Some(Value::List(jobs)) => jobs.clone(),
            other => panic!("expected a list, got {other:?}"),
        };
        assert_eq!(jobs.len(), 3);
        assert_eq!(
            jobs[1],
            Value::List(vec![Value::from("b"), hash(&[("cron", Value::from("* * *"))])])
        );
    }

    #[test]
    fn test_required_parent_at_top_level() {
        let registry = EntryRegistry::new()
            .with("outer", EntrySpec::base().allow_block())
            .with("inner", EntrySpec::base().require_parent(["outer"]));

        let err = interpret("\ninner()", &registry).unwrap_err();
        assert_eq!(err.to_string(), "'inner' only allowed inside outer (line 2)");

        // fine one level down, and a base entry writes nothing
        let document = interpret("outer do\n  inner()\nend", &registry).unwrap();
        assert!(document.root().is_empty());
    }

    #[test]
    fn test_block_receiver() {
        let registry = EntryRegistry::new()
            .with("web", EntrySpec::base().allow_block())
            .with("host", EntrySpec::scalar().require_parent(["web"]));

        let document = interpret("web do |w|\n  w.host 'a.example'\nend", &registry).unwrap();
        assert_eq!(document.get("host"), Some(&Value::from("a.example")));

        let err = interpret("web do |w|\n  x.host 'a'\nend", &registry).unwrap_err();
        assert_eq!(err.to_string(), "undefined receiver 'x' for 'host' (line 2)");
    }

    #[test]
    fn test_inert_identifiers() {
        let registry = EntryRegistry::new().with("env", EntrySpec::scalar());
        let document = interpret("Production\nenv Production\n", &registry).unwrap();
        assert_eq!(document.into_map(), doc(&[("env", Value::from("Production"))]));

        let test_cases = vec![
            ("frobnicate()", "unknown keyword 'frobnicate' (line 1)"),
            ("frobnicate 1", "unknown keyword 'frobnicate' (line 1)"),
            ("frobnicate {}", "unknown keyword 'frobnicate' (line 1)"),
        ];
        for (script, expected) in test_cases {
            let err = interpret(script, &registry).unwrap_err();
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_violations() {
        let registry = EntryRegistry::new()
            .with("web", EntrySpec::map().allow_block())
            .with("pool", EntrySpec::scalar_plus_map())
            .with(
                "env",
                EntrySpec::scalar().validate(Constraint::new().one_of(["dev", "prod"])),
            );

        let test_cases = vec![
            ("web({}) {\n  queue 'a'\n}", "unknown keyword 'queue' inside 'web' (line 2)"),
            ("pool 'a' { }", "'pool' is not allowed a block (line 1)"),
            ("web 'a'", "'web' takes a mapping (and only a mapping) (line 1)"),
            (
                "\n\nenv :qa",
                "`qa` is not a valid value for 'env'; expected one of: dev, prod (line 3)",
            ),
            ("web({ 'a' => 1 }", "expected `)`, found end of script (line 1)"),
        ];

        for (script, expected) in test_cases {
            let err = interpret(script, &registry).unwrap_err();
            assert_eq!(err.to_string(), expected, "script: {script:?}");
        }
    }
}
