use std::fs;

use keyconf::parser::load_registry_from_json;
use keyconf::{Value, interpret};
use pretty_assertions::assert_eq;

fn load(script: &str) -> Result<keyconf::Document, keyconf::ConfigurationError> {
    let json = fs::read_to_string("tests/fixtures/registry.json").unwrap();
    let registry = load_registry_from_json(&json).expect("valid registry");
    interpret(script, &registry)
}

#[test]
fn interprets_fixture_script() {
    let script = fs::read_to_string("tests/fixtures/app.kc").unwrap();
    let document = load(&script).expect("fixture interprets");

    let expected = serde_json::json!({
        "web": { "host": "mail.example.org", "context": "/mail" },
        "environment": { "MAIL_FROM": "noreply@example.com", "DEBUG": false },
        "ruby": { "version": "1.9", "compile_mode": "jit" },
        "pool": {
            "web": { "type": "shared" },
            "jobs": { "type": "bounded", "min": 2, "max": 8 }
        },
        "queue": {
            "/queues/outbound": {
                "durable": true,
                "processor": { "Mail::Sender": { "concurrency": 4 } }
            }
        },
        "topic": {
            "/topics/events": { "processor": { "Audit::Logger": {} } }
        },
        "job": [
            ["Mail::Reaper", { "cron": "0 */10 * * * ?" }],
            ["Mail::Digest", { "cron": "0 0 6 * * ?", "singleton": true }]
        ]
    });
    assert_eq!(serde_json::to_value(&document).unwrap(), expected);
}

#[test]
fn reports_violations_with_lines() {
    let test_cases = vec![
        (
            "application do\n  job Mail::Reaper\nend",
            "option `cron` is required for 'job' (line 2)",
        ),
        (
            "ruby version: '2.0'",
            "`2.0` is not a valid value for `version` of 'ruby'; expected one of: 1.8, 1.9 (line 1)",
        ),
        ("host 'a'", "'host' only allowed inside web (line 1)"),
        (
            "\nprocessor Foo",
            "'processor' only allowed inside queue or topic (line 2)",
        ),
        (
            "web hots: 'a'",
            "`hots` is not a valid option for 'web'; valid options are: host, context, static, rackup (line 1)",
        ),
    ];

    for (script, expected) in test_cases {
        let err = load(script).unwrap_err();
        assert_eq!(err.to_string(), expected, "script: {script:?}");
    }
}

#[test]
fn cumulative_jobs_keep_invocation_order() {
    let script: String = (0..5)
        .map(|i| format!("job Job{i}, cron: '{i} * * * * ?'\n"))
        .collect();
    let document = load(&script).unwrap();

    let names: Vec<String> = match document.get("job") {
        Some(Value::List(pairs)) => pairs
            .iter()
            .map(|pair| match pair {
                Value::List(items) => items[0].to_string(),
                other => panic!("not a pair: {other:?}"),
            })
            .collect(),
        other => panic!("expected a list of jobs, got {other:?}"),
    };
    assert_eq!(names, vec!["Job0", "Job1", "Job2", "Job3", "Job4"]);
}
