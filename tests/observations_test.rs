use std::fs;
use std::io::Cursor;

use participants::config::ParticipantsConfig;
use participants::errors::ParticipantsError;
use participants::observations::*;
use participants::resolution::{IdentityResolver, ResolverEvent};
use participants::types::Identifier;
use tempfile::TempDir;

const FEED: &str = r#"{"type": "email", "value": "j.doe@example.org"}
{"same": [{"type": "email", "value": "j.doe@example.org"}, {"type": "dt_person_uri", "value": "/api/v1/person/person/20/"}]}

{"same": [{"type": "dt_person_uri", "value": "/api/v1/person/person/20/"}, {"type": "name", "value": "Jane Doe"}]}
{"type": "email", "value": "someone@example.com"}
"#;

#[test]
fn test_parse_both_line_shapes() {
    let observations = parse_observations(Cursor::new(FEED), "feed.jsonl").unwrap();
    assert_eq!(observations.len(), 4);
    assert_eq!(
        observations[0],
        Observation::Seen(Identifier::new("email", "j.doe@example.org"))
    );
    assert_eq!(
        observations[2],
        Observation::Same {
            same: [
                Identifier::new("dt_person_uri", "/api/v1/person/person/20/"),
                Identifier::new("name", "Jane Doe"),
            ],
        }
    );
}

#[test]
fn test_malformed_line_reports_line_number() {
    let feed = "{\"type\": \"email\", \"value\": \"a@x.org\"}\n{\"same\": []}\n";
    let err = parse_observations(Cursor::new(feed), "feed.jsonl").unwrap_err();
    match err {
        ParticipantsError::Parse { path, line, .. } => {
            assert_eq!(path, "feed.jsonl");
            assert_eq!(line, Some(2));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_apply_feed_groups_identifiers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("feed.jsonl");
    fs::write(&path, FEED).unwrap();

    let mut resolver =
        IdentityResolver::with_sink(ParticipantsConfig::default(), Vec::<ResolverEvent>::new());
    let stats = apply_observations(&mut resolver, &path).unwrap();

    assert_eq!(stats, FeedStats { seen: 2, same: 2 });
    assert!(resolver.same_person("email", "j.doe@example.org", "name", "Jane Doe"));
    assert!(!resolver.same_person("email", "someone@example.com", "name", "Jane Doe"));
    assert_eq!(resolver.active_persons().count(), 2);
}

#[test]
fn test_bad_feed_leaves_resolver_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("feed.jsonl");
    fs::write(&path, "{\"type\": \"email\", \"value\": \"a@x.org\"}\nnot json\n").unwrap();

    let mut resolver = IdentityResolver::default();
    assert!(apply_observations(&mut resolver, &path).is_err());
    assert_eq!(resolver.summary().identifiers, 0);
}

#[test]
fn test_missing_feed_is_file_error() {
    let dir = TempDir::new().unwrap();
    let mut resolver = IdentityResolver::default();
    let err = apply_observations(&mut resolver, &dir.path().join("absent.jsonl")).unwrap_err();
    assert!(matches!(err, ParticipantsError::File { .. }));
}

#[test]
fn test_feed_using_tombstone_type_is_rejected_before_applying() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("feed.jsonl");
    let feed = r#"{"type": "email", "value": "a@x.org"}
{"type": "replaced_by", "value": "x"}
"#;
    fs::write(&path, feed).unwrap();

    let mut resolver = IdentityResolver::default();
    let err = apply_observations(&mut resolver, &path).unwrap_err();
    match err {
        ParticipantsError::ReservedType { kind } => assert_eq!(kind, "replaced_by"),
        other => panic!("expected reserved type error, got {other:?}"),
    }
    assert_eq!(resolver.summary().identifiers, 0);
}

#[test]
fn test_same_pair_with_tombstone_type_is_rejected() {
    let mut resolver = IdentityResolver::default();
    resolver.resolve("email", "a@x.org");
    let observation = Observation::Same {
        same: [
            Identifier::new("email", "a@x.org"),
            Identifier::new("replaced_by", "PID:000009"),
        ],
    };

    let err = observation.apply(&mut resolver).unwrap_err();
    assert!(matches!(err, ParticipantsError::ReservedType { .. }));
    assert!(resolver.owner("replaced_by", "PID:000009").is_none());
    assert_eq!(resolver.summary().identifiers, 1);
}

#[test]
fn test_reserved_type_follows_configuration() {
    let config = ParticipantsConfig {
        tombstone_type: "moved_to".to_string(),
        ..ParticipantsConfig::default()
    };
    let mut resolver = IdentityResolver::new(config);

    Observation::Seen(Identifier::new("replaced_by", "x"))
        .apply(&mut resolver)
        .unwrap();
    assert!(Observation::Seen(Identifier::new("moved_to", "x"))
        .apply(&mut resolver)
        .is_err());
    assert!(resolver.owner("replaced_by", "x").is_some());
}
