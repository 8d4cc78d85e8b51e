//! Property tests for formatter round trips and file naming.

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use std::path::{Component, Path};
use threadvault::core::{Format, Message, Role, SaveOptions, Thread, ThreadMetadata};
use threadvault::format::formatter_for;
use threadvault::storage::local::thread_filename;

fn role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::User), Just(Role::Assistant), Just(Role::System)]
}

fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000_000).prop_map(|ms| DateTime::from_timestamp_millis(ms).unwrap_or_default())
}

fn content_line() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-zA-Z0-9#_\\-\\\\ ][a-zA-Z0-9 ,.!?#_*`\\-]{0,40}",
        1 => Just("## User".to_string()),
        1 => Just("## Assistant".to_string()),
        1 => Just("## System".to_string()),
        1 => Just("# Heading".to_string()),
        1 => Just("---".to_string()),
        1 => Just("_2026-01-31T10:00:00Z_".to_string()),
        1 => Just(String::new()),
    ]
}

fn content() -> impl Strategy<Value = String> {
    prop::collection::vec(content_line(), 1..5).prop_map(|lines| lines.join("\n"))
}

fn message() -> impl Strategy<Value = Message> {
    (role(), content(), prop::option::of(timestamp())).prop_map(|(role, content, timestamp)| {
        Message {
            role,
            content,
            timestamp,
        }
    })
}

fn thread() -> impl Strategy<Value = Thread> {
    (
        "[A-Za-z][A-Za-z0-9]{0,10}( [A-Za-z0-9]{1,10}){0,3}",
        timestamp(),
        prop::option::of(prop::collection::vec("[a-z]{1,8}", 1..4)),
        prop::collection::vec(message(), 0..6),
    )
        .prop_map(|(title, created_at, tags, messages)| Thread {
            id: "7c9e6679-7425-40de-944b-e07fc1f90ae7".to_string(),
            metadata: ThreadMetadata {
                created_at,
                tags,
                ..ThreadMetadata::new(title)
            },
            messages,
        })
}

proptest! {
    #[test]
    fn property_json_round_trip_is_exact(t in thread()) {
        let formatter = formatter_for(Format::Json);
        let text = formatter.serialize(&t, &SaveOptions::default()).unwrap();
        prop_assert_eq!(formatter.deserialize(&text).unwrap(), t);
    }

    #[test]
    fn property_markdown_round_trip_is_exact(t in thread()) {
        let formatter = formatter_for(Format::Markdown);
        let text = formatter
            .serialize(&t, &SaveOptions::with_format(Format::Markdown))
            .unwrap();
        prop_assert_eq!(formatter.deserialize(&text).unwrap(), t);
    }

    #[test]
    fn property_filename_is_a_single_safe_component(
        title in any::<String>(),
        id in any::<String>(),
        markdown in any::<bool>(),
    ) {
        let format = if markdown { Format::Markdown } else { Format::Json };
        let name = thread_filename(&title, &id, format).unwrap();

        prop_assert!(name.ends_with(format.extension()));
        prop_assert!(!name.contains('/'));
        prop_assert!(!name.contains('\\'));

        let components: Vec<_> = Path::new(&name).components().collect();
        prop_assert_eq!(components.len(), 1);
        prop_assert!(matches!(components[0], Component::Normal(_)));
    }

    #[test]
    fn property_filename_slug_is_lowercase_ascii(title in any::<String>()) {
        let name = thread_filename(&title, "abcdef12-3456", Format::Json).unwrap();
        let slug = name.trim_end_matches("-abcdef12.json");
        prop_assert!(slug.chars().count() <= 100);
        prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        prop_assert!(!slug.starts_with('-'));
    }
}
