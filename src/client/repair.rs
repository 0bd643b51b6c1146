//! Repair of the player detail payload.
//!
//! The detail endpoint answers with brace-delimited `key:value` pairs where
//! neither keys nor values are quoted, eg. `{player_id:xyz,player_name:Mr:Fox}`.
//! Separators are `,`, `{` and `}`. A key ends at the first `:` met after it
//! starts; any later colon is part of the value. Keys are trimmed, values are
//! kept as sent, spaces included. Both are re-emitted as JSON strings, and a
//! value starting with `{` opens a nested object. Blank tokens, such as the
//! whitespace between a colon and a nested `{`, are dropped.
//!
//! Repair never fails on its own: input that does not fit the grammar (eg. a
//! key with no value) produces text that the JSON parser then rejects.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Key,
    Value,
}

/// Quote every bare key and value of `raw` so it parses as JSON.
pub fn repair(raw: &str) -> String {
    let mut repaired = String::with_capacity(raw.len() + raw.len() / 2);
    let mut token = String::new();
    let mut position = Position::Value;

    for c in raw.chars() {
        match (c, position) {
            ('{', _) => {
                emit(&token, &mut repaired);
                repaired.push('{');
                position = Position::Key;
            }
            ('}', _) => {
                emit(&token, &mut repaired);
                repaired.push('}');
                // A closed object sits in the value slot of its parent.
                position = Position::Value;
            }
            (',', _) => {
                emit(&token, &mut repaired);
                repaired.push(',');
                position = Position::Key;
            }
            (':', Position::Key) => {
                emit(token.trim(), &mut repaired);
                repaired.push(':');
                position = Position::Value;
            }
            (c, _) => {
                token.push(c);
                continue;
            }
        }
        token.clear();
    }
    emit(&token, &mut repaired);

    repaired
}

fn emit(token: &str, repaired: &mut String) {
    if !token.trim().is_empty() {
        // Serializing a &str cannot fail.
        repaired.push_str(&serde_json::Value::from(token).to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn parse(raw: &str) -> Value {
        serde_json::from_str(&repair(raw)).unwrap()
    }

    #[test]
    fn quotes_bare_keys_and_values() {
        assert_eq!(
            parse("{leaderboard_id:abc123,player_id:xyz,power:42}"),
            json!({"leaderboard_id": "abc123", "player_id": "xyz", "power": "42"})
        );
    }

    #[test]
    fn colon_in_value_does_not_split_fields() {
        assert_eq!(
            parse("{player_name:Mr:Fox,power:42,score:930}"),
            json!({"player_name": "Mr:Fox", "power": "42", "score": "930"})
        );
    }

    #[test]
    fn nested_objects_are_repaired() {
        assert_eq!(
            parse("{player_id:xyz,gear:{sword:3,shield:wood},power:7}"),
            json!({"player_id": "xyz", "gear": {"sword": "3", "shield": "wood"}, "power": "7"})
        );
    }

    #[test]
    fn keys_are_trimmed_and_values_kept_verbatim() {
        assert_eq!(
            parse("{ player_id : x y , player_name:  Fox , gear: {sword:3} }\n"),
            json!({"player_id": " x y ", "player_name": "  Fox ", "gear": {"sword": "3"}})
        );
    }

    #[test]
    fn quotes_and_backslashes_are_escaped() {
        assert_eq!(
            parse(r#"{player_name:The "Rock" \o/}"#),
            json!({"player_name": r#"The "Rock" \o/"#})
        );
    }

    #[test]
    fn missing_value_stays_invalid() {
        let repaired = repair("{player_id:xyz,power:}");
        assert!(serde_json::from_str::<Value>(&repaired).is_err());
    }

    #[test]
    fn empty_object() {
        assert_eq!(parse("{}"), json!({}));
    }

    proptest! {
        #[test]
        fn arbitrary_bare_pairs_round_trip(
            pairs in proptest::collection::btree_map("[a-z_]{1,12}", "[a-zA-Z0-9 :._-]{0,16}", 1..8)
        ) {
            // Blank values are dropped by the repair, leaving invalid JSON.
            let pairs: Vec<(String, String)> = pairs
                .into_iter()
                .filter(|(_, v)| !v.trim().is_empty())
                .collect();
            prop_assume!(!pairs.is_empty());

            let raw = format!(
                "{{{}}}",
                pairs.iter().map(|(k, v)| format!("{k}:{v}")).collect::<Vec<_>>().join(",")
            );
            let parsed: serde_json::Map<String, Value> =
                serde_json::from_str(&repair(&raw)).unwrap();

            prop_assert_eq!(parsed.len(), pairs.len());
            for (key, value) in &pairs {
                prop_assert_eq!(parsed.get(key), Some(&Value::from(value.as_str())));
            }
        }
    }
}
