//! Coerces submitted payloads into canonical `{label, value}` field pairs.
//!
//! Used as a pre-save hook on every write and by the batch repair job that
//! migrates legacy rows.

use serde_json::{Map, Value};

use super::{title_case, value_text, SECTIONS};

/// Normalize every known section of `payload`. Unknown top-level keys and
/// non-object sections pass through untouched.
pub fn normalize_payload(payload: &Value) -> Value {
    let Some(obj) = payload.as_object() else {
        return payload.clone();
    };

    let mut out = obj.clone();
    for section in SECTIONS {
        if let Some(Value::Object(fields)) = obj.get(section.key()) {
            out.insert(
                section.key().to_string(),
                Value::Object(normalize_section(fields)),
            );
        }
    }
    Value::Object(out)
}

pub fn normalize_section(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), normalize_field(key, value)))
        .collect()
}

pub fn normalize_field(key: &str, value: &Value) -> Value {
    match value {
        Value::Object(obj) => pair_from_object(key, obj),
        Value::String(s) => match parse_mapping_literal(s) {
            Some(parsed) => pair_from_object(key, &parsed),
            None => pair(title_case(key), s.clone()),
        },
        other => pair(title_case(key), value_text(other)),
    }
}

/// Rebuilds the canonical pair from an object. An object that is already a
/// string pair comes back unchanged.
fn pair_from_object(key: &str, obj: &Map<String, Value>) -> Value {
    let label = match obj.get("label") {
        Some(Value::String(label)) => label.clone(),
        Some(Value::Null) | None => title_case(key),
        Some(other) => value_text(other),
    };
    let value = obj.get("value").map(value_text).unwrap_or_default();
    pair(label, value)
}

fn pair(label: String, value: String) -> Value {
    let mut obj = Map::with_capacity(2);
    obj.insert("label".to_string(), Value::String(label));
    obj.insert("value".to_string(), Value::String(value));
    Value::Object(obj)
}

/// Strings such as `{"label": "Height", "value": "5'4"}` or the legacy
/// single-quoted `{'label': 'Height', 'value': '160'}` are parsed back into
/// an object. Anything that does not parse stays a literal string.
fn parse_mapping_literal(s: &str) -> Option<Map<String, Value>> {
    let trimmed = s.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return None;
    }

    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(trimmed) {
        return Some(obj);
    }

    let requoted = requote_single_quoted(trimmed)?;
    match serde_json::from_str::<Value>(&requoted) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

/// Converts a Python-style mapping literal into JSON text. Single-quoted
/// strings are requoted with their double quotes escaped; double-quoted
/// strings (used when the text holds an apostrophe) are copied as they are.
/// `None`/`True`/`False` outside strings are mapped to their JSON spelling.
fn requote_single_quoted(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut in_single = false;
    let mut in_double = false;
    let mut chars = s.chars().peekable();
    let mut bare = String::new();

    let flush_bare = |bare: &mut String, out: &mut String| {
        let mapped = match bare.as_str() {
            "None" => "null",
            "True" => "true",
            "False" => "false",
            other => other,
        };
        out.push_str(mapped);
        bare.clear();
    };

    while let Some(ch) = chars.next() {
        if in_single {
            match ch {
                '\\' => {
                    let escaped = chars.next()?;
                    match escaped {
                        '\'' => out.push('\''),
                        '"' => out.push_str("\\\""),
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                '\'' => {
                    in_single = false;
                    out.push('"');
                }
                '"' => out.push_str("\\\""),
                other => out.push(other),
            }
        } else if in_double {
            match ch {
                '\\' => match chars.next()? {
                    '\'' => out.push('\''),
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                },
                '"' => {
                    in_double = false;
                    out.push('"');
                }
                other => out.push(other),
            }
        } else if ch == '"' {
            flush_bare(&mut bare, &mut out);
            in_double = true;
            out.push('"');
        } else if ch == '\'' {
            flush_bare(&mut bare, &mut out);
            in_single = true;
            out.push('"');
        } else if ch.is_alphanumeric() || ch == '_' {
            bare.push(ch);
        } else {
            flush_bare(&mut bare, &mut out);
            out.push(ch);
        }
    }

    if in_single || in_double {
        return None;
    }
    flush_bare(&mut bare, &mut out);
    Some(out)
}

/// True when a stored field already has the exact canonical shape.
pub fn is_canonical(value: &Value) -> bool {
    match value.as_object() {
        Some(obj) => {
            obj.len() == 2
                && obj.get("label").is_some_and(Value::is_string)
                && obj.get("value").is_some_and(Value::is_string)
        }
        None => false,
    }
}

/// `(section, field key)` for every stored field that is not canonical.
pub fn non_canonical_fields(payload: &Value) -> Vec<(String, String)> {
    let mut found = Vec::new();
    for section in SECTIONS {
        if let Some(Value::Object(fields)) = payload.get(section.key()) {
            for (key, value) in fields {
                if !is_canonical(value) {
                    found.push((section.key().to_string(), key.clone()));
                }
            }
        }
    }
    found
}

/// Repair step for stored rows: returns the normalized payload when it
/// differs from the stored one.
pub fn repair(payload: &Value) -> Option<Value> {
    let normalized = normalize_payload(payload);
    if normalized == *payload {
        None
    } else {
        Some(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_string_is_wrapped_with_title_cased_label() {
        let payload = json!({"PersonalDetails": {"date_of_birth": "foo"}});
        let normalized = normalize_payload(&payload);
        assert_eq!(
            normalized["PersonalDetails"]["date_of_birth"],
            json!({"label": "Date Of Birth", "value": "foo"})
        );
    }

    #[test]
    fn canonical_pairs_are_kept() {
        let payload = json!({
            "PersonalDetails": {"dob": {"label": "Birth Date", "value": "1995-01-01"}}
        });
        assert_eq!(normalize_payload(&payload), payload);
        assert!(repair(&payload).is_none());
    }

    #[test]
    fn normalization_is_idempotent() {
        let payload = json!({
            "PersonalDetails": {
                "name": "Asha",
                "height": 160,
                "hobbies": ["music", "travel"],
                "gotra": {"value": "Kashyap"},
                "raw": "{'label': 'Rashi', 'value': 'Mesh'}"
            },
            "FamilyDetails": {"father": null},
            "HabitsDeclaration": {}
        });
        let once = normalize_payload(&payload);
        let twice = normalize_payload(&once);
        assert_eq!(once, twice);
        assert!(non_canonical_fields(&once).is_empty());
    }

    #[test]
    fn other_values_are_stringified() {
        let normalized = normalize_payload(&json!({
            "PersonalDetails": {"height": 160, "hobbies": ["music", "travel"], "manglik": false, "note": null}
        }));
        let personal = &normalized["PersonalDetails"];
        assert_eq!(personal["height"]["value"], "160");
        assert_eq!(personal["hobbies"]["value"], "music, travel");
        assert_eq!(personal["manglik"]["value"], "false");
        assert_eq!(personal["note"], json!({"label": "Note", "value": ""}));
    }

    #[test]
    fn partial_objects_get_defaults() {
        let normalized = normalize_field("mother_tongue", &json!({"value": "Marathi", "extra": 1}));
        assert_eq!(normalized, json!({"label": "Mother Tongue", "value": "Marathi"}));

        let normalized = normalize_field("caste", &json!({"label": "Caste"}));
        assert_eq!(normalized, json!({"label": "Caste", "value": ""}));
    }

    #[test]
    fn serialized_mappings_are_parsed_back() {
        let normalized = normalize_field("rashi", &json!("{\"label\": \"Rashi\", \"value\": \"Mesh\"}"));
        assert_eq!(normalized, json!({"label": "Rashi", "value": "Mesh"}));

        let normalized = normalize_field("height", &json!("{'label': 'Height', 'value': '5\\'4\"'}"));
        assert_eq!(normalized, json!({"label": "Height", "value": "5'4\""}));

        let normalized = normalize_field("flag", &json!("{'label': None, 'value': True}"));
        assert_eq!(normalized, json!({"label": "Flag", "value": "true"}));
    }

    #[test]
    fn double_quoted_strings_with_apostrophes_are_parsed_back() {
        let normalized = normalize_field(
            "father_name",
            &json!("{'label': \"Father's Name\", 'value': 'Ramesh'}"),
        );
        assert_eq!(normalized, json!({"label": "Father's Name", "value": "Ramesh"}));

        let normalized = normalize_field("height", &json!("{'label': 'Height', 'value': \"5'4\"}"));
        assert_eq!(normalized, json!({"label": "Height", "value": "5'4"}));

        let normalized =
            normalize_field("quote", &json!("{'label': 'Quote', 'value': \"say \\\"it's\\\" \\'ok\\'\"}"));
        assert_eq!(normalized, json!({"label": "Quote", "value": "say \"it's\" 'ok'"}));

        let normalized = normalize_field("about", &json!("{'label': \"About's}"));
        assert_eq!(normalized, json!({"label": "About", "value": "{'label': \"About's}"}));
    }

    #[test]
    fn malformed_mapping_strings_stay_literal() {
        let normalized = normalize_field("about", &json!("{not really json"));
        assert_eq!(normalized, json!({"label": "About", "value": "{not really json"}));

        let normalized = normalize_field("about", &json!("{'label': 'About}"));
        assert_eq!(normalized, json!({"label": "About", "value": "{'label': 'About}"}));
    }

    #[test]
    fn empty_and_unknown_sections_are_untouched() {
        let payload = json!({
            "PersonalDetails": {},
            "Extra": {"x": "y"},
            "FamilyDetails": "not a section"
        });
        assert_eq!(normalize_payload(&payload), payload);
    }

    #[test]
    fn field_order_is_preserved() {
        let payload = json!({"PersonalDetails": {"zeta": "1", "alpha": "2", "mid": "3"}});
        let normalized = normalize_payload(&payload);
        let keys: Vec<_> = normalized["PersonalDetails"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn non_canonical_fields_are_reported() {
        let payload = json!({
            "PersonalDetails": {"name": "Asha", "dob": {"label": "DOB", "value": "x"}},
            "HabitsDeclaration": {"diet": {"value": "Veg"}}
        });
        let found = non_canonical_fields(&payload);
        assert_eq!(
            found,
            vec![
                ("PersonalDetails".to_string(), "name".to_string()),
                ("HabitsDeclaration".to_string(), "diet".to_string()),
            ]
        );
    }
}
