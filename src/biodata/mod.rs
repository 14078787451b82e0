//! Biodata payload model: the three known sections, canonical field pairs,
//! template selectors and the approval lifecycle.

pub mod normalize;
pub mod template;
pub mod workflow;

use serde_json::Value;

pub use template::TemplateChoice;
pub use workflow::ApprovalStatus;

/// Top-level payload sections, in display order.
pub const SECTIONS: [Section; 3] = [
    Section::PersonalDetails,
    Section::FamilyDetails,
    Section::HabitsDeclaration,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    PersonalDetails,
    FamilyDetails,
    HabitsDeclaration,
}

impl Section {
    /// Key of the section inside the stored payload.
    pub fn key(self) -> &'static str {
        match self {
            Section::PersonalDetails => "PersonalDetails",
            Section::FamilyDetails => "FamilyDetails",
            Section::HabitsDeclaration => "HabitsDeclaration",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Section::PersonalDetails => "PERSONAL DETAILS",
            Section::FamilyDetails => "FAMILY DETAILS",
            Section::HabitsDeclaration => "HABITS & DECLARATION",
        }
    }
}

/// A resolved field: the text that ends up on the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: String,
    pub value: String,
}

/// Underscores become spaces, then every word is capitalised and the rest
/// of the word lower-cased (`date_of_birth` -> `Date Of Birth`).
pub fn title_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev_alpha = false;
    for ch in key.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Text form of an arbitrary JSON leaf.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => items
            .iter()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Resolve a stored field into display text. Canonical pairs supply their own
/// label; anything else falls back to the title-cased key. The structural
/// wrapper itself never reaches the output.
pub fn resolve_field(key: &str, value: &Value) -> Field {
    match value {
        Value::Object(obj) => {
            let label = obj
                .get("label")
                .map(value_text)
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| title_case(key));
            let value = obj.get("value").map(value_text).unwrap_or_default();
            Field { label, value }
        }
        other => Field {
            label: title_case(key),
            value: value_text(other),
        },
    }
}

/// Fields of one section with a non-blank value, in payload order.
pub fn section_fields(payload: &Value, section: Section) -> Vec<Field> {
    let Some(obj) = payload.get(section.key()).and_then(Value::as_object) else {
        return Vec::new();
    };
    obj.iter()
        .map(|(key, value)| resolve_field(key, value))
        .filter(|field| !field.value.trim().is_empty())
        .collect()
}

/// Name shown on the document: `name`/`Name` from personal details, then the
/// submitter's display name.
pub fn display_name(payload: &Value, fallback: Option<&str>) -> Option<String> {
    let personal = payload.get(Section::PersonalDetails.key());
    ["name", "Name"]
        .iter()
        .filter_map(|key| personal.and_then(|p| p.get(*key)))
        .map(|value| resolve_field("name", value).value)
        .chain(fallback.map(str::to_string))
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn title_case_matches_form_keys() {
        assert_eq!(title_case("date_of_birth"), "Date Of Birth");
        assert_eq!(title_case("FATHER_NAME"), "Father Name");
        assert_eq!(title_case("height"), "Height");
        assert_eq!(title_case("place_of_birth2"), "Place Of Birth2");
    }

    #[test]
    fn resolve_prefers_explicit_label() {
        let field = resolve_field("dob", &json!({"label": "Birth Date", "value": "1 Jan 1995"}));
        assert_eq!(field.label, "Birth Date");
        assert_eq!(field.value, "1 Jan 1995");

        let field = resolve_field("date_of_birth", &json!("1 Jan 1995"));
        assert_eq!(field.label, "Date Of Birth");
    }

    #[test]
    fn section_fields_skip_blank_values() {
        let payload = json!({
            "FamilyDetails": {
                "father_name": {"label": "Father Name", "value": "Ramesh"},
                "mother_name": {"label": "Mother Name", "value": "  "},
                "siblings": ""
            }
        });
        let fields = section_fields(&payload, Section::FamilyDetails);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].value, "Ramesh");
    }

    #[test]
    fn display_name_falls_back_to_user_name() {
        let payload = json!({"PersonalDetails": {"name": {"label": "Name", "value": "Asha"}}});
        assert_eq!(display_name(&payload, Some("Other")).as_deref(), Some("Asha"));

        let payload = json!({"PersonalDetails": {"height": "5'4\""}});
        assert_eq!(display_name(&payload, Some("Asha K")).as_deref(), Some("Asha K"));
        assert_eq!(display_name(&payload, Some("  ")), None);
        assert_eq!(display_name(&json!({}), None), None);
    }
}
