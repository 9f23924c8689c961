//! Place model and normalization of retrieved documents

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// A candidate destination surfaced by retrieval
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    /// Content store identifier, used for activity lookups
    #[serde(rename = "ref")]
    pub reference: String,
    pub name: String,
    pub continent: String,
    pub country: String,
    /// Description of the place, fed to the itinerary prompt
    pub known_for: String,
    pub image_url: String,
    pub tags: Vec<String>,
}

/// One content part of a retrieved document
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DocumentPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl DocumentPart {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// Raw record returned by a places retriever
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct RetrievedDocument {
    #[serde(default)]
    pub content: Vec<DocumentPart>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl RetrievedDocument {
    /// Text of the first content part, if any
    #[must_use]
    pub fn primary_text(&self) -> Option<&str> {
        self.content.first().and_then(|part| part.text.as_deref())
    }
}

impl Place {
    /// Metadata keys copied into a `Place`. Everything else, including the
    /// vector field, is dropped.
    pub const METADATA_FIELDS: [&'static str; 7] = [
        "ref",
        "name",
        "continent",
        "country",
        "knownFor",
        "imageUrl",
        "tags",
    ];

    /// Normalize a retrieved document into a place.
    ///
    /// String fields default to `""` and `tags` to `[]`; allow-listed
    /// metadata overrides the defaults, and a non-empty primary content
    /// text overrides `knownFor`.
    #[must_use]
    pub fn from_document(document: &RetrievedDocument) -> Self {
        let mut place = Place::default();

        for key in Self::METADATA_FIELDS {
            let Some(value) = document.metadata.get(key) else {
                continue;
            };
            if key == "tags" {
                match value {
                    Value::Array(items) => {
                        place.tags = items
                            .iter()
                            .filter_map(|t| t.as_str().map(str::to_string))
                            .collect();
                    }
                    Value::Null => {}
                    other => debug!("Ignoring non-array tags metadata: {}", type_name(other)),
                }
            } else if let Some(target) = place.string_field(key) {
                set_string(target, key, value);
            }
        }

        if let Some(text) = document.primary_text() {
            if !text.is_empty() {
                place.known_for = text.to_string();
            }
        }

        place
    }

    /// String field backing an allow-listed metadata key
    fn string_field(&mut self, key: &str) -> Option<&mut String> {
        match key {
            "ref" => Some(&mut self.reference),
            "name" => Some(&mut self.name),
            "continent" => Some(&mut self.continent),
            "country" => Some(&mut self.country),
            "knownFor" => Some(&mut self.known_for),
            "imageUrl" => Some(&mut self.image_url),
            _ => None,
        }
    }
}

fn set_string(target: &mut String, key: &str, value: &Value) {
    match value {
        Value::String(s) => *target = s.clone(),
        Value::Null => {}
        Value::Number(n) => *target = n.to_string(),
        Value::Bool(b) => *target = b.to_string(),
        other => debug!("Ignoring {} metadata for field {}", type_name(other), key),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(metadata: Value, text: Option<&str>) -> RetrievedDocument {
        RetrievedDocument {
            content: text.map(DocumentPart::text).into_iter().collect(),
            metadata: metadata.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_every_allow_listed_field_is_mapped() {
        let mut place = Place::default();
        for key in Place::METADATA_FIELDS {
            assert!(key == "tags" || place.string_field(key).is_some(), "{key} is not mapped");
        }
        assert!(place.string_field("embedding").is_none());
    }

    #[test]
    fn test_defaults_for_missing_metadata() {
        let place = Place::from_document(&document(json!({}), None));
        assert_eq!(place, Place::default());
        assert!(place.tags.is_empty());
        assert_eq!(place.known_for, "");
    }

    #[test]
    fn test_metadata_overrides_defaults() {
        let place = Place::from_document(&document(
            json!({
                "ref": "p1",
                "name": "Nice",
                "continent": "Europe",
                "country": "France",
                "imageUrl": "https://img/nice.jpg",
                "tags": ["beach", "riviera"],
            }),
            None,
        ));
        assert_eq!(place.reference, "p1");
        assert_eq!(place.name, "Nice");
        assert_eq!(place.continent, "Europe");
        assert_eq!(place.country, "France");
        assert_eq!(place.image_url, "https://img/nice.jpg");
        assert_eq!(place.tags, vec!["beach", "riviera"]);
    }

    #[test]
    fn test_content_text_overrides_known_for() {
        let place = Place::from_document(&document(
            json!({ "knownFor": "from metadata" }),
            Some("from content"),
        ));
        assert_eq!(place.known_for, "from content");
    }

    #[test]
    fn test_empty_content_text_keeps_metadata_known_for() {
        let place = Place::from_document(&document(
            json!({ "knownFor": "from metadata" }),
            Some(""),
        ));
        assert_eq!(place.known_for, "from metadata");
    }

    #[test]
    fn test_embedding_and_unknown_fields_are_dropped() {
        let place = Place::from_document(&document(
            json!({
                "ref": "p1",
                "embedding": [0.1, 0.2, 0.3],
                "internalScore": 0.92,
            }),
            Some("Sunny coast"),
        ));
        let serialized = serde_json::to_value(&place).unwrap();
        let object = serialized.as_object().unwrap();
        assert!(!object.contains_key("embedding"));
        assert!(!object.contains_key("internalScore"));
        assert_eq!(object.len(), Place::METADATA_FIELDS.len());
    }

    #[test]
    fn test_serializes_with_camel_case_and_ref() {
        let place = Place {
            reference: "p2".to_string(),
            known_for: "Gaudi".to_string(),
            image_url: "u".to_string(),
            ..Place::default()
        };
        let value = serde_json::to_value(&place).unwrap();
        assert_eq!(value["ref"], "p2");
        assert_eq!(value["knownFor"], "Gaudi");
        assert_eq!(value["imageUrl"], "u");
    }

    #[test]
    fn test_non_string_tags_are_skipped() {
        let place = Place::from_document(&document(json!({ "tags": ["a", 1, null, "b"] }), None));
        assert_eq!(place.tags, vec!["a", "b"]);
    }
}
