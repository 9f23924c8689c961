//! Generation collaborators backed by Gemini on Vertex AI

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::{
    models::Destination,
    prompt::{IMAGE_DESCRIPTION_PROMPT, ItineraryPromptInput, mime_type_for, render_itinerary_prompt},
    vertex::{Content, GenerationConfig, Part, VertexAi, types::GenerateContentRequest},
};

/// Produces an itinerary for one place.
///
/// `Ok(None)` means the model gave no usable structured output; the flow
/// drops that place. Errors fail the whole flow.
#[async_trait]
pub trait ItineraryGenerator: Send + Sync {
    async fn generate(&self, input: &ItineraryPromptInput) -> Result<Option<Destination>>;
}

/// Turns inspiration images into a text description used for retrieval
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    async fn describe(&self, image_urls: &[String]) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GeminiItineraryGenerator {
    vertex: VertexAi,
    model: String,
    temperature: f32,
}

impl GeminiItineraryGenerator {
    pub fn new(vertex: VertexAi, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            vertex,
            model: model.into(),
            temperature,
        }
    }

    fn request(&self, input: &ItineraryPromptInput) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(render_itinerary_prompt(input))])],
            generation_config: Some(GenerationConfig {
                temperature: Some(self.temperature),
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(destination_schema()),
            }),
        }
    }
}

#[async_trait]
impl ItineraryGenerator for GeminiItineraryGenerator {
    #[instrument(skip(self, input), fields(place = %input.place))]
    async fn generate(&self, input: &ItineraryPromptInput) -> Result<Option<Destination>> {
        let response = self
            .vertex
            .generate_content(&self.model, &self.request(input))
            .await?;

        let Some(text) = response.text() else {
            warn!(
                "No itinerary output for {} (finish reason {:?})",
                input.place,
                response.finish_reason()
            );
            return Ok(None);
        };
        Ok(parse_destination(&text, &input.place))
    }
}

/// Parse model text as a destination, tolerating a markdown code fence
fn parse_destination(text: &str, place: &str) -> Option<Destination> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    match serde_json::from_str::<Destination>(body) {
        Ok(destination) => {
            debug!(
                "Generated {}-day itinerary for {}",
                destination.itinerary.len(),
                place
            );
            Some(destination)
        }
        Err(e) => {
            warn!("Discarding itinerary output for {}: {}", place, e);
            None
        }
    }
}

/// Response schema for a destination, in the Vertex OpenAPI subset
fn destination_schema() -> Value {
    let string = json!({ "type": "STRING" });
    json!({
        "type": "OBJECT",
        "properties": {
            "place": string,
            "itineraryName": string,
            "startDate": string,
            "endDate": string,
            "tags": { "type": "ARRAY", "items": string },
            "itinerary": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "day": { "type": "INTEGER" },
                        "date": string,
                        "planTitle": string,
                        "activities": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "ref": string,
                                    "name": string,
                                    "description": string,
                                    "imageUrl": string
                                },
                                "required": ["name", "description"]
                            }
                        }
                    },
                    "required": ["day", "activities"]
                }
            }
        },
        "required": ["place", "itineraryName", "itinerary"]
    })
}

#[derive(Debug, Clone)]
pub struct GeminiImageDescriber {
    vertex: VertexAi,
    model: String,
}

impl GeminiImageDescriber {
    pub fn new(vertex: VertexAi, model: impl Into<String>) -> Self {
        Self {
            vertex,
            model: model.into(),
        }
    }

    fn request(image_urls: &[String]) -> GenerateContentRequest {
        let mut parts = vec![Part::text(IMAGE_DESCRIPTION_PROMPT)];
        parts.extend(
            image_urls
                .iter()
                .map(|url| Part::file(mime_type_for(url), url.as_str())),
        );
        GenerateContentRequest {
            contents: vec![Content::user(parts)],
            generation_config: None,
        }
    }
}

#[async_trait]
impl ImageDescriber for GeminiImageDescriber {
    #[instrument(skip(self, image_urls), fields(images = image_urls.len()))]
    async fn describe(&self, image_urls: &[String]) -> Result<String> {
        let response = self
            .vertex
            .generate_content(&self.model, &Self::request(image_urls))
            .await?;
        Ok(response.text().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NICE: &str = r#"{"place":"Nice","itineraryName":"Riviera","itinerary":[{"day":1,"activities":[]}]}"#;

    #[test]
    fn test_parse_plain_json() {
        let destination = parse_destination(NICE, "Nice").unwrap();
        assert_eq!(destination.itinerary_name, "Riviera");
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("```json\n{NICE}\n```");
        assert!(parse_destination(&fenced, "Nice").is_some());
    }

    #[test]
    fn test_unparseable_output_is_none() {
        assert!(parse_destination("Sorry, I cannot help with that.", "Nice").is_none());
        assert!(parse_destination(r#"{"place":"Nice"}"#, "Nice").is_none());
    }

    #[test]
    fn test_image_request_has_one_part_per_image() {
        let request = GeminiImageDescriber::request(&[
            "https://img/a.png".to_string(),
            "https://img/b.jpg".to_string(),
        ]);
        let parts = &request.contents[0].parts;
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].text.as_deref(), Some(IMAGE_DESCRIPTION_PROMPT));
        assert_eq!(parts[1].file_data.as_ref().unwrap().mime_type, "image/png");
        assert_eq!(parts[2].file_data.as_ref().unwrap().mime_type, "image/jpeg");
    }

    #[test]
    fn test_schema_requires_itinerary() {
        let schema = destination_schema();
        assert!(
            schema["required"]
                .as_array()
                .unwrap()
                .contains(&json!("itinerary"))
        );
    }
}
