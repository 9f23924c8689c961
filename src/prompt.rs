//! Prompt templates for itinerary generation and image description

use serde::{Deserialize, Serialize};

use crate::models::Activity;

/// Exact input of the itinerary prompt
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryPromptInput {
    pub request: String,
    /// Place name
    pub place: String,
    pub place_description: String,
    pub activities: Vec<Activity>,
}

/// Render the itinerary prompt text.
///
/// Activities without an image omit the image line.
#[must_use]
pub fn render_itinerary_prompt(input: &ItineraryPromptInput) -> String {
    let mut prompt = format!(
        "You are a travel agent. Plan a trip itinerary for the place below that fits the traveller's request.\n\n\
         Request: {}\n\
         Place: {}\n\
         Place description: {}\n\n",
        input.request, input.place, input.place_description
    );

    if input.activities.is_empty() {
        prompt.push_str("No activities are listed for this place.\n");
    } else {
        prompt.push_str("Only use activities from this list:\n");
        for activity in &input.activities {
            prompt.push_str(&format!("- Name: {}\n", activity.name));
            if let Some(reference) = &activity.reference {
                prompt.push_str(&format!("  Ref: {reference}\n"));
            }
            prompt.push_str(&format!("  Description: {}\n", activity.description));
            if let Some(image_url) = &activity.image_url {
                prompt.push_str(&format!("  Image: {image_url}\n"));
            }
        }
    }

    prompt.push_str(
        "\nRespond with a single JSON object with the fields place, itineraryName, startDate, endDate, \
         tags and itinerary. Each itinerary day has day, date, planTitle and activities; each \
         activity has ref, name, description and imageUrl copied from the list above.",
    );
    prompt
}

/// Instruction sent along with the inspiration images
pub const IMAGE_DESCRIPTION_PROMPT: &str = "Describe the images below in one paragraph as a travel \
destination: the landscape, the architecture, the atmosphere and the kind of trip they suggest. \
Do not name specific places.";

/// MIME type for an image URL, guessed from its extension
#[must_use]
pub fn mime_type_for(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => "image/jpeg",
    }
}
