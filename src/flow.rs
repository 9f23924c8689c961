//! The itinerary flow: retrieve places, generate one itinerary per place,
//! drop the places that produced nothing.

use std::sync::Arc;

use anyhow::Result;
use futures::future::try_join_all;
use tracing::{Instrument, debug, info, info_span, instrument};

use crate::{
    client::CompassClient,
    firestore::{FirestoreActivityCatalog, FirestoreClient, FirestorePlacesRetriever},
    generation::{GeminiImageDescriber, GeminiItineraryGenerator, ImageDescriber, ItineraryGenerator},
    models::{Destination, ItineraryFlowInput, ItineraryFlowOutput, Place},
    prompt::ItineraryPromptInput,
    retriever::{ActivityCatalog, PlacesRetriever},
    vertex::VertexAi,
};

/// Stand-in for the image description when image description is disabled
pub const PLACEHOLDER_IMAGE_DESCRIPTION: &str = "Imagine waking up to the sight of a sparkling river \
flowing through a bustling city, the iconic tower standing tall in the distance. As you stroll along \
the cobblestone streets,\n    you'll be greeted by charming cafes with outdoor seating, where you can savor \
a cup of coffee and people - watch. You'll be captivated by the history and architecture that \
surrounds you, from grand palaces to charming boutiques. And when the sun sets, the city transforms \
into a magical wonderland, with twinkling lights illuminating the river and the tower glowing \
brightly. This is a place where you can lose yourself in the beauty of the moment, where romance and \
adventure are just around the corner. ";

pub const DEFAULT_RETRIEVAL_LIMIT: usize = 3;

/// Retrieval query: the request and the image description on separate lines
#[must_use]
pub fn compose_query(request: &str, image_description: &str) -> String {
    format!("{request}\n{image_description}")
}

/// Span label for the generation of the place at `index`, numbered from 1
fn generation_span_name(index: usize) -> String {
    format!("Generate itinerary #{}", index + 1)
}

#[derive(Clone)]
pub struct ItineraryFlow {
    places: Arc<dyn PlacesRetriever>,
    activities: Arc<dyn ActivityCatalog>,
    generator: Arc<dyn ItineraryGenerator>,
    image_describer: Option<Arc<dyn ImageDescriber>>,
    retrieval_limit: usize,
}

impl ItineraryFlow {
    pub fn new(
        places: Arc<dyn PlacesRetriever>,
        activities: Arc<dyn ActivityCatalog>,
        generator: Arc<dyn ItineraryGenerator>,
    ) -> Self {
        Self {
            places,
            activities,
            generator,
            image_describer: None,
            retrieval_limit: DEFAULT_RETRIEVAL_LIMIT,
        }
    }

    /// Describe the request images instead of using the placeholder paragraph
    #[must_use]
    pub fn with_image_describer(mut self, describer: Arc<dyn ImageDescriber>) -> Self {
        self.image_describer = Some(describer);
        self
    }

    #[must_use]
    pub fn with_retrieval_limit(mut self, limit: usize) -> Self {
        self.retrieval_limit = limit;
        self
    }

    /// Wire the Firestore and Gemini collaborators from the client handle
    pub fn from_client(client: Arc<CompassClient>) -> Self {
        let config = client.config();
        let vertex = VertexAi::new(client.clone());
        let firestore = FirestoreClient::new(client.clone());

        let generator = GeminiItineraryGenerator::new(
            vertex.clone(),
            config.vertex.generation_model.clone(),
            config.vertex.temperature,
        );
        let flow = Self::new(
            Arc::new(FirestorePlacesRetriever::new(firestore.clone(), vertex.clone())),
            Arc::new(FirestoreActivityCatalog::new(firestore)),
            Arc::new(generator),
        )
        .with_retrieval_limit(config.flow.retrieval_limit);

        if config.flow.describe_images {
            let describer = GeminiImageDescriber::new(vertex, config.vertex.generation_model.clone());
            flow.with_image_describer(Arc::new(describer))
        } else {
            flow
        }
    }

    /// Run the flow for one trip request.
    ///
    /// Output keeps retrieval order. Any retrieval, activity lookup or
    /// generation error fails the whole run; remaining generations are
    /// dropped.
    #[instrument(name = "itineraryFlow", skip_all)]
    pub async fn run(&self, input: &ItineraryFlowInput) -> Result<ItineraryFlowOutput> {
        let image_description = self.image_description(input).await?;
        let query = compose_query(&input.request, &image_description);

        let span = info_span!("retrieve_places", otel.name = "Retrieve matching places");
        let places = self.retrieve_places(&query).instrument(span).await?;
        info!("Retrieved {} matching place(s)", places.len());

        let generations = places.iter().enumerate().map(|(i, place)| {
            let span = info_span!(
                "generate_itinerary",
                otel.name = %generation_span_name(i),
                place = %place.name
            );
            self.generate_itinerary(&input.request, place).instrument(span)
        });
        let itineraries = try_join_all(generations).await?;

        let output: ItineraryFlowOutput = itineraries.into_iter().flatten().collect();
        info!(
            "Generated {} itinerary(ies) for {} place(s)",
            output.len(),
            places.len()
        );
        Ok(output)
    }

    async fn image_description(&self, input: &ItineraryFlowInput) -> Result<String> {
        let Some(describer) = &self.image_describer else {
            return Ok(PLACEHOLDER_IMAGE_DESCRIPTION.to_string());
        };
        match input.image_urls.as_deref() {
            Some(urls) if !urls.is_empty() => describer.describe(urls).await,
            _ => Ok(String::new()),
        }
    }

    async fn retrieve_places(&self, query: &str) -> Result<Vec<Place>> {
        let documents = self.places.retrieve(query, self.retrieval_limit).await?;
        Ok(documents.iter().map(Place::from_document).collect())
    }

    async fn generate_itinerary(&self, request: &str, place: &Place) -> Result<Option<Destination>> {
        let activities = self
            .activities
            .activities_for_destination(&place.reference)
            .await?;
        debug!("{} activities for {}", activities.len(), place.name);

        let input = ItineraryPromptInput {
            request: request.to_string(),
            place: place.name.clone(),
            place_description: place.known_for.clone(),
            activities,
        };
        let destination = self.generator.generate(&input).await?;
        Ok(destination.map(|d| d.stamped_from(place)))
    }
}

impl std::fmt::Debug for ItineraryFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItineraryFlow")
            .field("retrieval_limit", &self.retrieval_limit)
            .field("describes_images", &self.image_describer.is_some())
            .finish_non_exhaustive()
    }
}
