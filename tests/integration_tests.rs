//! Integration tests for the Compass itinerary flow and its HTTP surface

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use compass::{
    ActivityCatalog, CompassError, Destination, ItineraryFlow, ItineraryFlowInput,
    ItineraryGenerator, ItineraryPromptInput, Plugin, PlacesRetriever,
    api::AppState,
    config::ServerConfig,
    models::{Activity, DocumentPart, RetrievedDocument},
    web,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

/// In-memory places collection, returned in relevance order
struct MemoryPlaces(Vec<Value>);

#[async_trait]
impl PlacesRetriever for MemoryPlaces {
    async fn retrieve(&self, _query: &str, limit: usize) -> anyhow::Result<Vec<RetrievedDocument>> {
        Ok(self
            .0
            .iter()
            .take(limit)
            .map(|place| RetrievedDocument {
                content: vec![DocumentPart::text(
                    place["knownFor"].as_str().unwrap_or_default(),
                )],
                metadata: place.as_object().cloned().unwrap_or_default(),
            })
            .collect())
    }
}

struct MemoryActivities;

#[async_trait]
impl ActivityCatalog for MemoryActivities {
    async fn activities_for_destination(&self, place_ref: &str) -> anyhow::Result<Vec<Activity>> {
        Ok(vec![
            Activity::new("Harbour walk", "Stroll along the water")
                .with_ref(format!("{place_ref}-a1")),
        ])
    }
}

/// Plans every place except the ones it was told to skip
struct SelectiveGenerator {
    skip: Vec<&'static str>,
    fail: bool,
    calls: AtomicUsize,
}

impl SelectiveGenerator {
    fn skipping(skip: Vec<&'static str>) -> Self {
        Self {
            skip,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ItineraryGenerator for SelectiveGenerator {
    async fn generate(&self, input: &ItineraryPromptInput) -> anyhow::Result<Option<Destination>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CompassError::api("Vertex AI error 500: backend unavailable").into());
        }
        if self.skip.contains(&input.place.as_str()) {
            return Ok(None);
        }
        let destination: Destination = serde_json::from_value(json!({
            "place": input.place,
            "itineraryName": format!("Best of {}", input.place),
            "startDate": "2025-06-01",
            "endDate": "2025-06-03",
            "tags": ["beach"],
            "itineraryImageUrl": "https://model/guess.jpg",
            "placeRef": "model-guess",
            "itinerary": [{
                "day": 1,
                "date": "2025-06-01",
                "planTitle": "Arrival",
                "activities": input.activities
            }]
        }))?;
        Ok(Some(destination))
    }
}

fn places() -> MemoryPlaces {
    MemoryPlaces(vec![
        json!({
            "ref": "p1",
            "name": "Nice",
            "country": "France",
            "continent": "Europe",
            "knownFor": "Promenade des Anglais",
            "imageUrl": "https://img/nice.jpg",
            "tags": ["beach", "city"],
            "embedding": [0.12, 0.34, 0.56]
        }),
        json!({
            "ref": "p2",
            "name": "Barcelona",
            "country": "Spain",
            "continent": "Europe",
            "knownFor": "Gaudi",
            "imageUrl": "https://img/barcelona.jpg",
            "tags": ["beach"],
            "embedding": [0.9, 0.8, 0.7]
        }),
        json!({
            "ref": "p3",
            "name": "Split",
            "imageUrl": "https://img/split.jpg"
        }),
        json!({
            "ref": "p4",
            "name": "Valletta",
            "imageUrl": "https://img/valletta.jpg"
        }),
    ])
}

fn flow(generator: Arc<SelectiveGenerator>) -> ItineraryFlow {
    ItineraryFlow::new(Arc::new(places()), Arc::new(MemoryActivities), generator)
}

fn app(flow: ItineraryFlow) -> axum::Router {
    let state = AppState {
        flow: Arc::new(flow),
        project_id: "compass-test".to_string(),
        plugins: vec![Plugin::VertexAi {
            project_id: "compass-test".to_string(),
            location: "us-central1".to_string(),
        }],
    };
    web::app(&ServerConfig::default(), state)
}

async fn post_flow(app: axum::Router, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::post("/api/itineraryFlow")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_flow_plans_top_three_places() {
    let generator = Arc::new(SelectiveGenerator::skipping(vec!["Barcelona"]));
    let output = flow(generator.clone())
        .run(&ItineraryFlowInput::new("beach vacation in Europe"))
        .await
        .unwrap();

    // four places stored, three retrieved, one not planned
    assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    let refs: Vec<_> = output.iter().map(|d| d.place_ref.as_str()).collect();
    assert_eq!(refs, vec!["p1", "p3"]);
    assert_eq!(output[0].itinerary_image_url, "https://img/nice.jpg");
    assert_eq!(output[1].itinerary_image_url, "https://img/split.jpg");
    assert_eq!(output[0].itinerary[0].activities[0].reference, "p1-a1");
}

#[tokio::test]
async fn test_flow_output_never_exceeds_retrieved_places() {
    for limit in 0..=4 {
        let generator = Arc::new(SelectiveGenerator::skipping(Vec::new()));
        let output = flow(generator)
            .with_retrieval_limit(limit)
            .run(&ItineraryFlowInput::new("islands"))
            .await
            .unwrap();
        assert_eq!(output.len(), limit);
    }
}

#[tokio::test]
async fn test_http_flow_envelope() {
    let generator = Arc::new(SelectiveGenerator::skipping(vec!["Barcelona"]));
    let body = json!({ "data": { "request": "beach vacation in Europe" } }).to_string();

    let (status, value) = post_flow(app(flow(generator)), body).await;

    assert_eq!(status, StatusCode::OK);
    let result = value["result"].as_array().unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result[0]["placeRef"], "p1");
    assert_eq!(result[0]["itineraryName"], "Best of Nice");
    assert!(!value.to_string().contains("embedding"));
}

#[tokio::test]
async fn test_http_rejects_malformed_input() {
    let generator = Arc::new(SelectiveGenerator::skipping(Vec::new()));
    let body = json!({ "data": { "imageUrls": ["https://img/a.jpg"] } }).to_string();

    let (status, value) = post_flow(app(flow(generator.clone())), body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"]["status"], "INVALID_ARGUMENT");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_http_reports_flow_failure() {
    let generator = Arc::new(SelectiveGenerator {
        skip: Vec::new(),
        fail: true,
        calls: AtomicUsize::new(0),
    });
    let body = json!({ "data": { "request": "beach" } }).to_string();

    let (status, value) = post_flow(app(flow(generator)), body).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(value["error"]["status"], "INTERNAL");
    assert!(value.get("result").is_none());
}

#[tokio::test]
async fn test_health_endpoint() {
    let generator = Arc::new(SelectiveGenerator::skipping(Vec::new()));
    let response = app(flow(generator))
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["status"], "ok");
    assert_eq!(value["projectId"], "compass-test");
    assert_eq!(value["plugins"], json!(["vertexai"]));
}
