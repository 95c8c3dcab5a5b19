use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tempfile::tempdir;

use market_scout::{
    analyze, geo_points, normalize, AppConfig, AppResult, AppState, BusinessSource,
    CrossReference, DensityTier, GeoPoint, IngestionOutcome, SearchQuery, SourceResponse,
};

struct CannedSource {
    responses: Mutex<Vec<SourceResponse>>,
}

#[async_trait]
impl BusinessSource for CannedSource {
    async fn fetch(&self, _query: &SearchQuery) -> AppResult<SourceResponse> {
        Ok(self.responses.lock().pop().unwrap_or_default())
    }
}

fn listing(names: &[&str], base_lat: f64) -> serde_json::Value {
    let items: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            json!({
                "name": name,
                "address": format!("{idx} Nguyen Hue"),
                "lat": base_lat + idx as f64 * 0.01,
                "lng": 106.70 + idx as f64 * 0.01,
                "rating": 4.0,
                "reviewCount": 10 * idx,
                "types": ["cafe"],
                "serviceOptions": { "dineIn": true, "delivery": false, "takeout": true }
            })
        })
        .collect();
    json!(items)
}

#[tokio::test]
async fn search_then_density_roundtrip() {
    let dir = tempdir().unwrap();
    let state = AppState::with_config(dir.path(), AppConfig::default()).unwrap();

    let first_page = format!(
        "Sure! Here is the list:\n```json\n{}\n```",
        listing(&["Cafe A", "Cafe B", "Cafe C"], 10.77)
    );
    let source = Arc::new(CannedSource {
        responses: Mutex::new(vec![SourceResponse {
            text: first_page,
            cross_refs: vec![CrossReference::new(
                "Cafe B - Coffee shop",
                "https://maps.google.com/?cid=2",
            )],
        }]),
    });
    let service = state.search_service(source);

    let report = service.search("coffee", "District 1").await.unwrap();
    assert_eq!(report.outcome, IngestionOutcome::Parsed);
    assert_eq!(report.businesses.len(), 3);
    assert_eq!(
        report.businesses[1].google_maps_uri,
        "https://maps.google.com/?cid=2"
    );
    assert!(report.businesses[0]
        .google_maps_uri
        .contains("Cafe%20A%200%20Nguyen%20Hue"));

    let map = state.analyze_density(&report.businesses, None).unwrap();
    assert_eq!(map.grid_size, 8);
    let total: usize = map.cells.iter().map(|cell| cell.count).sum();
    assert_eq!(total, 3);
    state.shutdown();

    let buffer = std::fs::read_to_string(state.telemetry().buffer_path()).unwrap();
    assert!(buffer.contains("ingestion_completed"));
}

#[test]
fn truncated_fenced_payloads_keep_complete_records() {
    for count in 1..6 {
        let names: Vec<String> = (0..count).map(|i| format!("Shop {i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let full = listing(&refs, 21.02).to_string();
        let truncated = full.strip_suffix(']').unwrap();
        let raw = format!("```json\n{truncated}\n```");

        let businesses = normalize(&raw, "retail", "Hoan Kiem", &[]);
        let got: Vec<_> = businesses.iter().map(|b| b.name.clone()).collect();
        assert_eq!(got, names);
    }
}

#[test]
fn well_formed_arrays_map_one_to_one_with_unique_ids() {
    for count in [0_usize, 1, 7, 40] {
        let names: Vec<String> = (0..count).map(|i| format!("Gym {i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let raw = listing(&refs, 10.8).to_string();

        let businesses = normalize(&raw, "fitness", "Thu Duc", &[]);
        assert_eq!(businesses.len(), count);
        let ids: HashSet<_> = businesses.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids.len(), count);
        assert!(businesses.iter().all(|b| !b.id.is_empty() && !b.name.is_empty()));
    }
}

#[test]
fn non_array_inputs_never_produce_records() {
    for raw in [
        "no data available",
        "{\"name\":\"Cafe A\"}",
        "\"just a string\"",
        "3.14",
        "null",
        "I could not find any businesses matching that query.",
    ] {
        assert!(normalize(raw, "coffee", "D1", &[]).is_empty(), "input: {raw}");
    }
}

#[test]
fn density_from_normalized_records() {
    let raw = json!([
        { "name": "A", "lat": 10.0, "lng": 106.0 },
        { "name": "B", "lat": 10.0, "lng": 106.0 },
        { "name": "C", "lat": 10.1, "lng": 106.1 },
        { "name": "No coords" },
        { "name": "Null island", "lat": 0, "lng": 0 }
    ])
    .to_string();
    let businesses = normalize(&raw, "coffee", "D1", &[]);
    assert_eq!(businesses.len(), 5);

    let points = geo_points(&businesses);
    assert_eq!(points.len(), 3);

    let cells = analyze(&points, 2);
    assert_eq!(cells.len(), 2);
    let tiers: HashSet<_> = cells.iter().map(|cell| (cell.count, cell.tier)).collect();
    assert!(tiers.contains(&(2, DensityTier::Saturated)));
    assert!(tiers.contains(&(1, DensityTier::Moderate)));
}

#[test]
fn single_cell_grid_collects_everything() {
    let points: Vec<GeoPoint> = (0..25)
        .map(|i| GeoPoint::new(10.7 + (i % 5) as f64 * 0.013, 106.6 + (i / 5) as f64 * 0.021))
        .collect();
    let cells = analyze(&points, 1);
    assert_eq!(cells.len(), 1);
    assert_eq!(cells[0].count, 25);
    assert_eq!(cells[0].intensity, 1.0);
}
