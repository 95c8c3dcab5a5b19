use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::business::{Business, BusinessStatus, CrossReference, ServiceOptions};
use crate::grounding::{resolve_maps_uri, search_uri};
use crate::payload::{extract_array, IngestionOutcome};

const UNKNOWN_NAME: &str = "Unknown";

/// What a single query contributes when fields are missing from a record.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    pub industry: &'a str,
    pub location: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub businesses: Vec<Business>,
    pub outcome: IngestionOutcome,
    pub skipped_items: usize,
}

impl IngestionReport {
    /// True when the empty result means "nothing could be read" rather than
    /// "the source listed nothing".
    pub fn is_extraction_failure(&self) -> bool {
        self.outcome.is_extraction_failure()
    }
}

/// Turns raw model text into validated business records.
///
/// Never fails: an unreadable payload yields an empty sequence.
pub fn normalize(
    raw_text: &str,
    query_industry: &str,
    query_location: &str,
    cross_refs: &[CrossReference],
) -> Vec<Business> {
    normalize_detailed(raw_text, query_industry, query_location, cross_refs).businesses
}

pub fn normalize_detailed(
    raw_text: &str,
    query_industry: &str,
    query_location: &str,
    cross_refs: &[CrossReference],
) -> IngestionReport {
    let query = QueryContext {
        industry: query_industry,
        location: query_location,
    };
    let extracted = extract_array(raw_text);
    let total = extracted.items.len();

    let businesses: Vec<Business> = extracted
        .items
        .iter()
        .filter_map(Value::as_object)
        .map(|item| normalize_item(item, &query, cross_refs))
        .collect();

    let report = IngestionReport {
        skipped_items: total - businesses.len(),
        businesses,
        outcome: extracted.outcome,
    };
    debug!(
        outcome = report.outcome.as_str(),
        records = report.businesses.len(),
        skipped = report.skipped_items,
        "normalized model response"
    );
    report
}

/// Coerces one untyped record field by field; a bad field falls back to its
/// default and never discards the record.
pub fn normalize_item(
    item: &Map<String, Value>,
    query: &QueryContext<'_>,
    cross_refs: &[CrossReference],
) -> Business {
    let source_name = text_field(item, "name");
    let address = text_field(item, "address").unwrap_or_else(|| query.location.to_string());
    // Hints only ever match a name the source actually gave.
    let google_maps_uri = match &source_name {
        Some(name) => resolve_maps_uri(name, &address, cross_refs),
        None => search_uri(UNKNOWN_NAME, &address),
    };
    let name = source_name.unwrap_or_else(|| UNKNOWN_NAME.to_string());

    Business {
        id: generate_id(),
        google_id: text_field(item, "googleId"),
        lat: coordinate_field(item, "lat"),
        lng: coordinate_field(item, "lng"),
        rating: number_field(item, "rating").unwrap_or(0.0),
        review_count: count_field(item, "reviewCount"),
        business_status: BusinessStatus::from_source(
            item.get("businessStatus").and_then(Value::as_str),
        ),
        business_type: query.industry.to_string(),
        types: string_list(item, "types")
            .filter(|types| !types.is_empty())
            .unwrap_or_else(|| vec![query.industry.to_string()]),
        service_options: service_options(item.get("serviceOptions")),
        opening_hours: string_list(item, "openingHours").unwrap_or_default(),
        photos: string_list(item, "photos").unwrap_or_default(),
        reviews: Vec::new(),
        google_maps_uri,
        website: text_field(item, "website"),
        phone: text_field(item, "phone"),
        international_phone: text_field(item, "internationalPhone"),
        owner_name: text_field(item, "ownerName"),
        price_level: text_field(item, "priceLevel"),
        description: text_field(item, "description"),
        name,
        address,
    }
}

fn generate_id() -> String {
    format!("biz-{}", Uuid::new_v4().simple())
}

fn text_field(item: &Map<String, Value>, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Numbers pass through; numeric strings are parsed. Anything non-finite is
/// treated as absent.
fn number_field(item: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match item.get(key)? {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn coordinate_field(item: &Map<String, Value>, key: &str) -> Option<f64> {
    number_field(item, key).filter(|value| *value != 0.0)
}

fn count_field(item: &Map<String, Value>, key: &str) -> u64 {
    number_field(item, key)
        .filter(|value| *value > 0.0)
        .map(|value| value.trunc() as u64)
        .unwrap_or(0)
}

fn string_list(item: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let entries = item.get(key)?.as_array()?;
    Some(
        entries
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

fn service_options(value: Option<&Value>) -> ServiceOptions {
    let Some(flags) = value.and_then(Value::as_object) else {
        return ServiceOptions::default();
    };
    let flag = |key: &str| flags.get(key).and_then(Value::as_bool).unwrap_or(false);
    ServiceOptions {
        dine_in: flag("dineIn"),
        delivery: flag("delivery"),
        takeout: flag("takeout"),
        curbside_pickup: flag("curbsidePickup"),
    }
}
