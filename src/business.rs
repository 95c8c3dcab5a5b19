use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessStatus {
    Operational,
    ClosedTemporarily,
    ClosedPermanently,
    Unknown,
}

impl BusinessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessStatus::Operational => "OPERATIONAL",
            BusinessStatus::ClosedTemporarily => "CLOSED_TEMPORARILY",
            BusinessStatus::ClosedPermanently => "CLOSED_PERMANENTLY",
            BusinessStatus::Unknown => "UNKNOWN",
        }
    }

    /// Maps a source status string onto the fixed enumeration.
    ///
    /// The canonical names are accepted as-is so an already normalized record
    /// keeps its status. A bare `"CLOSED"` is a temporary closure; anything
    /// else the source invents counts as operational.
    pub fn from_source(value: Option<&str>) -> Self {
        match value {
            Some("CLOSED") | Some("CLOSED_TEMPORARILY") => BusinessStatus::ClosedTemporarily,
            Some("CLOSED_PERMANENTLY") => BusinessStatus::ClosedPermanently,
            Some("UNKNOWN") => BusinessStatus::Unknown,
            _ => BusinessStatus::Operational,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOptions {
    pub dine_in: bool,
    pub delivery: bool,
    pub takeout: bool,
    pub curbside_pickup: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub author: String,
    pub rating: f64,
    pub text: String,
    #[serde(rename = "publishTime", skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
}

/// A `{title, uri}` hint returned alongside the model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    pub title: String,
    pub uri: String,
}

impl CrossReference {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    pub name: String,
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub rating: f64,
    pub review_count: u64,
    pub business_status: BusinessStatus,
    pub business_type: String,
    pub types: Vec<String>,
    pub service_options: ServiceOptions,
    pub opening_hours: Vec<String>,
    pub photos: Vec<String>,
    pub reviews: Vec<Review>,
    pub google_maps_uri: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub international_phone: Option<String>,
    pub owner_name: Option<String>,
    pub price_level: Option<String>,
    pub description: Option<String>,
}

impl Business {
    /// Returns the record's position when it is usable for spatial work.
    ///
    /// Missing, non-finite, or zero coordinates on either axis mark the
    /// record as geometrically invalid; it stays listable but is never
    /// plotted or binned.
    pub fn coordinates(&self) -> Option<GeoPoint> {
        let lat = self.lat.filter(|v| v.is_finite() && *v != 0.0)?;
        let lng = self.lng.filter(|v| v.is_finite() && *v != 0.0)?;
        Some(GeoPoint::new(lat, lng))
    }

    /// Case-insensitive identity used when merging result pages.
    pub fn merge_key(&self) -> String {
        format!(
            "{}|{}",
            self.name.trim().to_lowercase(),
            self.address.trim().to_lowercase()
        )
    }
}

/// Filters a record set down to its geometrically valid points, once, for
/// every spatial consumer.
pub fn geo_points(businesses: &[Business]) -> Vec<GeoPoint> {
    businesses.iter().filter_map(Business::coordinates).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn business(lat: Option<f64>, lng: Option<f64>) -> Business {
        Business {
            id: "biz-1".into(),
            google_id: None,
            name: "Cafe".into(),
            address: "D1".into(),
            lat,
            lng,
            rating: 0.0,
            review_count: 0,
            business_status: BusinessStatus::Operational,
            business_type: "coffee".into(),
            types: vec!["coffee".into()],
            service_options: ServiceOptions::default(),
            opening_hours: Vec::new(),
            photos: Vec::new(),
            reviews: Vec::new(),
            google_maps_uri: String::new(),
            website: None,
            phone: None,
            international_phone: None,
            owner_name: None,
            price_level: None,
            description: None,
        }
    }

    #[test]
    fn filters_geometrically_invalid_records() {
        let records = vec![
            business(Some(10.7), Some(106.7)),
            business(None, Some(106.7)),
            business(Some(f64::NAN), Some(106.7)),
            business(Some(0.0), Some(0.0)),
            business(Some(10.7), Some(0.0)),
        ];
        let points = geo_points(&records);
        assert_eq!(points, vec![GeoPoint::new(10.7, 106.7)]);
    }

    #[test]
    fn maps_source_status_strings() {
        assert_eq!(
            BusinessStatus::from_source(Some("CLOSED")),
            BusinessStatus::ClosedTemporarily
        );
        assert_eq!(
            BusinessStatus::from_source(Some("closed")),
            BusinessStatus::Operational
        );
        assert_eq!(
            BusinessStatus::from_source(Some("CLOSED_PERMANENTLY")),
            BusinessStatus::ClosedPermanently
        );
        assert_eq!(BusinessStatus::from_source(None), BusinessStatus::Operational);
    }

    #[test]
    fn serializes_status_in_screaming_case() {
        let value = serde_json::to_value(BusinessStatus::ClosedTemporarily).unwrap();
        assert_eq!(value, serde_json::json!("CLOSED_TEMPORARILY"));
    }
}
