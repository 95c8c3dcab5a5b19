use std::io::Write;

use crate::business::Business;
use crate::errors::AppResult;

const HEADER: [&str; 11] = [
    "name",
    "address",
    "phone",
    "website",
    "rating",
    "review_count",
    "business_status",
    "types",
    "lat",
    "lng",
    "google_maps_uri",
];

pub fn export_csv<W: Write>(writer: W, businesses: &[Business]) -> AppResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;
    for business in businesses {
        let rating = business.rating.to_string();
        let review_count = business.review_count.to_string();
        let types = business.types.join("; ");
        let lat = optional_coordinate(business.lat);
        let lng = optional_coordinate(business.lng);
        csv.write_record([
            business.name.as_str(),
            business.address.as_str(),
            business.phone.as_deref().unwrap_or_default(),
            business.website.as_deref().unwrap_or_default(),
            rating.as_str(),
            review_count.as_str(),
            business.business_status.as_str(),
            types.as_str(),
            lat.as_str(),
            lng.as_str(),
            business.google_maps_uri.as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

fn optional_coordinate(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
