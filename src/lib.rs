mod business;
mod config;
mod density;
mod errors;
mod export;
mod grounding;
mod ingestion;
mod payload;
mod search;
mod stats;
mod telemetry;

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::json;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use business::{
    geo_points, Business, BusinessStatus, CrossReference, GeoPoint, Review, ServiceOptions,
};
pub use config::{AppConfig, PublicAppConfig, ResultLanguage};
pub use density::{
    analyze, analyze_map, BoundingBox, DensityCell, DensityMap, DensityTier, DEFAULT_GRID_SIZE,
};
pub use errors::{AppError, AppResult};
pub use export::export_csv;
pub use grounding::{cross_refs_from_value, find_cross_reference, resolve_maps_uri, search_uri};
pub use ingestion::{normalize, normalize_detailed, normalize_item, IngestionReport, QueryContext};
pub use payload::{extract_array, ExtractedPayload, IngestionOutcome};
pub use search::{
    merge_pages, AreaSweepSummary, BusinessSource, SearchProgress, SearchQuery, SearchService,
    SearchState, SourceResponse,
};
pub use stats::{sort_businesses, MarketStats, SortOption, StatsFilter};
pub use telemetry::{TelemetryClient, TelemetryEvent};

/// Configuration and telemetry shared by every entry point.
pub struct AppState {
    config: AppConfig,
    telemetry: TelemetryClient,
}

impl AppState {
    pub fn initialize<P: AsRef<Path>>(data_dir: P) -> AppResult<Self> {
        init_tracing();
        let config = AppConfig::from_env();
        Self::with_config(data_dir, config)
    }

    pub fn with_config<P: AsRef<Path>>(data_dir: P, config: AppConfig) -> AppResult<Self> {
        let telemetry = TelemetryClient::new(data_dir, &config)?;
        if let Err(err) = telemetry.record(
            "app_start",
            json!({
                "version": env!("CARGO_PKG_VERSION"),
                "config": config.public_profile(),
            }),
        ) {
            warn!(?err, "failed to queue telemetry bootstrap event");
        }
        Ok(Self { config, telemetry })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &TelemetryClient {
        &self.telemetry
    }

    pub fn ingest(
        &self,
        raw_text: &str,
        industry: &str,
        location: &str,
        cross_refs: &[CrossReference],
    ) -> IngestionReport {
        let report = normalize_detailed(raw_text, industry, location, cross_refs);
        if let Err(err) = self.telemetry.record_ingestion(industry, location, &report) {
            warn!(?err, "failed to record ingestion telemetry");
        }
        report
    }

    /// Filters to valid points and bins them at `grid_size`, or at the
    /// configured size when none is given.
    pub fn analyze_density(
        &self,
        businesses: &[Business],
        grid_size: Option<usize>,
    ) -> Option<DensityMap> {
        let grid_size = grid_size.unwrap_or(self.config.density_grid_size);
        let points = geo_points(businesses);
        let map = analyze_map(&points, grid_size);
        if let Err(err) = self
            .telemetry
            .record_density(points.len(), grid_size, map.as_ref())
        {
            warn!(?err, "failed to record density telemetry");
        }
        map
    }

    pub fn search_service(&self, source: Arc<dyn BusinessSource>) -> SearchService {
        SearchService::new(source, &self.config).with_telemetry(self.telemetry.clone())
    }

    pub fn shutdown(&self) {
        if let Err(err) = self.telemetry.flush() {
            warn!(?err, "failed to flush telemetry queue");
        }
    }
}

pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,market_scout=debug"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    });
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn state_ingests_and_analyzes() {
        let dir = tempdir().unwrap();
        let state = AppState::with_config(dir.path(), AppConfig::default()).unwrap();
        let raw = r#"[
            {"name":"A","lat":10.0,"lng":106.0},
            {"name":"B","lat":10.0,"lng":106.0},
            {"name":"C","lat":10.1,"lng":106.1},
            {"name":"D"}
        ]"#;
        let report = state.ingest(raw, "coffee", "D1", &[]);
        assert_eq!(report.businesses.len(), 4);

        let map = state.analyze_density(&report.businesses, Some(2)).unwrap();
        assert_eq!(map.cells.len(), 2);
        assert_eq!(map.max_count, 2);
        state.shutdown();

        let buffer = std::fs::read_to_string(state.telemetry().buffer_path()).unwrap();
        assert!(buffer.contains("app_start"));
        assert!(buffer.contains("density_analyzed"));
    }
}
