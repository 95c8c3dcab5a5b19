use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::business::{Business, CrossReference};
use crate::config::{AppConfig, ResultLanguage};
use crate::errors::{AppError, AppResult};
use crate::ingestion::{normalize_detailed, IngestionReport};
use crate::telemetry::TelemetryClient;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    pub industry: String,
    pub location: String,
    pub language: ResultLanguage,
    pub page_size: usize,
    pub exclude_names: Vec<String>,
}

/// Raw model text plus the grounding hints that came with it.
#[derive(Debug, Clone, Default)]
pub struct SourceResponse {
    pub text: String,
    pub cross_refs: Vec<CrossReference>,
}

/// Whatever produces listing text for a query, typically a generative model
/// behind a network call.
#[async_trait]
pub trait BusinessSource: Send + Sync {
    async fn fetch(&self, query: &SearchQuery) -> AppResult<SourceResponse>;
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchProgress {
    pub current: usize,
    pub total: usize,
    pub current_area: String,
}

/// Distinguishes a finished search with no rows from one still running.
#[derive(Debug, Clone, Default)]
pub enum SearchState {
    #[default]
    Idle,
    InFlight {
        progress: Option<SearchProgress>,
    },
    Completed {
        businesses: Vec<Business>,
        extraction_failed: bool,
    },
    Failed {
        message: String,
    },
}

impl SearchState {
    pub fn from_report(report: IngestionReport) -> Self {
        SearchState::Completed {
            extraction_failed: report.is_extraction_failure(),
            businesses: report.businesses,
        }
    }

    pub fn is_empty_result(&self) -> bool {
        matches!(self, SearchState::Completed { businesses, .. } if businesses.is_empty())
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, SearchState::InFlight { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaSweepSummary {
    pub businesses: Vec<Business>,
    pub areas_searched: usize,
    pub areas_failed: usize,
    pub cancelled: bool,
}

pub struct SearchService {
    source: Arc<dyn BusinessSource>,
    telemetry: Option<TelemetryClient>,
    language: ResultLanguage,
    page_size: usize,
}

impl SearchService {
    pub fn new(source: Arc<dyn BusinessSource>, config: &AppConfig) -> Self {
        Self {
            source,
            telemetry: None,
            language: config.search_language,
            page_size: config.search_page_size.max(1),
        }
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryClient) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn query(
        &self,
        industry: &str,
        location: &str,
        exclude_names: Vec<String>,
    ) -> SearchQuery {
        SearchQuery {
            industry: industry.trim().to_string(),
            location: location.trim().to_string(),
            language: self.language,
            page_size: self.page_size,
            exclude_names,
        }
    }

    /// Fetches and normalizes one page.
    pub async fn search(&self, industry: &str, location: &str) -> AppResult<IngestionReport> {
        let query = self.query(industry, location, Vec::new());
        self.fetch_page(&query).await
    }

    /// Like [`SearchService::search`], but a flag raised before or during
    /// the fetch discards the response before it is normalized.
    pub async fn search_with_cancel(
        &self,
        industry: &str,
        location: &str,
        cancel_flag: &AtomicBool,
    ) -> AppResult<IngestionReport> {
        if cancel_flag.load(Ordering::SeqCst) {
            return Err(AppError::Cancelled);
        }
        let query = self.query(industry, location, Vec::new());
        let response = self.source.fetch(&query).await?;
        if cancel_flag.load(Ordering::SeqCst) {
            return Err(AppError::Cancelled);
        }
        Ok(self.ingest(&query, response))
    }

    /// Requests another page excluding every name already held and merges it
    /// into `existing`.
    pub async fn load_more(
        &self,
        industry: &str,
        location: &str,
        existing: &[Business],
    ) -> AppResult<Vec<Business>> {
        let exclude_names = existing.iter().map(|b| b.name.clone()).collect();
        let query = self.query(industry, location, exclude_names);
        let report = self.fetch_page(&query).await?;
        let merged = merge_pages(existing, report.businesses);
        self.emit(
            "search_page",
            json!({
                "location": query.location,
                "merged_total": merged.len(),
                "previous_total": existing.len(),
            }),
        );
        Ok(merged)
    }

    /// Searches each area in turn, checking the cancel flag before every
    /// fetch. Failed areas are logged and skipped.
    pub async fn search_areas(
        &self,
        industry: &str,
        areas: &[String],
        observer: Option<Arc<dyn Fn(SearchProgress) + Send + Sync>>,
        cancel_flag: Option<Arc<AtomicBool>>,
    ) -> AppResult<AreaSweepSummary> {
        let mut summary = AreaSweepSummary {
            businesses: Vec::new(),
            areas_searched: 0,
            areas_failed: 0,
            cancelled: false,
        };

        for (index, area) in areas.iter().enumerate() {
            if let Some(flag) = &cancel_flag {
                if flag.load(Ordering::SeqCst) {
                    summary.cancelled = true;
                    break;
                }
            }
            if let Some(callback) = &observer {
                callback(SearchProgress {
                    current: index + 1,
                    total: areas.len(),
                    current_area: area.clone(),
                });
            }

            let exclude_names = summary.businesses.iter().map(|b| b.name.clone()).collect();
            let query = self.query(industry, area, exclude_names);
            match self.fetch_page(&query).await {
                Ok(report) => {
                    summary.businesses = merge_pages(&summary.businesses, report.businesses);
                    summary.areas_searched += 1;
                }
                Err(err) => {
                    warn!(?err, area = %area, "area search failed; continuing");
                    summary.areas_failed += 1;
                }
            }
        }

        info!(
            areas = areas.len(),
            searched = summary.areas_searched,
            failed = summary.areas_failed,
            total = summary.businesses.len(),
            "area sweep finished"
        );
        Ok(summary)
    }

    async fn fetch_page(&self, query: &SearchQuery) -> AppResult<IngestionReport> {
        let response = self.source.fetch(query).await?;
        Ok(self.ingest(query, response))
    }

    fn ingest(&self, query: &SearchQuery, response: SourceResponse) -> IngestionReport {
        let report = normalize_detailed(
            &response.text,
            &query.industry,
            &query.location,
            &response.cross_refs,
        );
        if let Some(telemetry) = &self.telemetry {
            if let Err(err) = telemetry.record_ingestion(&query.industry, &query.location, &report)
            {
                warn!(?err, "failed to record ingestion telemetry");
            }
        }
        report
    }

    fn emit(&self, name: &str, payload: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            if let Err(err) = telemetry.record(name, payload) {
                warn!(?err, event = name, "failed to record telemetry event");
            }
        }
    }
}

/// Appends `incoming` to `existing`, dropping records whose name and address
/// already appear, case-insensitively. Existing order is preserved.
pub fn merge_pages(existing: &[Business], incoming: Vec<Business>) -> Vec<Business> {
    let mut seen: HashSet<String> = existing.iter().map(Business::merge_key).collect();
    let mut merged = existing.to_vec();
    for business in incoming {
        if seen.insert(business.merge_key()) {
            merged.push(business);
        }
    }
    merged
}
