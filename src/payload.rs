use serde::Serialize;
use serde_json::Value;
use tracing::{trace, warn};

const FENCE_WITH_TAG: &str = "```json";
const FENCE: &str = "```";

/// How the raw model text was turned into an array, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionOutcome {
    /// The bracket-bounded text parsed as-is.
    Parsed,
    /// Strict parse failed and the single closing-bracket repair succeeded.
    Repaired,
    /// The text parsed, but not as an array.
    NotArray,
    /// Neither the strict parse nor the repair produced JSON.
    Unparsable,
}

impl IngestionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestionOutcome::Parsed => "parsed",
            IngestionOutcome::Repaired => "repaired",
            IngestionOutcome::NotArray => "not_array",
            IngestionOutcome::Unparsable => "unparsable",
        }
    }

    pub fn is_extraction_failure(&self) -> bool {
        matches!(
            self,
            IngestionOutcome::NotArray | IngestionOutcome::Unparsable
        )
    }
}

#[derive(Debug, Clone)]
pub struct ExtractedPayload {
    pub items: Vec<Value>,
    pub outcome: IngestionOutcome,
}

impl ExtractedPayload {
    fn failed(outcome: IngestionOutcome) -> Self {
        Self {
            items: Vec::new(),
            outcome,
        }
    }
}

/// Locates and parses the JSON array inside a model response.
///
/// At most two parses happen: the bracket-bounded span, then that span's
/// opening through the end of the text with one `]` appended. Nothing else
/// is guessed.
///
/// The repair appends to everything after the first `[`, not to the bounded
/// span, so a response that lost only its closing bracket still parses when
/// its last `]` closes a nested list such as `types`.
pub fn extract_array(raw: &str) -> ExtractedPayload {
    let cleaned = strip_fences(raw);
    let tail = cleaned.find('[').map_or(cleaned.as_str(), |start| &cleaned[start..]);
    let bounded = tail.rfind(']').map_or(tail, |end| &tail[..=end]);

    let parsed = match serde_json::from_str::<Value>(bounded) {
        Ok(value) => Some((value, IngestionOutcome::Parsed)),
        Err(err) => {
            if !bounded.trim_start().starts_with('[') {
                trace!(?err, "model response contains no array");
                return ExtractedPayload::failed(IngestionOutcome::Unparsable);
            }
            warn!(?err, "strict parse of model response failed; attempting repair");
            repair_truncated(tail).map(|value| (value, IngestionOutcome::Repaired))
        }
    };

    match parsed {
        Some((Value::Array(items), outcome)) => ExtractedPayload { items, outcome },
        Some(_) => ExtractedPayload::failed(IngestionOutcome::NotArray),
        None => ExtractedPayload::failed(IngestionOutcome::Unparsable),
    }
}

/// A cut-off response loses its closing bracket, and the last `]` left in the
/// text may belong to a nested array inside the final record, so the repair
/// works on the unbounded tail.
fn repair_truncated(tail: &str) -> Option<Value> {
    let candidate = format!("{}]", tail.trim_end());
    match serde_json::from_str::<Value>(&candidate) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(?err, "repair of truncated model response failed");
            None
        }
    }
}

fn strip_fences(raw: &str) -> String {
    raw.replace(FENCE_WITH_TAG, "")
        .replace(FENCE, "")
        .trim()
        .to_string()
}
