//! Recommendation loading and audience selection
//!
//! Batch segment job files map item ids to the users most likely to engage
//! with them. The file is read as a JSON array or as JSON Lines.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::BlobStore;

/// One record of a batch segment job file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecommendationRecord {
    #[serde(default)]
    pub input: RecommendationInput,
    #[serde(default)]
    pub output: RecommendationOutput,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecommendationInput {
    #[serde(rename = "itemId")]
    pub item_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecommendationOutput {
    #[serde(rename = "usersList", default)]
    pub users_list: Vec<String>,
}

impl RecommendationRecord {
    pub fn item_id(&self) -> Option<&str> {
        self.input.item_id.as_deref()
    }

    pub fn users(&self) -> &[String] {
        &self.output.users_list
    }
}

/// Users selected for the campaign's target item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudienceSegment {
    pub item_id: String,
    pub users: Vec<String>,
}

/// Parse a batch segment job file (JSON array or JSON Lines)
pub fn parse_records(data: &[u8]) -> Result<Vec<RecommendationRecord>, serde_json::Error> {
    match serde_json::from_slice::<Vec<RecommendationRecord>>(data) {
        Ok(records) => Ok(records),
        Err(array_err) => {
            let text = String::from_utf8_lossy(data);
            let trimmed = text.trim_start();
            // An array document keeps its own error; JSON Lines starts with an object
            if !trimmed.starts_with('{') {
                return Err(array_err);
            }
            let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
            lines
                .into_iter()
                .map(serde_json::from_str::<RecommendationRecord>)
                .collect()
        }
    }
}

/// Load recommendations from `bucket/key`.
///
/// A missing or unparsable file is logged and yields `None`.
pub async fn load_recommendations(
    store: &dyn BlobStore,
    bucket: &str,
    key: &str,
) -> Option<Vec<RecommendationRecord>> {
    let data = match store.get(bucket, key).await {
        Ok(data) => data,
        Err(e) => {
            warn!(bucket, key, error = %e, "Error fetching recommendations");
            return None;
        }
    };

    match parse_records(&data) {
        Ok(records) => {
            debug!("Loaded {} recommendation records", records.len());
            Some(records)
        }
        Err(e) => {
            warn!(bucket, key, error = %e, "Error parsing recommendations");
            None
        }
    }
}

/// First record whose item id equals `target_item_id`
pub fn select_audience(
    records: &[RecommendationRecord],
    target_item_id: &str,
) -> Option<AudienceSegment> {
    records
        .iter()
        .find(|r| r.item_id() == Some(target_item_id))
        .map(|r| AudienceSegment {
            item_id: target_item_id.to_string(),
            users: r.users().to_vec(),
        })
}
