//! Recorded extraction chunks: table metadata plus the raw LLM response.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::normalize::parse_year;
use gradkg_core::{Error, MajorType, Result};

/// Where a chunk came from. Unknown keys are kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub department: String,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
    /// Major track label, e.g. `단일전공`.
    #[serde(default)]
    pub track: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn lenient_year<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<i32>, D::Error> {
    let raw = Option::<Value>::deserialize(d)?;
    Ok(parse_year(raw.as_ref()))
}

impl ChunkMetadata {
    pub fn major_type(&self) -> Option<MajorType> {
        self.track.as_deref().and_then(|t| t.parse().ok())
    }
}

/// One table chunk and the model's answer for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedChunk {
    #[serde(default)]
    pub metadata: ChunkMetadata,
    /// JSON object, or the raw response text when the model's output was
    /// stored verbatim.
    #[serde(default)]
    pub response: Value,
}

impl RecordedChunk {
    pub fn new(metadata: ChunkMetadata, response: Value) -> Self {
        Self { metadata, response }
    }

    /// Decode the response into the shape a merger expects.
    pub fn parse_response<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.response {
            Value::String(text) => {
                let body = strip_code_fence(text);
                serde_json::from_str(body)
                    .map_err(|e| Error::Extraction(format!("invalid response JSON: {}", e)))
            }
            Value::Null => Err(Error::Extraction("empty response".into())),
            other => T::deserialize(other)
                .map_err(|e| Error::Extraction(format!("unexpected response shape: {}", e))),
        }
    }
}

/// Models sometimes wrap JSON in a markdown fence despite JSON mode.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Read a chunk file: a JSON array of recorded chunks.
pub fn load_chunks(path: &Path) -> Result<Vec<RecordedChunk>> {
    let raw = std::fs::read_to_string(path)?;
    let chunks: Vec<RecordedChunk> = serde_json::from_str(&raw)?;
    Ok(chunks)
}
