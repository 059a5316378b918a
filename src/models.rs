// src/models.rs
use crate::cost::CostBreakdown;
use crate::errors::{IngestionError, LensError};
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Image bytes carried as base64 text alongside their mime type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImage {
    mime_type: String,
    data: String,
}

impl EncodedImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, general_purpose::STANDARD.encode(bytes))
    }

    /// Parses `data:<mime>;base64,<payload>`.
    pub fn from_data_url(url: &str) -> Result<Self, IngestionError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| IngestionError::Unreadable("not a data URL".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| IngestionError::Unreadable("data URL has no payload".to_string()))?;
        let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
            IngestionError::Unreadable("only base64 data URLs are supported".to_string())
        })?;

        if !mime_type.starts_with("image/") {
            return Err(IngestionError::Unreadable(format!(
                "data URL is not an image ({})",
                mime_type
            )));
        }

        let image = Self::new(mime_type, payload.trim());
        image.decode().map_err(|e| IngestionError::Unreadable(e.to_string()))?;
        Ok(image)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn decode(&self) -> Result<Vec<u8>, LensError> {
        general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| LensError::Serialization(format!("Invalid base64 image data: {}", e)))
    }

    #[cfg(test)]
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub dish_name: String,
    pub critique: String,
    pub improvement_strategy: String,
    /// Always English; consumed by the image model.
    pub generation_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literary_text: Option<String>,
}

impl AnalysisResult {
    /// Strict parse of the model's structured reply. Every required field must
    /// be present and non-blank; `literaryText` must be present when it was
    /// asked for and is dropped when it was not.
    pub fn parse(raw: &str, want_literary_text: bool) -> Result<Self, LensError> {
        let body = strip_code_fence(raw.trim());
        if body.is_empty() {
            return Err(LensError::AnalysisParse("empty response".to_string()));
        }

        let mut result: AnalysisResult = serde_json::from_str(body)
            .map_err(|e| LensError::AnalysisParse(format!("malformed analysis JSON: {}", e)))?;

        let required = [
            ("dishName", &result.dish_name),
            ("critique", &result.critique),
            ("improvementStrategy", &result.improvement_strategy),
            ("generationPrompt", &result.generation_prompt),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(LensError::AnalysisParse(format!("field `{}` is empty", field)));
            }
        }

        if want_literary_text {
            match result.literary_text.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => {}
                _ => {
                    return Err(LensError::AnalysisParse(
                        "field `literaryText` was requested but not returned".to_string(),
                    ));
                }
            }
        } else {
            result.literary_text = None;
        }

        Ok(result)
    }
}

fn strip_code_fence(body: &str) -> &str {
    let Some(inner) = body.strip_prefix("```") else {
        return body;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// A completed run as persisted in history. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub original_image: EncodedImage,
    pub enhanced_image: EncodedImage,
    pub analysis: AnalysisResult,
    pub cost: CostBreakdown,
}

impl HistoryItem {
    pub fn new(
        original_image: EncodedImage,
        enhanced_image: EncodedImage,
        analysis: AnalysisResult,
        cost: CostBreakdown,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            original_image,
            enhanced_image,
            analysis,
            cost,
        }
    }
}
