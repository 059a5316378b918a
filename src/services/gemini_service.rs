// src/services/gemini_service.rs
use crate::config::GeminiSettings;
use crate::cost::{TokenUsage, generation_cost};
use crate::errors::LensError;
use crate::models::*;
use crate::pipeline::{AnalysisOutcome, Analyzer, GenerationOutcome, Generator};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use log::{error, info};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Instant;

/// Client for the hosted critique and image models. One request per call,
/// no retries.
pub struct GeminiService {
    settings: GeminiSettings,
    client: Client,
}

enum CallError {
    Transport(String),
    Decode(String),
}

impl GeminiService {
    pub fn new(settings: GeminiSettings) -> Self {
        Self {
            settings,
            client: Client::new(),
        }
    }

    /// Confirms the credential can see the analysis model before any run is
    /// attempted.
    pub async fn verify_key(&self) -> Result<(), LensError> {
        let url = format!(
            "{}/{}",
            self.settings.api_base,
            model_path(&self.settings.analysis_model)
        );

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .send()
            .await
            .map_err(|e| LensError::Config(format!("API key check failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(LensError::Config(format!(
                "API key was not accepted for {} (HTTP {})",
                self.settings.analysis_model,
                response.status()
            )));
        }

        Ok(())
    }

    async fn generate_content(
        &self,
        model: &str,
        body: &Value,
    ) -> Result<GenerateContentResponse, CallError> {
        let url = format!(
            "{}/{}:generateContent",
            self.settings.api_base,
            model_path(model)
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| CallError::Transport(format!("{} request failed: {}", model, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CallError::Transport(format!(
                "{} returned HTTP {}: {}",
                model, status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CallError::Decode(format!("Failed to parse {} response: {}", model, e)))
    }

    fn analysis_prompt(&self, want_literary_text: bool) -> String {
        let language = &self.settings.ui_language;
        let mut prompt = format!(
            r#"
You are a world-class food photographer and retoucher. Study this food photograph.

1. Identify the dish.
2. Critique the photo as taken: lighting, camera angle, lens distortion and texture.
   Pay particular attention to the perspective distortion typical of overhead phone shots.
3. Lay out a strategy that would make this look like a shot from a high-end food
   magazine: shallower depth of field, appetising texture, professional lighting.
4. Write a precise English prompt for an image generation model that "re-shoots"
   the dish according to that strategy.
"#
        );

        if want_literary_text {
            prompt.push_str(&format!(
                r#"5. Write one short evocative line about the dish in {language}, at most
   20 characters. Warm and personal, about a moment of everyday life rather than
   the food itself. No advertising slogans or clichés.
"#
            ));
        }

        prompt.push_str(&format!(
            r#"
Return strictly JSON. dishName, critique and improvementStrategy{literary} must be
written in {language}. generationPrompt must be written in English.
"#,
            literary = if want_literary_text { " and literaryText" } else { "" },
        ));

        prompt
    }

    fn generation_prompt(analysis: &AnalysisResult) -> String {
        format!(
            r#"
Using the provided image as a strong reference for the food's identity and ingredients:
{}
Ensure the result is photorealistic, high resolution and highly detailed, with perfect appetizing texture.
Fix any perspective distortion from overhead shots.
"#,
            analysis.generation_prompt
        )
    }
}

#[async_trait]
impl Analyzer for GeminiService {
    async fn analyze(
        &self,
        image: &EncodedImage,
        want_literary_text: bool,
    ) -> Result<AnalysisOutcome, LensError> {
        let start = Instant::now();
        let model = &self.settings.analysis_model;

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": image.mime_type(),
                            "data": image.data()
                        }
                    },
                    { "text": self.analysis_prompt(want_literary_text) }
                ]
            }],
            "generationConfig": {
                "thinkingConfig": { "thinkingBudget": self.settings.thinking_budget },
                "responseMimeType": "application/json",
                "responseSchema": analysis_schema(want_literary_text)
            }
        });

        let response = self
            .generate_content(model, &body)
            .await
            .map_err(|e| match e {
                CallError::Transport(msg) => LensError::Analysis(msg),
                CallError::Decode(msg) => LensError::AnalysisParse(msg),
            })
            .inspect_err(|e| error!("Analysis failed: {}", e))?;

        let tokens = response.token_usage();
        let text = response.answer_text();
        let result = AnalysisResult::parse(&text, want_literary_text)
            .inspect_err(|e| error!("Analysis failed: {}", e))?;

        info!(
            "Analyzed \"{}\" with {} in {}ms ({} prompt / {} response tokens)",
            result.dish_name,
            model,
            start.elapsed().as_millis(),
            tokens.prompt_tokens,
            tokens.response_tokens
        );

        Ok(AnalysisOutcome {
            result,
            cost: tokens.cost(),
            tokens,
        })
    }
}

#[async_trait]
impl Generator for GeminiService {
    async fn generate(
        &self,
        image: &EncodedImage,
        analysis: &AnalysisResult,
    ) -> Result<GenerationOutcome, LensError> {
        let start = Instant::now();
        let model = &self.settings.image_model;

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": Self::generation_prompt(analysis) },
                    {
                        "inlineData": {
                            "mimeType": image.mime_type(),
                            "data": image.data()
                        }
                    }
                ]
            }],
            "generationConfig": {
                "imageConfig": {
                    "imageSize": self.settings.image_size,
                    "aspectRatio": self.settings.aspect_ratio
                }
            }
        });

        let response = self
            .generate_content(model, &body)
            .await
            .map_err(|e| match e {
                CallError::Transport(msg) | CallError::Decode(msg) => LensError::Generation(msg),
            })
            .inspect_err(|e| error!("Generation failed: {}", e))?;

        let data = response
            .first_inline_image()
            .ok_or_else(|| LensError::Generation("no image produced".to_string()))
            .inspect_err(|e| error!("Generation failed: {}", e))?;

        general_purpose::STANDARD
            .decode(data)
            .map_err(|e| LensError::Generation(format!("Failed to decode image: {}", e)))?;

        info!(
            "Generated enhanced image with {} in {}ms",
            model,
            start.elapsed().as_millis()
        );

        // The image model's own encoding is not trusted; results are labelled PNG.
        Ok(GenerationOutcome {
            image: EncodedImage::new("image/png", data),
            cost: generation_cost(),
        })
    }
}

fn model_path(model: &str) -> String {
    let trimmed = model.trim();
    if trimmed.starts_with("models/") {
        trimmed.to_string()
    } else {
        format!("models/{}", trimmed)
    }
}

fn analysis_schema(want_literary_text: bool) -> Value {
    let mut properties = json!({
        "dishName": { "type": "STRING", "description": "Name of the dish" },
        "critique": {
            "type": "STRING",
            "description": "Critique of the current lighting, angle and composition"
        },
        "improvementStrategy": {
            "type": "STRING",
            "description": "Plan for fixing distortion and improving the look"
        },
        "generationPrompt": {
            "type": "STRING",
            "description": "Precise English prompt for re-rendering the scene"
        }
    });
    let mut required = vec!["dishName", "critique", "improvementStrategy", "generationPrompt"];

    if want_literary_text {
        properties["literaryText"] = json!({
            "type": "STRING",
            "description": "One short, evocative line about the dish"
        });
        required.push("literaryText");
    }

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "inline_data")]
    inline_data: Option<InlineData>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.iter())
            .into_iter()
            .flatten()
    }

    fn answer_text(&self) -> String {
        self.parts()
            .filter(|part| !part.thought)
            .filter_map(|part| part.text.as_deref())
            .collect()
    }

    fn first_inline_image(&self) -> Option<&str> {
        self.parts()
            .filter_map(|part| part.inline_data.as_ref())
            .map(|inline| inline.data.as_str())
            .find(|data| !data.is_empty())
    }

    fn token_usage(&self) -> TokenUsage {
        match &self.usage_metadata {
            Some(usage) => {
                TokenUsage::from_counts(usage.prompt_token_count, usage.candidates_token_count)
            }
            None => TokenUsage::default(),
        }
    }
}
