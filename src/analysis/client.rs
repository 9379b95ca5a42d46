//! Gemini analysis client
//!
//! Request/response calls against the `generateContent` API: structured
//! document analysis, readback synthesis, and citation verification. The
//! client is constructed once from configuration and shared by reference;
//! there is no global state.

use super::document::DocumentFile;
use crate::config::GeminiConfig;
use crate::error::AnalysisError;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const ANALYSIS_SYSTEM_INSTRUCTION: &str = "\
You are JurisCore, an advanced legal AI assistant designed for legal professionals.
Your task is to analyze legal documents (cases, contracts, statutes) with high precision.
Maintain a professional, objective, and analytical tone.
Do not provide legal advice; instead, provide legal information and analysis.

When analyzing a document, you must return a JSON object with the following structure:
{
  \"summary\": \"A concise executive overview of the document.\",
  \"deadlines\": [\"List of specific procedural dates, deadlines, or time-sensitive obligations found in the text.\"],
  \"citations\": [\"List of cases, statutes, or regulations cited in the document.\"],
  \"logic_check\": \"A critical analysis of potential risks, counter-arguments, or logical inconsistencies.\"
}";

/// Structured analysis of one legal document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub deadlines: Vec<String>,
    pub citations: Vec<String>,
    pub logic_check: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidatePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            API_BASE, model, self.config.api_key
        )
    }

    async fn generate(
        &self,
        model: &str,
        body: serde_json::Value,
    ) -> Result<GenerateContentResponse, AnalysisError> {
        let response = self
            .http
            .post(self.endpoint(model))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("analysis request failed: {}", e);
                AnalysisError::Failed
            })?;

        if !response.status().is_success() {
            error!("analysis request returned {}", response.status());
            return Err(AnalysisError::Failed);
        }

        response.json().await.map_err(|e| {
            error!("malformed analysis response: {}", e);
            AnalysisError::Failed
        })
    }

    /// Analyze a legal document into `{summary, deadlines, citations,
    /// logic_check}`.
    ///
    /// Every failure mode (validation aside) surfaces as the single generic
    /// `AnalysisError::Failed`; the caller decides whether to retry.
    pub async fn analyze_document(
        &self,
        document: &DocumentFile,
    ) -> Result<AnalysisResult, AnalysisError> {
        document.validate()?;

        info!("analyzing document: {}", document.name);

        let body = json!({
            "contents": {
                "parts": [
                    { "inlineData": { "mimeType": document.mime_type, "data": document.data } },
                    { "text": "Analyze this legal document and provide the structured output as requested." }
                ]
            },
            "systemInstruction": { "parts": [{ "text": ANALYSIS_SYSTEM_INSTRUCTION }] },
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "summary": { "type": "STRING" },
                        "deadlines": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "citations": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "logic_check": { "type": "STRING" }
                    },
                    "required": ["summary", "deadlines", "citations", "logic_check"]
                }
            }
        });

        let response = self.generate(&self.config.analysis_model, body).await?;
        let text = first_text(&response).ok_or_else(|| {
            error!("analysis response contained no text");
            AnalysisError::Failed
        })?;

        parse_analysis(&text)
    }

    /// Synthesize spoken audio for a piece of analysis text (readback).
    pub async fn generate_speech(&self, text: &str) -> Result<Vec<u8>, AnalysisError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": self.config.voice }
                    }
                }
            }
        });

        let response = self.generate(&self.config.tts_model, body).await?;
        let audio = response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.inline_data.as_ref())
            .ok_or_else(|| {
                error!("speech response contained no audio");
                AnalysisError::Failed
            })?;

        base64::engine::general_purpose::STANDARD
            .decode(&audio.data)
            .map_err(|e| {
                error!("speech response audio was not valid base64: {}", e);
                AnalysisError::Failed
            })
    }

    /// Check cited authorities against search, returning a status narrative.
    pub async fn verify_citations(&self, citations: &[String]) -> Result<String, AnalysisError> {
        if citations.is_empty() {
            return Ok("No citations to verify.".to_string());
        }

        let prompt = format!(
            "Verify the following legal citations. Check if they are valid, overturned, or questioned. Provide a brief status for each:\n\n{}",
            citations.join("\n")
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "tools": [{ "googleSearch": {} }]
        });

        let response = self.generate(&self.config.analysis_model, body).await?;
        Ok(first_text(&response).unwrap_or_else(|| "Could not verify citations.".to_string()))
    }
}

fn first_text(response: &GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.iter().find_map(|p| p.text.clone()))
}

/// Parse the model's JSON text into an `AnalysisResult`.
///
/// Malformed output is one generic failure, never a partial result.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AnalysisError> {
    serde_json::from_str(text).map_err(|e| {
        error!("analysis text was not valid JSON: {}", e);
        AnalysisError::Failed
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_analysis() {
        let text = r#"{
            "summary": "A lease dispute.",
            "deadlines": ["Answer due 2026-03-01"],
            "citations": ["Smith v. Jones, 123 F.3d 456"],
            "logic_check": "The damages theory is weak."
        }"#;

        let result = parse_analysis(text).unwrap();
        assert_eq!(result.deadlines.len(), 1);
        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.summary, "A lease dispute.");
    }

    #[test]
    fn malformed_analysis_is_one_generic_failure() {
        let err = parse_analysis("I am not JSON, sorry.").unwrap_err();
        assert!(matches!(err, AnalysisError::Failed));
    }

    #[test]
    fn missing_required_field_is_a_failure() {
        let err = parse_analysis(r#"{"summary": "only a summary"}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Failed));
    }
}
