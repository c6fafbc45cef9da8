//! Gemini-powered transaction analyzer
//!
//! Prompts Gemini for a structured safety review and parses it into a
//! `SmartCheckResult`. Every failure maps to the fixed fallback.

use super::{Analysis, ReceiptImage, TransactionAnalyzer};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::gemini::{GeminiClient, Part};
use crate::models::SmartCheckResult;
use crate::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use tracing::{info, warn};

pub struct GeminiAnalyzer {
    client: GeminiClient,
    analysis_model: String,
    image_model: String,
}

impl GeminiAnalyzer {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            client: GeminiClient::new(config)?,
            analysis_model: config.analysis_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    async fn try_analyze(&self, amount: f64, recipient: &str, balance: f64) -> Result<SmartCheckResult> {
        let prompt = build_analysis_prompt(amount, recipient, balance);
        let response = self
            .client
            .generate_json(&self.analysis_model, &prompt, response_schema())
            .await?;

        parse_analysis_response(&response)
    }

    async fn try_receipt(&self, amount: f64, recipient: &str) -> Result<Option<ReceiptImage>> {
        let prompt = build_receipt_prompt(amount, recipient);
        let parts = self.client.generate_parts(&self.image_model, &prompt).await?;
        first_inline_image(&parts)
    }
}

#[async_trait]
impl TransactionAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, amount: f64, recipient: &str, balance: f64) -> Analysis {
        match self.try_analyze(amount, recipient, balance).await {
            Ok(result) => {
                info!(
                    safety_score = result.safety_score,
                    category = %result.category_suggestion,
                    "Safety analysis received"
                );
                Analysis::Received(result)
            }
            Err(e) => {
                warn!(error = %e, "Analysis failed, returning fallback state");
                Analysis::fallback()
            }
        }
    }

    async fn generate_receipt_image(&self, amount: f64, recipient: &str) -> Option<ReceiptImage> {
        match self.try_receipt(amount, recipient).await {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "Receipt image generation failed");
                None
            }
        }
    }
}

/// Build the review prompt with the static user-history context
fn build_analysis_prompt(amount: f64, recipient: &str, balance: f64) -> String {
    format!(
        r#"You are the ChainEase Explainable AI Assistant.
Transaction: ${} to {}.
User Balance: ${}.

Task:
1. Generate a human-friendly review.
2. Highlight potential risks (e.g., first-time recipient) WITHOUT being alarmist or blocking the user.
3. Provide 2-3 specific reasoning bullet points explaining why the transaction is considered safe or what to look out for.
4. Suggest a spending category and describe the budget impact.
5. List the smart automations that applied, each with status "active", "warning" or "info".
6. Use calm, minimalist, and trust-focused language. No regulatory or compliance jargon.

Mock User History Context:
- User frequently spends $20-$100 on Food/Entertainment.
- User has never sent more than $5000 in a single transaction.
- User has 12 saved contacts."#,
        amount, recipient, balance
    )
}

fn build_receipt_prompt(amount: f64, recipient: &str) -> String {
    format!(
        "A clean, minimalist digital payment receipt card for a transfer of ${:.2} to {}. \
         Soft emerald accents on white, a subtle checkmark, modern fintech style, no extra text.",
        amount, recipient
    )
}

/// Structured output schema; every field is required
fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "safetyScore": { "type": "NUMBER" },
            "advice": { "type": "STRING", "description": "Main summary of the analysis." },
            "reasoning": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "2-3 bullet points explaining the logic."
            },
            "categorySuggestion": { "type": "STRING" },
            "isNewRecipient": { "type": "BOOLEAN" },
            "budgetImpact": { "type": "STRING" },
            "transparencyNote": { "type": "STRING" },
            "appliedAutomations": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "ruleName": { "type": "STRING" },
                        "status": { "type": "STRING", "enum": ["active", "warning", "info"] },
                        "message": { "type": "STRING" }
                    },
                    "required": ["ruleName", "status", "message"]
                }
            }
        },
        "required": [
            "safetyScore", "advice", "reasoning", "categorySuggestion",
            "isNewRecipient", "budgetImpact", "transparencyNote", "appliedAutomations"
        ]
    })
}

/// Parse the model's JSON text, tolerating a markdown fence around it
fn parse_analysis_response(response: &str) -> Result<SmartCheckResult> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(cleaned).map_err(|e| {
        AppError::LlmError(format!(
            "Failed to parse Gemini analysis response: {} | raw={}",
            e, response
        ))
    })
}

/// Decode the first inline payload among `parts`, if any
fn first_inline_image(parts: &[Part]) -> Result<Option<ReceiptImage>> {
    let Some(inline) = parts.iter().find_map(|p| p.inline_data.as_ref()) else {
        return Ok(None);
    };

    let bytes = STANDARD.decode(inline.data.trim())?;

    Ok(Some(ReceiptImage {
        mime_type: inline.mime_type.clone(),
        bytes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fallback_result;
    use crate::gemini::InlineData;
    use crate::models::AutomationStatus;

    const VALID_RESPONSE: &str = r#"{
        "safetyScore": 94,
        "advice": "A familiar coffee purchase.",
        "reasoning": ["Matches past Food spending.", "Known merchant."],
        "categorySuggestion": "Food",
        "isNewRecipient": false,
        "budgetImpact": "Negligible",
        "transparencyNote": "Compared against 30 days of history.",
        "appliedAutomations": [
            {"ruleName": "Pattern Match", "status": "active", "message": "Routine spend."}
        ]
    }"#;

    #[test]
    fn test_parse_plain_json() {
        let result = parse_analysis_response(VALID_RESPONSE).unwrap();
        assert_eq!(result.category_suggestion, "Food");
        assert_eq!(result.reasoning.len(), 2);
        assert_eq!(result.applied_automations[0].status, AutomationStatus::Active);
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("```json\n{}\n```", VALID_RESPONSE);
        let result = parse_analysis_response(&fenced).unwrap();
        assert_eq!(result.safety_score, 94.0);
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let err = parse_analysis_response(r#"{"safetyScore": 50, "advice": "hm"}"#).unwrap_err();
        assert!(matches!(err, AppError::LlmError(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_automation_status() {
        let bad = VALID_RESPONSE.replace("\"active\"", "\"critical\"");
        assert!(parse_analysis_response(&bad).is_err());
    }

    #[test]
    fn test_prompt_embeds_transaction() {
        let prompt = build_analysis_prompt(45.0, "Starlight Coffee", 24850.32);
        assert!(prompt.contains("$45 to Starlight Coffee"));
        assert!(prompt.contains("User Balance: $24850.32"));
        assert!(prompt.contains("12 saved contacts"));

        let receipt = build_receipt_prompt(45.0, "Starlight Coffee");
        assert!(receipt.contains("$45.00 to Starlight Coffee"));
    }

    #[test]
    fn test_schema_requires_every_field() {
        let schema = response_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 8);
        assert_eq!(
            schema["properties"]["appliedAutomations"]["items"]["required"],
            json!(["ruleName", "status", "message"])
        );
    }

    #[test]
    fn test_first_inline_image() {
        let parts = vec![
            Part { text: Some("caption".to_string()), inline_data: None },
            Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: "image/png".to_string(),
                    data: "aGk=".to_string(),
                }),
            },
        ];

        let image = first_inline_image(&parts).unwrap().unwrap();
        assert_eq!(image.bytes, b"hi".to_vec());
        assert_eq!(image.to_data_uri(), "data:image/png;base64,aGk=");

        assert!(first_inline_image(&parts[..1]).unwrap().is_none());
    }

    #[test]
    fn test_first_inline_image_bad_payload() {
        let parts = vec![Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: "image/png".to_string(),
                data: "not base64!".to_string(),
            }),
        }];
        assert!(matches!(
            first_inline_image(&parts),
            Err(AppError::ImageDecodeError(_))
        ));
    }

    /// Serve `body` for every request on a local port and point a config at it
    async fn stub_gemini(body: serde_json::Value) -> AppConfig {
        let router = axum::Router::new().fallback(move || {
            let body = body.clone();
            async move { axum::Json(body) }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        AppConfig {
            gemini_api_key: "test-key".to_string(),
            gemini_api_base: format!("http://{}", addr),
            ..AppConfig::default()
        }
    }

    fn text_candidate(text: &str) -> serde_json::Value {
        json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] })
    }

    #[tokio::test]
    async fn test_malformed_model_output_returns_fallback() {
        let config = stub_gemini(text_candidate("Sure! Here is my review: looks fine.")).await;
        let analyzer = GeminiAnalyzer::new(&config).unwrap();

        let analysis = analyzer.analyze(45.0, "Starlight Coffee", 24850.32).await;
        assert_eq!(analysis, Analysis::Fallback(fallback_result()));

        // Text-only reply carries no image
        assert!(analyzer.generate_receipt_image(45.0, "Starlight Coffee").await.is_none());
    }

    #[tokio::test]
    async fn test_well_formed_model_output_is_received() {
        let config = stub_gemini(text_candidate(VALID_RESPONSE)).await;
        let analyzer = GeminiAnalyzer::new(&config).unwrap();

        let analysis = analyzer.analyze(45.0, "Starlight Coffee", 24850.32).await;
        assert!(!analysis.is_fallback());
        assert_eq!(analysis.result().category_suggestion, "Food");
    }

    #[tokio::test]
    async fn test_failure_returns_fallback() {
        // No API key: the transport fails before any network call
        let analyzer = GeminiAnalyzer::new(&AppConfig::default()).unwrap();

        let analysis = analyzer.analyze(45.0, "Starlight Coffee", 24850.32).await;
        assert_eq!(analysis, Analysis::Fallback(fallback_result()));

        assert!(analyzer.generate_receipt_image(45.0, "Starlight Coffee").await.is_none());
    }
}
