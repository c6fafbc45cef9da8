//! Transaction analyzer trait and implementations
//!
//! The analyzer produces the explainable safety review shown before a
//! transfer is authorized. It never fails: any problem downgrades to the
//! fixed fallback result so the payment flow is never blocked.

use crate::models::{AutomationStatus, SmartAutomation, SmartCheckResult};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub mod gemini;
pub use gemini::GeminiAnalyzer;

/// Outcome of a single analysis attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    /// Result produced by the analysis service
    Received(SmartCheckResult),
    /// Service failed; the fixed fallback was substituted
    Fallback(SmartCheckResult),
}

impl Analysis {
    pub fn fallback() -> Self {
        Analysis::Fallback(fallback_result())
    }

    pub fn result(&self) -> &SmartCheckResult {
        match self {
            Analysis::Received(result) | Analysis::Fallback(result) => result,
        }
    }

    pub fn into_result(self) -> SmartCheckResult {
        match self {
            Analysis::Received(result) | Analysis::Fallback(result) => result,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Analysis::Fallback(_))
    }
}

/// The review substituted whenever the analysis service cannot be used
pub fn fallback_result() -> SmartCheckResult {
    SmartCheckResult {
        safety_score: 90.0,
        advice: "This transaction appears standard for your profile.".to_string(),
        reasoning: vec![
            "Consistent with your usual spending range.".to_string(),
            "Recipient matches an established network pattern.".to_string(),
        ],
        category_suggestion: "General".to_string(),
        is_new_recipient: false,
        budget_impact: "Minimal".to_string(),
        transparency_note: "Authenticated via secure p2p relay.".to_string(),
        applied_automations: vec![SmartAutomation {
            rule_name: "Pattern Match".to_string(),
            status: AutomationStatus::Active,
            message: "History alignment confirmed.".to_string(),
        }],
    }
}

/// Generated receipt artwork
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ReceiptImage {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

/// Trait for transaction review (LLM backed or offline)
#[async_trait]
pub trait TransactionAnalyzer: Send + Sync {
    /// Review a transfer of `amount` to `recipient` against `balance`
    async fn analyze(&self, amount: f64, recipient: &str, balance: f64) -> Analysis;

    /// Best-effort receipt artwork; `None` is a normal outcome
    async fn generate_receipt_image(&self, amount: f64, recipient: &str) -> Option<ReceiptImage>;
}

/// Contacts the offline analyzer treats as known
const KNOWN_CONTACTS: &[&str] = &[
    "starlight coffee",
    "cloud hosting",
    "modern gym",
    "sarah chen",
    "product team",
    "rent",
];

/// Mock analyzer for development & testing
/// Keeps the flow functional without an API key
pub struct MockAnalyzer;

#[async_trait]
impl TransactionAnalyzer for MockAnalyzer {
    async fn analyze(&self, amount: f64, recipient: &str, balance: f64) -> Analysis {
        let is_new_recipient = !KNOWN_CONTACTS.contains(&recipient.trim().to_lowercase().as_str());

        let share = if balance > 0.0 { amount / balance } else { 1.0 };
        let budget_impact = if share < 0.01 {
            "Minimal"
        } else if share < 0.1 {
            "Moderate"
        } else {
            "Significant"
        };

        let mut reasoning = vec![format!(
            "Transfer uses {:.1}% of your available balance.",
            share * 100.0
        )];
        let mut applied_automations = vec![SmartAutomation {
            rule_name: "Spending Pattern".to_string(),
            status: if amount > 5000.0 {
                AutomationStatus::Info
            } else {
                AutomationStatus::Active
            },
            message: if amount > 5000.0 {
                "Larger than any previous single transfer.".to_string()
            } else {
                "Within your usual range.".to_string()
            },
        }];

        if is_new_recipient {
            reasoning.push(format!("{} is not among your saved contacts.", recipient));
            applied_automations.push(SmartAutomation {
                rule_name: "First Contact".to_string(),
                status: AutomationStatus::Warning,
                message: "Double-check the recipient details.".to_string(),
            });
        } else {
            reasoning.push(format!("You have paid {} before.", recipient));
        }

        Analysis::Received(SmartCheckResult {
            safety_score: if is_new_recipient { 78.0 } else { 96.0 },
            advice: if is_new_recipient {
                "Looks fine. This is your first transfer to this recipient.".to_string()
            } else {
                "This transfer matches your usual activity.".to_string()
            },
            reasoning,
            category_suggestion: "General".to_string(),
            is_new_recipient,
            budget_impact: budget_impact.to_string(),
            transparency_note: "Reviewed offline by the local pattern engine.".to_string(),
            applied_automations,
        })
    }

    async fn generate_receipt_image(&self, _amount: f64, _recipient: &str) -> Option<ReceiptImage> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_values() {
        let result = fallback_result();
        assert_eq!(result.safety_score, 90.0);
        assert_eq!(result.category_suggestion, "General");
        assert!(!result.is_new_recipient);
        assert_eq!(result.budget_impact, "Minimal");
        assert_eq!(result.reasoning.len(), 2);
        assert_eq!(result.applied_automations.len(), 1);
        assert_eq!(result.applied_automations[0].status, AutomationStatus::Active);
    }

    #[test]
    fn test_analysis_variants() {
        let fallback = Analysis::fallback();
        assert!(fallback.is_fallback());
        assert_eq!(fallback.result(), &fallback_result());

        let received = Analysis::Received(fallback_result());
        assert!(!received.is_fallback());
        assert_eq!(received.into_result(), fallback_result());
    }

    #[test]
    fn test_receipt_data_uri() {
        let image = ReceiptImage {
            mime_type: "image/png".to_string(),
            bytes: b"hi".to_vec(),
        };
        assert_eq!(image.to_data_uri(), "data:image/png;base64,aGk=");
    }

    #[tokio::test]
    async fn test_mock_flags_unknown_recipient() {
        let analysis = MockAnalyzer.analyze(45.0, "Bob", 24850.32).await;
        let result = analysis.result();
        assert!(!analysis.is_fallback());
        assert!(result.is_new_recipient);
        assert_eq!(result.budget_impact, "Minimal");
        assert!(result
            .applied_automations
            .iter()
            .any(|a| a.status == AutomationStatus::Warning));
    }

    #[tokio::test]
    async fn test_mock_known_contact() {
        let analysis = MockAnalyzer.analyze(3000.0, "Sarah Chen", 24850.32).await;
        let result = analysis.result();
        assert!(!result.is_new_recipient);
        assert_eq!(result.budget_impact, "Significant");
        assert!(MockAnalyzer.generate_receipt_image(3000.0, "Sarah Chen").await.is_none());
    }
}
