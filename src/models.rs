//! Core data models for the payments session

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Settled,
    Flagged,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AutomationStatus {
    Active,
    Warning,
    Info,
}

/// Which screen is active. Exactly one at any time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Dashboard,
    Input,
    SmartCheck,
    Status,
    History,
}

//
// ================= Ledger =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub amount: f64,
    pub recipient: String,
    pub category: String,
    pub date: String,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Transaction {
    fn seeded(id: &str, amount: f64, recipient: &str, category: &str, date: &str) -> Self {
        Self {
            id: id.to_string(),
            amount,
            recipient: recipient.to_string(),
            category: category.to_string(),
            date: date.to_string(),
            status: TransactionStatus::Settled,
            hash: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    pub balance: f64,
    /// Newest first
    pub recent_transactions: Vec<Transaction>,
}

impl UserState {
    /// Sample account every session starts from
    pub fn demo() -> Self {
        Self {
            balance: 24850.32,
            recent_transactions: vec![
                Transaction::seeded("tx_88291", 45.00, "Starlight Coffee", "Food", "Oct 24, 09:41"),
                Transaction::seeded("tx_88292", 1200.00, "Cloud Hosting", "Ops", "Oct 23, 14:20"),
                Transaction::seeded("tx_88293", 89.90, "Modern Gym", "Health", "Oct 22, 18:00"),
            ],
        }
    }
}

impl Default for UserState {
    fn default() -> Self {
        Self::demo()
    }
}

//
// ================= Smart Check =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SmartAutomation {
    pub rule_name: String,
    pub status: AutomationStatus,
    pub message: String,
}

/// Explainable safety review produced once per review cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SmartCheckResult {
    pub safety_score: f64,
    pub advice: String,
    pub reasoning: Vec<String>,
    pub category_suggestion: String,
    pub is_new_recipient: bool,
    pub budget_impact: String,
    pub transparency_note: String,
    pub applied_automations: Vec<SmartAutomation>,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Dashboard => "dashboard",
            Step::Input => "input",
            Step::SmartCheck => "smart-check",
            Step::Status => "status",
            Step::History => "history",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Settled => "Settled",
            TransactionStatus::Flagged => "Flagged",
        };
        write!(f, "{}", s)
    }
}
