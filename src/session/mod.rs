//! Application state machine
//!
//! dashboard → input → smart-check → status → dashboard
//! with history as a side branch of the dashboard and back-edge smart-check → input.
//!
//! The session exclusively owns the user's balance, the ledger, the active
//! screen and the draft transfer. Every mutation goes through one of the
//! transition methods below.

use crate::analysis::Analysis;
use crate::error::{AppError, ValidationError};
use crate::models::{Step, Transaction, TransactionStatus, UserState};
use crate::validation::ValidatedTransfer;
use crate::Result;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_CATEGORY: &str = "General";
pub const JUST_NOW: &str = "Just now";

/// In-progress transfer between input and status
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub amount: f64,
    pub recipient: String,
    pub analysis: Option<Analysis>,
    review_id: Option<Uuid>,
}

/// Work the host must run after a successful submit
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub review_id: Uuid,
    pub amount: f64,
    pub recipient: String,
    pub balance: f64,
}

/// User intents the screens can emit
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Send,
    ViewHistory,
    Submit(ValidatedTransfer),
    Cancel,
    Back,
    Confirm,
    Done,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Send => "send",
            Intent::ViewHistory => "view-history",
            Intent::Submit(_) => "submit",
            Intent::Cancel => "cancel",
            Intent::Back => "back",
            Intent::Confirm => "confirm",
            Intent::Done => "done",
        }
    }
}

/// Side effect produced by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Analyze(AnalysisRequest),
    Settled(Transaction),
}

#[derive(Debug, Clone)]
pub struct Session {
    user: UserState,
    step: Step,
    draft: Option<Draft>,
}

impl Session {
    pub fn new(user: UserState) -> Self {
        Self {
            user,
            step: Step::Dashboard,
            draft: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn user(&self) -> &UserState {
        &self.user
    }

    pub fn balance(&self) -> f64 {
        self.user.balance
    }

    pub fn ledger(&self) -> &[Transaction] {
        &self.user.recent_transactions
    }

    /// Only meaningful while on smart-check or status
    pub fn draft(&self) -> Option<&Draft> {
        match self.step {
            Step::SmartCheck | Step::Status => self.draft.as_ref(),
            _ => None,
        }
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.draft().and_then(|d| d.analysis.as_ref())
    }

    /// Apply one intent from the transition table
    pub fn apply(&mut self, intent: Intent) -> Result<Effect> {
        let from = self.step;
        let action = intent.name();

        let effect = match (from, intent) {
            (Step::Dashboard, Intent::Send) => {
                self.step = Step::Input;
                Effect::None
            }
            (Step::Dashboard, Intent::ViewHistory) => {
                self.step = Step::History;
                Effect::None
            }
            (Step::Input, Intent::Submit(transfer)) => self.submit(transfer)?,
            (Step::Input, Intent::Cancel) => {
                self.draft = None;
                self.step = Step::Dashboard;
                Effect::None
            }
            (Step::SmartCheck, Intent::Back) => {
                if let Some(draft) = self.draft.as_mut() {
                    draft.analysis = None;
                    draft.review_id = None;
                }
                self.step = Step::Input;
                Effect::None
            }
            (Step::SmartCheck, Intent::Confirm) => self.confirm()?,
            (Step::Status, Intent::Done) => {
                self.draft = None;
                self.step = Step::Dashboard;
                Effect::None
            }
            (Step::History, Intent::Back) => {
                self.step = Step::Dashboard;
                Effect::None
            }
            _ => return Err(AppError::InvalidTransition { from, action }),
        };

        info!(from = %from, to = %self.step, action, "Session transition");

        Ok(effect)
    }

    /// Write back an analysis outcome. Returns false when it was discarded.
    pub fn resolve_analysis(&mut self, review_id: Uuid, analysis: Analysis) -> bool {
        let current = self
            .draft
            .as_mut()
            .filter(|d| d.review_id == Some(review_id) && d.analysis.is_none());

        match (self.step, current) {
            (Step::SmartCheck, Some(draft)) => {
                info!(
                    %review_id,
                    fallback = analysis.is_fallback(),
                    "Analysis attached to draft"
                );
                draft.analysis = Some(analysis);
                true
            }
            _ => {
                debug!(%review_id, step = %self.step, "Discarding stale analysis");
                false
            }
        }
    }

    fn submit(&mut self, transfer: ValidatedTransfer) -> Result<Effect> {
        // The transfer may have been validated against a different balance
        if transfer.amount() > self.user.balance {
            warn!(
                amount = transfer.amount(),
                balance = self.user.balance,
                "Transfer exceeds current balance"
            );
            return Err(ValidationError::ExceedsBalance.into());
        }

        let review_id = Uuid::new_v4();
        let recipient = transfer.recipient().to_string();

        self.draft = Some(Draft {
            amount: transfer.amount(),
            recipient: recipient.clone(),
            analysis: None,
            review_id: Some(review_id),
        });
        self.step = Step::SmartCheck;

        Ok(Effect::Analyze(AnalysisRequest {
            review_id,
            amount: transfer.amount(),
            recipient,
            balance: self.user.balance,
        }))
    }

    fn confirm(&mut self) -> Result<Effect> {
        let draft = self.draft.as_ref().ok_or(AppError::AnalysisPending)?;
        let analysis = draft.analysis.as_ref().ok_or(AppError::AnalysisPending)?;

        let category = match analysis.result().category_suggestion.trim() {
            "" => DEFAULT_CATEGORY.to_string(),
            suggested => suggested.to_string(),
        };

        let id = generate_transaction_id();
        let hash = settlement_hash(&id, draft.amount, &draft.recipient);

        let transaction = Transaction {
            id,
            amount: draft.amount,
            recipient: draft.recipient.clone(),
            category,
            date: JUST_NOW.to_string(),
            status: TransactionStatus::Settled,
            hash: Some(hash),
        };

        self.user.balance -= draft.amount;
        self.user.recent_transactions.insert(0, transaction.clone());
        self.step = Step::Status;

        info!(
            tx_id = %transaction.id,
            amount = transaction.amount,
            recipient = %transaction.recipient,
            balance = self.user.balance,
            "Transaction settled"
        );

        Ok(Effect::Settled(transaction))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(UserState::demo())
    }
}

/// `tx_` plus five random base-36 characters. Not collision free.
pub fn generate_transaction_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(|c| (c as char).to_ascii_lowercase())
        .take(5)
        .collect();
    format!("tx_{}", suffix)
}

/// SHA256 fingerprint of a settled transfer
pub fn settlement_hash(id: &str, amount: f64, recipient: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(format!("{:.2}", amount).as_bytes());
    hasher.update(recipient.as_bytes());
    hex::encode(hasher.finalize())
}
