//! Screen view models
//!
//! Each screen renders one state of the session and emits intents back to it.
//! Views hold nothing across renders except the transfer form's text buffers.

use crate::error::ValidationError;
use crate::models::{SmartAutomation, Step, Transaction};
use crate::sequencer::{phase_at, SettlementPhase, SETTLEMENT_PHASES, TERMINAL_PHASE};
use crate::session::{Intent, Session};
use crate::validation::validate_transfer;
use serde::Serialize;
use std::time::Duration;

/// Number of transactions the dashboard previews
pub const DASHBOARD_PREVIEW: usize = 3;

pub const QUICK_RECIPIENTS: &[&str] = &["Sarah Chen", "Product Team", "Rent"];

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "screen", rename_all = "kebab-case")]
pub enum ScreenView {
    Dashboard(DashboardView),
    Input(TransactionFormView),
    SmartCheck(SmartReviewView),
    Status(StatusView),
    History(HistoryView),
}

/// Per-render inputs that live outside the session
#[derive(Debug, Clone, Default)]
pub struct RenderContext<'a> {
    pub form: Option<&'a TransactionForm>,
    /// Time since the status screen was mounted
    pub status_elapsed: Duration,
}

/// Render the view matching the session's current step
pub fn render(session: &Session, ctx: &RenderContext<'_>) -> ScreenView {
    match session.step() {
        Step::Dashboard => ScreenView::Dashboard(DashboardView::from_session(session)),
        Step::Input => {
            let form = ctx.form.cloned().unwrap_or_default();
            ScreenView::Input(TransactionFormView::new(&form, session.balance()))
        }
        Step::SmartCheck => ScreenView::SmartCheck(SmartReviewView::from_session(session)),
        Step::Status => ScreenView::Status(StatusView::from_session(session, ctx.status_elapsed)),
        Step::History => ScreenView::History(HistoryView::from_session(session)),
    }
}

//
// ================= Dashboard =================
//

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub balance: f64,
    pub recent: Vec<Transaction>,
}

impl DashboardView {
    fn from_session(session: &Session) -> Self {
        Self {
            balance: session.balance(),
            recent: session
                .ledger()
                .iter()
                .take(DASHBOARD_PREVIEW)
                .cloned()
                .collect(),
        }
    }

    pub fn send() -> Intent {
        Intent::Send
    }

    pub fn view_history() -> Intent {
        Intent::ViewHistory
    }
}

//
// ================= Transfer form =================
//

/// Local text buffers of the input screen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionForm {
    pub amount: String,
    pub recipient: String,
    pub error: Option<ValidationError>,
}

impl TransactionForm {
    pub fn pick_recipient(&mut self, name: &str) {
        self.recipient = name.to_string();
    }

    /// Submit is disabled until both fields have text
    pub fn can_submit(&self) -> bool {
        !self.amount.is_empty() && !self.recipient.is_empty()
    }

    /// Validate against `balance`; on failure the error is kept for display
    pub fn submit(&mut self, balance: f64) -> Result<Intent, ValidationError> {
        match validate_transfer(&self.amount, &self.recipient, balance) {
            Ok(transfer) => {
                self.error = None;
                Ok(Intent::Submit(transfer))
            }
            Err(e) => {
                self.error = Some(e);
                Err(e)
            }
        }
    }

    pub fn cancel() -> Intent {
        Intent::Cancel
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFormView {
    pub amount: String,
    pub recipient: String,
    pub balance: f64,
    pub quick_recipients: Vec<&'static str>,
    pub can_submit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransactionFormView {
    fn new(form: &TransactionForm, balance: f64) -> Self {
        Self {
            amount: form.amount.clone(),
            recipient: form.recipient.clone(),
            balance,
            quick_recipients: QUICK_RECIPIENTS.to_vec(),
            can_submit: form.can_submit(),
            error: form.error.map(|e| e.to_string()),
        }
    }
}

//
// ================= Smart review =================
//

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum SmartReviewView {
    #[serde(rename_all = "camelCase")]
    Waiting {
        amount: f64,
        recipient: String,
        title: &'static str,
        subtitle: &'static str,
        can_confirm: bool,
    },
    #[serde(rename_all = "camelCase")]
    Ready {
        amount: f64,
        recipient: String,
        verified_contact: bool,
        safety_score: f64,
        advice: String,
        reasoning: Vec<String>,
        automations: Vec<SmartAutomation>,
        budget_impact: String,
        transparency_note: String,
        fallback: bool,
        can_confirm: bool,
    },
}

impl SmartReviewView {
    fn from_session(session: &Session) -> Self {
        let (amount, recipient) = session
            .draft()
            .map(|d| (d.amount, d.recipient.clone()))
            .unwrap_or_default();

        match session.analysis() {
            None => SmartReviewView::Waiting {
                amount,
                recipient,
                title: "System Audit",
                subtitle: "Applying automation protocols...",
                can_confirm: false,
            },
            Some(analysis) => {
                let result = analysis.result();
                SmartReviewView::Ready {
                    amount,
                    recipient,
                    verified_contact: !result.is_new_recipient,
                    safety_score: result.safety_score,
                    advice: result.advice.clone(),
                    reasoning: result.reasoning.clone(),
                    automations: result.applied_automations.clone(),
                    budget_impact: result.budget_impact.clone(),
                    transparency_note: result.transparency_note.clone(),
                    fallback: analysis.is_fallback(),
                    can_confirm: true,
                }
            }
        }
    }

    pub fn can_confirm(&self) -> bool {
        matches!(self, SmartReviewView::Ready { can_confirm: true, .. })
    }

    pub fn confirm() -> Intent {
        Intent::Confirm
    }

    pub fn back() -> Intent {
        Intent::Back
    }
}

//
// ================= Status =================
//

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PhaseState {
    Complete,
    Current,
    Upcoming,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseView {
    #[serde(flatten)]
    pub phase: SettlementPhase,
    pub state: PhaseState,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub amount: f64,
    pub recipient: String,
    pub current_phase: usize,
    pub phases: Vec<PhaseView>,
    pub done_available: bool,
}

impl StatusView {
    fn from_session(session: &Session, elapsed: Duration) -> Self {
        let (amount, recipient) = session
            .draft()
            .map(|d| (d.amount, d.recipient.clone()))
            .unwrap_or_default();
        let current = phase_at(elapsed);

        let phases = SETTLEMENT_PHASES
            .iter()
            .enumerate()
            .map(|(index, phase)| PhaseView {
                phase: *phase,
                state: match index.cmp(&current) {
                    std::cmp::Ordering::Less => PhaseState::Complete,
                    std::cmp::Ordering::Equal => PhaseState::Current,
                    std::cmp::Ordering::Greater => PhaseState::Upcoming,
                },
            })
            .collect();

        Self {
            amount,
            recipient,
            current_phase: current,
            phases,
            done_available: current == TERMINAL_PHASE,
        }
    }

    pub fn done() -> Intent {
        Intent::Done
    }
}

//
// ================= History =================
//

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub short_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub transactions: Vec<HistoryEntry>,
}

impl HistoryView {
    fn from_session(session: &Session) -> Self {
        Self {
            transactions: session
                .ledger()
                .iter()
                .map(|tx| HistoryEntry {
                    short_id: tx.id.chars().take(8).collect(),
                    transaction: tx.clone(),
                })
                .collect(),
        }
    }

    pub fn back() -> Intent {
        Intent::Back
    }
}
