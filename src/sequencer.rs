//! Settlement sequence shown on the status screen
//!
//! Purely presentational. The ledger was already committed when the
//! transfer was confirmed; nothing here can fail or touch it.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SettlementPhase {
    pub label: &'static str,
    pub detail: &'static str,
    pub reassurance: &'static str,
    #[serde(skip)]
    pub duration: Duration,
}

pub const SETTLEMENT_PHASES: [SettlementPhase; 4] = [
    SettlementPhase {
        label: "Securing Connection",
        detail: "Establishing a private, encrypted tunnel to the network.",
        reassurance: "End-to-end encryption active.",
        duration: Duration::from_millis(1200),
    },
    SettlementPhase {
        label: "Integrity Audit",
        detail: "Verifying recipient details and matching against your safety profile.",
        reassurance: "No anomalies detected.",
        duration: Duration::from_millis(2000),
    },
    SettlementPhase {
        label: "Ledger Synchronization",
        detail: "Broadcasting the transaction to the high-speed settlement ledger.",
        reassurance: "Record is now immutable.",
        duration: Duration::from_millis(1800),
    },
    SettlementPhase {
        label: "Final Settlement",
        detail: "Funds have successfully arrived and are available for use.",
        reassurance: "Transfer finalized.",
        duration: Duration::from_millis(1000),
    },
];

pub const TERMINAL_PHASE: usize = SETTLEMENT_PHASES.len() - 1;

/// Index of the phase active after `elapsed`
pub fn phase_at(elapsed: Duration) -> usize {
    let mut boundary = Duration::ZERO;
    for (index, phase) in SETTLEMENT_PHASES[..TERMINAL_PHASE].iter().enumerate() {
        boundary += phase.duration;
        if elapsed < boundary {
            return index;
        }
    }
    TERMINAL_PHASE
}

/// Elapsed time at which the terminal phase is entered
pub fn time_to_terminal() -> Duration {
    SETTLEMENT_PHASES[..TERMINAL_PHASE]
        .iter()
        .map(|p| p.duration)
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEvent {
    PhaseEntered(usize),
    DoneAvailable,
}

/// Tracks what has already been announced for one run of the sequence
#[derive(Debug, Clone, Default)]
pub struct SettlementSequence {
    current: usize,
    done_signalled: bool,
}

impl SettlementSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catch up to `elapsed`, returning events not yet emitted.
    /// Time going backwards produces nothing.
    pub fn advance_to(&mut self, elapsed: Duration) -> Vec<SequenceEvent> {
        let target = phase_at(elapsed);
        let mut events = Vec::new();

        while self.current < target {
            self.current += 1;
            events.push(SequenceEvent::PhaseEntered(self.current));
        }

        if self.current == TERMINAL_PHASE && !self.done_signalled {
            self.done_signalled = true;
            events.push(SequenceEvent::DoneAvailable);
        }

        events
    }
}

/// Drive the sequence on tokio timers.
///
/// Stops early when the receiver is gone, so an unmounted view is never updated.
pub async fn run_settlement(events: mpsc::UnboundedSender<SequenceEvent>) {
    let mut sequence = SettlementSequence::new();
    let start = tokio::time::Instant::now();

    for phase in &SETTLEMENT_PHASES[..TERMINAL_PHASE] {
        tokio::time::sleep(phase.duration).await;

        for event in sequence.advance_to(start.elapsed()) {
            if events.send(event).is_err() {
                debug!("Settlement view gone, stopping sequence");
                return;
            }
        }
    }

    // Guards against coarse timers landing short of the final boundary
    for event in sequence.advance_to(time_to_terminal()) {
        if events.send(event).is_err() {
            return;
        }
    }
}
