//! Transfer form validation
//!
//! Runs on the input screen before a transfer is handed to the session.

use crate::error::ValidationError;

/// A transfer that passed the input screen's checks
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTransfer {
    amount: f64,
    recipient: String,
}

impl ValidatedTransfer {
    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }
}

/// Check raw form text against the available balance.
///
/// Order matters: recipient, then amount, then balance. The first failure wins.
pub fn validate_transfer(
    amount: &str,
    recipient: &str,
    balance: f64,
) -> Result<ValidatedTransfer, ValidationError> {
    let recipient = recipient.trim();
    if recipient.is_empty() {
        return Err(ValidationError::MissingRecipient);
    }

    let amount = amount
        .trim()
        .trim_start_matches('$')
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidAmount)?;

    if !amount.is_finite() || amount <= 0.0 {
        return Err(ValidationError::InvalidAmount);
    }

    if amount > balance {
        return Err(ValidationError::ExceedsBalance);
    }

    Ok(ValidatedTransfer {
        amount,
        recipient: recipient.to_string(),
    })
}
