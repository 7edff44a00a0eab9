//! Admission control against the credit ledger.
//!
//! A job reserves one credit before any expensive work starts. The reservation
//! is a guard with an explicit two-state flag: it is released exactly once,
//! either by `commit` after a successful save or by a single compensating
//! refund. If the guard is dropped while still reserved (the request was
//! cancelled), the refund is spawned onto the runtime instead of being lost.
//!
//! The ledger calls themselves run as spawned tasks. Dropping the caller's
//! future while a deduction or refund is in flight does not cancel the call:
//! a deduction that lands after its caller is gone yields a guard nobody holds,
//! and that guard refunds itself on drop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::data_store::DataStoreError;
use crate::error::GenerationError;
use crate::models::AccountId;

pub const CREDIT_COST: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductOutcome {
    pub success: bool,
    pub remaining_balance: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditTransactionKind {
    Refund,
}

impl CreditTransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditTransactionKind::Refund => "refund",
        }
    }
}

/// Stage that caused a reserved credit to be handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    NoResponse,
    InvalidResponse,
    UnexpectedError,
    Cancelled,
}

impl RefundReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundReason::NoResponse => "no_response",
            RefundReason::InvalidResponse => "invalid_response",
            RefundReason::UnexpectedError => "unexpected_error",
            RefundReason::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RefundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The external ledger. `deduct_credit` must be atomic and fail closed on insufficient balance.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn deduct_credit(
        &self,
        account: &AccountId,
        description: &str,
    ) -> Result<DeductOutcome, DataStoreError>;

    async fn add_credits(
        &self,
        account: &AccountId,
        amount: i64,
        kind: CreditTransactionKind,
        description: &str,
    ) -> Result<(), DataStoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReservationState {
    Reserved,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundOutcome {
    Refunded,
    /// The ledger rejected or never answered the refund. Already logged as an alert.
    Failed,
}

pub struct CreditReservation {
    ledger: Arc<dyn CreditLedger>,
    account: AccountId,
    purpose: String,
    remaining_balance: i64,
    state: ReservationState,
}

impl fmt::Debug for CreditReservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreditReservation")
            .field("account", &self.account)
            .field("purpose", &self.purpose)
            .field("remaining_balance", &self.remaining_balance)
            .field("state", &self.state)
            .finish()
    }
}

impl CreditReservation {
    /// Deducts one credit. Insufficient balance is `AdmissionDenied` with nothing to compensate.
    pub async fn acquire(
        ledger: Arc<dyn CreditLedger>,
        account: &AccountId,
        purpose: &str,
    ) -> Result<Self, GenerationError> {
        let account = account.clone();
        let purpose = purpose.to_string();
        tokio::spawn(Self::reserve(ledger, account, purpose))
            .await
            .map_err(|e| {
                error!(target: "credit_alert", error = %e, "credit reservation task did not complete");
                GenerationError::Unexpected(format!("credit reservation task failed: {}", e))
            })?
    }

    async fn reserve(
        ledger: Arc<dyn CreditLedger>,
        account: AccountId,
        purpose: String,
    ) -> Result<Self, GenerationError> {
        let outcome = ledger.deduct_credit(&account, &purpose).await?;
        if !outcome.success {
            info!(account = %account, balance = outcome.remaining_balance, "admission denied: insufficient credits");
            return Err(GenerationError::AdmissionDenied {
                remaining_balance: outcome.remaining_balance,
            });
        }

        info!(account = %account, purpose = %purpose, remaining = outcome.remaining_balance, "credit reserved");
        Ok(Self {
            ledger,
            account,
            purpose,
            remaining_balance: outcome.remaining_balance,
            state: ReservationState::Reserved,
        })
    }

    pub fn is_reserved(&self) -> bool {
        self.state == ReservationState::Reserved
    }

    /// The job succeeded; the credit stays spent. Returns the balance after deduction.
    pub fn commit(mut self) -> i64 {
        self.state = ReservationState::Released;
        self.remaining_balance
    }

    /// Issues the single compensating refund. Failures are logged, never returned.
    ///
    /// The ledger call runs as its own task, so it completes even if the caller is dropped
    /// while waiting for it.
    pub async fn refund(mut self, reason: RefundReason) -> RefundOutcome {
        self.state = ReservationState::Released;
        let account = self.account.clone();
        let refund = tokio::spawn(issue_refund(
            self.ledger.clone(),
            self.account.clone(),
            self.purpose.clone(),
            reason,
        ));
        match refund.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    target: "credit_alert",
                    account = %account,
                    reason = %reason,
                    error = %e,
                    "refund task did not complete; credit must be restored manually"
                );
                RefundOutcome::Failed
            }
        }
    }
}

impl Drop for CreditReservation {
    fn drop(&mut self) {
        if self.state != ReservationState::Reserved {
            return;
        }
        self.state = ReservationState::Released;

        let ledger = self.ledger.clone();
        let account = self.account.clone();
        let purpose = self.purpose.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(account = %account, purpose = %purpose, "job abandoned while holding a credit; refunding");
                handle.spawn(issue_refund(ledger, account, purpose, RefundReason::Cancelled));
            }
            Err(_) => {
                error!(
                    target: "credit_alert",
                    account = %account,
                    purpose = %purpose,
                    "job abandoned outside a runtime; reserved credit was not refunded"
                );
            }
        }
    }
}

async fn issue_refund(
    ledger: Arc<dyn CreditLedger>,
    account: AccountId,
    purpose: String,
    reason: RefundReason,
) -> RefundOutcome {
    let description = format!("Refund: {} ({})", purpose, reason);
    match ledger
        .add_credits(&account, CREDIT_COST, CreditTransactionKind::Refund, &description)
        .await
    {
        Ok(()) => {
            info!(account = %account, reason = %reason, "credit refunded");
            RefundOutcome::Refunded
        }
        Err(e) => {
            error!(
                target: "credit_alert",
                account = %account,
                reason = %reason,
                error = %e,
                "compensating refund failed; credit must be restored manually"
            );
            RefundOutcome::Failed
        }
    }
}
