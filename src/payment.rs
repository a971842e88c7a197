// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Payment gateway collaborator and deposit/withdrawal flows.
//!
//! The gateway only moves money in and out of the platform; entry fees are
//! settled later from the already-held balance. Flows here follow one
//! policy: a gateway failure is recorded on the transaction as `Failed`
//! with the gateway's message preserved, never silently dropped, and
//! webhook processing always acknowledges delivery — events that cannot be
//! applied land on the reconciliation queue instead of erroring back to
//! the gateway.

use crate::base::UserId;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::limits::check_limit;
use crate::transaction::{PaymentStatus, Transaction, TransactionKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Settlement currency for all gateway charges.
pub const CURRENCY: &str = "USD";

/// Outcome status of a gateway charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Completed,
    Pending,
    Failed,
}

/// A charge created at the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCharge {
    /// Gateway-side transaction id, correlated back via webhooks.
    pub id: String,
    pub status: GatewayStatus,
    pub error: Option<String>,
}

/// Transport-level gateway failure (charge not created).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("gateway unavailable: {0}")]
pub struct GatewayError(pub String);

/// External payment processor.
pub trait PaymentGateway: Send + Sync {
    fn process_payment(
        &self,
        merchant_ref: &str,
        amount: Decimal,
        currency: &str,
        payment_token: &str,
    ) -> Result<GatewayCharge, GatewayError>;

    fn process_withdrawal(
        &self,
        merchant_ref: &str,
        amount: Decimal,
        currency: &str,
        destination: &str,
    ) -> Result<GatewayCharge, GatewayError>;

    fn refund_payment(
        &self,
        charge_id: &str,
        amount: Decimal,
    ) -> Result<GatewayCharge, GatewayError>;
}

/// Gateway that completes every charge synchronously.
#[derive(Debug, Default)]
pub struct InstantGateway {
    counter: AtomicU64,
}

impl InstantGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn charge(&self) -> GatewayCharge {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        GatewayCharge {
            id: format!("chg-{n}"),
            status: GatewayStatus::Completed,
            error: None,
        }
    }
}

impl PaymentGateway for InstantGateway {
    fn process_payment(
        &self,
        _merchant_ref: &str,
        _amount: Decimal,
        _currency: &str,
        _payment_token: &str,
    ) -> Result<GatewayCharge, GatewayError> {
        Ok(self.charge())
    }

    fn process_withdrawal(
        &self,
        _merchant_ref: &str,
        _amount: Decimal,
        _currency: &str,
        _destination: &str,
    ) -> Result<GatewayCharge, GatewayError> {
        Ok(self.charge())
    }

    fn refund_payment(
        &self,
        _charge_id: &str,
        _amount: Decimal,
    ) -> Result<GatewayCharge, GatewayError> {
        Ok(self.charge())
    }
}

/// Asynchronous gateway notification, correlated by gateway charge id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    PaymentCompleted { charge_id: String },
    PaymentFailed { charge_id: String, message: String },
    RefundCompleted { charge_id: String },
}

impl WebhookEvent {
    pub fn charge_id(&self) -> &str {
        match self {
            WebhookEvent::PaymentCompleted { charge_id }
            | WebhookEvent::PaymentFailed { charge_id, .. }
            | WebhookEvent::RefundCompleted { charge_id } => charge_id,
        }
    }
}

/// A webhook event that could not be applied, parked for manual
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookFailure {
    pub event: WebhookEvent,
    pub error: EngineError,
}

impl Engine {
    /// Starts a deposit using the current time. See [`Engine::deposit_at`].
    pub fn deposit(
        &self,
        user_id: UserId,
        amount: Decimal,
        payment_token: &str,
    ) -> Result<Transaction, EngineError> {
        self.deposit_at(user_id, amount, payment_token, Utc::now())
    }

    /// Creates a deposit for a user and sends it to the gateway.
    ///
    /// Runs the sliding-window deposit limit check before anything is
    /// created; a breach rejects the request with no side effects. The
    /// returned snapshot reflects the gateway outcome: `Completed` deposits
    /// have already credited the balance, `Failed` ones carry the gateway
    /// message, `Pending` ones wait for the webhook.
    pub fn deposit_at(
        &self,
        user_id: UserId,
        amount: Decimal,
        payment_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Transaction, EngineError> {
        self.create_payment(
            user_id,
            TransactionKind::Deposit,
            amount,
            payment_token,
            now,
        )
    }

    /// Starts a withdrawal using the current time. See [`Engine::withdraw_at`].
    pub fn withdraw(
        &self,
        user_id: UserId,
        amount: Decimal,
        destination: &str,
    ) -> Result<Transaction, EngineError> {
        self.withdraw_at(user_id, amount, destination, Utc::now())
    }

    /// Creates a withdrawal for a user and sends it to the gateway.
    ///
    /// Requires the balance to cover the amount up front; the actual debit
    /// happens at completion through the atomic balance primitive. If funds
    /// were spent in the meantime the completion marks the withdrawal
    /// `Failed` rather than taking the balance negative.
    pub fn withdraw_at(
        &self,
        user_id: UserId,
        amount: Decimal,
        destination: &str,
        now: DateTime<Utc>,
    ) -> Result<Transaction, EngineError> {
        self.create_payment(
            user_id,
            TransactionKind::Withdrawal,
            amount,
            destination,
            now,
        )
    }

    fn create_payment(
        &self,
        user_id: UserId,
        kind: TransactionKind,
        amount: Decimal,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Transaction, EngineError> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "{kind} amount must be positive"
            )));
        }
        let ledger = self.ledger();
        let account = ledger.account(user_id).ok_or(EngineError::UserNotFound)?;

        let limits = match kind {
            TransactionKind::Deposit => account.deposit_limit(),
            TransactionKind::Withdrawal => {
                let available = account.balance();
                if available < amount {
                    return Err(EngineError::InsufficientBalance {
                        required: amount,
                        available,
                    });
                }
                account.withdrawal_limit()
            }
        };
        if let Some(limits) = limits {
            check_limit(ledger, user_id, kind, amount, &limits, now)?;
        }

        let transaction = Transaction::new(
            ledger.allocate_transaction_id(),
            user_id,
            kind,
            amount,
            now,
        );
        ledger.transactions().insert(transaction.clone())?;

        let merchant_ref = transaction.id.to_string();
        let charge = match kind {
            TransactionKind::Deposit => {
                self.gateway()
                    .process_payment(&merchant_ref, amount, CURRENCY, token)
            }
            TransactionKind::Withdrawal => {
                self.gateway()
                    .process_withdrawal(&merchant_ref, amount, CURRENCY, token)
            }
        };

        match charge {
            Ok(charge) => {
                ledger
                    .transactions()
                    .attach_charge(transaction.id, &charge.id)?;
                match charge.status {
                    GatewayStatus::Completed => self.complete_payment(transaction.id),
                    GatewayStatus::Failed => {
                        ledger.transactions().fail(transaction.id, charge.error)
                    }
                    GatewayStatus::Pending => ledger
                        .transactions()
                        .get(transaction.id)
                        .ok_or_else(|| {
                            EngineError::Internal(format!(
                                "transaction {} vanished",
                                transaction.id
                            ))
                        }),
                }
            }
            Err(error) => ledger
                .transactions()
                .fail(transaction.id, Some(error.to_string())),
        }
    }

    /// Applies a completed charge to the balance and marks the transaction.
    ///
    /// Deposits credit after completing; withdrawals debit first and mark
    /// the transaction `Failed` if the balance no longer covers the amount.
    fn complete_payment(
        &self,
        id: crate::base::TransactionId,
    ) -> Result<Transaction, EngineError> {
        let ledger = self.ledger();
        let transaction = ledger
            .transactions()
            .get(id)
            .ok_or_else(|| EngineError::Internal(format!("unknown transaction {id}")))?;
        if transaction.status != PaymentStatus::Pending {
            return Err(EngineError::Conflict);
        }
        let account = ledger
            .account(transaction.user_id)
            .ok_or(EngineError::UserNotFound)?;

        match transaction.kind {
            TransactionKind::Deposit => {
                let completed = ledger.transactions().complete(id)?;
                account.credit(completed.value)?;
                Ok(completed)
            }
            TransactionKind::Withdrawal => match account.debit(transaction.value) {
                Ok(()) => ledger.transactions().complete(id),
                Err(error) => ledger.transactions().fail(id, Some(error.to_string())),
            },
        }
    }

    /// Processes a gateway webhook, always acknowledging delivery.
    ///
    /// Events that cannot be applied (unknown charge, replayed completion,
    /// refund of spent funds) are parked on the reconciliation queue; see
    /// [`Engine::webhook_failures`].
    pub fn handle_webhook(&self, event: WebhookEvent) {
        if let Err(error) = self.apply_webhook(&event) {
            self.ledger()
                .push_webhook_failure(WebhookFailure { event, error });
        }
    }

    /// Unapplied webhook events, drained for manual reconciliation.
    pub fn webhook_failures(&self) -> Vec<WebhookFailure> {
        self.ledger().drain_webhook_failures()
    }

    fn apply_webhook(&self, event: &WebhookEvent) -> Result<(), EngineError> {
        let ledger = self.ledger();
        let transaction_id = ledger
            .transactions()
            .find_by_charge(event.charge_id())
            .ok_or_else(|| {
                EngineError::Internal(format!("unknown charge {}", event.charge_id()))
            })?;

        match event {
            WebhookEvent::PaymentCompleted { .. } => {
                self.complete_payment(transaction_id)?;
            }
            WebhookEvent::PaymentFailed { message, .. } => {
                ledger
                    .transactions()
                    .fail(transaction_id, Some(message.clone()))?;
            }
            WebhookEvent::RefundCompleted { charge_id } => {
                self.apply_refund(transaction_id, charge_id)?;
            }
        }
        Ok(())
    }

    /// Reverses a completed deposit: debits the balance and records a
    /// compensating completed withdrawal. The original row stays untouched
    /// (completed transactions are immutable).
    ///
    /// Idempotent under redelivery: the reversal's charge key is claimed
    /// before the debit, so a replayed refund event gets [`EngineError::Conflict`]
    /// instead of debiting again.
    fn apply_refund(
        &self,
        transaction_id: crate::base::TransactionId,
        charge_id: &str,
    ) -> Result<(), EngineError> {
        let ledger = self.ledger();
        let original = ledger
            .transactions()
            .get(transaction_id)
            .ok_or_else(|| {
                EngineError::Internal(format!("unknown transaction {transaction_id}"))
            })?;
        if original.kind != TransactionKind::Deposit || !original.is_completed() {
            return Err(EngineError::Conflict);
        }

        let account = ledger
            .account(original.user_id)
            .ok_or(EngineError::UserNotFound)?;

        let reversal_id = ledger.allocate_transaction_id();
        let refund_charge = format!("{charge_id}/refund");
        ledger
            .transactions()
            .claim_charge(&refund_charge, reversal_id)?;

        if let Err(error) = account.debit(original.value) {
            // Nothing was recorded; release the claim so reconciliation
            // can retry the event.
            ledger.transactions().release_charge(&refund_charge);
            return Err(error);
        }

        let mut reversal = Transaction::new(
            reversal_id,
            original.user_id,
            TransactionKind::Withdrawal,
            original.value,
            Utc::now(),
        );
        reversal.status = PaymentStatus::Completed;
        reversal.charge_id = Some(refund_charge);
        ledger.transactions().insert(reversal)
    }
}
