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

//! Thread-safe payment transaction table.
//!
//! Guarantees transaction ID uniqueness, correlates gateway charge ids back
//! to local transactions, and enforces the status state machine: `Pending`
//! rows may complete or fail, `Completed` rows are immutable.

use crate::base::{TransactionId, UserId};
use crate::error::EngineError;
use crate::transaction::{PaymentStatus, Transaction, TransactionKind};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;

/// Concurrent transaction table with duplicate detection and charge-id
/// correlation.
#[derive(Debug, Default)]
pub struct TransactionLog {
    /// Transactions indexed by id.
    transactions: DashMap<TransactionId, Transaction>,

    /// Gateway charge id → local transaction id, for webhook correlation.
    by_charge: DashMap<String, TransactionId>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a transaction to the log.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Conflict`] if a transaction with the same ID
    /// already exists.
    pub fn insert(&self, transaction: Transaction) -> Result<(), EngineError> {
        // Entry API for atomic check-and-insert.
        match self.transactions.entry(transaction.id) {
            Entry::Occupied(_) => Err(EngineError::Conflict),
            Entry::Vacant(entry) => {
                if let Some(charge_id) = &transaction.charge_id {
                    self.by_charge.insert(charge_id.clone(), transaction.id);
                }
                entry.insert(transaction);
                Ok(())
            }
        }
    }

    /// Snapshot of one transaction.
    pub fn get(&self, id: TransactionId) -> Option<Transaction> {
        self.transactions.get(&id).map(|t| t.clone())
    }

    /// Records the gateway charge id on a transaction and indexes it.
    pub fn attach_charge(&self, id: TransactionId, charge_id: &str) -> Result<(), EngineError> {
        let mut transaction = self
            .transactions
            .get_mut(&id)
            .ok_or_else(|| EngineError::Internal(format!("unknown transaction {id}")))?;
        transaction.charge_id = Some(charge_id.to_string());
        self.by_charge.insert(charge_id.to_string(), id);
        Ok(())
    }

    pub fn find_by_charge(&self, charge_id: &str) -> Option<TransactionId> {
        self.by_charge.get(charge_id).map(|id| *id)
    }

    /// Atomically claims a charge id ahead of inserting its transaction.
    ///
    /// Gateway-initiated reversals claim their charge key before moving any
    /// money, so a redelivered event collides here instead of applying twice.
    ///
    /// # Errors
    ///
    /// [`EngineError::Conflict`] if the charge id is already claimed.
    pub fn claim_charge(&self, charge_id: &str, id: TransactionId) -> Result<(), EngineError> {
        match self.by_charge.entry(charge_id.to_string()) {
            Entry::Occupied(_) => Err(EngineError::Conflict),
            Entry::Vacant(entry) => {
                entry.insert(id);
                Ok(())
            }
        }
    }

    /// Releases a claimed charge id whose transaction was never recorded,
    /// so the event can be retried.
    pub fn release_charge(&self, charge_id: &str) {
        self.by_charge.remove(charge_id);
    }

    /// Marks a `Pending` transaction `Completed`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Conflict`] if the transaction is not pending (replayed
    /// completion, or a failed row); [`EngineError::Internal`] if it does
    /// not exist.
    pub fn complete(&self, id: TransactionId) -> Result<Transaction, EngineError> {
        self.transition(id, PaymentStatus::Completed, None)
    }

    /// Marks a `Pending` transaction `Failed`, preserving the gateway's
    /// error message for audit.
    pub fn fail(
        &self,
        id: TransactionId,
        message: Option<String>,
    ) -> Result<Transaction, EngineError> {
        self.transition(id, PaymentStatus::Failed, message)
    }

    fn transition(
        &self,
        id: TransactionId,
        status: PaymentStatus,
        message: Option<String>,
    ) -> Result<Transaction, EngineError> {
        let mut transaction = self
            .transactions
            .get_mut(&id)
            .ok_or_else(|| EngineError::Internal(format!("unknown transaction {id}")))?;
        if transaction.status != PaymentStatus::Pending {
            return Err(EngineError::Conflict);
        }
        transaction.status = status;
        if message.is_some() {
            transaction.gateway_error = message;
        }
        Ok(transaction.clone())
    }

    /// Sum of `Completed` transactions of one kind for a user created at or
    /// after `since`. `Pending` and `Failed` rows never count.
    pub fn completed_total(
        &self,
        user_id: UserId,
        kind: TransactionKind,
        since: DateTime<Utc>,
    ) -> Decimal {
        self.transactions
            .iter()
            .filter(|t| {
                t.user_id == user_id
                    && t.kind == kind
                    && t.is_completed()
                    && t.created_at >= since
            })
            .map(|t| t.value)
            .sum()
    }

    /// Lifetime sum of `Completed` transactions of one kind for a user.
    pub fn user_total(&self, user_id: UserId, kind: TransactionKind) -> Decimal {
        self.transactions
            .iter()
            .filter(|t| t.user_id == user_id && t.kind == kind && t.is_completed())
            .map(|t| t.value)
            .sum()
    }

    /// All transactions for a user, ordered by creation time.
    pub fn user_transactions(&self, user_id: UserId) -> Vec<Transaction> {
        let mut transactions: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .map(|t| t.clone())
            .collect();
        transactions.sort_by_key(|t| (t.created_at, t.id));
        transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn log_with(transactions: Vec<Transaction>) -> TransactionLog {
        let log = TransactionLog::new();
        for t in transactions {
            log.insert(t).unwrap();
        }
        log
    }

    fn tx(id: u64, kind: TransactionKind, value: Decimal, day: u32) -> Transaction {
        Transaction::new(
            TransactionId(id),
            UserId(1),
            kind,
            value,
            Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn duplicate_id_rejected() {
        let log = log_with(vec![tx(1, TransactionKind::Deposit, dec!(10), 1)]);
        let result = log.insert(tx(1, TransactionKind::Deposit, dec!(20), 2));
        assert_eq!(result, Err(EngineError::Conflict));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn pending_rows_do_not_aggregate() {
        let log = log_with(vec![
            tx(1, TransactionKind::Deposit, dec!(100), 1),
            tx(2, TransactionKind::Deposit, dec!(50), 2),
        ]);
        log.complete(TransactionId(1)).unwrap();

        let since = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let total = log.completed_total(UserId(1), TransactionKind::Deposit, since);
        assert_eq!(total, dec!(100));
    }

    #[test]
    fn aggregation_respects_window_start() {
        let log = log_with(vec![
            tx(1, TransactionKind::Deposit, dec!(100), 1),
            tx(2, TransactionKind::Deposit, dec!(40), 10),
        ]);
        log.complete(TransactionId(1)).unwrap();
        log.complete(TransactionId(2)).unwrap();

        let since = Utc.with_ymd_and_hms(2025, 6, 5, 0, 0, 0).unwrap();
        let total = log.completed_total(UserId(1), TransactionKind::Deposit, since);
        assert_eq!(total, dec!(40));
    }

    #[test]
    fn completed_rows_are_immutable() {
        let log = log_with(vec![tx(1, TransactionKind::Deposit, dec!(100), 1)]);
        log.complete(TransactionId(1)).unwrap();

        assert_eq!(log.complete(TransactionId(1)), Err(EngineError::Conflict));
        assert_eq!(
            log.fail(TransactionId(1), Some("late failure".into())),
            Err(EngineError::Conflict)
        );
        assert!(log.get(TransactionId(1)).unwrap().is_completed());
    }

    #[test]
    fn failure_preserves_gateway_message() {
        let log = log_with(vec![tx(1, TransactionKind::Withdrawal, dec!(25), 1)]);
        let failed = log
            .fail(TransactionId(1), Some("card declined".into()))
            .unwrap();
        assert_eq!(failed.status, PaymentStatus::Failed);
        assert_eq!(failed.gateway_error.as_deref(), Some("card declined"));
    }

    #[test]
    fn charge_claims_are_exclusive() {
        let log = TransactionLog::new();
        log.claim_charge("chg-1/refund", TransactionId(7)).unwrap();
        assert_eq!(
            log.claim_charge("chg-1/refund", TransactionId(8)),
            Err(EngineError::Conflict)
        );
        assert_eq!(log.find_by_charge("chg-1/refund"), Some(TransactionId(7)));

        // Releasing makes the key claimable again.
        log.release_charge("chg-1/refund");
        assert!(log.claim_charge("chg-1/refund", TransactionId(8)).is_ok());
    }

    #[test]
    fn charge_correlation_round_trips() {
        let log = log_with(vec![tx(1, TransactionKind::Deposit, dec!(100), 1)]);
        log.attach_charge(TransactionId(1), "chg-abc").unwrap();

        assert_eq!(log.find_by_charge("chg-abc"), Some(TransactionId(1)));
        assert_eq!(
            log.get(TransactionId(1)).unwrap().charge_id.as_deref(),
            Some("chg-abc")
        );
        assert_eq!(log.find_by_charge("chg-missing"), None);
    }
}
