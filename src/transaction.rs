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

//! Payment transactions.
//!
//! Transactions follow a state machine:
//! - [`PaymentStatus::Pending`] → [`PaymentStatus::Completed`] (gateway success or webhook)
//! - [`PaymentStatus::Pending`] → [`PaymentStatus::Failed`] (gateway failure, message preserved)
//!
//! A `Completed` transaction is immutable; it is the only state that counts
//! toward balances, limit windows, and deposit/withdrawal summaries.

use crate::base::{TransactionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Deposit => write!(f, "deposit"),
            TransactionKind::Withdrawal => write!(f, "withdrawal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// One deposit or withdrawal, correlated to the payment gateway by
/// `charge_id` once a charge exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub kind: TransactionKind,
    /// Always positive; the direction is carried by `kind`.
    pub value: Decimal,
    pub status: PaymentStatus,
    pub charge_id: Option<String>,
    /// Gateway error message, preserved for audit on failure.
    pub gateway_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a new `Pending` transaction with no charge attached yet.
    pub fn new(
        id: TransactionId,
        user_id: UserId,
        kind: TransactionKind,
        value: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            kind,
            value,
            status: PaymentStatus::Pending,
            charge_id: None,
            gateway_error: None,
            created_at,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}
