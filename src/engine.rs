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

//! The wagering engine facade.
//!
//! [`Engine`] owns the [`Ledger`] store and the payment gateway
//! collaborator. The three core operations live in their own modules as
//! `impl Engine` blocks:
//!
//! - league joins with atomic entry-fee settlement (`settlement`)
//! - leaderboard ranking and prize-pool distribution (`leaderboard`)
//! - deposits/withdrawals behind sliding-window limits (`payment`, `limits`)
//!
//! # Thread Safety
//!
//! All operations take `&self`; the store uses [`dashmap::DashMap`] tables
//! and per-account mutexes, so requests for different users proceed in
//! parallel while each user's money-moving operations serialize.

use crate::base::UserId;
use crate::error::EngineError;
use crate::ledger::Ledger;
use crate::payment::{InstantGateway, PaymentGateway};
use crate::transaction::TransactionKind;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

/// Central engine over the ledger store and payment gateway.
pub struct Engine {
    ledger: Ledger,
    gateway: Arc<dyn PaymentGateway>,
}

impl Engine {
    /// Creates an engine with an empty store and the given gateway.
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Engine {
            ledger: Ledger::new(),
            gateway,
        }
    }

    /// Creates an engine whose gateway completes every charge synchronously.
    ///
    /// Used by the CLI and tests; production callers pass a real gateway.
    pub fn with_instant_gateway() -> Self {
        Self::new(Arc::new(InstantGateway::new()))
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub(crate) fn gateway(&self) -> &dyn PaymentGateway {
        self.gateway.as_ref()
    }

    /// Balance plus lifetime completed deposit/withdrawal totals for a user.
    ///
    /// Pending and failed transactions never count toward the totals.
    pub fn user_summary(&self, user_id: UserId) -> Result<UserSummary, EngineError> {
        let account = self
            .ledger
            .account(user_id)
            .ok_or(EngineError::UserNotFound)?;
        Ok(UserSummary {
            user_id,
            display_name: account.display_name(),
            balance: account.balance(),
            deposited: self
                .ledger
                .transactions()
                .user_total(user_id, TransactionKind::Deposit),
            withdrawn: self
                .ledger
                .transactions()
                .user_total(user_id, TransactionKind::Withdrawal),
        })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_instant_gateway()
    }
}

/// Snapshot of one user's money state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub user_id: UserId,
    pub display_name: String,
    pub balance: Decimal,
    pub deposited: Decimal,
    pub withdrawn: Decimal,
}
