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

//! User account management.
//!
//! Balance mutations go through atomic [`UserAccount::credit`] and
//! [`UserAccount::debit`] under the account's mutex; there is no
//! read-then-write of the balance anywhere in the engine, so a deposit
//! completion and a concurrent entry-fee debit cannot lose an update.
//!
//! # Example
//!
//! ```
//! use fairway_ledger::{UserAccount, UserId};
//! use rust_decimal::Decimal;
//!
//! let account = UserAccount::new(UserId(1), "Jordan");
//! assert_eq!(account.balance(), Decimal::ZERO);
//! ```

use crate::base::UserId;
use crate::error::EngineError;
use crate::limits::SpendingLimit;
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;

#[derive(Debug)]
pub(crate) struct AccountData {
    user_id: UserId,
    display_name: String,
    balance: Decimal,
    betting_limit: Option<Decimal>,
    deposit_limit: Option<SpendingLimit>,
    withdrawal_limit: Option<SpendingLimit>,
}

impl AccountData {
    fn new(user_id: UserId, display_name: String) -> Self {
        Self {
            user_id,
            display_name,
            balance: Decimal::ZERO,
            betting_limit: None,
            deposit_limit: None,
            withdrawal_limit: None,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= Decimal::ZERO,
            "Invariant violated: balance went negative: {}",
            self.balance
        );
    }

    pub(crate) fn balance(&self) -> Decimal {
        self.balance
    }

    /// Increases the balance.
    pub(crate) fn credit(&mut self, amount: Decimal) -> Result<(), EngineError> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "credit amount must be positive".into(),
            ));
        }
        self.balance += amount;
        self.assert_invariants();
        Ok(())
    }

    /// Decreases the balance; never lets it go negative.
    pub(crate) fn debit(&mut self, amount: Decimal) -> Result<(), EngineError> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "debit amount must be positive".into(),
            ));
        }
        if self.balance < amount {
            return Err(EngineError::InsufficientBalance {
                required: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.assert_invariants();
        Ok(())
    }
}

/// A user's wallet: display name, balance, and payment ceilings.
#[derive(Debug)]
pub struct UserAccount {
    inner: Mutex<AccountData>,
}

impl UserAccount {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(AccountData::new(user_id, display_name.into())),
        }
    }

    pub fn with_limits(
        user_id: UserId,
        display_name: impl Into<String>,
        deposit_limit: Option<SpendingLimit>,
        withdrawal_limit: Option<SpendingLimit>,
    ) -> Self {
        let account = Self::new(user_id, display_name);
        {
            let mut data = account.inner.lock();
            data.deposit_limit = deposit_limit;
            data.withdrawal_limit = withdrawal_limit;
        }
        account
    }

    pub fn user_id(&self) -> UserId {
        self.inner.lock().user_id
    }

    pub fn display_name(&self) -> String {
        self.inner.lock().display_name.clone()
    }

    pub fn balance(&self) -> Decimal {
        self.inner.lock().balance
    }

    pub fn betting_limit(&self) -> Option<Decimal> {
        self.inner.lock().betting_limit
    }

    pub fn set_betting_limit(&self, limit: Option<Decimal>) {
        self.inner.lock().betting_limit = limit;
    }

    pub fn deposit_limit(&self) -> Option<SpendingLimit> {
        self.inner.lock().deposit_limit
    }

    pub fn withdrawal_limit(&self) -> Option<SpendingLimit> {
        self.inner.lock().withdrawal_limit
    }

    /// Atomically credits the balance (deposit completion, refund reversal).
    pub fn credit(&self, amount: Decimal) -> Result<(), EngineError> {
        self.inner.lock().credit(amount)
    }

    /// Atomically debits the balance (withdrawal completion).
    ///
    /// # Errors
    ///
    /// [`EngineError::InsufficientBalance`] reporting required vs available.
    pub fn debit(&self, amount: Decimal) -> Result<(), EngineError> {
        self.inner.lock().debit(amount)
    }

    /// Takes the account lock for a multi-statement settlement unit.
    ///
    /// While the guard is held, no other balance mutation or settlement for
    /// this user can interleave; the settlement path re-validates its
    /// preconditions against the guard before writing.
    pub(crate) fn lock(&self) -> MutexGuard<'_, AccountData> {
        self.inner.lock()
    }
}
