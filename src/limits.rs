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

//! Sliding-window deposit/withdrawal ceilings.
//!
//! Each window with a configured ceiling is checked against the sum of the
//! user's `Completed` transactions of the same kind created at or after the
//! window start. The first breached window rejects the payment; windows are
//! swept monthly → weekly → daily.
//!
//! The check is advisory at creation time: it does not hold a lock across
//! the check-then-create gap, so concurrent payments by the same user can
//! race past a ceiling. Callers that need strict enforcement must serialize
//! per user.

use crate::base::UserId;
use crate::error::EngineError;
use crate::ledger::Ledger;
use crate::transaction::TransactionKind;
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A rolling aggregation window for payment ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LimitWindow {
    Daily,
    Weekly,
    Monthly,
}

impl LimitWindow {
    /// The UTC instant where this window begins, relative to `now`.
    ///
    /// Daily starts at midnight today, weekly at the most recent Sunday
    /// midnight, monthly at the first of the current month.
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let first_day = match self {
            LimitWindow::Daily => today,
            LimitWindow::Weekly => today.week(Weekday::Sun).first_day(),
            LimitWindow::Monthly => first_of_month(today),
        };
        // Midnight exists for every date.
        first_day.and_hms_opt(0, 0, 0).unwrap().and_utc()
    }
}

impl fmt::Display for LimitWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitWindow::Daily => write!(f, "daily"),
            LimitWindow::Weekly => write!(f, "weekly"),
            LimitWindow::Monthly => write!(f, "monthly"),
        }
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    // Day 1 is valid in every month.
    date.with_day(1).unwrap()
}

/// Optional per-window ceilings for one payment direction.
///
/// A `None` window is unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingLimit {
    pub daily: Option<Decimal>,
    pub weekly: Option<Decimal>,
    pub monthly: Option<Decimal>,
}

impl SpendingLimit {
    pub fn new(
        daily: Option<Decimal>,
        weekly: Option<Decimal>,
        monthly: Option<Decimal>,
    ) -> Self {
        Self {
            daily,
            weekly,
            monthly,
        }
    }
}

/// Checks a requested payment against the user's configured ceilings.
///
/// Sweeps monthly, then weekly, then daily; aggregation stops at the first
/// breached window. Only `Completed` transactions count toward a window's
/// running total. That includes the compensating withdrawal rows recorded
/// by gateway-initiated refunds: a refunded deposit consumes withdrawal
/// ceiling like any other completed withdrawal.
///
/// # Errors
///
/// [`EngineError::PaymentLimitExceeded`] reporting the breached window, the
/// window's current total, and the configured ceiling.
pub fn check_limit(
    ledger: &Ledger,
    user_id: UserId,
    kind: TransactionKind,
    amount: Decimal,
    limits: &SpendingLimit,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let windows = [
        (LimitWindow::Monthly, limits.monthly),
        (LimitWindow::Weekly, limits.weekly),
        (LimitWindow::Daily, limits.daily),
    ];

    for (window, ceiling) in windows {
        let Some(limit) = ceiling else { continue };
        let current = ledger
            .transactions()
            .completed_total(user_id, kind, window.start(now));
        if current + amount > limit {
            return Err(EngineError::PaymentLimitExceeded {
                window,
                current,
                limit,
            });
        }
    }

    Ok(())
}
