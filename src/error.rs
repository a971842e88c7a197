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

//! Error types for settlement, leaderboard, and limit operations.

use crate::base::ProfileId;
use crate::limits::LimitWindow;
use rust_decimal::Decimal;
use thiserror::Error;

/// Engine processing errors.
///
/// Every precondition failure is a distinct, user-reportable variant;
/// [`EngineError::Internal`] covers store failures surfaced from inside an
/// atomic unit, after which the caller may retry the whole operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Referenced league does not exist
    #[error("league not found")]
    LeagueNotFound,

    /// League references a tournament that does not exist
    #[error("tournament not found")]
    TournamentNotFound,

    /// Referenced user does not exist
    #[error("user not found")]
    UserNotFound,

    /// Malformed or missing required input; reports the first violated constraint
    #[error("invalid request: {0}")]
    Validation(String),

    /// Balance does not cover the requested amount
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },

    /// User already owns the maximum number of teams in this league
    #[error("league team limit reached (maximum {max})")]
    TeamLimitExceeded { max: u32 },

    /// A sliding-window deposit/withdrawal ceiling would be breached
    #[error("{window} limit exceeded: {current} already counted against ceiling {limit}")]
    PaymentLimitExceeded {
        window: LimitWindow,
        current: Decimal,
        limit: Decimal,
    },

    /// Profile IDs with no matching player in the tournament roster
    #[error("profiles not in tournament roster: {unmatched:?}")]
    InvalidPlayerReference { unmatched: Vec<ProfileId> },

    /// Concurrent update detected at commit time (duplicate key, replayed completion)
    #[error("conflicting concurrent update")]
    Conflict,

    /// Store or gateway failure inside an operation
    #[error("internal error: {0}")]
    Internal(String),
}
