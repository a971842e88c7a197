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

//! Teams and their paired bet records.
//!
//! Invariant: for every [`Team`] there is exactly one [`Bet`] with matching
//! owner, league, and team ids, and `amount` equal to the league's entry fee
//! at the time of the join. The settlement unit creates both or neither.

use crate::base::{BetId, LeagueId, PlayerId, TeamId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A user's roster entry into a league; exactly one per paid bet.
///
/// `player_ids` are tournament-scoped ids, resolved from profile ids once
/// at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub owner_id: UserId,
    pub league_id: LeagueId,
    pub name: String,
    pub player_ids: Vec<PlayerId>,
}

/// The financial record of a team's entry fee; immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    pub owner_id: UserId,
    pub league_id: LeagueId,
    pub team_id: TeamId,
    pub amount: Decimal,
}
