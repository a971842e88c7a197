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

//! Leagues, tournaments, and tournament-scoped players.

use crate::base::{LeagueId, PlayerId, ProfileId, TournamentId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One prize share: `percentage` of the pot paid to the team ranked at
/// `position` (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub position: u32,
    pub percentage: Decimal,
}

/// A paid competition instance tied to one tournament.
///
/// `entry_fee` is immutable after creation; `joined_players` counts paid
/// entries and is bumped by the settlement unit on every join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: LeagueId,
    pub name: String,
    pub tournament_id: TournamentId,
    pub entry_fee: Decimal,
    /// Maximum teams one user may own in this league; `None` is unlimited.
    pub max_participants: Option<u32>,
    /// Ordered prize shares; percentages informally sum to at most 1.0.
    pub rewards: Vec<Reward>,
    pub joined_players: u32,
}

/// A golf tournament with a fixed 4-round structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub starts_at: DateTime<Utc>,
}

/// A golfer's entry in one tournament.
///
/// Scores are golf scores: signed, lower is better. A missing score counts
/// as 0 in team totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub profile_id: ProfileId,
    pub tournament_id: TournamentId,
    pub first_name: String,
    pub last_name: String,
    pub current_score: Option<i32>,
    /// Rank group level, 1 (group A) through 5 (group E).
    pub level: u8,
    pub missed_cut: bool,
}

impl Player {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Rank group letter derived from `level`; out-of-range levels clamp.
    pub fn group(&self) -> char {
        match self.level {
            0 | 1 => 'A',
            2 => 'B',
            3 => 'C',
            4 => 'D',
            _ => 'E',
        }
    }

    pub fn score_or_zero(&self) -> i32 {
        self.current_score.unwrap_or(0)
    }
}
