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

//! Leaderboard ranking and prize-pool distribution.
//!
//! A pure read-and-compute view over one league: no writes, safe to retry
//! or cache per league with a short TTL. Golf scoring throughout — lower
//! totals rank higher.

use crate::base::LeagueId;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::league::Player;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Serialize, Serializer};
use std::fmt;

/// How many of a team's player scores are reported as `best_scores`.
pub const BEST_SCORES: usize = 4;

/// Platform rake: fraction of collected fees kept out of the pot.
const POT_SHARE: Decimal = dec!(0.9);

/// Coarse 1-of-4 progress indicator for a tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Round {
    InProgress(u8),
    Finished,
}

impl Round {
    /// Derives the round from elapsed whole days since the tournament's
    /// start date, assuming the fixed 4-round structure.
    pub fn at(starts_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let days = (now.date_naive() - starts_at.date_naive()).num_days();
        if days >= 4 {
            Round::Finished
        } else {
            // Clamp to round 1 before the start date.
            Round::InProgress(days.max(0) as u8 + 1)
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Round::InProgress(n) => write!(f, "{n}/4"),
            Round::Finished => write!(f, "Tournament finished"),
        }
    }
}

impl Serialize for Round {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// One player's line on a team entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerLine {
    /// Rank group `A..E`, from the player's level.
    pub group: char,
    pub name: String,
    pub score: i32,
    /// `"MC"` for a missed cut, `"F"` otherwise.
    pub status: &'static str,
}

impl PlayerLine {
    fn from_player(player: &Player) -> Self {
        PlayerLine {
            group: player.group(),
            name: player.full_name(),
            score: player.score_or_zero(),
            status: if player.missed_cut { "MC" } else { "F" },
        }
    }
}

/// One ranked team on the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub team_name: String,
    pub owner_name: String,
    pub total_score: i32,
    /// Best (lowest) player scores, ascending, truncated to [`BEST_SCORES`].
    pub best_scores: Vec<i32>,
    pub players: Vec<PlayerLine>,
    pub prize: Decimal,
}

/// A prize actually applied to a ranked position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrizeShare {
    pub position: u32,
    pub amount: Decimal,
}

/// The computed leaderboard for one league.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
    /// `entry_fee × team_count × 0.9` — a fixed 10% platform rake.
    pub total_pot: Decimal,
    pub round: Round,
    pub prize_distribution: Vec<PrizeShare>,
}

impl Engine {
    /// Computes the leaderboard as of the current time.
    pub fn leaderboard(&self, league_id: LeagueId) -> Result<Leaderboard, EngineError> {
        self.leaderboard_at(league_id, Utc::now())
    }

    /// Computes the leaderboard for a league as of `now`.
    ///
    /// Teams are ranked by total golf score ascending; ties keep stable
    /// store order and receive consecutive ranks. Prizes come from the
    /// league's explicit reward shares applied to in-range positions only.
    /// Before the tournament starts, player detail, best scores, and prizes
    /// stay empty while ranks, names, and totals are already computed.
    ///
    /// # Errors
    ///
    /// - [`EngineError::LeagueNotFound`] / [`EngineError::TournamentNotFound`]
    /// - [`EngineError::UserNotFound`] - A team's owner is missing.
    /// - [`EngineError::Internal`] - A team references a missing player row.
    pub fn leaderboard_at(
        &self,
        league_id: LeagueId,
        now: DateTime<Utc>,
    ) -> Result<Leaderboard, EngineError> {
        let ledger = self.ledger();
        let league = ledger.league(league_id).ok_or(EngineError::LeagueNotFound)?;
        let tournament = ledger
            .tournament(league.tournament_id)
            .ok_or(EngineError::TournamentNotFound)?;

        let round = Round::at(tournament.starts_at, now);
        let started = now >= tournament.starts_at;

        let teams = ledger.teams_in_league(league_id);
        let total_pot = league.entry_fee * Decimal::from(teams.len() as u64) * POT_SHARE;

        let mut entries = Vec::with_capacity(teams.len());
        for team in &teams {
            let owner = ledger
                .account(team.owner_id)
                .ok_or(EngineError::UserNotFound)?;

            let mut players = Vec::with_capacity(team.player_ids.len());
            for player_id in &team.player_ids {
                let player = ledger.player(*player_id).ok_or_else(|| {
                    EngineError::Internal(format!(
                        "team {} references missing player {player_id}",
                        team.id
                    ))
                })?;
                players.push(player);
            }

            let total_score: i32 = players.iter().map(Player::score_or_zero).sum();
            let (best_scores, player_lines) = if started {
                let mut scores: Vec<i32> =
                    players.iter().map(Player::score_or_zero).collect();
                scores.sort_unstable();
                scores.truncate(BEST_SCORES);
                let lines = players.iter().map(PlayerLine::from_player).collect();
                (scores, lines)
            } else {
                (Vec::new(), Vec::new())
            };

            entries.push(LeaderboardEntry {
                rank: 0, // assigned after sorting
                team_name: team.name.clone(),
                owner_name: owner.display_name(),
                total_score,
                best_scores,
                players: player_lines,
                prize: Decimal::ZERO,
            });
        }

        // Stable sort: tied totals keep store order, ranks stay consecutive.
        entries.sort_by_key(|e| e.total_score);
        for (index, entry) in entries.iter_mut().enumerate() {
            entry.rank = index as u32 + 1;
        }

        let mut prize_distribution = Vec::new();
        if started {
            for reward in &league.rewards {
                let position = reward.position as usize;
                if position >= 1 && position <= entries.len() {
                    let amount = total_pot * reward.percentage;
                    entries[position - 1].prize = amount;
                    prize_distribution.push(PrizeShare {
                        position: reward.position,
                        amount,
                    });
                }
            }
        }

        Ok(Leaderboard {
            entries,
            total_pot,
            round,
            prize_distribution,
        })
    }
}
