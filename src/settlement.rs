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

//! League joins: team creation with atomic entry-fee settlement.
//!
//! The central correctness property of the subsystem: a team must never
//! exist without its fee having been collected, and a fee must never be
//! collected without a team. The three writes (bet insert, team insert,
//! balance debit) happen while holding the owner's account lock, with the
//! balance and team-count preconditions re-validated under the lock; any
//! failure inside the unit removes the rows already inserted.
//!
//! No external calls happen inside the unit — payment capture already
//! happened at deposit time, this only moves an already-held balance.

use crate::base::{BetId, LeagueId, ProfileId, TeamId, UserId};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::team::{Bet, Team};
use rust_decimal::Decimal;

/// Maximum accepted team name length.
const MAX_TEAM_NAME: usize = 64;

/// A request to join a league with a new team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinLeagueRequest {
    pub league_id: LeagueId,
    pub team_name: String,
    /// Golfer profiles for the roster; resolved against the league's
    /// tournament. May be empty (roster picked later).
    pub player_profile_ids: Vec<ProfileId>,
}

impl JoinLeagueRequest {
    /// Field-level validation, stopping at the first violated constraint.
    fn validate(&self) -> Result<(), EngineError> {
        if self.team_name.trim().is_empty() {
            return Err(EngineError::Validation("team name must not be empty".into()));
        }
        if self.team_name.len() > MAX_TEAM_NAME {
            return Err(EngineError::Validation(format!(
                "team name must be at most {MAX_TEAM_NAME} characters"
            )));
        }
        let mut seen = self.player_profile_ids.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != self.player_profile_ids.len() {
            return Err(EngineError::Validation(
                "duplicate player profiles in roster".into(),
            ));
        }
        Ok(())
    }
}

impl Engine {
    /// Joins a league: creates a team, its paired bet, and collects the
    /// entry fee, all-or-nothing.
    ///
    /// Preconditions are checked in order, each a distinct failure:
    ///
    /// 1. League exists.
    /// 2. Balance covers the entry fee.
    /// 3. The league's tournament exists.
    /// 4. User's team count in the league is below `max_participants`.
    /// 5. Every supplied profile resolves to a tournament player.
    ///
    /// A violated precondition aborts before the atomic unit with zero side
    /// effects. Retrying is safe: preconditions are re-validated from
    /// scratch on every call.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Validation`] - Malformed request.
    /// - [`EngineError::LeagueNotFound`] / [`EngineError::TournamentNotFound`] /
    ///   [`EngineError::UserNotFound`] - Missing rows.
    /// - [`EngineError::InsufficientBalance`] - Fee exceeds the balance.
    /// - [`EngineError::TeamLimitExceeded`] - League's per-user team cap hit.
    /// - [`EngineError::InvalidPlayerReference`] - Profiles not in the
    ///   tournament roster (whole batch rejected).
    /// - [`EngineError::Conflict`] - Duplicate key detected at commit time.
    pub fn join_league(
        &self,
        user_id: UserId,
        request: JoinLeagueRequest,
    ) -> Result<Team, EngineError> {
        request.validate()?;
        let ledger = self.ledger();

        let league = ledger
            .league(request.league_id)
            .ok_or(EngineError::LeagueNotFound)?;
        let account = ledger.account(user_id).ok_or(EngineError::UserNotFound)?;

        let available = account.balance();
        if available < league.entry_fee {
            return Err(EngineError::InsufficientBalance {
                required: league.entry_fee,
                available,
            });
        }

        let tournament = ledger
            .tournament(league.tournament_id)
            .ok_or(EngineError::TournamentNotFound)?;

        if let Some(max) = league.max_participants {
            if ledger.user_team_count(user_id, league.id) >= max {
                return Err(EngineError::TeamLimitExceeded { max });
            }
        }

        let player_ids = ledger.resolve_roster(tournament.id, &request.player_profile_ids)?;

        // === Atomic unit ===
        // The owner's account lock serializes every join and balance
        // mutation for this user, so the re-checks below cannot race.
        let mut funds = account.lock();

        if let Some(max) = league.max_participants {
            if ledger.user_team_count(user_id, league.id) >= max {
                return Err(EngineError::TeamLimitExceeded { max });
            }
        }
        if funds.balance() < league.entry_fee {
            return Err(EngineError::InsufficientBalance {
                required: league.entry_fee,
                available: funds.balance(),
            });
        }

        let team = Team {
            id: TeamId(ledger.allocate_id()),
            owner_id: user_id,
            league_id: league.id,
            name: request.team_name,
            player_ids,
        };
        let bet_id = BetId(ledger.allocate_id());
        let bet = Bet {
            id: bet_id,
            owner_id: user_id,
            league_id: league.id,
            team_id: team.id,
            amount: league.entry_fee,
        };

        // The bet lands before the team, so a concurrent reader never
        // observes a team without its paired bet.
        ledger.insert_bet(bet)?;
        if let Err(error) = ledger.insert_team(team.clone()) {
            ledger.remove_bet(bet_id);
            return Err(error);
        }

        // Free leagues skip the debit; the zero-amount bet still records
        // the entry.
        if league.entry_fee > Decimal::ZERO {
            if let Err(error) = funds.debit(league.entry_fee) {
                // Roll back both inserts, team first so no reader catches
                // it without its bet; the balance was never touched.
                ledger.remove_team(team.id);
                ledger.remove_bet(bet_id);
                return Err(error);
            }
        }

        ledger.record_join(league.id);
        Ok(team)
    }
}
