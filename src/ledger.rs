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

//! The ledger store: concurrent tables for every entity the engine reads
//! and writes.
//!
//! Point lookups return clones (or `Arc`s for accounts); row mutation goes
//! through the narrow `pub(crate)` surface the settlement and payment paths
//! use, so the multi-statement invariants stay inside those paths.

use crate::account::UserAccount;
use crate::base::{
    BetId, LeagueId, PlayerId, ProfileId, TeamId, TournamentId, TransactionId, UserId,
};
use crate::error::EngineError;
use crate::league::{League, Player, Reward, Tournament};
use crate::limits::SpendingLimit;
use crate::payment::WebhookFailure;
use crate::team::{Bet, Team};
use crate::transaction_log::TransactionLog;
use chrono::{DateTime, Utc};
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-process relational store for users, leagues, teams, bets, players,
/// and payment transactions.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: DashMap<UserId, Arc<UserAccount>>,
    leagues: DashMap<LeagueId, League>,
    tournaments: DashMap<TournamentId, Tournament>,
    players: DashMap<PlayerId, Player>,
    teams: DashMap<TeamId, Team>,
    bets: DashMap<BetId, Bet>,
    transactions: TransactionLog,

    /// Webhook events that could not be applied, kept for manual
    /// reconciliation (webhook delivery is always acknowledged).
    reconciliation: SegQueue<WebhookFailure>,

    /// Source for all generated row ids.
    next_id: AtomicU64,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ..Self::default()
        }
    }

    pub(crate) fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    // === Accounts ===

    /// Creates a user account with a fresh id.
    pub fn insert_account(
        &self,
        display_name: impl Into<String>,
        deposit_limit: Option<SpendingLimit>,
        withdrawal_limit: Option<SpendingLimit>,
    ) -> UserId {
        let user_id = UserId(self.allocate_id());
        let account = UserAccount::with_limits(
            user_id,
            display_name,
            deposit_limit,
            withdrawal_limit,
        );
        self.accounts.insert(user_id, Arc::new(account));
        user_id
    }

    /// Returns the account with the given id, creating an unlimited one if
    /// it does not exist yet.
    pub fn ensure_account(
        &self,
        user_id: UserId,
        display_name: impl Into<String>,
    ) -> Arc<UserAccount> {
        self.accounts
            .entry(user_id)
            .or_insert_with(|| Arc::new(UserAccount::new(user_id, display_name)))
            .clone()
    }

    pub fn account(&self, user_id: UserId) -> Option<Arc<UserAccount>> {
        self.accounts.get(&user_id).map(|a| a.clone())
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// All user ids currently in the store.
    pub fn user_ids(&self) -> Vec<UserId> {
        self.accounts.iter().map(|entry| *entry.key()).collect()
    }

    // === Tournaments & players ===

    pub fn insert_tournament(
        &self,
        name: impl Into<String>,
        starts_at: DateTime<Utc>,
    ) -> TournamentId {
        let id = TournamentId(self.allocate_id());
        self.tournaments.insert(
            id,
            Tournament {
                id,
                name: name.into(),
                starts_at,
            },
        );
        id
    }

    pub fn tournament(&self, id: TournamentId) -> Option<Tournament> {
        self.tournaments.get(&id).map(|t| t.clone())
    }

    pub fn insert_player(
        &self,
        tournament_id: TournamentId,
        profile_id: ProfileId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        level: u8,
    ) -> PlayerId {
        let id = PlayerId(self.allocate_id());
        self.players.insert(
            id,
            Player {
                id,
                profile_id,
                tournament_id,
                first_name: first_name.into(),
                last_name: last_name.into(),
                current_score: None,
                level,
                missed_cut: false,
            },
        );
        id
    }

    pub fn player(&self, id: PlayerId) -> Option<Player> {
        self.players.get(&id).map(|p| p.clone())
    }

    /// Updates a player's live score and cut status.
    pub fn update_player_score(
        &self,
        id: PlayerId,
        current_score: Option<i32>,
        missed_cut: bool,
    ) -> Result<(), EngineError> {
        let mut player = self
            .players
            .get_mut(&id)
            .ok_or_else(|| EngineError::Internal(format!("unknown player {id}")))?;
        player.current_score = current_score;
        player.missed_cut = missed_cut;
        Ok(())
    }

    /// Resolves profile ids to this tournament's player ids.
    ///
    /// All-or-nothing: if any profile has no player in the tournament, the
    /// whole batch is rejected listing every unmatched id.
    pub fn resolve_roster(
        &self,
        tournament_id: TournamentId,
        profile_ids: &[ProfileId],
    ) -> Result<Vec<PlayerId>, EngineError> {
        let mut resolved = Vec::with_capacity(profile_ids.len());
        let mut unmatched = Vec::new();

        for profile_id in profile_ids {
            let player_id = self
                .players
                .iter()
                .find(|p| p.tournament_id == tournament_id && p.profile_id == *profile_id)
                .map(|p| p.id);
            match player_id {
                Some(id) => resolved.push(id),
                None => unmatched.push(*profile_id),
            }
        }

        if unmatched.is_empty() {
            Ok(resolved)
        } else {
            Err(EngineError::InvalidPlayerReference { unmatched })
        }
    }

    // === Leagues ===

    pub fn insert_league(
        &self,
        name: impl Into<String>,
        tournament_id: TournamentId,
        entry_fee: Decimal,
        max_participants: Option<u32>,
        rewards: Vec<Reward>,
    ) -> LeagueId {
        let id = LeagueId(self.allocate_id());
        self.leagues.insert(
            id,
            League {
                id,
                name: name.into(),
                tournament_id,
                entry_fee,
                max_participants,
                rewards,
                joined_players: 0,
            },
        );
        id
    }

    pub fn league(&self, id: LeagueId) -> Option<League> {
        self.leagues.get(&id).map(|l| l.clone())
    }

    pub(crate) fn record_join(&self, id: LeagueId) {
        if let Some(mut league) = self.leagues.get_mut(&id) {
            league.joined_players += 1;
        }
    }

    // === Teams & bets ===

    pub(crate) fn insert_team(&self, team: Team) -> Result<(), EngineError> {
        match self.teams.entry(team.id) {
            Entry::Occupied(_) => Err(EngineError::Conflict),
            Entry::Vacant(entry) => {
                entry.insert(team);
                Ok(())
            }
        }
    }

    pub(crate) fn remove_team(&self, id: TeamId) {
        self.teams.remove(&id);
    }

    pub fn team(&self, id: TeamId) -> Option<Team> {
        self.teams.get(&id).map(|t| t.clone())
    }

    pub fn teams_in_league(&self, league_id: LeagueId) -> Vec<Team> {
        let mut teams: Vec<Team> = self
            .teams
            .iter()
            .filter(|t| t.league_id == league_id)
            .map(|t| t.clone())
            .collect();
        // Stable presentation order independent of map iteration.
        teams.sort_by_key(|t| t.id);
        teams
    }

    pub fn user_team_count(&self, user_id: UserId, league_id: LeagueId) -> u32 {
        self.teams
            .iter()
            .filter(|t| t.owner_id == user_id && t.league_id == league_id)
            .count() as u32
    }

    pub(crate) fn insert_bet(&self, bet: Bet) -> Result<(), EngineError> {
        match self.bets.entry(bet.id) {
            Entry::Occupied(_) => Err(EngineError::Conflict),
            Entry::Vacant(entry) => {
                entry.insert(bet);
                Ok(())
            }
        }
    }

    pub(crate) fn remove_bet(&self, id: BetId) {
        self.bets.remove(&id);
    }

    pub fn bet_for_team(&self, team_id: TeamId) -> Option<Bet> {
        self.bets
            .iter()
            .find(|b| b.team_id == team_id)
            .map(|b| b.clone())
    }

    pub fn bet_count(&self) -> usize {
        self.bets.len()
    }

    // === Transactions ===

    pub fn transactions(&self) -> &TransactionLog {
        &self.transactions
    }

    pub(crate) fn allocate_transaction_id(&self) -> TransactionId {
        TransactionId(self.allocate_id())
    }

    // === Webhook reconciliation ===

    pub(crate) fn push_webhook_failure(&self, failure: WebhookFailure) {
        self.reconciliation.push(failure);
    }

    /// Drains webhook events that failed to apply.
    pub fn drain_webhook_failures(&self) -> Vec<WebhookFailure> {
        let mut failures = Vec::new();
        while let Some(failure) = self.reconciliation.pop() {
            failures.push(failure);
        }
        failures
    }
}
