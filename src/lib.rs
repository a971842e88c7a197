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

//! # Fairway Ledger
//!
//! This library provides the money-and-ranking core of a fantasy-golf
//! wagering platform: users join paid leagues tied to golf tournaments,
//! assemble teams of players, and are ranked by aggregate score; winners
//! split a pot.
//!
//! ## Core Components
//!
//! - [`Engine::join_league`]: atomic entry-fee settlement — a team, its
//!   paired bet, and the balance debit are committed together or not at all
//! - [`Engine::leaderboard_at`]: deterministic ranking, rake'd pot, and
//!   per-position prize distribution
//! - [`check_limit`]: sliding-window (daily/weekly/monthly) deposit and
//!   withdrawal ceilings over completed transactions
//! - [`PaymentGateway`]: external payment processor seam, with webhook
//!   correlation and a reconciliation queue for events that fail to apply
//!
//! ## Example
//!
//! ```
//! use fairway_ledger::{Engine, JoinLeagueRequest};
//! use chrono::Utc;
//! use rust_decimal_macros::dec;
//!
//! let engine = Engine::with_instant_gateway();
//! let ledger = engine.ledger();
//!
//! let user = ledger.insert_account("Jordan", None, None);
//! let tournament = ledger.insert_tournament("The Open", Utc::now());
//! let league = ledger.insert_league("Open Pool", tournament, dec!(50), None, vec![]);
//!
//! engine.deposit(user, dec!(200), "tok_visa").unwrap();
//! let team = engine
//!     .join_league(user, JoinLeagueRequest {
//!         league_id: league,
//!         team_name: "Bunker Squad".into(),
//!         player_profile_ids: vec![],
//!     })
//!     .unwrap();
//!
//! assert_eq!(ledger.account(user).unwrap().balance(), dec!(150));
//! assert_eq!(ledger.bet_for_team(team.id).unwrap().amount, dec!(50));
//! ```
//!
//! ## Thread Safety
//!
//! The engine handles concurrent access across users; each user's
//! money-moving operations serialize on that user's account lock, so a
//! deposit completion and a concurrent team join can never lose an update.

pub mod account;
mod base;
mod engine;
pub mod error;
pub mod leaderboard;
mod ledger;
pub mod limits;
pub mod payment;
mod league;
mod settlement;
mod team;
mod transaction;
mod transaction_log;

pub use account::UserAccount;
pub use base::{
    BetId, LeagueId, PlayerId, ProfileId, TeamId, TournamentId, TransactionId, UserId,
};
pub use engine::{Engine, UserSummary};
pub use error::EngineError;
pub use leaderboard::{
    BEST_SCORES, Leaderboard, LeaderboardEntry, PlayerLine, PrizeShare, Round,
};
pub use ledger::Ledger;
pub use league::{League, Player, Reward, Tournament};
pub use limits::{LimitWindow, SpendingLimit, check_limit};
pub use payment::{
    CURRENCY, GatewayCharge, GatewayError, GatewayStatus, InstantGateway, PaymentGateway,
    WebhookEvent, WebhookFailure,
};
pub use settlement::JoinLeagueRequest;
pub use team::{Bet, Team};
pub use transaction::{PaymentStatus, Transaction, TransactionKind};
pub use transaction_log::TransactionLog;
