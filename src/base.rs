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

//! Core identifier types for the entities the ledger stores.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Unique identifier for a user account.
    UserId
);

id_type!(
    /// Unique identifier for a league (one paid competition tied to a tournament).
    LeagueId
);

id_type!(
    /// Unique identifier for a tournament.
    TournamentId
);

id_type!(
    /// Unique identifier for a team (one paid roster entry into a league).
    TeamId
);

id_type!(
    /// Unique identifier for a bet (the financial record paired 1:1 with a team).
    BetId
);

id_type!(
    /// Unique identifier for a tournament-scoped player.
    ///
    /// Distinct from [`ProfileId`]: one golfer profile produces one player
    /// row per tournament it appears in.
    PlayerId
);

id_type!(
    /// Unique identifier for a golfer profile.
    ProfileId
);

id_type!(
    /// Unique identifier for a payment transaction.
    TransactionId
);
