// OfficeFloor Execution
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Shared types for the OfficeFloor execution core.
//!
//! Identifiers, error enums and the environment-driven configuration used by
//! every team and by the `floor-teams` command line tool.

pub mod config; // Environment configuration and retry policy
pub mod error; // Error enums per concern
pub mod ids; // Team and owner identifiers

pub use config::{ExecutionConfig, RetryPolicy};
pub use error::{ConfigError, ListError, TeamError};
pub use ids::{OwnerId, TeamId};
