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

//! Owner-checked linked list sets
//!
//! Bookkeeping collections for entries that belong to a single logical owner
//! (workers of a team, listeners of a process):
//! - Arena-backed doubly linked list with owner and generation checks
//! - Deduplicating variant driven by a comparator

pub mod comparator;
pub mod linked_list_set;

pub use comparator::{ComparatorLinkedListSet, EntryComparator};
pub use linked_list_set::{Chain, EntryKey, LinkedListSet, ListEntry, ListEntryIter};
