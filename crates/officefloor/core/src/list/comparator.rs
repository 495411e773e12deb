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

use super::linked_list_set::{EntryKey, LinkedListSet};
use officefloor_common::{ListError, OwnerId};
use std::ops::Deref;

/// Notion of equality used to deduplicate entries
pub trait EntryComparator<T> {
    fn is_equal(&self, existing: &T, candidate: &T) -> bool;
}

impl<T, F> EntryComparator<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    fn is_equal(&self, existing: &T, candidate: &T) -> bool {
        self(existing, candidate)
    }
}

/// Linked list set that ignores additions of entries equal to one already
/// linked.
///
/// Equality is checked with a linear scan from the head, which suits the
/// small per-owner lists this is used for.
#[derive(Debug)]
pub struct ComparatorLinkedListSet<T, C> {
    list: LinkedListSet<T>,
    comparator: C,
}

impl<T, C> ComparatorLinkedListSet<T, C>
where
    C: EntryComparator<T>,
{
    pub fn new(owner: OwnerId, comparator: C) -> Self {
        Self {
            list: LinkedListSet::new(owner),
            comparator,
        }
    }

    pub fn create_entry(&mut self, value: T) -> EntryKey {
        self.list.create_entry(value)
    }

    /// Append the entry unless an equal entry is already linked.
    ///
    /// Returns `Ok(false)` for the no-op case; the entry then stays detached.
    pub fn add_entry(&mut self, key: EntryKey) -> Result<bool, ListError> {
        if self.list.contains(key) {
            return Err(ListError::AlreadyInList(key.index()));
        }
        let candidate = match self.list.get(key) {
            Some(candidate) => candidate,
            None if key.owner() != self.list.owner() => {
                return Err(ListError::WrongOwner {
                    list_owner: self.list.owner(),
                    entry_owner: key.owner(),
                });
            }
            None => return Err(ListError::UnknownEntry(key.index())),
        };

        if self.list.iter().any(|(_, existing)| self.comparator.is_equal(existing, candidate)) {
            return Ok(false);
        }

        self.list.add_entry(key)?;
        Ok(true)
    }

    /// Allocate and append `value`, or drop it when an equal entry exists
    pub fn push(&mut self, value: T) -> Option<EntryKey> {
        if self.list.iter().any(|(_, existing)| self.comparator.is_equal(existing, &value)) {
            return None;
        }
        Some(self.list.push(value))
    }

    pub fn remove_entry(&mut self, key: EntryKey) -> Result<(), ListError> {
        self.list.remove_entry(key)
    }

    pub fn take_entry(&mut self, key: EntryKey) -> Result<T, ListError> {
        self.list.take_entry(key)
    }

    pub fn purge_entries(&mut self) -> Option<EntryKey> {
        self.list.purge_entries()
    }
}

// Read access only: mutation must go through the deduplicating wrapper
impl<T, C> Deref for ComparatorLinkedListSet<T, C> {
    type Target = LinkedListSet<T>;

    fn deref(&self) -> &Self::Target {
        &self.list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Listener {
        name: &'static str,
        priority: u8,
    }

    fn by_name(existing: &Listener, candidate: &Listener) -> bool {
        existing.name == candidate.name
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let mut set = ComparatorLinkedListSet::new(OwnerId::new(), by_name);
        let first = set.create_entry(Listener { name: "pool", priority: 1 });
        let second = set.create_entry(Listener { name: "pool", priority: 2 });
        let other = set.create_entry(Listener { name: "cache", priority: 1 });

        assert_eq!(set.add_entry(first), Ok(true));
        assert_eq!(set.add_entry(second), Ok(false));
        assert_eq!(set.add_entry(other), Ok(true));

        let priorities: Vec<_> = set.iter().map(|(_, l)| (l.name, l.priority)).collect();
        assert_eq!(priorities, vec![("pool", 1), ("cache", 1)]);
        assert!(!set.contains(second));
    }

    #[test]
    fn test_push_drops_duplicates() {
        let mut set = ComparatorLinkedListSet::new(OwnerId::new(), |a: &u32, b: &u32| a % 10 == b % 10);
        assert!(set.push(1).is_some());
        assert!(set.push(11).is_none());
        assert!(set.push(2).is_some());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_removed_entry_no_longer_blocks() {
        let mut set = ComparatorLinkedListSet::new(OwnerId::new(), |a: &&str, b: &&str| a == b);
        let key = set.push("job").unwrap();
        set.remove_entry(key).unwrap();
        assert_eq!(set.add_entry(key), Ok(true));
        assert_eq!(set.add_entry(key), Err(ListError::AlreadyInList(key.index())));
    }

    #[test]
    fn test_foreign_key_rejected() {
        let mut mine = ComparatorLinkedListSet::new(OwnerId::new(), |a: &i32, b: &i32| a == b);
        let mut theirs = LinkedListSet::new(OwnerId::new());
        let key = theirs.create_entry(5);
        assert!(matches!(mine.add_entry(key), Err(ListError::WrongOwner { .. })));
    }
}
