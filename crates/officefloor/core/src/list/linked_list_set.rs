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

use officefloor_common::{ListError, OwnerId};
use std::fmt;

/// Handle to an entry of a [`LinkedListSet`].
///
/// Carries the owner tag of the list that allocated the entry and the
/// generation of its slot, so keys of another list or of a released entry
/// are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryKey {
    owner: OwnerId,
    index: usize,
    generation: u32,
}

impl EntryKey {
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}.{}", self.owner, self.index, self.generation)
    }
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
    linked: bool,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

/// Owner-checked doubly linked list stored in an arena.
///
/// Nodes live in a vector of generation-tagged slots and are linked by index.
/// An entry is either linked (in the list) or detached; adding a linked entry
/// or removing a detached one fails fast with a [`ListError`].
///
/// # Concurrency
/// Not internally synchronised. The owner keeps the list behind its own lock.
#[derive(Debug)]
pub struct LinkedListSet<T> {
    owner: OwnerId,
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> LinkedListSet<T> {
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Number of linked entries
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Allocate a detached entry owned by this list
    pub fn create_entry(&mut self, value: T) -> EntryKey {
        let node = Node {
            value,
            prev: None,
            next: None,
            linked: false,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot { generation: 0, node: Some(node) });
                self.slots.len() - 1
            }
        };
        self.key_at(index)
    }

    /// Allocate an entry and append it to the tail
    pub fn push(&mut self, value: T) -> EntryKey {
        let key = self.create_entry(value);
        self.link_tail(key.index);
        key
    }

    /// Append a detached entry to the tail
    ///
    /// # Errors
    /// * `WrongOwner` - the key belongs to another owner
    /// * `UnknownEntry` - the entry was released
    /// * `AlreadyInList` - the entry is already linked
    pub fn add_entry(&mut self, key: EntryKey) -> Result<(), ListError> {
        let index = self.resolve(key)?;
        if self.is_linked(index) {
            return Err(ListError::AlreadyInList(index));
        }
        self.link_tail(index);
        Ok(())
    }

    /// Detach an entry from wherever it sits, relinking its neighbours.
    /// The entry stays allocated and may be added again.
    pub fn remove_entry(&mut self, key: EntryKey) -> Result<(), ListError> {
        let index = self.resolve(key)?;
        if !self.is_linked(index) {
            return Err(ListError::NotInList(index));
        }
        self.unlink(index);
        Ok(())
    }

    /// Detach the entry if linked, release its slot and return the value.
    /// Every key to the entry becomes stale.
    pub fn take_entry(&mut self, key: EntryKey) -> Result<T, ListError> {
        let index = self.resolve(key)?;
        if self.is_linked(index) {
            self.unlink(index);
        }
        let slot = &mut self.slots[index];
        let node = slot.node.take().ok_or(ListError::UnknownEntry(index))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        Ok(node.value)
    }

    /// Whether the entry is currently linked into this list
    pub fn contains(&self, key: EntryKey) -> bool {
        self.resolve(key).map(|index| self.is_linked(index)).unwrap_or(false)
    }

    pub fn get(&self, key: EntryKey) -> Option<&T> {
        let index = self.resolve(key).ok()?;
        self.node(index).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, key: EntryKey) -> Option<&mut T> {
        let index = self.resolve(key).ok()?;
        self.node_mut(index).map(|node| &mut node.value)
    }

    pub fn head(&self) -> Option<EntryKey> {
        self.head.map(|index| self.key_at(index))
    }

    pub fn tail(&self) -> Option<EntryKey> {
        self.tail.map(|index| self.key_at(index))
    }

    /// Entry following `key`. Also valid on a purged chain.
    pub fn next(&self, key: EntryKey) -> Option<EntryKey> {
        let index = self.resolve(key).ok()?;
        self.node(index)?.next.map(|next| self.key_at(next))
    }

    pub fn prev(&self, key: EntryKey) -> Option<EntryKey> {
        let index = self.resolve(key).ok()?;
        self.node(index)?.prev.map(|prev| self.key_at(prev))
    }

    /// Detach the whole chain in one step and return its former head.
    ///
    /// The entries keep their `next`/`prev` links so the caller can walk the
    /// purged chain with [`next`](Self::next) or [`chain`](Self::chain). The
    /// walk must happen before any purged entry is added again or taken.
    pub fn purge_entries(&mut self) -> Option<EntryKey> {
        let head = self.head.take()?;
        self.tail = None;
        self.len = 0;

        let mut cursor = Some(head);
        while let Some(index) = cursor {
            match self.node_mut(index) {
                Some(node) => {
                    node.linked = false;
                    cursor = node.next;
                }
                None => break,
            }
        }

        Some(self.key_at(head))
    }

    /// Walk `next` links starting at `start`
    pub fn chain(&self, start: Option<EntryKey>) -> Chain<'_, T> {
        Chain {
            list: self,
            cursor: start.and_then(|key| self.resolve(key).ok()),
        }
    }

    /// Linked entries from head to tail
    pub fn iter(&self) -> Chain<'_, T> {
        Chain { list: self, cursor: self.head }
    }

    /// Immutable forward-ordered snapshot of the linked entries, or `None`
    /// when the list is empty.
    ///
    /// Built by walking backward from the tail. The live list may be mutated
    /// or purged while the snapshot is consumed.
    pub fn copy_entries(&self) -> Option<Box<ListEntry<T>>>
    where
        T: Clone,
    {
        let mut copy: Option<Box<ListEntry<T>>> = None;
        let mut cursor = self.tail;
        while let Some(index) = cursor {
            let Some(node) = self.node(index) else {
                break;
            };
            copy = Some(Box::new(ListEntry {
                entry: node.value.clone(),
                next: copy,
            }));
            cursor = node.prev;
        }
        copy
    }

    fn resolve(&self, key: EntryKey) -> Result<usize, ListError> {
        if key.owner != self.owner {
            return Err(ListError::WrongOwner {
                list_owner: self.owner,
                entry_owner: key.owner,
            });
        }
        match self.slots.get(key.index) {
            Some(slot) if slot.generation == key.generation && slot.node.is_some() => Ok(key.index),
            _ => Err(ListError::UnknownEntry(key.index)),
        }
    }

    fn key_at(&self, index: usize) -> EntryKey {
        EntryKey {
            owner: self.owner,
            index,
            generation: self.slots[index].generation,
        }
    }

    fn node(&self, index: usize) -> Option<&Node<T>> {
        self.slots.get(index).and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, index: usize) -> Option<&mut Node<T>> {
        self.slots.get_mut(index).and_then(|slot| slot.node.as_mut())
    }

    fn is_linked(&self, index: usize) -> bool {
        self.node(index).is_some_and(|node| node.linked)
    }

    fn link_tail(&mut self, index: usize) {
        let previous_tail = self.tail;
        match self.node_mut(index) {
            Some(node) => {
                node.prev = previous_tail;
                node.next = None;
                node.linked = true;
            }
            None => return,
        }

        match previous_tail {
            Some(tail) => {
                if let Some(node) = self.node_mut(tail) {
                    node.next = Some(index);
                }
            }
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
    }

    fn unlink(&mut self, index: usize) {
        let (prev, next) = match self.node_mut(index) {
            Some(node) => {
                node.linked = false;
                (node.prev.take(), node.next.take())
            }
            None => return,
        };

        match prev {
            Some(prev_index) => {
                if let Some(node) = self.node_mut(prev_index) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next_index) => {
                if let Some(node) = self.node_mut(next_index) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        self.len -= 1;
    }
}

/// Iterator following `next` links of a [`LinkedListSet`]
pub struct Chain<'a, T> {
    list: &'a LinkedListSet<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Chain<'a, T> {
    type Item = (EntryKey, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let node = self.list.node(index)?;
        self.cursor = node.next;
        Some((self.list.key_at(index), &node.value))
    }
}

/// Node of a snapshot produced by [`LinkedListSet::copy_entries`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry<T> {
    entry: T,
    next: Option<Box<ListEntry<T>>>,
}

impl<T> ListEntry<T> {
    pub fn entry(&self) -> &T {
        &self.entry
    }

    pub fn next(&self) -> Option<&ListEntry<T>> {
        self.next.as_deref()
    }

    pub fn iter(&self) -> ListEntryIter<'_, T> {
        ListEntryIter { cursor: Some(self) }
    }
}

// Unlink iteratively so long snapshots do not recurse on drop
impl<T> Drop for ListEntry<T> {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut entry) = next {
            next = entry.next.take();
        }
    }
}

pub struct ListEntryIter<'a, T> {
    cursor: Option<&'a ListEntry<T>>,
}

impl<'a, T> Iterator for ListEntryIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        self.cursor = current.next();
        Some(&current.entry)
    }
}
