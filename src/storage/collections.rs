use serde::{Deserialize, Serialize};

use super::error::{StoreError, StoreResult};
use super::persistence::JournalEntry;
use crate::models::{Item, ItemId, ListId, TodoList};

/// The two logical collections of the store.
///
/// `items` is the bare default collection; `lists` holds one document per
/// custom list. Both keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collections {
    pub items: Vec<Item>,
    pub lists: Vec<TodoList>,
}

impl Collections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn list(&self, name: &str) -> Option<&TodoList> {
        self.lists.iter().find(|list| list.name == name)
    }

    pub fn list_by_id(&self, id: ListId) -> Option<&TodoList> {
        self.lists.iter().find(|list| list.id == id)
    }

    fn list_mut(&mut self, name: &str) -> Option<&mut TodoList> {
        self.lists.iter_mut().find(|list| list.name == name)
    }

    /// Checks that `entry` can be applied without error.
    ///
    /// Called before the entry is journaled so a rejected write never
    /// reaches disk.
    pub fn check(&self, entry: &JournalEntry) -> StoreResult<()> {
        match entry {
            JournalEntry::InsertList { list } => {
                if self.list(&list.name).is_some() {
                    return Err(StoreError::DuplicateList(list.name.clone()));
                }
            }
            JournalEntry::ReplaceList { list } => {
                if self.list_by_id(list.id).is_none() {
                    return Err(StoreError::NotFound(list.name.clone()));
                }
                if self
                    .list(&list.name)
                    .is_some_and(|existing| existing.id != list.id)
                {
                    return Err(StoreError::DuplicateList(list.name.clone()));
                }
            }
            JournalEntry::PushItem { list, .. } => {
                if self.list(list).is_none() {
                    return Err(StoreError::NotFound(list.clone()));
                }
            }
            JournalEntry::InsertItems { .. }
            | JournalEntry::DeleteItem { .. }
            | JournalEntry::PullItem { .. } => {}
        }
        Ok(())
    }

    /// Applies a journaled mutation. Returns whether anything changed.
    pub fn apply(&mut self, entry: JournalEntry) -> StoreResult<bool> {
        self.check(&entry)?;

        let changed = match entry {
            JournalEntry::InsertItems { items } => {
                let changed = !items.is_empty();
                self.items.extend(items);
                changed
            }
            JournalEntry::DeleteItem { id } => {
                let before = self.items.len();
                self.items.retain(|item| item.id != id);
                self.items.len() != before
            }
            JournalEntry::InsertList { list } => {
                self.lists.push(list);
                true
            }
            JournalEntry::ReplaceList { list } => {
                let id = list.id;
                match self.lists.iter_mut().find(|stored| stored.id == id) {
                    Some(stored) => {
                        *stored = list;
                        true
                    }
                    None => false,
                }
            }
            JournalEntry::PushItem { list, item } => match self.list_mut(&list) {
                Some(stored) => {
                    stored.items.push(item);
                    true
                }
                None => false,
            },
            JournalEntry::PullItem { list, id } => match self.list_mut(&list) {
                Some(stored) => {
                    let before = stored.items.len();
                    stored.items.retain(|item| item.id != id);
                    stored.items.len() != before
                }
                None => false,
            },
        };

        Ok(changed)
    }
}
