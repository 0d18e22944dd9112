use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Title of the implicit default list rendered at `/`.
pub const DEFAULT_LIST_TITLE: &str = "Today";

const DEFAULT_ITEM_NAMES: [&str; 3] = [
    "Welcome to your todolist!",
    "Hit the + button to add a new item.",
    "<-- Hit this to delete an item.",
];

/// Opaque identifier assigned to an item when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(raw.trim()).map(Self)
    }
}

/// Opaque identifier of a custom list record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(Uuid);

impl ListId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: ItemId,
    pub name: String,
}

impl Item {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
        }
    }
}

/// A named list of items, stored as a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    #[serde(rename = "_id")]
    pub id: ListId,
    pub name: String,
    pub items: Vec<Item>,
}

impl TodoList {
    /// Builds a fresh list seeded with [`default_items`].
    pub fn seeded(name: impl Into<String>) -> Self {
        Self {
            id: ListId::new(),
            name: name.into(),
            items: default_items(),
        }
    }
}

/// The seed items, with fresh ids on every call.
pub fn default_items() -> Vec<Item> {
    DEFAULT_ITEM_NAMES.iter().copied().map(Item::new).collect()
}

/// Uppercases the first character and leaves the rest untouched, so
/// `today` and `Today` fold together while `TODAY` stays distinct.
pub fn normalize_list_name(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn is_default_list(name: &str) -> bool {
    name == DEFAULT_LIST_TITLE
}

/// Raw body of `POST /`.
#[derive(Debug, Default, Deserialize)]
pub struct NewItemForm {
    #[serde(rename = "newItem")]
    pub new_item: Option<String>,
    pub list: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub list: String,
}

impl NewItemForm {
    pub fn validate(self) -> AppResult<NewItem> {
        let name = required(self.new_item, "newItem")?.trim().to_string();
        let list = required(self.list, "list")?;
        Ok(NewItem { name, list })
    }
}

/// Raw body of `POST /delete`.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteItemForm {
    pub checkbox: Option<String>,
    #[serde(rename = "listName")]
    pub list_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteItem {
    pub id: ItemId,
    pub list: String,
}

impl DeleteItemForm {
    pub fn validate(self) -> AppResult<DeleteItem> {
        let raw_id = required(self.checkbox, "checkbox")?;
        let id = raw_id
            .parse::<ItemId>()
            .map_err(|_| AppError::validation(format!("'{raw_id}' is not a valid item id")))?;
        let list = required(self.list_name, "listName")?;
        Ok(DeleteItem { id, list })
    }
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::validation(format!("{field} is required"))),
    }
}
