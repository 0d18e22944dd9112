use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::{
    models::{Item, ItemId, ListId, TodoList, default_items},
    storage::{Collections, DurabilityMode, JournalEntry, PersistenceManager, StoreResult},
};

/// Document-store operations used by the route handlers.
///
/// Every mutation is atomic with respect to the others. `push_item` and
/// `pull_item` address a list by name and never read-modify-write from the
/// caller's side.
#[async_trait]
pub trait ListRepository: Send + Sync {
    async fn find_items(&self) -> StoreResult<Vec<Item>>;
    async fn find_item(&self, id: ItemId) -> StoreResult<Option<Item>>;
    async fn insert_items(&self, items: Vec<Item>) -> StoreResult<()>;
    async fn insert_item(&self, item: Item) -> StoreResult<()>;
    async fn delete_item(&self, id: ItemId) -> StoreResult<bool>;
    /// Inserts the default items only if the default collection is empty.
    async fn seed_default_items(&self) -> StoreResult<bool>;

    async fn find_list(&self, name: &str) -> StoreResult<Option<TodoList>>;
    async fn find_list_by_id(&self, id: ListId) -> StoreResult<Option<TodoList>>;
    async fn insert_list(&self, list: TodoList) -> StoreResult<()>;
    async fn update_list(&self, list: TodoList) -> StoreResult<()>;
    async fn push_item(&self, list: &str, item: Item) -> StoreResult<()>;
    async fn pull_item(&self, list: &str, id: ItemId) -> StoreResult<bool>;
    async fn list_names(&self) -> StoreResult<Vec<String>>;
}

struct StoreInner {
    data: Collections,
    persistence: Option<PersistenceManager>,
}

impl StoreInner {
    /// Journals `entry` and then applies it. Validation runs first so a
    /// rejected write is never logged.
    ///
    /// Once the entry is journaled the write has succeeded. A failed
    /// automatic checkpoint is logged and retried on the next commit.
    async fn commit(&mut self, entry: JournalEntry) -> StoreResult<bool> {
        self.data.check(&entry)?;

        if let Some(persistence) = self.persistence.as_mut() {
            persistence.log(&entry).await?;
        }
        let changed = self.data.apply(entry)?;

        if let Some(persistence) = self.persistence.as_mut()
            && persistence.needs_checkpoint()
            && let Err(err) = persistence.checkpoint(&self.data).await
        {
            error!(
                error = %err,
                pending = persistence.pending_entries(),
                "automatic checkpoint failed; journal kept"
            );
        }

        Ok(changed)
    }
}

/// In-memory document store with optional journal/snapshot durability.
pub struct DocumentStore {
    inner: RwLock<StoreInner>,
}

impl DocumentStore {
    pub fn in_memory() -> Self {
        Self::from_parts(Collections::new(), None)
    }

    /// Opens (or creates) a store in `data_dir`, replaying any journal left
    /// over from the previous run.
    pub async fn open<P: AsRef<Path>>(
        data_dir: P,
        durability_mode: DurabilityMode,
        checkpoint_threshold: usize,
    ) -> StoreResult<Self> {
        let Some(mut persistence) = PersistenceManager::open(&data_dir, durability_mode).await?
        else {
            info!("document store running in memory only");
            return Ok(Self::in_memory());
        };

        persistence.set_checkpoint_threshold(checkpoint_threshold);
        let data = persistence.recover().await?;
        info!(
            data_dir = %persistence.data_dir().display(),
            default_items = data.items.len(),
            lists = data.lists.len(),
            replayed = persistence.pending_entries(),
            "document store recovered"
        );

        Ok(Self::from_parts(data, Some(persistence)))
    }

    fn from_parts(data: Collections, persistence: Option<PersistenceManager>) -> Self {
        Self {
            inner: RwLock::new(StoreInner { data, persistence }),
        }
    }

    /// Writes a snapshot and truncates the journal.
    pub async fn checkpoint(&self) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let StoreInner { data, persistence } = &mut *inner;
        if let Some(persistence) = persistence.as_mut() {
            persistence.checkpoint(data).await?;
        }
        Ok(())
    }

    pub async fn is_durable(&self) -> bool {
        self.inner.read().await.persistence.is_some()
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[async_trait]
impl ListRepository for DocumentStore {
    async fn find_items(&self) -> StoreResult<Vec<Item>> {
        Ok(self.inner.read().await.data.items.clone())
    }

    async fn find_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.inner.read().await.data.item(id).cloned())
    }

    async fn insert_items(&self, items: Vec<Item>) -> StoreResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.inner
            .write()
            .await
            .commit(JournalEntry::InsertItems { items })
            .await?;
        Ok(())
    }

    async fn insert_item(&self, item: Item) -> StoreResult<()> {
        self.insert_items(vec![item]).await
    }

    async fn delete_item(&self, id: ItemId) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.data.item(id).is_none() {
            debug!(%id, "delete of unknown default item ignored");
            return Ok(false);
        }
        inner.commit(JournalEntry::DeleteItem { id }).await
    }

    async fn seed_default_items(&self) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if !inner.data.items.is_empty() {
            return Ok(false);
        }
        inner
            .commit(JournalEntry::InsertItems {
                items: default_items(),
            })
            .await
    }

    async fn find_list(&self, name: &str) -> StoreResult<Option<TodoList>> {
        Ok(self.inner.read().await.data.list(name).cloned())
    }

    async fn find_list_by_id(&self, id: ListId) -> StoreResult<Option<TodoList>> {
        Ok(self.inner.read().await.data.list_by_id(id).cloned())
    }

    async fn insert_list(&self, list: TodoList) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .commit(JournalEntry::InsertList { list })
            .await?;
        Ok(())
    }

    async fn update_list(&self, list: TodoList) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .commit(JournalEntry::ReplaceList { list })
            .await?;
        Ok(())
    }

    async fn push_item(&self, list: &str, item: Item) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .commit(JournalEntry::PushItem {
                list: list.to_string(),
                item,
            })
            .await?;
        Ok(())
    }

    async fn pull_item(&self, list: &str, id: ItemId) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let present = inner
            .data
            .list(list)
            .is_some_and(|stored| stored.items.iter().any(|item| item.id == id));
        if !present {
            debug!(list, %id, "pull of unknown item ignored");
            return Ok(false);
        }
        inner
            .commit(JournalEntry::PullItem {
                list: list.to_string(),
                id,
            })
            .await
    }

    async fn list_names(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .inner
            .read()
            .await
            .data
            .lists
            .iter()
            .map(|list| list.name.clone())
            .collect())
    }
}
