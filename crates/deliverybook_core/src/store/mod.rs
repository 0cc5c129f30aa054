//! Async record store shared by every directory component.
//!
//! # Responsibility
//! - Own the only connection to the contacts database.
//! - Run repository calls on tokio's blocking pool so callers never block.
//! - Announce every effective mutation through a revision channel that
//!   drives the live recency and count scans.
//!
//! # Invariants
//! - Operations on the same contact id run in submission order. The per-id
//!   guard moves into the blocking closure, so it is held until the SQL has
//!   finished even when the awaiting caller is cancelled.
//! - Read-modify-write edits execute inside one `IMMEDIATE` transaction.
//! - The revision only advances when a mutation changed at least one row.

mod error;
mod keyed_lock;
pub mod live;
mod outcome;

pub use error::{StoreError, StoreResult};
pub use live::{settled, LiveResult, LiveValue, Shared};
pub use outcome::{MutationOutcome, SkipReason};

use crate::db::{open_db, open_db_in_memory};
use crate::model::contact::Contact;
use crate::repo::contact_repo::{
    ContactPage, ContactRepository, ContactSearch, RepoResult, SqliteContactRepository,
};
use keyed_lock::KeyedLocks;
use log::{debug, error};
use rusqlite::{Connection, TransactionBehavior};
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Cloneable handle to the contact store.
#[derive(Clone)]
pub struct ContactStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    conn: Mutex<Connection>,
    revision: watch::Sender<u64>,
    locks: KeyedLocks,
}

impl ContactStore {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> StoreResult<Self> {
        SqliteContactRepository::try_new(&conn)?;
        let (revision, _rx) = watch::channel(0);
        Ok(Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(conn),
                revision,
                locks: KeyedLocks::default(),
            }),
        })
    }

    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::new(open_db(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::new(open_db_in_memory()?)
    }

    /// Receiver that is notified after every effective mutation.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Number of effective mutations since the store was opened.
    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<Contact>> {
        let id = id.to_owned();
        self.run("contact_get", move |conn| repo(conn)?.get_contact(&id))
            .await
    }

    /// Inserts or fully replaces a contact.
    pub async fn upsert(&self, contact: Contact) -> StoreResult<MutationOutcome> {
        if contact.validate().is_err() {
            return Ok(MutationOutcome::Skipped(SkipReason::EmptyId));
        }
        let guard = self.inner.locks.lock(&contact.id).await;
        self.run("contact_upsert", move |conn| {
            let _guard = guard;
            repo(conn)?.upsert_contact(&contact)
        })
        .await?;
        self.bump();
        Ok(MutationOutcome::Applied)
    }

    /// Removes a contact; unknown ids are a no-op.
    pub async fn delete(&self, id: &str) -> StoreResult<MutationOutcome> {
        let guard = self.inner.locks.lock(id).await;
        let owned_id = id.to_owned();
        let removed = self
            .run("contact_delete", move |conn| {
                let _guard = guard;
                repo(conn)?.delete_contact(&owned_id)
            })
            .await?;
        Ok(self.applied_if(removed))
    }

    /// Fetches one page of substring matches.
    pub async fn search(&self, search: ContactSearch) -> StoreResult<ContactPage> {
        self.run("contact_search", move |conn| {
            repo(conn)?.search_contacts(&search)
        })
        .await
    }

    /// Most recently accessed contacts, newest first.
    pub async fn recent(&self, limit: u32) -> StoreResult<Vec<Contact>> {
        self.run("contact_recent", move |conn| {
            repo(conn)?.recent_contacts(limit)
        })
        .await
    }

    pub async fn count(&self) -> StoreResult<u64> {
        self.run("contact_count", |conn| repo(conn)?.count_contacts())
            .await
    }

    /// Field patch for `last_accessed`; unknown ids are a no-op.
    pub async fn set_last_accessed(
        &self,
        id: &str,
        last_accessed: Option<i64>,
    ) -> StoreResult<MutationOutcome> {
        let guard = self.inner.locks.lock(id).await;
        let owned_id = id.to_owned();
        let found = self
            .run("contact_touch", move |conn| {
                let _guard = guard;
                repo(conn)?.set_last_accessed(&owned_id, last_accessed)
            })
            .await?;
        Ok(self.applied_if(found))
    }

    /// Clears `last_accessed` on every contact; returns the rows touched.
    pub async fn clear_all_last_accessed(&self) -> StoreResult<usize> {
        let cleared = self
            .run("contact_clear_recent", |conn| {
                repo(conn)?.clear_all_last_accessed()
            })
            .await?;
        if cleared > 0 {
            self.bump();
        }
        Ok(cleared)
    }

    /// Read-modify-write of one existing contact.
    ///
    /// `edit` runs on the current persisted state inside a transaction; it
    /// may veto the change by returning a [`SkipReason`]. Unknown ids yield
    /// `Skipped(UnknownId)` without calling `edit`.
    pub async fn modify<F>(&self, id: &str, edit: F) -> StoreResult<MutationOutcome>
    where
        F: FnOnce(&mut Contact) -> Result<(), SkipReason> + Send + 'static,
    {
        self.replace_with(id, move |current| {
            let mut contact = current.ok_or(SkipReason::UnknownId)?;
            edit(&mut contact)?;
            Ok(contact)
        })
        .await
    }

    /// Transactionally computes the next state of `id` from its current one.
    ///
    /// `build` receives the persisted contact (if any) and returns the record
    /// to upsert, or a reason to leave the store untouched.
    pub async fn replace_with<F>(&self, id: &str, build: F) -> StoreResult<MutationOutcome>
    where
        F: FnOnce(Option<Contact>) -> Result<Contact, SkipReason> + Send + 'static,
    {
        if id.is_empty() {
            return Ok(MutationOutcome::Skipped(SkipReason::EmptyId));
        }
        let guard = self.inner.locks.lock(id).await;
        let owned_id = id.to_owned();
        let outcome = self
            .run("contact_modify", move |conn| {
                let _guard = guard;
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let outcome = {
                    let contacts = repo(&tx)?;
                    let current = contacts.get_contact(&owned_id)?;
                    match build(current) {
                        Ok(next) if next.id != owned_id => {
                            MutationOutcome::Skipped(SkipReason::IdChanged)
                        }
                        Ok(next) => {
                            contacts.upsert_contact(&next)?;
                            MutationOutcome::Applied
                        }
                        Err(reason) => MutationOutcome::Skipped(reason),
                    }
                };
                tx.commit()?;
                Ok(outcome)
            })
            .await?;
        if outcome.is_applied() {
            self.bump();
        }
        Ok(outcome)
    }

    /// Live recency list bounded by `limit`.
    pub fn observe_recent(&self, limit: u32, grace: Duration) -> Shared<LiveValue<Vec<Contact>>> {
        let store = self.clone();
        Shared::new("recent_contacts", LiveValue::Pending, grace, move |tx| {
            let store = store.clone();
            async move {
                store
                    .follow(tx, move |store| async move { store.recent(limit).await })
                    .await;
            }
        })
    }

    /// Live total number of contacts.
    pub fn observe_count(&self, grace: Duration) -> Shared<LiveValue<u64>> {
        let store = self.clone();
        Shared::new("contact_count", LiveValue::Pending, grace, move |tx| {
            let store = store.clone();
            async move {
                store
                    .follow(tx, |store| async move { store.count().await })
                    .await;
            }
        })
    }

    /// Re-runs `fetch` after every effective mutation and publishes the result.
    async fn follow<T, F, Fut>(&self, tx: Arc<watch::Sender<LiveValue<T>>>, fetch: F)
    where
        F: Fn(ContactStore) -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        // Subscribed before the first read so no mutation slips in between.
        let mut changes = self.changes();
        loop {
            let value = fetch(self.clone()).await.map_err(Arc::new);
            tx.send_replace(LiveValue::from(value));
            if changes.changed().await.is_err() {
                return;
            }
        }
    }

    fn applied_if(&self, changed: bool) -> MutationOutcome {
        if changed {
            self.bump();
            MutationOutcome::Applied
        } else {
            MutationOutcome::Skipped(SkipReason::UnknownId)
        }
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|revision| *revision += 1);
    }

    async fn run<T, F>(&self, op: &'static str, work: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> RepoResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let started_at = Instant::now();
        let joined = tokio::task::spawn_blocking(move || {
            let mut conn = inner
                .conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))?;
            work(&mut *conn).map_err(StoreError::from)
        })
        .await;

        let result = joined.unwrap_or_else(|err| {
            Err(StoreError::Unavailable(format!("storage worker failed: {err}")))
        });
        match &result {
            Ok(_) => debug!(
                "event={op} module=store status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event={op} module=store status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

fn repo(conn: &Connection) -> RepoResult<SqliteContactRepository<'_>> {
    SqliteContactRepository::try_new(conn)
}

#[cfg(test)]
mod tests {
    use super::ContactStore;
    use crate::model::contact::Contact;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_caller_keeps_id_order() {
        let store = ContactStore::open_in_memory().unwrap();
        store.upsert(Contact::new("1", "Ana", "x")).await.unwrap();

        // Park the blocking pool on the connection.
        let conn = store.inner.conn.lock().unwrap();
        let first = tokio::spawn({
            let store = store.clone();
            async move { store.set_last_accessed("1", Some(10)).await }
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        first.abort();

        let second = tokio::spawn({
            let store = store.clone();
            async move { store.set_last_accessed("1", Some(20)).await }
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        let contended =
            tokio::time::timeout(Duration::from_millis(20), store.inner.locks.lock("1")).await;
        assert!(contended.is_err(), "the aborted write still owns the id");

        drop(conn);
        assert!(second.await.unwrap().unwrap().is_applied());
        let loaded = store.get("1").await.unwrap().unwrap();
        assert_eq!(loaded.last_accessed, Some(20));
    }
}
