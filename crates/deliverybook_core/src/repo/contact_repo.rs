//! Contact repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide point lookup, upsert, delete, substring scan, recency scan and
//!   count over the `contacts` table.
//! - Own keyset pagination for substring search.
//!
//! # Invariants
//! - Search is a literal, case-sensitive containment test over id, name and
//!   address, ordered by `name ASC, id ASC`.
//! - Recency listing only contains rows with `last_accessed IS NOT NULL`,
//!   ordered by `last_accessed DESC, id ASC`.
//! - Each method is a single statement, so each is individually atomic.

use crate::db::DbError;
use crate::model::contact::{Contact, ContactValidationError};
use crate::repo::neighbors_codec::{decode_neighbors, encode_neighbors};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CONTACT_SELECT_SQL: &str = "SELECT
    id,
    name,
    address,
    neighbors,
    last_accessed
FROM contacts";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for contact persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ContactValidationError),
    Db(DbError),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted contact data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing; was the database migrated?")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<ContactValidationError> for RepoError {
    fn from(value: ContactValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Opaque keyset position: the `(name, id)` of the last row already delivered.
///
/// Cursor positions stay valid while the table mutates between pages, unlike
/// offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCursor {
    name: String,
    id: String,
}

impl SearchCursor {
    fn after(contact: &Contact) -> Self {
        Self {
            name: contact.name.clone(),
            id: contact.id.clone(),
        }
    }
}

/// One substring-search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSearch {
    /// Literal substring; the empty string matches every contact.
    pub text: String,
    /// Resume after this position; `None` starts from the first page.
    pub after: Option<SearchCursor>,
    /// Maximum rows to return. `0` yields an empty terminal page.
    pub page_size: u32,
}

impl ContactSearch {
    /// First page of `text` with the given page size.
    pub fn first_page(text: impl Into<String>, page_size: u32) -> Self {
        Self {
            text: text.into(),
            after: None,
            page_size,
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactPage {
    pub items: Vec<Contact>,
    /// Present when more rows exist after this page.
    pub next_cursor: Option<SearchCursor>,
}

impl ContactPage {
    /// Whether this is the last page of its query.
    pub fn is_terminal(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// Storage contract for contacts.
pub trait ContactRepository {
    fn get_contact(&self, id: &str) -> RepoResult<Option<Contact>>;
    /// Inserts or fully replaces the row with `contact.id`.
    fn upsert_contact(&self, contact: &Contact) -> RepoResult<()>;
    /// Returns whether a row was removed.
    fn delete_contact(&self, id: &str) -> RepoResult<bool>;
    fn search_contacts(&self, search: &ContactSearch) -> RepoResult<ContactPage>;
    fn recent_contacts(&self, limit: u32) -> RepoResult<Vec<Contact>>;
    fn count_contacts(&self) -> RepoResult<u64>;
    /// Patches only `last_accessed`; returns whether the id exists.
    fn set_last_accessed(&self, id: &str, last_accessed: Option<i64>) -> RepoResult<bool>;
    /// Clears `last_accessed` everywhere; returns the number of rows touched.
    fn clear_all_last_accessed(&self) -> RepoResult<usize>;
}

/// SQLite-backed contact repository.
///
/// Borrows a connection (or a transaction through deref), so callers decide
/// the transactional scope.
pub struct SqliteContactRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContactRepository<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `MissingRequiredTable` when the `contacts` table does not exist.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        if !table_exists(conn, "contacts")? {
            return Err(RepoError::MissingRequiredTable("contacts"));
        }
        Ok(Self { conn })
    }
}

impl ContactRepository for SqliteContactRepository<'_> {
    fn get_contact(&self, id: &str) -> RepoResult<Option<Contact>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{CONTACT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_contact_row(row)?)),
            None => Ok(None),
        }
    }

    fn upsert_contact(&self, contact: &Contact) -> RepoResult<()> {
        contact.validate()?;
        let neighbors = encode_neighbors(Some(contact.neighbors.as_slice()))
            .map_err(|err| RepoError::InvalidData(format!("neighbors not encodable: {err}")))?;

        self.conn.execute(
            "INSERT INTO contacts (id, name, address, neighbors, last_accessed)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                neighbors = excluded.neighbors,
                last_accessed = excluded.last_accessed;",
            params![
                contact.id.as_str(),
                contact.name.as_str(),
                contact.address.as_str(),
                neighbors,
                contact.last_accessed,
            ],
        )?;
        Ok(())
    }

    fn delete_contact(&self, id: &str) -> RepoResult<bool> {
        let changed = self.conn.execute("DELETE FROM contacts WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn search_contacts(&self, search: &ContactSearch) -> RepoResult<ContactPage> {
        if search.page_size == 0 {
            return Ok(ContactPage::default());
        }

        let (after_name, after_id) = match &search.after {
            Some(cursor) => (Some(cursor.name.as_str()), Some(cursor.id.as_str())),
            None => (None, None),
        };

        // instr() is byte-exact, unlike LIKE which folds ASCII case.
        let mut stmt = self.conn.prepare_cached(&format!(
            "{CONTACT_SELECT_SQL}
             WHERE (?1 = '' OR instr(id, ?1) > 0 OR instr(name, ?1) > 0 OR instr(address, ?1) > 0)
               AND (?2 IS NULL OR name > ?2 OR (name = ?2 AND id > ?3))
             ORDER BY name ASC, id ASC
             LIMIT ?4;"
        ))?;

        // One extra row tells whether another page exists.
        let fetch_limit = i64::from(search.page_size) + 1;
        let mut rows = stmt.query(params![
            search.text.as_str(),
            after_name,
            after_id,
            fetch_limit
        ])?;

        let mut items = Vec::new();
        let mut has_more = false;
        while let Some(row) = rows.next()? {
            if items.len() == search.page_size as usize {
                has_more = true;
                break;
            }
            items.push(parse_contact_row(row)?);
        }

        let next_cursor = if has_more {
            items.last().map(SearchCursor::after)
        } else {
            None
        };
        Ok(ContactPage { items, next_cursor })
    }

    fn recent_contacts(&self, limit: u32) -> RepoResult<Vec<Contact>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare_cached(&format!(
            "{CONTACT_SELECT_SQL}
             WHERE last_accessed IS NOT NULL
             ORDER BY last_accessed DESC, id ASC
             LIMIT ?1;"
        ))?;
        let mut rows = stmt.query([i64::from(limit)])?;
        let mut contacts = Vec::new();
        while let Some(row) = rows.next()? {
            contacts.push(parse_contact_row(row)?);
        }
        Ok(contacts)
    }

    fn count_contacts(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM contacts;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative contact count `{count}`")))
    }

    fn set_last_accessed(&self, id: &str, last_accessed: Option<i64>) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE contacts SET last_accessed = ?2 WHERE id = ?1;",
            params![id, last_accessed],
        )?;
        Ok(changed > 0)
    }

    fn clear_all_last_accessed(&self) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE contacts SET last_accessed = NULL WHERE last_accessed IS NOT NULL;",
            [],
        )?;
        Ok(changed)
    }
}

fn parse_contact_row(row: &Row<'_>) -> RepoResult<Contact> {
    let id: String = row.get("id")?;
    let raw_neighbors: Option<String> = row.get("neighbors")?;
    let neighbors = decode_neighbors(raw_neighbors.as_deref())
        .map_err(|err| {
            RepoError::InvalidData(format!("invalid contacts.neighbors for id `{id}`: {err}"))
        })?
        .unwrap_or_default();

    let contact = Contact {
        id,
        name: row.get("name")?,
        address: row.get("address")?,
        neighbors,
        last_accessed: row.get("last_accessed")?,
    };
    contact.validate()?;
    Ok(contact)
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}
