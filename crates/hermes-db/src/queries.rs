use std::collections::{BTreeSet, HashMap};

use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use hermes_types::models::MessageDraft;

use crate::error::{is_foreign_key_violation, is_unique_violation};
use crate::models::{MessageRow, UserRow};
use crate::{Database, DbError, Result};

/// Ids of every message `?1` may read: the ones it owns plus the ones it is a
/// recipient of. Each id appears once.
const VISIBLE_TO_CALLER: &str = "SELECT m.id FROM messages m
     WHERE m.owner_id = ?1
        OR EXISTS (SELECT 1 FROM recipients r WHERE r.message_id = m.id AND r.recipient_id = ?1)";

const MESSAGE_COLUMNS: &str = "id, owner_id, text, palindrome, created_at";

impl Database {
    // -- Users --

    /// Insert a user and return its id. A taken username is
    /// `DbError::UsernameTaken`, whether or not the caller checked first.
    pub fn create_user(&self, username: &str, password_key: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, password_key) VALUES (?1, ?2)",
                (username, password_key),
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DbError::UsernameTaken
                } else {
                    DbError::Sqlite(e)
                }
            })?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, username, password_key, created_at FROM users WHERE username = ?1",
                    [username],
                    |row| {
                        Ok(UserRow {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            password_key: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Messages --

    /// Insert a message and link its recipients in one transaction. If any
    /// link fails the message row is rolled back too.
    pub fn insert_message(
        &self,
        owner_id: i64,
        draft: &MessageDraft,
        recipient_ids: &[i64],
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO messages (owner_id, text, palindrome) VALUES (?1, ?2, ?3)",
                params![owner_id, draft.text, draft.palindrome],
            )
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    DbError::UnknownOwner
                } else {
                    DbError::Sqlite(e)
                }
            })?;
            let id = tx.last_insert_rowid();

            link_recipients(&tx, id, recipient_ids)?;

            tx.commit()?;
            Ok(id)
        })
    }

    pub fn visible_message_ids(&self, caller_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| query_visible_ids(conn, caller_id))
    }

    /// Every message the caller owns or receives, oldest first.
    pub fn get_visible_messages(&self, caller_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id IN ({VISIBLE_TO_CALLER}) ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query_map([caller_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            attach_recipients(conn, &mut rows)?;
            Ok(rows)
        })
    }

    /// A single message, or `None` when it does not exist or the caller is
    /// neither its owner nor a recipient.
    pub fn get_visible_message(&self, caller_id: i64, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?2 AND id IN ({VISIBLE_TO_CALLER})"
            );
            let row = conn
                .query_row(&sql, params![caller_id, id], message_from_row)
                .optional()?;

            match row {
                Some(row) => {
                    let mut rows = [row];
                    attach_recipients(conn, &mut rows)?;
                    let [row] = rows;
                    Ok(Some(row))
                }
                None => Ok(None),
            }
        })
    }

    /// Apply an owner's edit. `draft` replaces the text and its derived flags,
    /// `recipient_ids` replaces the recipient set. Returns `None` without
    /// touching anything when the message does not exist or is not owned by
    /// `owner_id`.
    pub fn update_message(
        &self,
        owner_id: i64,
        id: i64,
        draft: Option<&MessageDraft>,
        recipient_ids: Option<&[i64]>,
    ) -> Result<Option<MessageRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let owned = tx
                .query_row(
                    "SELECT 1 FROM messages WHERE id = ?1 AND owner_id = ?2",
                    params![id, owner_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !owned {
                return Ok(None);
            }

            if let Some(draft) = draft {
                tx.execute(
                    "UPDATE messages SET text = ?1, palindrome = ?2 WHERE id = ?3",
                    params![draft.text, draft.palindrome, id],
                )?;
            }

            if let Some(recipient_ids) = recipient_ids {
                tx.execute("DELETE FROM recipients WHERE message_id = ?1", [id])?;
                link_recipients(&tx, id, recipient_ids)?;
            }

            let row = query_message(&tx, id)?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Delete a message owned by `owner_id`. Returns false when nothing
    /// matched, without saying whether the message exists.
    pub fn delete_message(&self, owner_id: i64, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            // Recipient links go with it via ON DELETE CASCADE
            let affected = conn.execute(
                "DELETE FROM messages WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )?;
            Ok(affected > 0)
        })
    }
}

fn query_visible_ids(conn: &Connection, caller_id: i64) -> Result<Vec<i64>> {
    let sql = format!("{VISIBLE_TO_CALLER} ORDER BY m.id");
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map([caller_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}

fn query_message(conn: &Connection, id: i64) -> Result<Option<MessageRow>> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
    let Some(row) = conn.query_row(&sql, [id], message_from_row).optional()? else {
        return Ok(None);
    };

    let mut rows = [row];
    attach_recipients(conn, &mut rows)?;
    let [row] = rows;
    Ok(Some(row))
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        text: row.get(2)?,
        palindrome: row.get(3)?,
        recipient_ids: Vec::new(),
        created_at: row.get(4)?,
    })
}

/// Insert recipient links for `message_id`. Duplicate ids collapse to one
/// link; an id with no matching user is `DbError::UnknownRecipient`.
fn link_recipients(conn: &Connection, message_id: i64, recipient_ids: &[i64]) -> Result<()> {
    let unique: BTreeSet<i64> = recipient_ids.iter().copied().collect();
    if unique.is_empty() {
        return Ok(());
    }

    let mut stmt =
        conn.prepare("INSERT INTO recipients (message_id, recipient_id) VALUES (?1, ?2)")?;
    for recipient_id in unique {
        stmt.execute(params![message_id, recipient_id]).map_err(|e| {
            if is_foreign_key_violation(&e) {
                DbError::UnknownRecipient(recipient_id)
            } else {
                DbError::Sqlite(e)
            }
        })?;
    }
    Ok(())
}

/// Ids bound per recipient lookup. SQLite caps bound parameters at 32766.
const RECIPIENT_BATCH: usize = 500;

/// Batch-fill `recipient_ids` for a set of message rows.
fn attach_recipients(conn: &Connection, rows: &mut [MessageRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut by_message: HashMap<i64, Vec<i64>> = HashMap::new();

    for batch in ids.chunks(RECIPIENT_BATCH) {
        let placeholders: Vec<String> = (1..=batch.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT message_id, recipient_id FROM recipients WHERE message_id IN ({})
             ORDER BY message_id, recipient_id",
            placeholders.join(", ")
        );

        let mut stmt = conn.prepare_cached(&sql)?;
        let links = stmt.query_map(params_from_iter(batch), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        for link in links {
            let (message_id, recipient_id) = link?;
            by_message.entry(message_id).or_default().push(recipient_id);
        }
    }

    for row in rows.iter_mut() {
        row.recipient_ids = by_message.remove(&row.id).unwrap_or_default();
    }
    Ok(())
}
