// SQLite QueueStore Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::Duration;
use tracing::debug;
use waitline_core::domain::{Person, Queue};
use waitline_core::error::Result;
use waitline_core::port::{QueueGuard, QueueLock, QueueLockTable, QueueStore};

/// Durable queue store
///
/// Per-queue exclusivity comes from an in-process lock table, so one daemon
/// process must own the database file. Each commit writes only the rows that
/// changed since the lock was taken, inside a single SQL transaction.
pub struct SqliteQueueStore {
    pool: SqlitePool,
    locks: QueueLockTable,
}

impl SqliteQueueStore {
    pub fn new(pool: SqlitePool, lock_timeout: Duration) -> Self {
        Self {
            pool,
            locks: QueueLockTable::new(lock_timeout),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct QueueRow {
    id: String,
    name: String,
    description: String,
    location: String,
    time_per_person: Option<i64>,
    is_active: bool,
    created_at: i64,
    ended_at: Option<i64>,
    host_token: String,
}

#[derive(Debug, FromRow)]
struct PersonRow {
    id: String,
    name: String,
    contact_info: Option<String>,
    joined_at: i64,
}

#[derive(Debug, FromRow)]
struct JoinKeyRow {
    join_key: String,
    person_id: String,
}

impl From<PersonRow> for Person {
    fn from(row: PersonRow) -> Self {
        Person {
            id: row.id,
            name: row.name,
            contact_info: row.contact_info,
            joined_at: row.joined_at,
        }
    }
}

async fn load_queue(pool: &SqlitePool, id: &str) -> Result<Option<Queue>> {
    let Some(row) = sqlx::query_as::<_, QueueRow>("SELECT * FROM queues WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(map_sqlx_error)?
    else {
        return Ok(None);
    };

    let people: VecDeque<Person> = sqlx::query_as::<_, PersonRow>(
        "SELECT id, name, contact_info, joined_at FROM people WHERE queue_id = ? ORDER BY seq",
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_error)?
    .into_iter()
    .map(Person::from)
    .collect();

    let join_keys: BTreeMap<String, String> = sqlx::query_as::<_, JoinKeyRow>(
        "SELECT join_key, person_id FROM join_keys WHERE queue_id = ?",
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_error)?
    .into_iter()
    .map(|row| (row.join_key, row.person_id))
    .collect();

    Ok(Some(Queue {
        id: row.id,
        name: row.name,
        description: row.description,
        location: row.location,
        time_per_person: row.time_per_person.and_then(|m| u32::try_from(m).ok()),
        is_active: row.is_active,
        people,
        created_at: row.created_at,
        ended_at: row.ended_at,
        host_token: row.host_token,
        join_keys,
    }))
}

/// Write `queue` over `previous`, touching only the rows that changed
///
/// People are only ever appended at the tail or removed, so removals become
/// deletes and newcomers get `seq` values above every surviving row.
async fn write_queue(
    tx: &mut Transaction<'_, Sqlite>,
    previous: Option<&Queue>,
    queue: &Queue,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO queues (
            id, name, description, location, time_per_person,
            is_active, created_at, ended_at, host_token
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            location = excluded.location,
            time_per_person = excluded.time_per_person,
            is_active = excluded.is_active,
            ended_at = excluded.ended_at
        "#,
    )
    .bind(&queue.id)
    .bind(&queue.name)
    .bind(&queue.description)
    .bind(&queue.location)
    .bind(queue.time_per_person.map(i64::from))
    .bind(queue.is_active)
    .bind(queue.created_at)
    .bind(queue.ended_at)
    .bind(&queue.host_token)
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx_error)?;

    let before: HashSet<&str> = previous
        .map(|p| p.people.iter().map(|person| person.id.as_str()).collect())
        .unwrap_or_default();
    let after: HashSet<&str> = queue.people.iter().map(|p| p.id.as_str()).collect();

    for gone in before.difference(&after) {
        sqlx::query("DELETE FROM people WHERE queue_id = ? AND id = ?")
            .bind(&queue.id)
            .bind(*gone)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
    }

    let newcomers: Vec<&Person> = queue
        .people
        .iter()
        .filter(|p| !before.contains(p.id.as_str()))
        .collect();

    if !newcomers.is_empty() {
        let next_seq: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(seq) + 1, 0) FROM people WHERE queue_id = ?")
                .bind(&queue.id)
                .fetch_one(&mut **tx)
                .await
                .map_err(map_sqlx_error)?;

        for (offset, person) in newcomers.into_iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO people (queue_id, id, seq, name, contact_info, joined_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&queue.id)
            .bind(&person.id)
            .bind(next_seq + offset as i64)
            .bind(&person.name)
            .bind(&person.contact_info)
            .bind(person.joined_at)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        }
    }

    // Join keys are append-only
    for (join_key, person_id) in &queue.join_keys {
        if previous.is_some_and(|p| p.join_keys.contains_key(join_key)) {
            continue;
        }
        sqlx::query(
            "INSERT OR IGNORE INTO join_keys (queue_id, join_key, person_id) VALUES (?, ?, ?)",
        )
        .bind(&queue.id)
        .bind(join_key)
        .bind(person_id)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    }

    Ok(())
}

struct SqliteGuard {
    queue_id: String,
    current: Option<Queue>,
    pool: SqlitePool,
    _lock: QueueLock,
}

#[async_trait]
impl QueueGuard for SqliteGuard {
    fn queue_id(&self) -> &str {
        &self.queue_id
    }

    fn current(&self) -> Option<&Queue> {
        self.current.as_ref()
    }

    async fn commit(&mut self, queue: Queue) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        // Dropping tx without commit rolls everything back
        write_queue(&mut tx, self.current.as_ref(), &queue).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(
            queue_id = %self.queue_id,
            people = queue.people.len(),
            "Queue committed to SQLite"
        );
        self.current = Some(queue);
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn get(&self, id: &str) -> Result<Option<Queue>> {
        load_queue(&self.pool, id).await
    }

    async fn lock(&self, id: &str) -> Result<Box<dyn QueueGuard>> {
        let lock = self.locks.acquire(id).await?;
        let current = load_queue(&self.pool, id).await?;

        Ok(Box::new(SqliteGuard {
            queue_id: id.to_string(),
            current,
            pool: self.pool.clone(),
            _lock: lock,
        }))
    }
}
