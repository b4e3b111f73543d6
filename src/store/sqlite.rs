use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::store::GiftStore;
use crate::types::{
    GiftIdea, GiftIdeaPatch, GiftStatus, Giftee, GifteePatch, NewGiftIdea, NewGiftee,
};

/// Set restrictive file permissions (0600) on the database and WAL files.
fn set_db_file_permissions(db_path: &str) {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::Permissions::from_mode(0o600);
    if let Err(e) = std::fs::set_permissions(db_path, mode.clone()) {
        tracing::warn!("Failed to set permissions on {}: {}", db_path, e);
    }
    // WAL and shared-memory files created by SQLite in WAL journal mode
    for suffix in &["-wal", "-shm"] {
        let path = format!("{}{}", db_path, suffix);
        if std::path::Path::new(&path).exists() {
            if let Err(e) = std::fs::set_permissions(&path, mode.clone()) {
                tracing::warn!("Failed to set permissions on {}: {}", path, e);
            }
        }
    }
}

pub struct SqliteGiftStore {
    pool: SqlitePool,
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_giftee(row: &SqliteRow) -> anyhow::Result<Giftee> {
    let created_raw: String = row.try_get("created_at")?;
    Ok(Giftee {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        relationship: row.try_get("relationship")?,
        budget: row.try_get("budget")?,
        notes: row.try_get("notes")?,
        created_at: parse_timestamp(&created_raw),
    })
}

fn row_to_idea(row: &SqliteRow) -> anyhow::Result<GiftIdea> {
    let created_raw: String = row.try_get("created_at")?;
    let status_raw: String = row.try_get("status")?;
    Ok(GiftIdea {
        id: row.try_get("id")?,
        giftee_id: row.try_get("giftee_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        url: row.try_get("url")?,
        price: row.try_get("price")?,
        rank: row.try_get("rank")?,
        status: GiftStatus::parse(&status_raw).unwrap_or(GiftStatus::Considering),
        created_at: parse_timestamp(&created_raw),
    })
}

impl SqliteGiftStore {
    pub async fn new(db_path: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        // Gift plans are personal; owner-only read/write
        set_db_file_permissions(db_path);

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS giftees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                relationship TEXT,
                budget REAL CHECK (budget IS NULL OR budget >= 0),
                notes TEXT,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS gift_ideas (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                giftee_id INTEGER NOT NULL REFERENCES giftees(id),
                title TEXT NOT NULL,
                description TEXT,
                url TEXT,
                price REAL CHECK (price IS NULL OR price >= 0),
                rank INTEGER NOT NULL CHECK (rank >= 1),
                status TEXT NOT NULL DEFAULT 'considering'
                    CHECK (status IN ('considering', 'acquired', 'wrapped', 'given')),
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_giftees_user ON giftees(user_id)")
            .execute(&pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_gift_ideas_giftee ON gift_ideas(giftee_id)")
            .execute(&pool)
            .await?;

        info!(db_path, "Gift store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl GiftStore for SqliteGiftStore {
    async fn create_giftee(&self, draft: &NewGiftee) -> anyhow::Result<Giftee> {
        draft.validate()?;

        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO giftees (user_id, name, relationship, budget, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(draft.user_id)
        .bind(&draft.name)
        .bind(&draft.relationship)
        .bind(draft.budget)
        .bind(&draft.notes)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Giftee {
            id: result.last_insert_rowid(),
            user_id: draft.user_id,
            name: draft.name.clone(),
            relationship: draft.relationship.clone(),
            budget: draft.budget,
            notes: draft.notes.clone(),
            created_at,
        })
    }

    async fn get_giftee(&self, giftee_id: i64) -> anyhow::Result<Option<Giftee>> {
        let row = sqlx::query("SELECT * FROM giftees WHERE id = ?")
            .bind(giftee_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_giftee).transpose()
    }

    async fn update_giftee(
        &self,
        giftee_id: i64,
        patch: &GifteePatch,
    ) -> anyhow::Result<Option<Giftee>> {
        patch.validate()?;

        let mut sets: Vec<&str> = Vec::new();
        if patch.name.is_some() {
            sets.push("name = ?");
        }
        if patch.relationship.is_some() {
            sets.push("relationship = ?");
        }
        if patch.budget.is_some() {
            sets.push("budget = ?");
        }
        if patch.notes.is_some() {
            sets.push("notes = ?");
        }
        if sets.is_empty() {
            return self.get_giftee(giftee_id).await;
        }

        let query = format!("UPDATE giftees SET {} WHERE id = ?", sets.join(", "));
        let mut q = sqlx::query(&query);
        if let Some(name) = &patch.name {
            q = q.bind(name);
        }
        if let Some(relationship) = &patch.relationship {
            q = q.bind(relationship);
        }
        if let Some(budget) = patch.budget {
            q = q.bind(budget);
        }
        if let Some(notes) = &patch.notes {
            q = q.bind(notes);
        }
        let result = q.bind(giftee_id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_giftee(giftee_id).await
    }

    async fn delete_giftee(&self, giftee_id: i64) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let ideas = sqlx::query("DELETE FROM gift_ideas WHERE giftee_id = ?")
            .bind(giftee_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM giftees WHERE id = ?")
            .bind(giftee_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if result.rows_affected() > 0 {
            debug!(
                giftee_id,
                ideas_removed = ideas.rows_affected(),
                "Deleted giftee and cascaded ideas"
            );
        }
        Ok(result.rows_affected() > 0)
    }

    async fn list_giftees_for_user(&self, user_id: i64) -> anyhow::Result<Vec<Giftee>> {
        let rows = sqlx::query("SELECT * FROM giftees WHERE user_id = ? ORDER BY name")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_giftee).collect()
    }

    async fn create_gift_idea(
        &self,
        giftee_id: i64,
        draft: &NewGiftIdea,
        rank: i64,
    ) -> anyhow::Result<GiftIdea> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO gift_ideas
                (giftee_id, title, description, url, price, rank, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 'considering', ?)",
        )
        .bind(giftee_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.url)
        .bind(draft.price)
        .bind(rank)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(GiftIdea {
            id: result.last_insert_rowid(),
            giftee_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            url: draft.url.clone(),
            price: draft.price,
            rank,
            status: GiftStatus::Considering,
            created_at,
        })
    }

    async fn get_gift_idea(&self, idea_id: i64) -> anyhow::Result<Option<GiftIdea>> {
        let row = sqlx::query("SELECT * FROM gift_ideas WHERE id = ?")
            .bind(idea_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_idea).transpose()
    }

    async fn update_gift_idea(
        &self,
        idea_id: i64,
        patch: &GiftIdeaPatch,
    ) -> anyhow::Result<Option<GiftIdea>> {
        // Only the patched columns go in the SET list: rank shifts and status
        // transitions write the same row concurrently, and neither holds the
        // other's lock.
        let mut sets: Vec<&str> = Vec::new();
        if patch.title.is_some() {
            sets.push("title = ?");
        }
        if patch.description.is_some() {
            sets.push("description = ?");
        }
        if patch.url.is_some() {
            sets.push("url = ?");
        }
        if patch.price.is_some() {
            sets.push("price = ?");
        }
        if patch.rank.is_some() {
            sets.push("rank = ?");
        }
        if patch.status.is_some() {
            sets.push("status = ?");
        }
        if sets.is_empty() {
            return self.get_gift_idea(idea_id).await;
        }

        let query = format!("UPDATE gift_ideas SET {} WHERE id = ?", sets.join(", "));
        let mut q = sqlx::query(&query);
        if let Some(title) = &patch.title {
            q = q.bind(title);
        }
        if let Some(description) = &patch.description {
            q = q.bind(description);
        }
        if let Some(url) = &patch.url {
            q = q.bind(url);
        }
        if let Some(price) = patch.price {
            q = q.bind(price);
        }
        if let Some(rank) = patch.rank {
            q = q.bind(rank);
        }
        if let Some(status) = patch.status {
            q = q.bind(status.as_str());
        }
        let result = q.bind(idea_id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_gift_idea(idea_id).await
    }

    async fn delete_gift_idea(&self, idea_id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM gift_ideas WHERE id = ?")
            .bind(idea_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_ideas_for_giftee(&self, giftee_id: i64) -> anyhow::Result<Vec<GiftIdea>> {
        let rows = sqlx::query("SELECT * FROM gift_ideas WHERE giftee_id = ? ORDER BY rank")
            .bind(giftee_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_idea).collect()
    }
}
