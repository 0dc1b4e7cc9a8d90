//! SQLite-backed points store
//!
//! Backs the ledger, settings, reward catalog, and redemptions with a
//! WAL-mode SQLite database. The connection is shared behind a mutex, and
//! the two compound operations (cap-guarded append, redemption) run as
//! explicit transactions, so concurrent engine calls serialize at the
//! store instead of racing read-then-write.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::config::PointsSettings;
use crate::domain::{
    ActionType, ActivityEntry, Redemption, RedemptionStatus, Reward, RewardType,
    RewardVisibility, TopUser, UserProfile,
};

use super::{CapWindow, CappedAppend, PointsStore, RedemptionApplied, StoreError};

/// Database wrapper shared by all store operations
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the points database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create points dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open points db: {}", path.display()))?;

        // WAL so readers (leaderboard, cap checks) don't block writers
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (tests, ephemeral tenants)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory points db")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("Points DB lock poisoned")
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_SQL)?;
        drop(conn);
        self.run_migrations()?;
        Ok(())
    }

    /// Run any pending migrations. Version 1 is the baseline schema.
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn();
        let version: i32 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
            .unwrap_or(0);
        if version < 1 {
            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (1)", [])?;
        }

        // Migration 2: uniqueness of award entities moved into the store so
        // racing appends cannot both land
        if version < 2 {
            conn.execute_batch(
                r#"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_ledger_entity_once
                    ON activity_ledger(community_id, user_id, action, entity_id)
                    WHERE entity_id IS NOT NULL
                      AND action != 'redemption' AND action != 'correction';
                "#,
            )?;
            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
        }
        Ok(())
    }

    fn insert_entry(conn: &Connection, entry: &ActivityEntry) -> Result<(), StoreError> {
        let metadata = entry
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let inserted = conn.execute(
            r#"INSERT INTO activity_ledger
               (community_id, user_id, points, action, entity_id, entity_type, metadata, created_at, day_bucket)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            rusqlite::params![
                entry.community_id,
                entry.user_id,
                entry.points,
                entry.action.as_str(),
                entry.entity_id,
                entry.entity_type,
                metadata,
                entry.created_at.timestamp_millis(),
                day_bucket(entry.created_at),
            ],
        );
        match inserted {
            Ok(_) => Ok(()),
            // The idx_ledger_entity_once unique index caught a repeat award
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateEntry)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn sum_since(
        conn: &Connection,
        community_id: &str,
        user_id: &str,
        action: ActionType,
        since_ms: i64,
    ) -> Result<i64, StoreError> {
        let sum: i64 = conn.query_row(
            r#"SELECT COALESCE(SUM(points), 0) FROM activity_ledger
               WHERE community_id = ?1 AND user_id = ?2 AND action = ?3 AND created_at >= ?4"#,
            rusqlite::params![community_id, user_id, action.as_str(), since_ms],
            |r| r.get(0),
        )?;
        Ok(sum)
    }

    fn reward_from_row(row: &Row<'_>) -> rusqlite::Result<(Reward, String, String)> {
        // Returns the raw enum strings alongside so the caller can report
        // corruption instead of panicking inside the row mapper
        let id: String = row.get(0)?;
        let reward_type: String = row.get(5)?;
        let visibility: String = row.get(6)?;
        let expires_at: Option<i64> = row.get(8)?;
        Ok((
            Reward {
                id: Uuid::parse_str(&id).unwrap_or(Uuid::nil()),
                community_id: row.get(1)?,
                title: row.get(2)?,
                description: row.get(3)?,
                points_cost: row.get(4)?,
                reward_type: RewardType::Free,
                visibility: RewardVisibility::Public,
                stock: row.get(7)?,
                expires_at: expires_at.and_then(DateTime::from_timestamp_millis),
                redeem_count: row.get(9)?,
            },
            reward_type,
            visibility,
        ))
    }

    fn finish_reward(
        (mut reward, ty, vis): (Reward, String, String),
    ) -> Result<Reward, StoreError> {
        if reward.id.is_nil() {
            return Err(StoreError::Corrupt("reward id is not a valid uuid".into()));
        }
        reward.reward_type = RewardType::parse(&ty)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown reward type '{ty}'")))?;
        reward.visibility = RewardVisibility::parse(&vis)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown reward visibility '{vis}'")))?;
        Ok(reward)
    }

    fn redemption_from_row(
        row: &Row<'_>,
    ) -> rusqlite::Result<(String, String, String, String, i64, String, i64)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    }

    fn finish_redemption(
        (id, user_id, reward_id, community_id, redeemed_at, status, points_spent): (
            String,
            String,
            String,
            String,
            i64,
            String,
            i64,
        ),
    ) -> Result<Redemption, StoreError> {
        Ok(Redemption {
            id: Uuid::parse_str(&id)
                .map_err(|_| StoreError::Corrupt(format!("redemption id '{id}' is not a uuid")))?,
            user_id,
            reward_id: Uuid::parse_str(&reward_id).map_err(|_| {
                StoreError::Corrupt(format!("reward id '{reward_id}' is not a uuid"))
            })?,
            community_id,
            redeemed_at: DateTime::from_timestamp_millis(redeemed_at)
                .ok_or_else(|| StoreError::Corrupt("redeemed_at out of range".into()))?,
            status: RedemptionStatus::parse(&status).ok_or_else(|| {
                StoreError::Corrupt(format!("unknown redemption status '{status}'"))
            })?,
            points_spent,
        })
    }
}

const REWARD_COLUMNS: &str =
    "id, community_id, title, description, points_cost, reward_type, visibility, stock, expires_at, redeem_count";

const REDEMPTION_COLUMNS: &str =
    "id, user_id, reward_id, community_id, redeemed_at, status, points_spent";

#[async_trait]
impl PointsStore for SqliteStore {
    async fn get_settings(&self, community_id: &str) -> Result<Option<PointsSettings>, StoreError> {
        let conn = self.conn();
        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM points_settings WHERE community_id = ?1",
                [community_id],
                |r| r.get(0),
            )
            .optional()?;
        match document {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }

    async fn upsert_settings(
        &self,
        community_id: &str,
        settings: &PointsSettings,
    ) -> Result<(), StoreError> {
        let document = serde_json::to_string(settings)?;
        let now = Utc::now().timestamp_millis();
        let conn = self.conn();
        conn.execute(
            r#"INSERT INTO points_settings (community_id, document, updated_at)
               VALUES (?1, ?2, ?3)
               ON CONFLICT(community_id) DO UPDATE SET document = ?2, updated_at = ?3"#,
            rusqlite::params![community_id, document, now],
        )?;
        Ok(())
    }

    async fn append_activity(&self, entry: &ActivityEntry) -> Result<(), StoreError> {
        let conn = self.conn();
        Self::insert_entry(&conn, entry)
    }

    async fn append_activity_capped(
        &self,
        entry: &ActivityEntry,
        guards: &[CapWindow],
    ) -> Result<CappedAppend, StoreError> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        for guard in guards {
            let sum = Self::sum_since(
                &tx,
                &entry.community_id,
                &entry.user_id,
                entry.action,
                guard.since.timestamp_millis(),
            )?;
            if sum >= guard.cap {
                // tx drops without commit; nothing written
                return Ok(CappedAppend::CapExceeded);
            }
        }
        Self::insert_entry(&tx, entry)?;
        tx.commit()?;
        Ok(CappedAppend::Appended)
    }

    async fn sum_activity(
        &self,
        community_id: &str,
        user_id: &str,
        action: ActionType,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let conn = self.conn();
        Self::sum_since(&conn, community_id, user_id, action, since.timestamp_millis())
    }

    async fn total_points(&self, community_id: &str, user_id: &str) -> Result<i64, StoreError> {
        let conn = self.conn();
        let total: i64 = conn.query_row(
            r#"SELECT COALESCE(SUM(points), 0) FROM activity_ledger
               WHERE community_id = ?1 AND user_id = ?2"#,
            rusqlite::params![community_id, user_id],
            |r| r.get(0),
        )?;
        Ok(total)
    }

    async fn has_entry_for_entity(
        &self,
        community_id: &str,
        user_id: &str,
        action: ActionType,
        entity_id: &str,
    ) -> Result<bool, StoreError> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            r#"SELECT COUNT(*) FROM activity_ledger
               WHERE community_id = ?1 AND user_id = ?2 AND action = ?3 AND entity_id = ?4"#,
            rusqlite::params![community_id, user_id, action.as_str(), entity_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    async fn get_reward(&self, id: Uuid) -> Result<Option<Reward>, StoreError> {
        let conn = self.conn();
        let raw = conn
            .query_row(
                &format!("SELECT {REWARD_COLUMNS} FROM rewards WHERE id = ?1"),
                [id.to_string()],
                Self::reward_from_row,
            )
            .optional()?;
        raw.map(Self::finish_reward).transpose()
    }

    async fn put_reward(&self, reward: &Reward) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            &format!(
                r#"INSERT OR REPLACE INTO rewards ({REWARD_COLUMNS})
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#
            ),
            rusqlite::params![
                reward.id.to_string(),
                reward.community_id,
                reward.title,
                reward.description,
                reward.points_cost,
                reward.reward_type.as_str(),
                reward.visibility.as_str(),
                reward.stock,
                reward.expires_at.map(|at| at.timestamp_millis()),
                reward.redeem_count,
            ],
        )?;
        Ok(())
    }

    async fn apply_redemption(
        &self,
        debit: &ActivityEntry,
        redemption: &Redemption,
    ) -> Result<RedemptionApplied, StoreError> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;

        // Re-verify the balance inside the transaction; the engine's
        // precheck ran outside it, and a concurrent redemption may have
        // debited the ledger since.
        let balance: i64 = tx.query_row(
            r#"SELECT COALESCE(SUM(points), 0) FROM activity_ledger
               WHERE community_id = ?1 AND user_id = ?2"#,
            rusqlite::params![redemption.community_id, redemption.user_id],
            |r| r.get(0),
        )?;
        if balance < redemption.points_spent {
            return Ok(RedemptionApplied::InsufficientPoints);
        }

        // Conditional stock decrement is the gate: with finite stock the
        // UPDATE only matches while stock > 0, so of N concurrent attempts
        // at the last unit exactly one passes.
        let stock: Option<i64> = tx
            .query_row(
                "SELECT stock FROM rewards WHERE id = ?1",
                [redemption.reward_id.to_string()],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::Corrupt("reward disappeared mid-redemption".into()))?;

        if stock.is_some() {
            let changed = tx.execute(
                "UPDATE rewards SET stock = stock - 1 WHERE id = ?1 AND stock > 0",
                [redemption.reward_id.to_string()],
            )?;
            if changed == 0 {
                return Ok(RedemptionApplied::OutOfStock);
            }
        }

        Self::insert_entry(&tx, debit)?;

        tx.execute(
            &format!(
                r#"INSERT INTO redemptions ({REDEMPTION_COLUMNS})
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#
            ),
            rusqlite::params![
                redemption.id.to_string(),
                redemption.user_id,
                redemption.reward_id.to_string(),
                redemption.community_id,
                redemption.redeemed_at.timestamp_millis(),
                redemption.status.as_str(),
                redemption.points_spent,
            ],
        )?;

        tx.execute(
            "UPDATE rewards SET redeem_count = redeem_count + 1 WHERE id = ?1",
            [redemption.reward_id.to_string()],
        )?;

        tx.commit()?;
        Ok(RedemptionApplied::Created(redemption.clone()))
    }

    async fn get_redemption(&self, id: Uuid) -> Result<Option<Redemption>, StoreError> {
        let conn = self.conn();
        let raw = conn
            .query_row(
                &format!("SELECT {REDEMPTION_COLUMNS} FROM redemptions WHERE id = ?1"),
                [id.to_string()],
                Self::redemption_from_row,
            )
            .optional()?;
        raw.map(Self::finish_redemption).transpose()
    }

    async fn set_redemption_status(
        &self,
        id: Uuid,
        status: RedemptionStatus,
    ) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            "UPDATE redemptions SET status = ?2 WHERE id = ?1",
            rusqlite::params![id.to_string(), status.as_str()],
        )?;
        Ok(())
    }

    async fn list_pending_redemptions(
        &self,
        community_id: &str,
    ) -> Result<Vec<Redemption>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            r#"SELECT {REDEMPTION_COLUMNS} FROM redemptions
               WHERE community_id = ?1 AND status = 'pending'
               ORDER BY redeemed_at ASC"#
        ))?;
        let rows = stmt.query_map([community_id], Self::redemption_from_row)?;
        let mut out = Vec::new();
        for raw in rows {
            out.push(Self::finish_redemption(raw?)?);
        }
        Ok(out)
    }

    async fn list_top_users(
        &self,
        community_id: &str,
        limit: usize,
    ) -> Result<Vec<TopUser>, StoreError> {
        let conn = self.conn();
        // MAX(id) is the ledger position where the user reached their
        // current total; ascending order makes ties go to whoever got
        // there first.
        let mut stmt = conn.prepare(
            r#"SELECT user_id, COALESCE(SUM(points), 0) AS total
               FROM activity_ledger
               WHERE community_id = ?1
               GROUP BY user_id
               ORDER BY total DESC, MAX(id) ASC
               LIMIT ?2"#,
        )?;
        let rows = stmt.query_map(
            rusqlite::params![community_id, limit as i64],
            |row| {
                Ok(TopUser {
                    user_id: row.get(0)?,
                    points: row.get(1)?,
                })
            },
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn get_profile(
        &self,
        community_id: &str,
        user_id: &str,
    ) -> Result<Option<UserProfile>, StoreError> {
        let conn = self.conn();
        let profile = conn
            .query_row(
                r#"SELECT community_id, user_id, name, avatar_url FROM user_profiles
                   WHERE community_id = ?1 AND user_id = ?2"#,
                rusqlite::params![community_id, user_id],
                |row| {
                    Ok(UserProfile {
                        community_id: row.get(0)?,
                        user_id: row.get(1)?,
                        name: row.get(2)?,
                        avatar_url: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            r#"INSERT INTO user_profiles (community_id, user_id, name, avatar_url)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(community_id, user_id) DO UPDATE SET name = ?3, avatar_url = ?4"#,
            rusqlite::params![
                profile.community_id,
                profile.user_id,
                profile.name,
                profile.avatar_url
            ],
        )?;
        Ok(())
    }
}

/// Day bucket string ("YYYY-MM-DD", UTC) for daily aggregate queries
fn day_bucket(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// SQL schema for the points database
const SCHEMA_SQL: &str = r#"
-- Per-tenant settings document (JSON)
CREATE TABLE IF NOT EXISTS points_settings (
    community_id TEXT PRIMARY KEY,
    document TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Activity ledger (append-only; one row per point-earning/spending event)
CREATE TABLE IF NOT EXISTS activity_ledger (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    community_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    points INTEGER NOT NULL,
    action TEXT NOT NULL,
    entity_id TEXT,
    entity_type TEXT,
    metadata TEXT,
    created_at INTEGER NOT NULL,
    day_bucket TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_ledger_user_action
    ON activity_ledger(community_id, user_id, action, created_at);
CREATE INDEX IF NOT EXISTS idx_ledger_user
    ON activity_ledger(community_id, user_id);
CREATE INDEX IF NOT EXISTS idx_ledger_entity
    ON activity_ledger(community_id, user_id, action, entity_id);
CREATE INDEX IF NOT EXISTS idx_ledger_day ON activity_ledger(day_bucket);

-- One award per (user, action, entity). Redemption debits and corrections
-- may legitimately repeat an entity id, so they stay outside the constraint.
CREATE UNIQUE INDEX IF NOT EXISTS idx_ledger_entity_once
    ON activity_ledger(community_id, user_id, action, entity_id)
    WHERE entity_id IS NOT NULL
      AND action != 'redemption' AND action != 'correction';

-- Reward catalog
CREATE TABLE IF NOT EXISTS rewards (
    id TEXT PRIMARY KEY,
    community_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    points_cost INTEGER NOT NULL,
    reward_type TEXT NOT NULL,
    visibility TEXT NOT NULL,
    stock INTEGER,
    expires_at INTEGER,
    redeem_count INTEGER NOT NULL DEFAULT 0,
    CHECK (points_cost >= 0),
    CHECK (stock IS NULL OR stock >= 0)
);
CREATE INDEX IF NOT EXISTS idx_rewards_community ON rewards(community_id);

-- Redemptions (status transitions are the only mutation path)
CREATE TABLE IF NOT EXISTS redemptions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    reward_id TEXT NOT NULL,
    community_id TEXT NOT NULL,
    redeemed_at INTEGER NOT NULL,
    status TEXT NOT NULL,
    points_spent INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_redemptions_user ON redemptions(community_id, user_id);
CREATE INDEX IF NOT EXISTS idx_redemptions_status ON redemptions(community_id, status);

-- Member display profiles (read-only here; owned by the membership layer)
CREATE TABLE IF NOT EXISTS user_profiles (
    community_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    avatar_url TEXT,
    PRIMARY KEY (community_id, user_id)
);

-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (2);
"#;
