//! Game Storage
//! Mission: Keep players, circles, spaces, models and payouts in one SQLite file
//!
//! Players belong to circles through `joined`. A space lives in one circle,
//! and only that circle's players may submit a model for it or receive a
//! payout from it.

use crate::models::{Circle, Model, PayoutRecord, Player, Space, Submission};
use crate::payouts::{CertaintyTable, PayoutTable};
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS players (
        uuid TEXT PRIMARY KEY,
        name TEXT UNIQUE NOT NULL,
        money REAL NOT NULL DEFAULT 0,
        risk INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE IF NOT EXISTS circles (
        uuid TEXT PRIMARY KEY,
        name TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS joined (
        player_uuid TEXT NOT NULL REFERENCES players(uuid) ON DELETE CASCADE,
        circle_uuid TEXT NOT NULL REFERENCES circles(uuid) ON DELETE CASCADE,
        joined_at INTEGER NOT NULL,
        PRIMARY KEY (player_uuid, circle_uuid)
    );
    CREATE TABLE IF NOT EXISTS spaces (
        uuid TEXT PRIMARY KEY,
        circle_uuid TEXT NOT NULL REFERENCES circles(uuid) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        pattern TEXT NOT NULL,
        fields TEXT NOT NULL,
        stake REAL NOT NULL
    );
    CREATE TABLE IF NOT EXISTS models (
        player_uuid TEXT NOT NULL REFERENCES players(uuid) ON DELETE CASCADE,
        space_uuid TEXT NOT NULL REFERENCES spaces(uuid) ON DELETE CASCADE,
        model TEXT NOT NULL,
        submitted_at INTEGER NOT NULL,
        PRIMARY KEY (player_uuid, space_uuid)
    );
    CREATE TABLE IF NOT EXISTS payouts (
        player_uuid TEXT NOT NULL REFERENCES players(uuid) ON DELETE CASCADE,
        space_uuid TEXT NOT NULL REFERENCES spaces(uuid) ON DELETE CASCADE,
        payout TEXT NOT NULL,
        calculated_at INTEGER NOT NULL,
        PRIMARY KEY (player_uuid, space_uuid)
    );
    CREATE INDEX IF NOT EXISTS idx_joined_circle ON joined(circle_uuid);
    CREATE INDEX IF NOT EXISTS idx_models_space ON models(space_uuid);
    CREATE INDEX IF NOT EXISTS idx_payouts_space ON payouts(space_uuid);
";

/// Storage errors the API needs to tell apart
#[derive(Debug)]
pub enum StoreError {
    /// Referenced entity does not exist
    NotFound(String),
    /// Player is not joined to the circle that owns the space
    NotMember { player: String, circle: Uuid },
    /// Unique constraint hit (e.g. player name taken)
    Conflict(String),
    /// Submitted data does not fit the space
    Invalid(String),
    Database(anyhow::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(what) => write!(f, "{} not found", what),
            StoreError::NotMember { player, circle } => {
                write!(f, "player {} has not joined circle {}", player, circle)
            }
            StoreError::Conflict(what) => write!(f, "{} already exists", what),
            StoreError::Invalid(reason) => write!(f, "{}", reason),
            StoreError::Database(err) => write!(f, "database error: {:#}", err),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.into())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Database(err.into())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

fn is_constraint(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

fn parse_uuid(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Database(e.into()))
}

fn from_timestamp(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_default()
}

fn player_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, f64, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_player((uuid, name, money, risk): (String, String, f64, i64)) -> StoreResult<Player> {
    Ok(Player {
        uuid: parse_uuid(&uuid)?,
        name,
        money,
        risk,
    })
}

/// SQLite-backed game store
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `db_path` and make sure the schema exists
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).context("open riverboat db")?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        let store = Self::init(conn)?;
        info!(path = db_path, "📦 Store opened");
        Ok(store)
    }

    /// Throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory db")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("enable foreign keys")?;
        conn.execute_batch(SCHEMA).context("create schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Round-trip to the database
    pub fn status(&self) -> Result<()> {
        let conn = self.conn.lock();
        let one: i64 = conn
            .query_row("SELECT 1", [], |row| row.get(0))
            .context("status query")?;
        anyhow::ensure!(one == 1, "unexpected status result {}", one);
        Ok(())
    }

    // ===== Players & circles =====

    pub fn create_player(&self, name: &str, money: f64, risk: i64) -> StoreResult<Player> {
        let player = Player {
            uuid: Uuid::new_v4(),
            name: name.trim().to_string(),
            money,
            risk,
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO players (uuid, name, money, risk) VALUES (?1, ?2, ?3, ?4)",
            params![player.uuid.to_string(), player.name, player.money, player.risk],
        )
        .map_err(|e| {
            if is_constraint(&e) {
                StoreError::Conflict(format!("player '{}'", player.name))
            } else {
                e.into()
            }
        })?;

        info!(player = %player.name, uuid = %player.uuid, "✅ Created player");
        Ok(player)
    }

    pub fn get_player(&self, puuid: &Uuid) -> StoreResult<Option<Player>> {
        let conn = self.conn.lock();
        Self::player(&conn, puuid)
    }

    fn player(conn: &Connection, puuid: &Uuid) -> StoreResult<Option<Player>> {
        conn.query_row(
            "SELECT uuid, name, money, risk FROM players WHERE uuid = ?1",
            params![puuid.to_string()],
            player_from_row,
        )
        .optional()?
        .map(into_player)
        .transpose()
    }

    pub fn create_circle(&self, name: &str) -> StoreResult<Circle> {
        let circle = Circle {
            uuid: Uuid::new_v4(),
            name: name.trim().to_string(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO circles (uuid, name) VALUES (?1, ?2)",
            params![circle.uuid.to_string(), circle.name],
        )?;

        info!(circle = %circle.name, uuid = %circle.uuid, "✅ Created circle");
        Ok(circle)
    }

    fn circle_exists(conn: &Connection, cuuid: &Uuid) -> StoreResult<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM circles WHERE uuid = ?1",
                params![cuuid.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn is_member(conn: &Connection, puuid: &Uuid, cuuid: &Uuid) -> StoreResult<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM joined WHERE player_uuid = ?1 AND circle_uuid = ?2",
                params![puuid.to_string(), cuuid.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Players joined to a circle, by name
    pub fn list_joined(&self, cuuid: &Uuid) -> StoreResult<Vec<Player>> {
        let conn = self.conn.lock();
        if !Self::circle_exists(&conn, cuuid)? {
            return Err(StoreError::NotFound(format!("circle {}", cuuid)));
        }

        let mut stmt = conn.prepare_cached(
            "SELECT p.uuid, p.name, p.money, p.risk
             FROM players p JOIN joined j ON j.player_uuid = p.uuid
             WHERE j.circle_uuid = ?1
             ORDER BY p.name",
        )?;
        let rows = stmt
            .query_map(params![cuuid.to_string()], player_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(into_player).collect()
    }

    /// Join a player to a circle. Joining twice is a no-op.
    pub fn join(&self, puuid: &Uuid, cuuid: &Uuid) -> StoreResult<Player> {
        let conn = self.conn.lock();
        let player = Self::player(&conn, puuid)?
            .ok_or_else(|| StoreError::NotFound(format!("player {}", puuid)))?;
        if !Self::circle_exists(&conn, cuuid)? {
            return Err(StoreError::NotFound(format!("circle {}", cuuid)));
        }

        conn.execute(
            "INSERT OR IGNORE INTO joined (player_uuid, circle_uuid, joined_at)
             VALUES (?1, ?2, ?3)",
            params![puuid.to_string(), cuuid.to_string(), Utc::now().timestamp()],
        )?;

        debug!(player = %player.name, circle = %cuuid, "join");
        Ok(player)
    }

    /// Remove a player from a circle. Returns whether they were a member.
    pub fn leave(&self, puuid: &Uuid, cuuid: &Uuid) -> StoreResult<bool> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM joined WHERE player_uuid = ?1 AND circle_uuid = ?2",
            params![puuid.to_string(), cuuid.to_string()],
        )?;

        debug!(player = %puuid, circle = %cuuid, removed, "leave");
        Ok(removed > 0)
    }

    /// Join one random player who is not already in the circle.
    /// `None` when every player is already a member.
    pub fn add_random(&self, cuuid: &Uuid) -> StoreResult<Option<Player>> {
        let conn = self.conn.lock();
        if !Self::circle_exists(&conn, cuuid)? {
            return Err(StoreError::NotFound(format!("circle {}", cuuid)));
        }

        let mut stmt = conn.prepare_cached(
            "SELECT uuid, name, money, risk FROM players
             WHERE uuid NOT IN (SELECT player_uuid FROM joined WHERE circle_uuid = ?1)",
        )?;
        let candidates = stmt
            .query_map(params![cuuid.to_string()], player_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let Some(pick) = candidates.choose(&mut rand::thread_rng()).cloned() else {
            return Ok(None);
        };
        let player = into_player(pick)?;

        conn.execute(
            "INSERT INTO joined (player_uuid, circle_uuid, joined_at) VALUES (?1, ?2, ?3)",
            params![player.uuid.to_string(), cuuid.to_string(), Utc::now().timestamp()],
        )?;

        info!(player = %player.name, circle = %cuuid, "🎲 Random player joined");
        Ok(Some(player))
    }

    // ===== Spaces =====

    pub fn create_space(
        &self,
        cuuid: &Uuid,
        name: &str,
        description: &str,
        pattern: &str,
        fields: &[String],
        stake: f64,
    ) -> StoreResult<Space> {
        let conn = self.conn.lock();
        if !Self::circle_exists(&conn, cuuid)? {
            return Err(StoreError::NotFound(format!("circle {}", cuuid)));
        }

        let space = Space {
            uuid: Uuid::new_v4(),
            circle_uuid: *cuuid,
            name: name.trim().to_string(),
            description: description.to_string(),
            pattern: pattern.to_string(),
            fields: fields.to_vec(),
            stake,
        };

        conn.execute(
            "INSERT INTO spaces (uuid, circle_uuid, name, description, pattern, fields, stake)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                space.uuid.to_string(),
                space.circle_uuid.to_string(),
                space.name,
                space.description,
                space.pattern,
                serde_json::to_string(&space.fields)?,
                space.stake,
            ],
        )?;

        info!(space = %space.name, uuid = %space.uuid, fields = space.fields.len(), "✅ Created space");
        Ok(space)
    }

    pub fn get_space(&self, suuid: &Uuid) -> StoreResult<Option<Space>> {
        let conn = self.conn.lock();
        Self::space(&conn, suuid)
    }

    fn space(conn: &Connection, suuid: &Uuid) -> StoreResult<Option<Space>> {
        let row = conn
            .query_row(
                "SELECT uuid, circle_uuid, name, description, pattern, fields, stake
                 FROM spaces WHERE uuid = ?1",
                params![suuid.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, f64>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((uuid, circle_uuid, name, description, pattern, fields, stake)) = row else {
            return Ok(None);
        };

        Ok(Some(Space {
            uuid: parse_uuid(&uuid)?,
            circle_uuid: parse_uuid(&circle_uuid)?,
            name,
            description,
            pattern,
            fields: serde_json::from_str(&fields)?,
            stake,
        }))
    }

    fn require_space(conn: &Connection, suuid: &Uuid) -> StoreResult<Space> {
        Self::space(conn, suuid)?.ok_or_else(|| StoreError::NotFound(format!("space {}", suuid)))
    }

    // ===== Models =====

    /// Store a player's model for a space, replacing any earlier one.
    ///
    /// The player must be joined to the space's circle and the model must
    /// carry every field of the space.
    pub fn submit_model(&self, puuid: &Uuid, suuid: &Uuid, model: &Model) -> StoreResult<()> {
        let conn = self.conn.lock();
        let space = Self::require_space(&conn, suuid)?;
        let player = Self::player(&conn, puuid)?
            .ok_or_else(|| StoreError::NotFound(format!("player {}", puuid)))?;
        if !Self::is_member(&conn, puuid, &space.circle_uuid)? {
            return Err(StoreError::NotMember {
                player: player.name,
                circle: space.circle_uuid,
            });
        }

        if let Some(missing) = space.fields.iter().find(|f| !model.contains_key(*f)) {
            return Err(StoreError::Invalid(format!(
                "model is missing field '{}'",
                missing
            )));
        }

        conn.execute(
            "INSERT INTO models (player_uuid, space_uuid, model, submitted_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(player_uuid, space_uuid)
             DO UPDATE SET model = excluded.model, submitted_at = excluded.submitted_at",
            params![
                puuid.to_string(),
                suuid.to_string(),
                serde_json::to_string(model)?,
                Utc::now().timestamp(),
            ],
        )?;

        info!(player = %player.name, space = %suuid, "📝 Model submitted");
        Ok(())
    }

    /// Remove a player's model and payout for a space. Returns whether anything was removed.
    pub fn delete_model(&self, puuid: &Uuid, suuid: &Uuid) -> StoreResult<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let models = tx.execute(
            "DELETE FROM models WHERE player_uuid = ?1 AND space_uuid = ?2",
            params![puuid.to_string(), suuid.to_string()],
        )?;
        let payouts = tx.execute(
            "DELETE FROM payouts WHERE player_uuid = ?1 AND space_uuid = ?2",
            params![puuid.to_string(), suuid.to_string()],
        )?;
        tx.commit()?;

        debug!(player = %puuid, space = %suuid, models, payouts, "model deleted");
        Ok(models + payouts > 0)
    }

    /// Models for a space from players still joined to its circle.
    /// A player who left keeps their row but drops out of play.
    fn submissions(conn: &Connection, space: &Space) -> StoreResult<Vec<Submission>> {
        let mut stmt = conn.prepare_cached(
            "SELECT p.name, p.uuid, m.model, m.submitted_at
             FROM models m
             JOIN players p ON p.uuid = m.player_uuid
             JOIN joined j ON j.player_uuid = m.player_uuid AND j.circle_uuid = ?2
             WHERE m.space_uuid = ?1
             ORDER BY p.name",
        )?;
        let rows = stmt
            .query_map(
                params![space.uuid.to_string(), space.circle_uuid.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(player, puuid, model, ts)| -> StoreResult<Submission> {
                Ok(Submission {
                    player,
                    puuid: parse_uuid(&puuid)?,
                    model: serde_json::from_str(&model)?,
                    submitted_at: from_timestamp(ts),
                })
            })
            .collect()
    }

    /// Models submitted for a space by current members of its circle
    pub fn list_models(&self, suuid: &Uuid) -> StoreResult<Vec<Submission>> {
        let conn = self.conn.lock();
        let space = Self::require_space(&conn, suuid)?;
        Self::submissions(&conn, &space)
    }

    /// Certainties for a space keyed by player name, ready for the payout engine
    pub fn map_models(&self, suuid: &Uuid) -> StoreResult<CertaintyTable> {
        let conn = self.conn.lock();
        let space = Self::require_space(&conn, suuid)?;
        let table: CertaintyTable = Self::submissions(&conn, &space)?
            .into_iter()
            .map(|s| (s.player, s.model))
            .collect();

        debug!(space = %suuid, players = table.len(), "mapped models");
        Ok(table)
    }

    // ===== Payouts =====

    /// Store one payout record per player in `payouts` for a space, all or nothing.
    /// Returns the number of records written.
    pub fn post_payouts(&self, suuid: &Uuid, payouts: &PayoutTable) -> StoreResult<usize> {
        let mut conn = self.conn.lock();
        let space = Self::require_space(&conn, suuid)?;
        let now = Utc::now().timestamp();

        let tx = conn.transaction()?;
        for (name, payout) in payouts {
            let puuid: Option<String> = tx
                .query_row(
                    "SELECT uuid FROM players WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;
            let puuid = puuid.ok_or_else(|| StoreError::NotFound(format!("player '{}'", name)))?;
            if !Self::is_member(&tx, &parse_uuid(&puuid)?, &space.circle_uuid)? {
                return Err(StoreError::NotMember {
                    player: name.clone(),
                    circle: space.circle_uuid,
                });
            }

            tx.execute(
                "INSERT INTO payouts (player_uuid, space_uuid, payout, calculated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(player_uuid, space_uuid)
                 DO UPDATE SET payout = excluded.payout, calculated_at = excluded.calculated_at",
                params![puuid, suuid.to_string(), serde_json::to_string(payout)?, now],
            )?;
        }
        tx.commit()?;

        info!(space = %suuid, players = payouts.len(), "💰 Payouts posted");
        Ok(payouts.len())
    }

    /// Every payout stored for a space
    pub fn list_payouts(&self, suuid: &Uuid) -> StoreResult<Vec<PayoutRecord>> {
        let conn = self.conn.lock();
        Self::require_space(&conn, suuid)?;

        let mut stmt = conn.prepare_cached(
            "SELECT p.name, p.uuid, o.payout, o.calculated_at
             FROM payouts o JOIN players p ON p.uuid = o.player_uuid
             WHERE o.space_uuid = ?1
             ORDER BY p.name",
        )?;
        let rows = stmt
            .query_map(params![suuid.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(player, puuid, payout, ts)| -> StoreResult<PayoutRecord> {
                Ok(PayoutRecord {
                    player,
                    puuid: parse_uuid(&puuid)?,
                    payouts: serde_json::from_str::<BTreeMap<String, f64>>(&payout)?,
                    calculated_at: from_timestamp(ts),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Pattern, WinByMethod};
    use tempfile::NamedTempFile;

    struct Fixture {
        store: Store,
        circle: Circle,
        space: Space,
    }

    fn fixture() -> Fixture {
        let store = Store::open_in_memory().unwrap();
        let circle = store.create_circle("Friday fights").unwrap();
        let space = store
            .create_space(
                &circle.uuid,
                "Main event",
                "",
                Pattern::WinByMethod.as_str(),
                &Pattern::WinByMethod.fields(),
                100.0,
            )
            .unwrap();
        Fixture {
            store,
            circle,
            space,
        }
    }

    fn model(a_by_dec: f64) -> Model {
        WinByMethod {
            a_by_dec,
            a_by_ko: 20.0,
            b_by_dec: 20.0,
            b_by_ko: 10.0,
            draw_nc: 5.0,
        }
        .to_model()
    }

    #[test]
    fn test_status_and_reopen_on_disk() {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_str().unwrap();

        let store = Store::open(path).unwrap();
        store.status().unwrap();
        let player = store.create_player("Yakub", 50.0, 2).unwrap();
        drop(store);

        let reopened = Store::open(path).unwrap();
        assert_eq!(reopened.get_player(&player.uuid).unwrap(), Some(player));
    }

    #[test]
    fn test_duplicate_player_name_conflicts() {
        let store = Store::open_in_memory().unwrap();
        store.create_player("Mary", 0.0, 0).unwrap();

        let err = store.create_player("Mary", 0.0, 0).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_join_leave() {
        let f = fixture();
        let mary = f.store.create_player("Mary", 0.0, 0).unwrap();
        let abe = f.store.create_player("Abe", 0.0, 0).unwrap();

        f.store.join(&mary.uuid, &f.circle.uuid).unwrap();
        f.store.join(&abe.uuid, &f.circle.uuid).unwrap();
        f.store.join(&abe.uuid, &f.circle.uuid).unwrap();

        let joined = f.store.list_joined(&f.circle.uuid).unwrap();
        let names: Vec<&str> = joined.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Abe", "Mary"]);

        assert!(f.store.leave(&abe.uuid, &f.circle.uuid).unwrap());
        assert!(!f.store.leave(&abe.uuid, &f.circle.uuid).unwrap());
        assert_eq!(f.store.list_joined(&f.circle.uuid).unwrap().len(), 1);
    }

    #[test]
    fn test_join_unknown_entities() {
        let f = fixture();
        let mary = f.store.create_player("Mary", 0.0, 0).unwrap();

        let err = f.store.join(&Uuid::new_v4(), &f.circle.uuid).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = f.store.join(&mary.uuid, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = f.store.list_joined(&Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_add_random_fills_until_empty() {
        let f = fixture();
        for name in ["a", "b", "c"] {
            f.store.create_player(name, 0.0, 0).unwrap();
        }

        let mut picked = Vec::new();
        for _ in 0..3 {
            let player = f.store.add_random(&f.circle.uuid).unwrap().unwrap();
            assert!(!picked.contains(&player.name));
            picked.push(player.name);
        }

        assert_eq!(f.store.add_random(&f.circle.uuid).unwrap(), None);
        assert_eq!(f.store.list_joined(&f.circle.uuid).unwrap().len(), 3);
    }

    #[test]
    fn test_get_space() {
        let f = fixture();

        let space = f.store.get_space(&f.space.uuid).unwrap().unwrap();
        assert_eq!(space, f.space);
        assert_eq!(space.fields.len(), 5);
        assert!(f.store.get_space(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_submit_requires_membership() {
        let f = fixture();
        let mary = f.store.create_player("Mary", 0.0, 0).unwrap();

        let err = f
            .store
            .submit_model(&mary.uuid, &f.space.uuid, &model(40.0))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotMember { .. }));

        f.store.join(&mary.uuid, &f.circle.uuid).unwrap();
        f.store
            .submit_model(&mary.uuid, &f.space.uuid, &model(40.0))
            .unwrap();
    }

    #[test]
    fn test_submit_rejects_incomplete_model() {
        let f = fixture();
        let mary = f.store.create_player("Mary", 0.0, 0).unwrap();
        f.store.join(&mary.uuid, &f.circle.uuid).unwrap();

        let mut partial = model(40.0);
        partial.remove("draw_nc");

        let err = f
            .store
            .submit_model(&mary.uuid, &f.space.uuid, &partial)
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn test_resubmit_replaces_and_maps_by_name() {
        let f = fixture();
        let mary = f.store.create_player("Mary", 0.0, 0).unwrap();
        let abe = f.store.create_player("Abe", 0.0, 0).unwrap();
        for p in [&mary, &abe] {
            f.store.join(&p.uuid, &f.circle.uuid).unwrap();
        }

        f.store
            .submit_model(&mary.uuid, &f.space.uuid, &model(40.0))
            .unwrap();
        f.store
            .submit_model(&mary.uuid, &f.space.uuid, &model(65.0))
            .unwrap();
        f.store
            .submit_model(&abe.uuid, &f.space.uuid, &model(10.0))
            .unwrap();

        let listed = f.store.list_models(&f.space.uuid).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].player, "Abe");

        let table = f.store.map_models(&f.space.uuid).unwrap();
        assert_eq!(table["Mary"]["a_by_dec"], 65.0);
        assert_eq!(table["Abe"]["a_by_dec"], 10.0);
    }

    #[test]
    fn test_post_and_list_payouts() {
        let f = fixture();
        let mary = f.store.create_player("Mary", 0.0, 0).unwrap();
        f.store.join(&mary.uuid, &f.circle.uuid).unwrap();

        let mut payouts = PayoutTable::new();
        payouts.insert("Mary".to_string(), model(-12.5));
        assert_eq!(f.store.post_payouts(&f.space.uuid, &payouts).unwrap(), 1);

        payouts.insert("Mary".to_string(), model(7.25));
        f.store.post_payouts(&f.space.uuid, &payouts).unwrap();

        let stored = f.store.list_payouts(&f.space.uuid).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].puuid, mary.uuid);
        assert_eq!(stored[0].payouts["a_by_dec"], 7.25);
    }

    #[test]
    fn test_post_payouts_is_all_or_nothing() {
        let f = fixture();
        let mary = f.store.create_player("Mary", 0.0, 0).unwrap();
        f.store.create_player("Outsider", 0.0, 0).unwrap();
        f.store.join(&mary.uuid, &f.circle.uuid).unwrap();

        let mut payouts = PayoutTable::new();
        payouts.insert("Mary".to_string(), model(1.0));
        payouts.insert("Outsider".to_string(), model(-1.0));

        let err = f.store.post_payouts(&f.space.uuid, &payouts).unwrap_err();
        assert!(matches!(err, StoreError::NotMember { .. }));
        assert!(f.store.list_payouts(&f.space.uuid).unwrap().is_empty());
    }

    #[test]
    fn test_delete_model_removes_payout() {
        let f = fixture();
        let mary = f.store.create_player("Mary", 0.0, 0).unwrap();
        f.store.join(&mary.uuid, &f.circle.uuid).unwrap();
        f.store
            .submit_model(&mary.uuid, &f.space.uuid, &model(40.0))
            .unwrap();
        let mut payouts = PayoutTable::new();
        payouts.insert("Mary".to_string(), model(0.0));
        f.store.post_payouts(&f.space.uuid, &payouts).unwrap();

        assert!(f.store.delete_model(&mary.uuid, &f.space.uuid).unwrap());
        assert!(f.store.list_models(&f.space.uuid).unwrap().is_empty());
        assert!(f.store.list_payouts(&f.space.uuid).unwrap().is_empty());
        assert!(!f.store.delete_model(&mary.uuid, &f.space.uuid).unwrap());
    }

    #[test]
    fn test_departed_player_drops_out_of_calculation() {
        let f = fixture();
        let mut players = Vec::new();
        for (name, a_by_dec) in [("A", 10.0), ("B", 50.0), ("X", 90.0)] {
            let p = f.store.create_player(name, 0.0, 0).unwrap();
            f.store.join(&p.uuid, &f.circle.uuid).unwrap();
            f.store
                .submit_model(&p.uuid, &f.space.uuid, &model(a_by_dec))
                .unwrap();
            players.push(p);
        }

        assert!(f.store.leave(&players[2].uuid, &f.circle.uuid).unwrap());

        let table = f.store.map_models(&f.space.uuid).unwrap();
        let names: Vec<&str> = table.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(f.store.list_models(&f.space.uuid).unwrap().len(), 2);

        let payouts =
            crate::payouts::compute_payouts(&table, &f.space.fields, f.space.stake).unwrap();
        assert_eq!(f.store.post_payouts(&f.space.uuid, &payouts).unwrap(), 2);

        // Rejoining brings the old model back into play
        f.store.join(&players[2].uuid, &f.circle.uuid).unwrap();
        assert!(f.store.map_models(&f.space.uuid).unwrap().contains_key("X"));
    }
}
