// SQLite persistence for managers, gameweek history, and engine state.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use gaffer_core::manager::Manager;
use gaffer_core::player::PlayerId;
use gaffer_core::scoring::{GameweekResult, PlayerGameweek};
use gaffer_core::squad::SquadState;

/// SQLite-backed store. Managers hold their squad as a JSON blob; each
/// scored gameweek is one row in `gameweek_results`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `path` and ensure the schema exists.
    /// `":memory:"` gives an ephemeral database for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS managers (
                id           TEXT PRIMARY KEY,
                name         TEXT NOT NULL,
                squad_json   TEXT NOT NULL,
                total_points INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS gameweek_results (
                manager_id   TEXT NOT NULL REFERENCES managers(id),
                gameweek     INTEGER NOT NULL,
                total_points INTEGER NOT NULL,
                squad_points INTEGER NOT NULL,
                bench_points INTEGER NOT NULL,
                player_stats TEXT NOT NULL,
                played_at    TEXT NOT NULL,
                PRIMARY KEY (manager_id, gameweek)
            );

            CREATE TABLE IF NOT EXISTS engine_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Panics if the mutex is poisoned, which only happens if another thread
    /// panicked while holding the lock.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Managers
    // ------------------------------------------------------------------

    /// Insert a manager or update their name and squad. The stored
    /// `total_points` is only written on first insert; afterwards it is
    /// maintained by [`Database::record_gameweek`].
    pub fn save_manager(&self, manager: &Manager) -> Result<()> {
        let conn = self.conn();
        let squad_json =
            serde_json::to_string(&manager.squad).context("failed to serialize squad")?;
        conn.execute(
            "INSERT INTO managers (id, name, squad_json, total_points)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                name       = excluded.name,
                squad_json = excluded.squad_json",
            params![manager.id, manager.name, squad_json, manager.total_points],
        )
        .context("failed to save manager")?;
        Ok(())
    }

    /// Load every manager with their history, ordered by id. History rows are
    /// ordered by gameweek.
    pub fn load_managers(&self) -> Result<Vec<Manager>> {
        let conn = self.conn();

        let mut stmt = conn
            .prepare("SELECT id, name, squad_json, total_points FROM managers ORDER BY id")
            .context("failed to prepare load_managers query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .context("failed to query managers")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map manager rows")?;

        let mut history_stmt = conn
            .prepare(
                "SELECT gameweek, total_points, squad_points, bench_points, player_stats, played_at
                 FROM gameweek_results WHERE manager_id = ?1 ORDER BY gameweek",
            )
            .context("failed to prepare history query")?;

        let mut managers = Vec::with_capacity(rows.len());
        for (id, name, squad_json, total_points) in rows {
            let squad: SquadState = serde_json::from_str(&squad_json)
                .with_context(|| format!("failed to deserialize squad for manager {id}"))?;

            let raw_history = history_stmt
                .query_map(params![id], |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, i32>(1)?,
                        row.get::<_, i32>(2)?,
                        row.get::<_, i32>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                })
                .context("failed to query gameweek history")?
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("failed to map gameweek rows")?;

            let mut history = Vec::with_capacity(raw_history.len());
            for (gameweek, total, squad_pts, bench_pts, stats_json, played_at) in raw_history {
                let player_stats: BTreeMap<PlayerId, PlayerGameweek> =
                    serde_json::from_str(&stats_json).with_context(|| {
                        format!("failed to deserialize player stats for {id} gameweek {gameweek}")
                    })?;
                let date = DateTime::parse_from_rfc3339(&played_at)
                    .with_context(|| format!("invalid played_at timestamp '{played_at}'"))?
                    .with_timezone(&Utc);
                history.push(GameweekResult {
                    gameweek,
                    total_points: total,
                    squad_points: squad_pts,
                    bench_points: bench_pts,
                    player_stats,
                    date,
                });
            }

            managers.push(Manager {
                id,
                name,
                squad,
                history,
                total_points,
            });
        }

        Ok(managers)
    }

    /// Store a scored gameweek and add its points to the manager's total in
    /// one transaction. Recording the same gameweek twice fails.
    pub fn record_gameweek(&self, manager_id: &str, result: &GameweekResult) -> Result<()> {
        let mut conn = self.conn();
        let stats_json = serde_json::to_string(&result.player_stats)
            .context("failed to serialize player stats")?;

        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute(
            "INSERT INTO gameweek_results
                (manager_id, gameweek, total_points, squad_points, bench_points, player_stats, played_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                manager_id,
                result.gameweek,
                result.total_points,
                result.squad_points,
                result.bench_points,
                stats_json,
                result.date.to_rfc3339(),
            ],
        )
        .with_context(|| {
            format!("failed to record gameweek {} for manager {manager_id}", result.gameweek)
        })?;
        let updated = tx
            .execute(
                "UPDATE managers SET total_points = total_points + ?1 WHERE id = ?2",
                params![result.total_points, manager_id],
            )
            .context("failed to update manager total")?;
        if updated == 0 {
            anyhow::bail!("unknown manager {manager_id}");
        }
        tx.commit().context("failed to commit gameweek")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Engine state
    // ------------------------------------------------------------------

    /// Persist a JSON value under `key`, replacing any previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str = serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO engine_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM engine_state WHERE key = ?1")
            .context("failed to prepare load_state query")?;
        let mut rows = stmt
            .query_map(params![key], |row| row.get::<_, String>(0))
            .context("failed to query engine state")?;

        match rows.next() {
            Some(row) => {
                let json_str = row.context("failed to read state row")?;
                let value = serde_json::from_str(&json_str)
                    .context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    const GAMEWEEK_KEY: &'static str = "current_gameweek";

    /// The last gameweek played league-wide, or 0 before the season starts.
    pub fn current_gameweek(&self) -> Result<u32> {
        let value = self.load_state(Self::GAMEWEEK_KEY)?;
        Ok(value
            .and_then(|v| v.as_u64())
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0))
    }

    pub fn set_current_gameweek(&self, gameweek: u32) -> Result<()> {
        self.save_state(Self::GAMEWEEK_KEY, &serde_json::Value::from(gameweek))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaffer_core::player::{Attributes, Player, Position};
    use gaffer_core::scoring::SimulatedStats;

    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory db should open")
    }

    fn keeper(id: PlayerId) -> Player {
        Player::with_derived_rating(id, "Keeper", Position::Goalkeeper, "Club", "Nation", Attributes::default(), 100)
    }

    fn scored_result(manager: &Manager, gameweek: u32, seed: u64) -> GameweekResult {
        let mut source = SimulatedStats::seeded(seed);
        manager.score_gameweek(gameweek, &mut source)
    }

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert!(tables.contains(&"managers".to_string()));
        assert!(tables.contains(&"gameweek_results".to_string()));
        assert!(tables.contains(&"engine_state".to_string()));
    }

    #[test]
    fn save_and_load_manager_with_squad() {
        let db = test_db();
        let mut m = Manager::new("m1", "Ada", 1_000);
        m.squad.add_to_squad(keeper(1)).unwrap();
        db.save_manager(&m).unwrap();

        let loaded = db.load_managers().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], m);
        assert_eq!(loaded[0].squad.budget, 900);
    }

    #[test]
    fn save_manager_updates_squad() {
        let db = test_db();
        let mut m = Manager::new("m1", "Ada", 1_000);
        db.save_manager(&m).unwrap();
        m.squad.add_to_bench(keeper(7)).unwrap();
        m.name = "Ada L.".into();
        db.save_manager(&m).unwrap();

        let loaded = db.load_managers().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Ada L.");
        assert_eq!(loaded[0].squad.bench.len(), 1);
    }

    #[test]
    fn record_gameweek_round_trip_and_total() {
        let db = test_db();
        let mut m = Manager::new("m1", "Ada", 1_000);
        m.squad.add_to_squad(keeper(1)).unwrap();
        db.save_manager(&m).unwrap();

        for gw in 1..=3 {
            let result = scored_result(&m, gw, u64::from(gw));
            db.record_gameweek(&m.id, &result).unwrap();
            m.record(result).unwrap();
        }

        let loaded = db.load_managers().unwrap();
        let restored = &loaded[0];
        assert_eq!(restored.history.len(), 3);
        assert_eq!(
            restored.history.iter().map(|r| r.gameweek).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(restored.total_points, m.total_points);
        assert_eq!(restored.history[1].player_stats, m.history[1].player_stats);
    }

    #[test]
    fn record_same_gameweek_twice_fails_and_keeps_total() {
        let db = test_db();
        let m = Manager::new("m1", "Ada", 1_000);
        db.save_manager(&m).unwrap();

        let mut result = scored_result(&m, 1, 1);
        result.total_points = 12;
        db.record_gameweek(&m.id, &result).unwrap();
        assert!(db.record_gameweek(&m.id, &result).is_err());

        let loaded = db.load_managers().unwrap();
        assert_eq!(loaded[0].total_points, 12);
        assert_eq!(loaded[0].history.len(), 1);
    }

    #[test]
    fn record_for_unknown_manager_fails() {
        let db = test_db();
        let m = Manager::new("ghost", "Ghost", 1);
        let result = scored_result(&m, 1, 1);
        assert!(db.record_gameweek("ghost", &result).is_err());
    }

    #[test]
    fn save_and_load_state_round_trip() {
        let db = test_db();
        let value = serde_json::json!({"season": "2026/27", "paused": false});
        db.save_state("meta", &value).unwrap();
        assert_eq!(db.load_state("meta").unwrap(), Some(value));
        assert_eq!(db.load_state("missing").unwrap(), None);
    }

    #[test]
    fn current_gameweek_defaults_to_zero() {
        let db = test_db();
        assert_eq!(db.current_gameweek().unwrap(), 0);
        db.set_current_gameweek(4).unwrap();
        db.set_current_gameweek(5).unwrap();
        assert_eq!(db.current_gameweek().unwrap(), 5);
    }
}
