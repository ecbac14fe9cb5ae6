// Application state and the command loop.
//
// The loop is the only writer of manager state: commands arrive one at a time
// from the WebSocket server, so mutations to any one manager never overlap.
// League-wide simulation fans out to blocking tasks and merges the results
// back on the loop.

use std::collections::BTreeMap;

use anyhow::Context;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use gaffer_core::chemistry::compute_chemistry;
use gaffer_core::formation::Formation;
use gaffer_core::manager::{rank_managers, Manager};
use gaffer_core::player::{Player, PlayerId};
use gaffer_core::scoring::{
    simulate_gameweek, simulate_player_pool, GameweekResult, ProviderStatLine, RecordedStats,
    SimulatedStats,
};
use gaffer_core::squad::{SquadError, SquadState};

use crate::catalog::PlayerCatalog;
use crate::config::Config;
use crate::db::Database;
use crate::protocol::{Command, FormationOverflow, ManagerScore, Response, SquadSnapshot, TopScorer};
use crate::ws_server::WsEvent;

/// Top scorers returned by `SCORE_POOL` when no limit is given.
pub const DEFAULT_TOP_SCORERS: usize = 10;

/// Derive a per-task seed from the configured seed, the gameweek, and a key
/// (usually the manager id), so results do not depend on scheduling order.
pub fn derive_seed(base: u64, gameweek: u32, key: &str) -> u64 {
    let mut hash = base ^ u64::from(gameweek).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    for byte in key.bytes() {
        hash = (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub config: Config,
    pub catalog: PlayerCatalog,
    pub formations: Vec<Formation>,
    pub managers: BTreeMap<String, Manager>,
    pub db: Database,
    /// Last gameweek played league-wide.
    pub current_gameweek: u32,
}

impl AppState {
    pub fn new(config: Config, catalog: PlayerCatalog, db: Database) -> anyhow::Result<Self> {
        let formations = config.formations().context("invalid formation config")?;
        Ok(AppState {
            config,
            catalog,
            formations,
            managers: BTreeMap::new(),
            db,
            current_gameweek: 0,
        })
    }

    /// Parse and execute one raw command frame, returning the JSON reply.
    pub async fn handle_request(&mut self, payload: &str) -> String {
        let response = match serde_json::from_str::<Command>(payload) {
            Ok(cmd) => self.handle_command(cmd).await,
            Err(e) => {
                warn!("Rejecting malformed command: {}", e);
                Response::error(format!("invalid command: {e}"))
            }
        };
        response.to_json()
    }

    pub async fn handle_command(&mut self, cmd: Command) -> Response {
        debug!("Handling command: {:?}", cmd);
        match cmd {
            Command::Register { manager_id, name } => self.register(manager_id, name),
            Command::SelectFormation {
                manager_id,
                formation_id,
            } => self.select_formation(&manager_id, &formation_id),
            Command::AddToSquad {
                manager_id,
                player_id,
            } => self.with_catalog_player(&manager_id, player_id, |squad, player| {
                squad.add_to_squad(player)
            }),
            Command::AddToBench {
                manager_id,
                player_id,
            } => self.with_catalog_player(&manager_id, player_id, |squad, player| {
                squad.add_to_bench(player)
            }),
            Command::RemoveFromSquad {
                manager_id,
                player_id,
            } => self.mutate_squad(&manager_id, |squad| {
                squad
                    .remove_from_squad(player_id)
                    .map(|_| ())
                    .ok_or(SquadError::PlayerNotFound { id: player_id })
            }),
            Command::RemoveFromBench {
                manager_id,
                player_id,
            } => self.mutate_squad(&manager_id, |squad| {
                squad
                    .remove_from_bench(player_id)
                    .map(|_| ())
                    .ok_or(SquadError::PlayerNotFound { id: player_id })
            }),
            Command::Substitute {
                manager_id,
                squad_player_id,
                bench_player_id,
            } => self.mutate_squad(&manager_id, |squad| {
                squad.substitute(squad_player_id, bench_player_id)
            }),
            Command::GetSquad { manager_id } => match self.managers.get(&manager_id) {
                Some(m) => Response::Squad(snapshot(m)),
                None => unknown_manager(&manager_id),
            },
            Command::Chemistry { manager_id } => match self.managers.get(&manager_id) {
                Some(m) => Response::Chemistry {
                    manager_id,
                    report: compute_chemistry(&m.squad.squad),
                },
                None => unknown_manager(&manager_id),
            },
            Command::SimulateGameweek { manager_id } => self.simulate_manager(&manager_id),
            Command::SimulateAll => match self.simulate_all().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("League simulation failed: {:#}", e);
                    Response::error(format!("simulation failed: {e}"))
                }
            },
            Command::RecordGameweek { gameweek, stats } => self.record_gameweek(gameweek, &stats),
            Command::ScorePool { gameweek, limit } => self.score_pool(gameweek, limit),
            Command::Leaderboard => {
                let managers: Vec<Manager> = self.managers.values().cloned().collect();
                Response::Leaderboard {
                    entries: rank_managers(&managers),
                }
            }
            Command::History { manager_id } => match self.managers.get(&manager_id) {
                Some(m) => Response::History {
                    manager_id,
                    total_points: m.total_points,
                    history: m.history.clone(),
                },
                None => unknown_manager(&manager_id),
            },
            Command::ListFormations => Response::Formations {
                formations: self.formations.clone(),
            },
            Command::ListPlayers { position } => Response::Players {
                players: match position {
                    Some(pos) => self.catalog.by_position(pos).into_iter().cloned().collect(),
                    None => self.catalog.all().to_vec(),
                },
            },
        }
    }

    // -----------------------------------------------------------------------
    // Managers and squads
    // -----------------------------------------------------------------------

    fn register(&mut self, manager_id: String, name: String) -> Response {
        if manager_id.trim().is_empty() {
            return Response::error("manager id must not be empty");
        }
        if self.managers.contains_key(&manager_id) {
            return Response::error(format!("manager '{manager_id}' is already registered"));
        }

        let manager = Manager::new(manager_id.clone(), name, self.config.league.starting_budget);
        if let Err(e) = self.db.save_manager(&manager) {
            warn!("Failed to persist new manager {}: {:#}", manager_id, e);
            return Response::error("failed to save manager");
        }
        info!("Registered manager {} ({})", manager.id, manager.name);
        let resp = Response::Squad(snapshot(&manager));
        self.managers.insert(manager_id, manager);
        resp
    }

    fn select_formation(&mut self, manager_id: &str, formation_id: &str) -> Response {
        let Some(formation) = self.formations.iter().find(|f| f.id == formation_id).cloned() else {
            return Response::error(format!("unknown formation '{formation_id}'"));
        };
        self.mutate_squad(manager_id, move |squad| {
            squad.set_formation(formation);
            Ok(())
        })
    }

    fn with_catalog_player<F>(&mut self, manager_id: &str, player_id: PlayerId, op: F) -> Response
    where
        F: FnOnce(&mut SquadState, Player) -> Result<(), SquadError>,
    {
        let Some(player) = self.catalog.get(player_id).cloned() else {
            return Response::error(format!("unknown player {player_id}"));
        };
        self.mutate_squad(manager_id, |squad| op(squad, player))
    }

    /// Apply `op` to a copy of the manager's squad, persist it, and only then
    /// commit it in memory. Rejections and storage failures leave the manager
    /// untouched.
    fn mutate_squad<F>(&mut self, manager_id: &str, op: F) -> Response
    where
        F: FnOnce(&mut SquadState) -> Result<(), SquadError>,
    {
        let Some(current) = self.managers.get(manager_id) else {
            return unknown_manager(manager_id);
        };

        let mut updated = current.clone();
        if let Err(e) = op(&mut updated.squad) {
            debug!("Rejected squad change for {}: {}", manager_id, e);
            return Response::rejected(&e);
        }
        if let Err(e) = self.db.save_manager(&updated) {
            warn!("Failed to persist squad for {}: {:#}", manager_id, e);
            return Response::error("failed to save squad");
        }

        let resp = Response::Squad(snapshot(&updated));
        self.managers.insert(manager_id.to_string(), updated);
        resp
    }

    // -----------------------------------------------------------------------
    // Gameweeks
    // -----------------------------------------------------------------------

    /// Persist a scored gameweek, then append it to the manager's history.
    fn commit_result(&mut self, manager_id: &str, result: GameweekResult) -> anyhow::Result<()> {
        let manager = self
            .managers
            .get_mut(manager_id)
            .with_context(|| format!("unknown manager {manager_id}"))?;
        if !manager.can_record(result.gameweek) {
            anyhow::bail!(
                "manager {manager_id} already has gameweek {} or later",
                result.gameweek
            );
        }
        self.db.record_gameweek(manager_id, &result)?;
        manager.record(result)?;
        Ok(())
    }

    fn simulate_manager(&mut self, manager_id: &str) -> Response {
        let Some(manager) = self.managers.get(manager_id) else {
            return unknown_manager(manager_id);
        };
        let gameweek = manager.next_gameweek();
        let mut source =
            SimulatedStats::seeded(derive_seed(self.config.simulation.seed, gameweek, manager_id));
        let result = manager.score_gameweek(gameweek, &mut source);

        if let Err(e) = self.commit_result(manager_id, result.clone()) {
            warn!("Failed to record gameweek {} for {}: {:#}", gameweek, manager_id, e);
            return Response::error(format!("failed to record gameweek {gameweek}"));
        }
        info!(
            "Simulated gameweek {} for {}: {} points",
            gameweek, manager_id, result.total_points
        );
        Response::Gameweek {
            manager_id: manager_id.to_string(),
            result,
        }
    }

    /// Managers who have not yet played `gameweek`.
    fn eligible_for(&self, gameweek: u32) -> Vec<&Manager> {
        self.managers
            .values()
            .filter(|m| {
                let ok = m.can_record(gameweek);
                if !ok {
                    debug!("Skipping {}: gameweek {} already recorded", m.id, gameweek);
                }
                ok
            })
            .collect()
    }

    /// Simulate the next league gameweek for every manager. Each manager is
    /// scored on its own blocking task with its own seeded generator.
    pub async fn simulate_all(&mut self) -> anyhow::Result<Response> {
        let gameweek = self.current_gameweek + 1;
        let base_seed = self.config.simulation.seed;

        let mut tasks = JoinSet::new();
        for manager in self.eligible_for(gameweek) {
            let id = manager.id.clone();
            let squad = manager.squad.squad.clone();
            let bench = manager.squad.bench.clone();
            tasks.spawn_blocking(move || {
                let mut source = SimulatedStats::seeded(derive_seed(base_seed, gameweek, &id));
                let result = simulate_gameweek(&squad, &bench, gameweek, &mut source);
                (id, result)
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            results.push(joined.context("simulation task failed")?);
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(self.finish_gameweek(gameweek, results))
    }

    /// Score every manager from provider stat lines.
    fn record_gameweek(&mut self, gameweek: Option<u32>, stats: &[ProviderStatLine]) -> Response {
        let gameweek = gameweek.unwrap_or(self.current_gameweek + 1);
        if gameweek <= self.current_gameweek {
            return Response::error(format!(
                "gameweek {gameweek} has already been played (current: {})",
                self.current_gameweek
            ));
        }

        let mut source = RecordedStats::from_lines(stats);
        if source.len() < stats.len() {
            warn!(
                "{} duplicate stat lines for gameweek {}; keeping the last line per player",
                stats.len() - source.len(),
                gameweek
            );
        }
        info!("Recording gameweek {} from {} stat lines", gameweek, source.len());

        let results: Vec<(String, GameweekResult)> = self
            .eligible_for(gameweek)
            .into_iter()
            .map(|m| (m.id.clone(), m.score_gameweek(gameweek, &mut source)))
            .collect();

        self.finish_gameweek(gameweek, results)
    }

    /// Commit each manager's result, advance the league gameweek, and
    /// summarize. A manager whose result cannot be stored is left out.
    fn finish_gameweek(&mut self, gameweek: u32, results: Vec<(String, GameweekResult)>) -> Response {
        let mut scores = Vec::with_capacity(results.len());
        for (id, result) in results {
            let (total, bench) = (result.total_points, result.bench_points);
            if let Err(e) = self.commit_result(&id, result) {
                warn!("Failed to record gameweek {} for {}: {:#}", gameweek, id, e);
                continue;
            }
            if let Some(m) = self.managers.get(&id) {
                scores.push(ManagerScore {
                    manager_id: id.clone(),
                    name: m.name.clone(),
                    total_points: total,
                    bench_points: bench,
                    season_points: m.total_points,
                });
            }
        }

        self.current_gameweek = self.current_gameweek.max(gameweek);
        if let Err(e) = self.db.set_current_gameweek(self.current_gameweek) {
            warn!("Failed to persist current gameweek: {:#}", e);
        }
        info!("Gameweek {} complete: {} managers scored", gameweek, scores.len());

        Response::GameweekComplete { gameweek, scores }
    }

    fn score_pool(&self, gameweek: Option<u32>, limit: Option<usize>) -> Response {
        let gameweek = gameweek.unwrap_or(self.current_gameweek + 1);
        let mut source =
            SimulatedStats::seeded(derive_seed(self.config.simulation.seed, gameweek, "pool"));
        let pool = simulate_player_pool(self.catalog.all(), gameweek, &mut source);

        let top_scorers = pool
            .top_scorers(limit.unwrap_or(DEFAULT_TOP_SCORERS))
            .into_iter()
            .filter_map(|(id, points)| {
                self.catalog.get(id).map(|p| TopScorer {
                    player_id: id,
                    name: p.name.clone(),
                    position: p.position,
                    points,
                })
            })
            .collect();

        Response::PoolScored {
            gameweek,
            players_scored: pool.player_points.len(),
            top_scorers,
        }
    }
}

fn unknown_manager(manager_id: &str) -> Response {
    Response::error(format!("unknown manager '{manager_id}'"))
}

fn snapshot(manager: &Manager) -> SquadSnapshot {
    SquadSnapshot {
        manager_id: manager.id.clone(),
        name: manager.name.clone(),
        squad_value: manager.squad.squad_value(),
        overflow: manager
            .squad
            .formation_overflow()
            .into_iter()
            .map(|(position, surplus)| FormationOverflow { position, surplus })
            .collect(),
        state: manager.squad.clone(),
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the command loop until the WebSocket channel closes or `shutdown`
/// fires.
pub async fn run(
    mut ws_rx: mpsc::Receiver<WsEvent>,
    mut shutdown: oneshot::Receiver<()>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    loop {
        tokio::select! {
            ws_event = ws_rx.recv() => {
                match ws_event {
                    Some(WsEvent::Connected { addr }) => {
                        info!("Client connected: {}", addr);
                    }
                    Some(WsEvent::Disconnected { addr }) => {
                        info!("Client disconnected: {}", addr);
                    }
                    Some(WsEvent::Request { addr, payload, reply }) => {
                        debug!("Request from {}: {}", addr, payload);
                        let response = state.handle_request(&payload).await;
                        if reply.send(response).is_err() {
                            warn!("Client {} went away before the reply was sent", addr);
                        }
                    }
                    None => {
                        info!("WebSocket channel closed, shutting down");
                        break;
                    }
                }
            }

            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

// ---------------------------------------------------------------------------
// Crash recovery
// ---------------------------------------------------------------------------

/// Restore managers and the league gameweek from the database. Returns
/// `false` when there is nothing to restore.
pub fn recover_from_db(state: &mut AppState) -> anyhow::Result<bool> {
    let managers = state.db.load_managers().context("failed to load managers")?;
    state.current_gameweek = state
        .db
        .current_gameweek()
        .context("failed to load current gameweek")?;

    if managers.is_empty() {
        info!("No saved managers, starting a fresh season");
        return Ok(false);
    }

    for manager in managers {
        let history_total: i64 = manager.history.iter().map(|r| i64::from(r.total_points)).sum();
        if history_total != manager.total_points {
            warn!(
                "Manager {} stored total {} differs from history sum {}",
                manager.id, manager.total_points, history_total
            );
        }
        state.managers.insert(manager.id.clone(), manager);
    }

    info!(
        "Recovered {} managers at gameweek {}",
        state.managers.len(),
        state.current_gameweek
    );
    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
