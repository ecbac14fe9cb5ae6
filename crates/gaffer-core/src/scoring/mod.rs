pub mod gameweek;
pub mod points;
pub mod stats;

pub use gameweek::{simulate_gameweek, simulate_player_pool, GameweekResult, PlayerGameweek, PoolGameweek};
pub use points::{calculate_points, MatchStats, PointsBreakdown};
pub use stats::{generate_random_stats, ProviderStatLine, RecordedStats, SimulatedStats, StatSource};
