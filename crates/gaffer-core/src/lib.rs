// Library root for the fantasy scoring engine: player and formation model,
// points calculation, stat sources, gameweek simulation, squad constraints,
// team chemistry, and manager standings.

pub mod chemistry;
pub mod formation;
pub mod manager;
pub mod player;
pub mod scoring;
pub mod squad;
