// Player catalog loading from CSV.
//
// One row per player. The `rating` column may be left empty, in which case
// the rating is derived from the attributes for the player's position.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use gaffer_core::player::{Attributes, Player, PlayerId, Position};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to open player catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to read player catalog {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("player catalog {path} has no usable rows")]
    Empty { path: String },
}

// ---------------------------------------------------------------------------
// Raw CSV row
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    id: PlayerId,
    name: String,
    position: String,
    club: String,
    nationality: String,
    pace: u8,
    shooting: u8,
    passing: u8,
    defending: u8,
    dribbling: u8,
    physical: u8,
    #[serde(default)]
    rating: Option<u8>,
    price: u64,
}

impl RawPlayerRow {
    fn into_player(self) -> Option<Player> {
        let position = Position::from_str_pos(&self.position)?;
        let attributes = Attributes {
            pace: self.pace,
            shooting: self.shooting,
            passing: self.passing,
            defending: self.defending,
            dribbling: self.dribbling,
            physical: self.physical,
        };
        let mut player = Player::with_derived_rating(
            self.id,
            self.name.trim(),
            position,
            self.club.trim(),
            self.nationality.trim(),
            attributes,
            self.price,
        );
        if let Some(rating) = self.rating {
            player.rating = rating;
        }
        Some(player)
    }
}

fn load_players_from_reader<R: Read>(rdr: R) -> Result<Vec<Player>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    // Fails on unreadable or non-UTF-8 headers.
    reader.headers()?;
    let mut players: Vec<Player> = Vec::new();
    let mut seen: HashSet<PlayerId> = HashSet::new();

    for result in reader.deserialize::<RawPlayerRow>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
                continue;
            }
        };
        let (id, name, position) = (raw.id, raw.name.clone(), raw.position.clone());
        let Some(player) = raw.into_player() else {
            warn!("skipping player {} '{}': unknown position '{}'", id, name.trim(), position);
            continue;
        };
        if !seen.insert(player.id) {
            warn!("skipping duplicate player id {} ('{}')", player.id, player.name);
            continue;
        }
        players.push(player);
    }

    Ok(players)
}

// ---------------------------------------------------------------------------
// PlayerCatalog
// ---------------------------------------------------------------------------

/// The reference player pool, in file order, with lookup by id.
#[derive(Debug, Clone, Default)]
pub struct PlayerCatalog {
    players: Vec<Player>,
    by_id: HashMap<PlayerId, usize>,
}

impl PlayerCatalog {
    pub fn new(players: Vec<Player>) -> Self {
        let by_id = players.iter().enumerate().map(|(i, p)| (p.id, i)).collect();
        PlayerCatalog { players, by_id }
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let players = load_players_from_reader(file).map_err(|e| CatalogError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;
        if players.is_empty() {
            return Err(CatalogError::Empty {
                path: path.display().to_string(),
            });
        }
        info!("Loaded {} players from {}", players.len(), path.display());
        Ok(Self::new(players))
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.by_id.get(&id).map(|&i| &self.players[i])
    }

    pub fn all(&self) -> &[Player] {
        &self.players
    }

    pub fn by_position(&self, position: Position) -> Vec<&Player> {
        self.players.iter().filter(|p| p.position == position).collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const HEADER: &str =
        "id,name,position,club,nationality,pace,shooting,passing,defending,dribbling,physical,rating,price\n";

    #[test]
    fn parses_rows_and_derives_missing_rating() {
        let csv_data = format!(
            "{HEADER}\
1,Aaron Holt,GK,Northbridge,England,50,20,60,80,30,70,,180000000
2,Bruno Sal,ATT,Harbour City,Portugal,88,86,70,30,84,72,91,250000000
"
        );
        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(players.len(), 2);

        let gk = &players[0];
        assert_eq!(gk.position, Position::Goalkeeper);
        assert_eq!(gk.price, 180_000_000);
        assert_eq!(gk.rating, gk.attributes.rating_for(Position::Goalkeeper));

        assert_eq!(players[1].rating, 91);
        assert_eq!(players[1].club, "Harbour City");
    }

    #[test]
    fn accepts_long_position_names() {
        let csv_data = format!("{HEADER}7,Dee Fender,Defender,A,B,1,1,1,1,1,1,,10\n");
        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(players[0].position, Position::Defender);
    }

    #[test]
    fn skips_bad_rows_and_keeps_the_rest() {
        let csv_data = format!(
            "{HEADER}\
1,Good One,MID,A,B,50,50,50,50,50,50,,100
2,Bad Position,STRIKER,A,B,50,50,50,50,50,50,,100
3,Bad Number,DEF,A,B,fast,50,50,50,50,50,,100
4,Negative Price,DEF,A,B,50,50,50,50,50,50,,-5
5,Good Two,ATT,A,B,50,50,50,50,50,50,,100
"
        );
        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        let ids: Vec<PlayerId> = players.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let csv_data = format!(
            "{HEADER}\
9,First,MID,A,B,50,50,50,50,50,50,,100
9,Second,ATT,A,B,50,50,50,50,50,50,,200
"
        );
        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "First");
    }

    #[test]
    fn catalog_lookup_and_filter() {
        let csv_data = format!(
            "{HEADER}\
1,Keeper,GK,A,B,50,50,50,50,50,50,,100
2,Back,DEF,A,B,50,50,50,50,50,50,,100
3,Back Two,DEF,A,B,50,50,50,50,50,50,,100
"
        );
        let catalog = PlayerCatalog::new(load_players_from_reader(csv_data.as_bytes()).unwrap());
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get(2).map(|p| p.name.as_str()), Some("Back"));
        assert!(catalog.get(42).is_none());
        assert_eq!(catalog.by_position(Position::Defender).len(), 2);
        assert!(catalog.by_position(Position::Attacker).is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("gaffer_catalog_does_not_exist.csv");
        assert!(matches!(PlayerCatalog::load(&path), Err(CatalogError::Io { .. })));
    }

    fn scratch_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("gaffer_catalog_{}_{name}.csv", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn wrong_headers_are_an_empty_catalog_error() {
        let path = scratch_file("wrong_headers", b"player,pos,cost\n1,GK,100\n2,DEF,100\n");
        assert!(matches!(PlayerCatalog::load(&path), Err(CatalogError::Empty { .. })));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn non_utf8_header_is_csv_error() {
        let path = scratch_file("bad_header", b"id,\xff\xfename\n1,x\n");
        assert!(matches!(PlayerCatalog::load(&path), Err(CatalogError::Csv { .. })));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn bundled_player_data_loads() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/players.csv");
        let catalog = PlayerCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 32);
        for position in Position::ALL {
            assert!(!catalog.by_position(position).is_empty(), "no {position}");
        }
        let holt = catalog.get(1).unwrap();
        assert_eq!(holt.position, Position::Goalkeeper);
        assert_eq!(holt.price, 180_000_000);
    }
}
