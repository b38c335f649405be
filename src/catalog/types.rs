use crate::{Result, TurnUpError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Id reserved for the hidden party playlist
pub const HIDDEN_PLAYLIST_ID: u32 = 99;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub name: String,
    pub artist: String,
    /// Audio resource key, looked up in the audio store
    pub file_name: String,
    /// Artwork key, only used by the UI
    pub image_name: String,
}

impl Song {
    pub fn new(
        name: impl Into<String>,
        artist: impl Into<String>,
        file_name: impl Into<String>,
        image_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            file_name: file_name.into(),
            image_name: image_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: u32,
    pub name: String,
    pub songs: Vec<Song>,
}

impl Playlist {
    pub fn new(id: u32, name: impl Into<String>, songs: Vec<Song>) -> Self {
        Self {
            id,
            name: name.into(),
            songs,
        }
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Check if the lowercased playlist name contains `word`
    pub fn name_contains(&self, word: &str) -> bool {
        self.name.to_lowercase().contains(&word.to_lowercase())
    }

    /// First song whose name contains any of the words
    ///
    /// Words are tried in order; for each word songs are scanned in
    /// playlist order.
    pub fn match_song<S: AsRef<str>>(&self, words: &[S]) -> Option<&Song> {
        words.iter().find_map(|word| {
            let word = word.as_ref().to_lowercase();
            self.songs
                .iter()
                .find(|song| song.name.to_lowercase().contains(&word))
        })
    }
}

/// On-disk catalog layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub playlists: Vec<Playlist>,
    pub hidden: Playlist,
}

/// Registry of playlists plus the hidden playlist waiting to be unlocked
#[derive(Debug, Clone)]
pub struct Catalog {
    playlists: Vec<Playlist>,
    hidden: Playlist,
}

impl Catalog {
    /// Build a catalog, validating ids and playlist contents
    pub fn new(playlists: Vec<Playlist>, hidden: Playlist) -> Result<Self> {
        if playlists.is_empty() {
            return Err(TurnUpError::CatalogError(
                "Catalog must contain at least one playlist".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for playlist in playlists.iter().chain(std::iter::once(&hidden)) {
            if playlist.is_empty() {
                return Err(TurnUpError::CatalogError(format!(
                    "Playlist '{}' has no songs",
                    playlist.name
                )));
            }
            if !ids.insert(playlist.id) {
                return Err(TurnUpError::CatalogError(format!(
                    "Duplicate playlist id {}",
                    playlist.id
                )));
            }
        }

        Ok(Self { playlists, hidden })
    }

    /// Parse a catalog from TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)
            .map_err(|e| TurnUpError::CatalogError(format!("Failed to parse catalog: {}", e)))?;
        Self::new(file.playlists, file.hidden)
    }

    /// Load a catalog from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            TurnUpError::CatalogError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_toml_str(&content)?;
        info!(
            "Loaded catalog from {} ({} playlists)",
            path.display(),
            catalog.len()
        );
        Ok(catalog)
    }

    /// The catalog that ships with the app
    pub fn builtin() -> Self {
        let playlists = vec![
            Playlist::new(
                0,
                "Welcome to Bulgaria",
                vec![
                    Song::new(
                        "GPS-A",
                        "Lidia, Dessita & Tedi Aleksandrova",
                        "GPS-A",
                        "GPSPic",
                    ),
                    Song::new(
                        "Neudobni vaprosi",
                        "Galena & Gamzata",
                        "Neudobni",
                        "NeudobniPic",
                    ),
                    Song::new(
                        "Draskai klechkata",
                        "Tsvetelina Yaneva",
                        "Draskai",
                        "DraskaiPic",
                    ),
                ],
            ),
            Playlist::new(
                1,
                "Favorite Pop",
                vec![
                    Song::new("Espresso", "Sabrina Carpenter", "espresso", "sabrina"),
                    Song::new("Side to side", "Ariana Grande, Nicki Minaj", "side", "ariana"),
                    Song::new("LUNCH", "Billie Eilish", "lunch", "chihiro"),
                ],
            ),
        ];

        let hidden = Playlist::new(
            HIDDEN_PLAYLIST_ID,
            "Party Mode 🎉",
            vec![
                Song::new("Fireball", "Pitbull, John Ryan", "fireball", "fireball"),
                Song::new("Gasolina", "Daddy Yankee", "gasolina", "gasolina"),
                Song::new("Rock this party", "Bob Sinclar", "rock", "rock"),
            ],
        );

        Self { playlists, hidden }
    }

    /// Visible playlists in display order
    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    /// Playlist at a display position
    pub fn playlist(&self, index: usize) -> Option<&Playlist> {
        self.playlists.get(index)
    }

    /// Number of visible playlists
    pub fn len(&self) -> usize {
        self.playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }

    /// Display position of a playlist id
    pub fn position_of(&self, id: u32) -> Option<usize> {
        self.playlists.iter().position(|p| p.id == id)
    }

    /// The hidden playlist, whether unlocked or not
    pub fn hidden(&self) -> &Playlist {
        &self.hidden
    }

    /// Check if the hidden playlist has been appended
    pub fn is_hidden_unlocked(&self) -> bool {
        self.position_of(self.hidden.id).is_some()
    }

    /// Append the hidden playlist
    ///
    /// Returns its position when it was appended by this call, `None` when
    /// it was already present.
    pub fn unlock_hidden(&mut self) -> Option<usize> {
        if self.is_hidden_unlocked() {
            debug!("Hidden playlist already unlocked");
            return None;
        }
        self.playlists.push(self.hidden.clone());
        Some(self.playlists.len() - 1)
    }

    /// Position of the first playlist whose name contains any of the words
    ///
    /// Words are tried in order; for each word playlists are scanned in
    /// catalog order.
    pub fn match_playlist<S: AsRef<str>>(&self, words: &[S]) -> Option<usize> {
        words.iter().find_map(|word| {
            let word = word.as_ref();
            self.playlists.iter().position(|p| p.name_contains(word))
        })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
