//! Playlist and song catalog
//!
//! The catalog is built once at startup and is read-only afterwards, except
//! for the single append of the hidden playlist.

mod types;

pub use types::{Catalog, CatalogFile, Playlist, Song, HIDDEN_PLAYLIST_ID};
