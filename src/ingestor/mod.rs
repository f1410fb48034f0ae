//! Playlist acquisition: fetching raw M3U text for a source and parsing it
//! into category-bucketed channel entries.

pub mod fetch;
pub mod m3u_parser;

pub use fetch::{PlaylistFetch, PlaylistFetcher};
pub use m3u_parser::{parse_m3u, ChannelEntry, Playlist, PlaylistCategory};
