//! Tango catalog library.
//!
//! Builds the song catalog for "Name That Tango Tune" from a DJ library:
//! cleans library exports into normalized songs, matches local audio files to
//! catalog records by name and closest filesize, then copies, tags and
//! describes the matched files.

pub mod artists;
pub mod assemble;
pub mod clean;
pub mod config;
pub mod error;
pub mod json_io;
pub mod matcher;
pub mod media;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod safety;
pub mod scoring;
pub mod song_id;
