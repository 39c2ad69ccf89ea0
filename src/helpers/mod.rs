pub mod filename_helpers;
pub mod song_helpers;
