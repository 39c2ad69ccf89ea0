use std::collections::HashSet;

use futures::try_join;
use serde::Serialize;

use crate::backend::{rows_into, Backend, TableQuery};
use crate::error::Result;
use crate::models::song::Song;
use crate::Error;

pub const MAX_QUERY_LEN: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub songs: Vec<Song>,
}

pub struct SearchService;

impl SearchService {
    /// Case-insensitive substring search over titles and artists.
    ///
    /// Title matches come first; a song matching both appears once.
    pub async fn search_songs(db: &dyn Backend, raw_query: &str) -> Result<SearchResult> {
        let query = raw_query.trim().to_string();
        if query.is_empty() {
            return Ok(SearchResult {
                query,
                songs: Vec::new(),
            });
        }
        if query.chars().count() > MAX_QUERY_LEN {
            return Err(Error::invalid(
                "q",
                format!("search is limited to {MAX_QUERY_LEN} characters"),
            ));
        }

        let pattern = format!("%{}%", escape_like(&query));
        let title_query = TableQuery::new().ilike("title", pattern.clone());
        let artist_query = TableQuery::new().ilike("artist", pattern);

        let (by_title, by_artist) = try_join!(
            db.select("songs", &title_query),
            db.select("songs", &artist_query),
        )?;

        let needle = query.to_lowercase();
        let by_title = rows_into::<Song>(by_title)?
            .into_iter()
            .filter(|song| song.title.to_lowercase().contains(&needle));
        let by_artist = rows_into::<Song>(by_artist)?
            .into_iter()
            .filter(|song| song.artist.to_lowercase().contains(&needle));

        let mut seen = HashSet::new();
        let songs = by_title
            .chain(by_artist)
            .filter(|song| seen.insert(song.id.clone()))
            .collect();

        Ok(SearchResult { query, songs })
    }
}

/// Escapes `LIKE` wildcards in user input.
///
/// The service reads every `*` in a filter value as `%`, even after a
/// backslash, so a literal `*` cannot be expressed. It becomes `_` here and
/// callers drop the rows it over-matches.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        match c {
            '\\' | '%' | '_' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '*' => escaped.push('_'),
            _ => escaped.push(c),
        }
    }
    escaped
}
