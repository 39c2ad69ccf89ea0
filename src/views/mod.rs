//! Server-rendered HTML. Deliberately plain: one layout, a song card, and a
//! handful of pages built with `format!`.

use std::collections::HashSet;

use crate::middlewares::mw_auth::Ctx;
use crate::models::song::Song;

pub mod pages;

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn nav(ctx: Option<&Ctx>) -> String {
    let links = match ctx {
        Some(ctx) if ctx.is_admin() => format!(
            r#"<a href="/profile">{}</a> <a href="/admin">Admin</a> <a href="/upload">Upload</a> <a href="/logout">Log out</a>"#,
            escape_html(&ctx.username)
        ),
        Some(ctx) => format!(
            r#"<a href="/profile">{}</a> <a href="/logout">Log out</a>"#,
            escape_html(&ctx.username)
        ),
        None => r#"<a href="/login">Log in</a> <a href="/signup">Sign up</a>"#.to_string(),
    };

    format!(
        r#"<nav>
    <a href="/" class="brand">Music</a>
    <form action="/search" method="get" class="search"><input type="search" name="q" placeholder="Search songs or artists" maxlength="100"></form>
    <span class="links">{links}</span>
</nav>"#
    )
}

pub fn layout(title: &str, ctx: Option<&Ctx>, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="/static/style.css">
</head>
<body>
{nav}
<main>
{body}
</main>
<script src="/static/app.js"></script>
</body>
</html>"#,
        title = escape_html(title),
        nav = nav(ctx),
    )
}

pub fn song_card(song: &Song, liked: bool, can_like: bool) -> String {
    let featured = song
        .featured()
        .map(|f| format!(" <span class=\"feat\">feat. {}</span>", escape_html(f)))
        .unwrap_or_default();

    let like_button = if can_like {
        format!(
            r#"<button class="like{active}" data-song-id="{id}">&#9829; <span class="like-count">{likes}</span></button>"#,
            active = if liked { " liked" } else { "" },
            id = escape_html(&song.id),
            likes = song.likes,
        )
    } else {
        format!(r#"<span class="likes">&#9829; {}</span>"#, song.likes)
    };

    format!(
        r#"<article class="song" data-song-id="{id}">
    <img src="{cover}" alt="" loading="lazy">
    <div class="meta">
        <h3>{title}</h3>
        <p>{artist}{featured}</p>
    </div>
    <audio controls preload="none" src="{audio}" data-song-id="{id}"></audio>
    <div class="stats"><span class="streams">{streams} plays</span> {like_button}</div>
</article>"#,
        id = escape_html(&song.id),
        cover = escape_html(&song.cover_url),
        title = escape_html(&song.title),
        artist = escape_html(&song.artist),
        audio = escape_html(&song.audio_url),
        streams = song.streams,
    )
}

pub fn song_list(songs: &[Song], liked: &HashSet<String>, can_like: bool) -> String {
    if songs.is_empty() {
        return r#"<p class="empty">No songs yet.</p>"#.to_string();
    }

    let cards: Vec<String> = songs
        .iter()
        .map(|song| song_card(song, liked.contains(&song.id), can_like))
        .collect();
    format!(r#"<section class="songs">{}</section>"#, cards.join("\n"))
}
