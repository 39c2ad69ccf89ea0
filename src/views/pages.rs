use std::collections::HashSet;

use axum::http::StatusCode;
use axum::response::Html;

use super::{escape_html, layout, song_list};
use crate::config::UploadConfig;
use crate::middlewares::mw_auth::Ctx;
use crate::models::dashboard::Dashboard;
use crate::models::profile::ProfileOverview;
use crate::models::song::Song;

/// A form message: red for errors, green for notices.
pub enum Flash<'a> {
    Error(&'a str),
    Notice(&'a str),
}

fn flash(message: Option<Flash>) -> String {
    match message {
        Some(Flash::Error(msg)) => format!(r#"<p class="flash error">{}</p>"#, escape_html(msg)),
        Some(Flash::Notice(msg)) => format!(r#"<p class="flash notice">{}</p>"#, escape_html(msg)),
        None => String::new(),
    }
}

pub fn index_page(ctx: Option<&Ctx>, songs: &[Song], liked: &HashSet<String>) -> Html<String> {
    let body = format!(
        "<h1>Latest songs</h1>\n{}",
        song_list(songs, liked, ctx.is_some())
    );
    Html(layout("Music", ctx, &body))
}

pub fn login_page(email: &str, message: Option<Flash>) -> Html<String> {
    let body = format!(
        r#"<h1>Log in</h1>
{flash}
<form method="post" action="/login" class="auth">
    <label>Email <input type="email" name="email" value="{email}" required></label>
    <label>Password <input type="password" name="password" required></label>
    <button type="submit">Log in</button>
</form>
<p><a href="/forgot-password">Forgot your password?</a> &middot; <a href="/signup">Create an account</a></p>"#,
        flash = flash(message),
        email = escape_html(email),
    );
    Html(layout("Log in", None, &body))
}

pub fn signup_page(email: &str, username: &str, message: Option<Flash>) -> Html<String> {
    let body = format!(
        r#"<h1>Sign up</h1>
{flash}
<form method="post" action="/signup" class="auth">
    <label>Email <input type="email" name="email" value="{email}" required></label>
    <label>Username <input type="text" name="username" value="{username}" maxlength="30" required></label>
    <label>Password <input type="password" name="password" minlength="6" required></label>
    <button type="submit">Create account</button>
</form>
<p>Already registered? <a href="/login">Log in</a></p>"#,
        flash = flash(message),
        email = escape_html(email),
        username = escape_html(username),
    );
    Html(layout("Sign up", None, &body))
}

pub fn forgot_password_page(message: Option<Flash>) -> Html<String> {
    let body = format!(
        r#"<h1>Reset your password</h1>
{flash}
<form method="post" action="/forgot-password" class="auth">
    <label>Email <input type="email" name="email" required></label>
    <button type="submit">Send reset link</button>
</form>
<p><a href="/login">Back to login</a></p>"#,
        flash = flash(message),
    );
    Html(layout("Reset password", None, &body))
}

pub fn search_page(
    ctx: Option<&Ctx>,
    query: &str,
    songs: &[Song],
    liked: &HashSet<String>,
    message: Option<Flash>,
) -> Html<String> {
    let results = if query.is_empty() {
        String::new()
    } else if songs.is_empty() {
        format!(
            r#"<p class="empty">No results for "{}".</p>"#,
            escape_html(query)
        )
    } else {
        song_list(songs, liked, ctx.is_some())
    };

    let body = format!(
        r#"<h1>Search</h1>
{flash}
<form method="get" action="/search"><input type="search" name="q" value="{query}" maxlength="100" autofocus> <button type="submit">Search</button></form>
{results}"#,
        flash = flash(message),
        query = escape_html(query),
    );
    Html(layout("Search", ctx, &body))
}

pub fn profile_page(ctx: &Ctx, overview: &ProfileOverview) -> Html<String> {
    let liked: HashSet<String> = overview
        .liked_songs
        .iter()
        .map(|song| song.id.clone())
        .collect();

    let body = format!(
        r#"<h1>{username}</h1>
<p class="email">{email}</p>
<h2>Liked songs ({count})</h2>
{songs}"#,
        username = escape_html(&overview.profile.username),
        email = escape_html(overview.profile.email.as_deref().unwrap_or(&ctx.email)),
        count = overview.liked_songs.len(),
        songs = song_list(&overview.liked_songs, &liked, true),
    );
    Html(layout("Profile", Some(ctx), &body))
}

pub fn admin_page(ctx: &Ctx, dashboard: &Dashboard) -> Html<String> {
    let rows: Vec<String> = dashboard
        .songs
        .iter()
        .map(|song| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&song.title),
                escape_html(&song.artist),
                song.streams,
                song.likes,
                song.created_at
                    .map(|at| at.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            )
        })
        .collect();

    let stats = &dashboard.stats;
    let body = format!(
        r#"<h1>Dashboard</h1>
<ul class="stats">
    <li><strong>{users}</strong> users</li>
    <li><strong>{songs}</strong> songs</li>
    <li><strong>{streams}</strong> streams</li>
    <li><strong>{likes}</strong> likes</li>
</ul>
<p><a href="/upload">Upload a song</a></p>
<table>
<thead><tr><th>Title</th><th>Artist</th><th>Streams</th><th>Likes</th><th>Added</th></tr></thead>
<tbody>
{rows}
</tbody>
</table>"#,
        users = stats.users_count,
        songs = stats.songs_count,
        streams = stats.total_streams,
        likes = stats.total_likes,
        rows = rows.join("\n"),
    );
    Html(layout("Admin", Some(ctx), &body))
}

pub fn upload_page(ctx: &Ctx, config: &UploadConfig) -> Html<String> {
    let body = format!(
        r#"<h1>Upload a song</h1>
<form id="upload-form" class="upload" data-max-audio="{max_audio}" data-max-cover="{max_cover}">
    <label>Title <input type="text" name="title" required></label>
    <label>Artist <input type="text" name="artist" required></label>
    <label>Featured artist <input type="text" name="featured_artist"></label>
    <label>Audio file <input type="file" name="audio" accept="audio/*" required></label>
    <label>Cover image <input type="file" name="cover" accept="image/*" required></label>
    <button type="submit">Upload</button>
</form>
<progress id="upload-progress" value="0" max="100" hidden></progress>
<p id="upload-status" class="flash"></p>
<script src="/static/upload.js"></script>"#,
        max_audio = config.max_audio_bytes,
        max_cover = config.max_cover_bytes,
    );
    Html(layout("Upload", Some(ctx), &body))
}

pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    let body = format!(
        r#"<h1>{code}</h1>
<p>{message}</p>
<p><a href="/">Back to the songs</a></p>"#,
        code = status.as_u16(),
        message = escape_html(message),
    );
    Html(layout(
        status.canonical_reason().unwrap_or("Error"),
        None,
        &body,
    ))
}
