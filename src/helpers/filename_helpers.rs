use lazy_regex::{regex, regex_is_match};

/// Makes a client-supplied filename safe to use in a storage key.
///
/// Every character of the name portion outside `[A-Za-z0-9_-]` becomes `_`.
/// A short alphanumeric extension after the last dot is kept as is.
pub fn sanitize_filename(filename: &str) -> String {
    let filename = filename.trim();
    let (name, extension) = match filename.rsplit_once('.') {
        Some((name, ext)) if !name.is_empty() && regex_is_match!(r"^[A-Za-z0-9]{1,10}$", ext) => {
            (name, Some(ext))
        }
        _ => (filename, None),
    };

    let name = regex!(r"[^A-Za-z0-9_-]").replace_all(name, "_");
    let name: &str = if name.is_empty() { "file" } else { &name };

    match extension {
        Some(ext) => format!("{name}.{ext}"),
        None => name.to_string(),
    }
}

/// Splits `folder/name` into `("folder", "name")`; root objects get `""`.
pub fn split_storage_path(path: &str) -> (&str, &str) {
    path.rsplit_once('/').unwrap_or(("", path))
}
