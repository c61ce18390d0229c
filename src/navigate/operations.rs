//! Navigation operations implementation

/// Returns true when no usable file name was given.
pub fn is_blank(file_name: Option<&str>) -> bool {
    file_name.is_none_or(|name| name.trim().is_empty())
}

/// Changes the working directory. The new path is taken as given and never
/// checked against the server.
pub fn change_directory(current_path: &mut String, target_path: &str) {
    current_path.clear();
    current_path.push_str(target_path);
}

/// Remote path for `file_name` relative to `current_path`.
///
/// The current path loses its surrounding slashes, so a blank file name
/// yields a trailing separator (`"pub/"` for `"/pub/"`).
pub fn build_path(current_path: &str, file_name: Option<&str>) -> String {
    let file_name = if is_blank(file_name) {
        ""
    } else {
        file_name.unwrap_or_default()
    };

    format!("{}/{}", current_path.trim_matches('/'), file_name)
}

/// Id of a listed entry: the current path joined with `name` by one slash.
pub fn entry_id(current_path: &str, name: &str) -> String {
    format!("{}/{}", current_path.trim_end_matches('/'), name)
}

/// `DELE` command for `file_name`, always with an absolute path.
pub fn delete_command(current_path: &str, file_name: &str) -> String {
    format!(
        "DELE /{}",
        build_path(current_path, Some(file_name)).trim_start_matches('/')
    )
}
