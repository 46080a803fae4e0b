//! Entity paths and index document identities

use crate::error::{Error, Result};
use crate::limits::MAX_PATH_LEN;

/// Normalize a registry path: trimmed, one leading `/`, no trailing `/`.
pub fn normalize_path(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let trimmed = trimmed.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidPath(raw.to_string()));
    }
    if trimmed.len() + 1 > MAX_PATH_LEN {
        return Err(Error::InvalidPath(format!(
            "path too long: {} chars (max {})",
            trimmed.len() + 1,
            MAX_PATH_LEN
        )));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(Error::InvalidPath(raw.to_string()));
    }
    Ok(format!("/{}", trimmed))
}

/// Encode a path as an index document id.
///
/// Leading and trailing separators are stripped, `%` becomes `%25` and `/`
/// becomes `%2F`, so `/a/b` and `/a/b/` share the id `a%2Fb`.
pub fn document_id(path: &str) -> String {
    let mut id = String::with_capacity(path.len());
    for c in path.trim().trim_matches('/').chars() {
        match c {
            '%' => id.push_str("%25"),
            '/' => id.push_str("%2F"),
            other => id.push(other),
        }
    }
    id
}

/// Inverse of [`document_id`]. Always yields a path with a leading `/`.
pub fn path_from_document_id(id: &str) -> String {
    let mut path = String::with_capacity(id.len() + 1);
    path.push('/');
    let mut rest = id;
    while let Some(pos) = rest.find('%') {
        path.push_str(&rest[..pos]);
        let escape = &rest[pos..];
        if escape.starts_with("%2F") || escape.starts_with("%2f") {
            path.push('/');
            rest = &escape[3..];
        } else if escape.starts_with("%25") {
            path.push('%');
            rest = &escape[3..];
        } else {
            path.push('%');
            rest = &escape[1..];
        }
    }
    path.push_str(rest);
    path
}
