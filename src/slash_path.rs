use std::{borrow::Cow, path::Path};

/// Display a path with `/` as the separator on every platform. Used for the
/// labels in diff output so they look the same everywhere.
pub fn to_slash(path: &Path) -> Cow<'_, str> {
    let path_str = path.to_string_lossy();
    if cfg!(windows) && path_str.contains('\\') {
        Cow::Owned(path_str.replace('\\', "/"))
    } else {
        path_str
    }
}

/// `<path>.orig`, with slashes.
pub fn orig_label(path: &Path) -> String {
    format!("{}.orig", to_slash(path))
}
