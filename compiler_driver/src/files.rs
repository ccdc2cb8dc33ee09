// this module contains the path helpers of the driver

use std::path::{Path, PathBuf};

/// the IR file written next to the source: `<stem>.ssa`
pub fn default_output_path(source: &Path) -> PathBuf {
    source.with_extension("ssa")
}

/// return the file name portion of a path as text
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
