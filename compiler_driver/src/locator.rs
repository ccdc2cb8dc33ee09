use shared_context::units::SourceLocator;
use std::path::{Path, PathBuf};

/// Locates library unit sources on the include path.
///
/// A unit named in a `with` clause resolves to `<name>.ads` (its
/// spec) or `<name>.ada`, searched through the directory of the file
/// being compiled and then the `-I` directories in order.
pub struct FsLocator {
    dirs: Vec<PathBuf>,
}

impl FsLocator {
    pub fn new(compiled_file: &Path, include: &[PathBuf]) -> Self {
        let mut dirs = Vec::with_capacity(include.len() + 1);
        if let Some(parent) = compiled_file.parent() {
            dirs.push(parent.to_path_buf());
        }
        dirs.extend(include.iter().cloned());
        Self { dirs }
    }

    /// Whether a body file exists for a package; decides which unit
    /// emits the package's elaboration function.
    pub fn has_body(&self, unit_name: &str) -> bool {
        self.dirs
            .iter()
            .any(|dir| dir.join(format!("{unit_name}.adb")).is_file())
    }
}

impl SourceLocator for FsLocator {
    fn locate(&self, unit_name: &str) -> Option<PathBuf> {
        for dir in &self.dirs {
            for extension in ["ads", "ada"] {
                let candidate = dir.join(format!("{unit_name}.{extension}"));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }
}
