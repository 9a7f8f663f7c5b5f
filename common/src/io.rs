use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const QUALIFIER: &str = "dev";
pub const ORGANIZATION: &str = "xairaven";
pub const APPLICATION: &str = "ppilog";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Data,
    Config,
}

impl FileKind {
    fn directory(self, project_dirs: &ProjectDirs) -> &Path {
        match self {
            FileKind::Config => project_dirs.config_dir(),
            FileKind::Data => project_dirs.data_dir(),
        }
    }
}

/// Path of a file in the per-user directory of its kind.
/// Falls back to the working directory on systems without a home directory.
pub fn storage_file_path(file_name: &str, kind: FileKind) -> Result<PathBuf, std::io::Error> {
    match ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION) {
        Some(dirs) => Ok(kind.directory(&dirs).join(file_name)),
        None => Ok(env::current_dir()?.join(file_name)),
    }
}

pub fn create_parent_directories(path: &Path) -> Result<(), std::io::Error> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_file_path_keeps_name() {
        let path = storage_file_path("capture.log", FileKind::Data).unwrap();
        assert!(path.ends_with("capture.log"));
    }

    #[test]
    fn test_parentless_path() {
        assert!(create_parent_directories(Path::new("capture.log")).is_ok());
    }

    #[test]
    fn test_creates_parents() {
        let root = env::temp_dir().join(format!("ppilog-io-{}", std::process::id()));
        let file = root.join("nested").join("capture.log");

        create_parent_directories(&file).unwrap();
        assert!(root.join("nested").is_dir());

        fs::remove_dir_all(root).unwrap();
    }
}
