//! Default file locations (~/.vigil).

use std::io;
use std::path::PathBuf;

/// Default base directory name.
pub const DEFAULT_BASE_DIR: &str = ".vigil";

/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Default store filename inside the data directory.
pub const DEFAULT_STORE_FILE: &str = "vigil.redb";

/// Provides access to the vigil directory structure.
#[derive(Debug, Clone)]
pub struct Paths {
    /// User's home directory.
    pub home_dir: PathBuf,
}

impl Paths {
    pub fn new() -> io::Result<Self> {
        let home_dir = dirs::home_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "could not find home directory")
        })?;
        Ok(Self { home_dir })
    }

    /// Returns the base directory (~/.vigil).
    pub fn base_dir(&self) -> PathBuf {
        self.home_dir.join(DEFAULT_BASE_DIR)
    }

    /// Returns the config file path (~/.vigil/config.yaml).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir().join(DEFAULT_CONFIG_FILE)
    }

    /// Returns the data directory (~/.vigil/data).
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir().join("data")
    }

    /// Returns the default store path (~/.vigil/data/vigil.redb).
    pub fn store_file(&self) -> PathBuf {
        self.data_dir().join(DEFAULT_STORE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_under_home() {
        let paths = Paths {
            home_dir: PathBuf::from("/home/test"),
        };
        assert_eq!(paths.base_dir(), PathBuf::from("/home/test/.vigil"));
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/home/test/.vigil/config.yaml")
        );
        assert_eq!(
            paths.store_file(),
            PathBuf::from("/home/test/.vigil/data/vigil.redb")
        );
    }
}
