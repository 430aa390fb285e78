//! File-backed session saves for harness runs.
use std::io::ErrorKind;
use std::path::PathBuf;

use wayfare_game::{GameStorage, SessionSnapshot};

/// Game storage writing one JSON file per save under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FileStorage {
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, save_name: &str) -> PathBuf {
        self.dir.join(format!("wayfare.save.{save_name}.json"))
    }
}

impl GameStorage for FileStorage {
    type Error = StorageError;

    fn save_session(&self, save_name: &str, snapshot: &SessionSnapshot) -> Result<(), Self::Error> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_vec_pretty(snapshot)?;
        std::fs::write(self.path_for(save_name), json)?;
        Ok(())
    }

    fn load_session(&self, save_name: &str) -> Result<Option<SessionSnapshot>, Self::Error> {
        match std::fs::read(self.path_for(save_name)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
        match std::fs::remove_file(self.path_for(save_name)) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}
