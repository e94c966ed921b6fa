//! File-backed credential store.
//!
//! Stands in for the external EEPROM: a five-byte file, one byte per digit.
//! A missing file reads as an erased device. Every update writes a sibling
//! temp file and renames it over the real one, so a reader sees either the
//! old credential or the new one.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use latchkey_core::hal::{CredentialStore, StoreError};
use latchkey_proto::{PASSCODE_LEN, Passcode};

const ERASED: u8 = 0xff;

/// Credential store persisted to a file on every write.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    bytes: [u8; PASSCODE_LEN],
}

impl FileCredentialStore {
    /// Open `path`, treating a missing file as erased.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut bytes = [ERASED; PASSCODE_LEN];

        match fs::read(&path) {
            Ok(contents) => {
                for (slot, byte) in bytes.iter_mut().zip(contents) {
                    *slot = byte;
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no stored credential, starting erased");
            },
            Err(err) => return Err(err.into()),
        }

        Ok(Self { path, bytes })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Replace the file contents with `bytes` in one rename.
    fn persist(&self, bytes: &[u8; PASSCODE_LEN]) -> std::io::Result<()> {
        let temp = self.temp_path();
        let staged = fs::File::create(&temp).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });
        if let Err(err) = staged.and_then(|()| fs::rename(&temp, &self.path)) {
            // leftover temp file is harmless; open() never reads it
            let _ = fs::remove_file(&temp);
            return Err(err);
        }
        Ok(())
    }

    fn commit(&mut self, bytes: [u8; PASSCODE_LEN]) -> Result<(), StoreError> {
        self.persist(&bytes)?;
        self.bytes = bytes;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn read(&mut self, index: usize) -> Result<u8, StoreError> {
        self.bytes.get(index).copied().ok_or(StoreError::OutOfRange(index))
    }

    fn write(&mut self, index: usize, value: u8) -> Result<(), StoreError> {
        let mut staged = self.bytes;
        let slot = staged.get_mut(index).ok_or(StoreError::OutOfRange(index))?;
        *slot = value;
        self.commit(staged)
    }

    fn store(&mut self, passcode: &Passcode) -> Result<(), StoreError> {
        self.commit(passcode.to_bytes())
    }
}
