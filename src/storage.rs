//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! Server-side per-user flat-namespace storage adapter (spec.md §4.7).
//!
//! Files for `username` live under `<root>/<username>/`. Every name crossing
//! this boundary is re-validated with [`crate::filename::validate`] even
//! though callers already validated it on the wire — defense in depth against
//! a future caller that forgets to.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::constants::UPLOAD_TEMP_SUFFIX;
use crate::error::CryptVaultError;
use crate::filename;

const HOUSEKEEPING_NAMES: &[&str] = &[".gitignore", ".gitkeep"];

fn io_err(e: std::io::Error) -> CryptVaultError {
    CryptVaultError::StorageError(e.to_string())
}

/// A validated, sandboxed per-user storage area.
#[derive(Clone)]
pub struct UserStorage {
    dir: PathBuf,
}

impl UserStorage {
    /// Open (creating if needed) the storage directory for `username` under
    /// `root`. `username` is trusted (already authenticated).
    pub async fn open(root: &Path, username: &str) -> Result<Self, CryptVaultError> {
        let dir = root.join(username);
        fs::create_dir_all(&dir).await.map_err(io_err)?;
        Ok(Self { dir })
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, CryptVaultError> {
        filename::validate(name)?;
        Ok(self.dir.join(name))
    }

    fn temp_path_for(&self, name: &str) -> Result<PathBuf, CryptVaultError> {
        filename::validate(name)?;
        Ok(self.dir.join(format!("{name}{UPLOAD_TEMP_SUFFIX}")))
    }

    /// Newline-joined listing, excluding housekeeping names, sorted for
    /// deterministic `list()` round-trips (spec.md §8: two calls with no
    /// intervening mutation return equal sets).
    pub async fn list(&self) -> Result<Vec<String>, CryptVaultError> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&self.dir).await.map_err(io_err)?;
        while let Some(entry) = read_dir.next_entry().await.map_err(io_err)? {
            let file_type = entry.file_type().await.map_err(io_err)?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if HOUSEKEEPING_NAMES.contains(&name.as_str()) || name.ends_with(UPLOAD_TEMP_SUFFIX) {
                continue;
            }
            entries.push(name);
        }
        entries.sort();
        Ok(entries)
    }

    /// Open the reserved temp file for an in-progress upload of `name`.
    pub async fn open_write_temp(&self, name: &str) -> Result<fs::File, CryptVaultError> {
        let path = self.temp_path_for(name)?;
        fs::File::create(&path).await.map_err(io_err)
    }

    /// Atomically publish the temp file for `name` to its final location.
    pub async fn commit_temp_to(&self, name: &str) -> Result<(), CryptVaultError> {
        let temp = self.temp_path_for(name)?;
        let dest = self.path_for(name)?;
        fs::rename(&temp, &dest).await.map_err(io_err)
    }

    /// Discard the temp file for an aborted upload of `name`.
    pub async fn discard_temp(&self, name: &str) -> Result<(), CryptVaultError> {
        let temp = self.temp_path_for(name)?;
        match fs::remove_file(&temp).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(e)),
        }
    }

    pub async fn open_read(&self, name: &str) -> Result<fs::File, CryptVaultError> {
        let path = self.path_for(name)?;
        fs::File::open(&path).await.map_err(io_err)
    }

    pub async fn exists(&self, name: &str) -> Result<bool, CryptVaultError> {
        let path = self.path_for(name)?;
        Ok(fs::metadata(&path).await.is_ok())
    }

    pub async fn delete(&self, name: &str) -> Result<(), CryptVaultError> {
        let path = self.path_for(name)?;
        fs::remove_file(&path).await.map_err(io_err)
    }

    pub async fn rename(&self, old_name: &str, new_name: &str) -> Result<(), CryptVaultError> {
        let old_path = self.path_for(old_name)?;
        let new_path = self.path_for(new_name)?;
        fs::rename(&old_path, &new_path).await.map_err(io_err)
    }
}

/// Sweep leftover `.upl.tmp` files across every user directory under `root`
/// at server startup (spec.md §6: "Temp files... are swept at server
/// startup").
pub async fn sweep_temp_files(root: &Path) -> Result<u64, CryptVaultError> {
    let mut swept = 0u64;
    let mut user_dirs = fs::read_dir(root).await.map_err(io_err)?;
    while let Some(user_entry) = user_dirs.next_entry().await.map_err(io_err)? {
        if !user_entry.file_type().await.map_err(io_err)?.is_dir() {
            continue;
        }
        let mut files = fs::read_dir(user_entry.path()).await.map_err(io_err)?;
        while let Some(file_entry) = files.next_entry().await.map_err(io_err)? {
            let name = file_entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(UPLOAD_TEMP_SUFFIX) {
                fs::remove_file(file_entry.path()).await.map_err(io_err)?;
                swept += 1;
            }
        }
    }
    Ok(swept)
}

/// Read a user's 32-byte pre-shared secret from `<root>/<username>/.psk`
/// (hex-encoded), used by [`crate::handshake::server_handshake`].
pub async fn load_psk(root: &Path, username: &str) -> Option<[u8; 32]> {
    let path = root.join(username).join(".psk");
    let hex_str = fs::read_to_string(&path).await.ok()?;
    let bytes = hex::decode(hex_str.trim()).ok()?;
    bytes.try_into().ok()
}

/// Append-only helper used by the upload stream machine to write one chunk
/// and zeroize the plaintext buffer afterward.
pub async fn append_chunk(file: &mut fs::File, mut chunk: Vec<u8>) -> Result<(), CryptVaultError> {
    use zeroize::Zeroize;
    let result = file.write_all(&chunk).await.map_err(io_err);
    chunk.zeroize();
    result
}
