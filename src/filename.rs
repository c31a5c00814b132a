//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! Filename validation and wire encoding (spec.md §3, §9 Design Notes).
//!
//! A filename is a single path component: no separators, not `.` or `..`,
//! at most `FNAME_MAX_LEN - 1` bytes. On the wire it is padded with zero
//! bytes to exactly `FNAME_MAX_LEN` bytes after a trailing NUL, matching the
//! original source's fixed-buffer-plus-explicit_bzero convention.

use crate::constants::FNAME_MAX_LEN;
use crate::error::CryptVaultError;

/// Reject anything that is not a single, safe path component.
pub fn validate(name: &str) -> Result<(), CryptVaultError> {
    if name.is_empty() {
        return Err(CryptVaultError::Policy("filename is empty".into()));
    }
    if name.len() > FNAME_MAX_LEN - 1 {
        return Err(CryptVaultError::Policy(format!(
            "filename exceeds {} bytes",
            FNAME_MAX_LEN - 1
        )));
    }
    if name == "." || name == ".." {
        return Err(CryptVaultError::Policy("filename must not be . or ..".into()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(CryptVaultError::Policy(
            "filename must be a single path component".into(),
        ));
    }
    if name.contains('\0') {
        return Err(CryptVaultError::Policy("filename must not contain NUL".into()));
    }
    Ok(())
}

/// Encode a validated filename as exactly `FNAME_MAX_LEN` bytes: the UTF-8
/// bytes, a trailing NUL, then zero padding.
pub fn encode(name: &str) -> Result<[u8; FNAME_MAX_LEN], CryptVaultError> {
    validate(name)?;
    let mut buf = [0u8; FNAME_MAX_LEN];
    let bytes = name.as_bytes();
    buf[..bytes.len()].copy_from_slice(bytes);
    // buf[bytes.len()] is already 0, serving as the trailing NUL.
    Ok(buf)
}

/// Decode a fixed-width or NUL-terminated filename field back into a
/// validated `String`.
pub fn decode(buf: &[u8]) -> Result<String, CryptVaultError> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let name = std::str::from_utf8(&buf[..end])
        .map_err(|_| CryptVaultError::Policy("filename is not valid UTF-8".into()))?
        .to_string();
    validate(&name)?;
    Ok(name)
}

/// Encode a rename pair as `old_name\0new_name\0` (spec.md §4.6).
pub fn encode_rename_pair(old_name: &str, new_name: &str) -> Result<Vec<u8>, CryptVaultError> {
    validate(old_name)?;
    validate(new_name)?;
    let mut buf = Vec::with_capacity(old_name.len() + new_name.len() + 2);
    buf.extend_from_slice(old_name.as_bytes());
    buf.push(0);
    buf.extend_from_slice(new_name.as_bytes());
    buf.push(0);
    Ok(buf)
}

/// Decode a `old_name\0new_name\0` rename pair.
pub fn decode_rename_pair(buf: &[u8]) -> Result<(String, String), CryptVaultError> {
    let mut parts = buf.split(|&b| b == 0);
    let old_bytes = parts
        .next()
        .ok_or_else(|| CryptVaultError::ProtocolError("missing old_name in RenameReq".into()))?;
    let new_bytes = parts
        .next()
        .ok_or_else(|| CryptVaultError::ProtocolError("missing new_name in RenameReq".into()))?;

    let old_name = std::str::from_utf8(old_bytes)
        .map_err(|_| CryptVaultError::Policy("old_name is not valid UTF-8".into()))?
        .to_string();
    let new_name = std::str::from_utf8(new_bytes)
        .map_err(|_| CryptVaultError::Policy("new_name is not valid UTF-8".into()))?
        .to_string();

    validate(&old_name)?;
    validate(&new_name)?;
    Ok((old_name, new_name))
}
