//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! Unified error hierarchy for the CryptVault session protocol.

use thiserror::Error;

/// Top-level error type returned by the CryptVault session protocol.
#[derive(Error, Debug)]
pub enum CryptVaultError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed mid-packet")]
    Truncated,

    #[error("declared field length {0} exceeds FLEN_MAX")]
    OversizedField(u32),

    #[error("AEAD authentication failed")]
    AuthFail,

    #[error("sequence mismatch: expected {expected}, got {got}")]
    SeqMismatch { expected: u32, got: u32 },

    #[error("unexpected message type: {0:?}")]
    UnexpectedType(crate::message::MessageType),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("policy violation: {0}")]
    Policy(String),

    #[error("sequence counter would wrap")]
    SeqWrap,

    #[error("read deadline exceeded")]
    Timeout,
}

impl CryptVaultError {
    /// Whether this error is fatal to the session (§7: must zeroize keys,
    /// close the socket, and surface to the user) as opposed to
    /// command-local (reported to the peer inside an `Error` packet and the
    /// session continues). `Io` is classified by where it occurs: a socket
    /// read/write failure always surfaces here as `Io` and is fatal, since
    /// the connection can no longer produce valid framed messages;
    /// command-local file I/O failures are wrapped as `StorageError`
    /// instead (see storage.rs) and stay non-fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CryptVaultError::AuthFail
                | CryptVaultError::SeqMismatch { .. }
                | CryptVaultError::Truncated
                | CryptVaultError::OversizedField(_)
                | CryptVaultError::SeqWrap
                | CryptVaultError::Timeout
                | CryptVaultError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CryptVaultError>;
