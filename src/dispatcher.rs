//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! Server-side command dispatcher (spec.md §4.3).
//!
//! Implements the "equivalent simpler formulation" the spec recommends:
//! `open` once against the set of all command-start types, then dispatch on
//! the observed type. A type outside that set — including `Error`, which
//! `Session::open` always lets through — is fatal for the session.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

use crate::commands;
use crate::constants::READ_TIMEOUT_SECS;
use crate::error::CryptVaultError;
use crate::message::MessageType;
use crate::session::Session;
use crate::storage::UserStorage;

const COMMAND_START_TYPES: &[MessageType] = &[
    MessageType::ListReq,
    MessageType::UploadReq,
    MessageType::DownloadReq,
    MessageType::RenameReq,
    MessageType::DeleteReq,
    MessageType::LogoutReq,
];

/// Run the command loop for one authenticated session until `LogoutReq` is
/// handled or a fatal error occurs.
pub async fn run<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session,
    stream: &mut S,
    storage: &UserStorage,
) -> Result<(), CryptVaultError> {
    loop {
        let (ty, plaintext) = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            session.open(stream, COMMAND_START_TYPES),
        )
        .await
        .map_err(|_| CryptVaultError::Timeout)??;

        match ty {
            MessageType::ListReq => {
                commands::list::server(session, stream, storage).await?;
            }
            MessageType::UploadReq => {
                commands::upload::server(session, stream, storage, &plaintext).await?;
            }
            MessageType::DownloadReq => {
                commands::download::server(session, stream, storage, &plaintext).await?;
            }
            MessageType::RenameReq => {
                commands::rename::server(session, stream, storage, &plaintext).await?;
            }
            MessageType::DeleteReq => {
                if let Some(name) =
                    commands::delete::server_request(session, stream, storage, &plaintext).await?
                {
                    commands::delete::server_confirm(session, stream, storage, &name).await?;
                }
            }
            MessageType::LogoutReq => {
                commands::logout::server(session, stream).await?;
                return Ok(());
            }
            MessageType::Error => {
                return Err(CryptVaultError::ProtocolError(
                    "client sent Error as a command-start message".into(),
                ));
            }
            other => {
                return Err(CryptVaultError::UnexpectedType(other));
            }
        }
    }
}
