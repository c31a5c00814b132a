//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! Rename command (spec.md §4.6). A name collision is a status failure, not
//! an `Error` packet — the session and the user's turn both continue.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::commands::Outcome;
use crate::error::CryptVaultError;
use crate::filename;
use crate::message::MessageType;
use crate::session::Session;
use crate::storage::UserStorage;

pub async fn client<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session,
    stream: &mut S,
    old_name: &str,
    new_name: &str,
) -> Result<Outcome, CryptVaultError> {
    let body = filename::encode_rename_pair(old_name, new_name)?;
    session.seal(stream, MessageType::RenameReq, &body).await?;
    let (ty, plaintext) = session
        .open(stream, &[MessageType::RenameAns])
        .await?;
    Ok(Outcome::from_reply(ty, plaintext))
}

/// Server side: `request_plaintext` is the already-opened `RenameReq` body.
pub async fn server<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session,
    stream: &mut S,
    storage: &UserStorage,
    request_plaintext: &[u8],
) -> Result<(), CryptVaultError> {
    let (old_name, new_name) = match filename::decode_rename_pair(request_plaintext) {
        Ok(pair) => pair,
        Err(e) => {
            return session
                .seal(stream, MessageType::RenameAns, format!("rejected: {e}").as_bytes())
                .await
        }
    };

    if storage.exists(&new_name).await? {
        return session
            .seal(
                stream,
                MessageType::RenameAns,
                format!("rejected: {new_name} already exists").as_bytes(),
            )
            .await;
    }

    match storage.rename(&old_name, &new_name).await {
        Ok(()) => {
            session
                .seal(
                    stream,
                    MessageType::RenameAns,
                    format!("renamed {old_name} to {new_name}").as_bytes(),
                )
                .await
        }
        Err(e) => {
            session
                .seal(stream, MessageType::RenameAns, format!("rejected: {e}").as_bytes())
                .await
        }
    }
}
