//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! Delete command (spec.md §4.6): a two-phase request/confirm exchange.
//! Deletion only happens when the confirmation, trimmed and lowercased,
//! equals `"y"`.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::commands::Outcome;
use crate::error::CryptVaultError;
use crate::filename;
use crate::message::MessageType;
use crate::session::Session;
use crate::storage::UserStorage;

fn answer_confirms(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Client side, phase 1: send `DeleteReq(filename)`, return the server's
/// confirmation prompt (or a peer-reported failure).
pub async fn client_request<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session,
    stream: &mut S,
    filename: &str,
) -> Result<Outcome, CryptVaultError> {
    let body = crate::filename::encode(filename)?;
    session.seal(stream, MessageType::DeleteReq, &body).await?;
    let (ty, plaintext) = session.open(stream, &[MessageType::DeleteAns]).await?;
    Ok(Outcome::from_reply(ty, plaintext))
}

/// Client side, phase 2: send the user's answer, return the final outcome.
pub async fn client_confirm<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session,
    stream: &mut S,
    answer: &str,
) -> Result<Outcome, CryptVaultError> {
    session
        .seal(stream, MessageType::DeleteConfirm, answer.as_bytes())
        .await?;
    let (ty, plaintext) = session.open(stream, &[MessageType::DeleteRes]).await?;
    Ok(Outcome::from_reply(ty, plaintext))
}

/// Server side, phase 1: `request_plaintext` is the already-opened
/// `DeleteReq` body.
pub async fn server_request<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session,
    stream: &mut S,
    storage: &UserStorage,
    request_plaintext: &[u8],
) -> Result<Option<String>, CryptVaultError> {
    let name = match filename::decode(request_plaintext) {
        Ok(name) => name,
        Err(e) => {
            session
                .seal(stream, MessageType::Error, format!("rejected: {e}").as_bytes())
                .await?;
            return Ok(None);
        }
    };

    if !storage.exists(&name).await? {
        session
            .seal(
                stream,
                MessageType::Error,
                format!("rejected: {name} does not exist").as_bytes(),
            )
            .await?;
        return Ok(None);
    }

    session
        .seal(
            stream,
            MessageType::DeleteAns,
            format!("delete {name}? (y/n)").as_bytes(),
        )
        .await?;
    Ok(Some(name))
}

/// Server side, phase 2: open `DeleteConfirm` and act on it.
pub async fn server_confirm<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session,
    stream: &mut S,
    storage: &UserStorage,
    name: &str,
) -> Result<(), CryptVaultError> {
    let (_ty, plaintext) = session.open(stream, &[MessageType::DeleteConfirm]).await?;
    let answer = String::from_utf8_lossy(&plaintext).into_owned();

    if !answer_confirms(&answer) {
        return session
            .seal(stream, MessageType::DeleteRes, b"cancelled")
            .await;
    }

    match storage.delete(name).await {
        Ok(()) => {
            session
                .seal(stream, MessageType::DeleteRes, format!("deleted {name}").as_bytes())
                .await
        }
        Err(e) => {
            session
                .seal(stream, MessageType::DeleteRes, format!("failure: {e}").as_bytes())
                .await
        }
    }
}
