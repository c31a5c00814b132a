//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! Upload stream machine (spec.md §4.4).
//!
//! On server-side mid-stream I/O failure, CryptVault adopts the simpler of
//! the two spec-sanctioned policies: seal `Error` and end the session
//! (DESIGN.md records this choice). Returning `Err` from [`server`] after
//! the initial `UploadAns` has been sent is the session-ending signal the
//! caller (the dispatcher) acts on; a rejected request returns `Ok(())`
//! after sealing `Error`, which keeps the session alive for the next
//! command.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::commands::Outcome;
use crate::constants::{CHUNK_SIZE, FSIZE_MAX};
use crate::error::CryptVaultError;
use crate::filename;
use crate::message::MessageType;
use crate::session::Session;
use crate::storage::{self, UserStorage};

/// Client side. `file` is any readable source (local file in practice).
/// `shutdown` is polled between chunks for cooperative cancellation (§5).
pub async fn client<S, F>(
    session: &mut Session,
    stream: &mut S,
    name: &str,
    file: &mut F,
    shutdown: &AtomicBool,
) -> Result<Outcome, CryptVaultError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: AsyncRead + Unpin,
{
    let body = filename::encode(name)?;
    session.seal(stream, MessageType::UploadReq, &body).await?;

    let (ty, plaintext) = session
        .open(stream, &[MessageType::UploadAns])
        .await?;
    if ty == MessageType::Error {
        return Ok(Outcome::PeerError(String::from_utf8_lossy(&plaintext).into_owned()));
    }

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return Err(CryptVaultError::ProtocolError(
                "upload aborted by shutdown signal".into(),
            ));
        }

        let n = file.read(&mut buf).await?;
        if n == CHUNK_SIZE {
            session
                .seal(stream, MessageType::UploadChunk, &buf[..n])
                .await?;
        } else {
            session
                .seal(stream, MessageType::UploadEnd, &buf[..n])
                .await?;
            break;
        }
    }

    let (ty, plaintext) = session.open(stream, &[MessageType::UploadRes]).await?;
    Ok(Outcome::from_reply(ty, plaintext))
}

/// Server side. `request_plaintext` is the already-opened `UploadReq` body
/// (the padded filename).
pub async fn server<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session,
    stream: &mut S,
    store: &UserStorage,
    request_plaintext: &[u8],
) -> Result<(), CryptVaultError> {
    let name = match filename::decode(request_plaintext) {
        Ok(name) => name,
        Err(e) => {
            return session
                .seal(stream, MessageType::Error, format!("rejected: {e}").as_bytes())
                .await;
        }
    };

    if store.exists(&name).await? {
        return session
            .seal(
                stream,
                MessageType::Error,
                format!("rejected: {name} already exists").as_bytes(),
            )
            .await;
    }

    let mut temp = match store.open_write_temp(&name).await {
        Ok(file) => file,
        Err(e) => {
            return session
                .seal(stream, MessageType::Error, format!("rejected: {e}").as_bytes())
                .await;
        }
    };

    session
        .seal(stream, MessageType::UploadAns, b"ready")
        .await?;

    let mut total: u64 = 0;
    loop {
        let (ty, plaintext) = session
            .open(stream, &[MessageType::UploadChunk, MessageType::UploadEnd])
            .await?;

        total += plaintext.len() as u64;
        if total > FSIZE_MAX {
            store.discard_temp(&name).await.ok();
            session
                .seal(stream, MessageType::Error, b"rejected: file too large")
                .await?;
            return Err(CryptVaultError::Policy("upload exceeded FSIZE_MAX".into()));
        }

        if let Err(e) = storage::append_chunk(&mut temp, plaintext).await {
            store.discard_temp(&name).await.ok();
            session
                .seal(stream, MessageType::Error, format!("failure: {e}").as_bytes())
                .await?;
            return Err(e);
        }

        if ty == MessageType::UploadEnd {
            break;
        }
    }
    drop(temp);

    if let Err(e) = store.commit_temp_to(&name).await {
        store.discard_temp(&name).await.ok();
        session
            .seal(stream, MessageType::Error, format!("failure: {e}").as_bytes())
            .await?;
        return Err(e);
    }

    session
        .seal(
            stream,
            MessageType::UploadRes,
            format!("uploaded {total} bytes").as_bytes(),
        )
        .await
}
