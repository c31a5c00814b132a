//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! Download stream machine (spec.md §4.5): the mirror of [`crate::commands::upload`].
//! A mid-stream `open` failure (e.g. `AuthFail` from a tampered chunk, spec.md
//! §8 scenario 5) removes the partial local file before propagating the
//! fatal error.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::commands::Outcome;
use crate::constants::CHUNK_SIZE;
use crate::error::CryptVaultError;
use crate::filename;
use crate::message::MessageType;
use crate::session::Session;
use crate::storage::UserStorage;

/// Client side. Writes the downloaded content to `dest_path`, created fresh;
/// removed again if the stream fails partway through. `shutdown` is polled
/// between chunks for cooperative cancellation (§5), mirroring upload.rs.
pub async fn client<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session,
    stream: &mut S,
    remote_name: &str,
    dest_path: &Path,
    shutdown: &AtomicBool,
) -> Result<Outcome, CryptVaultError> {
    let body = filename::encode(remote_name)?;
    session.seal(stream, MessageType::DownloadReq, &body).await?;

    let (ty, plaintext) = session.open(stream, &[MessageType::DownloadAns]).await?;
    if ty == MessageType::Error {
        return Ok(Outcome::PeerError(String::from_utf8_lossy(&plaintext).into_owned()));
    }
    let status = String::from_utf8_lossy(&plaintext).into_owned();

    let mut dest = tokio::fs::File::create(dest_path).await?;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            drop(dest);
            tokio::fs::remove_file(dest_path).await.ok();
            return Err(CryptVaultError::ProtocolError(
                "download aborted by shutdown signal".into(),
            ));
        }

        let step = session
            .open(stream, &[MessageType::DownloadChunk, MessageType::DownloadEnd])
            .await;
        let (ty, chunk) = match step {
            Ok(pair) => pair,
            Err(e) => {
                drop(dest);
                tokio::fs::remove_file(dest_path).await.ok();
                return Err(e);
            }
        };

        use tokio::io::AsyncWriteExt;
        if let Err(e) = dest.write_all(&chunk).await {
            drop(dest);
            tokio::fs::remove_file(dest_path).await.ok();
            return Err(CryptVaultError::Io(e));
        }

        if ty == MessageType::DownloadEnd {
            break;
        }
    }

    Ok(Outcome::Status(status))
}

/// Server side. `request_plaintext` is the already-opened `DownloadReq` body.
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

    if !store.exists(&name).await? {
        return session
            .seal(
                stream,
                MessageType::Error,
                format!("rejected: {name} does not exist").as_bytes(),
            )
            .await;
    }

    let mut file = match store.open_read(&name).await {
        Ok(file) => file,
        Err(e) => {
            return session
                .seal(stream, MessageType::Error, format!("failure: {e}").as_bytes())
                .await;
        }
    };
    let size = file.metadata().await.map(|m| m.len()).unwrap_or(0);

    session
        .seal(
            stream,
            MessageType::DownloadAns,
            format!("sending {size} bytes").as_bytes(),
        )
        .await?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match file.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                session
                    .seal(stream, MessageType::Error, format!("failure: {e}").as_bytes())
                    .await?;
                return Err(CryptVaultError::Io(e));
            }
        };

        if n == CHUNK_SIZE {
            session
                .seal(stream, MessageType::DownloadChunk, &buf[..n])
                .await?;
        } else {
            session
                .seal(stream, MessageType::DownloadEnd, &buf[..n])
                .await?;
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn run_download(
        root: &std::path::Path,
        dest: &std::path::Path,
        name: &str,
    ) -> Outcome {
        let storage = UserStorage::open(root, "alice").await.unwrap();
        let key = [11u8; 32];
        let (mut client_end, mut server_end) = tokio::io::duplex(16384);

        let server_task = tokio::spawn(async move {
            let mut server_session = Session::new(key, 0);
            let (_ty, plaintext) = server_session
                .open(&mut server_end, &[MessageType::DownloadReq])
                .await
                .unwrap();
            server(&mut server_session, &mut server_end, &storage, &plaintext)
                .await
                .unwrap();
        });

        let mut client_session = Session::new(key, 0);
        let shutdown = AtomicBool::new(false);
        let outcome = client(&mut client_session, &mut client_end, name, dest, &shutdown)
            .await
            .unwrap();
        server_task.await.unwrap();
        outcome
    }

    #[tokio::test]
    async fn downloading_a_multi_chunk_file_round_trips() {
        let root = tempdir().unwrap();
        tokio::fs::create_dir_all(root.path().join("alice"))
            .await
            .unwrap();
        let content = vec![9u8; CHUNK_SIZE + 50];
        tokio::fs::write(root.path().join("alice").join("a.bin"), &content)
            .await
            .unwrap();

        let dest = root.path().join("downloaded.bin");
        let outcome = run_download(root.path(), &dest, "a.bin").await;
        assert!(outcome.message().contains("sending"));

        let got = tokio::fs::read(&dest).await.unwrap();
        assert_eq!(got, content);
    }

    #[tokio::test]
    async fn downloading_a_missing_file_is_rejected_via_error() {
        let root = tempdir().unwrap();
        tokio::fs::create_dir_all(root.path().join("alice"))
            .await
            .unwrap();
        let dest = root.path().join("nope.bin");
        let outcome = run_download(root.path(), &dest, "missing.bin").await;
        assert!(matches!(outcome, Outcome::PeerError(_)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn tampered_chunk_aborts_download_and_removes_partial_file() {
        let key = [12u8; 32];

        // Seal a DownloadAns followed by a DownloadChunk directly (bypassing
        // the server loop) so a single byte inside the chunk can be tampered
        // with before the client ever reads it.
        let mut wire = Vec::new();
        let mut server_session = Session::new(key, 0);
        server_session
            .seal(&mut wire, MessageType::DownloadAns, b"sending 10 bytes")
            .await
            .unwrap();
        let chunk_start = wire.len();
        server_session
            .seal(&mut wire, MessageType::DownloadEnd, &[1u8; 10])
            .await
            .unwrap();
        wire[chunk_start] ^= 0x01;

        let root = tempdir().unwrap();
        let dest = root.path().join("partial.bin");

        let reader = std::io::Cursor::new(wire);
        let writer = tokio::io::sink();
        let mut combined = tokio::io::join(reader, writer);

        let mut client_session = Session::new(key, 0);
        let shutdown = AtomicBool::new(false);
        let err = client(&mut client_session, &mut combined, "a.bin", &dest, &shutdown).await;

        assert!(err.is_err());
        assert!(!dest.exists());
    }
}
