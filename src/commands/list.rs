//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! List command (spec.md §4.6).

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::CryptVaultError;
use crate::message::MessageType;
use crate::session::Session;
use crate::storage::UserStorage;

/// Client side: send an empty `ListReq`, return the newline-separated
/// listing (trailing NUL tolerated either way, per spec.md §9).
pub async fn client<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session,
    stream: &mut S,
) -> Result<String, CryptVaultError> {
    session.seal(stream, MessageType::ListReq, b"").await?;
    let (_ty, mut plaintext) = session.open(stream, &[MessageType::ListAns]).await?;
    if plaintext.last() == Some(&0) {
        plaintext.pop();
    }
    Ok(String::from_utf8_lossy(&plaintext).into_owned())
}

/// Server side: the dispatcher has already opened `ListReq`; reply with a
/// NUL-terminated listing.
pub async fn server<S: AsyncWrite + Unpin>(
    session: &mut Session,
    stream: &mut S,
    storage: &UserStorage,
) -> Result<(), CryptVaultError> {
    let entries = storage.list().await?;
    let mut body = entries.join("\n").into_bytes();
    body.push(0);
    session.seal(stream, MessageType::ListAns, &body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::fs;

    #[tokio::test]
    async fn client_and_server_agree_on_the_listing_over_a_duplex_pipe() {
        let root = tempdir().unwrap();
        let storage = UserStorage::open(root.path(), "alice").await.unwrap();
        fs::write(root.path().join("alice").join("a.bin"), b"x")
            .await
            .unwrap();
        fs::write(root.path().join("alice").join("b.bin"), b"y")
            .await
            .unwrap();

        let key = [5u8; 32];
        let (mut client_end, mut server_end) = tokio::io::duplex(8192);

        let server_task = tokio::spawn(async move {
            let mut server_session = Session::new(key, 0);
            server_session
                .open(&mut server_end, &[MessageType::ListReq])
                .await
                .unwrap();
            server(&mut server_session, &mut server_end, &storage)
                .await
                .unwrap();
        });

        let mut client_session = Session::new(key, 0);
        let listing = client(&mut client_session, &mut client_end).await.unwrap();
        server_task.await.unwrap();

        assert_eq!(listing, "a.bin\nb.bin");
    }

    #[tokio::test]
    async fn server_lists_sorted_filenames_excluding_temp() {
        let root = tempdir().unwrap();
        let storage = UserStorage::open(root.path(), "alice").await.unwrap();
        fs::write(root.path().join("alice").join("z.bin"), b"x")
            .await
            .unwrap();
        fs::write(root.path().join("alice").join("a.bin"), b"x")
            .await
            .unwrap();

        let key = [5u8; 32];
        let mut server_session = Session::new(key, 0);
        let mut reply = Vec::new();
        server(&mut server_session, &mut reply, &storage)
            .await
            .unwrap();

        let mut cur = std::io::Cursor::new(reply);
        let mut client_session = Session::new(key, 0);
        let (ty, plaintext) = client_session
            .open(&mut cur, &[MessageType::ListAns])
            .await
            .unwrap();
        assert_eq!(ty, MessageType::ListAns);
        assert_eq!(plaintext, b"a.bin\nz.bin\0");
    }
}
