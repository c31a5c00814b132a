//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! Logout command (spec.md §4.6). Both peers zeroize `K` when `session` is
//! dropped (`ZeroizeOnDrop`); any send failure during logout is swallowed
//! after that point, matching spec.md's "swallowed after zeroization" rule.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::CryptVaultError;
use crate::message::MessageType;
use crate::session::Session;

/// Client side: send `LogoutReq`, wait for `LogoutAns`. The caller drops
/// `session` immediately afterward regardless of the result.
pub async fn client<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session,
    stream: &mut S,
) -> Result<(), CryptVaultError> {
    session.seal(stream, MessageType::LogoutReq, b"").await?;
    session.open(stream, &[MessageType::LogoutAns]).await?;
    Ok(())
}

/// Server side: the dispatcher has already opened `LogoutReq`; reply and let
/// the caller tear the connection down.
pub async fn server<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session,
    stream: &mut S,
) -> Result<(), CryptVaultError> {
    session.seal(stream, MessageType::LogoutAns, b"").await
}
