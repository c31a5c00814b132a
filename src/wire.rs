//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! Length-prefixed field, tag, and header framing (spec.md §4.1).
//!
//! All integers are big-endian. Reads are exact: short reads are retried by
//! `AsyncReadExt::read_exact` until the field is complete or the stream
//! closes, which surfaces as [`CryptVaultError::Truncated`].

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::{FLEN_MAX, IV_LEN, TAG_LEN};
use crate::error::CryptVaultError;
use crate::message::MessageType;

fn map_eof(e: std::io::Error) -> CryptVaultError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        CryptVaultError::Truncated
    } else {
        CryptVaultError::Io(e)
    }
}

/// `type:u8 | seq:u32_be | iv:[IV_LEN]`
pub async fn send_header<W: AsyncWrite + Unpin>(
    w: &mut W,
    ty: MessageType,
    seq: u32,
    iv: &[u8; IV_LEN],
) -> Result<(), CryptVaultError> {
    w.write_u8(ty.as_u8()).await?;
    w.write_u32(seq).await?;
    w.write_all(iv).await?;
    Ok(())
}

pub async fn read_header<R: AsyncRead + Unpin>(
    r: &mut R,
) -> Result<(MessageType, u32, [u8; IV_LEN]), CryptVaultError> {
    let mut ty_byte = [0u8; 1];
    r.read_exact(&mut ty_byte).await.map_err(map_eof)?;
    let ty = MessageType::from_u8(ty_byte[0])?;

    let mut seq_bytes = [0u8; 4];
    r.read_exact(&mut seq_bytes).await.map_err(map_eof)?;
    let seq = u32::from_be_bytes(seq_bytes);

    let mut iv = [0u8; IV_LEN];
    r.read_exact(&mut iv).await.map_err(map_eof)?;

    Ok((ty, seq, iv))
}

/// `len:u32_be | bytes:[len]`, `len <= FLEN_MAX`.
pub async fn send_field<W: AsyncWrite + Unpin>(
    w: &mut W,
    bytes: &[u8],
) -> Result<(), CryptVaultError> {
    let len = u32::try_from(bytes.len()).map_err(|_| CryptVaultError::OversizedField(u32::MAX))?;
    if len > FLEN_MAX {
        return Err(CryptVaultError::OversizedField(len));
    }
    w.write_u32(len).await?;
    w.write_all(bytes).await?;
    Ok(())
}

pub async fn read_field<R: AsyncRead + Unpin>(r: &mut R) -> Result<Vec<u8>, CryptVaultError> {
    let mut len_bytes = [0u8; 4];
    r.read_exact(&mut len_bytes).await.map_err(map_eof)?;
    let len = u32::from_be_bytes(len_bytes);
    if len > FLEN_MAX {
        return Err(CryptVaultError::OversizedField(len));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf).await.map_err(map_eof)?;
    Ok(buf)
}

pub async fn send_tag<W: AsyncWrite + Unpin>(
    w: &mut W,
    tag: &[u8; TAG_LEN],
) -> Result<(), CryptVaultError> {
    w.write_all(tag).await?;
    Ok(())
}

pub async fn read_tag<R: AsyncRead + Unpin>(r: &mut R) -> Result<[u8; TAG_LEN], CryptVaultError> {
    let mut tag = [0u8; TAG_LEN];
    r.read_exact(&mut tag).await.map_err(map_eof)?;
    Ok(tag)
}
