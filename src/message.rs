//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! The wire message-type enumeration and its stable byte encoding.

use crate::error::CryptVaultError;

/// Stable, injective byte encoding shared by both peers. Values are assigned
/// in declaration order starting at 0; never renumber an existing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    AuthStart = 0,
    AuthAck = 1,
    AuthEnd = 2,
    ListReq = 3,
    ListAns = 4,
    UploadReq = 5,
    UploadAns = 6,
    UploadChunk = 7,
    UploadEnd = 8,
    UploadRes = 9,
    DownloadReq = 10,
    DownloadAns = 11,
    DownloadChunk = 12,
    DownloadEnd = 13,
    RenameReq = 14,
    RenameAns = 15,
    DeleteReq = 16,
    DeleteAns = 17,
    DeleteConfirm = 18,
    DeleteRes = 19,
    LogoutReq = 20,
    LogoutAns = 21,
    Error = 22,
}

impl MessageType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a wire byte into a `MessageType`, rejecting unknown values.
    pub fn from_u8(byte: u8) -> Result<Self, CryptVaultError> {
        use MessageType::*;
        Ok(match byte {
            0 => AuthStart,
            1 => AuthAck,
            2 => AuthEnd,
            3 => ListReq,
            4 => ListAns,
            5 => UploadReq,
            6 => UploadAns,
            7 => UploadChunk,
            8 => UploadEnd,
            9 => UploadRes,
            10 => DownloadReq,
            11 => DownloadAns,
            12 => DownloadChunk,
            13 => DownloadEnd,
            14 => RenameReq,
            15 => RenameAns,
            16 => DeleteReq,
            17 => DeleteAns,
            18 => DeleteConfirm,
            19 => DeleteRes,
            20 => LogoutReq,
            21 => LogoutAns,
            22 => Error,
            other => {
                return Err(CryptVaultError::ProtocolError(format!(
                    "unknown message type byte {other}"
                )))
            }
        })
    }
}
