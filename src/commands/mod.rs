//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! The five command state machines plus Logout (spec.md §4.4–§4.6), each
//! split into a `client` side and a `server` side function operating on an
//! already-authenticated [`crate::session::Session`].

pub mod delete;
pub mod download;
pub mod list;
pub mod logout;
pub mod rename;
pub mod upload;

/// The outcome of a command exchange that can legitimately end either way:
/// a status string from the expected response type, or a peer-reported
/// command-local failure (an `Error`-typed packet, spec.md §7). Both are
/// displayed to the user; only `Error` leaves the requested effect undone.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Status(String),
    PeerError(String),
}

impl Outcome {
    pub fn message(&self) -> &str {
        match self {
            Outcome::Status(s) | Outcome::PeerError(s) => s,
        }
    }

    pub fn from_reply(ty: crate::message::MessageType, plaintext: Vec<u8>) -> Self {
        let text = String::from_utf8_lossy(&plaintext).into_owned();
        if ty == crate::message::MessageType::Error {
            Outcome::PeerError(text)
        } else {
            Outcome::Status(text)
        }
    }
}
