//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! CryptVault: a mutual-authentication-bootstrapped AEAD session protocol
//! for a two-party file-transfer service, plus the command state machines
//! and server-side storage adapter layered over it.
//!
//! Module map:
//! - [`error`] — the unified error type and its fatal/command-local split.
//! - [`message`] — the wire message-type enumeration.
//! - [`constants`] — normative wire constants.
//! - [`wire`] — length-prefixed header/field/tag framing.
//! - [`session`] — the AEAD seal/open layer and sequence-number lockstep.
//! - [`handshake`] — the PSK-bootstrapped mutual-authentication exchange.
//! - [`filename`] — filename validation and fixed-width wire padding.
//! - [`storage`] — the server-side per-user flat-namespace storage adapter.
//! - [`dispatcher`] — the server-side command dispatch loop.
//! - [`commands`] — the five command state machines plus Logout.

pub mod commands;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod filename;
pub mod handshake;
pub mod message;
pub mod session;
pub mod storage;
pub mod wire;

pub use error::{CryptVaultError, Result};
pub use message::MessageType;
pub use session::Session;
