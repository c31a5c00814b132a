//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! Normative wire constants (spec.md §3).

/// Maximum filename length, including the reserved trailing NUL byte.
pub const FNAME_MAX_LEN: usize = 256;

/// Maximum stored file size (4 GiB - 1).
pub const FSIZE_MAX: u64 = u32::MAX as u64;

/// Maximum length of a length-prefixed wire field.
pub const FLEN_MAX: u32 = u32::MAX;

/// Plaintext chunk window size for upload/download streaming.
pub const CHUNK_SIZE: usize = 4096;

/// AEAD authentication tag length (AES-256-GCM).
pub const TAG_LEN: usize = 16;

/// Per-packet nonce length (AES-256-GCM).
pub const IV_LEN: usize = 12;

/// Sequence counters are 32-bit; wrap-around is forbidden (§3). A Logout
/// must be initiated before `seq` reaches this value.
pub const SEQ_WRAP_GUARD: u32 = u32::MAX - 1;

/// Reserved suffix for in-progress upload temp files (§6).
pub const UPLOAD_TEMP_SUFFIX: &str = ".upl.tmp";

/// Per-read deadline (§5, recommended).
pub const READ_TIMEOUT_SECS: u64 = 60;
