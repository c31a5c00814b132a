//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

//! The AEAD session layer (spec.md §4.2): the only API the command state
//! machines use. `seal`/`open` keep both peers' `seq` counters in lockstep
//! and bind `type || seq` as AAD into every packet's authentication tag.

use aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit};
use rand_core::{OsRng, RngCore};
use tokio::io::{AsyncRead, AsyncWrite};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{IV_LEN, SEQ_WRAP_GUARD, TAG_LEN};
use crate::error::CryptVaultError;
use crate::message::MessageType;
use crate::wire;

/// Authenticated-encrypted session state for one peer (spec.md §3).
///
/// `K` is zeroized on drop. `seq` increments by exactly one after every
/// successful `seal` and every successful `open`.
#[derive(ZeroizeOnDrop)]
pub struct Session {
    #[zeroize(skip)]
    cipher: Aes256Gcm,
    key: [u8; 32],
    seq: u32,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("key", &"[redacted]")
            .field("seq", &self.seq)
            .finish()
    }
}

impl Session {
    /// Construct a session from a freshly-established key and initial
    /// sequence number (the output of the handshake, spec.md §3).
    pub fn new(key: [u8; 32], initial_seq: u32) -> Self {
        let cipher = Aes256Gcm::new((&key).into());
        Self {
            cipher,
            key,
            seq: initial_seq,
        }
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    fn check_wrap_guard(&self) -> Result<(), CryptVaultError> {
        if self.seq >= SEQ_WRAP_GUARD {
            return Err(CryptVaultError::SeqWrap);
        }
        Ok(())
    }

    /// Seal `plaintext` under `type` and the current `seq`, write the packet
    /// to `w`, and advance `seq` by one.
    pub async fn seal<W: AsyncWrite + Unpin>(
        &mut self,
        w: &mut W,
        ty: MessageType,
        plaintext: &[u8],
    ) -> Result<(), CryptVaultError> {
        self.check_wrap_guard()?;

        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let aad = build_aad(ty, self.seq);
        let mut sealed = self
            .cipher
            .encrypt(
                (&iv).into(),
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|_| CryptVaultError::AuthFail)?;

        // aes-gcm appends the tag to the ciphertext; split it back out so
        // the wire layout matches spec.md §3 (body then separate tag field).
        let tag_offset = sealed.len() - TAG_LEN;
        let tag: [u8; TAG_LEN] = sealed[tag_offset..].try_into().unwrap();
        sealed.truncate(tag_offset);

        wire::send_header(w, ty, self.seq, &iv).await?;
        wire::send_field(w, &sealed).await?;
        wire::send_tag(w, &tag).await?;

        sealed.zeroize();
        self.seq += 1;
        Ok(())
    }

    /// Read and open the next packet, accepting only a type in
    /// `expected_types` (plus `Error`, always accepted per spec.md §4.2).
    /// Advances `seq` by one on success.
    pub async fn open<R: AsyncRead + Unpin>(
        &mut self,
        r: &mut R,
        expected_types: &[MessageType],
    ) -> Result<(MessageType, Vec<u8>), CryptVaultError> {
        self.check_wrap_guard()?;

        let (observed_type, observed_seq, iv) = wire::read_header(r).await?;

        if observed_seq != self.seq {
            return Err(CryptVaultError::SeqMismatch {
                expected: self.seq,
                got: observed_seq,
            });
        }

        if observed_type != MessageType::Error && !expected_types.contains(&observed_type) {
            return Err(CryptVaultError::UnexpectedType(observed_type));
        }

        let mut body = wire::read_field(r).await?;
        let tag = wire::read_tag(r).await?;

        body.extend_from_slice(&tag);
        let aad = build_aad(observed_type, self.seq);
        let plaintext = self
            .cipher
            .decrypt((&iv).into(), Payload { msg: &body, aad: &aad })
            .map_err(|_| CryptVaultError::AuthFail)?;
        body.zeroize();

        self.seq += 1;
        Ok((observed_type, plaintext))
    }
}

/// AAD = `type || seq` (5 bytes, spec.md §3).
fn build_aad(ty: MessageType, seq: u32) -> [u8; 5] {
    let mut aad = [0u8; 5];
    aad[0] = ty.as_u8();
    aad[1..].copy_from_slice(&seq.to_be_bytes());
    aad
}
