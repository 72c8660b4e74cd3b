// Copyright 2024 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Domain separation of signed messages.
//!
//! Every message handed to a [Signer] is prefixed with a fixed-width tag naming the
//! context it is signed in, so that a signature over an arbitrary user message can never
//! be replayed as a transaction signature, and vice versa.

use crate::{error::Error, signer::Signer};

/// Width of a padded domain tag in bytes.
pub const DOMAIN_TAG_LENGTH: usize = 32;

/// UTF-8 bytes of a tag, right padded with zeros to [DOMAIN_TAG_LENGTH].
pub type DomainTag = [u8; DOMAIN_TAG_LENGTH];

/// The prefix of all signed transaction payloads and envelopes.
pub const TRANSACTION_DOMAIN_TAG: DomainTag = pad_const(b"FLOW-V0.0-transaction");

/// The prefix of all signed user space messages.
pub const USER_DOMAIN_TAG: DomainTag = pad_const(b"FLOW-V0.0-user");

const fn pad_const(tag: &[u8]) -> DomainTag {
    assert!(tag.len() <= DOMAIN_TAG_LENGTH, "domain tag too long");
    let mut padded = [0u8; DOMAIN_TAG_LENGTH];
    let mut i = 0;
    while i < tag.len() {
        padded[i] = tag[i];
        i += 1;
    }
    padded
}

/// Returns the padded domain tag for `tag`, or an error if it does not fit.
pub fn pad_domain_tag(tag: &str) -> Result<DomainTag, Error> {
    if tag.len() > DOMAIN_TAG_LENGTH {
        return Err(Error::DomainTagTooLong {
            tag: tag.to_string(),
            max: DOMAIN_TAG_LENGTH,
        });
    }

    let mut padded = [0u8; DOMAIN_TAG_LENGTH];
    padded[..tag.len()].copy_from_slice(tag.as_bytes());
    Ok(padded)
}

/// Returns `message` prefixed with `tag`.
pub fn with_domain_tag(tag: &DomainTag, message: &[u8]) -> Vec<u8> {
    let mut tagged = Vec::with_capacity(DOMAIN_TAG_LENGTH + message.len());
    tagged.extend_from_slice(tag);
    tagged.extend_from_slice(message);
    tagged
}

/// Signs a message in the user domain.
///
/// User messages are distinct from transactions and can be verified directly by
/// on-chain code against the account keys of the signer.
pub fn sign_user_message(signer: &dyn Signer, message: &[u8]) -> Result<Vec<u8>, Error> {
    signer
        .sign(&with_domain_tag(&USER_DOMAIN_TAG, message))
        .map_err(Error::Signer)
}
