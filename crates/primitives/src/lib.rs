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

pub mod domain;
pub mod error;
pub mod hash;
pub mod signer;
pub mod transaction;

pub use alloy_primitives::{Address, Bytes, B256};
pub use alloy_rlp;

pub use crate::{
    domain::{sign_user_message, DomainTag, TRANSACTION_DOMAIN_TAG, USER_DOMAIN_TAG},
    error::{DecodeError, Error},
    hash::HashAlgorithm,
    signer::{InMemorySigner, PublicKey, SignatureAlgorithm, Signer},
    transaction::{
        classify, EncodingShape, ProposalKey, SignerIndex, Transaction, TransactionSignature,
    },
};

/// A 32-byte content identifier, derived by hashing canonical bytes.
pub type Identifier = B256;

/// The empty identifier.
pub const EMPTY_ID: Identifier = B256::ZERO;

/// The empty address, used as the "no address" sentinel for signing roles.
pub const EMPTY_ADDRESS: Address = Address::ZERO;

/// Constructs an [Identifier] from a 32-byte hash.
#[inline]
pub fn hash_to_id(hash: [u8; 32]) -> Identifier {
    Identifier::from(hash)
}

pub trait RlpBytes: Sized {
    /// Decodes the blob into the appropriate type.
    /// The input must contain exactly one value and no trailing data.
    fn decode_bytes(bytes: impl AsRef<[u8]>) -> Result<Self, alloy_rlp::Error>;
}

impl<T> RlpBytes for T
where
    T: alloy_rlp::Decodable,
{
    #[inline]
    fn decode_bytes(bytes: impl AsRef<[u8]>) -> Result<Self, alloy_rlp::Error> {
        let mut buf = bytes.as_ref();
        let this = T::decode(&mut buf)?;
        if buf.is_empty() {
            Ok(this)
        } else {
            Err(alloy_rlp::Error::Custom("Trailing data"))
        }
    }
}
