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

use alloy_primitives::Address;
use thiserror::Error as ThisError;

/// Errors returned when raw bytes cannot be turned into a transaction.
///
/// Absence of an element at one of the defined omission points (a bare payload, or an
/// envelope without envelope signatures) is not an error; everything listed here is.
#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum DecodeError {
    /// The outermost value is a string, not a list.
    #[error("invalid encoding: expected a list")]
    NotAList,
    /// The outermost list has no elements.
    #[error("invalid encoding: empty list")]
    EmptyList,
    /// The outermost list has more elements than any known shape.
    #[error("invalid encoding: unexpected list of {0} elements")]
    UnexpectedElements(usize),
    /// Bytes remain after the outermost value.
    #[error("invalid encoding: trailing data")]
    TrailingData,
    /// The input ended before a structurally required element.
    #[error("invalid encoding: input too short")]
    Truncated,
    /// A signature references a signer position the transaction does not have.
    #[error("signer index {index} out of range for {signers} signers")]
    SignerIndexOutOfRange { index: u64, signers: usize },
    /// A key index does not fit into 32 bits.
    #[error("key index {0} out of range")]
    KeyIndexOverflow(u64),
    /// Any other malformed RLP.
    #[error("RLP error: {0}")]
    Rlp(alloy_rlp::Error),
}

impl From<alloy_rlp::Error> for DecodeError {
    fn from(err: alloy_rlp::Error) -> Self {
        match err {
            alloy_rlp::Error::InputTooShort => DecodeError::Truncated,
            err => DecodeError::Rlp(err),
        }
    }
}

impl From<DecodeError> for alloy_rlp::Error {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::NotAList => alloy_rlp::Error::UnexpectedString,
            DecodeError::Truncated => alloy_rlp::Error::InputTooShort,
            DecodeError::KeyIndexOverflow(_) => alloy_rlp::Error::Overflow,
            DecodeError::Rlp(err) => err,
            DecodeError::EmptyList => alloy_rlp::Error::Custom("empty transaction list"),
            DecodeError::UnexpectedElements(_) => {
                alloy_rlp::Error::Custom("unexpected transaction elements")
            }
            DecodeError::TrailingData => alloy_rlp::Error::Custom("Trailing data"),
            DecodeError::SignerIndexOutOfRange { .. } => {
                alloy_rlp::Error::Custom("signer index out of range")
            }
        }
    }
}

/// Error returned by transaction assembly and signing.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The transaction bytes could not be decoded.
    #[error("failed to decode transaction")]
    Decode(#[from] DecodeError),
    /// The signer capability failed. The error is passed through as is.
    #[error(transparent)]
    Signer(anyhow::Error),
    /// A payload signature was added after the envelope was signed.
    #[error("envelope already signed; payload signatures can no longer change")]
    EnvelopeAlreadySigned,
    /// A signature belongs to an account that has no signing role.
    #[error("account {0} is not a signer of the transaction")]
    UnresolvedSigner(Address),
    /// A domain tag exceeds the fixed tag width.
    #[error("domain tag {tag} cannot be longer than {max} bytes")]
    DomainTagTooLong { tag: String, max: usize },
    /// Key material could not be parsed.
    #[error("invalid {0} key")]
    InvalidKey(&'static str),
}
