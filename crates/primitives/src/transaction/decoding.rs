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

//! Decoding of transactions from every encoding generation seen on the network.
//!
//! Older clients transmitted either a bare payload or a payload followed only by the
//! payload signatures. Such inputs are told apart by their RLP framing alone, before
//! any field is interpreted.

use alloy_primitives::{Address, Bytes, B256};
use alloy_rlp::{Decodable, Header};
use alloy_rlp_derive::RlpDecodable;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{ProposalKey, SignerIndex, Transaction, TransactionSignature};
use crate::{error::DecodeError, RlpBytes};

/// The framing of an encoded transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncodingShape {
    /// The input is the payload form alone.
    BarePayload,
    /// The payload, optionally followed by the payload signatures.
    EnvelopeOnly,
    /// The payload, the payload signatures and the envelope signatures.
    Full,
}

/// Determines the shape of an encoded transaction from its RLP framing.
pub fn classify(bytes: &[u8]) -> Result<EncodingShape, DecodeError> {
    let mut buf = bytes;
    let header = Header::decode(&mut buf)?;
    if !header.list {
        return Err(DecodeError::NotAList);
    }
    if buf.len() < header.payload_length {
        return Err(DecodeError::Truncated);
    }
    if buf.len() > header.payload_length {
        return Err(DecodeError::TrailingData);
    }
    if buf.is_empty() {
        return Err(DecodeError::EmptyList);
    }

    // a payload starts with the script, a string
    let first = Header::decode(&mut &buf[..])?;
    if !first.list {
        return Ok(EncodingShape::BarePayload);
    }

    match count_items(buf)? {
        1 | 2 => Ok(EncodingShape::EnvelopeOnly),
        3 => Ok(EncodingShape::Full),
        n => Err(DecodeError::UnexpectedElements(n)),
    }
}

fn count_items(mut buf: &[u8]) -> Result<usize, DecodeError> {
    let mut count = 0;
    while !buf.is_empty() {
        let head = Header::decode(&mut buf)?;
        if buf.len() < head.payload_length {
            return Err(DecodeError::Truncated);
        }
        buf = &buf[head.payload_length..];
        count += 1;
    }
    Ok(count)
}

#[derive(RlpDecodable)]
struct PayloadRecord {
    script: Bytes,
    reference_block_id: B256,
    gas_limit: u64,
    proposal_address: Address,
    proposal_key_index: u64,
    proposal_sequence_number: u64,
    payer: Address,
    authorizers: Vec<Address>,
}

#[derive(RlpDecodable)]
struct SignatureRecord {
    signer_index: u64,
    key_index: u64,
    signature: Bytes,
}

#[derive(RlpDecodable)]
struct TransactionRecord {
    payload: PayloadRecord,
    payload_signatures: Vec<SignatureRecord>,
    envelope_signatures: Vec<SignatureRecord>,
}

fn key_index(value: u64) -> Result<u32, DecodeError> {
    u32::try_from(value).map_err(|_| DecodeError::KeyIndexOverflow(value))
}

impl SignatureRecord {
    /// Maps the signer index back to the address of the signer.
    fn resolve(self, signers: &[Address]) -> Result<TransactionSignature, DecodeError> {
        let out_of_range = DecodeError::SignerIndexOutOfRange {
            index: self.signer_index,
            signers: signers.len(),
        };
        let index = usize::try_from(self.signer_index).map_err(|_| out_of_range.clone())?;
        let address = *signers.get(index).ok_or(out_of_range)?;

        Ok(TransactionSignature {
            address,
            signer_index: SignerIndex::Resolved(index),
            key_index: key_index(self.key_index)?,
            signature: self.signature,
        })
    }
}

impl PayloadRecord {
    fn into_transaction(
        self,
        payload_signatures: Vec<SignatureRecord>,
        envelope_signatures: Vec<SignatureRecord>,
    ) -> Result<Transaction, DecodeError> {
        let mut tx = Transaction {
            script: self.script,
            reference_block_id: self.reference_block_id,
            gas_limit: self.gas_limit,
            proposal_key: ProposalKey {
                address: self.proposal_address,
                key_index: key_index(self.proposal_key_index)?,
                sequence_number: self.proposal_sequence_number,
            },
            payer: self.payer,
            authorizers: self.authorizers,
            payload_signatures: Vec::new(),
            envelope_signatures: Vec::new(),
        };

        // signatures keep their wire order
        let signers = tx.signer_list();
        tx.payload_signatures = payload_signatures
            .into_iter()
            .map(|sig| sig.resolve(&signers))
            .collect::<Result<_, _>>()?;
        tx.envelope_signatures = envelope_signatures
            .into_iter()
            .map(|sig| sig.resolve(&signers))
            .collect::<Result<_, _>>()?;

        Ok(tx)
    }
}

impl Transaction {
    /// Decodes a transaction in any known encoding.
    ///
    /// The current full form is tried first. If that fails, the input is classified by
    /// its framing and decoded as a bare payload or an envelope without envelope
    /// signatures. Missing signature lists decode as empty.
    pub fn decode_bytes(bytes: impl AsRef<[u8]>) -> Result<Self, DecodeError> {
        let bytes = bytes.as_ref();
        match TransactionRecord::decode_bytes(bytes) {
            Ok(record) => record
                .payload
                .into_transaction(record.payload_signatures, record.envelope_signatures),
            Err(err) => {
                debug!("Not a full transaction encoding ({err}), trying legacy shapes");
                Self::decode_with_shape(bytes).map(|(tx, _)| tx)
            }
        }
    }

    /// Decodes a transaction according to its classified shape and returns the shape.
    pub fn decode_with_shape(
        bytes: impl AsRef<[u8]>,
    ) -> Result<(Self, EncodingShape), DecodeError> {
        let bytes = bytes.as_ref();
        let shape = classify(bytes)?;

        let mut buf = bytes;
        let tx = match shape {
            EncodingShape::BarePayload => {
                PayloadRecord::decode(&mut buf)?.into_transaction(Vec::new(), Vec::new())?
            }
            EncodingShape::EnvelopeOnly => {
                Header::decode(&mut buf)?;
                let payload = PayloadRecord::decode(&mut buf)?;
                let payload_signatures = if buf.is_empty() {
                    Vec::new()
                } else {
                    Vec::<SignatureRecord>::decode(&mut buf)?
                };
                payload.into_transaction(payload_signatures, Vec::new())?
            }
            EncodingShape::Full => {
                let record = TransactionRecord::decode(&mut buf)?;
                record
                    .payload
                    .into_transaction(record.payload_signatures, record.envelope_signatures)?
            }
        };
        debug_assert!(buf.is_empty());

        Ok((tx, shape))
    }
}

impl Decodable for Transaction {
    /// Decodes the next item of `buf` as a transaction of any known encoding.
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let mut body = *buf;
        let header = Header::decode(&mut body)?;
        let item_length = buf.len() - body.len() + header.payload_length;
        if buf.len() < item_length {
            return Err(alloy_rlp::Error::InputTooShort);
        }

        let (item, rest) = buf.split_at(item_length);
        let tx = Transaction::decode_bytes(item)?;
        *buf = rest;
        Ok(tx)
    }
}
