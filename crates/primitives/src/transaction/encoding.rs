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

use alloy_rlp::{BufMut, Encodable, Header};

use super::{SignerIndex, Transaction, TransactionSignature};

impl Encodable for SignerIndex {
    #[inline]
    fn encode(&self, out: &mut dyn BufMut) {
        self.to_wire().encode(out)
    }

    #[inline]
    fn length(&self) -> usize {
        self.to_wire().length()
    }
}

impl TransactionSignature {
    fn payload_length(&self) -> usize {
        self.signer_index.length() + self.key_index.length() + self.signature.length()
    }
}

impl Encodable for TransactionSignature {
    /// Encodes the signature as `[signer_index, key_index, signature]`. The address is
    /// implied by the signer index and is not encoded.
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.signer_index.encode(out);
        self.key_index.encode(out);
        self.signature.encode(out);
    }

    #[inline]
    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

/// The part of a transaction signed by the proposer and the authorizers.
struct PayloadForm<'a>(&'a Transaction);

impl PayloadForm<'_> {
    fn payload_length(&self) -> usize {
        let tx = self.0;
        tx.script.length()
            + tx.reference_block_id.length()
            + tx.gas_limit.length()
            + tx.proposal_key.address.length()
            + tx.proposal_key.key_index.length()
            + tx.proposal_key.sequence_number.length()
            + tx.payer.length()
            + tx.authorizers.length()
    }
}

impl Encodable for PayloadForm<'_> {
    fn encode(&self, out: &mut dyn BufMut) {
        let tx = self.0;
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        tx.script.encode(out);
        tx.reference_block_id.encode(out);
        tx.gas_limit.encode(out);
        tx.proposal_key.address.encode(out);
        tx.proposal_key.key_index.encode(out);
        tx.proposal_key.sequence_number.encode(out);
        tx.payer.encode(out);
        tx.authorizers.encode(out);
    }

    #[inline]
    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

/// The payload together with the payload signatures, signed by the payer.
struct EnvelopeForm<'a>(&'a Transaction);

impl EnvelopeForm<'_> {
    fn payload_length(&self) -> usize {
        PayloadForm(self.0).length() + self.0.payload_signatures.length()
    }
}

impl Encodable for EnvelopeForm<'_> {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        PayloadForm(self.0).encode(out);
        self.0.payload_signatures.encode(out);
    }

    #[inline]
    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

impl Transaction {
    fn payload_length(&self) -> usize {
        PayloadForm(self).length()
            + self.payload_signatures.length()
            + self.envelope_signatures.length()
    }

    /// Returns the canonical payload encoding, the message signed by the proposer and
    /// the authorizers.
    pub fn payload_message(&self) -> Vec<u8> {
        alloy_rlp::encode(PayloadForm(self))
    }

    /// Returns the canonical envelope encoding, the message signed by the payer.
    pub fn envelope_message(&self) -> Vec<u8> {
        alloy_rlp::encode(EnvelopeForm(self))
    }

    /// Returns the canonical encoding of the complete transaction.
    pub fn encode(&self) -> Vec<u8> {
        alloy_rlp::encode(self)
    }
}

impl Encodable for Transaction {
    /// Encodes the full form `[payload, payload_signatures, envelope_signatures]`.
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        PayloadForm(self).encode(out);
        self.payload_signatures.encode(out);
        self.envelope_signatures.encode(out);
    }

    #[inline]
    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}
