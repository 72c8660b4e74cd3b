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

use std::collections::HashMap;

use alloy_primitives::{Address, Bytes};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{with_domain_tag, TRANSACTION_DOMAIN_TAG},
    error::Error,
    hash::DEFAULT_ENTITY_HASH,
    signer::Signer,
    Identifier, EMPTY_ADDRESS, EMPTY_ID,
};

mod decoding;
mod encoding;

pub use decoding::{classify, EncodingShape};

/// The account key that proposes a transaction, together with the sequence number it
/// declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProposalKey {
    /// Account owning the key.
    pub address: Address,
    /// Index of the key in the account.
    pub key_index: u32,
    /// Expected sequence number of the key at submission time.
    pub sequence_number: u64,
}

/// Position of an account in the deduplicated list of transaction signers.
///
/// A signature can be recorded for an account before the account has been given a
/// signing role. Its index is then [SignerIndex::Unresolved], which orders before every
/// resolved index and is encoded as `u64::MAX`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum SignerIndex {
    /// The account is not a signer of the transaction.
    #[default]
    Unresolved,
    /// The account is the signer at this position.
    Resolved(usize),
}

impl SignerIndex {
    /// Wire value of an unresolved signer index.
    pub const UNRESOLVED: u64 = u64::MAX;

    pub fn is_resolved(&self) -> bool {
        matches!(self, SignerIndex::Resolved(_))
    }

    /// Returns the position, if resolved.
    pub fn index(&self) -> Option<usize> {
        match self {
            SignerIndex::Resolved(index) => Some(*index),
            SignerIndex::Unresolved => None,
        }
    }

    /// Returns the value written to the wire.
    pub fn to_wire(&self) -> u64 {
        match self {
            SignerIndex::Resolved(index) => *index as u64,
            SignerIndex::Unresolved => Self::UNRESOLVED,
        }
    }
}

/// A signature of a transaction message, associated with a specific account key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionSignature {
    /// Account that produced the signature.
    pub address: Address,
    /// Position of `address` in the signer list of the transaction.
    pub signer_index: SignerIndex,
    /// Index of the signing key in the account.
    pub key_index: u32,
    /// Raw signature bytes.
    pub signature: Bytes,
}

/// A transaction together with the signatures collected so far.
///
/// A transaction is assembled with the `with_*` builder methods, then signed in two
/// phases: every proposer and authorizer signs the [payload
/// message](Transaction::payload_message), after which the payer signs the [envelope
/// message](Transaction::envelope_message). The envelope message contains all payload
/// signatures, so payload signatures can no longer be added once the envelope is
/// signed.
///
/// The signer index of every signature is derived from the current signing roles and
/// re-resolved whenever a role changes, so it never goes stale. A role change also
/// re-sorts both signature lists, including lists decoded in non-canonical order.
///
/// The `with_*` builders change the payload. Any envelope signature present at that
/// point is dropped, and payload signatures collected earlier only verify if they were
/// made over the final payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "TransactionFields")]
pub struct Transaction {
    script: Bytes,
    reference_block_id: Identifier,
    gas_limit: u64,
    proposal_key: ProposalKey,
    payer: Address,
    authorizers: Vec<Address>,
    payload_signatures: Vec<TransactionSignature>,
    envelope_signatures: Vec<TransactionSignature>,
}

/// Deserialized form of a [Transaction], before signer indices are resolved.
#[derive(Deserialize)]
struct TransactionFields {
    script: Bytes,
    reference_block_id: Identifier,
    gas_limit: u64,
    proposal_key: ProposalKey,
    payer: Address,
    authorizers: Vec<Address>,
    payload_signatures: Vec<TransactionSignature>,
    envelope_signatures: Vec<TransactionSignature>,
}

impl From<TransactionFields> for Transaction {
    fn from(fields: TransactionFields) -> Self {
        let mut tx = Transaction {
            script: fields.script,
            reference_block_id: fields.reference_block_id,
            gas_limit: fields.gas_limit,
            proposal_key: fields.proposal_key,
            payer: fields.payer,
            authorizers: fields.authorizers,
            payload_signatures: fields.payload_signatures,
            envelope_signatures: fields.envelope_signatures,
        };
        tx.resolve_signers();
        tx
    }
}

impl Transaction {
    /// Returns an empty transaction.
    pub fn new() -> Self {
        Self {
            reference_block_id: EMPTY_ID,
            payer: EMPTY_ADDRESS,
            ..Default::default()
        }
    }

    /// Sets the script executed by the transaction.
    pub fn with_script(mut self, script: impl Into<Bytes>) -> Self {
        self.unseal_envelope();
        self.script = script.into();
        self
    }

    /// Sets the block the transaction expiry is measured against.
    pub fn with_reference_block_id(mut self, block_id: Identifier) -> Self {
        self.unseal_envelope();
        self.reference_block_id = block_id;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.unseal_envelope();
        self.gas_limit = gas_limit;
        self
    }

    /// Sets the proposal key and the sequence number it declares.
    pub fn with_proposal_key(
        mut self,
        address: Address,
        key_index: u32,
        sequence_number: u64,
    ) -> Self {
        self.unseal_envelope();
        self.proposal_key = ProposalKey {
            address,
            key_index,
            sequence_number,
        };
        self.resolve_signers();
        self
    }

    /// Sets the account paying for the transaction.
    pub fn with_payer(mut self, payer: Address) -> Self {
        self.unseal_envelope();
        self.payer = payer;
        self.resolve_signers();
        self
    }

    /// Appends an authorizer. The same account may be added more than once.
    pub fn with_authorizer(mut self, authorizer: Address) -> Self {
        self.unseal_envelope();
        self.authorizers.push(authorizer);
        self.resolve_signers();
        self
    }

    pub fn script(&self) -> &Bytes {
        &self.script
    }

    pub fn reference_block_id(&self) -> Identifier {
        self.reference_block_id
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn proposal_key(&self) -> &ProposalKey {
        &self.proposal_key
    }

    pub fn payer(&self) -> Address {
        self.payer
    }

    pub fn authorizers(&self) -> &[Address] {
        &self.authorizers
    }

    /// Returns the payload signatures, ordered by signer and key index.
    pub fn payload_signatures(&self) -> &[TransactionSignature] {
        &self.payload_signatures
    }

    /// Returns the envelope signatures, ordered by signer and key index.
    pub fn envelope_signatures(&self) -> &[TransactionSignature] {
        &self.envelope_signatures
    }

    /// Computes the identifier of the transaction.
    ///
    /// The identifier covers all signatures, so it only becomes final once the envelope
    /// has been signed.
    pub fn id(&self) -> Identifier {
        DEFAULT_ENTITY_HASH.hash(self.encode())
    }

    /// Returns the unique accounts required to sign the transaction.
    ///
    /// The list is ordered as proposer, payer, then the authorizers in insertion order.
    /// An account that holds several roles only appears at its first position, and the
    /// empty address never appears for the proposer or payer.
    pub fn signer_list(&self) -> Vec<Address> {
        let mut signers = Vec::with_capacity(2 + self.authorizers.len());
        let mut add_signer = |address: Address| {
            if !signers.contains(&address) {
                signers.push(address);
            }
        };

        if self.proposal_key.address != EMPTY_ADDRESS {
            add_signer(self.proposal_key.address);
        }
        if self.payer != EMPTY_ADDRESS {
            add_signer(self.payer);
        }
        self.authorizers.iter().copied().for_each(add_signer);

        signers
    }

    /// Returns a mapping from signer address to signer index.
    pub fn signer_map(&self) -> HashMap<Address, usize> {
        self.signer_list()
            .into_iter()
            .enumerate()
            .map(|(index, address)| (address, index))
            .collect()
    }

    /// Resolves the signer index of `address`.
    pub fn signer_index(&self, address: &Address) -> SignerIndex {
        self.signer_list()
            .iter()
            .position(|signer| signer == address)
            .map_or(SignerIndex::Unresolved, SignerIndex::Resolved)
    }

    /// Returns all signatures whose account has no signing role.
    pub fn unresolved_signatures(&self) -> impl Iterator<Item = &TransactionSignature> {
        self.payload_signatures
            .iter()
            .chain(&self.envelope_signatures)
            .filter(|sig| !sig.signer_index.is_resolved())
    }

    /// Fails if any signature belongs to an account without a signing role.
    ///
    /// Such signatures are accepted while a transaction is assembled, but a transaction
    /// containing them cannot be validated and must not be transmitted.
    pub fn ensure_signers_resolved(&self) -> Result<(), Error> {
        match self.unresolved_signatures().next() {
            Some(sig) => Err(Error::UnresolvedSigner(sig.address)),
            None => Ok(()),
        }
    }

    /// Signs the payload message with the given account key and adds the signature.
    ///
    /// The message is prefixed with the transaction domain tag before it is passed to
    /// the signer.
    pub fn sign_payload(
        &mut self,
        address: Address,
        key_index: u32,
        signer: &dyn Signer,
    ) -> Result<&mut Self, Error> {
        self.ensure_envelope_unsigned()?;
        let message = with_domain_tag(&TRANSACTION_DOMAIN_TAG, &self.payload_message());
        let signature = signer.sign(&message).map_err(Error::Signer)?;
        self.add_payload_signature(address, key_index, signature)
    }

    /// Signs the envelope message with the given account key and adds the signature.
    ///
    /// The message is prefixed with the transaction domain tag before it is passed to
    /// the signer.
    pub fn sign_envelope(
        &mut self,
        address: Address,
        key_index: u32,
        signer: &dyn Signer,
    ) -> Result<&mut Self, Error> {
        let message = with_domain_tag(&TRANSACTION_DOMAIN_TAG, &self.envelope_message());
        let signature = signer.sign(&message).map_err(Error::Signer)?;
        Ok(self.add_envelope_signature(address, key_index, signature))
    }

    /// Adds a payload signature for the given account key.
    ///
    /// Returns [Error::EnvelopeAlreadySigned] if an envelope signature exists, as the
    /// new signature would invalidate it.
    pub fn add_payload_signature(
        &mut self,
        address: Address,
        key_index: u32,
        signature: impl Into<Bytes>,
    ) -> Result<&mut Self, Error> {
        self.ensure_envelope_unsigned()?;
        let sig = self.create_signature(address, key_index, signature.into());
        self.payload_signatures.push(sig);
        sort_signatures(&mut self.payload_signatures);
        Ok(self)
    }

    /// Adds an envelope signature for the given account key.
    pub fn add_envelope_signature(
        &mut self,
        address: Address,
        key_index: u32,
        signature: impl Into<Bytes>,
    ) -> &mut Self {
        let sig = self.create_signature(address, key_index, signature.into());
        self.envelope_signatures.push(sig);
        sort_signatures(&mut self.envelope_signatures);
        self
    }

    /// Drops the envelope signatures ahead of a payload change, as they no longer cover
    /// the new payload. The payer has to sign again.
    fn unseal_envelope(&mut self) {
        if !self.envelope_signatures.is_empty() {
            warn!(
                "Payload changed after envelope signing, dropping {} envelope signature(s)",
                self.envelope_signatures.len()
            );
            self.envelope_signatures.clear();
        }
    }

    fn ensure_envelope_unsigned(&self) -> Result<(), Error> {
        if self.envelope_signatures.is_empty() {
            Ok(())
        } else {
            Err(Error::EnvelopeAlreadySigned)
        }
    }

    fn create_signature(
        &self,
        address: Address,
        key_index: u32,
        signature: Bytes,
    ) -> TransactionSignature {
        let signer_index = self.signer_index(&address);
        if !signer_index.is_resolved() {
            debug!("Recording signature of {address} without a signing role");
        }
        TransactionSignature {
            address,
            signer_index,
            key_index,
            signature,
        }
    }

    /// Re-resolves the signer index of every signature against the current roles.
    fn resolve_signers(&mut self) {
        if self.payload_signatures.is_empty() && self.envelope_signatures.is_empty() {
            return;
        }
        let signers = self.signer_map();
        for sig in self
            .payload_signatures
            .iter_mut()
            .chain(self.envelope_signatures.iter_mut())
        {
            sig.signer_index = signers
                .get(&sig.address)
                .copied()
                .map_or(SignerIndex::Unresolved, SignerIndex::Resolved);
        }
        sort_signatures(&mut self.payload_signatures);
        sort_signatures(&mut self.envelope_signatures);
    }
}

/// Orders signatures by signer index, then by key index.
///
/// The sort is stable, so signatures of the same key keep their insertion order.
fn sort_signatures(signatures: &mut [TransactionSignature]) {
    signatures.sort_by_key(|sig| (sig.signer_index, sig.key_index));
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;

    use super::*;

    const A: Address = address!("00000000000000000000000000000000000000aa");
    const B: Address = address!("00000000000000000000000000000000000000bb");
    const C: Address = address!("00000000000000000000000000000000000000cc");

    fn sig(byte: u8) -> Vec<u8> {
        vec![byte]
    }

    #[test]
    fn signer_list_deduplicates() {
        let tx = Transaction::new()
            .with_proposal_key(A, 3, 42)
            .with_payer(B)
            .with_authorizer(A)
            .with_authorizer(C);
        assert_eq!(tx.signer_list(), vec![A, B, C]);
        assert_eq!(tx.signer_map(), HashMap::from([(A, 0), (B, 1), (C, 2)]));
        assert_eq!(tx.signer_index(&C), SignerIndex::Resolved(2));
    }

    #[test]
    fn signer_list_skips_empty_roles() {
        assert!(Transaction::new().signer_list().is_empty());

        let tx = Transaction::new().with_authorizer(B).with_authorizer(B);
        assert_eq!(tx.signer_list(), vec![B]);
        assert_eq!(tx.authorizers(), &[B, B]);

        let tx = Transaction::new().with_payer(C).with_authorizer(A);
        assert_eq!(tx.signer_list(), vec![C, A]);
    }

    #[test]
    fn unresolved_signer() {
        let mut tx = Transaction::new();
        tx.add_payload_signature(A, 7, sig(42)).unwrap();

        let sigs = tx.payload_signatures();
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].signer_index, SignerIndex::Unresolved);
        assert_eq!(sigs[0].signer_index.to_wire(), u64::MAX);
        assert!(matches!(
            tx.ensure_signers_resolved(),
            Err(Error::UnresolvedSigner(address)) if address == A
        ));
    }

    #[test]
    fn signatures_sorted_by_signer() {
        let mut tx = Transaction::new().with_authorizer(A).with_authorizer(B);
        // reverse order of declaration
        tx.add_payload_signature(B, 7, sig(1)).unwrap();
        tx.add_payload_signature(A, 7, sig(2)).unwrap();

        let sigs = tx.payload_signatures();
        assert_eq!(sigs[0].address, A);
        assert_eq!(sigs[0].signer_index, SignerIndex::Resolved(0));
        assert_eq!(sigs[1].address, B);
        assert_eq!(sigs[1].signer_index, SignerIndex::Resolved(1));
    }

    #[test]
    fn signatures_sorted_by_key() {
        let mut tx = Transaction::new().with_authorizer(A);
        tx.add_payload_signature(A, 8, sig(43)).unwrap();
        tx.add_payload_signature(A, 7, sig(42)).unwrap();
        tx.add_envelope_signature(A, 8, sig(43));
        tx.add_envelope_signature(A, 7, sig(42));

        for sigs in [tx.payload_signatures(), tx.envelope_signatures()] {
            assert_eq!(sigs[0].key_index, 7);
            assert_eq!(sigs[0].signature.to_vec(), vec![42]);
            assert_eq!(sigs[1].key_index, 8);
            assert_eq!(sigs[1].signature.to_vec(), vec![43]);
        }
    }

    #[test]
    fn unresolved_orders_first() {
        let mut tx = Transaction::new().with_authorizer(A);
        tx.add_payload_signature(A, 0, sig(1)).unwrap();
        tx.add_payload_signature(C, 0, sig(2)).unwrap();

        let sigs = tx.payload_signatures();
        assert_eq!(sigs[0].address, C);
        assert_eq!(sigs[1].address, A);
        assert_eq!(tx.unresolved_signatures().count(), 1);
    }

    #[test]
    fn roles_resolve_existing_signatures() {
        let mut complete = Transaction::new()
            .with_authorizer(A)
            .with_proposal_key(B, 0, 0)
            .with_payer(A);
        complete.add_payload_signature(B, 0, sig(42)).unwrap();
        complete.add_envelope_signature(A, 7, sig(42));
        assert_eq!(complete.payload_signatures()[0].signer_index, SignerIndex::Resolved(0));
        assert_eq!(complete.envelope_signatures()[0].signer_index, SignerIndex::Resolved(1));

        // same payload signature, added before any role is known
        let mut staged = Transaction::new();
        staged.add_payload_signature(B, 0, sig(42)).unwrap();
        assert_eq!(staged.unresolved_signatures().count(), 1);

        let mut staged = staged
            .with_authorizer(A)
            .with_proposal_key(B, 0, 0)
            .with_payer(A);
        assert!(staged.ensure_signers_resolved().is_ok());
        staged.add_envelope_signature(A, 7, sig(42));
        assert_eq!(staged, complete);
        assert_eq!(staged.id(), complete.id());
    }

    #[test]
    fn payload_sealed_by_envelope() {
        let mut tx = Transaction::new().with_payer(A).with_authorizer(B);
        tx.add_payload_signature(B, 0, sig(1)).unwrap();
        tx.add_envelope_signature(A, 0, sig(2));

        assert!(matches!(
            tx.add_payload_signature(B, 1, sig(3)),
            Err(Error::EnvelopeAlreadySigned)
        ));
        assert_eq!(tx.payload_signatures().len(), 1);
    }

    #[test]
    fn role_change_drops_envelope() {
        let mut tx = Transaction::new().with_proposal_key(A, 0, 0).with_payer(B);
        tx.add_payload_signature(A, 0, sig(1)).unwrap();
        tx.add_payload_signature(C, 0, sig(2)).unwrap();
        tx.add_envelope_signature(B, 0, sig(3));
        let signed_envelope = tx.envelope_message();

        let mut tx = tx.with_authorizer(C);
        assert!(tx.envelope_signatures().is_empty());
        assert_ne!(tx.envelope_message(), signed_envelope);
        let resolved: Vec<_> = tx
            .payload_signatures()
            .iter()
            .map(|sig| (sig.address, sig.signer_index))
            .collect();
        assert_eq!(
            resolved,
            vec![(A, SignerIndex::Resolved(0)), (C, SignerIndex::Resolved(2))]
        );

        // the payer signs the new envelope
        tx.add_envelope_signature(B, 0, sig(4));
        assert!(tx.ensure_signers_resolved().is_ok());
        assert_eq!(tx.envelope_signatures()[0].signer_index, SignerIndex::Resolved(1));
    }

    #[test]
    fn payload_change_drops_envelope() {
        let changes: [fn(Transaction) -> Transaction; 6] = [
            |tx| tx.with_script(b"transaction{}".to_vec()),
            |tx| tx.with_reference_block_id(Identifier::repeat_byte(0x02)),
            |tx| tx.with_gas_limit(7),
            |tx| tx.with_proposal_key(A, 1, 1),
            |tx| tx.with_payer(B),
            |tx| tx.with_authorizer(A),
        ];

        for change in changes {
            let mut tx = Transaction::new().with_payer(B).with_authorizer(A);
            tx.add_payload_signature(A, 0, sig(1)).unwrap();
            tx.add_envelope_signature(B, 0, sig(2));

            let mut tx = change(tx);
            assert!(tx.envelope_signatures().is_empty());
            assert_eq!(tx.payload_signatures().len(), 1);
            // payload signatures may be collected again
            assert!(tx.add_payload_signature(A, 1, sig(3)).is_ok());
        }
    }

    #[test]
    fn json() {
        let mut tx = Transaction::new().with_payer(A).with_gas_limit(9999);
        tx.add_envelope_signature(A, 1, sig(0xab));
        tx.add_envelope_signature(B, 1, sig(0xcd));

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["payer"], serde_json::json!(A));
        assert_eq!(json["gas_limit"], 9999);
        assert_eq!(json["authorizers"], serde_json::json!([]));
        let sigs = &json["envelope_signatures"];
        assert_eq!(sigs[0]["signer_index"], "Unresolved");
        assert_eq!(sigs[1]["signer_index"], serde_json::json!({ "Resolved": 0 }));
        assert_eq!(sigs[1]["signature"], "0xab");

        let decoded: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn json_resolves_signers() {
        let mut tx = Transaction::new().with_authorizer(A);
        tx.add_payload_signature(A, 0, sig(1)).unwrap();

        let mut json = serde_json::to_value(&tx).unwrap();
        json["payload_signatures"][0]["signer_index"] = serde_json::json!({ "Resolved": 5 });
        let decoded: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.payload_signatures()[0].signer_index, SignerIndex::Resolved(0));
    }

    #[test]
    fn id_tracks_signatures() {
        let mut tx = Transaction::new()
            .with_script(b"transaction{execute{}}".to_vec())
            .with_payer(A);
        let unsigned = tx.id();
        assert_eq!(unsigned, tx.id());

        tx.add_envelope_signature(A, 0, sig(1));
        assert_ne!(unsigned, tx.id());
    }
}
