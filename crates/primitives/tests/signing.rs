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

use alloy_primitives::address;
use flowtx_primitives::{
    domain::with_domain_tag, Address, DecodeError, EncodingShape, Error, HashAlgorithm,
    InMemorySigner, SignatureAlgorithm, SignerIndex, Transaction, B256,
    TRANSACTION_DOMAIN_TAG,
};
use rstest::rstest;

const A: Address = address!("f8d6e0586b0a20c7f8d6e0586b0a20c7f8d6e058");
const B: Address = address!("01cf0e2f2f715450aa1b7b3b2e3f6a7c3d9e1b20");

struct Keys {
    a2: InMemorySigner,
    a3: InMemorySigner,
    b7: InMemorySigner,
}

fn keys(algorithm: SignatureAlgorithm, hash: HashAlgorithm) -> Keys {
    let signer = |byte: u8| InMemorySigner::new(algorithm, &[byte; 32], hash).unwrap();
    Keys {
        a2: signer(0x11),
        a3: signer(0x22),
        b7: signer(0x33),
    }
}

fn unsigned_tx() -> Transaction {
    Transaction::new()
        .with_script(b"transaction{execute{}}".to_vec())
        .with_reference_block_id(B256::repeat_byte(0x01))
        .with_gas_limit(42)
        .with_proposal_key(A, 3, 42)
        .with_payer(B)
        .with_authorizer(A)
}

#[rstest]
fn multi_party_signing(
    #[values(SignatureAlgorithm::EcdsaP256, SignatureAlgorithm::EcdsaSecp256k1)]
    algorithm: SignatureAlgorithm,
    #[values(HashAlgorithm::Sha2_256, HashAlgorithm::Sha3_256)] hash: HashAlgorithm,
) {
    let keys = keys(algorithm, hash);
    let mut tx = unsigned_tx();
    assert_eq!(tx.signer_list(), vec![A, B]);

    tx.sign_payload(A, 2, &keys.a2).unwrap();
    tx.sign_payload(A, 3, &keys.a3).unwrap();
    let payload = with_domain_tag(&TRANSACTION_DOMAIN_TAG, &tx.payload_message());
    let envelope = with_domain_tag(&TRANSACTION_DOMAIN_TAG, &tx.envelope_message());
    tx.sign_envelope(B, 7, &keys.b7).unwrap();
    assert!(tx.ensure_signers_resolved().is_ok());

    let payload_sigs = tx.payload_signatures();
    assert_eq!(payload_sigs.len(), 2);
    for (sig, (key_index, signer)) in payload_sigs.iter().zip([(2, &keys.a2), (3, &keys.a3)]) {
        assert_eq!(sig.address, A);
        assert_eq!(sig.signer_index, SignerIndex::Resolved(0));
        assert_eq!(sig.key_index, key_index);
        assert!(signer.public_key().verify(&sig.signature, &payload, hash));
    }

    let envelope_sigs = tx.envelope_signatures();
    assert_eq!(envelope_sigs.len(), 1);
    assert_eq!(envelope_sigs[0].address, B);
    assert_eq!(envelope_sigs[0].signer_index, SignerIndex::Resolved(1));
    assert_eq!(envelope_sigs[0].key_index, 7);
    assert!(keys.b7.public_key().verify(&envelope_sigs[0].signature, &envelope, hash));
    // the payer did not sign the payload
    assert!(!keys.b7.public_key().verify(&envelope_sigs[0].signature, &payload, hash));

    let decoded = Transaction::decode_bytes(tx.encode()).unwrap();
    assert_eq!(decoded, tx);
    assert_eq!(decoded.id(), tx.id());
}

#[rstest]
fn id_independent_of_signing_order(
    #[values(SignatureAlgorithm::EcdsaP256, SignatureAlgorithm::EcdsaSecp256k1)]
    algorithm: SignatureAlgorithm,
) {
    let keys = keys(algorithm, HashAlgorithm::Sha3_256);

    let mut forward = unsigned_tx();
    forward.sign_payload(A, 2, &keys.a2).unwrap();
    forward.sign_payload(A, 3, &keys.a3).unwrap();
    forward.sign_envelope(B, 7, &keys.b7).unwrap();

    let mut reverse = unsigned_tx();
    reverse.sign_payload(A, 3, &keys.a3).unwrap();
    reverse.sign_payload(A, 2, &keys.a2).unwrap();
    reverse.sign_envelope(B, 7, &keys.b7).unwrap();

    assert_eq!(forward.encode(), reverse.encode());
    assert_eq!(forward.id(), reverse.id());
}

#[test]
fn payload_sealed_after_envelope() {
    let keys = keys(SignatureAlgorithm::EcdsaP256, HashAlgorithm::Sha3_256);
    let mut tx = unsigned_tx();
    tx.sign_payload(A, 3, &keys.a3).unwrap();
    tx.sign_envelope(B, 7, &keys.b7).unwrap();
    let sealed = tx.clone();

    assert!(matches!(
        tx.sign_payload(A, 2, &keys.a2),
        Err(Error::EnvelopeAlreadySigned)
    ));
    assert_eq!(tx, sealed);
}

#[test]
fn legacy_fallback() {
    let keys = keys(SignatureAlgorithm::EcdsaSecp256k1, HashAlgorithm::Sha3_256);
    let mut tx = unsigned_tx();

    let (decoded, shape) = Transaction::decode_with_shape(tx.payload_message()).unwrap();
    assert_eq!(shape, EncodingShape::BarePayload);
    assert_eq!(decoded, tx);

    tx.sign_payload(A, 2, &keys.a2).unwrap();
    let (decoded, shape) = Transaction::decode_with_shape(tx.envelope_message()).unwrap();
    assert_eq!(shape, EncodingShape::EnvelopeOnly);
    assert_eq!(decoded, tx);

    // the payer can still complete a transaction received in legacy form
    let mut decoded = Transaction::decode_bytes(tx.envelope_message()).unwrap();
    decoded.sign_envelope(B, 7, &keys.b7).unwrap();
    tx.sign_envelope(B, 7, &keys.b7).unwrap();
    assert_eq!(decoded.id(), tx.id());
}

#[test]
fn malformed_input() {
    assert!(matches!(
        Transaction::decode_bytes([0x83u8, 0x01, 0x02, 0x03]),
        Err(DecodeError::NotAList)
    ));
    assert!(matches!(
        Transaction::decode_bytes([0xc0u8]),
        Err(DecodeError::EmptyList)
    ));
    assert!(matches!(
        Transaction::decode_bytes([0u8; 0]),
        Err(DecodeError::Truncated)
    ));
}
