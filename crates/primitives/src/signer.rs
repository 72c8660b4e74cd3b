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

use std::fmt::{Debug, Display, Formatter};

use anyhow::Context;
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use serde::{Deserialize, Serialize};

use crate::{error::Error, hash::HashAlgorithm};

/// Length of a raw, uncompressed public key (`x || y`) in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 64;

/// Tag of an uncompressed SEC1 point.
const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

/// The signature algorithms an account key can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SignatureAlgorithm {
    /// ECDSA on the NIST P-256 curve.
    #[serde(rename = "ECDSA_P256")]
    #[cfg_attr(feature = "clap", value(name = "p256"))]
    EcdsaP256,
    /// ECDSA on the secp256k1 curve.
    #[serde(rename = "ECDSA_secp256k1")]
    #[cfg_attr(feature = "clap", value(name = "secp256k1"))]
    EcdsaSecp256k1,
}

impl Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureAlgorithm::EcdsaP256 => write!(f, "ECDSA_P256"),
            SignatureAlgorithm::EcdsaSecp256k1 => write!(f, "ECDSA_secp256k1"),
        }
    }
}

/// A capability that produces signatures over arbitrary messages.
///
/// Implementations own the hashing step and may be backed by remote services or
/// hardware, so signing is allowed to fail. Errors are opaque to the caller and are
/// propagated without interpretation or retries.
pub trait Signer {
    /// Returns the public key algorithm of the key used for signing.
    fn algorithm(&self) -> SignatureAlgorithm;
    /// Signs `message` and returns the raw signature bytes.
    fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>>;
}

impl<S: Signer + ?Sized> Signer for &S {
    fn algorithm(&self) -> SignatureAlgorithm {
        (**self).algorithm()
    }

    fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>> {
        (**self).sign(message)
    }
}

impl<S: Signer + ?Sized> Signer for Box<S> {
    fn algorithm(&self) -> SignatureAlgorithm {
        (**self).algorithm()
    }

    fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>> {
        (**self).sign(message)
    }
}

#[derive(Clone)]
enum SigningKey {
    P256(p256::ecdsa::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

/// A [Signer] holding an existing private key in memory.
///
/// Messages are hashed with the configured [HashAlgorithm] and the digest is signed.
/// Signatures are emitted as the raw concatenation `r || s`.
#[derive(Clone)]
pub struct InMemorySigner {
    key: SigningKey,
    hash: HashAlgorithm,
}

impl InMemorySigner {
    /// Creates a signer from the big-endian bytes of a private scalar.
    pub fn new(
        algorithm: SignatureAlgorithm,
        private_key: &[u8],
        hash: HashAlgorithm,
    ) -> Result<Self, Error> {
        let key = match algorithm {
            SignatureAlgorithm::EcdsaP256 => SigningKey::P256(
                p256::ecdsa::SigningKey::from_slice(private_key)
                    .map_err(|_| Error::InvalidKey("ECDSA_P256 private"))?,
            ),
            SignatureAlgorithm::EcdsaSecp256k1 => SigningKey::Secp256k1(
                k256::ecdsa::SigningKey::from_slice(private_key)
                    .map_err(|_| Error::InvalidKey("ECDSA_secp256k1 private"))?,
            ),
        };
        Ok(Self { key, hash })
    }

    /// Returns the hash algorithm applied to messages before signing.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash
    }

    /// Returns the public key matching this signer.
    pub fn public_key(&self) -> PublicKey {
        match &self.key {
            SigningKey::P256(key) => PublicKey::P256(*key.verifying_key()),
            SigningKey::Secp256k1(key) => PublicKey::Secp256k1(*key.verifying_key()),
        }
    }
}

impl Debug for InMemorySigner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySigner")
            .field("algorithm", &self.algorithm())
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

impl Signer for InMemorySigner {
    fn algorithm(&self) -> SignatureAlgorithm {
        match self.key {
            SigningKey::P256(_) => SignatureAlgorithm::EcdsaP256,
            SigningKey::Secp256k1(_) => SignatureAlgorithm::EcdsaSecp256k1,
        }
    }

    fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>> {
        let digest = self.hash.hash(message);
        let signature = match &self.key {
            SigningKey::P256(key) => {
                let signature: p256::ecdsa::Signature = key
                    .sign_prehash(digest.as_slice())
                    .context("ECDSA_P256 signing failed")?;
                signature.to_bytes().to_vec()
            }
            SigningKey::Secp256k1(key) => {
                let signature: k256::ecdsa::Signature = key
                    .sign_prehash(digest.as_slice())
                    .context("ECDSA_secp256k1 signing failed")?;
                signature.to_bytes().to_vec()
            }
        };
        Ok(signature)
    }
}

/// Public key of an account key, used to verify signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicKey {
    P256(p256::ecdsa::VerifyingKey),
    Secp256k1(k256::ecdsa::VerifyingKey),
}

impl PublicKey {
    /// Parses a public key, given either as raw `x || y` bytes or as a SEC1 point.
    pub fn from_bytes(algorithm: SignatureAlgorithm, bytes: &[u8]) -> Result<Self, Error> {
        let sec1 = if bytes.len() == PUBLIC_KEY_LENGTH {
            let mut point = Vec::with_capacity(PUBLIC_KEY_LENGTH + 1);
            point.push(SEC1_UNCOMPRESSED_TAG);
            point.extend_from_slice(bytes);
            point
        } else {
            bytes.to_vec()
        };

        match algorithm {
            SignatureAlgorithm::EcdsaP256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                .map(PublicKey::P256)
                .map_err(|_| Error::InvalidKey("ECDSA_P256 public")),
            SignatureAlgorithm::EcdsaSecp256k1 => {
                k256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map(PublicKey::Secp256k1)
                    .map_err(|_| Error::InvalidKey("ECDSA_secp256k1 public"))
            }
        }
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            PublicKey::P256(_) => SignatureAlgorithm::EcdsaP256,
            PublicKey::Secp256k1(_) => SignatureAlgorithm::EcdsaSecp256k1,
        }
    }

    /// Returns the raw `x || y` encoding of the key.
    pub fn to_bytes(&self) -> Vec<u8> {
        let point = match self {
            PublicKey::P256(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            PublicKey::Secp256k1(key) => key.to_encoded_point(false).as_bytes().to_vec(),
        };
        debug_assert_eq!(point[0], SEC1_UNCOMPRESSED_TAG);
        point[1..].to_vec()
    }

    /// Verifies a raw `r || s` signature over `message` hashed with `hash`.
    pub fn verify(&self, signature: &[u8], message: &[u8], hash: HashAlgorithm) -> bool {
        let digest = hash.hash(message);
        match self {
            PublicKey::P256(key) => p256::ecdsa::Signature::from_slice(signature)
                .and_then(|sig| key.verify_prehash(digest.as_slice(), &sig))
                .is_ok(),
            PublicKey::Secp256k1(key) => k256::ecdsa::Signature::from_slice(signature)
                .and_then(|sig| key.verify_prehash(digest.as_slice(), &sig))
                .is_ok(),
        }
    }
}
