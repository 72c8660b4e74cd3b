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

use std::fmt::{Display, Formatter};

use alloy_primitives::{b256, B256};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sha3::{Digest, Sha3_256};

/// SHA3-256 hash of an empty slice.
pub const SHA3_256_EMPTY: B256 =
    b256!("a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a");

/// Hash algorithm used to compute entity identifiers.
pub const DEFAULT_ENTITY_HASH: HashAlgorithm = HashAlgorithm::Sha3_256;

/// The hash algorithms a signer can pair with its signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum HashAlgorithm {
    #[serde(rename = "SHA2_256")]
    #[cfg_attr(feature = "clap", value(name = "sha2-256"))]
    Sha2_256,
    #[serde(rename = "SHA3_256")]
    #[cfg_attr(feature = "clap", value(name = "sha3-256"))]
    Sha3_256,
}

impl HashAlgorithm {
    /// Computes the digest of `data`.
    pub fn hash(&self, data: impl AsRef<[u8]>) -> B256 {
        match self {
            HashAlgorithm::Sha2_256 => sha2_256(data),
            HashAlgorithm::Sha3_256 => sha3_256(data),
        }
    }
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Sha2_256 => write!(f, "SHA2_256"),
            HashAlgorithm::Sha3_256 => write!(f, "SHA3_256"),
        }
    }
}

/// Computes the SHA3-256 hash.
#[inline]
pub fn sha3_256(data: impl AsRef<[u8]>) -> B256 {
    <[u8; 32]>::from(Sha3_256::digest(data)).into()
}

/// Computes the SHA2-256 hash.
#[inline]
pub fn sha2_256(data: impl AsRef<[u8]>) -> B256 {
    <[u8; 32]>::from(Sha256::digest(data)).into()
}
