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

use flowtx_primitives::{HashAlgorithm, SignatureAlgorithm};

#[derive(clap::Parser, Debug, Clone)]
#[command(name = "flowtx")]
#[command(bin_name = "flowtx")]
#[command(author, version, about, long_about = None)]
pub enum Cli {
    /// Decode an encoded transaction of any generation and print it as JSON
    Decode(DecodeArgs),
    /// Print the identifier of an encoded transaction
    Id(IdArgs),
    /// Print the message a signer of the transaction has to sign
    Message(MessageArgs),
    /// Sign an arbitrary message in the user domain
    SignUserMessage(SignUserMessageArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Hex encoded transaction
    pub transaction: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct IdArgs {
    /// Hex encoded transaction
    pub transaction: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct MessageArgs {
    /// Hex encoded transaction
    pub transaction: String,

    #[clap(short = 'k', long, require_equals = true, value_enum, default_value_t = MessageKind::Payload)]
    /// Which message to print
    pub kind: MessageKind,

    #[clap(short = 't', long)]
    /// Prefix the message with the transaction domain tag, as passed to the signer
    pub domain_tag: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SignUserMessageArgs {
    #[clap(short = 'k', long, require_equals = true)]
    /// Hex encoded private key
    pub key: String,

    #[clap(short = 'a', long, require_equals = true, value_enum)]
    /// Signature algorithm of the key
    pub algorithm: SignatureAlgorithm,

    #[clap(long, require_equals = true, value_enum, default_value_t = HashAlgorithm::Sha3_256)]
    /// Hash algorithm applied before signing
    pub hash: HashAlgorithm,

    /// Message to sign, as UTF-8 text
    pub message: String,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum, PartialEq, Eq)]
pub enum MessageKind {
    /// Signed by the proposer and the authorizers
    Payload,
    /// Signed by the payer
    Envelope,
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Payload => write!(f, "payload"),
            MessageKind::Envelope => write!(f, "envelope"),
        }
    }
}
