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

use std::io::Write;

use anyhow::Context;
use flowtx_primitives::{
    domain::with_domain_tag, sign_user_message, InMemorySigner, Transaction,
    TRANSACTION_DOMAIN_TAG,
};
use log::{debug, info};

use crate::cli::{Cli, MessageKind};

pub mod cli;

/// Parses hex input, with or without a `0x` prefix.
pub fn parse_hex(input: &str) -> anyhow::Result<Vec<u8>> {
    let input = input.trim();
    let input = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(input).context("invalid hex input")
}

fn decode_transaction(input: &str) -> anyhow::Result<Transaction> {
    let bytes = parse_hex(input)?;
    Transaction::decode_bytes(bytes).context("failed to decode transaction")
}

/// Executes a command and writes its result to `out`.
pub fn run(cli: &Cli, out: &mut impl Write) -> anyhow::Result<()> {
    match cli {
        Cli::Decode(args) => {
            let bytes = parse_hex(&args.transaction)?;
            let (tx, shape) = Transaction::decode_with_shape(&bytes)
                .context("failed to decode transaction")?;
            debug!("Decoded {} bytes as {shape:?}", bytes.len());

            let json = serde_json::json!({
                "shape": shape,
                "id": tx.id(),
                "transaction": tx,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        Cli::Id(args) => {
            let tx = decode_transaction(&args.transaction)?;
            writeln!(out, "{}", tx.id())?;
        }
        Cli::Message(args) => {
            let tx = decode_transaction(&args.transaction)?;
            let mut message = match args.kind {
                MessageKind::Payload => tx.payload_message(),
                MessageKind::Envelope => tx.envelope_message(),
            };
            if args.domain_tag {
                message = with_domain_tag(&TRANSACTION_DOMAIN_TAG, &message);
            }
            info!("{} message of transaction {}", args.kind, tx.id());
            writeln!(out, "{}", hex::encode(message))?;
        }
        Cli::SignUserMessage(args) => {
            let key = parse_hex(&args.key).context("invalid private key")?;
            let signer = InMemorySigner::new(args.algorithm, &key, args.hash)?;
            info!(
                "Signing with {} / {} public key {}",
                args.algorithm,
                args.hash,
                hex::encode(signer.public_key().to_bytes())
            );
            let signature = sign_user_message(&signer, args.message.as_bytes())?;
            writeln!(out, "{}", hex::encode(signature))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_prefix() {
        assert_eq!(parse_hex("0x0102").unwrap(), vec![1, 2]);
        assert_eq!(parse_hex(" 0102\n").unwrap(), vec![1, 2]);
        assert!(parse_hex("0x0").is_err());
    }

    #[test]
    fn decode_output() {
        let cli = Cli::Decode(crate::cli::DecodeArgs {
            transaction: include_str!("../testdata/full.hex").trim().to_string(),
        });
        let mut out = Vec::new();
        run(&cli, &mut out).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["shape"], "Full");
        assert_eq!(
            json["id"],
            "0xf2c2612cf662ddc0f9a0a932d9c0f2aa0e31a777366cd0873c562164c111c69c"
        );
    }
}
