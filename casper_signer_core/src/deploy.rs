// Deploy JSON model
//
// Mirrors the JSON shape produced by the Casper client SDKs
// (`{"deploy": {hash, header, payment, session, approvals}}`). Only the
// shape is validated here; the hashes are taken as given.

use crate::error::{SignerError, SignerResult};
use crate::public_key::PublicKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DIGEST_LEN: usize = 32;
const MAX_U512_BYTES: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deploy {
    pub hash: String,
    pub header: DeployHeader,
    pub payment: ExecutableDeployItem,
    pub session: ExecutableDeployItem,
    #[serde(default)]
    pub approvals: Vec<Approval>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployHeader {
    pub account: PublicKey,
    pub timestamp: DateTime<Utc>,
    pub ttl: String,
    pub gas_price: u64,
    pub body_hash: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub chain_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub signer: PublicKey,
    /// Hex signature bytes prefixed with the signer's algorithm tag.
    pub signature: String,
}

/// A runtime argument, serialized as a `[name, value]` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedArg(pub String, pub CLValue);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CLValue {
    pub cl_type: serde_json::Value,
    /// Hex of the value's serialized bytes.
    pub bytes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutableDeployItem {
    ModuleBytes {
        module_bytes: String,
        args: Vec<NamedArg>,
    },
    StoredContractByHash {
        hash: String,
        entry_point: String,
        args: Vec<NamedArg>,
    },
    StoredContractByName {
        name: String,
        entry_point: String,
        args: Vec<NamedArg>,
    },
    StoredVersionedContractByHash {
        hash: String,
        #[serde(default)]
        version: Option<u32>,
        entry_point: String,
        args: Vec<NamedArg>,
    },
    StoredVersionedContractByName {
        name: String,
        #[serde(default)]
        version: Option<u32>,
        entry_point: String,
        args: Vec<NamedArg>,
    },
    Transfer {
        args: Vec<NamedArg>,
    },
}

impl ExecutableDeployItem {
    pub fn args(&self) -> &[NamedArg] {
        match self {
            ExecutableDeployItem::ModuleBytes { args, .. }
            | ExecutableDeployItem::StoredContractByHash { args, .. }
            | ExecutableDeployItem::StoredContractByName { args, .. }
            | ExecutableDeployItem::StoredVersionedContractByHash { args, .. }
            | ExecutableDeployItem::StoredVersionedContractByName { args, .. }
            | ExecutableDeployItem::Transfer { args } => args,
        }
    }

    pub fn arg(&self, name: &str) -> Option<&CLValue> {
        self.args()
            .iter()
            .find(|NamedArg(arg_name, _)| arg_name == name)
            .map(|NamedArg(_, value)| value)
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, ExecutableDeployItem::Transfer { .. })
    }
}

impl CLValue {
    /// Decode the value bytes as a length-prefixed little-endian U512 and
    /// render it in decimal.
    pub fn to_u512_decimal(&self) -> SignerResult<String> {
        let raw = hex::decode(&self.bytes)
            .map_err(|e| SignerError::ParseFailure(format!("CLValue bytes are not hex: {}", e)))?;
        let (len, digits) = raw
            .split_first()
            .ok_or_else(|| SignerError::ParseFailure("empty U512 bytes".to_string()))?;
        let len = *len as usize;
        if len > MAX_U512_BYTES || digits.len() != len {
            return Err(SignerError::ParseFailure(format!(
                "malformed U512: length prefix {} with {} value bytes",
                len,
                digits.len()
            )));
        }
        Ok(le_bytes_to_decimal(digits))
    }
}

fn le_bytes_to_decimal(bytes: &[u8]) -> String {
    // base-10 digits, least significant first
    let mut digits: Vec<u8> = vec![0];
    for &byte in bytes.iter().rev() {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            let value = (*digit as u32) * 256 + carry;
            *digit = (value % 10) as u8;
            carry = value / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
    }
    digits.iter().rev().map(|d| char::from(b'0' + d)).collect()
}

#[derive(Debug, Serialize, Deserialize)]
struct DeployEnvelope {
    deploy: Deploy,
}

impl Deploy {
    /// Parse the `{"deploy": {...}}` JSON a page submits.
    pub fn from_json(value: &serde_json::Value) -> SignerResult<Self> {
        let envelope: DeployEnvelope = serde_json::from_value(value.clone())
            .map_err(|e| SignerError::ParseFailure(e.to_string()))?;
        let deploy = envelope.deploy;
        check_digest("deploy hash", &deploy.hash)?;
        check_digest("body hash", &deploy.header.body_hash)?;
        if let Some(amount) = deploy.payment.arg("amount") {
            amount.to_u512_decimal()?;
        }
        Ok(deploy)
    }

    pub fn to_json(&self) -> SignerResult<serde_json::Value> {
        Ok(serde_json::to_value(DeployEnvelope {
            deploy: self.clone(),
        })?)
    }

    pub fn hash_bytes(&self) -> SignerResult<Vec<u8>> {
        hex::decode(&self.hash)
            .map_err(|e| SignerError::ParseFailure(format!("deploy hash is not hex: {}", e)))
    }

    pub fn is_transfer(&self) -> bool {
        self.session.is_transfer()
    }
}

fn check_digest(what: &str, value: &str) -> SignerResult<()> {
    let bytes = hex::decode(value)
        .map_err(|e| SignerError::ParseFailure(format!("{} is not hex: {}", what, e)))?;
    if bytes.len() != DIGEST_LEN {
        return Err(SignerError::ParseFailure(format!(
            "{} must be {} bytes, got {}",
            what,
            DIGEST_LEN,
            bytes.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::json;

    pub const DEPLOY_HASH: &str = "a6a1e2d8c3b4f5061728394a5b6c7d8e9f00112233445566778899aabbccddee";
    pub const BODY_HASH: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f00112233445566778899aabbccddeeff0";

    pub fn transfer_json(account_hex: &str) -> serde_json::Value {
        json!({
            "deploy": {
                "hash": DEPLOY_HASH,
                "header": {
                    "account": account_hex,
                    "timestamp": "2021-05-04T15:30:05.123Z",
                    "ttl": "30m",
                    "gas_price": 1,
                    "body_hash": BODY_HASH,
                    "dependencies": [],
                    "chain_name": "casper-test"
                },
                "payment": {
                    "ModuleBytes": {
                        "module_bytes": "",
                        "args": [
                            ["amount", {"cl_type": "U512", "bytes": "0400e1f505", "parsed": "100000000"}]
                        ]
                    }
                },
                "session": {
                    "Transfer": {
                        "args": [
                            ["amount", {"cl_type": "U512", "bytes": "0500f2052a01", "parsed": "5000000000"}],
                            ["target", {"cl_type": {"ByteArray": 32}, "bytes": "11".repeat(32), "parsed": "11".repeat(32)}],
                            ["id", {"cl_type": {"Option": "U64"}, "bytes": "010100000000000000", "parsed": 1}]
                        ]
                    }
                },
                "approvals": []
            }
        })
    }

    pub fn contract_json(account_hex: &str) -> serde_json::Value {
        let mut value = transfer_json(account_hex);
        value["deploy"]["session"] = json!({
            "StoredContractByName": {
                "name": "faucet",
                "entry_point": "call_faucet",
                "args": [
                    ["target", {"cl_type": "PublicKey", "bytes": account_hex, "parsed": account_hex}]
                ]
            }
        });
        value
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    const ACCOUNT: &str = "01aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    #[test]
    fn parses_transfer_deploy() {
        let deploy = Deploy::from_json(&transfer_json(ACCOUNT)).unwrap();
        assert!(deploy.is_transfer());
        assert_eq!(deploy.header.chain_name, "casper-test");
        assert_eq!(deploy.header.account.to_account_hex(), ACCOUNT);
        assert_eq!(deploy.session.args().len(), 3);
        assert!(deploy.approvals.is_empty());
    }

    #[test]
    fn rejects_undecodable_payment_amount() {
        let mut json = transfer_json(ACCOUNT);
        json["deploy"]["payment"]["ModuleBytes"]["args"][0][1]["bytes"] = "zz".into();
        assert!(matches!(Deploy::from_json(&json), Err(SignerError::ParseFailure(_))));

        json["deploy"]["payment"]["ModuleBytes"]["args"][0][1]["bytes"] = "0400e1".into();
        assert!(matches!(Deploy::from_json(&json), Err(SignerError::ParseFailure(_))));
    }

    #[test]
    fn rejects_missing_envelope() {
        let value = transfer_json(ACCOUNT)["deploy"].clone();
        assert!(matches!(Deploy::from_json(&value), Err(SignerError::ParseFailure(_))));
    }

    #[test]
    fn rejects_short_hash() {
        let mut value = transfer_json(ACCOUNT);
        value["deploy"]["hash"] = serde_json::json!("abcd");
        let err = Deploy::from_json(&value).unwrap_err();
        assert!(err.to_string().contains("deploy hash"));
    }

    #[test]
    fn rejects_unknown_account_algorithm() {
        let bad = format!("05{}", "aa".repeat(32));
        assert!(Deploy::from_json(&transfer_json(&bad)).is_err());
    }

    #[test]
    fn json_keeps_envelope() {
        let deploy = Deploy::from_json(&transfer_json(ACCOUNT)).unwrap();
        let value = deploy.to_json().unwrap();
        assert_eq!(value["deploy"]["hash"], DEPLOY_HASH);
        assert!(value["deploy"]["session"]["Transfer"].is_object());
    }

    #[test]
    fn u512_decoding() {
        let cl = |bytes: &str| CLValue {
            cl_type: serde_json::json!("U512"),
            bytes: bytes.to_string(),
            parsed: None,
        };
        assert_eq!(cl("00").to_u512_decimal().unwrap(), "0");
        assert_eq!(cl("0400e1f505").to_u512_decimal().unwrap(), "100000000");
        assert_eq!(cl("0500f2052a01").to_u512_decimal().unwrap(), "5000000000");
        // 2^64
        assert_eq!(
            cl("09000000000000000001").to_u512_decimal().unwrap(),
            "18446744073709551616"
        );
        assert!(cl("0400e1").to_u512_decimal().is_err());
        assert!(cl("zz").to_u512_decimal().is_err());
    }
}
