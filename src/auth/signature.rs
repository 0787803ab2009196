// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! Wallet signature verification.
//!
//! Two signature schemes, dispatched on the address format:
//!
//! - `0x`-prefixed addresses: EIP-191 personal-sign ECDSA over secp256k1.
//!   The signer address is recovered from the 65-byte signature and compared
//!   to the claimed address.
//! - anything else: Ed25519 with a base58 public key as the address and a
//!   base58 signature (Solana wallet convention). Verification is direct, no
//!   recovery.
//!
//! Verification is fail-closed: any decode or parse error is reported as an
//! invalid signature.

use alloy::primitives::keccak256;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use ring::signature::{UnparsedPublicKey, ED25519};

use super::error::AuthError;

/// The exact byte string the wallet signs. Field order is fixed; both sides
/// build it with string formatting rather than JSON serialization so the
/// bytes match independent of serializer quirks.
pub fn canonical_login_message(address: &str, timestamp: i64) -> String {
    format!(r#"{{"address":"{address}","timestamp":{timestamp}}}"#)
}

/// Verify that `signature` over `message` was produced by the wallet that
/// `address` names.
pub fn verify_signature(address: &str, message: &str, signature: &str) -> Result<(), AuthError> {
    if address.starts_with("0x") || address.starts_with("0X") {
        verify_evm(address, message, signature)
    } else {
        verify_ed25519(address, message, signature)
    }
}

fn verify_evm(address: &str, message: &str, signature: &str) -> Result<(), AuthError> {
    let sig_hex = signature.strip_prefix("0x").unwrap_or(signature);
    let sig_bytes = hex::decode(sig_hex).map_err(|_| AuthError::InvalidSignature)?;
    let recovered = recover_evm_address(message.as_bytes(), &sig_bytes)?;

    if recovered.eq_ignore_ascii_case(address) {
        Ok(())
    } else {
        Err(AuthError::InvalidSignature)
    }
}

/// Recover the `0x` address from a 65-byte `r || s || v` personal-sign
/// signature.
fn recover_evm_address(message: &[u8], signature: &[u8]) -> Result<String, AuthError> {
    if signature.len() != 65 {
        return Err(AuthError::InvalidSignature);
    }

    let sig = Signature::from_slice(&signature[..64]).map_err(|_| AuthError::InvalidSignature)?;

    // Wallets emit v as 27/28; the recovery id is 0/1.
    let mut v = signature[64];
    if v >= 27 {
        v -= 27;
    }
    let recovery_id = RecoveryId::from_byte(v).ok_or(AuthError::InvalidSignature)?;

    let digest = eip191_digest(message);
    let verifying_key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id)
        .map_err(|_| AuthError::InvalidSignature)?;

    Ok(address_from_key(&verifying_key))
}

/// keccak256("\x19Ethereum Signed Message:\n" + len(message) + message)
fn eip191_digest(message: &[u8]) -> alloy::primitives::B256 {
    let mut prefixed =
        Vec::with_capacity(26 + message.len() + 20);
    prefixed.extend_from_slice(b"\x19Ethereum Signed Message:\n");
    prefixed.extend_from_slice(message.len().to_string().as_bytes());
    prefixed.extend_from_slice(message);
    keccak256(&prefixed)
}

/// Lowercase hex address from an uncompressed public key.
fn address_from_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 tag byte; the address is the last 20 bytes of the hash.
    let hash = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

fn verify_ed25519(address: &str, message: &str, signature: &str) -> Result<(), AuthError> {
    let public_key = bs58::decode(address)
        .into_vec()
        .map_err(|_| AuthError::InvalidSignature)?;
    // Base58 is the wallet convention, but some clients send hex.
    let sig_bytes = match bs58::decode(signature).into_vec() {
        Ok(bytes) => bytes,
        Err(_) => hex::decode(signature.strip_prefix("0x").unwrap_or(signature))
            .map_err(|_| AuthError::InvalidSignature)?,
    };

    if public_key.len() != 32 || sig_bytes.len() != 64 {
        return Err(AuthError::InvalidSignature);
    }

    UnparsedPublicKey::new(&ED25519, &public_key)
        .verify(message.as_bytes(), &sig_bytes)
        .map_err(|_| AuthError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;
    use ring::rand::SystemRandom;
    use ring::signature::{Ed25519KeyPair, KeyPair};

    fn evm_wallet() -> (SigningKey, String) {
        let key = SigningKey::from_slice(&[0x42u8; 32]).unwrap();
        let address = address_from_key(key.verifying_key());
        (key, address)
    }

    fn evm_sign(key: &SigningKey, message: &str) -> String {
        let digest = eip191_digest(message.as_bytes());
        let (sig, recovery_id) = key.sign_prehash_recoverable(digest.as_slice()).unwrap();
        let mut bytes = sig.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        format!("0x{}", hex::encode(bytes))
    }

    #[test]
    fn canonical_message_shape() {
        assert_eq!(
            canonical_login_message("0xabc", 1700000000),
            r#"{"address":"0xabc","timestamp":1700000000}"#
        );
    }

    #[test]
    fn evm_signature_verifies_for_signing_wallet() {
        let (key, address) = evm_wallet();
        let message = canonical_login_message(&address, 1700000000);
        let signature = evm_sign(&key, &message);

        verify_signature(&address, &message, &signature).unwrap();
        // Address casing does not matter.
        verify_signature(&address.to_uppercase().replace("0X", "0x"), &message, &signature)
            .unwrap();
    }

    #[test]
    fn evm_signature_rejected_for_other_wallet() {
        let (key, _) = evm_wallet();
        let other = address_from_key(SigningKey::from_slice(&[0x43u8; 32]).unwrap().verifying_key());
        let message = canonical_login_message(&other, 1700000000);
        let signature = evm_sign(&key, &message);

        assert!(matches!(
            verify_signature(&other, &message, &signature),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn tampered_evm_signature_rejected() {
        let (key, address) = evm_wallet();
        let message = canonical_login_message(&address, 1700000000);
        let signature = evm_sign(&key, &message);

        let mut bytes = hex::decode(signature.strip_prefix("0x").unwrap()).unwrap();
        bytes[10] ^= 0x01;
        let tampered = format!("0x{}", hex::encode(bytes));

        assert!(verify_signature(&address, &message, &tampered).is_err());
    }

    #[test]
    fn malformed_evm_signature_rejected() {
        let (_, address) = evm_wallet();
        assert!(verify_signature(&address, "msg", "0x1234").is_err());
        assert!(verify_signature(&address, "msg", "not-hex").is_err());
    }

    #[test]
    fn ed25519_signature_verifies() {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let keypair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();

        let address = bs58::encode(keypair.public_key().as_ref()).into_string();
        let message = canonical_login_message(&address, 1700000000);
        let signature = bs58::encode(keypair.sign(message.as_bytes()).as_ref()).into_string();

        verify_signature(&address, &message, &signature).unwrap();
        // Different message must fail.
        assert!(verify_signature(&address, "other message", &signature).is_err());

        // A single flipped byte must fail.
        let mut sig_bytes = bs58::decode(&signature).into_vec().unwrap();
        sig_bytes[5] ^= 0x01;
        let tampered = bs58::encode(sig_bytes).into_string();
        assert!(verify_signature(&address, &message, &tampered).is_err());
    }

    #[test]
    fn ed25519_garbage_rejected() {
        assert!(verify_signature("notbase58!!!", "msg", "sig").is_err());
        // Valid base58 but wrong lengths.
        let short = bs58::encode(&[1u8; 16]).into_string();
        assert!(verify_signature(&short, "msg", &short).is_err());
    }
}
