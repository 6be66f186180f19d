//! Recoverable secp256k1 signatures over 32-byte digests.

use plasma_primitives::{keccak256, Address, H256, U256};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, SecretKey, SECP256K1,
};

use crate::error::SignatureError;

/// Address controlled by a public key: last 20 bytes of the hash of its uncompressed form
pub fn public_key_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    Address::from_slice(&keccak256(&uncompressed[1..]).as_bytes()[12..])
}

/// Address controlled by a secret key
pub fn secret_key_address(secret_key: &SecretKey) -> Address {
    public_key_address(&PublicKey::from_secret_key_global(secret_key))
}

/// Recover the signer of `digest` from `(r, s)` and a recovery id in `{0, 1}`
pub fn recover(digest: &H256, r: &U256, s: &U256, recovery_id: u8) -> Result<Address, SignatureError> {
    let recovery_id = RecoveryId::from_i32(recovery_id as i32)?;
    let mut compact = [0u8; 64];
    r.to_big_endian(&mut compact[..32]);
    s.to_big_endian(&mut compact[32..]);
    let signature = RecoverableSignature::from_compact(&compact, recovery_id)?;

    let message = Message::from_digest(digest.to_fixed_bytes());
    let public_key = SECP256K1.recover_ecdsa(&message, &signature)?;
    Ok(public_key_address(&public_key))
}

/// Recover the signer of `digest` from a 65-byte `r ‖ s ‖ v` signature, `v` in `{0, 1, 27, 28}`
pub fn recover_packed(digest: &H256, signature: &[u8]) -> Result<Address, SignatureError> {
    if signature.len() != 65 {
        return Err(SignatureError::InvalidLength(signature.len()));
    }
    let v = signature[64];
    let recovery_id = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => return Err(SignatureError::InvalidRecoveryValue(v as u64)),
    };
    recover(
        digest,
        &U256::from_big_endian(&signature[..32]),
        &U256::from_big_endian(&signature[32..64]),
        recovery_id,
    )
}

/// Sign `digest`, returning `(r, s, recovery_id)`
pub fn sign(digest: &H256, secret_key: &SecretKey) -> (U256, U256, u8) {
    let message = Message::from_digest(digest.to_fixed_bytes());
    let (recovery_id, compact) = SECP256K1
        .sign_ecdsa_recoverable(&message, secret_key)
        .serialize_compact();
    (
        U256::from_big_endian(&compact[..32]),
        U256::from_big_endian(&compact[32..]),
        recovery_id.to_i32() as u8,
    )
}

/// Sign `digest` into the 65-byte `r ‖ s ‖ v` form with `v` in `{27, 28}`
pub fn sign_packed(digest: &H256, secret_key: &SecretKey) -> Vec<u8> {
    let (r, s, recovery_id) = sign(digest, secret_key);
    let mut packed = vec![0u8; 65];
    r.to_big_endian(&mut packed[..32]);
    s.to_big_endian(&mut packed[32..64]);
    packed[64] = 27 + recovery_id;
    packed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_address() {
        // Private key 1 controls the well-known address 0x7e5f...bdf
        let secret_key = SecretKey::from_slice(&{
            let mut key = [0u8; 32];
            key[31] = 1;
            key
        })
        .unwrap();
        assert_eq!(
            hex::encode(secret_key_address(&secret_key)),
            "7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_sign_recover() {
        let secret_key = SecretKey::from_slice(&[0x42; 32]).unwrap();
        let digest = keccak256(b"order");
        let packed = sign_packed(&digest, &secret_key);
        assert_eq!(
            recover_packed(&digest, &packed).unwrap(),
            secret_key_address(&secret_key)
        );

        let other = keccak256(b"other order");
        assert_ne!(
            recover_packed(&other, &packed).ok(),
            Some(secret_key_address(&secret_key))
        );
    }

    #[test]
    fn test_rejects_malformed_signatures() {
        let digest = keccak256(b"order");
        assert_eq!(
            recover_packed(&digest, &[0u8; 64]),
            Err(SignatureError::InvalidLength(64))
        );
        let mut packed = vec![0u8; 65];
        packed[64] = 29;
        assert_eq!(
            recover_packed(&digest, &packed),
            Err(SignatureError::InvalidRecoveryValue(29))
        );
        packed[64] = 27;
        assert!(matches!(
            recover_packed(&digest, &packed),
            Err(SignatureError::Recovery(_))
        ));
    }
}
