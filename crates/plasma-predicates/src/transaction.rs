//! Signed child-chain transactions (legacy and EIP-155 RLP form).

use plasma_primitives::codec::decode_exact;
use plasma_primitives::{keccak256, Address, CodecError, H256, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use secp256k1::SecretKey;

use crate::error::SignatureError;
use crate::signature;

/// Unsigned transaction fields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChildTransaction {
    pub nonce: U256,
    pub gas_price: U256,
    pub gas: U256,
    /// Called contract, `None` for contract creation
    pub to: Option<Address>,
    pub value: U256,
    /// Calldata
    pub data: Vec<u8>,
}

impl ChildTransaction {
    /// Call of `to` with `data` and default gas fields
    pub fn call(nonce: u64, to: Address, data: Vec<u8>) -> Self {
        Self {
            nonce: U256::from(nonce),
            gas_price: U256::from(1_000_000_000u64),
            gas: U256::from(100_000u64),
            to: Some(to),
            value: U256::zero(),
            data,
        }
    }

    fn append_fields(&self, s: &mut RlpStream) {
        s.append(&self.nonce);
        s.append(&self.gas_price);
        s.append(&self.gas);
        match &self.to {
            Some(to) => s.append(to),
            None => s.append_empty_data(),
        };
        s.append(&self.value);
        s.append(&self.data);
    }

    /// Digest signed by the sender; EIP-155 when `chain_id` is set
    pub fn signing_hash(&self, chain_id: Option<u64>) -> H256 {
        let mut stream = RlpStream::new_list(if chain_id.is_some() { 9 } else { 6 });
        self.append_fields(&mut stream);
        if let Some(chain_id) = chain_id {
            stream.append(&chain_id);
            stream.append_empty_data();
            stream.append_empty_data();
        }
        keccak256(stream.out())
    }

    /// Sign with `secret_key`, replay-protected for `chain_id` when set
    pub fn sign(self, secret_key: &SecretKey, chain_id: Option<u64>) -> SignedTransaction {
        let (r, s, recovery_id) = signature::sign(&self.signing_hash(chain_id), secret_key);
        let v = match chain_id {
            Some(chain_id) => chain_id * 2 + 35 + recovery_id as u64,
            None => 27 + recovery_id as u64,
        };
        SignedTransaction {
            transaction: self,
            v,
            r,
            s,
        }
    }
}

/// Transaction with its `(v, r, s)` signature: `[nonce, gas_price, gas, to, value, data, v, r, s]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: ChildTransaction,
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

impl SignedTransaction {
    pub fn encode(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        decode_exact(bytes)
    }

    /// Chain id committed by an EIP-155 `v`, `None` for pre-EIP-155 signatures
    pub fn chain_id(&self) -> Option<u64> {
        if self.v >= 35 {
            Some((self.v - 35) / 2)
        } else {
            None
        }
    }

    /// Recover the sender from the signature
    pub fn recover_signer(&self) -> Result<Address, SignatureError> {
        let chain_id = self.chain_id();
        let recovery_id = match chain_id {
            Some(chain_id) => self.v - 35 - chain_id * 2,
            None if self.v == 27 || self.v == 28 => self.v - 27,
            None => return Err(SignatureError::InvalidRecoveryValue(self.v)),
        };
        signature::recover(
            &self.transaction.signing_hash(chain_id),
            &self.r,
            &self.s,
            recovery_id as u8,
        )
    }
}

impl Encodable for SignedTransaction {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(9);
        self.transaction.append_fields(s);
        s.append(&self.v);
        s.append(&self.r);
        s.append(&self.s);
    }
}

impl Decodable for SignedTransaction {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 9 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let to = rlp.at(3)?;
        let to = if to.is_empty() { None } else { Some(to.as_val()?) };
        Ok(Self {
            transaction: ChildTransaction {
                nonce: rlp.val_at(0)?,
                gas_price: rlp.val_at(1)?,
                gas: rlp.val_at(2)?,
                to,
                value: rlp.val_at(4)?,
                data: rlp.val_at(5)?,
            },
            v: rlp.val_at(6)?,
            r: rlp.val_at(7)?,
            s: rlp.val_at(8)?,
        })
    }
}

/// An exit or challenge transaction with its recovered signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedExitTx {
    pub transaction: SignedTransaction,
    /// Sender recovered from the signature
    pub signer: Address,
    /// Hash of the submitted bytes
    pub hash: H256,
}

impl SignedExitTx {
    /// Decode `bytes` and recover the signer, enforcing `chain_id` when configured
    pub fn parse(bytes: &[u8], chain_id: Option<u64>) -> Result<Self, crate::PredicateError> {
        let transaction = SignedTransaction::decode(bytes)?;
        if let Some(expected) = chain_id {
            if transaction.chain_id() != Some(expected) {
                return Err(SignatureError::ChainIdMismatch {
                    expected,
                    found: transaction.chain_id(),
                }
                .into());
            }
        }
        let signer = transaction.recover_signer()?;
        Ok(Self {
            transaction,
            signer,
            hash: keccak256(bytes),
        })
    }

    pub fn to(&self) -> Option<Address> {
        self.transaction.transaction.to
    }

    pub fn data(&self) -> &[u8] {
        &self.transaction.transaction.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::secret_key_address;

    fn secret_key() -> SecretKey {
        SecretKey::from_slice(&[0x11; 32]).unwrap()
    }

    #[test]
    fn test_eip155_roundtrip_and_recovery() {
        let tx = ChildTransaction::call(3, Address::repeat_byte(0xaa), vec![1, 2, 3]);
        let signed = tx.sign(&secret_key(), Some(137));
        assert!(signed.v == 309 || signed.v == 310);
        assert_eq!(signed.chain_id(), Some(137));

        let bytes = signed.encode();
        let parsed = SignedExitTx::parse(&bytes, Some(137)).unwrap();
        assert_eq!(parsed.signer, secret_key_address(&secret_key()));
        assert_eq!(parsed.hash, keccak256(&bytes));
        assert_eq!(parsed.to(), Some(Address::repeat_byte(0xaa)));
        assert_eq!(parsed.data(), &[1, 2, 3]);
    }

    #[test]
    fn test_legacy_signature() {
        let signed =
            ChildTransaction::call(0, Address::repeat_byte(1), vec![]).sign(&secret_key(), None);
        assert!(signed.v == 27 || signed.v == 28);
        assert_eq!(
            signed.recover_signer().unwrap(),
            secret_key_address(&secret_key())
        );
        assert!(SignedExitTx::parse(&signed.encode(), None).is_ok());
    }

    #[test]
    fn test_chain_id_is_enforced() {
        let signed =
            ChildTransaction::call(0, Address::repeat_byte(1), vec![]).sign(&secret_key(), Some(1));
        assert!(matches!(
            SignedExitTx::parse(&signed.encode(), Some(137)),
            Err(crate::PredicateError::Signature(SignatureError::ChainIdMismatch {
                expected: 137,
                found: Some(1)
            }))
        ));
    }

    #[test]
    fn test_tampering_changes_signer() {
        let mut signed =
            ChildTransaction::call(0, Address::repeat_byte(1), vec![9]).sign(&secret_key(), Some(5));
        signed.transaction.data = vec![8];
        let recovered = signed.recover_signer().ok();
        assert_ne!(recovered, Some(secret_key_address(&secret_key())));
    }

    #[test]
    fn test_contract_creation_roundtrip() {
        let tx = ChildTransaction {
            to: None,
            ..ChildTransaction::call(0, Address::zero(), vec![0x60])
        };
        let signed = tx.sign(&secret_key(), None);
        let decoded = SignedTransaction::decode(&signed.encode()).unwrap();
        assert_eq!(decoded.transaction.to, None);
        assert_eq!(decoded, signed);
    }
}
