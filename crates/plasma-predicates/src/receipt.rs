//! Child-chain receipts and logs.

use plasma_primitives::codec::decode_exact;
use plasma_primitives::{Address, CodecError, H256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// Typed (EIP-2718) payloads start with a byte below the RLP list range
const MAX_TX_TYPE: u8 = 0x7f;

/// Event log: `[address, topics, data]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildLog {
    /// Contract that emitted the log
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

impl Encodable for ChildLog {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.address);
        s.append_list(&self.topics);
        s.append(&self.data);
    }
}

impl Decodable for ChildLog {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 3 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            address: rlp.val_at(0)?,
            topics: rlp.list_at(1)?,
            data: rlp.val_at(2)?,
        })
    }
}

/// Transaction receipt: `[status, cumulative_gas, bloom, logs]`, optionally prefixed
/// by a transaction type byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_type: Option<u8>,
    /// Status code, or the intermediate state root of pre-Byzantium receipts
    pub status: Vec<u8>,
    pub cumulative_gas: u64,
    pub bloom: Vec<u8>,
    pub logs: Vec<ChildLog>,
}

impl Receipt {
    /// Successful receipt carrying `logs`
    pub fn success(cumulative_gas: u64, logs: Vec<ChildLog>) -> Self {
        Self {
            tx_type: None,
            status: vec![1],
            cumulative_gas,
            bloom: vec![0u8; 256],
            logs,
        }
    }

    /// Whether the transaction executed successfully (post-Byzantium status `1`)
    pub fn is_success(&self) -> bool {
        self.status.as_slice() == [1]
    }

    /// Trie value encoding: the type byte (if any) followed by the RLP list
    pub fn encode(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(4);
        stream.append(&self.status);
        stream.append(&self.cumulative_gas);
        stream.append(&self.bloom);
        stream.append_list(&self.logs);

        let mut encoded = Vec::new();
        encoded.extend(self.tx_type);
        encoded.extend_from_slice(&stream.out());
        encoded
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let (tx_type, payload) = match bytes.split_first() {
            Some((&first, rest)) if first <= MAX_TX_TYPE => (Some(first), rest),
            _ => (None, bytes),
        };
        let body: ReceiptBody = decode_exact(payload)?;
        Ok(Self {
            tx_type,
            status: body.status,
            cumulative_gas: body.cumulative_gas,
            bloom: body.bloom,
            logs: body.logs,
        })
    }
}

struct ReceiptBody {
    status: Vec<u8>,
    cumulative_gas: u64,
    bloom: Vec<u8>,
    logs: Vec<ChildLog>,
}

impl Decodable for ReceiptBody {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 4 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            status: rlp.val_at(0)?,
            cumulative_gas: rlp.val_at(1)?,
            bloom: rlp.val_at(2)?,
            logs: rlp.list_at(3)?,
        })
    }
}
