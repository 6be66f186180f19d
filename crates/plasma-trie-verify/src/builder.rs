//! Client-side trie builder producing roots and proofs.
//!
//! Nodes are rebuilt from the sorted key set on every query, which is plenty for the
//! few hundred entries of a child block.

use std::collections::BTreeMap;

use plasma_primitives::{keccak256, H256};
use rlp::RlpStream;

use crate::nibbles::{bytes_to_nibbles, encode_hex_prefix};

/// Root of a trie holding no entries: `keccak256(rlp(""))`
pub const EMPTY_TRIE_ROOT: H256 = H256([
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8, 0x6e,
    0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63, 0xb4, 0x21,
]);

type Entry = (Vec<u8>, Vec<u8>);

/// In-memory Merkle-Patricia-Trie
#[derive(Debug, Clone, Default)]
pub struct MemoryTrie {
    /// Nibble key to stored value
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trie of a block's transactions or receipts, keyed by `rlp(index)`
    pub fn ordered(values: impl IntoIterator<Item = Vec<u8>>) -> Self {
        let mut trie = Self::new();
        for (index, value) in values.into_iter().enumerate() {
            trie.insert(&rlp::encode(&(index as u64)), value);
        }
        trie
    }

    /// Store `value` under the raw key bytes `key`
    pub fn insert(&mut self, key: &[u8], value: Vec<u8>) {
        self.entries.insert(bytes_to_nibbles(key), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn root(&self) -> H256 {
        if self.entries.is_empty() {
            return EMPTY_TRIE_ROOT;
        }
        keccak256(encode_node(&self.sorted(), 0))
    }

    /// Proof nodes for the entry stored under `rlp(index)`
    pub fn proof(&self, index: u64) -> Option<Vec<Vec<u8>>> {
        self.proof_for_key(&rlp::encode(&index))
    }

    /// Proof nodes, root first, for the entry stored under the raw key `key`.
    ///
    /// Nodes shorter than 32 bytes are embedded in their parent and left out.
    pub fn proof_for_key(&self, key: &[u8]) -> Option<Vec<Vec<u8>>> {
        let key = bytes_to_nibbles(key);
        if !self.entries.contains_key(&key) {
            return None;
        }
        let mut proof = Vec::new();
        collect_proof(&self.sorted(), 0, &key, true, &mut proof);
        Some(proof)
    }

    fn sorted(&self) -> Vec<Entry> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Length of the nibble prefix shared by every key past `depth`
fn common_prefix(entries: &[Entry], depth: usize) -> usize {
    let (first, last) = match (entries.first(), entries.last()) {
        (Some(first), Some(last)) => (&first.0[depth..], &last.0[depth..]),
        _ => return 0,
    };
    first.iter().zip(last).take_while(|(a, b)| a == b).count()
}

/// Entries sorted by nibble key, split by the nibble at `depth`.
/// An entry whose key ends at `depth` is returned separately as the branch value.
fn split_branch(entries: &[Entry], depth: usize) -> (Option<&Entry>, [&[Entry]; 16]) {
    let mut value = None;
    let mut groups: [&[Entry]; 16] = [&[]; 16];
    let mut rest = entries;
    if let Some(first) = rest.first() {
        if first.0.len() == depth {
            value = Some(first);
            rest = &rest[1..];
        }
    }
    for (nibble, group) in groups.iter_mut().enumerate() {
        let end = rest
            .iter()
            .position(|(key, _)| key[depth] as usize != nibble)
            .unwrap_or(rest.len());
        *group = &rest[..end];
        rest = &rest[end..];
    }
    (value, groups)
}

fn encode_node(entries: &[Entry], depth: usize) -> Vec<u8> {
    if let [(key, value)] = entries {
        let mut stream = RlpStream::new_list(2);
        stream.append(&encode_hex_prefix(&key[depth..], true));
        stream.append(value);
        return stream.out().to_vec();
    }

    let shared = common_prefix(entries, depth);
    if shared > 0 {
        let first = &entries[0].0;
        let mut stream = RlpStream::new_list(2);
        stream.append(&encode_hex_prefix(&first[depth..depth + shared], false));
        append_child(&mut stream, &encode_node(entries, depth + shared));
        return stream.out().to_vec();
    }

    let (value, groups) = split_branch(entries, depth);
    let mut stream = RlpStream::new_list(17);
    for group in groups {
        if group.is_empty() {
            stream.append_empty_data();
        } else {
            append_child(&mut stream, &encode_node(group, depth + 1));
        }
    }
    match value {
        Some((_, value)) => stream.append(value),
        None => stream.append_empty_data(),
    };
    stream.out().to_vec()
}

/// Embed short child nodes, reference the rest by hash
fn append_child(stream: &mut RlpStream, child: &[u8]) {
    if child.len() < 32 {
        stream.append_raw(child, 1);
    } else {
        stream.append(&keccak256(child));
    }
}

fn collect_proof(entries: &[Entry], depth: usize, key: &[u8], is_root: bool, proof: &mut Vec<Vec<u8>>) {
    let encoded = encode_node(entries, depth);
    if is_root || encoded.len() >= 32 {
        proof.push(encoded);
    }
    if entries.len() == 1 {
        return;
    }

    let shared = common_prefix(entries, depth);
    if shared > 0 {
        collect_proof(entries, depth + shared, key, false, proof);
        return;
    }

    if key.len() == depth {
        return;
    }
    let (_, groups) = split_branch(entries, depth);
    collect_proof(groups[key[depth] as usize], depth + 1, key, false, proof);
}
