//! Child-chain fixtures: signing accounts, blocks with real tries, checkpoints and
//! reference proofs, plus a mapped token set.

use std::cell::Cell;
use std::sync::Arc;

use plasma_header_accumulator::{proof_to_bytes, BlockHeaderLeaf, HeaderAccumulator};
use plasma_primitives::{
    keccak256, Address, CheckpointError, HeaderBlock, MemoryCheckpoints, MemoryTokenMapping,
    ReferenceProof, TransactionProof, H256, U256,
};
use plasma_trie_verify::{key_path, MemoryTrie};
use secp256k1::SecretKey;

use crate::burn::withdraw_calldata;
use crate::facts::{FungibleEvent, NftEvent};
use crate::fungible::TransferCall;
use crate::marketplace::{Order, OrderLeg};
use crate::non_fungible::TransferFromCall;
use crate::predicate::DecodeContext;
use crate::receipt::{ChildLog, Receipt};
use crate::signature::secret_key_address;
use crate::transaction::ChildTransaction;

/// Chain id every fixture transaction is signed for
pub const TEST_CHAIN_ID: u64 = 15_001;

const GENESIS_TIMESTAMP: u64 = 1_600_000_000;
const GAS_PER_TX: u64 = 21_000;

/// Child-chain account with its own nonce sequence
#[derive(Debug)]
pub struct TestAccount {
    pub secret_key: SecretKey,
    pub address: Address,
    nonce: Cell<u64>,
}

impl TestAccount {
    /// Deterministic account derived from `seed` (must be non-zero)
    pub fn new(seed: u8) -> Self {
        let secret_key = SecretKey::from_slice(&[seed; 32]).expect("non-zero seed is a valid key");
        Self {
            address: secret_key_address(&secret_key),
            secret_key,
            nonce: Cell::new(0),
        }
    }

    /// Sign `tx` with the next nonce, returning the encoded signed transaction
    pub fn sign(&self, mut tx: ChildTransaction) -> Vec<u8> {
        let nonce = self.nonce.get();
        self.nonce.set(nonce + 1);
        tx.nonce = U256::from(nonce);
        tx.sign(&self.secret_key, Some(TEST_CHAIN_ID)).encode()
    }
}

/// One transaction of a block and the logs its receipt carries
#[derive(Debug, Clone)]
pub struct BlockEntry {
    pub tx_bytes: Vec<u8>,
    pub logs: Vec<ChildLog>,
    /// Receipt status; a reverted entry gets status `0`
    pub succeeded: bool,
}

impl BlockEntry {
    pub fn new(tx_bytes: Vec<u8>, logs: Vec<ChildLog>) -> Self {
        Self {
            tx_bytes,
            logs,
            succeeded: true,
        }
    }

    /// Same entry with a failed receipt
    pub fn reverted(self) -> Self {
        Self {
            succeeded: false,
            ..self
        }
    }

    /// Empty call of `to` by `account` emitting `logs` single-topic logs
    pub fn plain(account: &TestAccount, to: Address, logs: usize) -> Self {
        let tx_bytes = account.sign(ChildTransaction::call(0, to, Vec::new()));
        let logs = (0..logs)
            .map(|i| ChildLog {
                address: to,
                topics: vec![keccak256((i as u64).to_be_bytes())],
                data: Vec::new(),
            })
            .collect();
        Self::new(tx_bytes, logs)
    }
}

struct BuiltBlock {
    leaf: BlockHeaderLeaf,
    transactions: MemoryTrie,
    receipts: MemoryTrie,
    tx_bytes: Vec<Vec<u8>>,
    receipt_bytes: Vec<Vec<u8>>,
}

struct Checkpoint {
    id: u64,
    accumulator: HeaderAccumulator,
}

/// Child chain under construction, checkpointed in contiguous header blocks
#[derive(Default)]
pub struct ChainBuilder {
    blocks: Vec<BuiltBlock>,
    checkpoints: Vec<Checkpoint>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block holding `entries` in order and return its number
    pub fn push_block(&mut self, entries: Vec<BlockEntry>) -> u64 {
        let number = self.blocks.len() as u64;
        let mut tx_bytes = Vec::with_capacity(entries.len());
        let mut receipt_bytes = Vec::with_capacity(entries.len());
        for (position, entry) in entries.into_iter().enumerate() {
            let gas = GAS_PER_TX * (position as u64 + 1);
            let mut receipt = Receipt::success(gas, entry.logs);
            if !entry.succeeded {
                receipt.status = Vec::new();
            }
            receipt_bytes.push(receipt.encode());
            tx_bytes.push(entry.tx_bytes);
        }

        let transactions = MemoryTrie::ordered(tx_bytes.clone());
        let receipts = MemoryTrie::ordered(receipt_bytes.clone());
        self.blocks.push(BuiltBlock {
            leaf: BlockHeaderLeaf {
                block_number: number,
                timestamp: GENESIS_TIMESTAMP + number,
                tx_root: transactions.root(),
                receipt_root: receipts.root(),
            },
            transactions,
            receipts,
            tx_bytes,
            receipt_bytes,
        });
        number
    }

    /// Commit every block not yet checkpointed as one header block
    pub fn checkpoint(
        &mut self,
        registry: &MemoryCheckpoints,
        created_at: u64,
    ) -> Result<u64, CheckpointError> {
        let start = self
            .checkpoints
            .last()
            .map(|checkpoint| checkpoint.accumulator.end() + 1)
            .unwrap_or_default();
        let end = (self.blocks.len() as u64).saturating_sub(1);
        if start as usize >= self.blocks.len() {
            return Err(CheckpointError::EmptyRange { start, end });
        }

        let leaves: Vec<_> = self.blocks[start as usize..]
            .iter()
            .map(|block| block.leaf)
            .collect();
        let accumulator =
            HeaderAccumulator::from_headers(&leaves).expect("blocks are contiguous");
        let id = registry.submit(HeaderBlock {
            root: accumulator.root(),
            start,
            end,
            created_at,
            proposer: Address::repeat_byte(0x7a),
        })?;
        self.checkpoints.push(Checkpoint { id, accumulator });
        Ok(id)
    }

    /// Reference proof of log `log_index` of transaction `tx_index` in block `block`.
    ///
    /// Panics when the block is not checkpointed yet.
    pub fn reference(
        &self,
        block: u64,
        tx_index: u64,
        log_index: u64,
        with_tx: bool,
    ) -> ReferenceProof {
        let checkpoint = self
            .checkpoints
            .iter()
            .find(|checkpoint| {
                checkpoint.accumulator.start() <= block && block <= checkpoint.accumulator.end()
            })
            .expect("block is checkpointed");
        let (_, siblings) = checkpoint
            .accumulator
            .proof_for_block(block)
            .expect("block is in range");
        let built = &self.blocks[block as usize];
        let position = tx_index as usize;

        let transaction = with_tx.then(|| TransactionProof {
            tx_bytes: built.tx_bytes[position].clone(),
            tx_proof_nodes: built
                .transactions
                .proof(tx_index)
                .expect("transaction exists"),
        });

        ReferenceProof {
            header_block_id: checkpoint.id,
            header_merkle_proof: proof_to_bytes(&siblings),
            block_number: block,
            block_timestamp: built.leaf.timestamp,
            tx_root: built.leaf.tx_root,
            receipt_root: built.leaf.receipt_root,
            branch_path: key_path(tx_index),
            receipt_bytes: built.receipt_bytes[position].clone(),
            receipt_proof_nodes: built.receipts.proof(tx_index).expect("receipt exists"),
            log_index,
            transaction,
        }
    }
}

/// Checkpoint registry and token mapping with two fungible tokens, one
/// non-fungible token and a marketplace
pub struct TestTokens {
    pub checkpoints: Arc<MemoryCheckpoints>,
    pub mapping: Arc<MemoryTokenMapping>,
    pub erc20_root: Address,
    pub erc20_child: Address,
    pub erc20b_root: Address,
    pub erc20b_child: Address,
    pub erc721_root: Address,
    pub erc721_child: Address,
    pub marketplace: Address,
}

impl Default for TestTokens {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTokens {
    pub fn new() -> Self {
        let tokens = Self {
            checkpoints: Arc::new(MemoryCheckpoints::new()),
            mapping: Arc::new(MemoryTokenMapping::new()),
            erc20_root: Address::repeat_byte(0x20),
            erc20_child: Address::repeat_byte(0xc2),
            erc20b_root: Address::repeat_byte(0x21),
            erc20b_child: Address::repeat_byte(0xc3),
            erc721_root: Address::repeat_byte(0x72),
            erc721_child: Address::repeat_byte(0xc7),
            marketplace: Address::repeat_byte(0x3a),
        };
        for (root, child, is_nft) in [
            (tokens.erc20_root, tokens.erc20_child, false),
            (tokens.erc20b_root, tokens.erc20b_child, false),
            (tokens.erc721_root, tokens.erc721_child, true),
        ] {
            tokens
                .mapping
                .map_token(root, child, is_nft)
                .expect("fresh mapping");
        }
        tokens
    }

    pub fn context(&self) -> DecodeContext<'_> {
        DecodeContext {
            checkpoints: self.checkpoints.as_ref(),
            tokens: self.mapping.as_ref(),
            marketplace: self.marketplace,
            chain_id: Some(TEST_CHAIN_ID),
        }
    }

    pub fn erc20_deposit(&self, account: &TestAccount, amount: u64, opening: u64) -> BlockEntry {
        self.deposit(self.erc20_root, self.erc20_child, account, amount, opening)
    }

    pub fn erc20b_deposit(&self, account: &TestAccount, amount: u64, opening: u64) -> BlockEntry {
        self.deposit(self.erc20b_root, self.erc20b_child, account, amount, opening)
    }

    fn deposit(
        &self,
        root_token: Address,
        child_token: Address,
        account: &TestAccount,
        amount: u64,
        opening: u64,
    ) -> BlockEntry {
        let log = FungibleEvent::Deposit {
            root_token,
            user: account.address,
            amount: U256::from(amount),
            opening_balance: U256::from(opening),
            closing_balance: U256::from(opening + amount),
        }
        .to_log(child_token);
        let tx = account.sign(ChildTransaction::call(0, child_token, Vec::new()));
        BlockEntry::new(tx, vec![log])
    }

    /// Signed transfer from `from` to `to` with its balance-carrying log
    pub fn erc20_transfer(
        &self,
        from: &TestAccount,
        to: &TestAccount,
        amount: u64,
        from_opening: u64,
        to_opening: u64,
    ) -> BlockEntry {
        let log = FungibleEvent::Transfer {
            root_token: self.erc20_root,
            from: from.address,
            to: to.address,
            amount: U256::from(amount),
            from_opening: U256::from(from_opening),
            to_opening: U256::from(to_opening),
            from_closing: U256::from(from_opening.saturating_sub(amount)),
            to_closing: U256::from(to_opening + amount),
        }
        .to_log(self.erc20_child);
        BlockEntry::new(from.sign(self.erc20_transfer_tx(to, amount)), vec![log])
    }

    pub fn erc721_deposit(&self, account: &TestAccount, token_id: u64) -> BlockEntry {
        let log = NftEvent::Deposit {
            root_token: self.erc721_root,
            user: account.address,
            token_id: U256::from(token_id),
        }
        .to_log(self.erc721_child);
        let tx = account.sign(ChildTransaction::call(0, self.erc721_child, Vec::new()));
        BlockEntry::new(tx, vec![log])
    }

    pub fn erc721_transfer(&self, from: &TestAccount, to: &TestAccount, token_id: u64) -> BlockEntry {
        let log = NftEvent::Transfer {
            root_token: self.erc721_root,
            from: from.address,
            to: to.address,
            token_id: U256::from(token_id),
        }
        .to_log(self.erc721_child);
        BlockEntry::new(from.sign(self.erc721_transfer_tx(from, to, token_id)), vec![log])
    }

    pub fn erc20_transfer_tx(&self, to: &TestAccount, amount: u64) -> ChildTransaction {
        let call = TransferCall {
            recipient: to.address,
            amount: U256::from(amount),
        };
        ChildTransaction::call(0, self.erc20_child, call.encode())
    }

    pub fn erc20_burn_tx(&self, amount: u64) -> ChildTransaction {
        ChildTransaction::call(0, self.erc20_child, withdraw_calldata(U256::from(amount)))
    }

    pub fn erc721_transfer_tx(
        &self,
        from: &TestAccount,
        to: &TestAccount,
        token_id: u64,
    ) -> ChildTransaction {
        let call = TransferFromCall {
            from: from.address,
            to: to.address,
            token_id: U256::from(token_id),
        };
        ChildTransaction::call(0, self.erc721_child, call.encode())
    }

    pub fn erc721_burn_tx(&self, token_id: u64) -> ChildTransaction {
        ChildTransaction::call(0, self.erc721_child, withdraw_calldata(U256::from(token_id)))
    }

    /// `executeOrder` swapping `maker_amount` of the first fungible token for
    /// `taker_amount` of the second, valid below block `expiration`
    pub fn swap_tx(
        &self,
        maker: &TestAccount,
        maker_amount: u64,
        taker: &TestAccount,
        taker_amount: u64,
        expiration: u64,
    ) -> ChildTransaction {
        let order_id = H256::repeat_byte(0x0d);
        let expiration = U256::from(expiration);
        let order = Order {
            maker_leg: OrderLeg::signed(
                self.erc20_child,
                U256::from(maker_amount),
                self.marketplace,
                order_id,
                expiration,
                &maker.secret_key,
            ),
            taker_leg: OrderLeg::signed(
                self.erc20b_child,
                U256::from(taker_amount),
                self.marketplace,
                order_id,
                expiration,
                &taker.secret_key,
            ),
            order_id,
            expiration,
            taker: taker.address,
        };
        ChildTransaction::call(0, self.marketplace, order.encode())
    }
}
