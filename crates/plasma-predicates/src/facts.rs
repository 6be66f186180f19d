//! Balance and ownership facts carried by child token logs.
//!
//! Fungible child tokens log `Deposit`, `Withdraw` and `LogTransfer` events with the
//! participants' opening and closing balances; non-fungible ones log the same events
//! with the moved token id. Topic 1 is always the root token, the remaining indexed
//! topics are the participants.

use plasma_primitives::abi::{encode, AbiReader, AbiToken};
use plasma_primitives::hash::{address_to_word, word_to_address};
use plasma_primitives::{event_signature, Address, H256, U256};

use crate::error::PredicateError;
use crate::receipt::ChildLog;

pub const FUNGIBLE_DEPOSIT: &str = "Deposit(address,address,uint256,uint256,uint256)";
pub const FUNGIBLE_WITHDRAW: &str = "Withdraw(address,address,uint256,uint256,uint256)";
pub const FUNGIBLE_TRANSFER: &str =
    "LogTransfer(address,address,address,uint256,uint256,uint256,uint256,uint256)";

pub const NFT_DEPOSIT: &str = "Deposit(address,address,uint256)";
pub const NFT_WITHDRAW: &str = "Withdraw(address,address,uint256)";
pub const NFT_TRANSFER: &str = "LogTransfer(address,address,address,uint256)";

/// Log of a fungible child token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FungibleEvent {
    Deposit {
        root_token: Address,
        user: Address,
        amount: U256,
        opening_balance: U256,
        closing_balance: U256,
    },
    Withdraw {
        root_token: Address,
        user: Address,
        amount: U256,
        opening_balance: U256,
        closing_balance: U256,
    },
    Transfer {
        root_token: Address,
        from: Address,
        to: Address,
        amount: U256,
        from_opening: U256,
        to_opening: U256,
        from_closing: U256,
        to_closing: U256,
    },
}

impl FungibleEvent {
    pub fn decode(log: &ChildLog) -> Result<Self, PredicateError> {
        let signature = *log
            .topics
            .first()
            .ok_or(PredicateError::MalformedLog("fungible"))?;
        let data = AbiReader::new(&log.data);

        if signature == event_signature(FUNGIBLE_DEPOSIT)
            || signature == event_signature(FUNGIBLE_WITHDRAW)
        {
            let [root_token, user] = indexed::<2>(log, "fungible balance")?;
            let (amount, opening_balance, closing_balance) =
                (data.uint(0)?, data.uint(1)?, data.uint(2)?);
            return Ok(if signature == event_signature(FUNGIBLE_DEPOSIT) {
                Self::Deposit {
                    root_token,
                    user,
                    amount,
                    opening_balance,
                    closing_balance,
                }
            } else {
                Self::Withdraw {
                    root_token,
                    user,
                    amount,
                    opening_balance,
                    closing_balance,
                }
            });
        }

        if signature == event_signature(FUNGIBLE_TRANSFER) {
            let [root_token, from, to] = indexed::<3>(log, "fungible transfer")?;
            return Ok(Self::Transfer {
                root_token,
                from,
                to,
                amount: data.uint(0)?,
                from_opening: data.uint(1)?,
                to_opening: data.uint(2)?,
                from_closing: data.uint(3)?,
                to_closing: data.uint(4)?,
            });
        }

        Err(PredicateError::UnexpectedEvent(signature))
    }

    /// Log emitted by `child_token` for this event
    pub fn to_log(&self, child_token: Address) -> ChildLog {
        let (signature, participants, words) = match *self {
            Self::Deposit {
                root_token,
                user,
                amount,
                opening_balance,
                closing_balance,
            } => (
                FUNGIBLE_DEPOSIT,
                vec![root_token, user],
                vec![amount, opening_balance, closing_balance],
            ),
            Self::Withdraw {
                root_token,
                user,
                amount,
                opening_balance,
                closing_balance,
            } => (
                FUNGIBLE_WITHDRAW,
                vec![root_token, user],
                vec![amount, opening_balance, closing_balance],
            ),
            Self::Transfer {
                root_token,
                from,
                to,
                amount,
                from_opening,
                to_opening,
                from_closing,
                to_closing,
            } => (
                FUNGIBLE_TRANSFER,
                vec![root_token, from, to],
                vec![amount, from_opening, to_opening, from_closing, to_closing],
            ),
        };
        build_log(child_token, signature, &participants, &words)
    }

    pub fn root_token(&self) -> Address {
        match self {
            Self::Deposit { root_token, .. }
            | Self::Withdraw { root_token, .. }
            | Self::Transfer { root_token, .. } => *root_token,
        }
    }

    /// Balance of `participant` right after the event, if the event concerns them
    pub fn closing_balance(&self, participant: &Address) -> Option<U256> {
        match self {
            Self::Deposit {
                user,
                closing_balance,
                ..
            }
            | Self::Withdraw {
                user,
                closing_balance,
                ..
            } => (user == participant).then_some(*closing_balance),
            Self::Transfer {
                from,
                to,
                from_closing,
                to_closing,
                ..
            } => {
                if from == participant {
                    Some(*from_closing)
                } else if to == participant {
                    Some(*to_closing)
                } else {
                    None
                }
            }
        }
    }

    /// Participant whose balance the event primarily records
    pub fn participant(&self) -> Address {
        match self {
            Self::Deposit { user, .. } | Self::Withdraw { user, .. } => *user,
            Self::Transfer { from, .. } => *from,
        }
    }
}

/// Log of a non-fungible child token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NftEvent {
    Deposit {
        root_token: Address,
        user: Address,
        token_id: U256,
    },
    Withdraw {
        root_token: Address,
        user: Address,
        token_id: U256,
    },
    Transfer {
        root_token: Address,
        from: Address,
        to: Address,
        token_id: U256,
    },
}

impl NftEvent {
    pub fn decode(log: &ChildLog) -> Result<Self, PredicateError> {
        let signature = *log
            .topics
            .first()
            .ok_or(PredicateError::MalformedLog("non-fungible"))?;
        let token_id = || AbiReader::new(&log.data).uint(0);

        if signature == event_signature(NFT_DEPOSIT) {
            let [root_token, user] = indexed::<2>(log, "non-fungible deposit")?;
            return Ok(Self::Deposit {
                root_token,
                user,
                token_id: token_id()?,
            });
        }
        if signature == event_signature(NFT_WITHDRAW) {
            let [root_token, user] = indexed::<2>(log, "non-fungible withdraw")?;
            return Ok(Self::Withdraw {
                root_token,
                user,
                token_id: token_id()?,
            });
        }
        if signature == event_signature(NFT_TRANSFER) {
            let [root_token, from, to] = indexed::<3>(log, "non-fungible transfer")?;
            return Ok(Self::Transfer {
                root_token,
                from,
                to,
                token_id: token_id()?,
            });
        }

        Err(PredicateError::UnexpectedEvent(signature))
    }

    pub fn to_log(&self, child_token: Address) -> ChildLog {
        let (signature, participants, token_id) = match *self {
            Self::Deposit {
                root_token,
                user,
                token_id,
            } => (NFT_DEPOSIT, vec![root_token, user], token_id),
            Self::Withdraw {
                root_token,
                user,
                token_id,
            } => (NFT_WITHDRAW, vec![root_token, user], token_id),
            Self::Transfer {
                root_token,
                from,
                to,
                token_id,
            } => (NFT_TRANSFER, vec![root_token, from, to], token_id),
        };
        build_log(child_token, signature, &participants, &[token_id])
    }

    pub fn root_token(&self) -> Address {
        match self {
            Self::Deposit { root_token, .. }
            | Self::Withdraw { root_token, .. }
            | Self::Transfer { root_token, .. } => *root_token,
        }
    }

    pub fn token_id(&self) -> U256 {
        match self {
            Self::Deposit { token_id, .. }
            | Self::Withdraw { token_id, .. }
            | Self::Transfer { token_id, .. } => *token_id,
        }
    }

    /// Owner of the token right after the event; `None` once withdrawn
    pub fn owner_after(&self) -> Option<Address> {
        match self {
            Self::Deposit { user, .. } => Some(*user),
            Self::Transfer { to, .. } => Some(*to),
            Self::Withdraw { .. } => None,
        }
    }
}

/// Indexed address topics following the event signature
fn indexed<const N: usize>(log: &ChildLog, event: &'static str) -> Result<[Address; N], PredicateError> {
    if log.topics.len() != N + 1 {
        return Err(PredicateError::MalformedLog(event));
    }
    let mut addresses = [Address::zero(); N];
    for (address, topic) in addresses.iter_mut().zip(&log.topics[1..]) {
        if topic.as_bytes()[..12].iter().any(|b| *b != 0) {
            return Err(PredicateError::MalformedLog(event));
        }
        *address = word_to_address(topic);
    }
    Ok(addresses)
}

fn build_log(child_token: Address, signature: &str, participants: &[Address], words: &[U256]) -> ChildLog {
    let mut topics: Vec<H256> = vec![event_signature(signature)];
    topics.extend(participants.iter().map(address_to_word));
    let words: Vec<AbiToken> = words.iter().map(|w| AbiToken::Uint(*w)).collect();
    ChildLog {
        address: child_token,
        topics,
        data: encode(&words),
    }
}
