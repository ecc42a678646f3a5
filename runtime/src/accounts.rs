//! Address-keyed account store.
//!
//! Accounts live in an arena keyed by a 32-byte address. Addresses are
//! derived deterministically from seeds, so an agent's replay record, a
//! proposal or a vote always lands at the same place and a duplicate create
//! is detectable. Records never hold references to each other; relations go
//! through ids and addresses.

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

use warden::auth::{AgentAuthState, AgentIdentity};
use warden::layout::{AccountLayout, LayoutError};

use crate::error::ProgramError;
use crate::state::{GlobalState, PolicyProposal, ReserveVault, VoteRecord};

/// Account address.
pub type Address = [u8; 32];

/// Seed for agent replay records.
pub const AGENT_SEED: &[u8] = b"agent";
/// Seed for the global state record.
pub const GLOBAL_SEED: &[u8] = b"global";
/// Seed for the reserve vault.
pub const VAULT_SEED: &[u8] = b"vault";
/// Seed for proposals.
pub const PROPOSAL_SEED: &[u8] = b"proposal";
/// Seed for vote records.
pub const VOTE_SEED: &[u8] = b"vote";

/// Derive an address from seeds.
///
/// Seeds are length-prefixed before hashing so distinct seed lists never
/// collide by concatenation.
pub fn derive_address(seeds: &[&[u8]]) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(b"warden:address");
    for seed in seeds {
        hasher.update(u64::try_from(seed.len()).unwrap_or(u64::MAX).to_le_bytes());
        hasher.update(seed);
    }
    hasher.finalize().into()
}

/// Address of an agent's replay record.
pub fn agent_address(agent: &AgentIdentity) -> Address {
    derive_address(&[AGENT_SEED, agent])
}

/// Address of the global state record.
pub fn global_address() -> Address {
    derive_address(&[GLOBAL_SEED])
}

/// Address of the reserve vault.
pub fn vault_address() -> Address {
    derive_address(&[VAULT_SEED])
}

/// Address of proposal `id`.
pub fn proposal_address(id: u64) -> Address {
    derive_address(&[PROPOSAL_SEED, &id.to_le_bytes()])
}

/// Address of `agent`'s vote on proposal `id`.
pub fn vote_address(id: u64, agent: &AgentIdentity) -> Address {
    derive_address(&[VOTE_SEED, &id.to_le_bytes(), agent])
}

/// Record type tag, stored next to the encoded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// [`AgentAuthState`].
    Agent,
    /// [`GlobalState`].
    Global,
    /// [`ReserveVault`].
    Vault,
    /// [`PolicyProposal`].
    Proposal,
    /// [`VoteRecord`].
    Vote,
}

impl AccountKind {
    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Global => "global",
            Self::Vault => "vault",
            Self::Proposal => "proposal",
            Self::Vote => "vote",
        }
    }

    /// Parse a storage name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "agent" => Some(Self::Agent),
            "global" => Some(Self::Global),
            "vault" => Some(Self::Vault),
            "proposal" => Some(Self::Proposal),
            "vote" => Some(Self::Vote),
            _ => None,
        }
    }
}

/// A stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Account {
    /// Agent replay record.
    Agent(AgentAuthState),
    /// Global governance settings.
    Global(GlobalState),
    /// Reserve vault.
    Vault(ReserveVault),
    /// Policy proposal.
    Proposal(PolicyProposal),
    /// Vote record.
    Vote(VoteRecord),
}

impl Account {
    /// Type tag of the record.
    pub fn kind(&self) -> AccountKind {
        match self {
            Self::Agent(_) => AccountKind::Agent,
            Self::Global(_) => AccountKind::Global,
            Self::Vault(_) => AccountKind::Vault,
            Self::Proposal(_) => AccountKind::Proposal,
            Self::Vote(_) => AccountKind::Vote,
        }
    }

    /// Encode the record in its fixed layout.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Agent(a) => a.encode(),
            Self::Global(g) => g.encode(),
            Self::Vault(v) => v.encode(),
            Self::Proposal(p) => p.encode(),
            Self::Vote(v) => v.encode(),
        }
    }

    /// Decode a record of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] when `data` is not a valid encoding.
    pub fn decode(kind: AccountKind, data: &[u8]) -> Result<Self, LayoutError> {
        Ok(match kind {
            AccountKind::Agent => Self::Agent(AgentAuthState::decode(data)?),
            AccountKind::Global => Self::Global(GlobalState::decode(data)?),
            AccountKind::Vault => Self::Vault(ReserveVault::decode_any(data)?),
            AccountKind::Proposal => Self::Proposal(PolicyProposal::decode(data)?),
            AccountKind::Vote => Self::Vote(VoteRecord::decode(data)?),
        })
    }
}

/// In-memory account arena.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountStore {
    accounts: BTreeMap<Address, Account>,
}

macro_rules! typed_access {
    ($get:ident, $get_mut:ident, $variant:ident, $ty:ty, $name:literal) => {
        #[doc = concat!("Borrow the ", $name, " at `address`.")]
        ///
        /// # Errors
        ///
        /// Returns [`ProgramError::AccountNotFound`] or
        /// [`ProgramError::WrongAccountType`].
        pub fn $get(&self, address: &Address) -> Result<&$ty, ProgramError> {
            match self.accounts.get(address) {
                Some(Account::$variant(inner)) => Ok(inner),
                Some(_) => Err(wrong_type(address, $name)),
                None => Err(not_found(address)),
            }
        }

        #[doc = concat!("Mutably borrow the ", $name, " at `address`.")]
        ///
        /// # Errors
        ///
        /// Returns [`ProgramError::AccountNotFound`] or
        /// [`ProgramError::WrongAccountType`].
        pub fn $get_mut(&mut self, address: &Address) -> Result<&mut $ty, ProgramError> {
            match self.accounts.get_mut(address) {
                Some(Account::$variant(inner)) => Ok(inner),
                Some(_) => Err(wrong_type(address, $name)),
                None => Err(not_found(address)),
            }
        }
    };
}

impl AccountStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the store holds no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Whether an account lives at `address`.
    pub fn contains(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    /// The account at `address`, if any.
    pub fn get(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Create an account at a fresh address.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramError::AccountExists`] if the address is taken.
    pub fn create(&mut self, address: Address, account: Account) -> Result<(), ProgramError> {
        if self.accounts.contains_key(&address) {
            return Err(ProgramError::AccountExists(hex::encode(address)));
        }
        self.accounts.insert(address, account);
        Ok(())
    }

    /// Insert or replace the account at `address`.
    pub fn put(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    /// Iterate accounts in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.accounts.iter()
    }

    typed_access!(agent, agent_mut, Agent, AgentAuthState, "agent record");
    typed_access!(global, global_mut, Global, GlobalState, "global state");
    typed_access!(vault, vault_mut, Vault, ReserveVault, "reserve vault");
    typed_access!(proposal, proposal_mut, Proposal, PolicyProposal, "proposal");
    typed_access!(vote, vote_mut, Vote, VoteRecord, "vote record");
}

fn not_found(address: &Address) -> ProgramError {
    ProgramError::AccountNotFound(hex::encode(address))
}

fn wrong_type(address: &Address, expected: &'static str) -> ProgramError {
    ProgramError::WrongAccountType {
        address: hex::encode(address),
        expected,
    }
}
