//! EVM execution-harness configuration.
//!
//! The interface this crate's host consumes from the execution harness: the
//! run configuration with its defaulting rules, the chain fork schedule,
//! execution flags, and the deterministic historical-block-hash function.
//! The interpreter, state store, and gas accounting live in the harness
//! itself.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use ethereum_types::{Address, U256};
use keccak_hash::{keccak, H256};
use serde::{Deserialize, Serialize};

/// Fork activation schedule for a chain, by block number. `None` means the
/// fork never activates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub homestead_block: Option<u64>,
    pub eip150_block: Option<u64>,
    pub eip158_block: Option<u64>,
    pub byzantium_block: Option<u64>,
    pub constantinople_block: Option<u64>,
    pub petersburg_block: Option<u64>,
    pub istanbul_block: Option<u64>,
    pub berlin_block: Option<u64>,
    pub london_block: Option<u64>,
}

impl ChainConfig {
    /// Canonical default: chain id 1 with every fork active from genesis.
    pub fn all_forks_at_genesis() -> Self {
        Self {
            chain_id: 1,
            homestead_block: Some(0),
            eip150_block: Some(0),
            eip158_block: Some(0),
            byzantium_block: Some(0),
            constantinople_block: Some(0),
            petersburg_block: Some(0),
            istanbul_block: Some(0),
            berlin_block: Some(0),
            london_block: Some(0),
        }
    }
}

/// Hooks the harness calls while tracing execution.
pub trait Tracer: Send + Sync {
    /// A call frame was entered.
    fn enter(&self, depth: usize, from: Address, to: Address, value: U256);
    /// About to execute one opcode.
    fn step(&self, pc: u64, opcode: u8, gas: u64);
    /// The outermost frame returned.
    fn exit(&self, output: &[u8], gas_used: u64);
}

/// Interpreter flags for one execution.
#[derive(Clone, Default)]
pub struct ExecFlags {
    pub debug: bool,
    pub tracer: Option<Arc<dyn Tracer>>,
    pub no_recursion: bool,
}

impl fmt::Debug for ExecFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecFlags")
            .field("debug", &self.debug)
            .field("tracer", &self.tracer.as_ref().map(|_| "Tracer"))
            .field("no_recursion", &self.no_recursion)
            .finish()
    }
}

/// Historical block-hash lookup handed to the harness.
pub type BlockHashFn = Arc<dyn Fn(u64) -> H256 + Send + Sync>;

/// Keccak-256 of the decimal rendering of the block number. Pure and
/// deterministic, so harness runs are reproducible without a chain.
pub fn default_block_hash(number: u64) -> H256 {
    keccak(number.to_string().as_bytes())
}

/// Configuration for a single harness execution.
///
/// Unset fields are filled by [`set_defaults`](Self::set_defaults);
/// `origin` and `coinbase` default to the zero address by construction.
#[derive(Clone, Default)]
pub struct EvmConfig {
    pub chain_config: Option<ChainConfig>,
    pub difficulty: Option<U256>,
    pub origin: Address,
    pub coinbase: Address,
    pub block_number: Option<U256>,
    /// Block timestamp, seconds since the Unix epoch.
    pub time: Option<u64>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<U256>,
    pub value: Option<U256>,
    pub block_hash: Option<BlockHashFn>,
    pub flags: ExecFlags,
}

impl EvmConfig {
    /// Fill every unset field with its canonical value, leaving
    /// caller-supplied fields untouched. Idempotent.
    pub fn set_defaults(&mut self) {
        if self.chain_config.is_none() {
            self.chain_config = Some(ChainConfig::all_forks_at_genesis());
        }
        if self.difficulty.is_none() {
            self.difficulty = Some(U256::zero());
        }
        if self.block_number.is_none() {
            self.block_number = Some(U256::zero());
        }
        if self.time.is_none() {
            self.time = Some(Utc::now().timestamp() as u64);
        }
        if self.gas_limit.is_none() {
            self.gas_limit = Some(u64::MAX);
        }
        if self.gas_price.is_none() {
            self.gas_price = Some(U256::zero());
        }
        if self.value.is_none() {
            self.value = Some(U256::zero());
        }
        if self.block_hash.is_none() {
            self.block_hash = Some(Arc::new(default_block_hash));
        }
    }
}

impl fmt::Debug for EvmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmConfig")
            .field("chain_config", &self.chain_config)
            .field("difficulty", &self.difficulty)
            .field("origin", &self.origin)
            .field("coinbase", &self.coinbase)
            .field("block_number", &self.block_number)
            .field("time", &self.time)
            .field("gas_limit", &self.gas_limit)
            .field("gas_price", &self.gas_price)
            .field("value", &self.value)
            .field("block_hash", &self.block_hash.as_ref().map(|_| "BlockHashFn"))
            .field("flags", &self.flags)
            .finish()
    }
}
