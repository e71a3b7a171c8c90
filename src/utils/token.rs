use crate::utils::constants::{ChainId, NATIVE, native_symbol};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    chain_id: u64,
    address: Address,
    decimals: u8,
    symbol: Option<String>,
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chain_id.hash(state);
        self.address.hash(state)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }
}

impl Eq for Token {}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.chain_id, self.address).cmp(&(other.chain_id, other.address))
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Token {
    pub fn new(chain_id: u64, address: Address) -> Token {
        Token { chain_id, address, decimals: 18, symbol: None }
    }

    pub fn new_with_data(chain_id: u64, address: Address, symbol: Option<String>, decimals: Option<u8>) -> Token {
        Token { chain_id, address, symbol, decimals: decimals.unwrap_or(18) }
    }

    pub fn native(chain_id: u64) -> Token {
        Token { chain_id, address: NATIVE, decimals: 18, symbol: Some(native_symbol(chain_id).to_string()) }
    }

    // For testing purposes
    pub fn random() -> Token {
        Token::new(ChainId::ETHEREUM, Address::random())
    }

    // For testing purposes
    pub fn repeat_byte(byte: u8) -> Token {
        Token::new(ChainId::ETHEREUM, Address::repeat_byte(byte))
    }

    pub fn get_chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn get_symbol(&self) -> String {
        self.symbol.clone().unwrap_or(self.address.to_string())
    }

    pub fn get_decimals(&self) -> u8 {
        self.decimals
    }

    pub fn get_address(&self) -> Address {
        self.address
    }

    pub fn is_native(&self) -> bool {
        self.address == NATIVE
    }
}
