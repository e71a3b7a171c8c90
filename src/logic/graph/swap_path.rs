use super::swap_path_hash::SwapPathHash;
use crate::logic::pools::PoolWrapper;
use crate::utils::Token;
use eyre::Result;

use sha2::digest::Update;
use sha2::{Digest, Sha256};
use std::fmt::{Debug, Display};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Clone, Debug, Default, Eq)]
pub struct SwapPath {
    // hash of the path, stable across runs
    pub swap_path_hash: SwapPathHash,
    // The tokens of the path e.g. token0 -> token1 -> token2
    pub tokens: Vec<Arc<Token>>,
    // The pools of the path e.g. pool0 -> pool1
    pub pools: Vec<PoolWrapper>,
}

impl Display for SwapPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SwapPath(pools={:?}, tokens={:?})",
            self.pools.iter().map(|p| format!("{:#}", p.get_address())).collect::<Vec<String>>(),
            self.tokens.iter().map(|t| t.get_symbol()).collect::<Vec<String>>()
        )
    }
}

impl SwapPath {
    /// Create a new swap path for a list of tokens and pools
    pub fn new<T: Into<Arc<Token>>, P: Into<PoolWrapper>>(tokens: Vec<T>, pools: Vec<P>) -> Self {
        let pools_vec: Vec<PoolWrapper> = pools.into_iter().map(|p| p.into()).collect();
        let tokens: Vec<Arc<Token>> = tokens.into_iter().map(|i| i.into()).collect();
        let swap_path_hash = generate_swap_path_hash(&tokens, &pools_vec);

        SwapPath { swap_path_hash, tokens, pools: pools_vec }
    }

    /// A path that has not left its start token yet
    pub fn from_token(token: Arc<Token>) -> Self {
        let tokens = vec![token];
        let swap_path_hash = generate_swap_path_hash(&tokens, &[]);
        SwapPath { swap_path_hash, tokens, pools: vec![] }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.pools.is_empty()
    }

    pub fn tokens_count(&self) -> usize {
        self.tokens.len()
    }

    /// Push a new pool hop to the swap path. The caller is responsible for checking that the pool is connected
    pub fn push_swap_hop(&mut self, token_to: Arc<Token>, pool: PoolWrapper) -> Result<&mut Self> {
        if self.is_empty() {
            return Err(eyre::eyre!("Swap path is empty"));
        }

        self.tokens.push(token_to);
        self.pools.push(pool);

        self.swap_path_hash = generate_swap_path_hash(&self.tokens, &self.pools);

        Ok(self)
    }

    pub fn contains_token(&self, token: &Token) -> bool {
        self.tokens.iter().any(|t| t.as_ref() == token)
    }

    /// Hops as (token in, pool, token out)
    pub fn hops(&self) -> impl Iterator<Item = (&Arc<Token>, &PoolWrapper, &Arc<Token>)> {
        self.pools.iter().enumerate().map(|(i, pool)| (&self.tokens[i], pool, &self.tokens[i + 1]))
    }

    /// The hop count of the swap path
    pub fn len(&self) -> usize {
        self.pools.len()
    }
}

impl Hash for SwapPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tokens.hash(state);
        self.pools.hash(state);
    }
}

impl PartialEq for SwapPath {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens && self.pools == other.pools
    }
}

/// Hash all the addresses of the tokens and pools in the path to a sha256 hash.
/// To have a stable reproducible hash and to make it easy to use in other languages.
pub fn generate_swap_path_hash(tokens: &[Arc<Token>], pools: &[PoolWrapper]) -> SwapPathHash {
    let mut hasher = Sha256::new();

    for token in tokens.iter() {
        Update::update(&mut hasher, token.get_address().as_slice());
    }
    for pool in pools.iter() {
        Update::update(&mut hasher, pool.get_address().as_slice());
    }

    let hash_slice: [u8; 32] = hasher.finalize().into();
    SwapPathHash::from(hash_slice)
}
