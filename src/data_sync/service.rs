use crate::data_sync::{
    block::BlockHeader,
    config::DataSyncConfig,
    fetcher::PoolDataFetcher,
    registry::{PoolRegistry, TokenPairKey},
};
use crate::utils::Token;
use dashmap::DashMap;
use eyre::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// Counters of the refresh task
#[derive(Debug, Default)]
pub struct SyncStats {
    pub blocks_processed: AtomicU64,
    pub pairs_refreshed: AtomicU64,
    pub refresh_failures: AtomicU64,
    pub last_block: AtomicU64,
}

/// Plain copy of [`SyncStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatsSnapshot {
    pub blocks_processed: u64,
    pub pairs_refreshed: u64,
    pub refresh_failures: u64,
    pub last_block: u64,
}

impl SyncStats {
    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            blocks_processed: self.blocks_processed.load(Ordering::Relaxed),
            pairs_refreshed: self.pairs_refreshed.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
            last_block: self.last_block.load(Ordering::Relaxed),
        }
    }
}

/// Keeps the pool registry current.
///
/// Every block header pushed into [`DataSyncService::block_sender`] triggers a refresh of all watched pairs.
/// Refreshes run concurrently, bounded by `max_concurrent_refreshes`, and each publishes its pair on its own,
/// so a slow pair never holds back readers of the others.
pub struct DataSyncService {
    config: DataSyncConfig,
    registry: Arc<PoolRegistry>,
    watched: Arc<DashMap<TokenPairKey, (Token, Token)>>,
    stats: Arc<SyncStats>,

    block_tx: mpsc::Sender<BlockHeader>,
    block_rx: Option<mpsc::Receiver<BlockHeader>>,

    refresh_task: Option<JoinHandle<()>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl DataSyncService {
    pub fn new(config: DataSyncConfig, registry: Arc<PoolRegistry>) -> Self {
        info!("Initializing DataSyncService chain_id={}", registry.chain_id());
        let (block_tx, block_rx) = mpsc::channel(config.channel_buffer_size.max(1));
        Self {
            config,
            registry,
            watched: Arc::new(DashMap::new()),
            stats: Arc::new(SyncStats::default()),
            block_tx,
            block_rx: Some(block_rx),
            refresh_task: None,
            shutdown_tx: None,
        }
    }

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }

    pub fn get_config(&self) -> &DataSyncConfig {
        &self.config
    }

    pub fn stats(&self) -> SyncStatsSnapshot {
        self.stats.snapshot()
    }

    /// Sender for new block headers, e.g. fed by a newHeads subscription
    pub fn block_sender(&self) -> mpsc::Sender<BlockHeader> {
        self.block_tx.clone()
    }

    /// Refresh this pair on every block. Returns `false` if it was already watched.
    pub fn watch_pair(&self, token_a: Token, token_b: Token) -> bool {
        let key = TokenPairKey::new(token_a.get_address(), token_b.get_address());
        self.watched.insert(key, (token_a, token_b)).is_none()
    }

    pub fn unwatch_pair(&self, token_a: &Token, token_b: &Token) -> bool {
        self.watched.remove(&TokenPairKey::new(token_a.get_address(), token_b.get_address())).is_some()
    }

    /// Watch every pair a search between the two tokens would read
    pub fn watch_search(&self, token_in: &Token, token_out: &Token) -> usize {
        let tokens = self.registry.search_tokens(token_in, token_out);
        let mut added = 0;
        for (i, token_a) in tokens.iter().enumerate() {
            for token_b in tokens.iter().skip(i + 1) {
                if self.watch_pair(token_a.clone(), token_b.clone()) {
                    added += 1;
                }
            }
        }
        added
    }

    pub fn watched_pairs(&self) -> usize {
        self.watched.len()
    }

    /// Start the refresh task
    pub fn start(&mut self) -> Result<()> {
        let block_rx = self.block_rx.take().ok_or_else(|| eyre::eyre!("DataSyncService already started"))?;
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        self.shutdown_tx = Some(shutdown_tx);
        self.refresh_task = Some(self.start_refresh_task(block_rx, shutdown_rx));
        info!("DataSyncService started watched_pairs={}", self.watched.len());
        Ok(())
    }

    /// Stop the refresh task and wait for it to finish the block in progress
    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping DataSyncService");

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(()).await;
        }

        if let Some(refresh_task) = self.refresh_task.take() {
            if let Err(e) = refresh_task.await {
                warn!("Refresh task error during shutdown: {}", e);
            }
        }

        info!("DataSyncService stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.refresh_task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn start_refresh_task(&self, mut block_rx: mpsc::Receiver<BlockHeader>, mut shutdown_rx: mpsc::Receiver<()>) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let watched = Arc::clone(&self.watched);
        let stats = Arc::clone(&self.stats);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_refreshes.max(1)));
        let refresh_timeout = self.config.refresh_timeout();

        tokio::spawn(async move {
            info!("Refresh task started");

            loop {
                let block_header = tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    header = block_rx.recv() => match header {
                        Some(header) => header,
                        None => break,
                    },
                };

                let block_number = match block_header.block_number() {
                    Ok(block_number) => block_number,
                    Err(e) => {
                        error!("Skipping block header: {}", e);
                        continue;
                    }
                };
                debug!("Processing new block: {}", block_number);

                let pairs: Vec<(Token, Token)> = watched.iter().map(|entry| entry.value().clone()).collect();
                let mut tasks = JoinSet::new();
                for (token_a, token_b) in pairs {
                    let registry = Arc::clone(&registry);
                    let semaphore = Arc::clone(&semaphore);
                    tasks.spawn(async move {
                        let _permit = semaphore.acquire_owned().await.map_err(|e| eyre::eyre!("Refresh limiter closed: {}", e))?;
                        match tokio::time::timeout(refresh_timeout, registry.refresh(&token_a, &token_b)).await {
                            Ok(result) => result.map(|_| ()),
                            Err(_) => Err(eyre::eyre!("Refresh of {:#}/{:#} timed out", token_a.get_address(), token_b.get_address())),
                        }
                    });
                }

                while let Some(result) = tasks.join_next().await {
                    match result {
                        Ok(Ok(())) => {
                            stats.pairs_refreshed.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(Err(e)) => {
                            stats.refresh_failures.fetch_add(1, Ordering::Relaxed);
                            warn!("Pair refresh failed block={} error={}", block_number, e);
                        }
                        Err(e) => {
                            stats.refresh_failures.fetch_add(1, Ordering::Relaxed);
                            error!("Pair refresh task panicked block={} error={}", block_number, e);
                        }
                    }
                }

                stats.blocks_processed.fetch_add(1, Ordering::Relaxed);
                stats.last_block.fetch_max(block_number, Ordering::Relaxed);
                debug!("Block processed block={} registry_height={}", block_number, registry.last_update_height());
            }

            info!("Refresh task ended");
        })
    }
}

impl Drop for DataSyncService {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("DataSyncService dropped while running, tasks may be orphaned");
        }
    }
}

/// Builder for DataSyncService
pub struct DataSyncServiceBuilder {
    config: Option<DataSyncConfig>,
    fetcher: Option<Arc<dyn PoolDataFetcher>>,
    chain_id: u64,
    base_tokens: Vec<Token>,
}

impl DataSyncServiceBuilder {
    pub fn new(chain_id: u64) -> Self {
        Self { config: None, fetcher: None, chain_id, base_tokens: Vec::new() }
    }

    pub fn with_config(mut self, config: DataSyncConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn PoolDataFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_base_tokens(mut self, base_tokens: Vec<Token>) -> Self {
        self.base_tokens = base_tokens;
        self
    }

    pub fn build(self) -> Result<DataSyncService> {
        let fetcher = self.fetcher.ok_or_else(|| eyre::eyre!("Pool data fetcher is required"))?;
        let config = match self.config {
            Some(config) => config,
            None => DataSyncConfig::from_env()?,
        };
        let registry = Arc::new(PoolRegistry::new(fetcher, self.chain_id).with_base_tokens(self.base_tokens));
        Ok(DataSyncService::new(config, registry))
    }
}
