//! Persistent space backed by sled
//!
//! One tree per bucket; keys are addresses, values are JSON-encoded ibgibs.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{Bucket, DeleteReceipt, PutReceipt, Space};
use crate::error::{GibError, Result};
use crate::ibgib::{Address, IbGib};

/// Configuration for a sled-backed space
#[derive(Debug, Clone)]
pub struct SledSpaceConfig {
    pub name: String,
    /// Path to sled database
    pub db_path: PathBuf,
    /// Cache size in bytes
    pub cache_size: u64,
    /// Discard the database on drop
    pub temporary: bool,
}

impl Default for SledSpaceConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            db_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ibgib-space")
                .join("space.sled"),
            cache_size: 64 * 1024 * 1024, // 64MB
            temporary: false,
        }
    }
}

pub struct SledSpace {
    name: String,
    db: sled::Db,
    data: sled::Tree,
    meta: sled::Tree,
    dna: sled::Tree,
}

impl SledSpace {
    pub async fn new(config: SledSpaceConfig) -> Result<Self> {
        if !config.temporary {
            if let Some(parent) = config.db_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let db = sled::Config::new()
            .path(&config.db_path)
            .cache_capacity(config.cache_size)
            .temporary(config.temporary)
            .open()?;

        let data = db.open_tree("ibgibs")?;
        let meta = db.open_tree("meta")?;
        let dna = db.open_tree("dna")?;

        info!(name = %config.name, path = %config.db_path.display(), "Sled space opened");

        Ok(Self {
            name: config.name,
            db,
            data,
            meta,
            dna,
        })
    }

    /// Open a space at a specific path
    pub async fn at_path(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        Self::new(SledSpaceConfig {
            name: name.into(),
            db_path: path.as_ref().to_path_buf(),
            ..Default::default()
        })
        .await
    }

    fn tree(&self, bucket: Bucket) -> &sled::Tree {
        match bucket {
            Bucket::Data => &self.data,
            Bucket::Meta => &self.meta,
            Bucket::Dna => &self.dna,
        }
    }

    fn lookup(&self, addr: &Address, bucket: Bucket) -> Result<Option<IbGib>> {
        match self.tree(bucket).get(addr.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl Space for SledSpace {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, addrs: &[Address], bucket: Option<Bucket>) -> Result<Vec<IbGib>> {
        let buckets: &[Bucket] = match &bucket {
            Some(b) => std::slice::from_ref(b),
            None => &Bucket::SEARCH_ORDER,
        };
        let mut found = Vec::with_capacity(addrs.len());
        for addr in addrs {
            let mut hit = None;
            for b in buckets {
                if let Some(ibgib) = self.lookup(addr, *b)? {
                    hit = Some(ibgib);
                    break;
                }
            }
            found.push(hit.ok_or_else(|| GibError::NotFound(addr.clone()))?);
        }
        Ok(found)
    }

    async fn put(&self, ibgibs: &[IbGib], bucket: Bucket, force: bool) -> Result<PutReceipt> {
        let tree = self.tree(bucket);
        let mut receipt = PutReceipt::default();
        for ibgib in ibgibs {
            let addr = ibgib.addr();
            let key = addr.as_str().as_bytes();
            if !force && tree.contains_key(key)? {
                receipt.skipped.push(addr);
                continue;
            }
            tree.insert(key, serde_json::to_vec(ibgib)?)?;
            receipt.stored.push(addr);
        }
        debug!(space = %self.name, bucket = %bucket, stored = receipt.stored.len(), "put");
        Ok(receipt)
    }

    async fn delete(&self, addrs: &[Address], bucket: Bucket) -> Result<DeleteReceipt> {
        let tree = self.tree(bucket);
        let mut receipt = DeleteReceipt::default();
        for addr in addrs {
            match tree.remove(addr.as_str().as_bytes())? {
                Some(_) => receipt.deleted.push(addr.clone()),
                None => receipt
                    .warnings
                    .push(format!("{} not found in {} bucket", addr, bucket)),
            }
        }
        Ok(receipt)
    }
}
