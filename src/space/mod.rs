//! Spaces: key/value stores of ibgibs keyed by address
//!
//! A space keeps three buckets. Regular nodes live in `Data`, configuration
//! and index nodes (space roots, special indexes) in `Meta`, and transform
//! records in `Dna`.

mod memory;
mod sled_space;

pub use memory::InMemorySpace;
pub use sled_space::{SledSpace, SledSpaceConfig};

use crate::error::Result;
use crate::ibgib::{Address, IbGib};
use async_trait::async_trait;
use std::fmt;

/// Storage bucket within a space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Data,
    Meta,
    Dna,
}

impl Bucket {
    /// Lookup order when the caller does not name a bucket
    pub const SEARCH_ORDER: [Bucket; 3] = [Bucket::Data, Bucket::Meta, Bucket::Dna];

    /// Map the `isMeta`/`isDna` flag pair onto a bucket; dna wins.
    pub fn from_flags(is_meta: bool, is_dna: bool) -> Self {
        if is_dna {
            Bucket::Dna
        } else if is_meta {
            Bucket::Meta
        } else {
            Bucket::Data
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Data => "data",
            Bucket::Meta => "meta",
            Bucket::Dna => "dna",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a put
#[derive(Debug, Clone, Default)]
pub struct PutReceipt {
    pub stored: Vec<Address>,
    /// Already present and not forced
    pub skipped: Vec<Address>,
}

/// Outcome of a delete
#[derive(Debug, Clone, Default)]
pub struct DeleteReceipt {
    pub deleted: Vec<Address>,
    pub warnings: Vec<String>,
}

/// Abstract storage for ibgibs
///
/// Every call is a suspension point; implementations must not assume callers
/// serialize their calls.
#[async_trait]
pub trait Space: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch every address, in order. `bucket: None` searches
    /// [`Bucket::SEARCH_ORDER`]. Fails with `NotFound` on the first miss.
    async fn get(&self, addrs: &[Address], bucket: Option<Bucket>) -> Result<Vec<IbGib>>;

    /// Store nodes in order. Without `force`, addresses already present in the
    /// bucket are skipped.
    async fn put(&self, ibgibs: &[IbGib], bucket: Bucket, force: bool) -> Result<PutReceipt>;

    /// Remove addresses from a bucket. Missing addresses are reported as
    /// warnings. Spaces without delete support fail with `DeleteUnsupported`.
    async fn delete(&self, addrs: &[Address], bucket: Bucket) -> Result<DeleteReceipt>;
}
