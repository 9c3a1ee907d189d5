//! Bootstrap record: how a process finds its space root again
//!
//! The zero space holds one `bootstrap^gib` record (meta bucket, always
//! overwritten) with:
//!
//! ```text
//! data:   { defaultSpaceId: <uuid>, spaceIds: [<uuid>, ...] }
//! rel8ns: { <uuid>: [<latest space root address>] }
//! ```
//!
//! Every config change produces a new space root, so the record is rewritten
//! through a [`BootstrapUpdater`] after each one.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{GibError, Result};
use crate::ibgib::{Address, Data, IbGib, Rel8ns, GIB};
use crate::persist::{get_from_space, put_in_space};
use crate::space::{Bucket, Space};

pub const BOOTSTRAP_IB: &str = "bootstrap";
const DEFAULT_SPACE_ID_KEY: &str = "defaultSpaceId";
const SPACE_IDS_KEY: &str = "spaceIds";

/// Called with the new space root after every config write
#[async_trait]
pub trait BootstrapUpdater: Send + Sync {
    async fn update_bootstrap(&self, space_root: &IbGib) -> Result<()>;
}

/// Records nothing; for ephemeral spaces
pub struct NoBootstrap;

#[async_trait]
impl BootstrapUpdater for NoBootstrap {
    async fn update_bootstrap(&self, space_root: &IbGib) -> Result<()> {
        debug!(space_root = %space_root.addr(), "No bootstrap updater configured");
        Ok(())
    }
}

/// Keeps the bootstrap record in a zero space
pub struct ZeroSpaceBootstrap {
    zero_space: Arc<dyn Space>,
    /// Point `defaultSpaceId` at every updated space, not only the first
    set_space_as_default: bool,
}

impl ZeroSpaceBootstrap {
    pub fn new(zero_space: Arc<dyn Space>) -> Self {
        Self {
            zero_space,
            set_space_as_default: false,
        }
    }

    pub fn with_space_as_default(mut self, set_space_as_default: bool) -> Self {
        self.set_space_as_default = set_space_as_default;
        self
    }

    pub fn bootstrap_addr() -> Address {
        Address::from_parts(BOOTSTRAP_IB, GIB)
    }

    /// The bootstrap record, if one was written
    pub async fn load(&self) -> Result<Option<IbGib>> {
        match get_from_space(self.zero_space.as_ref(), &Self::bootstrap_addr(), Some(Bucket::Meta)).await {
            Ok(record) => Ok(Some(record)),
            Err(GibError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Latest known root of the given space
    pub async fn load_space_root(&self, space_id: &str) -> Result<Option<IbGib>> {
        let Some(record) = self.load().await? else {
            return Ok(None);
        };
        let Some(addr) = record.rel8d(space_id).first() else {
            return Ok(None);
        };
        get_from_space(self.zero_space.as_ref(), addr, Some(Bucket::Meta))
            .await
            .map(Some)
    }

    /// Latest root of the default space
    pub async fn load_default_space_root(&self) -> Result<Option<IbGib>> {
        let Some(record) = self.load().await? else {
            return Ok(None);
        };
        let Some(space_id) = record.data_str(DEFAULT_SPACE_ID_KEY) else {
            return Err(GibError::Bootstrap("bootstrap record has no defaultSpaceId".to_string()));
        };
        let space_id = space_id.to_string();
        self.load_space_root(&space_id).await
    }
}

#[async_trait]
impl BootstrapUpdater for ZeroSpaceBootstrap {
    async fn update_bootstrap(&self, space_root: &IbGib) -> Result<()> {
        let space_id = space_root
            .data_str("uuid")
            .ok_or_else(|| GibError::Bootstrap(format!("space root {} has no uuid", space_root.addr())))?
            .to_string();
        let space_root_addr = space_root.addr();

        let existing = self.load().await?;
        let (mut data, mut rel8ns) = match existing {
            Some(record) => (
                record.data.unwrap_or_default(),
                record.rel8ns.unwrap_or_default(),
            ),
            None => {
                info!(space_id = %space_id, "Creating bootstrap record");
                let mut data = Data::new();
                data.insert(DEFAULT_SPACE_ID_KEY.to_string(), Value::from(space_id.clone()));
                (data, Rel8ns::new())
            }
        };

        if rel8ns.get(&space_id).is_some_and(|addrs| addrs.first() == Some(&space_root_addr)) {
            return Ok(());
        }

        let space_ids = data
            .entry(SPACE_IDS_KEY.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(ids) = space_ids {
            if !ids.iter().any(|id| id.as_str() == Some(space_id.as_str())) {
                ids.push(Value::from(space_id.clone()));
            }
        }
        if self.set_space_as_default {
            data.insert(DEFAULT_SPACE_ID_KEY.to_string(), Value::from(space_id.clone()));
        }
        rel8ns.insert(space_id, vec![space_root_addr.clone()]);

        // the record keeps its well-known primitive address
        let record = IbGib {
            ib: BOOTSTRAP_IB.to_string(),
            gib: GIB.to_string(),
            data: Some(data),
            rel8ns: Some(rel8ns),
        };
        put_in_space(self.zero_space.as_ref(), &[record], Bucket::Meta, true).await?;
        debug!(space_root = %space_root_addr, "Bootstrap updated");
        Ok(())
    }
}
