//! Per-space state
//!
//! A [`SpaceContext`] ties together everything the registries need for one
//! space: the space itself, the zero space holding the bootstrap record, the
//! in-memory handle to the current space root, and the per-type
//! initialization flags for special indexes.
//!
//! The space root is copy-on-write. Config pointers live as rel8ns on it, so
//! every config change relates a new space root, persists it in both spaces
//! and swaps the handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::bootstrap::{BootstrapUpdater, ZeroSpaceBootstrap};
use crate::config::RegistrySettings;
use crate::error::Result;
use crate::events::{EventBus, SpaceEvent};
use crate::ibgib::{Address, Data, IbGib};
use crate::persist::persist_transform_result;
use crate::space::Space;
use crate::special::SpecialType;
use crate::transform::{first_gen, rel8, Lineage, Rel8Options, Rel8nEdit, TjpOptions, TransformOptions};

/// One "initializing" flag per special type
#[derive(Debug, Default)]
pub struct InitFlags {
    flags: [AtomicBool; SpecialType::COUNT],
}

impl InitFlags {
    pub fn is_initializing(&self, special_type: SpecialType) -> bool {
        self.flags[special_type.index()].load(Ordering::Acquire)
    }

    /// Take the flag for `special_type`, or `None` if someone else holds it.
    /// The flag is released when the guard drops.
    pub fn try_acquire(&self, special_type: SpecialType) -> Option<InitGuard<'_>> {
        self.flags[special_type.index()]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InitGuard {
                flags: self,
                special_type,
            })
    }
}

pub struct InitGuard<'a> {
    flags: &'a InitFlags,
    special_type: SpecialType,
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        self.flags.flags[self.special_type.index()].store(false, Ordering::Release);
    }
}

/// State and registries for a single space
pub struct SpaceContext {
    space: Arc<dyn Space>,
    zero_space: Arc<dyn Space>,
    space_root: RwLock<IbGib>,
    bootstrap: Arc<dyn BootstrapUpdater>,
    pub(crate) init_flags: InitFlags,
    events: Arc<EventBus>,
    pub(crate) settings: RegistrySettings,
}

impl SpaceContext {
    pub fn new(
        space: Arc<dyn Space>,
        zero_space: Arc<dyn Space>,
        space_root: IbGib,
        bootstrap: Arc<dyn BootstrapUpdater>,
    ) -> Self {
        Self {
            space,
            zero_space,
            space_root: RwLock::new(space_root),
            bootstrap,
            init_flags: InitFlags::default(),
            events: Arc::new(EventBus::new()),
            settings: RegistrySettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RegistrySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Create a brand new space root named `name`, persist it in both spaces
    /// and record it with the bootstrap updater.
    #[instrument(skip(space, zero_space, bootstrap))]
    pub async fn create(
        name: &str,
        space: Arc<dyn Space>,
        zero_space: Arc<dyn Space>,
        bootstrap: Arc<dyn BootstrapUpdater>,
    ) -> Result<Self> {
        let mut data = Data::new();
        data.insert("name".to_string(), Value::from(name));
        let result = first_gen(
            &IbGib::primitive("space"),
            format!("space {}", name),
            data,
            Some(TjpOptions::full()),
            TransformOptions {
                lineage: Lineage::linked_history(),
                n_counter: true,
                ..Default::default()
            },
        )?;

        persist_transform_result(zero_space.as_ref(), &result, true, false).await?;
        persist_transform_result(space.as_ref(), &result, true, false).await?;
        bootstrap.update_bootstrap(&result.new_ibgib).await?;

        info!(space_root = %result.new_ibgib.addr(), "Space created");
        Ok(Self::new(space, zero_space, result.new_ibgib, bootstrap))
    }

    /// Reopen the default space recorded in the zero space's bootstrap
    /// record, creating a new space named `name` if there is none.
    pub async fn load_or_create(
        name: &str,
        space: Arc<dyn Space>,
        zero_space: Arc<dyn Space>,
        bootstrap: Arc<ZeroSpaceBootstrap>,
    ) -> Result<Self> {
        match bootstrap.load_default_space_root().await? {
            Some(space_root) => {
                info!(space_root = %space_root.addr(), "Space loaded from bootstrap");
                Ok(Self::new(space, zero_space, space_root, bootstrap))
            }
            None => Self::create(name, space, zero_space, bootstrap).await,
        }
    }

    pub fn space(&self) -> &dyn Space {
        self.space.as_ref()
    }

    pub fn zero_space(&self) -> &dyn Space {
        self.zero_space.as_ref()
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpaceEvent> {
        self.events.subscribe()
    }

    pub fn init_flags(&self) -> &InitFlags {
        &self.init_flags
    }

    /// Snapshot of the current space root
    pub async fn space_root(&self) -> IbGib {
        self.space_root.read().await.clone()
    }

    /// Address stored under config `key` on the space root
    pub async fn get_config_addr(&self, key: &str) -> Option<Address> {
        let root = self.space_root.read().await;
        let addrs = root.rel8d(key);
        if addrs.len() > 1 {
            warn!(key = %key, count = addrs.len(), "Multiple config addresses, using the first");
        }
        addrs.first().cloned()
    }

    /// Point config `key` at `addr` by relating a new space root.
    ///
    /// The new root is persisted to the zero space and this space, replaces
    /// the in-memory handle and is passed to the bootstrap updater.
    #[instrument(skip(self, addr), fields(addr = %addr))]
    pub async fn set_config_addr(&self, key: &str, addr: &Address) -> Result<IbGib> {
        let mut handle = self.space_root.write().await;

        let result = rel8(&Rel8Options {
            add: vec![Rel8nEdit::single(key, addr.clone())],
            common: TransformOptions {
                lineage: Lineage::linked_history(),
                n_counter: true,
                ..Default::default()
            },
            ..Rel8Options::new(handle.clone())
        })?;

        persist_transform_result(self.zero_space(), &result, true, false).await?;
        persist_transform_result(self.space(), &result, true, false).await?;

        let new_root = result.new_ibgib;
        *handle = new_root.clone();
        drop(handle);

        self.bootstrap.update_bootstrap(&new_root).await?;
        debug!(space_root = %new_root.addr(), "Config updated");
        self.events.emit(SpaceEvent::ConfigUpdated {
            key: key.to_string(),
            addr: addr.clone(),
            space_root_addr: new_root.addr(),
        });
        Ok(new_root)
    }
}
