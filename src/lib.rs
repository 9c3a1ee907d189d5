//! ibgib-space - Content-addressed ibgib graph store
//!
//! Stores immutable ibgib nodes by address and keeps per-space bookkeeping
//! on top of them.
//!
//! ## Architecture
//!
//! - **Nodes**: `{ ib, gib, data, rel8ns }` addressed by `ib^gib`, where gib
//!   is a SHA-256 over the rest
//! - **Transforms**: fork, mut8 and rel8 derive new nodes; history is kept in
//!   the `past` rel8n and timelines are identified by their tjp
//! - **Spaces**: pluggable stores (in-memory, sled) with data, meta and dna
//!   buckets
//! - **Registries**: special index nodes (latest, roots, tags, ...) whose
//!   addresses live as config rel8ns on the copy-on-write space root
//!
//! ## Storage Layout
//!
//! ```text
//! <local data dir>/ibgib-space/
//! ├── space.sled/        # Default space (ibgibs, meta, dna trees)
//! ├── zero.sled/         # Zero space holding the bootstrap record
//! └── config.toml        # Configuration
//! ```

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod graph;
pub mod ibgib;
pub mod latest;
pub mod persist;
pub mod roots;
pub mod space;
pub mod special;
pub mod timeline;
pub mod transform;

// Re-exports
pub use bootstrap::{BootstrapUpdater, NoBootstrap, ZeroSpaceBootstrap};
pub use config::{Config, RegistrySettings};
pub use context::SpaceContext;
pub use error::{GibError, Result};
pub use events::{EventBus, SpaceEvent, TimelineUpdate};
pub use graph::{get_dependency_graph, DependencyGraph};
pub use ibgib::{Address, IbGib};
pub use latest::{get_latest_addr_brute, RegisterOutcome};
pub use space::{Bucket, InMemorySpace, SledSpace, Space};
pub use special::{SpecialRel8, SpecialType};
pub use timeline::{get_tjp, is_tjp};
