//! Integration tests for special index initialization
//!
//! Uses a space that yields before every call so concurrent callers really
//! interleave.

use async_trait::async_trait;
use ibgib_space::space::{Bucket, DeleteReceipt, InMemorySpace, PutReceipt, Space};
use ibgib_space::special::TAG_REL8N_NAME;
use ibgib_space::{Address, IbGib, NoBootstrap, Result, SpaceContext, SpecialType};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

struct YieldingSpace {
    inner: InMemorySpace,
    /// Addresses of tjp-flagged nodes ever written
    tjps: Mutex<HashSet<Address>>,
}

impl YieldingSpace {
    fn new(name: &str) -> Self {
        Self {
            inner: InMemorySpace::new(name),
            tjps: Mutex::new(HashSet::new()),
        }
    }

    fn tjps_with_ib(&self, ib: &str) -> usize {
        self.tjps.lock().unwrap().iter().filter(|a| a.ib() == ib).count()
    }
}

#[async_trait]
impl Space for YieldingSpace {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, addrs: &[Address], bucket: Option<Bucket>) -> Result<Vec<IbGib>> {
        tokio::task::yield_now().await;
        self.inner.get(addrs, bucket).await
    }

    async fn put(&self, ibgibs: &[IbGib], bucket: Bucket, force: bool) -> Result<PutReceipt> {
        tokio::task::yield_now().await;
        {
            let mut tjps = self.tjps.lock().unwrap();
            tjps.extend(ibgibs.iter().filter(|i| i.is_tjp_flagged()).map(IbGib::addr));
        }
        self.inner.put(ibgibs, bucket, force).await
    }

    async fn delete(&self, addrs: &[Address], bucket: Bucket) -> Result<DeleteReceipt> {
        tokio::task::yield_now().await;
        self.inner.delete(addrs, bucket).await
    }
}

async fn new_context(space: Arc<YieldingSpace>) -> SpaceContext {
    SpaceContext::create("test", space, Arc::new(InMemorySpace::new("zero")), Arc::new(NoBootstrap))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_concurrent_initialization_creates_one_index() {
    let space = Arc::new(YieldingSpace::new("space"));
    let ctx = new_context(space.clone()).await;

    let (first, second) = tokio::join!(
        ctx.get_special_ibgib(SpecialType::Tags, true),
        ctx.get_special_ibgib(SpecialType::Tags, true),
    );
    let (first, second) = (first.unwrap(), second.unwrap());
    assert!(first.is_some() || second.is_some());
    if let (Some(a), Some(b)) = (&first, &second) {
        assert_eq!(a.addr(), b.addr());
    }

    assert_eq!(space.tjps_with_ib(&SpecialType::Tags.ib()), 1);
    assert!(!ctx.init_flags().is_initializing(SpecialType::Tags));

    // once created, every caller sees it
    let again = ctx.get_special_ibgib(SpecialType::Tags, true).await.unwrap();
    assert!(again.is_some());
    assert_eq!(space.tjps_with_ib(&SpecialType::Tags.ib()), 1);
}

#[tokio::test]
async fn test_uninitialized_without_initialize_is_none() {
    let ctx = new_context(Arc::new(YieldingSpace::new("space"))).await;
    assert!(ctx.get_special_ibgib(SpecialType::Secrets, false).await.unwrap().is_none());
    assert!(ctx.get_config_addr(&SpecialType::Secrets.config_key()).await.is_none());
}

#[tokio::test]
async fn test_initialize_specials_creates_every_index() {
    let space = Arc::new(YieldingSpace::new("space"));
    let ctx = new_context(space.clone()).await;
    ctx.initialize_specials().await.unwrap();

    for special_type in SpecialType::ALL {
        let special = ctx.get_special_ibgib(special_type, false).await.unwrap();
        let special = special.unwrap_or_else(|| panic!("{} missing", special_type));
        assert_eq!(special.ib, special_type.ib());
        assert!(space.inner.contains(&special.addr(), Bucket::Meta));
        assert_eq!(space.tjps_with_ib(&special_type.ib()), 1);
    }

    // running again creates nothing new
    let root = ctx.space_root().await;
    ctx.initialize_specials().await.unwrap();
    assert_eq!(ctx.space_root().await.addr(), root.addr());
}

#[tokio::test]
async fn test_default_tags_and_new_tag() {
    let ctx = new_context(Arc::new(YieldingSpace::new("space"))).await;
    ctx.get_special_ibgib(SpecialType::Tags, true).await.unwrap().unwrap();

    let (work, tags_addr) = ctx.create_tag("work", Some("briefcase"), None).await.unwrap();
    assert_eq!(work.ib, "tag work");
    assert_eq!(work.data_str("icon"), Some("briefcase"));
    assert_eq!(ctx.get_config_addr(&SpecialType::Tags.config_key()).await, Some(tags_addr));

    let tags = ctx
        .get_special_rel8d_ibgibs(SpecialType::Tags, TAG_REL8N_NAME)
        .await
        .unwrap();
    let ibs: Vec<&str> = tags.iter().map(|t| t.ib.as_str()).collect();
    assert_eq!(ibs, vec!["tag home", "tag favorite", "tag work"]);

    // each tag's timeline is tracked
    assert_eq!(ctx.get_latest_addr(&work).await.unwrap(), Some(work.addr()));
}
