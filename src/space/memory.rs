//! In-memory space backed by concurrent maps

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use super::{Bucket, DeleteReceipt, PutReceipt, Space};
use crate::error::{GibError, Result};
use crate::ibgib::{Address, IbGib};

/// Volatile space, mainly for tests and as a scratch zero space
pub struct InMemorySpace {
    name: String,
    data: DashMap<Address, IbGib>,
    meta: DashMap<Address, IbGib>,
    dna: DashMap<Address, IbGib>,
    supports_delete: bool,
}

impl InMemorySpace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: DashMap::new(),
            meta: DashMap::new(),
            dna: DashMap::new(),
            supports_delete: true,
        }
    }

    /// A space that refuses deletes, like append-only stores do
    pub fn without_delete(name: impl Into<String>) -> Self {
        Self {
            supports_delete: false,
            ..Self::new(name)
        }
    }

    fn bucket(&self, bucket: Bucket) -> &DashMap<Address, IbGib> {
        match bucket {
            Bucket::Data => &self.data,
            Bucket::Meta => &self.meta,
            Bucket::Dna => &self.dna,
        }
    }

    pub fn contains(&self, addr: &Address, bucket: Bucket) -> bool {
        self.bucket(bucket).contains_key(addr)
    }

    pub fn len(&self, bucket: Bucket) -> usize {
        self.bucket(bucket).len()
    }

    pub fn is_empty(&self) -> bool {
        Bucket::SEARCH_ORDER.iter().all(|b| self.bucket(*b).is_empty())
    }

    fn lookup(&self, addr: &Address, bucket: Option<Bucket>) -> Option<IbGib> {
        match bucket {
            Some(b) => self.bucket(b).get(addr).map(|entry| entry.value().clone()),
            None => Bucket::SEARCH_ORDER
                .iter()
                .find_map(|b| self.bucket(*b).get(addr).map(|entry| entry.value().clone())),
        }
    }
}

#[async_trait]
impl Space for InMemorySpace {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, addrs: &[Address], bucket: Option<Bucket>) -> Result<Vec<IbGib>> {
        addrs
            .iter()
            .map(|addr| {
                self.lookup(addr, bucket)
                    .ok_or_else(|| GibError::NotFound(addr.clone()))
            })
            .collect()
    }

    async fn put(&self, ibgibs: &[IbGib], bucket: Bucket, force: bool) -> Result<PutReceipt> {
        let map = self.bucket(bucket);
        let mut receipt = PutReceipt::default();
        for ibgib in ibgibs {
            let addr = ibgib.addr();
            if !force && map.contains_key(&addr) {
                receipt.skipped.push(addr);
                continue;
            }
            trace!(space = %self.name, bucket = %bucket, addr = %addr, "put");
            map.insert(addr.clone(), ibgib.clone());
            receipt.stored.push(addr);
        }
        Ok(receipt)
    }

    async fn delete(&self, addrs: &[Address], bucket: Bucket) -> Result<DeleteReceipt> {
        if !self.supports_delete {
            return Err(GibError::DeleteUnsupported(self.name.clone()));
        }
        let map = self.bucket(bucket);
        let mut receipt = DeleteReceipt::default();
        for addr in addrs {
            match map.remove(addr) {
                Some(_) => receipt.deleted.push(addr.clone()),
                None => receipt
                    .warnings
                    .push(format!("{} not found in {} bucket", addr, bucket)),
            }
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(text: &str) -> IbGib {
        let data = json!({ "text": text }).as_object().cloned().unwrap();
        IbGib::new("comment", Some(data), None).unwrap()
    }

    #[tokio::test]
    async fn test_get_searches_buckets_in_order() {
        let space = InMemorySpace::new("test");
        let meta = node("meta");
        space.put(&[meta.clone()], Bucket::Meta, false).await.unwrap();

        let found = space.get(&[meta.addr()], None).await.unwrap();
        assert_eq!(found, vec![meta.clone()]);
        assert!(space.get(&[meta.addr()], Some(Bucket::Data)).await.is_err());
    }

    #[tokio::test]
    async fn test_put_skips_existing_unless_forced() {
        let space = InMemorySpace::new("test");
        let a = node("a");
        let first = space.put(&[a.clone()], Bucket::Data, false).await.unwrap();
        assert_eq!(first.stored, vec![a.addr()]);

        let again = space.put(&[a.clone()], Bucket::Data, false).await.unwrap();
        assert_eq!(again.skipped, vec![a.addr()]);

        let forced = space.put(&[a.clone()], Bucket::Data, true).await.unwrap();
        assert_eq!(forced.stored, vec![a.addr()]);
    }

    #[tokio::test]
    async fn test_delete_reports_missing() {
        let space = InMemorySpace::new("test");
        let a = node("a");
        space.put(&[a.clone()], Bucket::Data, false).await.unwrap();

        let receipt = space
            .delete(&[a.addr(), node("b").addr()], Bucket::Data)
            .await
            .unwrap();
        assert_eq!(receipt.deleted, vec![a.addr()]);
        assert_eq!(receipt.warnings.len(), 1);
        assert!(matches!(
            space.get(&[a.addr()], None).await,
            Err(GibError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_unsupported() {
        let space = InMemorySpace::without_delete("append-only");
        let err = space.delete(&[node("a").addr()], Bucket::Data).await.unwrap_err();
        assert!(matches!(err, GibError::DeleteUnsupported(_)));
    }
}
