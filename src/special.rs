//! Special indexes
//!
//! A special index is a singleton node per [`SpecialType`] whose address is
//! kept as a config pointer on the space root. It collects members under a
//! purpose rel8n (`tag`, `root`, one rel8n per tjp for `latest`, ...) and
//! keeps its own `past` chain. The `latest` index is the exception: each
//! update severs `past` and deletes the previous incarnation.

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

use crate::context::SpaceContext;
use crate::error::{GibError, Result};
use crate::events::SpaceEvent;
use crate::ibgib::{Address, Data, IbGib, GIB};
use crate::persist::{delete_from_space, get_from_space, persist_transform_result, put_in_space};
use crate::space::Bucket;
use crate::transform::{
    first_gen, fork, rel8, ForkOptions, Lineage, Rel8Options, Rel8nEdit, TjpOptions, TransformOptions,
};

pub const TAG_REL8N_NAME: &str = "tag";
pub const DEFAULT_TAG_ICON: &str = "pricetag-outline";
pub const DEFAULT_TAG_DESCRIPTION: &str = "This is a tag used for organizing data.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialType {
    Tags,
    Roots,
    Latest,
    Secrets,
    Encryptions,
    Outerspaces,
    Autosyncs,
    Robbots,
}

impl SpecialType {
    pub const COUNT: usize = 8;

    pub const ALL: [SpecialType; Self::COUNT] = [
        SpecialType::Tags,
        SpecialType::Roots,
        SpecialType::Latest,
        SpecialType::Secrets,
        SpecialType::Encryptions,
        SpecialType::Outerspaces,
        SpecialType::Autosyncs,
        SpecialType::Robbots,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialType::Tags => "tags",
            SpecialType::Roots => "roots",
            SpecialType::Latest => "latest",
            SpecialType::Secrets => "secrets",
            SpecialType::Encryptions => "encryptions",
            SpecialType::Outerspaces => "outerspaces",
            SpecialType::Autosyncs => "autosyncs",
            SpecialType::Robbots => "robbots",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }

    /// `meta special <type>`
    pub fn ib(&self) -> String {
        format!("meta special {}", self.as_str())
    }

    /// Rel8n name on the space root that points at this index
    pub fn config_key(&self) -> String {
        format!("config_key {}^{}", self.ib(), GIB)
    }
}

impl fmt::Display for SpecialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpecialType {
    type Err = GibError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SpecialType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| GibError::Config(format!("unknown special type '{}'", s)))
    }
}

/// `tag <text>`
pub fn tag_text_to_ib(text: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Err(GibError::Transform("tag text required".to_string()));
    }
    Ok(format!("tag {}", text))
}

/// Special-index updates requested through [`SpaceContext::rel8_to_special`]
#[derive(Debug, Clone)]
pub struct SpecialRel8 {
    pub special_type: SpecialType,
    pub rel8n_name: String,
    pub to_add: Vec<IbGib>,
    pub to_remove: Vec<IbGib>,
    /// Replace rather than append the added addresses
    pub linked: bool,
    /// Empty the new incarnation's `past`
    pub sever_past: bool,
    /// Delete the previous incarnation after the config points elsewhere
    pub delete_previous: bool,
}

impl SpecialRel8 {
    pub fn add(special_type: SpecialType, rel8n_name: impl Into<String>, to_add: Vec<IbGib>) -> Self {
        Self {
            special_type,
            rel8n_name: rel8n_name.into(),
            to_add,
            to_remove: Vec::new(),
            linked: false,
            sever_past: false,
            delete_previous: false,
        }
    }
}

impl SpaceContext {
    /// Fetch the special index of `special_type`.
    ///
    /// When it does not exist yet and `initialize` is set, the type's
    /// initialization flag is taken and the index is created. Returns `None`
    /// when the index is absent and not being initialized by this call, which
    /// includes another caller holding the flag.
    #[instrument(skip(self), fields(special = %special_type))]
    pub async fn get_special_ibgib(&self, special_type: SpecialType, initialize: bool) -> Result<Option<IbGib>> {
        let key = special_type.config_key();
        let addr = match self.get_config_addr(&key).await {
            Some(addr) => addr,
            None if !initialize => {
                warn!("Special index not initialized");
                return Ok(None);
            }
            None => {
                let Some(_guard) = self.init_flags.try_acquire(special_type) else {
                    info!("Special index already being initialized");
                    return Ok(None);
                };
                // the holder may have finished between our read and the flag
                match self.get_config_addr(&key).await {
                    Some(addr) => addr,
                    None => self.create_special(special_type).await?,
                }
            }
        };
        self.fetch_special(&addr).await.map(Some)
    }

    async fn fetch_special(&self, addr: &Address) -> Result<IbGib> {
        match get_from_space(self.space(), addr, Some(Bucket::Meta)).await {
            Err(GibError::NotFound(_)) => {
                let special = get_from_space(self.space(), addr, None).await?;
                warn!(addr = %addr, "Special index found outside the meta bucket, copying it there");
                put_in_space(self.space(), &[special.clone()], Bucket::Meta, false).await?;
                Ok(special)
            }
            other => other,
        }
    }

    /// Members of a special index under `rel8n_name`
    pub async fn get_special_rel8d_ibgibs(&self, special_type: SpecialType, rel8n_name: &str) -> Result<Vec<IbGib>> {
        let special = self
            .get_special_ibgib(special_type, false)
            .await?
            .ok_or(GibError::SpecialNotInitialized(special_type))?;
        let addrs = special.rel8d(rel8n_name);
        if addrs.is_empty() {
            return Ok(Vec::new());
        }
        self.space().get(addrs, None).await
    }

    /// Create every special index that does not exist yet.
    pub async fn initialize_specials(&self) -> Result<()> {
        // latest first so later creations can register; roots before the
        // rest so they have a current root to file under
        let first = [SpecialType::Latest, SpecialType::Roots];
        let rest = SpecialType::ALL.into_iter().filter(|t| !first.contains(t));
        for special_type in first.into_iter().chain(rest) {
            if self.get_special_ibgib(special_type, true).await?.is_none() {
                return Err(GibError::ConcurrentInitialization(special_type));
            }
        }
        Ok(())
    }

    pub(crate) fn create_special(&self, special_type: SpecialType) -> BoxFuture<'_, Result<Address>> {
        async move {
            info!(special = %special_type, "Creating special index");
            match special_type {
                SpecialType::Latest => self.create_special_latest().await,
                SpecialType::Roots => self.create_special_roots().await,
                SpecialType::Tags => self.create_special_tags().await,
                other => self.create_special_default(other).await,
            }
        }
        .boxed()
    }

    /// Fork a fresh index from its primitive and persist it in meta. Every
    /// type but `roots` is related to the current root unless skipped.
    pub(crate) async fn create_special_ibgib(&self, special_type: SpecialType, skip_rel8_to_root: bool) -> Result<IbGib> {
        let special_ib = special_type.ib();
        let result = fork(&ForkOptions {
            tjp: Some(TjpOptions::full()),
            common: TransformOptions {
                lineage: Lineage::linked_history(),
                n_counter: true,
                ..Default::default()
            },
            ..ForkOptions::new(IbGib::primitive(special_ib.as_str()), special_ib.as_str())
        })?;
        persist_transform_result(self.space(), &result, true, false).await?;

        if special_type != SpecialType::Roots && !skip_rel8_to_root {
            if let Err(e) = self.rel8_to_current_root(&result.new_ibgib, None, true).await {
                warn!(special = %special_type, error = %e, "Could not relate special index to current root");
            }
        }
        Ok(result.new_ibgib)
    }

    async fn create_special_default(&self, special_type: SpecialType) -> Result<Address> {
        let special = self.create_special_ibgib(special_type, false).await?;
        let addr = special.addr();
        self.set_config_addr(&special_type.config_key(), &addr).await?;
        Ok(addr)
    }

    async fn create_special_latest(&self) -> Result<Address> {
        let special = self.create_special_ibgib(SpecialType::Latest, true).await?;
        let addr = special.addr();
        self.set_config_addr(&SpecialType::Latest.config_key(), &addr).await?;
        Ok(addr)
    }

    async fn create_special_tags(&self) -> Result<Address> {
        let special = self.create_special_ibgib(SpecialType::Tags, false).await?;
        let mut addr = special.addr();
        self.set_config_addr(&SpecialType::Tags.config_key(), &addr).await?;

        for text in self.settings.default_tags.clone() {
            let (_, tags_addr) = self.create_tag(&text, None, None).await?;
            addr = tags_addr;
        }
        Ok(addr)
    }

    /// Create a tag, register its timeline and add it to the tags index.
    /// Returns the tag and the new tags index address.
    #[instrument(skip(self))]
    pub async fn create_tag(
        &self,
        text: &str,
        icon: Option<&str>,
        description: Option<&str>,
    ) -> Result<(IbGib, Address)> {
        let ib = tag_text_to_ib(text)?;
        let mut data = Data::new();
        data.insert("text".to_string(), Value::from(text));
        data.insert("icon".to_string(), Value::from(icon.unwrap_or(DEFAULT_TAG_ICON)));
        data.insert(
            "description".to_string(),
            Value::from(description.unwrap_or(DEFAULT_TAG_DESCRIPTION)),
        );

        let result = first_gen(
            &IbGib::primitive(TAG_REL8N_NAME),
            ib,
            data,
            Some(TjpOptions::full()),
            TransformOptions {
                lineage: Lineage::linked_history(),
                dna: true,
                n_counter: true,
                ..Default::default()
            },
        )?;
        persist_transform_result(self.space(), &result, true, false).await?;

        let tag = result.new_ibgib;
        self.register_new_ibgib(&tag).await?;
        let tags_addr = self
            .rel8_to_special(SpecialRel8::add(SpecialType::Tags, TAG_REL8N_NAME, vec![tag.clone()]))
            .await?;
        Ok((tag, tags_addr))
    }

    /// Relate (or unrelate) ibgibs to a special index and point the config at
    /// the new incarnation. Returns the new index address.
    ///
    /// Updates to anything but `latest` are registered in the latest map so
    /// the index's own timeline is tracked.
    #[instrument(skip_all, fields(special = %req.special_type, rel8n = %req.rel8n_name))]
    pub async fn rel8_to_special(&self, req: SpecialRel8) -> Result<Address> {
        let special_type = req.special_type;
        if req.to_add.is_empty() && req.to_remove.is_empty() {
            return Err(GibError::Transform("nothing to add or remove".to_string()));
        }

        let key = special_type.config_key();
        let prev_addr = self
            .get_config_addr(&key)
            .await
            .ok_or(GibError::SpecialNotInitialized(special_type))?;
        let special = self.fetch_special(&prev_addr).await?;

        let add_addrs: Vec<Address> = req.to_add.iter().map(IbGib::addr).collect();
        let mut add = Vec::new();
        match (req.linked, add_addrs.last()) {
            (_, None) => {}
            (true, Some(last)) => add.push(Rel8nEdit::single(req.rel8n_name.clone(), last.clone())),
            (false, Some(_)) => add.push(Rel8nEdit::multi(req.rel8n_name.clone(), add_addrs.clone())),
        }
        let mut remove = BTreeMap::new();
        if !req.to_remove.is_empty() {
            remove.insert(
                req.rel8n_name.clone(),
                req.to_remove.iter().map(IbGib::addr).collect::<Vec<_>>(),
            );
        }

        let mut result = rel8(&Rel8Options {
            add,
            remove,
            common: TransformOptions {
                lineage: Lineage::linked_history(),
                n_counter: true,
                ..Default::default()
            },
            ..Rel8Options::new(special)
        })?;
        if req.sever_past {
            result.new_ibgib = result.new_ibgib.sever_past()?;
        }
        persist_transform_result(self.space(), &result, true, false).await?;

        let new_special = result.new_ibgib;
        let new_addr = new_special.addr();
        self.set_config_addr(&key, &new_addr).await?;

        // only after the config stopped pointing at it
        if req.delete_previous && prev_addr != new_addr {
            delete_from_space(self.space(), &prev_addr, Bucket::Meta).await;
        }

        if special_type != SpecialType::Latest {
            self.register_new_ibgib_boxed(new_special).await;
        }

        debug!(addr = %new_addr, "Special index updated");
        self.events().emit(SpaceEvent::SpecialUpdated {
            special_type,
            addr: new_addr.clone(),
        });
        Ok(new_addr)
    }

    fn register_new_ibgib_boxed(&self, ibgib: IbGib) -> BoxFuture<'_, ()> {
        async move {
            // never fails; errors are logged inside
            let _ = self.register_new_ibgib(&ibgib).await;
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_names() {
        assert_eq!(SpecialType::Tags.ib(), "meta special tags");
        assert_eq!(SpecialType::Latest.config_key(), "config_key meta special latest^gib");
        assert_eq!("robbots".parse::<SpecialType>().unwrap(), SpecialType::Robbots);
        assert!("nope".parse::<SpecialType>().is_err());
        for (i, t) in SpecialType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }

    #[test]
    fn test_tag_ib() {
        assert_eq!(tag_text_to_ib("home").unwrap(), "tag home");
        assert!(tag_text_to_ib("  ").is_err());
    }
}
