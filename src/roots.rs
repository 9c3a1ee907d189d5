//! Root accounting
//!
//! The `roots` special index holds a fixed set of root nodes under `root` and
//! points at exactly one of them through a linked `current` rel8n. New
//! timelines get filed under the current root.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::context::SpaceContext;
use crate::error::{GibError, Result};
use crate::ibgib::{Address, Data, IbGib};
use crate::persist::{get_from_space, persist_transform_result};
use crate::special::{SpecialRel8, SpecialType};
use crate::transform::{first_gen, rel8, Lineage, Rel8Options, Rel8nEdit, TjpOptions, TransformOptions};

pub const ROOT_REL8N_NAME: &str = "root";
pub const CURRENT_ROOT_REL8N_NAME: &str = "current";
pub const DEFAULT_ROOT_ICON: &str = "analytics-outline";
pub const DEFAULT_ROOT_DESCRIPTION: &str =
    "This is a root ibgib, which is basically like a root folder that is primarily responsible for \"containing\" other ibgibs.";

/// `root <text>`
pub fn root_text_to_ib(text: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Err(GibError::InvalidRoots("root text required".to_string()));
    }
    Ok(format!("root {}", text))
}

fn linked_with_counter() -> TransformOptions {
    TransformOptions {
        lineage: Lineage::linked_history(),
        n_counter: true,
        ..Default::default()
    }
}

impl SpaceContext {
    /// Roots creator: the index, one root per configured name, and the first
    /// root as current.
    pub(crate) async fn create_special_roots(&self) -> Result<Address> {
        let key = SpecialType::Roots.config_key();
        let roots = self.create_special_ibgib(SpecialType::Roots, false).await?;
        self.set_config_addr(&key, &roots.addr()).await?;

        let mut first_root = None;
        for name in self.settings.root_names.clone() {
            let (root, _) = self.create_root_ibgib(&format!("{}root", name), None, None).await?;
            first_root.get_or_insert(root);
        }
        let first_root =
            first_root.ok_or_else(|| GibError::InvalidRoots("no root names configured".to_string()))?;
        self.set_current_root(&first_root).await?;

        self.get_config_addr(&key)
            .await
            .ok_or(GibError::SpecialNotInitialized(SpecialType::Roots))
    }

    /// Create a root and add it to the roots index. Returns the root and the
    /// new roots index address.
    pub async fn create_root_ibgib(
        &self,
        text: &str,
        icon: Option<&str>,
        description: Option<&str>,
    ) -> Result<(IbGib, Address)> {
        let ib = root_text_to_ib(text)?;
        let mut data = Data::new();
        data.insert("text".to_string(), Value::from(text));
        data.insert("icon".to_string(), Value::from(icon.unwrap_or(DEFAULT_ROOT_ICON)));
        data.insert(
            "description".to_string(),
            Value::from(description.unwrap_or(DEFAULT_ROOT_DESCRIPTION)),
        );

        let result = first_gen(
            &IbGib::primitive("root"),
            ib,
            data,
            Some(TjpOptions::full()),
            TransformOptions {
                lineage: Lineage::linked_history(),
                dna: true,
                ..Default::default()
            },
        )?;
        persist_transform_result(self.space(), &result, true, false).await?;

        let root = result.new_ibgib;
        let roots_addr = self
            .rel8_to_special(SpecialRel8::add(SpecialType::Roots, ROOT_REL8N_NAME, vec![root.clone()]))
            .await?;
        Ok((root, roots_addr))
    }

    /// The root the roots index currently points at, creating the roots
    /// index on first use.
    pub async fn get_current_root(&self) -> Result<IbGib> {
        let roots = self
            .get_special_ibgib(SpecialType::Roots, true)
            .await?
            .ok_or(GibError::ConcurrentInitialization(SpecialType::Roots))?;
        match roots.rel8d(CURRENT_ROOT_REL8N_NAME) {
            [] => Err(GibError::InvalidRoots(format!("{} has no current root", roots.addr()))),
            [addr] => get_from_space(self.space(), addr, None).await,
            many => Err(GibError::InvalidRoots(format!(
                "{} has {} current roots",
                roots.addr(),
                many.len()
            ))),
        }
    }

    /// Point the roots index's `current` rel8n at `root`.
    #[instrument(skip_all, fields(root = %root.addr()))]
    pub async fn set_current_root(&self, root: &IbGib) -> Result<()> {
        let roots = self
            .get_special_ibgib(SpecialType::Roots, false)
            .await?
            .ok_or(GibError::SpecialNotInitialized(SpecialType::Roots))?;

        let result = rel8(&Rel8Options {
            add: vec![Rel8nEdit::single(CURRENT_ROOT_REL8N_NAME, root.addr())],
            common: linked_with_counter(),
            ..Rel8Options::new(roots)
        })?;
        persist_transform_result(self.space(), &result, true, false).await?;
        self.set_config_addr(&SpecialType::Roots.config_key(), &result.new_ibgib.addr())
            .await?;
        Ok(())
    }

    /// File `ibgib` under the current root.
    ///
    /// `rel8n_name` defaults to the configured root rel8n. Already related →
    /// no-op. Otherwise the root is related (replacing when `linked`),
    /// persisted, registered and made current.
    #[instrument(skip_all, fields(addr = %ibgib.addr()))]
    pub async fn rel8_to_current_root(&self, ibgib: &IbGib, rel8n_name: Option<&str>, linked: bool) -> Result<()> {
        let rel8n_name = rel8n_name.unwrap_or(self.settings.root_rel8n_name.as_str()).to_string();
        let current = self.get_current_root().await?;
        let addr = ibgib.addr();
        if current.rel8d(&rel8n_name).contains(&addr) {
            debug!(root = %current.addr(), "Already related to current root");
            return Ok(());
        }

        let edit = if linked {
            Rel8nEdit::single(rel8n_name, addr)
        } else {
            Rel8nEdit::multi(rel8n_name, vec![addr])
        };
        let result = rel8(&Rel8Options {
            add: vec![edit],
            common: linked_with_counter(),
            ..Rel8Options::new(current)
        })?;
        persist_transform_result(self.space(), &result, true, false).await?;

        let new_root = result.new_ibgib;
        self.register_new_ibgib(&new_root).await?;
        self.set_current_root(&new_root).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_ib() {
        assert_eq!(root_text_to_ib("Aroot").unwrap(), "root Aroot");
        assert!(root_text_to_ib("").is_err());
    }
}
