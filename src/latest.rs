//! Latest-pointer registry
//!
//! The `latest` special index maps each timeline (by tjp address) to its
//! current head through one linked rel8n per tjp. Registering a node either
//! installs it as the new head or leaves the existing head in place.
//!
//! Deciding which of two heads is newer:
//!
//! 1. If both carry the `data.n` counter, the strictly greater one wins
//!    (ties keep the existing head). If only one carries it, that one wins.
//! 2. Otherwise a brute-force comparison of their `past` chains decides; see
//!    [`get_latest_addr_brute`].

use std::collections::HashSet;
use tracing::{debug, error, instrument, warn};

use crate::context::SpaceContext;
use crate::error::{GibError, Result};
use crate::events::{SpaceEvent, TimelineUpdate};
use crate::ibgib::{Address, IbGib, TJP};
use crate::persist::get_from_space;
use crate::space::Space;
use crate::special::{SpecialRel8, SpecialType};
use crate::timeline::get_tjp;

/// What [`SpaceContext::try_register_new_ibgib`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The node is now the head of its timeline
    Installed {
        tjp_addr: Address,
        previous: Option<Address>,
    },
    /// The existing head stays
    Kept { tjp_addr: Address, latest: Address },
}

enum PastWalk {
    /// The other candidate appeared in the walked node's past
    FoundOther,
    /// Walked past entries exceeded the bound
    Exceeded,
    /// Total past entries counted before reaching a node with no past
    Depth(usize),
}

/// Count past entries from `start`, always stepping to `past[0]`.
async fn walk_past(space: &dyn Space, start: &IbGib, other: &Address, bound: Option<usize>) -> Result<PastWalk> {
    let mut count = 0usize;
    let mut seen = HashSet::from([start.addr()]);
    let mut current = start.clone();

    loop {
        let past = current.past();
        if past.contains(other) {
            return Ok(PastWalk::FoundOther);
        }
        let Some(next) = past.first().cloned() else {
            return Ok(PastWalk::Depth(count));
        };
        count += past.len();
        if bound.is_some_and(|b| count > b) {
            return Ok(PastWalk::Exceeded);
        }
        if !seen.insert(next.clone()) {
            return Err(GibError::AmbiguousTimeline(format!(
                "past of {} loops back to {}",
                start.addr(),
                next
            )));
        }
        current = get_from_space(space, &next, None).await?;
    }
}

/// Decide between `ibgib` and the `existing` head of the timeline `tjp_addr`
/// when counters cannot. Returns the winner's address.
///
/// Cheap structural checks come first; failing those, both past chains are
/// walked and the longer one wins, with ties keeping `existing`. Fetch
/// failures during the walk are returned.
pub async fn get_latest_addr_brute(
    space: &dyn Space,
    ibgib: &IbGib,
    existing: &IbGib,
    tjp_addr: &Address,
) -> Result<Address> {
    let addr = ibgib.addr();
    let existing_addr = existing.addr();
    let ibgib_past = ibgib.past();
    let existing_past = existing.past();

    match (ibgib_past.len(), existing_past.len()) {
        (1, 0) => return Ok(addr),
        (0, 1) => return Ok(existing_addr),
        (0, 0) => {
            warn!(
                error = %GibError::AmbiguousTimeline(format!("{} vs {}", addr, existing_addr)),
                "Neither candidate has a past, keeping existing"
            );
            return Ok(existing_addr);
        }
        _ => {}
    }
    if existing_past.contains(&addr) || addr == existing_addr {
        return Ok(existing_addr);
    }
    if ibgib_past.contains(&existing_addr) {
        return Ok(addr);
    }
    if existing_addr == *tjp_addr && existing.rel8d(TJP).len() == 1 {
        return Ok(addr);
    }
    if addr == *tjp_addr && ibgib.rel8d(TJP).len() == 1 {
        return Ok(existing_addr);
    }

    let ibgib_count = match walk_past(space, ibgib, &existing_addr, None).await? {
        PastWalk::FoundOther | PastWalk::Exceeded => return Ok(addr),
        PastWalk::Depth(n) => n,
    };
    match walk_past(space, existing, &addr, Some(ibgib_count)).await? {
        PastWalk::FoundOther | PastWalk::Exceeded => Ok(existing_addr),
        PastWalk::Depth(existing_count) if ibgib_count > existing_count => Ok(addr),
        PastWalk::Depth(_) => Ok(existing_addr),
    }
}

impl SpaceContext {
    /// Register `ibgib` as a candidate head of its timeline.
    ///
    /// Never fails: any error is logged and swallowed, and the latest map is
    /// left as it was. Use [`Self::try_register_new_ibgib`] to observe the
    /// outcome.
    pub async fn register_new_ibgib(&self, ibgib: &IbGib) -> Result<()> {
        match self.try_register_new_ibgib(ibgib).await {
            Ok(outcome) => debug!(?outcome, "Registered"),
            Err(e) => error!(addr = %ibgib.addr(), error = %e, "Registering new ibgib failed"),
        }
        Ok(())
    }

    /// Register `ibgib`, returning what happened or the first error.
    #[instrument(skip_all, fields(addr = %ibgib.addr()))]
    pub async fn try_register_new_ibgib(&self, ibgib: &IbGib) -> Result<RegisterOutcome> {
        let addr = ibgib.addr();
        let latest = self
            .get_special_ibgib(SpecialType::Latest, true)
            .await?
            .ok_or(GibError::ConcurrentInitialization(SpecialType::Latest))?;

        let tjp = match get_tjp(self.space(), ibgib).await {
            Ok(tjp) => tjp,
            Err(e) => {
                warn!(error = %e, "Could not resolve tjp, using the ibgib itself");
                ibgib.clone()
            }
        };
        let tjp_addr = tjp.addr();

        let Some(existing_addr) = latest.rel8d(tjp_addr.as_str()).first().cloned() else {
            debug!(tjp = %tjp_addr, "No existing head");
            return self.install_latest(ibgib, tjp_addr, None).await;
        };
        if existing_addr == addr {
            return Ok(RegisterOutcome::Kept {
                tjp_addr,
                latest: existing_addr,
            });
        }

        let existing = match get_from_space(self.space(), &existing_addr, None).await {
            Ok(existing) => existing,
            Err(e) => {
                error!(existing = %existing_addr, error = %e, "Existing head unavailable, replacing it");
                return self.install_latest(ibgib, tjp_addr, Some(existing_addr)).await;
            }
        };

        let winner = match (ibgib.n_counter(), existing.n_counter()) {
            (Some(n), Some(existing_n)) if n > existing_n => addr.clone(),
            (Some(_), Some(_)) => existing_addr.clone(),
            (Some(_), None) => addr.clone(),
            (None, Some(_)) => existing_addr.clone(),
            (None, None) => get_latest_addr_brute(self.space(), ibgib, &existing, &tjp_addr).await?,
        };

        if winner == addr {
            self.install_latest(ibgib, tjp_addr, Some(existing_addr)).await
        } else {
            Ok(RegisterOutcome::Kept {
                tjp_addr,
                latest: existing_addr,
            })
        }
    }

    async fn install_latest(
        &self,
        ibgib: &IbGib,
        tjp_addr: Address,
        previous: Option<Address>,
    ) -> Result<RegisterOutcome> {
        self.rel8_to_special(SpecialRel8 {
            linked: true,
            sever_past: true,
            delete_previous: true,
            ..SpecialRel8::add(SpecialType::Latest, tjp_addr.as_str(), vec![ibgib.clone()])
        })
        .await?;

        self.events().emit(SpaceEvent::TimelineUpdated(TimelineUpdate {
            tjp_addr: tjp_addr.clone(),
            latest_addr: ibgib.addr(),
            latest_ibgib: ibgib.clone(),
        }));
        Ok(RegisterOutcome::Installed { tjp_addr, previous })
    }

    /// Head of `ibgib`'s timeline according to the latest map, if registered
    pub async fn get_latest_addr(&self, ibgib: &IbGib) -> Result<Option<Address>> {
        let Some(latest) = self.get_special_ibgib(SpecialType::Latest, false).await? else {
            return Ok(None);
        };
        let tjp = get_tjp(self.space(), ibgib).await?;
        Ok(latest.rel8d(tjp.addr().as_str()).first().cloned())
    }
}
