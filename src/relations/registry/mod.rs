use crate::history::{Group, MemberId};
use crate::relations::map::{MessageMap, Scope};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Live maps by scope.
///
/// A map is reused until it is invalidated, force-refreshed, or older than
/// the staleness limit. Replaced maps stay valid for callers still holding
/// them.
pub struct MapRegistry {
    maps: Mutex<HashMap<Scope, Arc<MessageMap>>>,
    stale_after: Option<Duration>,
    bot: Option<MemberId>,
}

impl MapRegistry {
    pub fn new(stale_after: Option<Duration>, bot: Option<MemberId>) -> Self {
        Self {
            maps: Mutex::new(HashMap::new()),
            stale_after,
            bot,
        }
    }

    /// The current map for `scope`, creating one when missing, stale, or
    /// when `force_refresh` is set.
    pub fn get_or_create(
        &self,
        scope: Scope,
        group: &Group,
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> Arc<MessageMap> {
        let mut maps = self.maps.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = maps.get(&scope) {
            if !force_refresh && !existing.is_stale(now, self.stale_after) {
                return existing.clone();
            }
            info!(
                "Replacing map for group {} ({} days){}",
                scope.group,
                scope.lookback_days,
                if force_refresh { ", forced" } else { ", stale" }
            );
        }
        let map = Arc::new(MessageMap::new(scope, group, self.bot, now));
        maps.insert(scope, map.clone());
        map
    }

    /// Member excluded from every map.
    pub fn bot(&self) -> Option<MemberId> {
        self.bot
    }

    pub fn get(&self, scope: &Scope) -> Option<Arc<MessageMap>> {
        self.maps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope)
            .cloned()
    }

    /// Drop the map for `scope`. Returns whether one existed.
    pub fn invalidate(&self, scope: &Scope) -> bool {
        self.maps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(scope)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.maps.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
