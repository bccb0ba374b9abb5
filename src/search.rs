use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::{upcoming_show_count, EntityCount};
use crate::db::EntityStore;
use crate::error::Result;
use crate::models::EntityKind;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SearchResults {
    pub count: usize,
    pub data: Vec<EntityCount>,
}

/// Case-insensitive substring search on venue or artist names.
///
/// An empty term matches everything. `count` always equals `data.len()`.
pub fn search<S>(store: &S, term: &str, kind: EntityKind, now: DateTime<Utc>) -> Result<SearchResults>
where
    S: EntityStore + ?Sized,
{
    let mut data = Vec::new();
    for hit in store.filter_by_name_substring(kind, term)? {
        data.push(EntityCount {
            num_upcoming_shows: upcoming_show_count(store, kind, hit.id, now)?,
            id: hit.id,
            name: hit.name,
        });
    }
    tracing::debug!(%kind, term, hits = data.len(), "name search");
    Ok(SearchResults {
        count: data.len(),
        data,
    })
}
