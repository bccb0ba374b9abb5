//! Per-entity and per-region show views.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::db::EntityStore;
use crate::error::Result;
use crate::format::{format_datetime, DateFormat};
use crate::models::{EntityDisplay, EntityKind};
use crate::schedule::{classify, Timing};

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct EntityCount {
    pub id: i64,
    pub name: String,
    pub num_upcoming_shows: usize,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RegionVenues {
    pub city: String,
    pub state: String,
    pub venues: Vec<EntityCount>,
}

/// One show as seen from its owner: who is on the other side, and when.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ShowSummary {
    pub counterpart_id: i64,
    pub counterpart_name: String,
    pub counterpart_image_link: Option<String>,
    pub start_time: String,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ShowHistory {
    pub past_shows: Vec<ShowSummary>,
    pub upcoming_shows: Vec<ShowSummary>,
    pub past_shows_count: usize,
    pub upcoming_shows_count: usize,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ShowListing {
    pub venue_id: i64,
    pub venue_name: String,
    pub artist_id: i64,
    pub artist_name: String,
    pub artist_image_link: Option<String>,
    pub start_time: String,
}

pub fn upcoming_show_count<S>(
    store: &S,
    kind: EntityKind,
    id: i64,
    now: DateTime<Utc>,
) -> Result<usize>
where
    S: EntityStore + ?Sized,
{
    store.count_shows_for_entity(kind, id, now)
}

/// Venues partitioned by exact `(city, state)`, each with its upcoming-show count.
pub fn group_venues_by_region<S>(store: &S, now: DateTime<Utc>) -> Result<Vec<RegionVenues>>
where
    S: EntityStore + ?Sized,
{
    let mut areas = Vec::new();
    for region in store.distinct_regions()? {
        let mut venues = Vec::new();
        for venue in store.venues_in_region(&region)? {
            venues.push(EntityCount {
                num_upcoming_shows: upcoming_show_count(store, EntityKind::Venue, venue.id, now)?,
                id: venue.id,
                name: venue.name,
            });
        }
        areas.push(RegionVenues {
            city: region.city,
            state: region.state,
            venues,
        });
    }
    Ok(areas)
}

/// Past and upcoming shows of the `role` entity `id`, split at `now`.
///
/// Each show is summarised with its own counterpart, looked up by that
/// show's `venue_id` or `artist_id`.
pub fn build_show_history<S>(
    store: &S,
    role: EntityKind,
    id: i64,
    now: DateTime<Utc>,
    tz: Tz,
) -> Result<ShowHistory>
where
    S: EntityStore + ?Sized,
{
    store.display(role, id)?;

    let counterpart_kind = role.counterpart();
    let mut counterparts: HashMap<i64, EntityDisplay> = HashMap::new();
    let mut history = ShowHistory::default();

    for show in store.shows_for_entity(role, id)? {
        let counterpart = resolve(
            store,
            &mut counterparts,
            counterpart_kind,
            show.id_for(counterpart_kind),
        )?;

        let summary = ShowSummary {
            counterpart_id: counterpart.id,
            counterpart_name: counterpart.name,
            counterpart_image_link: counterpart.image_link,
            start_time: format_datetime(show.start_time, DateFormat::Medium, tz),
        };
        match classify(show.start_time, now) {
            Timing::Past => history.past_shows.push(summary),
            Timing::Upcoming => history.upcoming_shows.push(summary),
        }
    }

    history.past_shows_count = history.past_shows.len();
    history.upcoming_shows_count = history.upcoming_shows.len();
    Ok(history)
}

/// Every show, earliest first, with both sides' display fields.
pub fn list_shows<S>(store: &S, tz: Tz) -> Result<Vec<ShowListing>>
where
    S: EntityStore + ?Sized,
{
    let mut venues: HashMap<i64, EntityDisplay> = HashMap::new();
    let mut artists: HashMap<i64, EntityDisplay> = HashMap::new();
    let mut listing = Vec::new();

    for show in store.all_shows()? {
        let venue = resolve(store, &mut venues, EntityKind::Venue, show.venue_id)?;
        let artist = resolve(store, &mut artists, EntityKind::Artist, show.artist_id)?;

        listing.push(ShowListing {
            venue_id: show.venue_id,
            venue_name: venue.name,
            artist_id: show.artist_id,
            artist_name: artist.name,
            artist_image_link: artist.image_link,
            start_time: format_datetime(show.start_time, DateFormat::Medium, tz),
        });
    }
    Ok(listing)
}

/// Display fields for `id`, fetched once per aggregate call.
fn resolve<S>(
    store: &S,
    cache: &mut HashMap<i64, EntityDisplay>,
    kind: EntityKind,
    id: i64,
) -> Result<EntityDisplay>
where
    S: EntityStore + ?Sized,
{
    if let Some(found) = cache.get(&id) {
        return Ok(found.clone());
    }
    let found = store.display(kind, id)?;
    cache.insert(id, found.clone());
    Ok(found)
}
