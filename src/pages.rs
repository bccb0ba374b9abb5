//! View-ready page data.
//!
//! Every page that classifies shows reads the clock once, through
//! [`RenderContext::capture`], and uses that instant for the whole page.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::warn;

use crate::aggregate::{
    build_show_history, group_venues_by_region, list_shows, RegionVenues, ShowListing, ShowSummary,
};
use crate::db::EntityStore;
use crate::error::Result;
use crate::models::{Artist, ArtistInput, EntityKind, NamedEntity, Venue, VenueInput};
use crate::schedule::Clock;
use crate::search::{search, SearchResults};

#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub now: DateTime<Utc>,
    pub tz: Tz,
}

impl RenderContext {
    pub fn capture(clock: &dyn Clock, tz: Tz) -> Self {
        Self {
            now: clock.now(),
            tz,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HomePage {
    pub venues: Vec<NamedEntity>,
    pub artists: Vec<NamedEntity>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct VenuesPage {
    pub areas: Vec<RegionVenues>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ArtistsPage {
    pub artists: Vec<NamedEntity>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ShowsPage {
    pub shows: Vec<ShowListing>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    pub search_term: String,
    pub results: SearchResults,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct VenueShow {
    pub artist_id: i64,
    pub artist_name: String,
    pub artist_image_link: Option<String>,
    pub start_time: String,
}

impl From<ShowSummary> for VenueShow {
    fn from(summary: ShowSummary) -> Self {
        Self {
            artist_id: summary.counterpart_id,
            artist_name: summary.counterpart_name,
            artist_image_link: summary.counterpart_image_link,
            start_time: summary.start_time,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ArtistShow {
    pub venue_id: i64,
    pub venue_name: String,
    pub venue_image_link: Option<String>,
    pub start_time: String,
}

impl From<ShowSummary> for ArtistShow {
    fn from(summary: ShowSummary) -> Self {
        Self {
            venue_id: summary.counterpart_id,
            venue_name: summary.counterpart_name,
            venue_image_link: summary.counterpart_image_link,
            start_time: summary.start_time,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct VenueDetail {
    #[serde(flatten)]
    pub venue: Venue,
    pub past_shows: Vec<VenueShow>,
    pub upcoming_shows: Vec<VenueShow>,
    pub past_shows_count: usize,
    pub upcoming_shows_count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ArtistDetail {
    #[serde(flatten)]
    pub artist: Artist,
    pub past_shows: Vec<ArtistShow>,
    pub upcoming_shows: Vec<ArtistShow>,
    pub past_shows_count: usize,
    pub upcoming_shows_count: usize,
}

/// Current values of a record, shaped like the edit submission.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EditForm<T> {
    pub id: i64,
    #[serde(flatten)]
    pub values: T,
}

pub fn home<S>(store: &S, limit: usize) -> Result<HomePage>
where
    S: EntityStore + ?Sized,
{
    Ok(HomePage {
        venues: store.recent(EntityKind::Venue, limit)?,
        artists: store.recent(EntityKind::Artist, limit)?,
    })
}

pub fn venues<S>(store: &S, ctx: RenderContext) -> Result<VenuesPage>
where
    S: EntityStore + ?Sized,
{
    Ok(VenuesPage {
        areas: group_venues_by_region(store, ctx.now)?,
    })
}

pub fn artists<S>(store: &S) -> Result<ArtistsPage>
where
    S: EntityStore + ?Sized,
{
    let artists = store
        .all_artists()?
        .into_iter()
        .map(|artist| NamedEntity {
            id: artist.id,
            name: artist.name,
        })
        .collect();
    Ok(ArtistsPage { artists })
}

pub fn shows<S>(store: &S, ctx: RenderContext) -> Result<ShowsPage>
where
    S: EntityStore + ?Sized,
{
    Ok(ShowsPage {
        shows: list_shows(store, ctx.tz)?,
    })
}

pub fn search_page<S>(
    store: &S,
    kind: EntityKind,
    search_term: &str,
    ctx: RenderContext,
) -> Result<SearchPage>
where
    S: EntityStore + ?Sized,
{
    Ok(SearchPage {
        search_term: search_term.to_string(),
        results: search(store, search_term, kind, ctx.now)?,
    })
}

pub fn venue_detail<S>(store: &S, id: i64, ctx: RenderContext) -> Result<VenueDetail>
where
    S: EntityStore + ?Sized,
{
    let venue = store.venue(id).inspect_err(|err| log_miss(err, id))?;
    let history = build_show_history(store, EntityKind::Venue, id, ctx.now, ctx.tz)?;
    Ok(VenueDetail {
        venue,
        past_shows: history.past_shows.into_iter().map(VenueShow::from).collect(),
        upcoming_shows: history
            .upcoming_shows
            .into_iter()
            .map(VenueShow::from)
            .collect(),
        past_shows_count: history.past_shows_count,
        upcoming_shows_count: history.upcoming_shows_count,
    })
}

pub fn artist_detail<S>(store: &S, id: i64, ctx: RenderContext) -> Result<ArtistDetail>
where
    S: EntityStore + ?Sized,
{
    let artist = store.artist(id).inspect_err(|err| log_miss(err, id))?;
    let history = build_show_history(store, EntityKind::Artist, id, ctx.now, ctx.tz)?;
    Ok(ArtistDetail {
        artist,
        past_shows: history.past_shows.into_iter().map(ArtistShow::from).collect(),
        upcoming_shows: history
            .upcoming_shows
            .into_iter()
            .map(ArtistShow::from)
            .collect(),
        past_shows_count: history.past_shows_count,
        upcoming_shows_count: history.upcoming_shows_count,
    })
}

pub fn venue_form<S>(store: &S, id: i64) -> Result<EditForm<VenueInput>>
where
    S: EntityStore + ?Sized,
{
    let venue = store.venue(id).inspect_err(|err| log_miss(err, id))?;
    Ok(EditForm {
        id: venue.id,
        values: VenueInput::from(venue),
    })
}

pub fn artist_form<S>(store: &S, id: i64) -> Result<EditForm<ArtistInput>>
where
    S: EntityStore + ?Sized,
{
    let artist = store.artist(id).inspect_err(|err| log_miss(err, id))?;
    Ok(EditForm {
        id: artist.id,
        values: ArtistInput::from(artist),
    })
}

fn log_miss(err: &crate::error::BookingError, id: i64) {
    if err.is_not_found() {
        warn!(id, "{err}");
    }
}
