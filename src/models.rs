use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Venue,
    Artist,
}

impl EntityKind {
    /// The kind on the other side of a show.
    pub fn counterpart(self) -> Self {
        match self {
            EntityKind::Venue => EntityKind::Artist,
            EntityKind::Artist => EntityKind::Venue,
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Venue => "venues",
            EntityKind::Artist => "artists",
        }
    }

    /// Column on `shows` that references this kind.
    pub fn show_column(self) -> &'static str {
        match self {
            EntityKind::Venue => "venue_id",
            EntityKind::Artist => "artist_id",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Venue => f.write_str("Venue"),
            EntityKind::Artist => f.write_str("Artist"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Venue {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub state: String,
    pub address: String,
    pub phone: Option<String>,
    pub image_link: Option<String>,
    pub facebook_link: Option<String>,
    pub website_link: Option<String>,
    pub genres: Vec<String>,
    pub seeking_talent: bool,
    pub seeking_description: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub state: String,
    pub phone: Option<String>,
    pub image_link: Option<String>,
    pub facebook_link: Option<String>,
    pub website_link: Option<String>,
    pub genres: Vec<String>,
    pub seeking_venue: bool,
    pub seeking_description: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Show {
    pub id: i64,
    pub venue_id: i64,
    pub artist_id: i64,
    pub start_time: DateTime<Utc>,
}

impl Show {
    /// Id of the entity playing `kind`'s role in this show.
    pub fn id_for(&self, kind: EntityKind) -> i64 {
        match kind {
            EntityKind::Venue => self.venue_id,
            EntityKind::Artist => self.artist_id,
        }
    }
}

/// Partition key for the venue listing. Compared exactly, no case folding.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    pub city: String,
    pub state: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NamedEntity {
    pub id: i64,
    pub name: String,
}

/// The fields a show summary borrows from the entity on the other side.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EntityDisplay {
    pub id: i64,
    pub name: String,
    pub image_link: Option<String>,
}

/// Full field set for a venue create or edit. Edits overwrite every column.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct VenueInput {
    pub name: String,
    pub city: String,
    pub state: String,
    pub address: String,
    pub phone: Option<String>,
    pub image_link: Option<String>,
    pub facebook_link: Option<String>,
    pub website_link: Option<String>,
    pub genres: Vec<String>,
    pub seeking_talent: bool,
    pub seeking_description: Option<String>,
}

impl From<Venue> for VenueInput {
    fn from(venue: Venue) -> Self {
        Self {
            name: venue.name,
            city: venue.city,
            state: venue.state,
            address: venue.address,
            phone: venue.phone,
            image_link: venue.image_link,
            facebook_link: venue.facebook_link,
            website_link: venue.website_link,
            genres: venue.genres,
            seeking_talent: venue.seeking_talent,
            seeking_description: venue.seeking_description,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ArtistInput {
    pub name: String,
    pub city: String,
    pub state: String,
    pub phone: Option<String>,
    pub image_link: Option<String>,
    pub facebook_link: Option<String>,
    pub website_link: Option<String>,
    pub genres: Vec<String>,
    pub seeking_venue: bool,
    pub seeking_description: Option<String>,
}

impl From<Artist> for ArtistInput {
    fn from(artist: Artist) -> Self {
        Self {
            name: artist.name,
            city: artist.city,
            state: artist.state,
            phone: artist.phone,
            image_link: artist.image_link,
            facebook_link: artist.facebook_link,
            website_link: artist.website_link,
            genres: artist.genres,
            seeking_venue: artist.seeking_venue,
            seeking_description: artist.seeking_description,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ShowInput {
    pub venue_id: i64,
    pub artist_id: i64,
    pub start_time: DateTime<Utc>,
}
