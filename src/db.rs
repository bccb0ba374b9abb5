use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{BookingError, Result};
use crate::models::{
    Artist, ArtistInput, EntityDisplay, EntityKind, NamedEntity, Region, Show, ShowInput, Venue,
    VenueInput,
};
use crate::config::ensure_parent;

/// Query contract the scheduling, aggregation and search code runs against.
///
/// Every write commits as a single statement, so a failed call leaves nothing behind.
pub trait EntityStore {
    fn venue(&self, id: i64) -> Result<Venue>;
    fn artist(&self, id: i64) -> Result<Artist>;
    /// Name and image of a venue or artist, for show summaries.
    fn display(&self, kind: EntityKind, id: i64) -> Result<EntityDisplay>;

    fn all_venues(&self) -> Result<Vec<Venue>>;
    fn all_artists(&self) -> Result<Vec<Artist>>;
    /// Newest first, by id.
    fn recent(&self, kind: EntityKind, limit: usize) -> Result<Vec<NamedEntity>>;

    /// Case-insensitive literal substring match on `name`.
    fn filter_by_name_substring(&self, kind: EntityKind, term: &str) -> Result<Vec<NamedEntity>>;
    fn distinct_regions(&self) -> Result<Vec<Region>>;
    fn venues_in_region(&self, region: &Region) -> Result<Vec<NamedEntity>>;

    fn shows_for_entity(&self, kind: EntityKind, id: i64) -> Result<Vec<Show>>;
    fn count_shows_for_entity(&self, kind: EntityKind, id: i64, after: DateTime<Utc>)
        -> Result<usize>;
    /// Every show, earliest first.
    fn all_shows(&self) -> Result<Vec<Show>>;

    fn create_venue(&self, input: &VenueInput) -> Result<Venue>;
    fn create_artist(&self, input: &ArtistInput) -> Result<Artist>;
    fn create_show(&self, input: &ShowInput) -> Result<Show>;
    fn update_venue(&self, id: i64, input: &VenueInput) -> Result<Venue>;
    fn update_artist(&self, id: i64, input: &ArtistInput) -> Result<Artist>;
    /// Removes the entity and, through the foreign keys, its shows.
    fn delete(&self, kind: EntityKind, id: i64) -> Result<()>;
}

pub struct Store {
    conn: Connection,
}

const VENUE_COLUMNS: &str = "id, name, city, state, address, phone, image_link, facebook_link, \
     website_link, genres, seeking_talent, seeking_description";
const ARTIST_COLUMNS: &str = "id, name, city, state, phone, image_link, facebook_link, \
     website_link, genres, seeking_venue, seeking_description";
const SHOW_COLUMNS: &str = "id, venue_id, artist_id, start_time";

/// Unicode lowercase; SQLite's own `lower()` and `LIKE` only fold ASCII.
const FOLD_CASE: &str = "fold_case";

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        ensure_parent(path);
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.create_scalar_function(
            FOLD_CASE,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let value: Option<String> = ctx.get(0)?;
                Ok(value.map(|value| value.to_lowercase()))
            },
        )?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS venues(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                address TEXT NOT NULL,
                phone TEXT,
                image_link TEXT,
                facebook_link TEXT,
                website_link TEXT,
                genres TEXT NOT NULL DEFAULT '[]',
                seeking_talent INTEGER NOT NULL DEFAULT 0,
                seeking_description TEXT
            );
            CREATE TABLE IF NOT EXISTS artists(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                phone TEXT,
                image_link TEXT,
                facebook_link TEXT,
                website_link TEXT,
                genres TEXT NOT NULL DEFAULT '[]',
                seeking_venue INTEGER NOT NULL DEFAULT 0,
                seeking_description TEXT
            );
            CREATE TABLE IF NOT EXISTS shows(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                venue_id INTEGER NOT NULL REFERENCES venues(id) ON DELETE CASCADE,
                artist_id INTEGER NOT NULL REFERENCES artists(id) ON DELETE CASCADE,
                start_time TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS shows_venue_start ON shows(venue_id, start_time);
            CREATE INDEX IF NOT EXISTS shows_artist_start ON shows(artist_id, start_time);",
        )?;
        Ok(())
    }

    fn collect<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, map)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl EntityStore for Store {
    fn venue(&self, id: i64) -> Result<Venue> {
        self.conn
            .query_row(
                &format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = ?1"),
                params![id],
                venue_from_row,
            )
            .optional()?
            .ok_or_else(|| BookingError::not_found(EntityKind::Venue, id))
    }

    fn artist(&self, id: i64) -> Result<Artist> {
        self.conn
            .query_row(
                &format!("SELECT {ARTIST_COLUMNS} FROM artists WHERE id = ?1"),
                params![id],
                artist_from_row,
            )
            .optional()?
            .ok_or_else(|| BookingError::not_found(EntityKind::Artist, id))
    }

    fn display(&self, kind: EntityKind, id: i64) -> Result<EntityDisplay> {
        self.conn
            .query_row(
                &format!("SELECT id, name, image_link FROM {} WHERE id = ?1", kind.table()),
                params![id],
                |row| {
                    Ok(EntityDisplay {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        image_link: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| BookingError::not_found(kind, id))
    }

    fn all_venues(&self) -> Result<Vec<Venue>> {
        self.collect(
            &format!("SELECT {VENUE_COLUMNS} FROM venues ORDER BY id"),
            [],
            venue_from_row,
        )
    }

    fn all_artists(&self) -> Result<Vec<Artist>> {
        self.collect(
            &format!("SELECT {ARTIST_COLUMNS} FROM artists ORDER BY id"),
            [],
            artist_from_row,
        )
    }

    fn recent(&self, kind: EntityKind, limit: usize) -> Result<Vec<NamedEntity>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.collect(
            &format!("SELECT id, name FROM {} ORDER BY id DESC LIMIT ?1", kind.table()),
            params![limit],
            named_from_row,
        )
    }

    fn filter_by_name_substring(&self, kind: EntityKind, term: &str) -> Result<Vec<NamedEntity>> {
        let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
        self.collect(
            &format!(
                "SELECT id, name FROM {} WHERE {FOLD_CASE}(name) LIKE ?1 ESCAPE '\\' ORDER BY id",
                kind.table()
            ),
            params![pattern],
            named_from_row,
        )
    }

    fn distinct_regions(&self) -> Result<Vec<Region>> {
        self.collect(
            "SELECT city, state FROM venues GROUP BY city, state ORDER BY MIN(id)",
            [],
            |row| {
                Ok(Region {
                    city: row.get(0)?,
                    state: row.get(1)?,
                })
            },
        )
    }

    fn venues_in_region(&self, region: &Region) -> Result<Vec<NamedEntity>> {
        self.collect(
            "SELECT id, name FROM venues WHERE city = ?1 AND state = ?2 ORDER BY id",
            params![region.city, region.state],
            named_from_row,
        )
    }

    fn shows_for_entity(&self, kind: EntityKind, id: i64) -> Result<Vec<Show>> {
        self.collect(
            &format!(
                "SELECT {SHOW_COLUMNS} FROM shows WHERE {} = ?1 ORDER BY start_time, id",
                kind.show_column()
            ),
            params![id],
            show_from_row,
        )
    }

    fn count_shows_for_entity(
        &self,
        kind: EntityKind,
        id: i64,
        after: DateTime<Utc>,
    ) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM shows WHERE {} = ?1 AND start_time > ?2",
                kind.show_column()
            ),
            params![id, after],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn all_shows(&self) -> Result<Vec<Show>> {
        self.collect(
            &format!("SELECT {SHOW_COLUMNS} FROM shows ORDER BY start_time ASC, id ASC"),
            [],
            show_from_row,
        )
    }

    fn create_venue(&self, input: &VenueInput) -> Result<Venue> {
        self.conn.execute(
            "INSERT INTO venues (name, city, state, address, phone, image_link, facebook_link,
                website_link, genres, seeking_talent, seeking_description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                input.name,
                input.city,
                input.state,
                input.address,
                input.phone,
                input.image_link,
                input.facebook_link,
                input.website_link,
                genres_to_sql(&input.genres)?,
                input.seeking_talent,
                input.seeking_description
            ],
        )?;
        self.venue(self.conn.last_insert_rowid())
    }

    fn create_artist(&self, input: &ArtistInput) -> Result<Artist> {
        self.conn.execute(
            "INSERT INTO artists (name, city, state, phone, image_link, facebook_link,
                website_link, genres, seeking_venue, seeking_description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                input.name,
                input.city,
                input.state,
                input.phone,
                input.image_link,
                input.facebook_link,
                input.website_link,
                genres_to_sql(&input.genres)?,
                input.seeking_venue,
                input.seeking_description
            ],
        )?;
        self.artist(self.conn.last_insert_rowid())
    }

    fn create_show(&self, input: &ShowInput) -> Result<Show> {
        self.conn.execute(
            "INSERT INTO shows (venue_id, artist_id, start_time) VALUES (?1, ?2, ?3)",
            params![input.venue_id, input.artist_id, input.start_time],
        )?;
        let id = self.conn.last_insert_rowid();
        let show = self.conn.query_row(
            &format!("SELECT {SHOW_COLUMNS} FROM shows WHERE id = ?1"),
            params![id],
            show_from_row,
        )?;
        Ok(show)
    }

    fn update_venue(&self, id: i64, input: &VenueInput) -> Result<Venue> {
        let changed = self.conn.execute(
            "UPDATE venues SET name = ?2, city = ?3, state = ?4, address = ?5, phone = ?6,
                image_link = ?7, facebook_link = ?8, website_link = ?9, genres = ?10,
                seeking_talent = ?11, seeking_description = ?12
             WHERE id = ?1",
            params![
                id,
                input.name,
                input.city,
                input.state,
                input.address,
                input.phone,
                input.image_link,
                input.facebook_link,
                input.website_link,
                genres_to_sql(&input.genres)?,
                input.seeking_talent,
                input.seeking_description
            ],
        )?;
        if changed == 0 {
            return Err(BookingError::not_found(EntityKind::Venue, id));
        }
        self.venue(id)
    }

    fn update_artist(&self, id: i64, input: &ArtistInput) -> Result<Artist> {
        let changed = self.conn.execute(
            "UPDATE artists SET name = ?2, city = ?3, state = ?4, phone = ?5, image_link = ?6,
                facebook_link = ?7, website_link = ?8, genres = ?9, seeking_venue = ?10,
                seeking_description = ?11
             WHERE id = ?1",
            params![
                id,
                input.name,
                input.city,
                input.state,
                input.phone,
                input.image_link,
                input.facebook_link,
                input.website_link,
                genres_to_sql(&input.genres)?,
                input.seeking_venue,
                input.seeking_description
            ],
        )?;
        if changed == 0 {
            return Err(BookingError::not_found(EntityKind::Artist, id));
        }
        self.artist(id)
    }

    fn delete(&self, kind: EntityKind, id: i64) -> Result<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", kind.table()),
            params![id],
        )?;
        if changed == 0 {
            return Err(BookingError::not_found(kind, id));
        }
        Ok(())
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn genres_to_sql(genres: &[String]) -> Result<String> {
    serde_json::to_string(genres).map_err(|err| BookingError::Validation(err.to_string()))
}

fn genres_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let payload: String = row.get(idx)?;
    serde_json::from_str(&payload).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(err),
        )
    })
}

fn venue_from_row(row: &Row<'_>) -> rusqlite::Result<Venue> {
    Ok(Venue {
        id: row.get(0)?,
        name: row.get(1)?,
        city: row.get(2)?,
        state: row.get(3)?,
        address: row.get(4)?,
        phone: row.get(5)?,
        image_link: row.get(6)?,
        facebook_link: row.get(7)?,
        website_link: row.get(8)?,
        genres: genres_from_row(row, 9)?,
        seeking_talent: row.get(10)?,
        seeking_description: row.get(11)?,
    })
}

fn artist_from_row(row: &Row<'_>) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get(0)?,
        name: row.get(1)?,
        city: row.get(2)?,
        state: row.get(3)?,
        phone: row.get(4)?,
        image_link: row.get(5)?,
        facebook_link: row.get(6)?,
        website_link: row.get(7)?,
        genres: genres_from_row(row, 8)?,
        seeking_venue: row.get(9)?,
        seeking_description: row.get(10)?,
    })
}

fn show_from_row(row: &Row<'_>) -> rusqlite::Result<Show> {
    Ok(Show {
        id: row.get(0)?,
        venue_id: row.get(1)?,
        artist_id: row.get(2)?,
        start_time: row.get(3)?,
    })
}

fn named_from_row(row: &Row<'_>) -> rusqlite::Result<NamedEntity> {
    Ok(NamedEntity {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    pub(crate) fn venue_input(name: &str, city: &str, state: &str) -> VenueInput {
        VenueInput {
            name: name.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            address: "1 Main St".to_string(),
            phone: Some("212-555-0100".to_string()),
            image_link: Some(format!("https://img.example.com/{name}.png")),
            facebook_link: None,
            website_link: Some("https://venue.example.com".to_string()),
            genres: vec!["Jazz".to_string(), "Blues".to_string()],
            seeking_talent: true,
            seeking_description: Some("Looking for quartets".to_string()),
        }
    }

    pub(crate) fn artist_input(name: &str) -> ArtistInput {
        ArtistInput {
            name: name.to_string(),
            city: "San Francisco".to_string(),
            state: "CA".to_string(),
            phone: None,
            image_link: Some(format!("https://img.example.com/{name}.jpg")),
            facebook_link: Some("https://www.facebook.com/example".to_string()),
            website_link: None,
            genres: vec!["Jazz".to_string()],
            seeking_venue: false,
            seeking_description: None,
        }
    }

    pub(crate) fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn created_venue_reads_back_identically() {
        let store = Store::open_in_memory().unwrap();
        let input = venue_input("Blue Note", "NY", "NY");
        let created = store.create_venue(&input).unwrap();
        let fetched = store.venue(created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(VenueInput::from(fetched), input);
    }

    #[test]
    fn created_artist_reads_back_identically() {
        let store = Store::open_in_memory().unwrap();
        let input = artist_input("Miles Set");
        let created = store.create_artist(&input).unwrap();
        assert_eq!(ArtistInput::from(store.artist(created.id).unwrap()), input);
    }

    #[test]
    fn missing_rows_are_not_found() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.venue(42).unwrap_err().is_not_found());
        assert!(store.artist(42).unwrap_err().is_not_found());
        assert!(store.display(EntityKind::Venue, 42).unwrap_err().is_not_found());
    }

    #[test]
    fn deleting_unknown_id_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store.delete(EntityKind::Venue, 99).unwrap_err();
        assert!(matches!(
            err,
            BookingError::NotFound {
                kind: EntityKind::Venue,
                id: 99
            }
        ));
    }

    #[test]
    fn updating_unknown_id_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store.update_artist(5, &artist_input("Ghost")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_overwrites_every_field() {
        let store = Store::open_in_memory().unwrap();
        let venue = store.create_venue(&venue_input("Old", "NY", "NY")).unwrap();
        let replacement = VenueInput {
            phone: None,
            genres: Vec::new(),
            seeking_talent: false,
            seeking_description: None,
            ..venue_input("New", "Austin", "TX")
        };
        let updated = store.update_venue(venue.id, &replacement).unwrap();
        assert_eq!(updated.id, venue.id);
        assert_eq!(VenueInput::from(updated), replacement);
    }

    #[test]
    fn show_requires_existing_parents() {
        let store = Store::open_in_memory().unwrap();
        let venue = store.create_venue(&venue_input("Blue Note", "NY", "NY")).unwrap();
        let err = store
            .create_show(&ShowInput {
                venue_id: venue.id,
                artist_id: 404,
                start_time: anchor(),
            })
            .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
        assert!(store.all_shows().unwrap().is_empty());
    }

    #[test]
    fn deleting_a_venue_removes_its_shows() {
        let store = Store::open_in_memory().unwrap();
        let venue = store.create_venue(&venue_input("Blue Note", "NY", "NY")).unwrap();
        let artist = store.create_artist(&artist_input("Miles Set")).unwrap();
        store
            .create_show(&ShowInput {
                venue_id: venue.id,
                artist_id: artist.id,
                start_time: anchor(),
            })
            .unwrap();

        store.delete(EntityKind::Venue, venue.id).unwrap();

        assert!(store.all_venues().unwrap().is_empty());
        assert!(store.all_shows().unwrap().is_empty());
        assert!(store
            .shows_for_entity(EntityKind::Artist, artist.id)
            .unwrap()
            .is_empty());
        assert!(store.artist(artist.id).is_ok());
    }

    #[test]
    fn counts_only_shows_strictly_after() {
        let store = Store::open_in_memory().unwrap();
        let venue = store.create_venue(&venue_input("Blue Note", "NY", "NY")).unwrap();
        let artist = store.create_artist(&artist_input("Miles Set")).unwrap();
        for offset in [-2, 0, 3, 5] {
            store
                .create_show(&ShowInput {
                    venue_id: venue.id,
                    artist_id: artist.id,
                    start_time: anchor() + Duration::hours(offset),
                })
                .unwrap();
        }
        assert_eq!(
            store
                .count_shows_for_entity(EntityKind::Venue, venue.id, anchor())
                .unwrap(),
            2
        );
        assert_eq!(
            store
                .count_shows_for_entity(EntityKind::Artist, artist.id, anchor())
                .unwrap(),
            2
        );
    }

    #[test]
    fn all_shows_are_ordered_by_start_time() {
        let store = Store::open_in_memory().unwrap();
        let venue = store.create_venue(&venue_input("Blue Note", "NY", "NY")).unwrap();
        let artist = store.create_artist(&artist_input("Miles Set")).unwrap();
        for offset in [7, -1, 3] {
            store
                .create_show(&ShowInput {
                    venue_id: venue.id,
                    artist_id: artist.id,
                    start_time: anchor() + Duration::days(offset),
                })
                .unwrap();
        }
        let starts: Vec<_> = store
            .all_shows()
            .unwrap()
            .into_iter()
            .map(|show| show.start_time)
            .collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn name_filter_is_case_insensitive_and_literal() {
        let store = Store::open_in_memory().unwrap();
        store.create_venue(&venue_input("Grand Palace", "NY", "NY")).unwrap();
        store.create_venue(&venue_input("100% Club", "NY", "NY")).unwrap();
        store.create_venue(&venue_input("The Dive", "LA", "CA")).unwrap();

        let hits = store
            .filter_by_name_substring(EntityKind::Venue, "ACE")
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Grand Palace");

        let percent = store.filter_by_name_substring(EntityKind::Venue, "%").unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].name, "100% Club");

        assert_eq!(
            store.filter_by_name_substring(EntityKind::Venue, "").unwrap().len(),
            3
        );
    }

    #[test]
    fn name_filter_folds_non_ascii_case() {
        let store = Store::open_in_memory().unwrap();
        store.create_venue(&venue_input("CAFÉ ÖLAND", "Borgholm", "H")).unwrap();
        store.create_artist(&artist_input("Ålborg Ensemble")).unwrap();

        for term in ["café", "öland", "É Ö", "CAFÉ ÖLAND"] {
            let hits = store.filter_by_name_substring(EntityKind::Venue, term).unwrap();
            assert_eq!(hits.len(), 1, "term {term:?}");
            assert_eq!(hits[0].name, "CAFÉ ÖLAND");
        }
        assert_eq!(
            store.filter_by_name_substring(EntityKind::Artist, "ålBORG").unwrap().len(),
            1
        );
        assert!(store
            .filter_by_name_substring(EntityKind::Venue, "cafe")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn regions_are_distinct_exact_pairs() {
        let store = Store::open_in_memory().unwrap();
        store.create_venue(&venue_input("A", "NY", "NY")).unwrap();
        store.create_venue(&venue_input("B", "NY", "NY")).unwrap();
        store.create_venue(&venue_input("C", "ny", "NY")).unwrap();
        let regions = store.distinct_regions().unwrap();
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn recent_lists_newest_first() {
        let store = Store::open_in_memory().unwrap();
        for name in ["first", "second", "third"] {
            store.create_artist(&artist_input(name)).unwrap();
        }
        let recent = store.recent(EntityKind::Artist, 2).unwrap();
        let names: Vec<_> = recent.into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["third", "second"]);
    }
}
