use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::admin::{self, Notice};
use crate::db::EntityStore;
use crate::error::{BookingError, Result};
use crate::forms::Submission;
use crate::models::EntityKind;
use crate::pages::{self, RenderContext};

#[derive(Debug, Parser)]
#[command(name = "fyyur", version, about = "Browse and manage venues, artists and shows")]
pub struct Cli {
    /// SQLite database to use instead of the configured one.
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Most recently listed venues and artists.
    Home,
    /// Venues grouped by city and state.
    Venues,
    Venue { id: i64 },
    /// Current values of a venue, for editing.
    VenueForm { id: i64 },
    SearchVenues {
        #[arg(default_value = "")]
        search_term: String,
    },
    /// Fields as key=value, e.g. `name="Blue Note" seeking_talent=y`.
    CreateVenue { fields: Vec<String> },
    EditVenue { id: i64, fields: Vec<String> },
    DeleteVenue { id: i64 },
    Artists,
    Artist { id: i64 },
    ArtistForm { id: i64 },
    SearchArtists {
        #[arg(default_value = "")]
        search_term: String,
    },
    CreateArtist { fields: Vec<String> },
    EditArtist { id: i64, fields: Vec<String> },
    DeleteArtist { id: i64 },
    /// All shows, earliest first.
    Shows,
    /// Fields: venue_id, artist_id, start_time.
    CreateShow { fields: Vec<String> },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    Show,
    Set { key: String, value: String },
}

/// A response body plus the HTTP-equivalent status it would be served with.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub status: u16,
    pub body: Value,
}

impl Rendered {
    pub fn ok<T: Serialize>(body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status: 200, body },
            Err(err) => {
                error!(error = %err, "page serialization failed");
                Self::failure(500, "An internal error occurred.")
            }
        }
    }

    fn notice(notice: &Notice) -> Self {
        let mut rendered = Self::ok(notice);
        if rendered.is_success() && !notice.is_success() {
            rendered.status = 422;
        }
        rendered
    }

    fn failure(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "status": status, "message": message }),
        }
    }

    fn from_error(err: &BookingError) -> Self {
        match err {
            BookingError::NotFound { .. } => Self::failure(404, &err.to_string()),
            BookingError::Validation(message) => Self::failure(422, message),
            BookingError::StoreUnavailable(cause) => {
                error!(error = %cause, "store call failed");
                Self::failure(500, "An internal error occurred.")
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// Run one store-backed command. `Config` is handled by the caller.
pub fn execute<S>(store: &S, command: Command, ctx: RenderContext, recent_limit: usize) -> Rendered
where
    S: EntityStore + ?Sized,
{
    match dispatch(store, command, ctx, recent_limit) {
        Ok(rendered) => rendered,
        Err(err) => Rendered::from_error(&err),
    }
}

fn dispatch<S>(
    store: &S,
    command: Command,
    ctx: RenderContext,
    recent_limit: usize,
) -> Result<Rendered>
where
    S: EntityStore + ?Sized,
{
    let rendered = match command {
        Command::Home => Rendered::ok(&pages::home(store, recent_limit)?),
        Command::Venues => Rendered::ok(&pages::venues(store, ctx)?),
        Command::Venue { id } => Rendered::ok(&pages::venue_detail(store, id, ctx)?),
        Command::VenueForm { id } => Rendered::ok(&pages::venue_form(store, id)?),
        Command::SearchVenues { search_term } => Rendered::ok(&pages::search_page(
            store,
            EntityKind::Venue,
            &search_term,
            ctx,
        )?),
        Command::CreateVenue { fields } => {
            Rendered::notice(&admin::create_venue(store, &Submission::from_args(&fields)?))
        }
        Command::EditVenue { id, fields } => Rendered::notice(&admin::update_venue(
            store,
            id,
            &Submission::from_args(&fields)?,
        )?),
        Command::DeleteVenue { id } => {
            Rendered::notice(&admin::delete(store, EntityKind::Venue, id)?)
        }
        Command::Artists => Rendered::ok(&pages::artists(store)?),
        Command::Artist { id } => Rendered::ok(&pages::artist_detail(store, id, ctx)?),
        Command::ArtistForm { id } => Rendered::ok(&pages::artist_form(store, id)?),
        Command::SearchArtists { search_term } => Rendered::ok(&pages::search_page(
            store,
            EntityKind::Artist,
            &search_term,
            ctx,
        )?),
        Command::CreateArtist { fields } => {
            Rendered::notice(&admin::create_artist(store, &Submission::from_args(&fields)?))
        }
        Command::EditArtist { id, fields } => Rendered::notice(&admin::update_artist(
            store,
            id,
            &Submission::from_args(&fields)?,
        )?),
        Command::DeleteArtist { id } => {
            Rendered::notice(&admin::delete(store, EntityKind::Artist, id)?)
        }
        Command::Shows => Rendered::ok(&pages::shows(store, ctx)?),
        Command::CreateShow { fields } => Rendered::notice(&admin::create_show(
            store,
            &Submission::from_args(&fields)?,
            ctx.now,
            ctx.tz,
        )),
        Command::Config { .. } => Rendered::failure(400, "config commands do not use the store"),
    };
    Ok(rendered)
}
