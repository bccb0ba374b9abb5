//! Create, edit and delete flows for venues, artists and shows.
//!
//! Each flow is a single store write. The result is reported as a [`Notice`];
//! only an unknown id escapes as an error, so the caller can answer not-found.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::db::EntityStore;
use crate::error::{BookingError, Result};
use crate::forms::{parse_show, Submission};
use crate::models::{ArtistInput, EntityKind, VenueInput};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Record the notice is about, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl Notice {
    fn success(message: String, id: Option<i64>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message,
            id,
        }
    }

    fn failure(message: String, id: Option<i64>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message,
            id,
        }
    }

    pub fn is_success(&self) -> bool {
        self.level == NoticeLevel::Success
    }
}

#[derive(Clone, Copy)]
enum Action {
    Listed,
    Updated,
    Deleted,
}

impl Action {
    fn past(self) -> &'static str {
        match self {
            Action::Listed => "listed",
            Action::Updated => "updated",
            Action::Deleted => "deleted",
        }
    }
}

fn report(kind: EntityKind, name: &str, action: Action, outcome: Result<i64>) -> Notice {
    match outcome {
        Ok(id) => {
            info!(%kind, id, name, action = action.past(), "record written");
            Notice::success(
                format!("{kind} {name} was successfully {}!", action.past()),
                Some(id),
            )
        }
        Err(err) => {
            error!(%kind, name, action = action.past(), error = %err, "record write failed");
            Notice::failure(
                format!("An error occurred. {kind} {name} could not be {}.", action.past()),
                None,
            )
        }
    }
}

fn submitted_name(submission: &Submission) -> &str {
    submission.get("name").unwrap_or_default()
}

pub fn create_venue<S>(store: &S, submission: &Submission) -> Notice
where
    S: EntityStore + ?Sized,
{
    let outcome = VenueInput::try_from(submission)
        .and_then(|input| store.create_venue(&input))
        .map(|venue| venue.id);
    report(EntityKind::Venue, submitted_name(submission), Action::Listed, outcome)
}

pub fn create_artist<S>(store: &S, submission: &Submission) -> Notice
where
    S: EntityStore + ?Sized,
{
    let outcome = ArtistInput::try_from(submission)
        .and_then(|input| store.create_artist(&input))
        .map(|artist| artist.id);
    report(EntityKind::Artist, submitted_name(submission), Action::Listed, outcome)
}

/// Overwrite every field of venue `id`. Unknown ids are returned as `NotFound`.
pub fn update_venue<S>(store: &S, id: i64, submission: &Submission) -> Result<Notice>
where
    S: EntityStore + ?Sized,
{
    store.display(EntityKind::Venue, id)?;
    let outcome = VenueInput::try_from(submission)
        .and_then(|input| store.update_venue(id, &input))
        .map(|venue| venue.id);
    escalate_not_found(outcome.as_ref().err())?;
    Ok(report(EntityKind::Venue, submitted_name(submission), Action::Updated, outcome))
}

/// Overwrite every field of artist `id`. Unknown ids are returned as `NotFound`.
pub fn update_artist<S>(store: &S, id: i64, submission: &Submission) -> Result<Notice>
where
    S: EntityStore + ?Sized,
{
    store.display(EntityKind::Artist, id)?;
    let outcome = ArtistInput::try_from(submission)
        .and_then(|input| store.update_artist(id, &input))
        .map(|artist| artist.id);
    escalate_not_found(outcome.as_ref().err())?;
    Ok(report(EntityKind::Artist, submitted_name(submission), Action::Updated, outcome))
}

/// Delete a venue or artist together with its shows.
pub fn delete<S>(store: &S, kind: EntityKind, id: i64) -> Result<Notice>
where
    S: EntityStore + ?Sized,
{
    let name = match store.display(kind, id) {
        Ok(found) => found.name,
        Err(err @ BookingError::NotFound { .. }) => {
            warn!(%kind, id, "delete of unknown record");
            return Err(err);
        }
        Err(err) => {
            return Ok(report(kind, &id.to_string(), Action::Deleted, Err(err)));
        }
    };
    let outcome = store.delete(kind, id).map(|()| id);
    escalate_not_found(outcome.as_ref().err())?;
    Ok(report(kind, &name, Action::Deleted, outcome))
}

pub fn create_show<S>(store: &S, submission: &Submission, now: DateTime<Utc>, tz: Tz) -> Notice
where
    S: EntityStore + ?Sized,
{
    let outcome = parse_show(submission, now, tz).and_then(|input| store.create_show(&input));
    match outcome {
        Ok(show) => {
            info!(
                id = show.id,
                venue_id = show.venue_id,
                artist_id = show.artist_id,
                "show listed"
            );
            Notice::success("Show was successfully listed!".to_string(), Some(show.id))
        }
        Err(err) => {
            error!(error = %err, "show listing failed");
            Notice::failure("An error occurred. Show could not be listed.".to_string(), None)
        }
    }
}

/// A record can vanish between the existence check and the write.
fn escalate_not_found(err: Option<&BookingError>) -> Result<()> {
    match err {
        Some(BookingError::NotFound { kind, id }) => Err(BookingError::not_found(*kind, *id)),
        _ => Ok(()),
    }
}
