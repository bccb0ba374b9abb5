//! Flat key/value submissions and their conversion into validated inputs.
//!
//! A submission is consumed once into a `VenueInput`, `ArtistInput` or
//! `ShowInput`. Boolean flags arrive as `y` or are absent.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{BookingError, Result};
use crate::format::parse_timestamp;
use crate::models::{ArtistInput, ShowInput, VenueInput};

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{3}-\d{3}-\d{4}$").expect("valid phone regex"));
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://[^\s/$.?#][^\s]*$").expect("valid url regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    fields: Vec<(String, String)>,
}

#[cfg(test)]
impl Submission {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, key: &str, value: &str) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }
}

impl Submission {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse `key=value` arguments. Anything without `=` is rejected.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut fields = Vec::with_capacity(args.len());
        for arg in args {
            let arg = arg.as_ref();
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                BookingError::Validation(format!("expected key=value, got {arg:?}"))
            })?;
            fields.push((key.trim().to_string(), value.to_string()));
        }
        Ok(Self { fields })
    }

    /// First non-blank value for `key`, trimmed.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .find(|v| !v.is_empty())
    }

    pub fn all(&self, key: &str) -> impl Iterator<Item = &str> {
        let key = key.to_string();
        self.fields
            .iter()
            .filter(move |(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `y` (or `on`/`true`) means set; absent or anything else means unset.
    pub fn flag(&self, key: &str) -> bool {
        matches!(
            self.get(key).map(str::to_ascii_lowercase).as_deref(),
            Some("y" | "on" | "true")
        )
    }

    /// Every submitted `genres` value, split on commas.
    pub fn genres(&self) -> Vec<String> {
        self.all("genres")
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|genre| !genre.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Default)]
struct Problems(Vec<String>);

impl Problems {
    fn required<'a>(&mut self, submission: &'a Submission, key: &str) -> &'a str {
        match submission.get(key) {
            Some(value) => value,
            None => {
                self.0.push(format!("{key} is required"));
                ""
            }
        }
    }

    fn phone(&mut self, submission: &Submission) -> Option<String> {
        let phone = submission.get("phone")?;
        if !PHONE_RE.is_match(phone) {
            self.0
                .push(format!("phone {phone:?} must look like 555-555-5555"));
        }
        Some(phone.to_string())
    }

    fn link(&mut self, submission: &Submission, key: &str) -> Option<String> {
        let link = submission.get(key)?;
        if !URL_RE.is_match(link) {
            self.0.push(format!("{key} {link:?} is not a valid URL"));
        }
        Some(link.to_string())
    }

    fn id(&mut self, submission: &Submission, key: &str) -> i64 {
        let raw = self.required(submission, key);
        if raw.is_empty() {
            return 0;
        }
        raw.parse().unwrap_or_else(|_| {
            self.0.push(format!("{key} {raw:?} is not a number"));
            0
        })
    }

    fn finish<T>(self, value: T) -> Result<T> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(BookingError::Validation(self.0.join("; ")))
        }
    }
}

fn optional(submission: &Submission, key: &str) -> Option<String> {
    submission.get(key).map(str::to_string)
}

impl TryFrom<&Submission> for VenueInput {
    type Error = BookingError;

    fn try_from(submission: &Submission) -> Result<Self> {
        let mut problems = Problems::default();
        let input = VenueInput {
            name: problems.required(submission, "name").to_string(),
            city: problems.required(submission, "city").to_string(),
            state: problems.required(submission, "state").to_string(),
            address: problems.required(submission, "address").to_string(),
            phone: problems.phone(submission),
            image_link: problems.link(submission, "image_link"),
            facebook_link: problems.link(submission, "facebook_link"),
            website_link: problems.link(submission, "website_link"),
            genres: submission.genres(),
            seeking_talent: submission.flag("seeking_talent"),
            seeking_description: optional(submission, "seeking_description"),
        };
        problems.finish(input)
    }
}

impl TryFrom<&Submission> for ArtistInput {
    type Error = BookingError;

    fn try_from(submission: &Submission) -> Result<Self> {
        let mut problems = Problems::default();
        let input = ArtistInput {
            name: problems.required(submission, "name").to_string(),
            city: problems.required(submission, "city").to_string(),
            state: problems.required(submission, "state").to_string(),
            phone: problems.phone(submission),
            image_link: problems.link(submission, "image_link"),
            facebook_link: problems.link(submission, "facebook_link"),
            website_link: problems.link(submission, "website_link"),
            genres: submission.genres(),
            seeking_venue: submission.flag("seeking_venue"),
            seeking_description: optional(submission, "seeking_description"),
        };
        problems.finish(input)
    }
}

/// Build a show booking. A missing `start_time` means `now`.
pub fn parse_show(submission: &Submission, now: DateTime<Utc>, tz: Tz) -> Result<ShowInput> {
    let mut problems = Problems::default();
    let venue_id = problems.id(submission, "venue_id");
    let artist_id = problems.id(submission, "artist_id");
    let start_time = match submission.get("start_time") {
        Some(raw) => match parse_timestamp(raw, tz) {
            Ok(parsed) => parsed,
            Err(BookingError::Validation(message)) => {
                problems.0.push(message);
                now
            }
            Err(other) => return Err(other),
        },
        None => now,
    };
    problems.finish(ShowInput {
        venue_id,
        artist_id,
        start_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn venue_submission() -> Submission {
        Submission::from_pairs([
            ("name", "The Musical Hop"),
            ("city", "San Francisco"),
            ("state", "CA"),
            ("address", "1015 Folsom Street"),
            ("phone", "123-123-1234"),
            ("genres", "Jazz"),
            ("genres", "Reggae, Swing"),
            ("website_link", "https://www.themusicalhop.com"),
            ("seeking_talent", "y"),
            ("seeking_description", "We are on the lookout for a local artist"),
        ])
    }

    #[test]
    fn venue_submission_parses_once_into_input() {
        let input = VenueInput::try_from(&venue_submission()).unwrap();
        assert_eq!(input.name, "The Musical Hop");
        assert_eq!(input.genres, vec!["Jazz", "Reggae", "Swing"]);
        assert!(input.seeking_talent);
        assert_eq!(input.phone.as_deref(), Some("123-123-1234"));
        assert_eq!(input.facebook_link, None);
    }

    #[test]
    fn absent_or_n_flag_is_false() {
        let mut submission = Submission::from_pairs([
            ("name", "Guns N Petals"),
            ("city", "San Francisco"),
            ("state", "CA"),
        ]);
        assert!(!ArtistInput::try_from(&submission).unwrap().seeking_venue);
        submission = submission.with("seeking_venue", "n");
        assert!(!ArtistInput::try_from(&submission).unwrap().seeking_venue);
        submission = Submission::from_pairs([
            ("name", "Guns N Petals"),
            ("city", "San Francisco"),
            ("state", "CA"),
            ("seeking_venue", "y"),
        ]);
        assert!(ArtistInput::try_from(&submission).unwrap().seeking_venue);
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let err = VenueInput::try_from(&Submission::new().with("name", "  ")).unwrap_err();
        let BookingError::Validation(message) = err else {
            panic!("expected validation error");
        };
        for field in ["name", "city", "state", "address"] {
            assert!(message.contains(&format!("{field} is required")), "{message}");
        }
    }

    #[test]
    fn malformed_phone_and_link_are_rejected() {
        let submission = Submission::from_pairs([
            ("name", "The Dueling Pianos Bar"),
            ("city", "New York"),
            ("state", "NY"),
            ("address", "335 Delancey Street"),
            ("phone", "5551234"),
            ("facebook_link", "facebook dot com"),
        ]);
        let message = VenueInput::try_from(&submission).unwrap_err().to_string();
        assert!(message.contains("phone"), "{message}");
        assert!(message.contains("facebook_link"), "{message}");
        assert!(!message.contains("is required"), "{message}");
    }

    #[test]
    fn show_submission_parses_ids_and_time() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let submission = Submission::from_pairs([
            ("venue_id", "3"),
            ("artist_id", "5"),
            ("start_time", "2035-04-01 20:00:00"),
        ]);
        let show = parse_show(&submission, now, Tz::UTC).unwrap();
        assert_eq!(show.venue_id, 3);
        assert_eq!(show.artist_id, 5);
        assert_eq!(show.start_time, Utc.with_ymd_and_hms(2035, 4, 1, 20, 0, 0).unwrap());
    }

    #[test]
    fn show_without_start_time_defaults_to_now() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let submission = Submission::from_pairs([("venue_id", "1"), ("artist_id", "2")]);
        assert_eq!(parse_show(&submission, now, Tz::UTC).unwrap().start_time, now);
    }

    #[test]
    fn show_with_bad_ids_is_rejected() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let submission = Submission::from_pairs([("venue_id", "abc")]);
        let message = parse_show(&submission, now, Tz::UTC).unwrap_err().to_string();
        assert!(message.contains("venue_id \"abc\" is not a number"), "{message}");
        assert!(message.contains("artist_id is required"), "{message}");
    }

    #[test]
    fn args_must_be_key_value() {
        let parsed = Submission::from_args(&["name=Blue Note", "city=NY"]).unwrap();
        assert_eq!(parsed.get("name"), Some("Blue Note"));
        assert!(Submission::from_args(&["oops"]).is_err());
    }
}
