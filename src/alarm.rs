use std::{
    fmt,
    num::ParseIntError,
    str::FromStr,
    time::{Duration, SystemTime},
};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::{
    content::{ContentProvider, Depth},
    error::{Error, Result},
    speaker::{RetryPolicy, Speaker},
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Identity of an alarm, handed out in creation order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(pub u64);

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AlarmId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// The minute an alarm should go off at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(with = "toml_datetime_compat")]
    pub date: NaiveDate,
    #[serde(with = "toml_datetime_compat")]
    pub time: NaiveTime,
}

impl Trigger {
    /// Parse a `YYYY-MM-DD` date and an `HH:MM` time.
    ///
    /// # Errors
    /// if either half is malformed
    pub fn parse(date: &str, time: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|source| {
            Error::InvalidDate {
                input: date.to_string(),
                source,
            }
        })?;
        let time = NaiveTime::parse_from_str(time.trim(), TIME_FORMAT).map_err(|source| {
            Error::InvalidTime {
                input: time.to_string(),
                source,
            }
        })?;
        Ok(Self { date, time })
    }

    #[must_use]
    pub fn naive(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.date, self.time)
    }

    /// The trigger as a wall clock instant in the local timezone.
    ///
    /// Alarms sharing a trigger map to the same instant, which is what lets
    /// priority break the tie.
    /// Returns `None` for local times skipped by a DST change.
    #[must_use]
    pub fn instant(&self) -> Option<SystemTime> {
        Local
            .from_local_datetime(&self.naive())
            .earliest()
            .map(SystemTime::from)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.date.format(DATE_FORMAT),
            self.time.format(TIME_FORMAT)
        )
    }
}

/// What a user submits to create an alarm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmRequest {
    pub message: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub include_news: bool,
    pub include_weather: bool,
}

/// represents an alarm
/// everything needed to work out when it rings and what it says
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    id: AlarmId,
    message: String,
    trigger: Trigger,
    include_news: bool,
    include_weather: bool,
    priority: u32,
}

/// Read only view of an alarm for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSnapshot {
    pub title: String,
    pub content: String,
    pub news: bool,
    pub weather: bool,
    pub id: AlarmId,
    pub priority: u32,
    pub trigger: Trigger,
}

impl Alarm {
    /// Build an alarm from a request.
    ///
    /// Priority is one more than the number of `existing` alarms with the same
    /// trigger, so the newest of a set of colliding alarms rings first.
    ///
    /// # Errors
    /// if the request's date or time can't be parsed
    pub fn create<'a>(
        id: AlarmId,
        request: &AlarmRequest,
        existing: impl IntoIterator<Item = &'a Self>,
    ) -> Result<Self> {
        let trigger = Trigger::parse(&request.date, &request.time)?;
        let colliding = existing
            .into_iter()
            .filter(|alarm| alarm.trigger == trigger)
            .count();
        let priority = u32::try_from(colliding).unwrap_or(u32::MAX - 1) + 1;
        info!("alarm {id} created for {trigger} with priority {priority}");
        Ok(Self {
            id,
            message: request.message.clone(),
            trigger,
            include_news: request.include_news,
            include_weather: request.include_weather,
            priority,
        })
    }

    #[must_use]
    pub const fn id(&self) -> AlarmId {
        self.id
    }

    #[must_use]
    pub const fn trigger(&self) -> Trigger {
        self.trigger
    }

    #[must_use]
    pub const fn priority(&self) -> u32 {
        self.priority
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn title(&self) -> String {
        format!("{}:{}", self.message, self.id)
    }

    /// Whole seconds from `now` until the trigger, negative once it has passed.
    #[must_use]
    pub fn seconds_until_due(&self, now: NaiveDateTime) -> i64 {
        (self.trigger.naive() - now).num_seconds()
    }

    /// The instant the alarm rings at and the whole seconds from `now` until
    /// it, negative once it has passed. Both come from the same instant, so
    /// an alarm in a repeated DST hour is judged by when it will really ring.
    ///
    /// A trigger skipped by a DST change rings after the naive local wait.
    #[must_use]
    pub fn due(&self, now: DateTime<Local>) -> (SystemTime, i64) {
        if let Some(due) = self.trigger.instant() {
            return (due, (DateTime::<Local>::from(due) - now).num_seconds());
        }
        let seconds = self.seconds_until_due(now.naive_local());
        (
            SystemTime::from(now) + Duration::from_secs(seconds.unsigned_abs()),
            seconds,
        )
    }

    #[must_use]
    pub fn snapshot(&self) -> AlarmSnapshot {
        AlarmSnapshot {
            title: self.title(),
            content: format!(
                "Time = {}, Date = {}",
                self.trigger.time.format(TIME_FORMAT),
                self.trigger.date.format(DATE_FORMAT)
            ),
            news: self.include_news,
            weather: self.include_weather,
            id: self.id,
            priority: self.priority,
            trigger: self.trigger,
        }
    }

    /// The sentence read out when the alarm rings.
    ///
    /// Content that fails to load is left out rather than stopping the alarm.
    #[must_use]
    pub fn compose_message(&self, content: &dyn ContentProvider) -> String {
        let mut msg = format!(
            "its {} and your reminder is {}",
            self.trigger.time.format(TIME_FORMAT),
            self.message
        );
        let mut append = |segment: &str| {
            if !segment.is_empty() {
                msg.push_str(". ");
                msg.push_str(segment);
            }
        };

        if self.include_news {
            if let Some(item) = content.news(1, &[]).into_iter().next() {
                append(&item.title);
                if item.depth == Depth::Extended {
                    append(item.content.as_deref().unwrap_or_default());
                }
            }
        }
        if self.include_weather {
            append(&content.weather());
        }
        append(&content.health());
        msg
    }

    /// Compose the message and speak it, waiting out a busy speaker.
    ///
    /// Blocks the calling thread until the speaker accepts the message.
    pub fn ring(&self, content: &dyn ContentProvider, speaker: &dyn Speaker, retry: &RetryPolicy) {
        let msg = self.compose_message(content);
        let label = format!("alarm {}", self.id);
        match retry.speak(speaker, &msg, &label) {
            Ok(attempts) => info!("alarm {} has finished ringing after {attempts} attempt(s)", self.id),
            Err(e) => error!("alarm {} couldn't be spoken: {e}", self.id),
        }
    }
}
