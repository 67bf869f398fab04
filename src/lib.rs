#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms, missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

//! A clock that speaks your reminders, optionally with the news, the weather
//! and the latest public health figures.

pub mod alarm;
pub mod config;
pub mod content;
pub mod error;
pub mod notifications;
pub mod registry;
pub mod reminders;
pub mod scheduler;
pub mod speaker;

pub use alarm::{Alarm, AlarmId, AlarmRequest, AlarmSnapshot, Trigger};
pub use error::{Error, Result};
pub use reminders::{Created, DeleteOrigin, Reminders};
