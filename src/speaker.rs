//! Text to speech sinks and the busy-retry policy used when ringing.

use std::{
    process::Command,
    sync::{Mutex, TryLockError},
    thread,
    time::Duration,
};

use log::{info, warn};

use crate::error::SpeakError;

pub trait Speaker: Send + Sync {
    /// Speak `text`, blocking until the utterance is finished.
    ///
    /// # Errors
    /// [`SpeakError::Busy`] if another utterance is in progress
    fn say(&self, text: &str) -> Result<(), SpeakError>;
}

/// How long to wait between attempts while the speaker is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    /// `None` keeps retrying until the speaker accepts
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Hand `text` to `speaker`, sleeping `interval` after every busy answer.
    ///
    /// Returns the number of attempts it took.
    ///
    /// # Errors
    /// any non busy failure straight away, or [`SpeakError::Busy`] once
    /// `max_attempts` have been used up
    pub fn speak(&self, speaker: &dyn Speaker, text: &str, label: &str) -> Result<u32, SpeakError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match speaker.say(text) {
                Ok(()) => return Ok(attempts),
                Err(SpeakError::Busy) => {
                    if self.max_attempts.is_some_and(|max| attempts >= max) {
                        return Err(SpeakError::Busy);
                    }
                    warn!(
                        "speech for {label} collided, waiting {}ms (attempt {attempts})",
                        self.interval.as_millis()
                    );
                    thread::sleep(self.interval);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Runs an external text to speech program, e.g. `espeak`.
#[derive(Debug)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    speaking: Mutex<()>,
}

impl CommandSpeaker {
    #[must_use]
    pub const fn new(program: String, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            speaking: Mutex::new(()),
        }
    }
}

impl Speaker for CommandSpeaker {
    fn say(&self, text: &str) -> Result<(), SpeakError> {
        // a poisoned guard only means an earlier utterance panicked
        let _guard = match self.speaking.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(SpeakError::Busy),
        };
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .status()
            .map_err(SpeakError::Spawn)?;
        if status.success() {
            Ok(())
        } else {
            Err(SpeakError::Exit(status))
        }
    }
}

/// Prints utterances instead of speaking them.
#[derive(Debug, Default)]
pub struct LogSpeaker;

impl Speaker for LogSpeaker {
    fn say(&self, text: &str) -> Result<(), SpeakError> {
        info!("speaking: {text}");
        println!("🐓 {text}");
        Ok(())
    }
}
