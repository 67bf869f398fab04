#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms, missing_debug_implementations)]

use std::{
    error::Error,
    io::{self, BufRead, Write},
    sync::Arc,
};

use clap::{Parser, Subcommand};
use log::{info, warn};
use roosty_reminder::{
    config::Config,
    content::{ContentProvider, HttpContentProvider, NoContent},
    notifications::{Notification, NotificationFeed},
    speaker::{CommandSpeaker, LogSpeaker, Speaker},
    AlarmId, AlarmRequest, Created, Reminders,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// write the default config file
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// start the reminder shell (the default)
    Run,
}

/// commands understood by the shell, one per line
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct Line {
    #[command(subcommand)]
    command: Option<ShellCommand>,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// add an alarm: add 2030-01-31 07:30 take the bins out --news
    Add {
        date: String,
        time: String,
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
        #[arg(long)]
        news: bool,
        #[arg(long)]
        weather: bool,
    },
    /// list the alarms waiting to ring
    List,
    /// delete an alarm by id
    Delete { id: AlarmId },
    /// show the news feed
    News,
    /// hide a news item from the feed
    Dismiss {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    Quit,
}

#[derive(Serialize)]
struct Listing {
    alarms: Vec<roosty_reminder::AlarmSnapshot>,
}

struct Shell {
    config: Config,
    reminders: Reminders,
    feed: NotificationFeed,
    notifications: Vec<Notification>,
}

impl Shell {
    fn new(config: Config) -> Self {
        let content: Arc<dyn ContentProvider> = match HttpContentProvider::new(
            config.news.clone(),
            config.weather.clone(),
            config.health.clone(),
        ) {
            Ok(provider) => Arc::new(provider),
            Err(e) => {
                warn!("content fetching disabled: {e}");
                Arc::new(NoContent)
            }
        };
        let speaker: Arc<dyn Speaker> = match &config.speaker.command {
            Some(program) => Arc::new(CommandSpeaker::new(
                program.clone(),
                config.speaker.args.clone(),
            )),
            None => Arc::new(LogSpeaker),
        };
        let reminders = Reminders::new(Arc::clone(&content), speaker, config.retry_policy());
        Self {
            config,
            reminders,
            feed: NotificationFeed::new(content),
            notifications: vec![],
        }
    }

    /// returns true when the shell should exit
    fn respond(&mut self, line: &str) -> Result<bool, Box<dyn Error>> {
        let args = shlex::split(line).ok_or("error: invalid quoting")?;
        let line = Line::try_parse_from(args)?;
        match line.command {
            Some(ShellCommand::Add {
                date,
                time,
                message,
                news,
                weather,
            }) => {
                let request = AlarmRequest {
                    message: message.join(" "),
                    date,
                    time,
                    include_news: news,
                    include_weather: weather,
                };
                match self.reminders.create_alarm(&request)? {
                    Created::Scheduled(alarm) => {
                        println!("alarm {} set for {}", alarm.id, alarm.trigger);
                    }
                    Created::Expired(alarm) => {
                        println!("{} has already passed, alarm not set", alarm.trigger);
                    }
                }
            }
            Some(ShellCommand::List) => {
                let listing = Listing {
                    alarms: self.reminders.alarms(),
                };
                print!("{}", toml::to_string(&listing)?);
            }
            Some(ShellCommand::Delete { id }) => {
                if self.reminders.delete_alarm(id) {
                    println!("alarm {id} deleted");
                } else {
                    println!("no alarm {id}");
                }
            }
            Some(ShellCommand::News) => {
                self.notifications = self
                    .feed
                    .refresh(self.config.news.quantity, self.config.notifications.extras);
                for notification in &self.notifications {
                    println!("* {}\n  {}", notification.title, notification.content);
                }
            }
            Some(ShellCommand::Dismiss { title }) => {
                let title = title.join(" ");
                if self.feed.dismiss(&title, &self.notifications) {
                    self.notifications.retain(|n| n.title != title);
                } else {
                    println!("no notification titled `{title}`");
                }
            }
            Some(ShellCommand::Quit) => return Ok(true),
            None => {}
        }
        Ok(false)
    }
}

fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let mut shell = Shell::new(config);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match shell.respond(line) {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => println!("{err}"),
        }
    }
    info!("shell closed with {} alarm(s) pending", shell.reminders.pending());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("roosty_reminder")
        .map_err(|e| format!("couldn't initialize logger: {e:?}"))?;

    let args = Args::parse();
    let path = Config::config_path()?;
    match args.command {
        Some(Command::Init { force }) => {
            if force || !Config::is_config_present() {
                Config::new().save(&path)?;
                println!("wrote {}", path.display());
            } else {
                println!("{} already exists, use --force to overwrite", path.display());
            }
            Ok(())
        }
        Some(Command::Run) | None => {
            let config = if path.exists() {
                Config::load(&path)?
            } else {
                Config::new()
            };
            run(config)
        }
    }
}
