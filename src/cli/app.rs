//! CLI module for the countdowns application
//!
//! This module turns parsed commands into calls on the event service and
//! renders the results to the terminal.
use std::{path::PathBuf, sync::Arc};

use console::{style, Term};
use log::{debug, info};
use serde_json::json;

use crate::{
    format_date, parse_date, Commands, Config, Countdown, CountdownError, CountdownTicker, Event,
    EventDraft, EventPatch, EventService, KeyValueStore, Result, StoreChange, DEFAULT_COLOR,
    DEFAULT_ICON,
};

/// CLI Application handler - processes CLI commands and interfaces with the
/// event service
pub struct App<S> {
    /// The event service
    service: Arc<EventService<S>>,

    /// Application configuration
    config: Config,

    /// Where `config` was loaded from
    config_path: PathBuf,

    /// Whether to display verbose output
    verbose: bool,
}

impl<S: KeyValueStore> App<S> {
    /// Create a new CLI application with the given service and config
    pub fn new(
        service: Arc<EventService<S>>,
        config: Config,
        config_path: PathBuf,
        verbose: bool,
    ) -> Self {
        Self {
            service,
            config,
            config_path,
            verbose,
        }
    }

    /// Run the CLI application with the given command
    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Add {
                name,
                date,
                description,
                category,
                color,
                icon,
            } => {
                let draft = EventDraft {
                    name,
                    date: parse_date(&date)?,
                    description,
                    category,
                    color: Some(color.unwrap_or_else(|| DEFAULT_COLOR.to_string())),
                    icon: Some(icon.unwrap_or_else(|| DEFAULT_ICON.to_string())),
                };
                let event = self.service.create_event(draft).await?;
                println!("Created event {}", style(&event.id).cyan());
                self.print_event(&event);
            }

            Commands::List { search, json } => self.list_events(search, json).await?,

            Commands::Show { id, json } => {
                let event = self.find_event(&id).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&self.with_countdown(&event))?);
                } else {
                    self.print_event(&event);
                }
            }

            Commands::Edit {
                id,
                name,
                date,
                description,
                category,
                color,
                icon,
            } => {
                let patch = EventPatch {
                    name,
                    date: date.as_deref().map(parse_date).transpose()?,
                    description,
                    category,
                    color,
                    icon,
                };
                if patch.is_empty() {
                    return Err(CountdownError::validation(
                        "Nothing to update: pass at least one field to change",
                    ));
                }
                let event = self.service.update_event(&id, patch).await?;
                println!("Updated event {}", style(&event.id).cyan());
                self.print_event(&event);
            }

            Commands::Delete { id } => {
                self.service.delete_event(&id).await?;
                println!("Deleted event {}", id);
            }

            Commands::Watch { id, ticks } => self.watch_event(&id, ticks).await?,

            Commands::Config { show, reset } => self.handle_config(show, reset)?,
        }

        Ok(())
    }

    async fn find_event(&self, id: &str) -> Result<Event> {
        self.service
            .get_event(id)
            .await?
            .ok_or_else(|| CountdownError::EventNotFound { id: id.to_string() })
    }

    async fn list_events(&self, search: Option<String>, json: bool) -> Result<()> {
        self.service.load_events().await?;
        let agenda = self.service.agenda(search.as_deref().unwrap_or(""));

        let events: Vec<&Event> = agenda.next.iter().chain(agenda.others.iter()).collect();

        if json {
            let listed: Vec<_> = events.iter().map(|event| self.with_countdown(event)).collect();
            println!("{}", serde_json::to_string_pretty(&listed)?);
            return Ok(());
        }

        if events.is_empty() {
            match search {
                Some(query) => println!("No events found matching query: \"{}\"", query),
                None => println!("No events yet. Create one with `countdowns add`."),
            }
            return Ok(());
        }

        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, event) in events.iter().enumerate() {
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            } else {
                println!("{}", style("Next up").bold().underlined());
            }
            self.print_event(event);
        }

        println!("\n{} event(s).", events.len());
        Ok(())
    }

    fn print_event(&self, event: &Event) {
        let countdown = self.service.countdown_now(event.date);

        println!("ID: {} | Date: {}", event.id, format_date(event.date));
        println!("Name: {}", style(&event.name).bold());
        if let Some(category) = &event.category {
            println!("Category: {}", style(category).cyan());
        }
        if let Some(description) = &event.description {
            println!("{}", description);
        }
        println!("{}", styled_countdown(&countdown));

        if self.verbose {
            println!(
                "Created: {} | Updated: {}",
                format_date(event.created_at),
                format_date(event.updated_at)
            );
        }
    }

    async fn watch_event(&self, id: &str, ticks: Option<u64>) -> Result<()> {
        let event = self.find_event(id).await?;
        let mut changes = self.service.store().subscribe();
        let mut ticker = CountdownTicker::start(event.date, self.config.refresh_interval());
        let mut values = ticker.subscribe();
        let term = Term::stdout();

        println!("{} ({})", style(&event.name).bold(), format_date(event.date));
        term.write_str(&styled_countdown(&ticker.latest()))?;

        let mut remaining = ticks;
        loop {
            tokio::select! {
                changed = values.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let countdown = *values.borrow_and_update();
                    term.clear_line()?;
                    term.write_str(&styled_countdown(&countdown))?;

                    if let Some(left) = remaining.as_mut() {
                        *left = left.saturating_sub(1);
                        if *left == 0 {
                            break;
                        }
                    }
                }
                change = changes.recv(), if changes.is_active() => match change {
                    Some(StoreChange::Updated(updated)) if updated.id == event.id => {
                        if updated.date != ticker.target() {
                            debug!("Watched event moved to {}", updated.date);
                            ticker.retarget(updated.date).await?;
                        }
                    }
                    Some(StoreChange::Deleted { id: deleted }) if deleted == event.id => {
                        info!("Watched event {} was deleted", deleted);
                        break;
                    }
                    Some(_) => {}
                    None => changes.unsubscribe(),
                },
                _ = tokio::signal::ctrl_c() => {
                    debug!("Interrupted");
                    break;
                }
            }
        }

        term.write_line("")?;
        changes.unsubscribe();
        ticker.stop().await
    }

    fn with_countdown(&self, event: &Event) -> serde_json::Value {
        json!({
            "event": event,
            "countdown": self.service.countdown_now(event.date),
        })
    }

    fn handle_config(&self, show: bool, reset: bool) -> Result<()> {
        if reset {
            Config::default().save(&self.config_path)?;
            println!(
                "Configuration reset to defaults at {}",
                self.config_path.display()
            );
        }

        if show || !reset {
            println!("Configuration file: {}", self.config_path.display());
            println!(
                "{}",
                serde_json::to_string_pretty(&self.shown_config(reset))?
            );
        }
        Ok(())
    }

    /// The configuration in effect once a `config` command has run.
    fn shown_config(&self, reset: bool) -> Config {
        if reset {
            Config::default()
        } else {
            self.config.clone()
        }
    }
}

fn styled_countdown(countdown: &Countdown) -> String {
    if countdown.is_overdue {
        format!("{} {}", style("Overdue by").red(), style(countdown).red().bold())
    } else {
        format!("{} {}", style("Starts in").green(), style(countdown).green().bold())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventPersistence, EventStore, MemoryStore, ReadFailurePolicy};

    fn app_with(config: Config) -> App<MemoryStore> {
        let persistence = EventPersistence::new(
            Arc::new(MemoryStore::new()),
            "@events",
            ReadFailurePolicy::Surface,
        );
        let service = Arc::new(EventService::new(Arc::new(EventStore::new(persistence))));
        App::new(service, config, PathBuf::from("config.json"), false)
    }

    #[test]
    fn reset_shows_defaults_instead_of_loaded_config() {
        let custom = Config {
            storage_key: "@custom".to_string(),
            refresh_interval_ms: 42,
            ..Config::default()
        };
        let app = app_with(custom.clone());

        assert_eq!(app.shown_config(false), custom);
        assert_eq!(app.shown_config(true), Config::default());
    }

    #[tokio::test]
    async fn reset_and_show_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let custom = Config {
            refresh_interval_ms: 42,
            ..Config::default()
        };
        custom.save(&path).unwrap();

        let mut app = app_with(custom);
        app.config_path = path.clone();
        app.run(Commands::Config {
            show: true,
            reset: true,
        })
        .await
        .unwrap();

        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }
}
