use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, Text};
use panel_core::{
    Config, ConfiguredLocation, FileStore, KeyValueStore, LocationCoords, StatusController,
    state::{Event, ViewState, reduce},
    view,
};
use std::{
    io::{IsTerminal, Write},
    sync::Arc,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "panel", version, about = "Status panel for the hello backend")]
pub struct Cli {
    /// Override the configured API base URL for this run.
    #[arg(long, global = true)]
    pub api: Option<String>,

    /// Latitude to report as the device position. Grants location access for this run.
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude to report as the device position.
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub lng: Option<f64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively edit the configuration file.
    Configure,

    /// Keep the panel on screen, polling the backend. Enter refreshes, `q` quits.
    Watch,

    /// Fetch once (falling back to the cached copy) and print the panel.
    Fetch,

    /// Resolve the device location once and print it.
    Locate,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Watch => {
                let config = self.config()?;
                watch(&config).await
            }
            Command::Fetch => {
                let config = self.config()?;
                fetch_once(&config).await
            }
            Command::Locate => {
                let config = self.config()?;
                locate(&config).await
            }
        }
    }

    /// Config from disk with command-line overrides applied.
    fn config(&self) -> Result<Config> {
        let mut config = Config::load()?;

        if let Some(api) = &self.api {
            config.api_base_url = api.clone();
        }

        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => config.set_location(LocationCoords::new(lat, lng)?),
            (None, None) => {}
            _ => bail!("--lat and --lng must be given together"),
        }

        config.validate()?;
        Ok(config)
    }
}

fn open_store() -> Result<Arc<dyn KeyValueStore>> {
    let path = Config::store_file_path()?;
    tracing::debug!(path = %path.display(), "Using durable store");
    Ok(Arc::new(FileStore::new(path)))
}

fn controller(config: &Config) -> Result<StatusController> {
    let location = ConfiguredLocation::new(config.location.enabled, config.location.coords()?);
    StatusController::from_config(config, open_store()?, Arc::new(location))
}

async fn watch(config: &Config) -> Result<()> {
    let controller = controller(config)?;
    let mut updates = controller.subscribe();
    let clear = std::io::stdout().is_terminal();

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    controller.mount();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        draw(&controller, config, clear)?;

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line.context("Failed to read from stdin")? {
                    Some(line) if line.trim().eq_ignore_ascii_case("q") => break,
                    Some(_) => {
                        if !controller.refresh() {
                            tracing::info!("Refresh already in progress");
                        }
                    }
                    None => stdin_open = false,
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    controller.unmount();
    Ok(())
}

fn draw(controller: &StatusController, config: &Config, clear: bool) -> Result<()> {
    let text = render::panel(&controller.view(), config);
    let mut out = std::io::stdout().lock();
    if clear {
        write!(out, "\x1b[2J\x1b[H")?;
    }
    writeln!(out, "{text}")?;
    writeln!(out, "[Enter] refresh   [q] quit")?;
    out.flush()?;
    Ok(())
}

async fn fetch_once(config: &Config) -> Result<()> {
    let controller = controller(config)?;
    let outcome = controller.fetcher().fetch_or_cached().await;

    // Same reducer and renderer as the live view, driven by hand.
    let events = [
        Event::Mounted,
        Event::FetchStarted { seq: 1 },
        Event::FetchCompleted { seq: 1, outcome },
    ];
    let state = events.into_iter().fold(ViewState::default(), reduce);
    let rendered = view::render(&state, controller.render_options());

    println!("{}", render::panel(&rendered, config));

    if rendered.data.is_none() {
        bail!("No data available from {} and nothing cached", config.api_base_url);
    }
    Ok(())
}

async fn locate(config: &Config) -> Result<()> {
    let controller = controller(config)?;
    let (coords, info) = controller
        .resolver()
        .resolve()
        .await
        .context("Failed to resolve location")?;

    if let Some(city) = &info.city {
        println!("City: {city}");
    }
    if let Some(country) = &info.country {
        println!("Country: {country}");
    }
    println!("Coordinates: {}", coords.display());
    println!("Map: {}", controller.render_options().map.url(coords));
    Ok(())
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_base_url = Text::new("Backend base URL:")
        .with_default(&config.api_base_url)
        .prompt()?;
    config.api_base_url = api_base_url;

    config.poll_interval_secs = CustomType::<u64>::new("Poll interval (seconds):")
        .with_default(config.poll_interval_secs)
        .with_error_message("Please enter a whole number of seconds")
        .prompt()?;

    let share = Confirm::new("Share your location with the panel?")
        .with_default(config.location.enabled)
        .prompt()?;

    if share {
        let lat = CustomType::<f64>::new("Latitude:")
            .with_default(config.location.latitude.unwrap_or(51.5074))
            .prompt()?;
        let lng = CustomType::<f64>::new("Longitude:")
            .with_default(config.location.longitude.unwrap_or(-0.1278))
            .prompt()?;
        config.set_location(LocationCoords::new(lat, lng)?);
    } else {
        config.location.enabled = false;
    }

    config.validate()?;
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
