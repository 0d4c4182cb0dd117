//! `wildwatch` - CLI for the wildlife observation journal
//!
//! This binary records, lists and edits observations and identifies photos.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, info};

use wildwatch::cli::{
    render, AddCommand, Cli, Command, ConfigCommand, EditCommand, IdentifyCommand, ListCommand,
    OutputFormat,
};
use wildwatch::location::{FixedLocationProvider, LocationTracker};
use wildwatch::{init_logging, Config, Error, ImageIdentifier, NewObservation, ObservationStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config_path = cli.config;
    let load = || Config::load_from(config_path.clone());

    match cli.command {
        Command::Add(cmd) => handle_add(&load()?, cmd).await,
        Command::List(cmd) => handle_list(&load()?, &cmd).await,
        Command::Show(cmd) => {
            let store = open_store(&load()?)?;
            let observation = store
                .get_observation(cmd.id.clone())
                .await?
                .ok_or_else(|| Error::not_found(cmd.id))?;
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&observation)?);
            } else {
                print!("{}", render::observation_details(&observation));
            }
            Ok(())
        }
        Command::Edit(cmd) => handle_edit(&load()?, &cmd).await,
        Command::Delete(cmd) => {
            let store = open_store(&load()?)?;
            let removed = store.delete_observation(cmd.id).await?;
            println!("Deleted {}", render::observation_line(&removed));
            Ok(())
        }
        Command::Clear(cmd) => {
            if !cmd.yes {
                println!("This will delete every observation.");
                println!("Use --yes to confirm.");
                return Ok(());
            }
            let store = open_store(&load()?)?;
            store.clear_all_observations().await?;
            println!("All observations deleted.");
            Ok(())
        }
        Command::Identify(cmd) => handle_identify(&load()?, &cmd).await,
        Command::Status(cmd) => handle_status(&load()?, cmd.json).await,
        // Loads on its own so that `validate` can report a broken file.
        Command::Config(cmd) => handle_config(config_path.clone(), cmd),
    }
}

fn open_store(config: &Config) -> wildwatch::Result<ObservationStore> {
    let path = config.database_path();
    debug!("Opening store at {}", path.display());
    ObservationStore::open(path, config.storage.collection_key.clone())
}

fn configured_identifier(config: &Config) -> wildwatch::Result<ImageIdentifier> {
    let identifier = ImageIdentifier::from_config(&config.identification)?;
    if !identifier.is_configured() {
        return Err(Error::IdentificationNotConfigured);
    }
    Ok(identifier)
}

async fn handle_add(config: &Config, cmd: AddCommand) -> anyhow::Result<()> {
    let provider = match (cmd.lat, cmd.lon) {
        (Some(lat), Some(lon)) => FixedLocationProvider::new(lat, lon)
            .with_accuracy(cmd.accuracy)
            .with_altitude(cmd.altitude),
        _ => FixedLocationProvider::new(config.map.default_latitude, config.map.default_longitude),
    };
    let position = LocationTracker::new(provider).require_position().await?;

    let mut name = cmd.name;
    let mut icon = cmd.icon;

    if cmd.identify {
        let image = cmd
            .image
            .as_deref()
            .context("--identify needs --image")?;
        let identification = configured_identifier(config)?
            .identify_image_detailed(image)
            .await;
        print!("{}", render::identification_details(&identification));

        if !identification.is_fallback() {
            icon = icon.or(identification.result.category.suggested_icon());
            name = name.or(Some(identification.result.name));
        }
    }

    let Some(name) = name else {
        bail!("a name is required (pass --name)");
    };

    let mut input = NewObservation::new(name, position.latitude, position.longitude);
    if let Some(date) = cmd.date {
        input = input.with_date(date);
    }
    if let Some(icon) = icon {
        input = input.with_icon(icon);
    }
    if let Some(image) = cmd.image {
        input = input.with_image(image);
    }
    let observation = input.build()?;

    let store = open_store(config)?;
    store.save_observation(observation.clone()).await?;
    info!("Saved observation {}", observation.id);
    println!("Saved {}", render::observation_line(&observation));
    print!("{}", render::position_details(&position));
    Ok(())
}

async fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let observations = cmd.query().apply(store.get_observations().await?);

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&observations)?),
        OutputFormat::Table => print!("{}", render::observation_table(&observations)),
        OutputFormat::Plain => {
            for observation in &observations {
                println!("{}", render::observation_line(observation));
            }
        }
    }
    Ok(())
}

async fn handle_edit(config: &Config, cmd: &EditCommand) -> anyhow::Result<()> {
    let patch = cmd.patch();
    if patch.is_empty() {
        bail!("nothing to change (pass --name, --date, --icon, --image or --remove-image)");
    }

    let store = open_store(config)?;
    let updated = store.update_observation(cmd.id.clone(), patch).await?;
    println!("Updated {}", render::observation_line(&updated));
    Ok(())
}

async fn handle_identify(config: &Config, cmd: &IdentifyCommand) -> anyhow::Result<()> {
    let identification = configured_identifier(config)?
        .identify_image_detailed(&cmd.photo)
        .await;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&identification)?);
    } else {
        print!("{}", render::identification_details(&identification));
        if let Some(icon) = identification.result.category.suggested_icon() {
            println!("  Suggested icon:  {} {}", icon.glyph(), icon);
        }
    }
    Ok(())
}

async fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let stats = store.stats().await?;
    let identification_configured = config.identification.is_configured();

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "collection_key": config.storage.collection_key,
            "stats": stats,
            "identification_configured": identification_configured,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("wildwatch status");
        println!("----------------");
        println!("Database:      {}", config.database_path().display());
        print!("{}", render::stats_summary(&stats));
        println!(
            "Identification: {}",
            if identification_configured {
                "configured"
            } else {
                "not configured"
            }
        );
    }
    Ok(())
}

fn handle_config(path: Option<std::path::PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config.redacted())?);
            } else {
                print!("{}", render::config_summary(&config));
            }
        }
        ConfigCommand::Path => {
            println!(
                "{}",
                path.unwrap_or_else(Config::default_config_path).display()
            );
        }
        ConfigCommand::Validate { file } => {
            let result = match file {
                Some(file) => {
                    println!("Validating configuration: {}", file.display());
                    Config::load_file(&file)
                }
                None => {
                    let file = path.unwrap_or_else(Config::default_config_path);
                    println!("Validating configuration: {}", file.display());
                    Config::load_from(Some(file))
                }
            };
            match result {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
        ConfigCommand::Check => {
            let config = Config::load_from(path)?;
            let report = config.identification.credential_report();
            print!("{}", render::credential_check(&report));
            if !report.present {
                bail!(Error::IdentificationNotConfigured);
            }
        }
    }
    Ok(())
}
