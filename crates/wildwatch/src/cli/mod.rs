//! Command-line interface for wildwatch.
//!
//! This module provides the CLI structure, argument types and output
//! rendering for the `wildwatch` binary.

mod commands;
pub mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{
    AddCommand, ClearCommand, ConfigCommand, DeleteCommand, EditCommand, IdentifyCommand,
    ListCommand, OutputFormat, ShowCommand, StatusCommand,
};

/// wildwatch - Record the wildlife you meet
///
/// Keeps a local journal of geolocated observations and can identify the
/// plant, animal or fungus in a photo.
#[derive(Debug, Parser)]
#[command(name = "wildwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a new observation
    Add(AddCommand),

    /// List observations
    List(ListCommand),

    /// Show one observation
    Show(ShowCommand),

    /// Edit an observation
    Edit(EditCommand),

    /// Delete an observation
    Delete(DeleteCommand),

    /// Delete every observation
    Clear(ClearCommand),

    /// Identify the specimen in a photo
    Identify(IdentifyCommand),

    /// Show storage and identification status
    Status(StatusCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use crate::observation::ObservationIcon;
    use crate::query::SortOrder;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "wildwatch");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(parse(&["wildwatch", "-q", "status"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["wildwatch", "status"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["wildwatch", "-v", "status"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["wildwatch", "-vv", "status"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["wildwatch", "-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_add() {
        let cli = parse(&[
            "wildwatch", "add", "--name", "Renard", "--lat", "45.5", "--lon", "-73.56", "--icon",
            "animal",
        ]);
        let Command::Add(add) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(add.name.as_deref(), Some("Renard"));
        assert_eq!(add.lat, Some(45.5));
        assert_eq!(add.lon, Some(-73.56));
        assert_eq!(add.icon, Some(ObservationIcon::Animal));
        assert!(add.accuracy.is_none());
        assert!(!add.identify);
    }

    #[test]
    fn test_parse_add_accuracy_and_altitude() {
        let Command::Add(add) = parse(&[
            "wildwatch", "add", "--name", "Bouquetin", "--lat", "45.9", "--lon", "6.87",
            "--accuracy", "12", "--altitude", "-3.5",
        ])
        .command
        else {
            panic!("expected add");
        };
        assert_eq!(add.accuracy, Some(12.0));
        assert_eq!(add.altitude, Some(-3.5));

        assert!(Cli::try_parse_from(["wildwatch", "add", "--name", "x", "--accuracy", "5"]).is_err());
    }

    #[test]
    fn test_add_lat_requires_lon() {
        assert!(Cli::try_parse_from(["wildwatch", "add", "--name", "x", "--lat", "1.0"]).is_err());
    }

    #[test]
    fn test_add_identify_requires_image() {
        assert!(Cli::try_parse_from(["wildwatch", "add", "--identify"]).is_err());
        assert!(
            Cli::try_parse_from(["wildwatch", "add", "--identify", "--image", "fox.jpg"]).is_ok()
        );
    }

    #[test]
    fn test_parse_list() {
        let cli = parse(&["wildwatch", "list", "--icon", "fungus", "--sort", "name-asc", "-f", "json"]);
        let Command::List(list) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(list.icon, Some(ObservationIcon::Fungus));
        assert_eq!(list.sort, SortOrder::NameAsc);
        assert_eq!(list.format, OutputFormat::Json);
    }

    #[test]
    fn test_list_defaults() {
        let Command::List(list) = parse(&["wildwatch", "list"]).command else {
            panic!("expected list");
        };
        assert_eq!(list.sort, SortOrder::DateDesc);
        assert_eq!(list.format, OutputFormat::Table);
    }

    #[test]
    fn test_icon_accepts_emoji_and_rejects_unknown() {
        let Command::Edit(edit) = parse(&["wildwatch", "edit", "1", "--icon", "🍄"]).command else {
            panic!("expected edit");
        };
        assert_eq!(edit.icon, Some(ObservationIcon::Fungus));

        assert!(Cli::try_parse_from(["wildwatch", "list", "--icon", "fish"]).is_err());
        assert!(Cli::try_parse_from(["wildwatch", "list", "--sort", "newest"]).is_err());
    }

    #[test]
    fn test_edit_image_conflicts_with_remove() {
        assert!(Cli::try_parse_from([
            "wildwatch",
            "edit",
            "1",
            "--image",
            "a.jpg",
            "--remove-image"
        ])
        .is_err());
    }

    #[test]
    fn test_parse_identify() {
        let Command::Identify(cmd) = parse(&["wildwatch", "identify", "fox.jpg", "--json"]).command
        else {
            panic!("expected identify");
        };
        assert_eq!(cmd.photo, "fox.jpg");
        assert!(cmd.json);
    }

    #[test]
    fn test_parse_config_check() {
        let cli = parse(&["wildwatch", "config", "check"]);
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Check)));
    }

    #[test]
    fn test_parse_clear() {
        let Command::Clear(clear) = parse(&["wildwatch", "clear", "--yes"]).command else {
            panic!("expected clear");
        };
        assert!(clear.yes);
    }
}
