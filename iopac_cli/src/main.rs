//! Run a single refresh and write the calendar file, for cron jobs and debugging.

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{builder::FalseyValueParser, ArgAction, Parser};
use iopac_core::{
    calendar::CalendarOptions, config::IopacConfig, portal::Portal, refresh::Refresher,
};
use log::LevelFilter;

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Arguments {
    /// the configuration file with accounts and libraries
    #[arg(long, short, env = "CONFIG_FILE", default_value = "config.yaml")]
    pub config: PathBuf,

    /// the calendar file to write
    #[arg(long, short, env = "ICS_FILE", default_value = "iopac.ics")]
    pub output: PathBuf,

    /// the name of every calendar event
    #[arg(long, short, env = "EVENT_NAME", default_value = "Bücherei Rückgabe")]
    pub name: String,

    /// seconds until a portal request fails
    #[arg(long, short, env = "TIMEOUT", default_value_t = 30)]
    pub timeout: u64,

    /// leave out the reminder on the day before
    #[arg(long, env = "NO_REMINDER", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub no_reminder: bool,

    /// replace the calendar even if some accounts failed
    #[arg(long, env = "PUBLISH_PARTIAL", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub publish_partial: bool,

    /// log debug messages
    #[arg(long, short, env = "DEBUG", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Arguments::parse();
    env_logger::Builder::new()
        .filter_level(if args.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .format_target(false)
        .init();

    let config = IopacConfig::try_new(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    let mut options = CalendarOptions::new(args.name);
    options.reminder = !args.no_reminder;
    let refresher = Refresher::new(
        Portal::new(Duration::from_secs(args.timeout))?,
        config,
        options,
        args.output,
    )
    .publish_partial(args.publish_partial);

    let report = refresher.refresh().await?;
    if !report.failures.is_empty() || !report.skipped.is_empty() {
        bail!(
            "{} accounts failed, {} skipped",
            report.failures.len(),
            report.skipped.len()
        );
    }
    Ok(())
}
