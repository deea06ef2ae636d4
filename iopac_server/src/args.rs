//! Command line arguments, each with an environment variable fallback.

use std::{path::PathBuf, time::Duration};

use anyhow::{ensure, Result};
use clap::{builder::FalseyValueParser, ArgAction, Parser};
use iopac_core::calendar::CalendarOptions;

use crate::route::HEALTH_PATH;

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Arguments {
    /// the host to listen on
    #[arg(long, env = "HOST", default_value = "localhost")]
    pub host: String,

    /// the port to listen on
    #[arg(long, short = 'P', env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// the configuration file with accounts and libraries
    #[arg(long, short, env = "CONFIG_FILE", default_value = "config.yaml")]
    pub config: PathBuf,

    /// the calendar file to write
    #[arg(long, short = 'f', env = "ICS_FILE", default_value = "iopac.ics")]
    pub ics_file: PathBuf,

    /// the web path of the calendar file
    #[arg(long, short, env = "ICS_PATH", default_value = "/iopac.ics")]
    pub path: String,

    /// seconds between consecutive refreshes
    #[arg(long, short, env = "SLEEP_TIME", default_value_t = 600)]
    pub sleep_time: u64,

    /// the name of every calendar event
    #[arg(long, short, env = "EVENT_NAME", default_value = "Bücherei Rückgabe")]
    pub name: String,

    /// seconds until a portal request fails
    #[arg(long, short, env = "TIMEOUT", default_value_t = 30)]
    pub timeout: u64,

    /// log debug messages
    #[arg(long, short, env = "DEBUG", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub debug: bool,

    /// leave out the reminder on the day before
    #[arg(long, env = "NO_REMINDER", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub no_reminder: bool,

    /// replace the calendar even if some accounts failed
    #[arg(long, env = "PUBLISH_PARTIAL", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub publish_partial: bool,

    /// perform health check on localhost
    #[arg(long, short = 'H')]
    pub health_check: bool,
}

impl Arguments {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.path.starts_with('/'),
            "web path {:?} must start with /",
            self.path
        );
        ensure!(
            self.path != HEALTH_PATH,
            "web path must not be {HEALTH_PATH}"
        );
        ensure!(self.sleep_time > 0, "sleep time must be positive");
        ensure!(self.timeout > 0, "timeout must be positive");
        Ok(())
    }

    pub fn sleep_time(&self) -> Duration {
        Duration::from_secs(self.sleep_time)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn calendar_options(&self) -> CalendarOptions {
        let mut options = CalendarOptions::new(self.name.as_str());
        options.reminder = !self.no_reminder;
        options
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::args::Arguments;

    #[test]
    fn test_defaults() {
        let args = Arguments::try_parse_from(["iopac"]).unwrap();
        assert_eq!(args.port, 8080);
        assert_eq!(args.path, "/iopac.ics");
        assert_eq!(args.sleep_time, 600);
        assert_eq!(args.timeout, 30);
        assert!(args.validate().is_ok());
        assert!(args.calendar_options().reminder);
    }

    #[test]
    fn test_validate() {
        let args = Arguments::try_parse_from(["iopac", "--path", "/health"]).unwrap();
        assert!(args.validate().is_err());
        let args = Arguments::try_parse_from(["iopac", "--path", "iopac.ics"]).unwrap();
        assert!(args.validate().is_err());
        let args = Arguments::try_parse_from(["iopac", "--sleep-time", "0"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_flags() {
        let args =
            Arguments::try_parse_from(["iopac", "--no-reminder", "-n", "Rückgabe", "-d"]).unwrap();
        assert!(args.debug);
        let options = args.calendar_options();
        assert!(!options.reminder);
        assert_eq!(options.event_name, "Rückgabe");
    }
}
