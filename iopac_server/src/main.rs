//! This crate implements an iCalendar server publishing the due dates of iOPAC library loans.
//!
//! The loans of all configured accounts are fetched on start and then every `SLEEP_TIME`
//! seconds. The calendar is served at `ICS_PATH`, liveness at `/health`.

mod args;
mod route;
mod schedule;
#[cfg(test)]
mod test_util;

use std::future::IntoFuture;

use anyhow::{Context, Result};
use clap::Parser;
use iopac_core::{config::IopacConfig, portal::Portal, refresh::Refresher};
use log::{debug, error, info, LevelFilter};
use tokio::net::TcpListener;

use crate::args::Arguments;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Arguments::parse();
    init_logging(args.debug);

    if args.health_check {
        return health_check(args.port).await;
    }

    args.validate()?;
    let config = IopacConfig::try_new(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    debug!(
        "{} accounts at {} libraries",
        config.accounts.len(),
        config.libraries.len()
    );

    let portal = Portal::new(args.timeout())?;
    let refresher = Refresher::new(
        portal,
        config,
        args.calendar_options(),
        args.ics_file.clone(),
    )
    .publish_partial(args.publish_partial);

    // The first calendar is written before the server accepts requests.
    refresher.refresh().await?;

    let mut refresh_task = tokio::spawn(schedule::run(refresher, args.sleep_time()));

    let listener = TcpListener::bind((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("binding {}:{}", args.host, args.port))?;
    info!(
        "ICS file available at http://{}{}",
        listener.local_addr()?,
        args.path
    );
    let server = axum::serve(listener, route::router(&args.path, args.ics_file.clone()))
        .with_graceful_shutdown(shutdown_signal());

    tokio::select! {
        result = server.into_future() => result?,
        result = &mut refresh_task => {
            result??;
        }
    }

    info!("Shutdown");
    refresh_task.abort();
    Ok(())
}

fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .init();
}

/// Check the health endpoint of a server running on this host.
async fn health_check(port: u16) -> Result<()> {
    info!("Performing health check");
    reqwest::get(format!("http://localhost:{port}/health"))
        .await?
        .error_for_status()?;
    info!("OK");
    Ok(())
}

/// Wait for SIGTERM, SIGINT or SIGQUIT on Unix, Ctrl+C elsewhere.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (Ok(mut sigterm), Ok(mut sigint), Ok(mut sigquit)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
            signal(SignalKind::quit()),
        ) else {
            error!("could not install signal handlers");
            return std::future::pending().await;
        };

        tokio::select! {
            _ = sigterm.recv() => debug!("received SIGTERM"),
            _ = sigint.recv() => debug!("received SIGINT"),
            _ = sigquit.recv() => debug!("received SIGQUIT"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        debug!("received Ctrl+C");
    }
}
