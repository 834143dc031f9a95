use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use planner::{
    api::RouteApi,
    config::PlannerConfig,
    create_session,
    error::PlannerError,
    open_history,
    session::CalculationOutcome,
    store::SavedRoute,
};
use shared::GeoPoint;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Plan routes against the AquaIntel routing service and manage recent routes"
)]
struct Cli {
    #[command(flatten)]
    config: PlannerConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the routing service is up
    Health,
    /// Click the given points on the map, then calculate a route
    Plan {
        /// Map clicks as LAT,LON; odd clicks set the start, even clicks the end
        #[arg(required = true, allow_hyphen_values = true)]
        points: Vec<GeoPoint>,

        /// Write the resulting map (markers and path) to this GPX file
        #[arg(long)]
        gpx: Option<PathBuf>,
    },
    /// Inspect or manage the recent routes history
    Routes {
        #[command(subcommand)]
        action: RoutesCommand,
    },
}

#[derive(Debug, Subcommand)]
enum RoutesCommand {
    /// List recent routes, newest first
    List,
    /// Delete one route by id
    Delete { id: String },
    /// Delete every saved route
    Clear,
    /// Write the whole history to aquaintel-routes-<timestamp>.json
    Export {
        /// Directory to write the export into
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planner=info,aquaintel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Health => health(&cli.config).await,
        Command::Plan { points, gpx } => plan(&cli.config, &points, gpx).await,
        Command::Routes { action } => routes(&cli.config, action),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", failure_message(&err));
            ExitCode::FAILURE
        }
    }
}

/// Session failures are shown with their user-facing text, everything else
/// with the error chain's display.
fn failure_message(err: &PlannerError) -> String {
    match err {
        PlannerError::Session(session) => session.user_message(),
        other => format!("error: {other}"),
    }
}

async fn health(config: &PlannerConfig) -> Result<(), PlannerError> {
    let session = create_session(config)?;
    let status = session.api().health_check().await?;
    println!("{} - {} (version {})", status.status, status.message, status.version);
    Ok(())
}

async fn plan(
    config: &PlannerConfig,
    points: &[GeoPoint],
    gpx: Option<PathBuf>,
) -> Result<(), PlannerError> {
    let mut session = create_session(config)?;
    for point in points {
        session.click(*point);
    }

    match session.calculate().await? {
        CalculationOutcome::Calculated(route) => {
            println!("Distance:  {:.2} km", route.distance_km);
            println!("Est. time: {:.2} hours", route.estimated_time_hours);
            println!("Waypoints: {}", route.path.len());
            if let Some(message) = &route.message {
                println!("Service:   {message}");
            }
            match &route.saved {
                Some(saved) => println!("Saved as route {}", saved.id),
                None => eprintln!("Route was not saved to history"),
            }
        }
        CalculationOutcome::Stale => eprintln!("Calculation was superseded"),
    }

    if let Some(path) = gpx {
        session.surface().canvas().write_to_path(&path)?;
    }
    Ok(())
}

fn routes(config: &PlannerConfig, action: RoutesCommand) -> Result<(), PlannerError> {
    let mut store = open_history(config)?;
    match action {
        RoutesCommand::List => {
            if store.is_empty() {
                println!("No routes calculated yet");
                return Ok(());
            }
            println!("Recent Routes ({})", store.len());
            for route in store.routes() {
                println!("{}", format_route(route));
            }
        }
        RoutesCommand::Delete { id } => {
            if store.get(&id).is_none() {
                return Err(PlannerError::UnknownRoute(id));
            }
            store.delete(&id)?;
            println!("Route deleted");
        }
        RoutesCommand::Clear => {
            store.clear_all()?;
            println!("All routes cleared");
        }
        RoutesCommand::Export { dir } => {
            let artifact = store.export(Utc::now())?;
            let written = artifact.write_to(&dir)?;
            println!("Routes exported to {}", written.display());
        }
    }
    Ok(())
}

fn format_route(route: &SavedRoute) -> String {
    format!(
        "{:<14} {:>7.2}, {:>7.2} -> {:>7.2}, {:>7.2}  {:>8.2} km  {:>6.2} hrs  {}",
        route.id,
        route.start.lat(),
        route.start.lon(),
        route.end.lat(),
        route.end.lon(),
        route.distance_km,
        route.estimated_time_hours,
        route.created_at.format("%Y-%m-%d %H:%M:%S"),
    )
}
