//! `ride`: quote, request and inspect campus rides from the command line.
//!
//! Records go to stdout as JSON; logs go to stderr.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use ride_core::clock::{Clock, SystemClock};
use ride_core::config::{
    ConfigError, RideConfig, ETA_ENDPOINT_VAR, ETA_TIMEOUT_MS_VAR, GEMINI_API_KEY_VAR,
    GEMINI_MODEL_VAR, OSRM_ENDPOINT_VAR, QUEUE_PATH_VAR,
};
use ride_core::eta::{EtaClient, EtaDispatcher};
use ride_core::geo::Coordinates;
use ride_core::lifecycle::{CancelOutcome, LifecycleEvent, RequestLifecycleController};
use ride_core::planner::TripPlanner;
use ride_core::pricing::{FareBasis, FareQuote};
use ride_core::request::{RideDraft, RideKind};
use ride_core::routing::{RouteDistanceProvider, RouteWatcher, StraightLineRouteProvider};
use ride_core::store::{load_live, JsonFileRecordStore, RequestRecordStore};
use ride_core::zones::{destination_for, Zone};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(
    name = "ride",
    about = "Campus ride requests: fares, simulated matching and AI travel-time estimates"
)]
struct Cli {
    /// Queue file holding submitted requests [env: RIDE_QUEUE_PATH, default: all_requests_queue.json]
    #[arg(long, global = true)]
    queue: Option<PathBuf>,
    /// OSRM server for road distances, straight-line distance when unset [env: OSRM_ENDPOINT]
    #[arg(long, global = true)]
    osrm_endpoint: Option<String>,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
    #[command(flatten)]
    estimation: EstimationArgs,
    #[command(subcommand)]
    command: Commands,
}

/// Flags override the matching environment variables.
#[derive(Args)]
struct EstimationArgs {
    /// HTTP ETA service; takes precedence over direct Gemini access [env: ETA_ENDPOINT]
    #[arg(long, global = true)]
    eta_endpoint: Option<String>,
    /// Gemini API key [env: GEMINI_API_KEY]
    #[arg(long, global = true)]
    gemini_api_key: Option<String>,
    /// Gemini model [env: GEMINI_MODEL, default: gemini-2.0-flash]
    #[arg(long, global = true)]
    gemini_model: Option<String>,
    /// Per-call estimation timeout in milliseconds [env: ETA_TIMEOUT_MS, default: 10000]
    #[arg(long, global = true)]
    eta_timeout_ms: Option<u64>,
}

impl Cli {
    /// Settings from flags, falling back to the environment and then to defaults.
    fn config(&self) -> Result<RideConfig, ConfigError> {
        RideConfig::from_lookup(|key| self.flag(key).or_else(|| std::env::var(key).ok()))
    }

    fn flag(&self, key: &str) -> Option<String> {
        let estimation = &self.estimation;
        match key {
            QUEUE_PATH_VAR => self.queue.as_ref().map(|path| path.display().to_string()),
            OSRM_ENDPOINT_VAR => self.osrm_endpoint.clone(),
            ETA_ENDPOINT_VAR => estimation.eta_endpoint.clone(),
            GEMINI_API_KEY_VAR => estimation.gemini_api_key.clone(),
            GEMINI_MODEL_VAR => estimation.gemini_model.clone(),
            ETA_TIMEOUT_MS_VAR => estimation.eta_timeout_ms.map(|ms| ms.to_string()),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    /// Zone-only pickup
    Pickup,
    /// Map pickup to a named campus, priced by route distance
    DestinationTrip,
    /// Parcel delivery ("pahatid")
    #[value(alias = "pahatid")]
    Parcel,
}

impl From<KindArg> for RideKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Pickup => RideKind::Pickup,
            KindArg::DestinationTrip => RideKind::DestinationTrip,
            KindArg::Parcel => RideKind::Parcel,
        }
    }
}

#[derive(Args)]
struct TripArgs {
    #[arg(value_enum)]
    kind: KindArg,
    /// Destination zone: main, annex or outside
    #[arg(long = "to")]
    destination: Option<Zone>,
    /// Pickup latitude
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    lat: Option<f64>,
    /// Pickup longitude
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lng: Option<f64>,
    /// Route distance override in kilometres
    #[arg(long)]
    distance_km: Option<f64>,
    /// Free-text note (parcel contents, landmarks)
    #[arg(long)]
    description: Option<String>,
}

impl TripArgs {
    fn pickup(&self) -> CliResult<Option<Coordinates>> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Ok(Some(Coordinates::new(lat, lng)?)),
            _ => Ok(None),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the fare a request would be charged
    Quote(TripArgs),
    /// Submit a request and wait for the simulated rider
    Request {
        #[command(flatten)]
        trip: TripArgs,
        /// Cancel this many milliseconds after submitting
        #[arg(long)]
        cancel_after_ms: Option<u64>,
        /// Ask the ETA backend before submitting (destination trips)
        #[arg(long)]
        eta: bool,
    },
    /// List submitted requests
    Queue {
        /// Apply recorded status changes
        #[arg(long)]
        live: bool,
    },
    /// Estimate travel time from a pickup point to a campus
    Eta {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long = "to")]
        destination: Zone,
        #[arg(long)]
        distance_km: Option<f64>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn route_provider(config: &RideConfig) -> CliResult<Box<dyn RouteDistanceProvider>> {
    match &config.osrm_endpoint {
        Some(endpoint) => osrm_provider(endpoint),
        None => Ok(Box::new(StraightLineRouteProvider::default())),
    }
}

#[cfg(feature = "http")]
fn osrm_provider(endpoint: &str) -> CliResult<Box<dyn RouteDistanceProvider>> {
    Ok(Box::new(ride_core::routing::OsrmRouteProvider::new(endpoint)?))
}

#[cfg(not(feature = "http"))]
fn osrm_provider(_endpoint: &str) -> CliResult<Box<dyn RouteDistanceProvider>> {
    tracing::warn!("OSRM endpoint ignored: built without the http feature");
    Ok(Box::new(StraightLineRouteProvider::default()))
}

fn quote_json(quote: &FareQuote) -> serde_json::Value {
    match quote.basis {
        FareBasis::Route { distance_km } => json!({
            "fare": quote.fare.to_string(),
            "basis": "route",
            "distanceKm": distance_km,
        }),
        FareBasis::Zone(zone) => json!({
            "fare": quote.fare.to_string(),
            "basis": "zone",
            "zone": zone,
        }),
    }
}

fn print_json(value: &serde_json::Value) -> CliResult<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Fill pickup, destination and route distance, asking the route provider when needed.
fn plan_trip(config: &RideConfig, trip: &TripArgs, with_eta: bool) -> CliResult<RideDraft> {
    let kind = RideKind::from(trip.kind);
    let mut planner = TripPlanner::new(RouteWatcher::new(route_provider(config)?));
    if with_eta {
        let backend = config.estimation.backend()?;
        planner = planner.with_eta(EtaDispatcher::new(EtaClient::new(backend)));
    }
    if let Some(description) = &trip.description {
        planner.set_description(description.clone());
    }
    if let Some(pickup) = trip.pickup()? {
        planner.set_pickup(pickup);
    }
    if let Some(zone) = trip.destination {
        planner.select_destination(zone);
    }

    if with_eta {
        let timeout = config.estimation.timeout + Duration::from_millis(500);
        if let Some(eta) = planner.wait_for_eta(timeout) {
            print_json(&json!({ "event": "eta", "eta": eta }))?;
        }
    }

    let mut draft = planner.draft(kind);
    if let Some(distance_km) = trip.distance_km {
        draft = draft.with_route_distance_km(distance_km);
    }
    Ok(draft)
}

fn run_request(
    config: &RideConfig,
    trip: &TripArgs,
    cancel_after_ms: Option<u64>,
    with_eta: bool,
) -> CliResult<()> {
    let draft = plan_trip(config, trip, with_eta)?;
    let mut controller =
        RequestLifecycleController::new(JsonFileRecordStore::open(&config.queue_path), SystemClock);
    let submission = controller.submit(&draft)?;
    print_json(&json!({
        "event": "submitted",
        "quote": quote_json(&submission.quote),
        "request": submission.request,
    }))?;

    let cancel_at = cancel_after_ms.map(|ms| {
        submission.request.created_at() + chrono::Duration::milliseconds(ms as i64)
    });

    loop {
        let events = controller.poll();
        if let Some(event) = events.first() {
            let name = match event {
                LifecycleEvent::Matched(_) => "matched",
                LifecycleEvent::Cancelled(_) => "cancelled",
            };
            print_json(&json!({
                "event": name,
                "notice": event.notice(),
                "request": event.request(),
            }))?;
            return Ok(());
        }

        let now = controller.clock().now();
        if cancel_at.is_some_and(|at| now >= at) {
            match controller.cancel(submission.token) {
                CancelOutcome::Cancelled(request) => print_json(&json!({
                    "event": "cancelled",
                    "notice": LifecycleEvent::Cancelled(request.clone()).notice(),
                    "request": request,
                }))?,
                CancelOutcome::NothingToCancel => {
                    tracing::info!("nothing left to cancel");
                }
            }
            return Ok(());
        }

        let Some(wake_at) = [controller.next_deadline(), cancel_at]
            .into_iter()
            .flatten()
            .min()
        else {
            return Ok(());
        };
        let pause = (wake_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        thread::sleep(pause);
    }
}

fn run_quote(config: &RideConfig, trip: &TripArgs) -> CliResult<()> {
    let draft = plan_trip(config, trip, false)?;
    let controller =
        RequestLifecycleController::new(JsonFileRecordStore::open(&config.queue_path), SystemClock);
    let quote = controller.quote(&draft)?;
    print_json(&quote_json(&quote))
}

fn run_queue(config: &RideConfig, live: bool) -> CliResult<()> {
    let store = JsonFileRecordStore::open(&config.queue_path);
    let records = if live {
        load_live(&store)?
    } else {
        store.load_all()?
    };
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn run_eta(
    config: &RideConfig,
    pickup: Coordinates,
    zone: Zone,
    distance_km: Option<f64>,
) -> CliResult<()> {
    let destination =
        destination_for(zone).ok_or_else(|| format!("no campus destination for zone '{zone}'"))?;
    let distance_km = match distance_km {
        Some(distance_km) => distance_km,
        None => {
            let target = destination
                .coordinates()
                .ok_or("destination has invalid coordinates")?;
            route_provider(config)?
                .route(pickup, target)
                .ok_or("no route to destination")?
                .distance_km
        }
    };
    let client = EtaClient::new(config.estimation.backend()?);
    let eta = client.estimate(distance_km, pickup, destination.name);
    print_json(&json!({
        "distanceKm": distance_km,
        "destination": destination.name,
        "eta": eta,
    }))
}

fn run(cli: &Cli) -> CliResult<()> {
    let config = cli.config()?;
    let config = &config;
    match &cli.command {
        Commands::Quote(trip) => run_quote(config, trip),
        Commands::Request {
            trip,
            cancel_after_ms,
            eta,
        } => run_request(config, trip, *cancel_after_ms, *eta),
        Commands::Queue { live } => run_queue(config, *live),
        Commands::Eta {
            lat,
            lng,
            destination,
            distance_km,
        } => run_eta(config, Coordinates::new(*lat, *lng)?, *destination, *distance_km),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
