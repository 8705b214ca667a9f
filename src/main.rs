//! walkreach command line.
//!
//! `route` computes walking distances from addresses to destinations and
//! writes the address table with aggregate columns; `med-centers` tags
//! pharmacies that sit next to enough doctor practices.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use walkreach::dataset::{self, AreaCrs, AreaOptions, CsvOptions, ResultColumns};
use walkreach::haversine::HaversineEstimator;
use walkreach::med_centers::{self, MedCenterRule};
use walkreach::orchestrator::{self, RoutingMode, RoutingPolicy};
use walkreach::ors::{OrsClient, OrsConfig};
use walkreach::projection::{DEFAULT_ZONE, Utm};
use walkreach::routing::OnRoutingFailure;
use walkreach::traits::RouteProvider;

#[derive(Parser, Debug)]
#[command(name = "walkreach")]
#[command(about = "Walking distances from addresses to shops, medical centers and green spaces")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Route every address to its nearby destinations
    Route(RouteArgs),
    /// Flag pharmacies with enough doctor practices nearby
    MedCenters(MedCenterArgs),
}

#[derive(Args, Debug)]
struct RouteArgs {
    /// Geocoded addresses (CSV with lat/lon)
    #[arg(long)]
    addresses: PathBuf,

    /// Point destinations (CSV with lat/lon, optional id and is_med_center)
    #[arg(long, conflicts_with = "areas", required_unless_present = "areas")]
    destinations: Option<PathBuf>,

    /// Area destinations (GeoJSON FeatureCollection of polygons)
    #[arg(long)]
    areas: Option<PathBuf>,

    /// Output CSV
    #[arg(short, long)]
    output: PathBuf,

    /// Column prefix; derived from the destination file name when omitted
    #[arg(long)]
    domain: Option<String>,

    /// Directions endpoint of the foot-routing service
    #[arg(long, env = "ORS_URL", default_value = "http://localhost:8080/ors/v2/directions/foot-walking/geojson")]
    ors_url: String,

    /// API key sent as Authorization header
    #[arg(long, env = "ORS_API_KEY", hide_env_values = true)]
    ors_api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Straight-line candidate radius in meters
    #[arg(long, default_value = "2000")]
    radius: f64,

    /// Distance bands in meters
    #[arg(long, value_delimiter = ',', default_value = "500,800,1000")]
    thresholds: Vec<f64>,

    /// Worker pool size
    #[arg(long, default_value = "16")]
    workers: usize,

    /// Log progress every N addresses / tasks
    #[arg(long, default_value = "10")]
    progress_every: usize,

    /// Substitute the straight-line distance when routing fails
    #[arg(long)]
    haversine_fallback: bool,

    /// Skip the routing service and report straight-line distances only
    #[arg(long)]
    straight_line: bool,

    /// Feature property grouping area features into one destination
    #[arg(long)]
    group_by: Option<String>,

    /// Coordinate frame of the area file
    #[arg(long, value_enum, default_value = "wgs84")]
    area_crs: AreaCrsArg,

    /// UTM zone (northern hemisphere) used for area geometry
    #[arg(long, default_value_t = DEFAULT_ZONE)]
    utm_zone: u8,
}

#[derive(Args, Debug)]
struct MedCenterArgs {
    /// Doctor practices (CSV; lat/lon or x/y in the UTM zone)
    #[arg(long)]
    practices: PathBuf,

    /// Pharmacies (CSV; lat/lon or x/y in the UTM zone)
    #[arg(long)]
    pharmacies: PathBuf,

    /// Output CSV
    #[arg(short, long)]
    output: PathBuf,

    /// Field delimiter of the practices file
    #[arg(long, default_value = ";")]
    practices_delimiter: char,

    /// Field delimiter of the pharmacies file
    #[arg(long, default_value = ",")]
    pharmacies_delimiter: char,

    /// Radius around each pharmacy in meters
    #[arg(long, default_value = "100")]
    radius: f64,

    /// Distinct practices needed for a medical center
    #[arg(long, default_value = "2")]
    min_practices: usize,

    /// UTM zone of x/y columns
    #[arg(long, default_value_t = DEFAULT_ZONE)]
    utm_zone: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AreaCrsArg {
    Wgs84,
    Utm,
}

impl From<AreaCrsArg> for AreaCrs {
    fn from(value: AreaCrsArg) -> Self {
        match value {
            AreaCrsArg::Wgs84 => AreaCrs::Wgs84,
            AreaCrsArg::Utm => AreaCrs::Utm,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Route(args) => route(args),
        Command::MedCenters(args) => med_centers(args),
    }
}

fn route(args: RouteArgs) -> Result<()> {
    let projection = Utm::new(args.utm_zone, true).context("Invalid UTM zone")?;

    let mut table = dataset::load_addresses(&args.addresses)
        .with_context(|| format!("Failed to load addresses from {}", args.addresses.display()))?;

    let (mode, destinations, source) = match (&args.destinations, &args.areas) {
        (Some(path), _) => (
            RoutingMode::Point,
            dataset::load_point_destinations(path, CsvOptions::default())
                .with_context(|| format!("Failed to load destinations from {}", path.display()))?,
            path,
        ),
        (None, Some(path)) => {
            let options = AreaOptions {
                group_by: args.group_by.clone(),
                crs: args.area_crs.into(),
                projection,
            };
            (
                RoutingMode::Area,
                dataset::load_area_destinations(path, &options)
                    .with_context(|| format!("Failed to load areas from {}", path.display()))?,
                path,
            )
        }
        (None, None) => anyhow::bail!("either --destinations or --areas is required"),
    };
    let domain = args
        .domain
        .clone()
        .unwrap_or_else(|| dataset::domain_from_path(source));

    let policy = RoutingPolicy {
        mode,
        on_routing_failure: if args.haversine_fallback {
            OnRoutingFailure::HaversineEstimate
        } else {
            OnRoutingFailure::Absent
        },
        radius_m: args.radius,
        thresholds: args.thresholds.clone(),
        concurrency: args.workers,
        progress_every: args.progress_every,
    };

    info!(
        domain = %domain,
        addresses = table.addresses.len(),
        destinations = destinations.len(),
        "starting routing run"
    );

    let provider: Box<dyn RouteProvider> = if args.straight_line {
        Box::new(HaversineEstimator)
    } else {
        let mut config = OrsConfig::new(&args.ors_url).with_timeout_secs(args.timeout);
        if let Some(key) = &args.ors_api_key {
            config = config.with_api_key(key);
        }
        Box::new(OrsClient::new(config).context("Failed to build HTTP client")?)
    };

    let outcome = orchestrator::run(&table.addresses, &destinations, &policy, provider.as_ref())?;

    table
        .append_results(
            &outcome.rows,
            &ResultColumns {
                domain: &domain,
                thresholds: &policy.thresholds,
                include_destination_id: mode == RoutingMode::Area,
            },
        )
        .context("Failed to build result columns")?;
    table
        .write_csv(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    let summary = outcome.summary;
    info!(
        "✓ {} written: {} tasks, {} routed, {} estimated, {} failed, {} addresses without distance",
        args.output.display(),
        summary.tasks,
        summary.routed,
        summary.estimated,
        summary.failed,
        summary.addresses_without_distance
    );
    Ok(())
}

fn med_centers(args: MedCenterArgs) -> Result<()> {
    let projection = Utm::new(args.utm_zone, true).context("Invalid UTM zone")?;
    let options = |delimiter: char| -> Result<CsvOptions> {
        Ok(CsvOptions {
            delimiter: u8::try_from(delimiter).context("Delimiter must be a single-byte character")?,
            planar: Some(projection),
        })
    };

    let practices = dataset::load_practices(&args.practices, options(args.practices_delimiter)?)
        .with_context(|| format!("Failed to load practices from {}", args.practices.display()))?;
    let (mut table, pharmacies) =
        dataset::load_pharmacies(&args.pharmacies, options(args.pharmacies_delimiter)?)
            .with_context(|| format!("Failed to load pharmacies from {}", args.pharmacies.display()))?;

    let rule = MedCenterRule {
        radius_m: args.radius,
        min_practices: args.min_practices,
    };
    let tags = med_centers::tag_pharmacies(&pharmacies, &practices, rule);
    let centers = tags.iter().filter(|tag| tag.is_med_center).count();
    info!(pharmacies = tags.len(), centers, "pharmacies tagged");

    table.set_med_center_columns(&tags);

    dataset::write_point_table(&args.output, &table)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!("✓ {} written", args.output.display());
    Ok(())
}
