//! Routing orchestrator.
//!
//! Plans one routing task per (address, selected destination) pair, routes
//! them on a fixed-size worker pool and reduces the results per address into
//! nearest-distance and threshold-count aggregates.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::info;

use crate::candidates;
use crate::error::{InputError, RunError};
use crate::model::{Address, AddressId, AggregateRow, Destination, DestinationId, ThresholdCount};
use crate::polyline::Polyline;
use crate::routing::{DistanceSource, OnRoutingFailure, RoutingResult, RoutingTask, route_distance};
use crate::traits::{Located, RouteProvider};

/// Which destination variant a run routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingMode {
    #[default]
    Point,
    Area,
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingMode::Point => f.write_str("point"),
            RoutingMode::Area => f.write_str("area"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    pub mode: RoutingMode,
    pub on_routing_failure: OnRoutingFailure,
    /// Straight-line prefilter radius in meters.
    pub radius_m: f64,
    /// Distance bands in meters, one count column each.
    pub thresholds: Vec<f64>,
    /// Worker pool size.
    pub concurrency: usize,
    /// Log progress every this many addresses / completed tasks.
    pub progress_every: usize,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            mode: RoutingMode::Point,
            on_routing_failure: OnRoutingFailure::Absent,
            radius_m: 2000.0,
            thresholds: vec![500.0, 800.0, 1000.0],
            concurrency: 16,
            progress_every: 10,
        }
    }
}

impl RoutingPolicy {
    pub fn validate(&self) -> Result<(), InputError> {
        if self.concurrency == 0 {
            return Err(InputError::InvalidPolicy(
                "worker pool size must be at least 1".to_string(),
            ));
        }
        if self.radius_m.is_nan() || self.radius_m < 0.0 {
            return Err(InputError::InvalidPolicy(format!(
                "candidate radius must be non-negative, got {}",
                self.radius_m
            )));
        }
        if let Some(bad) = self
            .thresholds
            .iter()
            .find(|threshold| !threshold.is_finite() || **threshold < 0.0)
        {
            return Err(InputError::InvalidPolicy(format!(
                "distance thresholds must be finite and non-negative, got {bad}"
            )));
        }
        Ok(())
    }
}

/// Success and failure tallies for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub addresses: usize,
    pub tasks: usize,
    pub routed: usize,
    pub estimated: usize,
    pub failed: usize,
    pub addresses_without_distance: usize,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub rows: BTreeMap<AddressId, AggregateRow>,
    pub summary: RunSummary,
}

/// Builds the full task list up front.
///
/// Ineligible destinations are dropped before candidate selection. Fails
/// before any routing when a destination does not match the policy mode or
/// nothing eligible is left.
pub fn plan_tasks(
    addresses: &[Address],
    destinations: &[Destination],
    policy: &RoutingPolicy,
) -> Result<Vec<RoutingTask>, InputError> {
    if let Some(mismatch) = destinations
        .iter()
        .find(|destination| destination.is_area() != (policy.mode == RoutingMode::Area))
    {
        return Err(InputError::ModeMismatch {
            destination: mismatch.id().to_string(),
            mode: policy.mode.to_string(),
        });
    }

    let eligible: Vec<&Destination> = destinations
        .iter()
        .filter(|destination| destination.is_eligible())
        .collect();
    if eligible.is_empty() {
        return Err(InputError::NoDestinations {
            source_name: format!("{} destinations", policy.mode),
        });
    }
    if eligible.len() < destinations.len() {
        info!(
            eligible = eligible.len(),
            total = destinations.len(),
            "category filter applied"
        );
    }

    let mut tasks = Vec::new();
    for (index, address) in addresses.iter().enumerate() {
        for destination in candidates::select(address.point, &eligible, policy.radius_m) {
            tasks.push(RoutingTask {
                origin_id: address.id,
                destination_id: destination.id().clone(),
                origin: address.point,
                destination: destination.routable_point(address.point),
            });
        }

        if policy.progress_every > 0 && (index + 1) % policy.progress_every == 0 {
            info!("{}/{} addresses planned", index + 1, addresses.len());
        }
    }

    Ok(tasks)
}

/// Routes every address against its candidate destinations.
pub fn run<P: RouteProvider + ?Sized>(
    addresses: &[Address],
    destinations: &[Destination],
    policy: &RoutingPolicy,
    provider: &P,
) -> Result<RunOutcome, RunError> {
    policy.validate()?;
    let tasks = plan_tasks(addresses, destinations, policy)?;
    info!(
        mode = %policy.mode,
        addresses = addresses.len(),
        tasks = tasks.len(),
        workers = policy.concurrency,
        "routing tasks planned"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(policy.concurrency)
        .thread_name(|index| format!("router-{index}"))
        .build()?;

    let total = tasks.len();
    let completed = AtomicUsize::new(0);
    let results: Vec<RoutingResult> = pool.install(|| {
        tasks
            .into_par_iter()
            .map(|task| {
                let result = route_distance(provider, task, policy.on_routing_failure);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if policy.progress_every > 0 && done % policy.progress_every == 0 {
                    info!("{}/{} routing tasks done", done, total);
                }
                result
            })
            .collect()
    });

    let outcome = aggregate(addresses, results, &policy.thresholds);
    let summary = &outcome.summary;
    info!(
        tasks = summary.tasks,
        routed = summary.routed,
        estimated = summary.estimated,
        failed = summary.failed,
        addresses_without_distance = summary.addresses_without_distance,
        "routing finished"
    );
    Ok(outcome)
}

#[derive(Default)]
struct Accumulator {
    nearest: Option<(f64, Option<Polyline>, DestinationId)>,
    distances: Vec<f64>,
}

impl Accumulator {
    fn add(&mut self, result: RoutingResult) {
        let Some(distance) = result.distance_m else {
            return;
        };
        self.distances.push(distance);
        if self.nearest.as_ref().is_none_or(|(best, _, _)| distance < *best) {
            self.nearest = Some((distance, result.geometry, result.destination_id));
        }
    }

    fn finish(self, thresholds: &[f64]) -> AggregateRow {
        let counts = thresholds
            .iter()
            .map(|&threshold_m| ThresholdCount {
                threshold_m,
                count: self.distances.iter().filter(|d| **d <= threshold_m).count(),
            })
            .collect();
        let (nearest_m, nearest_route, nearest_destination) = match self.nearest {
            Some((distance, route, id)) => (Some(distance), route, Some(id)),
            None => (None, None, None),
        };
        AggregateRow {
            nearest_m,
            nearest_route,
            nearest_destination,
            counts,
        }
    }
}

/// Reduces results per address. Order of `results` does not matter except
/// for ties on the nearest distance, where the first one wins.
pub fn aggregate(
    addresses: &[Address],
    results: impl IntoIterator<Item = RoutingResult>,
    thresholds: &[f64],
) -> RunOutcome {
    let mut summary = RunSummary {
        addresses: addresses.len(),
        ..Default::default()
    };
    let mut accumulators: HashMap<AddressId, Accumulator> = addresses
        .iter()
        .map(|address| (address.id, Accumulator::default()))
        .collect();

    for result in results {
        summary.tasks += 1;
        match result.source {
            DistanceSource::Network => summary.routed += 1,
            DistanceSource::HaversineEstimate => {
                summary.estimated += 1;
                summary.failed += 1;
            }
            DistanceSource::Unavailable => summary.failed += 1,
        }
        accumulators.entry(result.origin_id).or_default().add(result);
    }

    let rows: BTreeMap<AddressId, AggregateRow> = accumulators
        .into_iter()
        .map(|(id, accumulator)| (id, accumulator.finish(thresholds)))
        .collect();
    summary.addresses_without_distance = rows.values().filter(|row| row.nearest_m.is_none()).count();

    RunOutcome { rows, summary }
}
