//! Canonical price source for the ingest tier
//!
//! Holds the current value and replaces it on an [`UpdateSchedule`], either
//! a fixed interval or a random delay drawn from a range before each update.
//! Each replacement is broadcast once through the tier's hub.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::Error;
use crate::registry::{BroadcastHub, PriceTick};

/// Starting value of the random walk
const WALK_START: f64 = 100.0;

/// Largest single step of the random walk, in either direction
const WALK_STEP: f64 = 5.0;

/// Shortest delay between two updates
const MIN_DELAY: Duration = Duration::from_millis(1);

/// How the next value is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceModel {
    /// Independent draw in `[100, 1000)` every update
    #[default]
    Uniform,
    /// Start at 100 and move by up to ±5 per update, never below 0
    RandomWalk,
}

impl PriceModel {
    fn initial(self) -> f64 {
        match self {
            PriceModel::Uniform => Self::Uniform.next(0.0),
            PriceModel::RandomWalk => WALK_START,
        }
    }

    fn next(self, current: f64) -> f64 {
        let mut rng = rand::rng();
        match self {
            PriceModel::Uniform => rng.random_range(100.0..1000.0),
            PriceModel::RandomWalk => {
                let change: f64 = rng.random_range(-WALK_STEP..WALK_STEP);
                (current + change).max(0.0)
            }
        }
    }
}

impl FromStr for PriceModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uniform" => Ok(PriceModel::Uniform),
            "walk" | "random-walk" => Ok(PriceModel::RandomWalk),
            other => Err(Error::Config(format!(
                "unknown price model '{other}', expected 'uniform' or 'walk'"
            ))),
        }
    }
}

/// When the next price update happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSchedule {
    /// Every `period`, starting immediately
    Fixed(Duration),
    /// First update immediately, then each one after a delay drawn uniformly
    /// from `[min, max]`
    Jittered { min: Duration, max: Duration },
}

impl UpdateSchedule {
    /// Random delays in `[min, max]`; `max` is raised to `min` if lower and
    /// both have a 1ms floor
    pub fn jittered(min: Duration, max: Duration) -> Self {
        let min = min.max(MIN_DELAY);
        UpdateSchedule::Jittered {
            min,
            max: max.max(min),
        }
    }

    /// Delay until the update after this one
    pub fn next_delay(&self) -> Duration {
        match *self {
            UpdateSchedule::Fixed(period) => period,
            UpdateSchedule::Jittered { min, max } => rand::rng().random_range(min..=max),
        }
    }
}

impl Default for UpdateSchedule {
    fn default() -> Self {
        UpdateSchedule::Fixed(Duration::from_millis(100))
    }
}

impl FromStr for UpdateSchedule {
    type Err = Error;

    /// `"250"` is a fixed 250ms interval, `"100-3000"` a random delay range
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let millis = |part: &str| {
            part.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| Error::Config(format!("invalid delay '{part}' in schedule '{s}'")))
        };

        match s.split_once('-') {
            Some((min, max)) => {
                let (min, max) = (millis(min)?, millis(max)?);
                if max < min {
                    return Err(Error::Config(format!(
                        "schedule '{s}' has its upper bound below its lower bound"
                    )));
                }
                Ok(UpdateSchedule::jittered(min, max))
            }
            None => Ok(UpdateSchedule::Fixed(millis(s)?.max(MIN_DELAY))),
        }
    }
}

struct State {
    value: f64,
    tick: PriceTick,
}

/// Current canonical price
pub struct PriceSource {
    model: PriceModel,
    state: RwLock<State>,
}

impl PriceSource {
    /// Create a source seeded with the model's initial value
    pub fn new(model: PriceModel) -> Self {
        let value = model.initial();
        Self {
            model,
            state: RwLock::new(State {
                value,
                tick: PriceTick::from_value(value),
            }),
        }
    }

    /// The model driving updates
    pub fn model(&self) -> PriceModel {
        self.model
    }

    /// Current value
    pub fn current(&self) -> PriceTick {
        self.state.read().tick.clone()
    }

    /// Produce and store the next value
    pub fn advance(&self) -> PriceTick {
        let mut state = self.state.write();
        state.value = self.model.next(state.value);
        state.tick = PriceTick::from_value(state.value);
        state.tick.clone()
    }

    /// Replace the current value with an externally supplied one
    ///
    /// A random walk continues from `tick` when it parses as a number.
    pub fn set(&self, tick: PriceTick) -> PriceTick {
        let mut state = self.state.write();
        if let Ok(value) = tick.price().parse::<f64>() {
            state.value = value;
        }
        state.tick = tick;
        state.tick.clone()
    }

    /// Spawn the update timer
    ///
    /// The next value is stored and broadcast through `hub` on every step of
    /// `schedule`, the first one right away. The task exits once the hub is
    /// closed.
    pub fn spawn_updates(
        self: &Arc<Self>,
        hub: Arc<BroadcastHub>,
        schedule: UpdateSchedule,
    ) -> JoinHandle<()> {
        let source = Arc::clone(self);

        tokio::spawn(async move {
            match schedule {
                UpdateSchedule::Fixed(period) => {
                    let mut ticker = tokio::time::interval(period.max(MIN_DELAY));
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                    loop {
                        ticker.tick().await;
                        if hub.is_closed() {
                            break;
                        }
                        hub.broadcast(&source.advance());
                    }
                }
                UpdateSchedule::Jittered { .. } => loop {
                    if hub.is_closed() {
                        break;
                    }
                    hub.broadcast(&source.advance());

                    let delay = schedule.next_delay();
                    tracing::trace!(
                        delay_ms = delay.as_millis() as u64,
                        "Next price update scheduled"
                    );
                    tokio::time::sleep(delay).await;
                },
            }

            tracing::debug!("Price update timer stopped");
        })
    }
}
