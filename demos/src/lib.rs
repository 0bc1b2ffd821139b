//! Delivery simulation shared by the demo binaries.
//!
//! A factory and a handful of stores are placed on a generated map. Each
//! agent shuttles between the factory and a random store, asking the
//! scheduler for a route before every leg and walking it one cell per tick.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use routegrid_core::Point;
use routegrid_gen::{MapDefinition, MapGen, random_position, random_position_near};
use routegrid_paths::{Algorithm, GridError, WeightedGrid};
use routegrid_sched::{
    ConfigError, RequestHandle, RequestState, Scheduler, SchedulerConfig, SchedulerStats,
};
use serde::Deserialize;

/// Simulation settings, usually read from a TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub seed: u64,
    /// Ticks to simulate.
    pub ticks: usize,
    pub agents: usize,
    pub stores: usize,
    /// Stores are placed within this distance of the factory.
    pub store_radius: i32,
    /// Algorithms handed out to agents in turn.
    pub algorithms: Vec<Algorithm>,
    /// Ticks an agent waits for a route before withdrawing its request.
    pub patience: Option<usize>,
    pub map: MapDefinition,
    pub scheduler: SchedulerConfig,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 500,
            agents: 4,
            stores: 3,
            store_radius: 20,
            algorithms: vec![Algorithm::UniformCost, Algorithm::HeuristicGuided],
            patience: None,
            map: MapDefinition::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Why a simulation could not be set up.
#[derive(Debug)]
pub enum SimError {
    Grid(GridError),
    Scheduler(ConfigError),
    /// The generated map has no traversable cell.
    EmptyMap,
    NoStores,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(e) => write!(f, "map generation failed: {e}"),
            Self::Scheduler(e) => write!(f, "bad scheduler config: {e}"),
            Self::EmptyMap => f.write_str("generated map has no traversable cell"),
            Self::NoStores => f.write_str("at least one store is required"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            Self::Scheduler(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for SimError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        Self::Scheduler(e)
    }
}

/// What an agent is doing this tick.
#[derive(Debug)]
enum Task {
    Idle,
    Waiting { handle: RequestHandle, waited: usize },
    Travelling { route: Vec<Point>, next: usize },
}

#[derive(Debug)]
struct Agent {
    id: usize,
    pos: Point,
    algorithm: Algorithm,
    /// Heading to a store (true) or back to the factory.
    outbound: bool,
    task: Task,
    inbox: Rc<RefCell<Option<Vec<Point>>>>,
}

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    pub ticks: usize,
    /// Round trips completed (factory, store, factory).
    pub delivered: usize,
    /// Requests the agents withdrew after running out of patience.
    pub abandoned: usize,
    /// Requests that came back with no route.
    pub unreachable: usize,
    pub stats: SchedulerStats,
}

/// The delivery world.
pub struct Simulation {
    grid: Rc<WeightedGrid>,
    scheduler: Scheduler,
    factory: Point,
    stores: Vec<Point>,
    agents: Vec<Agent>,
    rng: StdRng,
    patience: Option<usize>,
    report: Report,
}

impl Simulation {
    /// Generate a map and place the factory, stores and agents on it.
    pub fn new(config: &DeliveryConfig) -> Result<Self, SimError> {
        let mut mapgen = MapGen::new(StdRng::seed_from_u64(config.seed));
        let grid = mapgen.generate(&config.map)?;
        let mut rng = mapgen.rng;

        let factory = random_position(&grid, &mut rng).ok_or(SimError::EmptyMap)?;
        let stores: Vec<Point> = (0..config.stores)
            .map(|_| random_position_near(&grid, factory, config.store_radius, &mut rng))
            .filter(|&p| p != factory)
            .collect();
        log::info!(
            "map {}x{}: {} traversable cells, factory at {factory}, {} stores",
            config.map.width,
            config.map.height,
            grid.len(),
            stores.len()
        );
        Self::from_parts(Rc::new(grid), factory, stores, config, rng)
    }

    /// Build a simulation on an existing grid.
    pub fn from_parts(
        grid: Rc<WeightedGrid>,
        factory: Point,
        stores: Vec<Point>,
        config: &DeliveryConfig,
        rng: StdRng,
    ) -> Result<Self, SimError> {
        if stores.is_empty() {
            return Err(SimError::NoStores);
        }
        let scheduler = Scheduler::new(grid.clone(), config.scheduler.clone())?;
        let agents = (0..config.agents)
            .map(|id| Agent {
                id,
                pos: factory,
                algorithm: if config.algorithms.is_empty() {
                    Algorithm::default()
                } else {
                    config.algorithms[id % config.algorithms.len()]
                },
                outbound: true,
                task: Task::Idle,
                inbox: Rc::new(RefCell::new(None)),
            })
            .collect();
        Ok(Self {
            grid,
            scheduler,
            factory,
            stores,
            agents,
            rng,
            patience: config.patience,
            report: Report::default(),
        })
    }

    /// Advance the world by one tick.
    pub fn tick(&mut self) {
        self.scheduler.tick();
        for i in 0..self.agents.len() {
            self.update_agent(i);
        }
        self.report.ticks += 1;
        self.report.stats = self.scheduler.stats();
    }

    /// Run `ticks` ticks and return the totals so far.
    pub fn run(&mut self, ticks: usize) -> Report {
        for _ in 0..ticks {
            self.tick();
        }
        self.report
    }

    pub fn report(&self) -> Report {
        self.report
    }

    pub fn factory(&self) -> Point {
        self.factory
    }

    pub fn stores(&self) -> &[Point] {
        &self.stores
    }

    pub fn grid(&self) -> &WeightedGrid {
        &self.grid
    }

    /// Current agent positions, by agent id.
    pub fn agent_positions(&self) -> Vec<Point> {
        self.agents.iter().map(|a| a.pos).collect()
    }

    fn update_agent(&mut self, i: usize) {
        let task = std::mem::replace(&mut self.agents[i].task, Task::Idle);
        let task = match task {
            Task::Idle => self.request_route(i),
            Task::Waiting { handle, waited } => self.await_route(i, handle, waited),
            Task::Travelling { route, next } => self.advance(i, route, next),
        };
        self.agents[i].task = task;
    }

    fn request_route(&mut self, i: usize) -> Task {
        let agent = &self.agents[i];
        let target = if agent.outbound {
            self.stores[self.rng.random_range(0..self.stores.len())]
        } else {
            self.factory
        };
        let inbox = agent.inbox.clone();
        let submitted = self.scheduler.submit(agent.pos, target, agent.algorithm, move |route| {
            *inbox.borrow_mut() = Some(route);
        });
        match submitted {
            Ok(handle) => {
                log::debug!("agent {} requested {} -> {target}", agent.id, agent.pos);
                Task::Waiting { handle, waited: 0 }
            }
            Err(e) => {
                log::warn!("agent {} could not request a route: {e}", agent.id);
                Task::Idle
            }
        }
    }

    fn await_route(&mut self, i: usize, handle: RequestHandle, waited: usize) -> Task {
        let agent = &self.agents[i];
        let Some(route) = agent.inbox.borrow_mut().take() else {
            let waited = waited + 1;
            if self.patience.is_some_and(|p| waited > p) && !handle.is_cancel_requested() {
                log::info!("agent {} gave up waiting for request {}", agent.id, handle.id());
                handle.cancel();
            }
            return Task::Waiting { handle, waited };
        };

        if route.is_empty() {
            match handle.state() {
                RequestState::Cancelled => self.report.abandoned += 1,
                state => {
                    log::warn!("agent {} got no route ({state:?})", agent.id);
                    self.report.unreachable += 1;
                }
            }
            return Task::Idle;
        }
        if route.len() == 1 {
            return self.arrive(i);
        }
        Task::Travelling { route, next: 1 }
    }

    fn advance(&mut self, i: usize, route: Vec<Point>, next: usize) -> Task {
        self.agents[i].pos = route[next];
        if next + 1 == route.len() {
            return self.arrive(i);
        }
        Task::Travelling { route, next: next + 1 }
    }

    fn arrive(&mut self, i: usize) -> Task {
        let agent = &mut self.agents[i];
        if agent.outbound {
            log::debug!("agent {} reached store at {}", agent.id, agent.pos);
        } else {
            self.report.delivered += 1;
            log::info!("agent {} completed a delivery", agent.id);
        }
        agent.outbound = !agent.outbound;
        Task::Idle
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("factory", &self.factory)
            .field("stores", &self.stores)
            .field("agents", &self.agents.len())
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}
