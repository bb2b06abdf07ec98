//! Core evolution engine for the Restless Life simulation.
//!
//! The engine runs a Game of Life variant on a fixed-size board and couples
//! it to a feedback loop: when the board settles into a fixed point or a
//! short cycle, three probabilistic rule perturbations are escalated until
//! novel states resume, then decayed back toward zero. All randomness flows
//! through an injected RNG so every run is reproducible from a seed.

use rand::{Rng, RngCore, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Relative offsets of the 8 Moore neighbors (orthogonal + diagonal).
const MOORE_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Monotonic step counter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u64);

impl Tick {
    /// Tick zero, the state before the first step.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// The next tick in sequence.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Errors that can occur when constructing or feeding the engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A board with the wrong dimensions was handed to the engine.
    #[error("board is {found_width}x{found_height}, engine expects {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        found_width: u32,
        found_height: u32,
    },
}

/// Static configuration for a Restless Life world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LifeConfig {
    /// Board width in cells.
    pub width: u32,
    /// Board height in cells.
    pub height: u32,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Probability that the initializer marks a cell alive.
    pub initial_density: f32,
    /// Additive escalation applied to the flesh-wound probability per stagnant step.
    pub flesh_wound_increment: f32,
    /// Additive escalation applied to the abduction probability per stagnant step.
    pub abduction_increment: f32,
    /// Additive escalation applied to the find-a-way probability per stagnant step.
    pub find_a_way_increment: f32,
    /// Fraction of each increment removed per non-stagnant step.
    pub decrement_scale: f32,
    /// Number of recent boards retained for cycle detection.
    pub window_capacity: usize,
    /// Maximum number of recent step summaries retained in-memory.
    pub history_capacity: usize,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            rng_seed: None,
            initial_density: 0.5,
            flesh_wound_increment: 0.01,
            abduction_increment: 0.02,
            find_a_way_increment: 0.001,
            decrement_scale: 0.25,
            window_capacity: 10,
            history_capacity: 256,
        }
    }
}

impl LifeConfig {
    /// Validates the configuration before a world is built around it.
    fn validate(&self) -> Result<(), WorldError> {
        if self.width == 0 || self.height == 0 {
            return Err(WorldError::InvalidConfig(
                "board dimensions must be non-zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.initial_density) {
            return Err(WorldError::InvalidConfig(
                "initial_density must be within [0, 1]",
            ));
        }
        if self.flesh_wound_increment < 0.0
            || self.abduction_increment < 0.0
            || self.find_a_way_increment < 0.0
        {
            return Err(WorldError::InvalidConfig(
                "perturbation increments must be non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.decrement_scale) {
            return Err(WorldError::InvalidConfig(
                "decrement_scale must be within [0, 1]",
            ));
        }
        if self.window_capacity == 0 {
            return Err(WorldError::InvalidConfig(
                "window_capacity must be non-zero",
            ));
        }
        if self.history_capacity == 0 {
            return Err(WorldError::InvalidConfig(
                "history_capacity must be non-zero",
            ));
        }
        Ok(())
    }

    /// Returns the configured RNG, seeding from entropy if no seed was given.
    fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

/// Fixed-size 2D board of alive/dead cells.
///
/// Boards are immutable during generation: each step reads one board and
/// writes a fresh one, so a retained board is always a faithful snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Board {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl Board {
    /// Construct an all-dead board of `width * height` cells.
    pub fn dead(width: u32, height: u32) -> Result<Self, WorldError> {
        if width == 0 || height == 0 {
            return Err(WorldError::InvalidConfig(
                "board dimensions must be non-zero",
            ));
        }
        Ok(Self {
            width,
            height,
            cells: vec![false; (width as usize) * (height as usize)],
        })
    }

    /// Construct a random board where each cell is alive with probability
    /// `density`. This is the initializer used for the first board of a run;
    /// it consults nothing but the RNG.
    pub fn random(
        width: u32,
        height: u32,
        density: f32,
        rng: &mut dyn RngCore,
    ) -> Result<Self, WorldError> {
        let mut board = Self::dead(width, height)?;
        board.randomize(density, rng);
        Ok(board)
    }

    /// Re-randomizes every cell in place with the given alive probability.
    pub fn randomize(&mut self, density: f32, rng: &mut dyn RngCore) {
        for cell in &mut self.cells {
            *cell = rng.random::<f32>() < density;
        }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns the flat index for `(x, y)` without bounds checks.
    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// State of a specific cell, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<bool> {
        if x < self.width && y < self.height {
            Some(self.cells[self.offset(x, y)])
        } else {
            None
        }
    }

    /// Treats out-of-bounds coordinates as dead. There is no wraparound:
    /// the board edge is a hard boundary, not a torus.
    #[must_use]
    pub fn is_alive(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return false;
        }
        self.cells[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// Mutable access to a specific cell.
    pub fn get_mut(&mut self, x: u32, y: u32) -> Option<&mut bool> {
        if x < self.width && y < self.height {
            let idx = self.offset(x, y);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// Row-major view of the raw cell states.
    #[must_use]
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Counts live cells across the whole board.
    #[must_use]
    pub fn population(&self) -> usize {
        self.cells.iter().filter(|&&alive| alive).count()
    }
}

/// Exact cell-by-cell equality, exposed for driver diagnostics.
///
/// Boards with differing dimensions are never equal.
#[must_use]
pub fn boards_equal(a: &Board, b: &Board) -> bool {
    a == b
}

/// Counts alive cells among the 8 Moore neighbors of `(x, y)`.
///
/// The center cell is excluded and neighbors outside the board contribute
/// nothing, so the result is always in `0..=8`.
#[must_use]
pub fn live_neighbors(board: &Board, x: u32, y: u32) -> u8 {
    let mut count = 0u8;
    for (dx, dy) in MOORE_OFFSETS {
        if board.is_alive(i64::from(x) + dx, i64::from(y) + dy) {
            count += 1;
        }
    }
    count
}

/// The three perturbation probabilities layered onto the base rule.
///
/// Values below zero never occur (the controller clamps at 0); values at or
/// above one make the corresponding perturbation fire on every draw.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RuleParams {
    /// Chance a cell the base rule kills survives anyway.
    pub flesh_wound: f32,
    /// Chance a live cell with exactly 4 neighbors dies regardless.
    pub abduction: f32,
    /// Chance a dead cell with at least one live neighbor comes alive.
    pub find_a_way: f32,
}

impl RuleParams {
    /// Whether any perturbation currently has a positive probability.
    #[must_use]
    pub fn any_positive(&self) -> bool {
        self.flesh_wound > 0.0 || self.abduction > 0.0 || self.find_a_way > 0.0
    }
}

/// Per-step events emitted by [`LifeWorld::step`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepEvents {
    pub tick: Tick,
    /// Cells resurrected by the flesh-wound perturbation this step.
    pub flesh_wounds: u32,
    /// Cells removed by the abduction perturbation this step.
    pub abductions: u32,
    /// Cells spawned by the find-a-way perturbation this step.
    pub find_a_ways: u32,
    /// Whether the fresh board matched a board in the history window.
    pub stagnant: bool,
    /// Whether the controller changed any rule parameter this step.
    pub params_changed: bool,
}

/// Monotonic event totals across the lifetime of a world.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepTotals {
    pub steps: u64,
    pub flesh_wounds: u64,
    pub abductions: u64,
    pub find_a_ways: u64,
    pub stagnant_steps: u64,
}

/// Summary retained per step for charts and trend lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSummary {
    pub tick: Tick,
    pub population: usize,
    pub stagnant: bool,
    pub params: RuleParams,
    pub flesh_wounds: u32,
    pub abductions: u32,
    pub find_a_ways: u32,
}

/// The cell transition rule, closed over a copy of the parameters.
///
/// Parameters are read once at construction; the engine rebuilds the rule
/// whenever the controller changes them, never mid-board.
///
/// The rule is an ordered pipeline on top of the classical B3/S23 decision.
/// Order is load-bearing: abduction is only visible when a flesh wound has
/// already resurrected the cell (a live cell with 4 neighbors fails the base
/// rule either way), and find-a-way overrides a failed reproduction.
#[derive(Debug, Clone, Copy)]
pub struct CellRule {
    params: RuleParams,
}

impl CellRule {
    /// Builds a rule closed over the given parameters.
    #[must_use]
    pub fn new(params: RuleParams) -> Self {
        Self { params }
    }

    /// Parameters this rule was constructed with.
    #[must_use]
    pub const fn params(&self) -> RuleParams {
        self.params
    }

    /// One independent uniform draw in `[0, 1)` compared against `p`, so
    /// `p >= 1` always fires and `p <= 0` never does.
    fn roll(rng: &mut dyn RngCore, p: f32) -> bool {
        rng.random::<f32>() < p
    }

    /// Computes the next state of `(x, y)` from the previous board.
    ///
    /// Reads only `prev`; perturbation firings are tallied into `events`.
    pub fn evaluate(
        &self,
        prev: &Board,
        x: u32,
        y: u32,
        rng: &mut dyn RngCore,
        events: &mut StepEvents,
    ) -> bool {
        let was_alive = prev.is_alive(i64::from(x), i64::from(y));
        let neighbors = live_neighbors(prev, x, y);

        if was_alive {
            // Base rule: survival iff 2 or 3 neighbors.
            let mut alive = neighbors == 2 || neighbors == 3;

            // Flesh wound: a cell slated to die shrugs it off.
            if !alive && Self::roll(rng, self.params.flesh_wound) {
                alive = true;
                events.flesh_wounds += 1;
            }

            // Abduction: at exactly 4 neighbors the cell can vanish even
            // after a flesh wound saved it.
            if neighbors == 4 && Self::roll(rng, self.params.abduction) {
                alive = false;
                events.abductions += 1;
            }

            alive
        } else {
            // Base rule: reproduction iff exactly 3 neighbors.
            let mut alive = neighbors == 3;

            // Find a way: life emerges next to any live neighbor.
            if neighbors >= 1 && Self::roll(rng, self.params.find_a_way) {
                alive = true;
                events.find_a_ways += 1;
            }

            alive
        }
    }

    /// Produces the next board by evaluating every coordinate in row-major
    /// order. All reads come from `prev`, all writes go to the new board.
    #[must_use]
    pub fn next_board(&self, prev: &Board, rng: &mut dyn RngCore, events: &mut StepEvents) -> Board {
        let width = prev.width();
        let height = prev.height();
        let mut cells = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                cells.push(self.evaluate(prev, x, y, rng, events));
            }
        }
        Board {
            width,
            height,
            cells,
        }
    }
}

/// Bounded FIFO of recent boards used to detect fixed points and cycles.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    capacity: usize,
    boards: VecDeque<Board>,
}

impl HistoryWindow {
    /// Creates an empty window holding at most `capacity` boards.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            boards: VecDeque::with_capacity(capacity),
        }
    }

    /// True iff `board` exactly matches any retained board.
    #[must_use]
    pub fn contains(&self, board: &Board) -> bool {
        self.boards.iter().any(|held| held == board)
    }

    /// Retains `board`, evicting the oldest entry once at capacity.
    pub fn record(&mut self, board: Board) {
        if self.boards.len() >= self.capacity {
            self.boards.pop_front();
        }
        self.boards.push_back(board);
    }

    /// Drops every retained board.
    pub fn clear(&mut self) {
        self.boards.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.boards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Closed feedback loop between the stagnation detector and the rule
/// parameters.
///
/// Stagnation raises each probability by its configured increment;
/// novelty walks each positive probability back down by a fraction of
/// that increment, clamped at exactly zero.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackController {
    flesh_wound_increment: f32,
    abduction_increment: f32,
    find_a_way_increment: f32,
    decrement_scale: f32,
}

impl FeedbackController {
    /// Builds a controller from the configured increments and decay scale.
    #[must_use]
    pub fn new(config: &LifeConfig) -> Self {
        Self {
            flesh_wound_increment: config.flesh_wound_increment,
            abduction_increment: config.abduction_increment,
            find_a_way_increment: config.find_a_way_increment,
            decrement_scale: config.decrement_scale,
        }
    }

    /// Applies one transition to `params`, returning whether any value
    /// actually changed (the caller must rebuild the rule when it did).
    pub fn apply(&self, params: &mut RuleParams, stagnant: bool) -> bool {
        if stagnant {
            self.escalate(params)
        } else {
            self.relax(params)
        }
    }

    /// Stagnant step: every parameter grows by its increment, unbounded above.
    pub fn escalate(&self, params: &mut RuleParams) -> bool {
        let before = *params;
        params.flesh_wound += self.flesh_wound_increment;
        params.abduction += self.abduction_increment;
        params.find_a_way += self.find_a_way_increment;
        *params != before
    }

    /// Novel step: every positive parameter shrinks by `increment *
    /// decrement_scale`, clamped at zero. Parameters already at zero are
    /// left untouched.
    pub fn relax(&self, params: &mut RuleParams) -> bool {
        let before = *params;
        if params.flesh_wound > 0.0 {
            params.flesh_wound =
                (params.flesh_wound - self.flesh_wound_increment * self.decrement_scale).max(0.0);
        }
        if params.abduction > 0.0 {
            params.abduction =
                (params.abduction - self.abduction_increment * self.decrement_scale).max(0.0);
        }
        if params.find_a_way > 0.0 {
            params.find_a_way =
                (params.find_a_way - self.find_a_way_increment * self.decrement_scale).max(0.0);
        }
        *params != before
    }
}

/// Aggregate engine state driven once per external tick.
///
/// Per step: the rule generates a fresh board from the previous one, the
/// history window judges it stagnant or novel, the controller adjusts the
/// parameters accordingly, and the rule is rebuilt when they moved.
pub struct LifeWorld {
    config: LifeConfig,
    tick: Tick,
    rng: SmallRng,
    board: Board,
    params: RuleParams,
    rule: CellRule,
    controller: FeedbackController,
    window: HistoryWindow,
    totals: StepTotals,
    history: VecDeque<StepSummary>,
}

impl std::fmt::Debug for LifeWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifeWorld")
            .field("config", &self.config)
            .field("tick", &self.tick)
            .field("population", &self.board.population())
            .field("params", &self.params)
            .finish()
    }
}

impl LifeWorld {
    /// Instantiate a world, building the first board with the initializer.
    pub fn new(config: LifeConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let mut rng = config.seeded_rng();
        let board = Board::random(config.width, config.height, config.initial_density, &mut rng)?;
        let params = RuleParams::default();
        let controller = FeedbackController::new(&config);
        let window = HistoryWindow::new(config.window_capacity);
        let history_capacity = config.history_capacity;
        Ok(Self {
            config,
            tick: Tick::zero(),
            rng,
            board,
            params,
            rule: CellRule::new(params),
            controller,
            window,
            totals: StepTotals::default(),
            history: VecDeque::with_capacity(history_capacity),
        })
    }

    /// Execute one simulation step, returning the events it emitted.
    pub fn step(&mut self) -> StepEvents {
        let next_tick = self.tick.next();
        let mut events = StepEvents {
            tick: next_tick,
            ..StepEvents::default()
        };

        let next = self.rule.next_board(&self.board, &mut self.rng, &mut events);
        let stagnant = self.window.contains(&next);
        self.window.record(next.clone());
        self.board = next;

        events.stagnant = stagnant;
        events.params_changed = self.controller.apply(&mut self.params, stagnant);
        if events.params_changed {
            self.rule = CellRule::new(self.params);
        }

        self.totals.steps += 1;
        self.totals.flesh_wounds += u64::from(events.flesh_wounds);
        self.totals.abductions += u64::from(events.abductions);
        self.totals.find_a_ways += u64::from(events.find_a_ways);
        if stagnant {
            self.totals.stagnant_steps += 1;
        }

        self.push_summary(StepSummary {
            tick: next_tick,
            population: self.board.population(),
            stagnant,
            params: self.params,
            flesh_wounds: events.flesh_wounds,
            abductions: events.abductions,
            find_a_ways: events.find_a_ways,
        });

        self.tick = next_tick;
        events
    }

    fn push_summary(&mut self, summary: StepSummary) {
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary);
    }

    /// Replace the current board, e.g. to seed a known pattern.
    ///
    /// The history window is cleared so the injected board is judged only
    /// against its own future. Dimensions must match the configured board.
    pub fn set_board(&mut self, board: Board) -> Result<(), WorldError> {
        if board.width() != self.config.width || board.height() != self.config.height {
            return Err(WorldError::DimensionMismatch {
                expected_width: self.config.width,
                expected_height: self.config.height,
                found_width: board.width(),
                found_height: board.height(),
            });
        }
        self.window.clear();
        self.board = board;
        Ok(())
    }

    /// Throw the board back to a fresh random state.
    ///
    /// Parameters reset to zero and the window is cleared; tick, totals,
    /// and history carry on.
    pub fn reseed(&mut self) {
        self.board
            .randomize(self.config.initial_density, &mut self.rng);
        self.window.clear();
        self.params = RuleParams::default();
        self.rule = CellRule::new(self.params);
    }

    /// Returns an immutable reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &LifeConfig {
        &self.config
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// The current board snapshot.
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Current rule parameters.
    #[must_use]
    pub const fn params(&self) -> RuleParams {
        self.params
    }

    /// Live cell count of the current board.
    #[must_use]
    pub fn population(&self) -> usize {
        self.board.population()
    }

    /// Monotonic event totals since construction.
    #[must_use]
    pub const fn totals(&self) -> StepTotals {
        self.totals
    }

    /// Iterate over retained step summaries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &StepSummary> {
        self.history.iter()
    }

    /// Number of boards currently held by the stagnation window.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Borrow the world RNG mutably for deterministic sampling.
    #[must_use]
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}
