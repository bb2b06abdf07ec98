//! Ratatui terminal front-end: board view, live counters, and event log.

use std::{
    collections::VecDeque,
    io::{self, Stdout},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Sparkline},
};
use restless_core::{LifeWorld, RuleParams, StepEvents};
use serde::Serialize;
use tracing::info;

use crate::renderer::Renderer;

const TARGET_SIM_HZ: f32 = 10.0;
const MAX_STEPS_PER_FRAME: usize = 60;
const UI_TICK_MILLIS: u64 = 50;
const DEFAULT_HEADLESS_FRAMES: usize = 12;
const MAX_HEADLESS_FRAMES: usize = 360;
const EVENT_LOG_CAPACITY: usize = 16;

pub struct TerminalRenderer {
    tick_interval: Duration,
    draw_interval: Duration,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs_f32(1.0 / TARGET_SIM_HZ),
            draw_interval: Duration::from_millis(UI_TICK_MILLIS),
        }
    }
}

impl Renderer for TerminalRenderer {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn run(&self, world: LifeWorld) -> Result<()> {
        if std::env::var_os("RESTLESS_TERMINAL_HEADLESS").is_some() {
            let report = self.run_headless(world)?;
            info!(
                target = "restless::terminal",
                frames = report.frames,
                final_tick = report.final_tick,
                final_population = report.final_population,
                stagnant_steps = report.stagnant_steps,
                flesh_wounds = report.flesh_wounds,
                abductions = report.abductions,
                find_a_ways = report.find_a_ways,
                "Terminal headless run completed"
            );
            return Ok(());
        }

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enable raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to build terminal backend")?;
        terminal.hide_cursor().ok();

        let result = run_event_loop(self, &mut terminal, world);

        terminal.show_cursor().ok();
        if let Err(err) = disable_raw_mode() {
            tracing::error!(?err, "failed to disable raw mode");
        }
        if let Err(err) = execute!(terminal.backend_mut(), LeaveAlternateScreen) {
            tracing::error!(?err, "failed to leave alternate screen");
        }

        result
    }
}

fn run_event_loop(
    renderer: &TerminalRenderer,
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    world: LifeWorld,
) -> Result<()> {
    let mut app = TerminalApp::new(renderer, world);

    loop {
        let now = Instant::now();
        app.maybe_step_simulation(now);

        if now.duration_since(app.last_draw) >= app.draw_interval {
            terminal.draw(|frame| app.draw(frame))?;
            app.last_draw = now;
        }

        let timeout = renderer.draw_interval;
        if event::poll(timeout).unwrap_or(false) {
            if let Event::Key(key) = event::read()? {
                if app.handle_key(key)? {
                    break;
                }
            }
        }
    }

    Ok(())
}

impl TerminalRenderer {
    fn run_headless(&self, world: LifeWorld) -> Result<HeadlessReport> {
        let backend = ratatui::backend::TestBackend::new(80, 30);
        let mut terminal = Terminal::new(backend).context("failed to build test backend")?;
        let mut app = TerminalApp::new(self, world);
        let initial_population = app.world.population();
        let frames = self.headless_frame_budget();

        for _ in 0..frames {
            app.step_once();
            terminal.draw(|frame| app.draw(frame))?;
        }

        let totals = app.world.totals();
        let report = HeadlessReport {
            frames,
            final_tick: app.world.tick().0,
            initial_population,
            final_population: app.world.population(),
            stagnant_steps: totals.stagnant_steps,
            flesh_wounds: totals.flesh_wounds,
            abductions: totals.abductions,
            find_a_ways: totals.find_a_ways,
            final_params: app.world.params(),
        };

        if let Some(path) = report_file_path_from_env() {
            report.write_json(&path).with_context(|| {
                format!("failed to write headless report to {}", path.display())
            })?;
        }

        Ok(report)
    }

    fn headless_frame_budget(&self) -> usize {
        std::env::var("RESTLESS_TERMINAL_HEADLESS_FRAMES")
            .ok()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|value| *value > 0)
            .map(|value| value.min(MAX_HEADLESS_FRAMES))
            .unwrap_or(DEFAULT_HEADLESS_FRAMES)
    }
}

fn report_file_path_from_env() -> Option<PathBuf> {
    std::env::var_os("RESTLESS_TERMINAL_REPORT").map(PathBuf::from)
}

/// Summary emitted by a headless run, written as JSON when requested.
#[derive(Debug, Serialize)]
struct HeadlessReport {
    frames: usize,
    final_tick: u64,
    initial_population: usize,
    final_population: usize,
    stagnant_steps: u64,
    flesh_wounds: u64,
    abductions: u64,
    find_a_ways: u64,
    final_params: RuleParams,
}

impl HeadlessReport {
    fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Info,
    Stagnation,
    Relaxation,
}

#[derive(Debug, Clone)]
struct EventEntry {
    tick: u64,
    kind: EventKind,
    message: String,
}

/// Style palette for the terminal surface.
struct Palette;

impl Palette {
    fn header_style(&self) -> Style {
        Style::default().fg(Color::Cyan)
    }

    fn accent_style(&self) -> Style {
        Style::default().fg(Color::Magenta)
    }

    fn cell_style(&self) -> Style {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    }

    fn paused_style(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    }

    fn running_style(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Green)
            .add_modifier(Modifier::BOLD)
    }

    fn event_style(&self, kind: EventKind) -> Style {
        match kind {
            EventKind::Info => Style::default().fg(Color::Gray),
            EventKind::Stagnation => Style::default().fg(Color::Red),
            EventKind::Relaxation => Style::default().fg(Color::Green),
        }
    }

    fn title(&self, text: impl Into<String>) -> Span<'static> {
        Span::styled(
            text.into(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }
}

struct TerminalApp {
    world: LifeWorld,
    tick_interval: Duration,
    draw_interval: Duration,
    speed_multiplier: f32,
    paused: bool,
    help_visible: bool,
    sim_accumulator: f32,
    last_tick: Instant,
    last_draw: Instant,
    palette: Palette,
    event_log: VecDeque<EventEntry>,
    stagnation_streak: u64,
    was_stagnant: bool,
    last_events: StepEvents,
}

impl TerminalApp {
    fn new(renderer: &TerminalRenderer, world: LifeWorld) -> Self {
        Self {
            world,
            tick_interval: renderer.tick_interval,
            draw_interval: renderer.draw_interval,
            speed_multiplier: 1.0,
            paused: false,
            help_visible: false,
            sim_accumulator: 0.0,
            last_tick: Instant::now(),
            last_draw: Instant::now(),
            palette: Palette,
            event_log: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
            stagnation_streak: 0,
            was_stagnant: false,
            last_events: StepEvents::default(),
        }
    }

    fn maybe_step_simulation(&mut self, now: Instant) {
        let delta = now - self.last_tick;
        self.last_tick = now;

        let effective_speed = if self.paused {
            0.0
        } else {
            self.speed_multiplier.max(0.0)
        };

        let step_interval = self.tick_interval.as_secs_f32();
        let mut steps = 0usize;
        if effective_speed > f32::EPSILON && step_interval > f32::EPSILON {
            self.sim_accumulator += delta.as_secs_f32() * effective_speed;
            let max_accumulator = step_interval * MAX_STEPS_PER_FRAME as f32;
            if self.sim_accumulator > max_accumulator {
                self.sim_accumulator = max_accumulator;
            }
            steps = (self.sim_accumulator / step_interval).floor() as usize;
            if steps > MAX_STEPS_PER_FRAME {
                steps = MAX_STEPS_PER_FRAME;
            }
            if steps > 0 {
                self.sim_accumulator -= step_interval * steps as f32;
            }
        }

        for _ in 0..steps {
            self.step_once();
        }
    }

    fn step_once(&mut self) {
        let events = self.world.step();
        self.ingest_events(events);
    }

    fn ingest_events(&mut self, events: StepEvents) {
        if events.stagnant {
            self.stagnation_streak += 1;
        } else {
            self.stagnation_streak = 0;
        }

        if events.stagnant && !self.was_stagnant {
            let params = self.world.params();
            info!(
                target = "restless::terminal",
                tick = events.tick.0,
                flesh_wound = params.flesh_wound,
                abduction = params.abduction,
                find_a_way = params.find_a_way,
                "Stagnation detected; escalating randomness"
            );
            self.push_event(
                events.tick.0,
                EventKind::Stagnation,
                "Stagnation detected; escalating randomness",
            );
        } else if !events.stagnant && self.was_stagnant {
            info!(
                target = "restless::terminal",
                tick = events.tick.0,
                "Novel board; relaxing randomness"
            );
            self.push_event(
                events.tick.0,
                EventKind::Relaxation,
                "Novel board; relaxing randomness",
            );
        }

        self.was_stagnant = events.stagnant;
        self.last_events = events;
    }

    fn push_event(&mut self, tick: u64, kind: EventKind, message: impl Into<String>) {
        if self.event_log.len() >= EVENT_LOG_CAPACITY {
            self.event_log.pop_front();
        }
        self.event_log.push_back(EventEntry {
            tick,
            kind,
            message: message.into(),
        });
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(frame.area());

        self.draw_header(frame, outer[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(42)])
            .split(outer[1]);

        self.draw_board(frame, body[0]);

        let sidebar = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(7),
                Constraint::Length(5),
                Constraint::Min(3),
            ])
            .split(body[1]);

        self.draw_params(frame, sidebar[0]);
        self.draw_trends(frame, sidebar[1]);
        self.draw_events(frame, sidebar[2]);

        if self.help_visible {
            self.draw_help(frame);
        }
    }

    fn draw_header(&self, frame: &mut Frame<'_>, area: Rect) {
        let totals = self.world.totals();
        let status = format!(
            "Tick {:>6}  Pop {:>5}  Streak {:>3}  FW {:>4}  AB {:>4}  FAW {:>4}",
            self.world.tick().0,
            self.world.population(),
            self.stagnation_streak,
            totals.flesh_wounds,
            totals.abductions,
            totals.find_a_ways,
        );

        let state_flag = if self.paused {
            Span::styled(" PAUSED ", self.palette.paused_style())
        } else {
            Span::styled(" RUNNING ", self.palette.running_style())
        };

        let mut line = Line::from(vec![Span::styled(status, self.palette.header_style())]);
        line.spans.push(Span::raw("  "));
        line.spans.push(state_flag);
        line.spans.push(Span::styled(
            format!(
                " x{:.1} ",
                if self.paused {
                    0.0
                } else {
                    self.speed_multiplier
                }
            ),
            self.palette.accent_style(),
        ));

        let paragraph = Paragraph::new(line).block(
            Block::default()
                .title(self.palette.title("Restless Life"))
                .borders(Borders::ALL),
        );
        frame.render_widget(paragraph, area);
    }

    fn draw_board(&self, frame: &mut Frame<'_>, area: Rect) {
        let board = self.world.board();
        let title = format!("Board {}x{}", board.width(), board.height());
        let block = Block::default()
            .title(self.palette.title(title))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let view_width = u32::from(inner.width).min(board.width());
        let view_height = u32::from(inner.height).min(board.height());

        let mut lines = Vec::with_capacity(view_height as usize);
        for y in 0..view_height {
            let mut text = String::with_capacity(view_width as usize);
            for x in 0..view_width {
                let glyph = if board.get(x, y).unwrap_or(false) {
                    'o'
                } else {
                    ' '
                };
                text.push(glyph);
            }
            lines.push(Line::from(Span::styled(text, self.palette.cell_style())));
        }

        frame.render_widget(Paragraph::new(Text::from(lines)), inner);
    }

    fn draw_params(&self, frame: &mut Frame<'_>, area: Rect) {
        let params = self.world.params();
        let last = self.last_events;
        let lines = vec![
            Line::from(vec![
                Span::styled("Flesh wound ", self.palette.header_style()),
                Span::raw(format!("p {:>7.4}  fired {:>3}", params.flesh_wound, last.flesh_wounds)),
            ]),
            Line::from(vec![
                Span::styled("Abduction   ", self.palette.header_style()),
                Span::raw(format!("p {:>7.4}  fired {:>3}", params.abduction, last.abductions)),
            ]),
            Line::from(vec![
                Span::styled("Find a way  ", self.palette.header_style()),
                Span::raw(format!("p {:>7.4}  fired {:>3}", params.find_a_way, last.find_a_ways)),
            ]),
            Line::from(vec![
                Span::styled("Stagnant    ", self.palette.header_style()),
                Span::raw(if last.stagnant { "yes" } else { "no" }),
                Span::raw(format!("   window {:>2}", self.world.window_len())),
            ]),
            Line::from(vec![
                Span::styled("Steps       ", self.palette.header_style()),
                Span::raw(format!(
                    "{:>6}  stagnant {:>5}",
                    self.world.totals().steps,
                    self.world.totals().stagnant_steps
                )),
            ]),
        ];

        let paragraph = Paragraph::new(Text::from(lines)).block(
            Block::default()
                .title(self.palette.title("Rule Parameters"))
                .borders(Borders::ALL),
        );
        frame.render_widget(paragraph, area);
    }

    fn draw_trends(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(self.palette.title("Population Trend"))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.height == 0 {
            return;
        }

        let population_data: Vec<u64> = self
            .world
            .history()
            .map(|summary| summary.population as u64)
            .collect();

        if !population_data.is_empty() {
            let window = inner.width as usize;
            let start = population_data.len().saturating_sub(window);
            let spark = Sparkline::default()
                .style(self.palette.accent_style())
                .data(&population_data[start..]);
            frame.render_widget(spark, inner);
        }
    }

    fn draw_events(&self, frame: &mut Frame<'_>, area: Rect) {
        let events: Vec<ListItem> = self
            .event_log
            .iter()
            .rev()
            .map(|entry| {
                let style = self.palette.event_style(entry.kind);
                let text = format!("[t{:>6}] {}", entry.tick, entry.message);
                ListItem::new(Span::styled(text, style))
            })
            .collect();
        let block = Block::default()
            .title(self.palette.title("Recent Events"))
            .borders(Borders::ALL);
        frame.render_widget(List::new(events).block(block), area);
    }

    fn draw_help(&self, frame: &mut Frame<'_>) {
        let size = frame.area();
        let help_width = (size.width / 2).max(30).min(size.width);
        let help_height = 9u16.min(size.height);
        let help_x = size.x + (size.width - help_width) / 2;
        let help_y = size.y + (size.height - help_height) / 2;
        let area = Rect::new(help_x, help_y, help_width, help_height);

        let help_lines = vec![
            Line::from(vec![Span::styled(
                "Controls",
                self.palette.header_style().add_modifier(Modifier::BOLD),
            )]),
            Line::raw(" q      Quit"),
            Line::raw(" space  Toggle pause"),
            Line::raw(" + / -  Adjust speed"),
            Line::raw(" s      Single step"),
            Line::raw(" r      Reseed board"),
            Line::raw(" ?      Toggle this help"),
        ];

        let paragraph = Paragraph::new(help_lines).block(
            Block::default()
                .title(self.palette.title("Help"))
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::Black).fg(Color::White)),
        );
        frame.render_widget(paragraph, area);
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _)
            | (KeyCode::Char('q'), _)
            | (KeyCode::Char('Q'), _)
            | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                return Ok(true);
            }
            (KeyCode::Char(' '), _) => {
                self.paused = !self.paused;
                if self.paused {
                    self.speed_multiplier = 0.0;
                } else if self.speed_multiplier <= 0.0 {
                    self.speed_multiplier = 1.0;
                }
            }
            (KeyCode::Char('+') | KeyCode::Char('='), _) => {
                self.speed_multiplier = (self.speed_multiplier + 0.5).clamp(0.5, 8.0);
                self.paused = false;
                let tick = self.world.tick().0;
                self.push_event(
                    tick,
                    EventKind::Info,
                    format!("Speed x{:.1}", self.speed_multiplier),
                );
            }
            (KeyCode::Char('-') | KeyCode::Char('_'), _) => {
                self.speed_multiplier = (self.speed_multiplier - 0.5).max(0.0);
                if self.speed_multiplier <= 0.0 {
                    self.paused = true;
                }
                let tick = self.world.tick().0;
                let message = if self.paused {
                    "Simulation paused".to_string()
                } else {
                    format!("Speed x{:.1}", self.speed_multiplier)
                };
                self.push_event(tick, EventKind::Info, message);
            }
            (KeyCode::Char('s'), _) => {
                self.step_once();
                self.paused = true;
                self.speed_multiplier = 0.0;
                let tick = self.world.tick().0;
                self.push_event(tick, EventKind::Info, "Single-step executed");
            }
            (KeyCode::Char('r'), _) => {
                self.world.reseed();
                self.stagnation_streak = 0;
                self.was_stagnant = false;
                let tick = self.world.tick().0;
                self.push_event(tick, EventKind::Info, "Board reseeded");
            }
            (KeyCode::Char('?') | KeyCode::Char('h'), _) => {
                self.help_visible = !self.help_visible;
            }
            _ => {}
        }

        Ok(false)
    }
}
