use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tracing::{info, warn, Level};

use statwatch::app::{self, App, View};
use statwatch::dashboard::DEFAULT_PUMP_LIMIT;
use statwatch::events;
use statwatch::source::{ReplayTransport, StreamTransport, Transport};
use statwatch::ui::{self, Screen};
use statwatch::{Dashboard, DashboardConfig, DynamicWatcherEntry, WatcherEntry};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "statwatch")]
#[command(about = "Live CPU, memory and socket graphs for supervised processes")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Connect to the stats backend (host:port)
    #[arg(short, long, conflicts_with = "replay")]
    connect: Option<String>,

    /// Replay a recorded session file instead of connecting
    #[arg(short, long)]
    replay: Option<PathBuf>,

    /// Graph a watcher as one aggregate: name=stats_endpoint (repeatable)
    #[arg(short, long = "watcher", value_name = "NAME=STATS_ENDPOINT")]
    watchers: Vec<WatcherEntry>,

    /// Graph each PID or FD of a watcher: name=stats_endpoint,data_endpoint (repeatable)
    #[arg(short, long = "dynamic", value_name = "NAME=STATS,DATA")]
    dynamic: Vec<DynamicWatcherEntry>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Replay headless, export readouts to this JSON file and exit
    #[arg(short, long, requires = "replay")]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args)?;

    let config = load_config(&args)?;
    let dashboard = Dashboard::new(&config);
    info!(
        graphs = dashboard.registry().len(),
        dynamic = config.dynamic_watchers.len(),
        "Dashboard ready"
    );

    if let Some(ref replay) = args.replay {
        if let Some(ref export_path) = args.export {
            return export_replay(dashboard, replay, export_path);
        }
        return run_tui(Box::new(ReplayTransport::new(replay)), dashboard);
    }

    if let Some(ref addr) = config.connect {
        return run_with_tcp(addr, dashboard);
    }

    bail!("Nothing to watch: pass --connect <host:port> or --replay <file>, or set `connect` in the config")
}

/// Install the tracing subscriber.
///
/// The terminal belongs to the TUI, so logs go to `--log-file` or nowhere.
fn setup_logging(args: &Args) -> Result<()> {
    let Some(ref path) = args.log_file else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_max_level(Level::from(args.log_level))
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
        .init();

    info!("Logging initialized with level: {:?}", args.log_level);
    Ok(())
}

/// Load configuration and merge command line watchers into it.
fn load_config(args: &Args) -> Result<DashboardConfig> {
    let mut config = DashboardConfig::load(args.config.as_deref())?;

    for watcher in &args.watchers {
        if !config.stats_endpoints.contains(&watcher.stats_endpoint) {
            config.stats_endpoints.push(watcher.stats_endpoint.clone());
        }
    }
    for dynamic in &args.dynamic {
        if !config.stats_endpoints.contains(&dynamic.stats_endpoint) {
            config.stats_endpoints.push(dynamic.stats_endpoint.clone());
        }
        if !config.endpoints.contains(&dynamic.data_endpoint) {
            config.endpoints.push(dynamic.data_endpoint.clone());
        }
    }
    config.watchers.extend(args.watchers.iter().cloned());
    config.dynamic_watchers.extend(args.dynamic.iter().cloned());

    if args.connect.is_some() {
        config.connect = args.connect.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Run with a TCP stream transport
fn run_with_tcp(addr: &str, dashboard: Dashboard) -> Result<()> {
    // The runtime hosts the reader and writer tasks while the TUI runs
    let rt = tokio::runtime::Runtime::new()?;

    println!("Connecting to {}...", addr);
    let transport = rt
        .block_on(StreamTransport::connect(addr))
        .with_context(|| format!("Failed to connect to {}", addr))?;

    run_tui(Box::new(transport), dashboard)
}

/// Run the TUI with the given transport
fn run_tui(transport: Box<dyn Transport>, dashboard: Dashboard) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    let mut app = App::new(transport, dashboard);
    app.pump();

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Minimum terminal size for usable display
const MIN_WIDTH: u16 = 60;
const MIN_HEIGHT: u16 = 12;

/// Keeps "Updated Xs ago" current when no data arrives
const IDLE_REDRAW: Duration = Duration::from_secs(1);

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let mut redraw = true;
    let mut last_draw = Instant::now();

    while app.running {
        let dirty = app.screen.take_dirty();
        if redraw || dirty || last_draw.elapsed() >= IDLE_REDRAW {
            draw(terminal, app)?;
            redraw = false;
            last_draw = Instant::now();
        }

        // Poll for events with a short timeout
        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            handle_event(app, event);
            redraw = true;
        }

        app.pump();
    }

    Ok(())
}

fn draw(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &App) -> Result<()> {
    terminal.draw(|frame| {
        let area = frame.area();

        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            let msg = format!(
                "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                area.width, area.height, MIN_WIDTH, MIN_HEIGHT
            );
            let paragraph = ratatui::widgets::Paragraph::new(msg)
                .alignment(ratatui::layout::Alignment::Center)
                .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
            let centered =
                ratatui::layout::Rect::new(0, (area.height / 2).saturating_sub(2), area.width, 5);
            frame.render_widget(paragraph, centered);
            return;
        }

        let chunks = Layout::vertical([
            Constraint::Length(1), // Header bar
            Constraint::Length(1), // Tabs
            Constraint::Min(8),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

        ui::common::render_header(frame, app, chunks[0]);
        ui::common::render_tabs(frame, app, chunks[1]);

        match app.current_view {
            View::Graphs => ui::graphs::render(frame, app, chunks[2]),
            View::Readouts => ui::readouts::render(frame, app, chunks[2]),
        }

        ui::common::render_status_bar(frame, app, chunks[3]);

        if app.show_help {
            ui::common::render_help(frame, app, area);
        }
    })?;
    Ok(())
}

fn handle_event(app: &mut App, event: Event) {
    match event {
        Event::Key(key) => events::handle_key_event(app, key),
        Event::Mouse(mouse) => events::handle_mouse_event(app, mouse),
        // Redrawn on the next iteration
        Event::Resize(_, _) => {}
        _ => {}
    }
}

/// Replay a recording without a terminal and write the final readouts.
fn export_replay(mut dashboard: Dashboard, replay: &Path, export_path: &Path) -> Result<()> {
    std::fs::metadata(replay)
        .with_context(|| format!("Cannot read replay {}", replay.display()))?;

    let mut transport = ReplayTransport::new(replay);
    let mut screen = Screen::new();
    while dashboard.pump(&mut transport, &mut screen, DEFAULT_PUMP_LIMIT) > 0 {}

    if let Some(err) = transport.error() {
        warn!("Replay finished with errors: {}", err);
    }

    app::write_export(export_path, &app::export_json(&dashboard, &screen))?;
    println!("Exported readouts to: {}", export_path.display());
    Ok(())
}
