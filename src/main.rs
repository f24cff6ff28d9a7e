mod app;
mod blit;
mod brush;
mod capture;
mod config;
mod error;
mod evolution;
mod paint;
mod params;
mod pingpong;
mod rng;
mod scheduler;
mod ui;
mod world;

use app::{Action, App};
use brush::ResetVariant;
use clap::Parser;
use rand::Rng;
use config::{AppConfig, RecordFormat};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "fluxpaint")]
#[command(about = "Seeded feedback-loop pixel art you can paint into, in the terminal")]
struct Args {
    /// Seed for the parameter vector (random when omitted)
    #[arg(short = 's', long)]
    seed: Option<u32>,

    /// Target frames per second
    #[arg(long)]
    fps: Option<f32>,

    /// Surface pixels per terminal column (rows get twice as many)
    #[arg(long)]
    density: Option<u32>,

    /// Start with autonomous motion disabled
    #[arg(long)]
    manual: bool,

    /// Force grid mode on or off instead of taking it from the seed
    #[arg(long)]
    grid: Option<bool>,

    /// Directory for screenshots and recordings
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Recording format (gif, png, mp4, webm); video falls back to gif
    #[arg(long = "record-format")]
    record_format: Option<String>,

    /// Recording duration limit in seconds
    #[arg(long = "record-secs")]
    record_secs: Option<f64>,

    /// Config file to load instead of the default location
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Write the effective config (after CLI overrides) and continue
    #[arg(long = "save-config")]
    save_config: bool,

    /// Print the parameter vector for the seed as JSON and exit
    #[arg(long = "print-params")]
    print_params: bool,

    /// Write logs to this file (RUST_LOG controls the level)
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

impl Args {
    fn apply_to(&self, mut config: AppConfig) -> AppConfig {
        if let Some(fps) = self.fps {
            config.target_fps = fps;
        }
        if let Some(density) = self.density {
            config.pixel_density = density;
        }
        if self.manual {
            config.manual_mode = true;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = Some(dir.clone());
        }
        if let Some(name) = &self.record_format {
            match RecordFormat::parse(name) {
                Some(format) => config.record_format = format,
                None => log::warn!("unknown record format '{}', keeping {}", name, config.record_format.name()),
            }
        }
        if let Some(secs) = self.record_secs {
            config.record_duration_secs = secs;
        }
        config.sanitized()
    }
}

/// Logs go to a file when one is given; a TUI owns stderr otherwise.
fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let default_level = if log_file.is_some() { "info" } else { "off" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    if let Some(path) = log_file {
        builder.target(env_logger::Target::Pipe(Box::new(File::create(path)?)));
    }
    builder.try_init()?;
    Ok(())
}

fn now_ms(clock: &Instant) -> f64 {
    clock.elapsed().as_secs_f64() * 1000.0
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let config = args.apply_to(AppConfig::resolve(args.config.as_deref())?);
    let seed = args
        .seed
        .unwrap_or_else(|| rand::thread_rng().gen_range(app::RANDOM_SEED_RANGE));

    if args.print_params {
        println!("{}", serde_json::to_string_pretty(&params::derive_parameters(seed))?);
        return Ok(());
    }

    if args.save_config {
        match args.config.clone().or_else(AppConfig::default_path) {
            Some(path) => {
                config.save_to_file(&path)?;
                log::info!("config saved to {}", path.display());
            }
            None => log::warn!("no config location available, not saving"),
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Get initial terminal size and create app
    let clock = Instant::now();
    let size = terminal.size()?;
    let frame_rect = Rect {
        x: 0,
        y: 0,
        width: size.width,
        height: size.height,
    };
    let canvas = ui::get_canvas_size(frame_rect, false);
    let mut app = App::new(config, seed, canvas, now_ms(&clock));
    if let Some(grid) = args.grid {
        app.set_grid_mode(grid);
    }

    // Run the app
    let res = run_app(&mut terminal, &mut app, &clock);

    if app.is_recording() {
        app.stop_recording();
    }

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("terminal error: {}", err);
        eprintln!("Error: {:?}", err);
    }
    if let Some(status) = app.status.take() {
        println!("{}", status);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    clock: &Instant,
) -> io::Result<()> {
    loop {
        app.frame(now_ms(clock));
        terminal.draw(|frame| ui::render(frame, app))?;

        // Sleep in the event poll until the next frame is due
        let wait = app.scheduler.until_next(now_ms(clock));
        if event::poll(Duration::from_secs_f64(wait / 1000.0))? {
            let size = terminal.size()?;
            let area = Rect {
                x: 0,
                y: 0,
                width: size.width,
                height: size.height,
            };
            match event::read()? {
                Event::Key(key) => {
                    // Only process Press events
                    if key.kind == KeyEventKind::Press {
                        handle_key(app, key, area, now_ms(clock));
                    }
                }
                Event::Mouse(mouse) => handle_mouse(app, mouse, area),
                Event::Resize(width, height) => {
                    let area = Rect {
                        x: 0,
                        y: 0,
                        width,
                        height,
                    };
                    app.resize(ui::get_canvas_size(area, app.fullscreen_mode), now_ms(clock));
                }
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent, area: Rect, now: f64) {
    // Handle Ctrl+C
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // === Handle menu keys first (if menu is open) ===
    if app.menu.is_some() {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => app.menu_nav_up(),
            KeyCode::Down | KeyCode::Char('j') => app.menu_nav_down(),
            KeyCode::Enter => app.confirm_menu(now),
            KeyCode::Esc | KeyCode::Char('m') | KeyCode::Char('M') => app.close_menu(),
            _ => {}
        }
        return;
    }

    // === Help overlay swallows everything but scroll and close ===
    if app.show_help {
        match key.code {
            KeyCode::Char('j') | KeyCode::Char('J') | KeyCode::Down => {
                app.scroll_help_down(ui::HELP_CONTENT_LINES)
            }
            KeyCode::Char('k') | KeyCode::Char('K') | KeyCode::Up => app.scroll_help_up(),
            KeyCode::Char('q') | KeyCode::Char('Q') => app.should_quit = true,
            _ => app.toggle_help(),
        }
        return;
    }

    let action = match key.code {
        KeyCode::Up => Action::WaterfallUp,
        KeyCode::Down => Action::WaterfallDown,
        KeyCode::Left => Action::MoveLeft,
        KeyCode::Right => Action::MoveRight,
        KeyCode::Char('e') | KeyCode::Char('E') => Action::Erase,
        KeyCode::Char('f') | KeyCode::Char('F') => Action::Freeze,
        KeyCode::Char('s') | KeyCode::Char('S') => Action::Shuffle,
        KeyCode::Char('t') | KeyCode::Char('T') => Action::Trickle,
        KeyCode::Char('d') | KeyCode::Char('D') => Action::CyclePaintVariant,
        KeyCode::Char('1') => Action::Paint(ResetVariant::Reset),
        KeyCode::Char('2') => Action::Paint(ResetVariant::Empty),
        KeyCode::Char('3') => Action::Paint(ResetVariant::Static),
        KeyCode::Char('4') => Action::Paint(ResetVariant::Gem),
        KeyCode::Char(' ') => Action::TogglePause,
        KeyCode::Char('n') | KeyCode::Char('N') => Action::NewSeed,
        KeyCode::Char('p') | KeyCode::Char('P') => Action::Screenshot,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::ToggleRecording,
        KeyCode::Char(']') => Action::BrushBigger,
        KeyCode::Char('[') => Action::BrushSmaller,
        KeyCode::Char('x') | KeyCode::Char('X') => Action::ToggleManual,
        KeyCode::Char('c') | KeyCode::Char('C') => Action::ClearPaint,
        KeyCode::Char('z') | KeyCode::Char('Z') => Action::GlobalReset,
        KeyCode::Char('b') | KeyCode::Char('B') => Action::ToggleGrid,
        KeyCode::Char('w') | KeyCode::Char('W') => Action::ToggleWaterfall,
        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => Action::ToggleHelp,

        // System controls
        KeyCode::Char('q') | KeyCode::Char('Q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('m') | KeyCode::Char('M') => {
            app.toggle_menu();
            return;
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            app.adjust_target_fps(true);
            return;
        }
        KeyCode::Char('-') | KeyCode::Char('_') => {
            app.adjust_target_fps(false);
            return;
        }
        KeyCode::Char('v') | KeyCode::Char('V') => {
            app.toggle_fullscreen();
            app.resize(ui::get_canvas_size(area, app.fullscreen_mode), now);
            return;
        }
        KeyCode::Char('j') | KeyCode::Char('J') => {
            let visible = ui::get_controls_visible_lines(area.height);
            app.scroll_controls_down(ui::CONTROLS_CONTENT_LINES.saturating_sub(visible));
            return;
        }
        KeyCode::Char('k') | KeyCode::Char('K') => {
            app.scroll_controls_up();
            return;
        }
        _ => return,
    };
    app.perform(action, now);
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, area: Rect) {
    let cell = ui::screen_to_canvas(area, app.fullscreen_mode, mouse.column, mouse.row);
    match (mouse.kind, cell) {
        (MouseEventKind::Down(MouseButton::Left), Some(cell)) => app.pointer_down(cell),
        (MouseEventKind::Drag(MouseButton::Left), Some(cell)) => app.pointer_drag(cell),
        // leaving the canvas ends the stroke
        (MouseEventKind::Drag(MouseButton::Left), None) | (MouseEventKind::Up(MouseButton::Left), _) => {
            app.pointer_up()
        }
        _ => {}
    }
}
