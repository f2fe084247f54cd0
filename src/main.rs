// Desktop demo for the scratch-off widget.
// What you SEE:
// • A country shape covered in the scratch color.
// • Hold Left Mouse: scratch the cover off to reveal the flag underneath.
// • Past the completion threshold the rest of the cover disappears by itself.
// • S toggles scratchable (full reconfiguration), C cycles the scratch color. ESC quits.

mod draw;

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use draw::{Drawer, draw_crosshair, draw_text_5x7, flatten_onto};
use scratch_reveal::config::{self, DemoFile};
use scratch_reveal::{
    Callbacks, Color, Config, FileFetcher, FrameBuffer, LoadError, Tuning, Widget, WidgetState,
};
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const BACKDROP: u32 = 0x00_20_24_2C; // window background behind transparent pixels
const SCRATCH_PALETTE: [Color; 4] = [
    Color::rgb(0xC0, 0xC0, 0xC0),
    Color::rgb(0xD4, 0xAF, 0x37),
    Color::rgb(0x8E, 0xC5, 0xFC),
    Color::rgb(0xF4, 0xA2, 0x61),
];

#[derive(Debug, Parser)]
#[command(name = "scratch-reveal", about = "Scratch a country shape to reveal its flag")]
struct Cli {
    /// YAML file with `widget` and optional `tuning` sections
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Shape image (path or file:// URL)
    #[arg(long, required_unless_present = "config")]
    map: Option<String>,

    /// Overlay image (path or file:// URL)
    #[arg(long, required_unless_present = "config")]
    flag: Option<String>,

    /// Start fully revealed, ignoring input
    #[arg(long = "static")]
    static_map: bool,

    #[arg(long, default_value = "#202020")]
    outline: Color,

    #[arg(long, default_value = "#c0c0c0")]
    scratch: Color,

    /// Override the brush radius (pixels)
    #[arg(long)]
    brush_radius: Option<f32>,

    /// Override the completion threshold (0..=1)
    #[arg(long)]
    threshold: Option<f64>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("scratch_reveal={level}").parse()?)
        .add_directive("minifb=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

/// Merge the optional YAML file with command-line overrides.
fn resolve(cli: &Cli) -> Result<(Config, Tuning)> {
    let (mut widget, mut tuning) = match &cli.config {
        Some(path) => {
            let DemoFile { widget, tuning } = config::from_yaml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            (widget, tuning)
        }
        None => (
            Config {
                scratchable: true,
                url_map: String::new(),
                url_flag: String::new(),
                color_outline: cli.outline,
                color_scratch: cli.scratch,
            },
            Tuning::default(),
        ),
    };
    if let Some(map) = &cli.map {
        widget.url_map = map.clone();
    }
    if let Some(flag) = &cli.flag {
        widget.url_flag = flag.clone();
    }
    if cli.static_map {
        widget.scratchable = false;
    }
    if let Some(r) = cli.brush_radius {
        tuning.brush_radius = r;
    }
    if let Some(t) = cli.threshold {
        tuning.completion_threshold = t;
    }
    tuning.validate().context("validating tuning")?;
    Ok((widget, tuning))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    let (mut config, tuning) = resolve(&cli)?;

    /* --- Runtime + widget ---
       Loads run on tokio; everything else stays on this (UI) thread. */
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;

    let completions = Rc::new(Cell::new(0u32));
    let last_error: Rc<RefCell<Option<LoadError>>> = Rc::new(RefCell::new(None));
    let callbacks = {
        let (done, failed) = (completions.clone(), last_error.clone());
        Callbacks::new(
            move || {
                done.set(done.get() + 1);
                info!("fully scratched");
            },
            move |err| {
                warn!(error = %err, "could not load images");
                *failed.borrow_mut() = Some(err.clone());
            },
        )
    };
    let mut widget = Widget::new(FileFetcher::new(), tuning, runtime.handle().clone(), callbacks)?;

    /* --- First configuration ---
       We wait for it so the window can be sized to the shape. */
    widget.configure(config.clone());
    runtime.block_on(widget.settle());
    if let Some(err) = last_error.borrow_mut().take() {
        return Err(scratch_reveal::Error::from(err)).context("initial configuration failed");
    }
    let (w, h) = widget.dimensions().context("widget has no surface after loading")?;
    info!(width = w, height = h, "surface ready");

    let mut drawer = Drawer::new("Scratch Reveal", w, h)?;
    let mut screen = FrameBuffer::new(w, h);
    let mut palette_idx = 0usize;

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        /* 1) Inputs: configuration changes */
        if drawer.s_pressed_once() {
            config.scratchable = !config.scratchable; // rebuilds: fresh cover or full reveal
            widget.configure(config.clone());
        }
        if drawer.c_pressed_once() {
            palette_idx = (palette_idx + 1) % SCRATCH_PALETTE.len();
            config.color_scratch = SCRATCH_PALETTE[palette_idx]; // redraw only
            widget.configure(config.clone());
        }

        /* 2) Pointer: scratch while the left button is held */
        let mouse = drawer.mouse_pos();
        match mouse {
            Some((mx, my)) if drawer.left_mouse_down() => widget.pointer_move(mx, my),
            _ => widget.end_stroke(),
        }

        /* 3) Frame tick: composites only if something asked for a redraw */
        widget.frame_tick();

        /* 4) Build what we show: surface over backdrop, crosshair, HUD */
        match widget.surface() {
            Some(surface) => flatten_onto(&mut screen, surface, BACKDROP),
            None => screen.pixels.iter_mut().for_each(|p| *p = BACKDROP),
        }
        if let Some((mx, my)) = mouse {
            draw_crosshair(&mut screen, mx as i32, my as i32, 8, 0x00_FF_CC_33);
        }
        let pct = widget.progress().unwrap_or(0.0) * 100.0;
        let status = match widget.state() {
            WidgetState::Uninitialized | WidgetState::Configuring => "LOADING".to_string(),
            WidgetState::Ready => format!("READY {pct:.0}%"),
            WidgetState::Scratching => format!("SCRATCHING {pct:.0}%"),
            WidgetState::Completed => format!("DONE {}", completions.get()),
            WidgetState::Errored => "ERROR".to_string(),
        };
        draw_text_5x7(&mut screen, 4, 4, &status, 0x00_FF_FF_FF);

        /* 5) Present */
        drawer.present(&screen)?;
    }

    Ok(())
}
