// files tldr:
// - vec2.rs      : 2d vector math
// - types.rs     : syntax tree, runtime values, draw commands
// - error.rs     : diagnostics and error enums
// - lexer.rs     : converts text to tokens
// - parser.rs    : converts tokens to syntax tree
// - eval.rs      : runs the syntax tree against a world
// - registry.rs  : native operations scripts can call
// - object.rs    : object classes, slots and instances
// - forces.rs    : force components
// - movement.rs  : movement controllers
// - renderers.rs : drawing components
// - special.rs   : springs
// - tracker.rs   : samples quantities for plotting
// - clock.rs     : tick clock and fps counter
// - world.rs     : simulation space and stepper
// - gui.rs       : visual display

mod vec2;
mod types;
mod error;
mod lexer;
mod parser;
mod eval;
mod registry;
mod object;
mod forces;
mod movement;
mod renderers;
mod special;
mod tracker;
mod clock;
mod world;
mod gui;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use clock::FixedClock;
use error::ConfigError;
use eval::create_world;
use movement::DEFAULT_MAX_VELOCITY;
use types::Frame;
use world::{SimConfig, World};

#[derive(Parser, Debug)]
#[command(name = "phyconf", about = "N-body physics sandbox driven by a config script")]
struct Args {
    /// Path to the configuration script
    config: PathBuf,

    /// Simulation cycles per rendered frame (1..=200000)
    #[arg(long, default_value_t = 1)]
    cycles: usize,

    /// Multiplier applied to every tick's delta time
    #[arg(long, default_value_t = 1.0)]
    tick_mult: f64,

    /// Velocity ceiling of the default movement controller
    #[arg(long, default_value_t = DEFAULT_MAX_VELOCITY)]
    max_velocity: f64,

    /// Reject `force drag(...)` declarations
    #[arg(long)]
    no_drag: bool,

    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Frames to run in headless mode
    #[arg(long, default_value_t = 600)]
    frames: usize,

    /// Use a fixed delta time (seconds) instead of the wall clock
    #[arg(long)]
    fixed_dt: Option<f64>,

    /// Print the parsed syntax tree before running
    #[arg(long)]
    dump_ast: bool,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: "phyconf", "{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), ConfigError> {
    let filename = args.config.display().to_string();
    let source = std::fs::read_to_string(&args.config)
        .map_err(|source| ConfigError::Io { path: filename.clone(), source })?;

    if args.dump_ast {
        let (program, _) = parser::parse_program(&source);
        println!("{:#?}", program);
    }

    let config = SimConfig {
        cycles: args.cycles,
        tick_mult: args.tick_mult,
        max_velocity: args.max_velocity,
        drag_enabled: !args.no_drag,
    };
    let world = match args.fixed_dt {
        Some(dt) => World::with_clock(config, Box::new(FixedClock(dt))),
        None => World::new(config),
    };
    let mut world = create_world(&source, &filename, world)?;
    world.reset_clock();

    if args.headless {
        run_headless(&mut world, args.frames);
        return Ok(());
    }
    gui::run_with_gui(world)
}

//step without a window, then report where everything ended up
fn run_headless(world: &mut World, frames: usize) {
    info!(
        target: "phyconf",
        "running {} frame(s) headless, {} cycle(s) each, tick multiplier {}",
        frames,
        world.cycles(),
        world.tick_mult()
    );
    let mut frame = Frame::default();
    for _ in 0..frames {
        frame.clear();
        world.render("headless", &mut frame);
    }

    for obj in world.objects() {
        let body = obj.body();
        info!(
            target: "phyconf",
            "#{} {}: pos={} vel={} acc={}",
            obj.id(),
            obj.class().name(),
            body.pos(),
            body.vel(),
            body.acc()
        );
    }
    info!(target: "phyconf", "total momentum {}", world.total_momentum());
}
