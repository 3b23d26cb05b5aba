mod ids;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use gears_core::{Color, GearSystem, OutputKind, SpinDirection};
use gears_store::{ProjectStore, default_base_dir, list_projects};

use crate::ids::{resolve_gear, resolve_output};

#[derive(Parser)]
#[command(name = "gears", about = "Planar gear-train kinematics engine")]
struct Cli {
    /// Project name (defaults to the current directory name)
    #[arg(long, global = true)]
    project: Option<String>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Place a gear; prints its id
    AddGear {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        /// Tooth count, clamped to 8..=48
        #[arg(long, default_value_t = 12)]
        teeth: u32,
        /// Hex color such as #3498db (random palette color if omitted)
        #[arg(long)]
        color: Option<String>,
    },

    /// Place an output (fan, clock, platform); attaches to the nearest gear
    AddOutput {
        kind: String,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },

    /// Move a gear
    Move {
        id: String,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },

    /// Change a gear's tooth count
    Teeth { id: String, count: u32 },

    /// Change a gear's color
    Color { id: String, color: String },

    /// Delete a gear (attached outputs are detached)
    Delete { id: String },

    /// Delete an output
    DeleteOutput { id: String },

    /// Show, set or clear the driver gear
    Driver {
        id: Option<String>,
        #[arg(long, conflicts_with = "id")]
        clear: bool,
    },

    /// Set the spin speed multiplier (0.1 to 5)
    Speed { value: f64 },

    /// Set the spin direction (cw, ccw); toggles when omitted
    Direction { value: Option<String> },

    /// Show or change grid, tooth geometry and background settings
    Settings {
        /// Snap placements to the grid (true/false)
        #[arg(long)]
        grid_snap: Option<bool>,
        /// Grid spacing; non-positive values are ignored
        #[arg(long, allow_negative_numbers = true)]
        grid_size: Option<f64>,
        /// Tooth thickness, clamped to 0.3..=0.7
        #[arg(long)]
        tooth_thickness: Option<f64>,
        /// Tooth depth, clamped to 4..=14
        #[arg(long)]
        tooth_depth: Option<f64>,
        /// Background hex color such as #1a1a2e
        #[arg(long)]
        background: Option<String>,
    },

    /// Run the simulation offline for a fixed duration
    Simulate {
        #[arg(long, default_value_t = 1.0)]
        seconds: f64,
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=240))]
        fps: u32,
    },

    /// Run the simulation in real time until ctrl-c (or --seconds)
    Play {
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=240))]
        fps: u32,
        #[arg(long)]
        seconds: Option<f64>,
    },

    /// Turn the driver by hand (radians); refused while locked
    Spin {
        #[arg(allow_negative_numbers = true)]
        radians: f64,
    },

    /// List gears and outputs
    Show,

    /// Show project statistics
    Stats,

    /// Report what lies under a point
    Hit {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },

    /// Reset every rotation to zero
    Reset,

    /// Remove every gear and output
    Clear,

    /// Export the project to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import a project from a JSON file, replacing the current one
    Import {
        /// Input file path
        path: PathBuf,
    },

    /// List projects in the data directory
    Projects,
}

fn data_dir() -> Option<PathBuf> {
    std::env::var("GEARS_DATA_DIR").ok().map(PathBuf::from)
}

fn open_store(cli: &Cli) -> Result<ProjectStore> {
    let base_dir = data_dir();
    ProjectStore::open(cli.project.as_deref(), base_dir.as_deref())
        .context("failed to open project store")
}

fn load(store: &ProjectStore) -> Result<GearSystem> {
    store.load_system().context("failed to load project")
}

fn save(store: &ProjectStore, system: &mut GearSystem) -> Result<()> {
    store
        .save_system(system)
        .context("failed to save project")?;
    tracing::info!(project = store.name(), gears = system.gears().len(), "saved");
    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Play { fps, seconds } => cmd_play(&cli, *fps, *seconds).await,
        Commands::Projects => cmd_projects(),
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Import { path } => cmd_import(&cli, path),
        Commands::Show => cmd_show(&cli),
        Commands::Stats => cmd_stats(&cli),
        Commands::Hit { x, y } => cmd_hit(&cli, *x, *y),
        _ => cmd_edit(&cli),
    }
}

/// Load, apply one editing command, report lock transitions, save.
fn cmd_edit(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let mut system = load(&store)?;
    let was_locked = system.is_locked();

    apply(&mut system, &cli.command)?;

    match (was_locked, system.is_locked()) {
        (false, true) => {
            let ids: Vec<String> = system
                .status()
                .locked_gear_ids
                .iter()
                .map(|id| id.to_string())
                .collect();
            tracing::info!(gears = %ids.join(","), "gear train locked");
            println!("warning: gear train is locked ({})", ids.join(", "));
        }
        (true, false) => tracing::info!("gear train unlocked"),
        _ => {}
    }

    if system.has_unsaved_changes() {
        save(&store, &mut system)?;
    }
    Ok(())
}

fn apply(system: &mut GearSystem, command: &Commands) -> Result<()> {
    match command {
        Commands::AddGear { x, y, teeth, color } => {
            let color = match color {
                Some(c) => Some(Color::parse(c).with_context(|| format!("invalid color '{c}'"))?),
                None => None,
            };
            let mut rng = SmallRng::from_os_rng();
            let id = system.create_gear(*x, *y, *teeth, color, &mut rng);
            let gear = system.gear(&id).context("gear vanished after creation")?;
            tracing::debug!(%id, meshes = gear.meshing_with.len(), "gear created");
            println!("{id}");
        }
        Commands::AddOutput { kind, x, y } => {
            let Some(kind) = OutputKind::from_str_opt(kind) else {
                bail!("unknown output type '{kind}' (expected fan, clock or platform)");
            };
            let id = system.create_output(kind, *x, *y);
            match system.output(&id).and_then(|o| o.attached_to_gear.as_ref()) {
                Some(gear) => println!("{id} attached to {gear}"),
                None => println!("{id} (not attached)"),
            }
        }
        Commands::Move { id, x, y } => {
            let id = resolve_gear(system, id)?;
            system.move_gear(&id, *x, *y);
        }
        Commands::Teeth { id, count } => {
            let id = resolve_gear(system, id)?;
            system.update_gear_teeth(&id, *count);
            if let Some(g) = system.gear(&id)
                && g.teeth_count() != *count
            {
                tracing::warn!(requested = count, actual = g.teeth_count(), "tooth count clamped");
            }
        }
        Commands::Color { id, color } => {
            let id = resolve_gear(system, id)?;
            let color = Color::parse(color).with_context(|| format!("invalid color '{color}'"))?;
            system.update_gear_color(&id, color);
        }
        Commands::Delete { id } => {
            let id = resolve_gear(system, id)?;
            system.delete_gear(&id);
            println!("deleted {id}");
        }
        Commands::DeleteOutput { id } => {
            let id = resolve_output(system, id)?;
            system.delete_output(&id);
            println!("deleted {id}");
        }
        Commands::Driver { id, clear } => {
            if *clear {
                system.clear_driver();
                println!("driver cleared");
            } else if let Some(id) = id {
                let id = resolve_gear(system, id)?;
                system.set_driver_gear(&id);
                println!("driver: {id}");
            } else {
                match system.driver_id() {
                    Some(id) => println!("driver: {id}"),
                    None => println!("driver: none"),
                }
            }
        }
        Commands::Speed { value } => {
            if !(value.is_finite() && *value > 0.0) {
                bail!("speed must be a positive number");
            }
            system.set_spin_speed(*value);
            println!("speed: {:.2}x", system.settings().spin_speed);
        }
        Commands::Direction { value } => {
            let dir = match value.as_deref() {
                None => system.toggle_direction(),
                Some(v) => {
                    let dir = parse_direction(v)?;
                    system.set_spin_direction(dir);
                    dir
                }
            };
            println!("direction: {}", direction_label(dir));
        }
        Commands::Settings {
            grid_snap,
            grid_size,
            tooth_thickness,
            tooth_depth,
            background,
        } => {
            if grid_snap.is_some() || grid_size.is_some() {
                let current = system.settings();
                let snap = grid_snap.unwrap_or(current.grid_snap);
                let size = grid_size.unwrap_or(current.grid_size);
                system.set_grid(snap, size);
            }
            if tooth_thickness.is_some() || tooth_depth.is_some() {
                let current = system.settings();
                let thickness = tooth_thickness.unwrap_or(current.tooth_thickness);
                let depth = tooth_depth.unwrap_or(current.tooth_depth);
                system.set_tooth_geometry(thickness, depth);
            }
            if let Some(bg) = background {
                let color = Color::parse(bg).with_context(|| format!("invalid color '{bg}'"))?;
                system.set_background_color(color);
            }
            print_settings(system);
        }
        Commands::Simulate { seconds, fps } => {
            if !(seconds.is_finite() && *seconds >= 0.0) {
                bail!("seconds must be a non-negative number");
            }
            let frames = (seconds * f64::from(*fps)).round() as u64;
            let dt = 1.0 / f64::from(*fps);
            system.play();
            for _ in 0..frames {
                system.tick(dt);
            }
            system.stop();
            // Rotations are part of the saved project
            if frames > 0 {
                system.mark_dirty();
            }
            println!("simulated {frames} frames");
            print_status(system);
        }
        Commands::Spin { radians } => {
            if !system.spin_driver(*radians) {
                bail!("cannot spin: no driver set or gear train is locked");
            }
            print_status(system);
        }
        Commands::Reset => {
            system.reset_rotations();
            println!("rotations reset");
        }
        Commands::Clear => {
            system.clear_all();
            println!("cleared");
        }
        Commands::Play { .. }
        | Commands::Projects
        | Commands::Export { .. }
        | Commands::Import { .. }
        | Commands::Show
        | Commands::Stats
        | Commands::Hit { .. } => bail!("not an editing command"),
    }
    Ok(())
}

fn parse_direction(value: &str) -> Result<SpinDirection> {
    match value.to_ascii_lowercase().as_str() {
        "cw" | "clockwise" => Ok(SpinDirection::Clockwise),
        "ccw" | "counter-clockwise" | "counterclockwise" => Ok(SpinDirection::CounterClockwise),
        other => bail!("unknown direction '{other}' (expected cw or ccw)"),
    }
}

fn direction_label(dir: SpinDirection) -> &'static str {
    match dir {
        SpinDirection::Clockwise => "clockwise",
        SpinDirection::CounterClockwise => "counter-clockwise",
    }
}

fn print_settings(system: &GearSystem) {
    let s = system.settings();
    let snap = if s.grid_snap { "snap" } else { "free" };
    println!("grid:       {snap} {:.1}", s.grid_size);
    println!("teeth:      thickness {:.2} depth {:.1}", s.tooth_thickness, s.tooth_depth);
    println!("background: {}", s.background_color);
}

fn print_status(system: &GearSystem) {
    let status = system.status();
    println!(
        "locked: {}, load: {:.1}%",
        if status.locked { "yes" } else { "no" },
        status.load_percentage
    );
}

async fn cmd_play(cli: &Cli, fps: u32, seconds: Option<f64>) -> Result<()> {
    let store = open_store(cli)?;
    let mut system = load(&store)?;
    if system.gears().is_empty() {
        bail!("project has no gears");
    }

    let dt = 1.0 / f64::from(fps);
    let deadline = seconds
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| tokio::time::Instant::now() + Duration::from_secs_f64(s));
    let mut interval = tokio::time::interval(Duration::from_secs_f64(dt));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    system.play();
    tracing::info!(fps, driver = ?system.driver_id().map(|id| id.to_string()), "playing");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut frames: u64 = 0;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
            _ = interval.tick() => {
                if let Some(load) = system.tick(dt) {
                    tracing::debug!(frame = frames, load = load.percentage, "tick");
                }
                frames += 1;
                if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
                    break;
                }
            }
        }
    }
    system.stop();

    if frames > 0 {
        save(&store, &mut system)?;
    }
    println!("played {frames} frames");
    print_status(&system);
    Ok(())
}

fn cmd_show(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let system = load(&store)?;
    let lock = system.lock();

    if system.gears().is_empty() {
        println!("(no gears)");
    }
    for g in system.gears() {
        let mut tags = Vec::new();
        if system.driver_id() == Some(&g.id) {
            tags.push("driver");
        }
        if lock.contains(&g.id) {
            tags.push("locked");
        }
        println!(
            "{}  ({:.1}, {:.1})  teeth={} r={:.1}  rpm={:.2}  rot={:.3}  {}  {}",
            g.id,
            g.position.x,
            g.position.y,
            g.teeth_count(),
            g.radius(),
            g.rpm(),
            g.rotation,
            g.color,
            tags.join(" "),
        );
        if !g.meshing_with.is_empty() {
            let meshes: Vec<&str> = g.meshing_with.iter().map(|id| id.as_str()).collect();
            println!("    meshes: {}", meshes.join(", "));
        }
    }
    for o in system.outputs() {
        let attached = o
            .attached_to_gear
            .as_ref()
            .map_or_else(|| "(not attached)".to_string(), |id| format!("-> {id}"));
        println!(
            "{}  {}  ({:.1}, {:.1})  rot={:.3}  {}",
            o.id, o.kind, o.position.x, o.position.y, o.rotation, attached
        );
    }
    Ok(())
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let system = load(&store)?;
    let status = system.status();
    let settings = system.settings();

    println!("project:    {}", store.name());
    println!("gears:      {}", system.gears().len());
    println!("outputs:    {}", system.outputs().len());
    println!("meshes:     {}", system.graph().edge_count());
    println!(
        "driver:     {}",
        system
            .driver_id()
            .map_or_else(|| "none".to_string(), |id| id.to_string())
    );
    println!(
        "spin:       {:.2}x {}",
        settings.spin_speed,
        direction_label(settings.spin_direction)
    );
    println!("locked:     {}", if status.locked { "yes" } else { "no" });
    println!("load:       {:.1}%", status.load_percentage);
    Ok(())
}

fn cmd_hit(cli: &Cli, x: f64, y: f64) -> Result<()> {
    let store = open_store(cli)?;
    let system = load(&store)?;
    // Outputs draw above gears
    if let Some(id) = system.hit_test_output(x, y) {
        println!("output {id}");
    } else if let Some(id) = system.hit_test_gear(x, y) {
        println!("gear {id}");
    } else {
        println!("nothing at ({x}, {y})");
    }
    Ok(())
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let store = open_store(cli)?;
    store
        .export_json_file(path)
        .context("failed to export JSON")?;

    println!("exported to {}", path.display());
    Ok(())
}

fn cmd_import(cli: &Cli, path: &Path) -> Result<()> {
    let store = open_store(cli)?;
    let system = store
        .import_json_file(path)
        .context("failed to import JSON")?;

    println!(
        "imported from {}. gears={}, outputs={}, driver={}",
        path.display(),
        system.gears().len(),
        system.outputs().len(),
        system
            .driver_id()
            .map_or_else(|| "none".to_string(), |id| id.to_string())
    );
    if system.is_locked() {
        println!("warning: gear train is locked");
    }
    Ok(())
}

fn cmd_projects() -> Result<()> {
    let base = data_dir().unwrap_or_else(default_base_dir);
    let names = list_projects(&base).context("failed to list projects")?;
    if names.is_empty() {
        println!("(no projects)");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}
