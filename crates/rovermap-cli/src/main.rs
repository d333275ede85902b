//! rovermap CLI: run perception cycles on camera frames from disk.

use clap::{Args, Parser, Subcommand};
use rovermap::{
    ClassCounts, CycleInput, EvidenceChannel, MapUpdateStats, NavigationSummary, Perception,
    PerceptionConfig, RoverPose, WorldMap,
};
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "rovermap")]
#[command(about = "Turn rover camera frames into a top-down world map and heading candidates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one frame at a given pose and update the world map.
    Process(CliProcessArgs),

    /// Print the built-in configuration as JSON.
    DefaultConfig,

    /// Print the calibration quads and the derived homography.
    CalibrationInfo {
        /// Configuration file (JSON). Built-in defaults when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Where to write the visibility mask (PNG, white = trusted).
        #[arg(long)]
        mask_out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
struct CliProcessArgs {
    /// Path to the camera frame.
    #[arg(long)]
    image: PathBuf,

    /// Rover world x position.
    #[arg(long)]
    x: f64,

    /// Rover world y position.
    #[arg(long)]
    y: f64,

    /// Rover yaw in degrees, [0, 360].
    #[arg(long)]
    yaw: f64,

    /// Configuration file (JSON). Built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Existing map snapshot (PNG) to continue from.
    #[arg(long)]
    map_in: Option<PathBuf>,

    /// Where to write the updated map snapshot (PNG).
    #[arg(long)]
    map_out: Option<PathBuf>,

    /// Where to write the cycle summary (JSON).
    #[arg(long)]
    summary_out: Option<PathBuf>,

    /// Where to write the warped-space classification image (PNG).
    #[arg(long)]
    vision_out: Option<PathBuf>,
}

/// JSON written by `--summary-out`.
#[derive(serde::Serialize)]
struct CycleSummary<'a> {
    pose: [f64; 3],
    counts: ClassCounts,
    map_update: MapUpdateStats,
    mean_angle_deg: Option<f64>,
    mean_distance: Option<f64>,
    navigation: &'a NavigationSummary,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process(args) => run_process(&args),
        Commands::DefaultConfig => run_default_config(),
        Commands::CalibrationInfo { config, mask_out } => {
            run_calibration_info(config.as_deref(), mask_out.as_deref())
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<PerceptionConfig> {
    match path {
        Some(path) => {
            tracing::info!("Loading config: {}", path.display());
            PerceptionConfig::from_json_file(path).map_err(|e| -> CliError {
                format!("Failed to load config {}: {}", path.display(), e).into()
            })
        }
        None => Ok(PerceptionConfig::default()),
    }
}

fn run_default_config() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&PerceptionConfig::default())?);
    Ok(())
}

fn run_calibration_info(config: Option<&Path>, mask_out: Option<&Path>) -> CliResult<()> {
    let config = load_config(config)?;
    let perception = Perception::new(config)?;
    let cal = &perception.config().calibration;

    println!("rovermap calibration");
    println!(
        "  frame size:   {}x{}",
        perception.config().frame_size[0],
        perception.config().frame_size[1]
    );
    for (i, (s, d)) in cal.src_quad.iter().zip(&cal.dst_quad).enumerate() {
        println!(
            "  corner {}:     ({:.1}, {:.1}) -> ({:.1}, {:.1})",
            i, s[0], s[1], d[0], d[1]
        );
    }
    let h = perception.rectifier().homography();
    println!("  homography:");
    for r in 0..3 {
        println!(
            "    [{:>12.6} {:>12.6} {:>12.6}]",
            h[(r, 0)],
            h[(r, 1)],
            h[(r, 2)]
        );
    }
    let vis = perception.visibility();
    println!("  visible px:   {}", vis.full.count_ones());
    println!("  rock px:      {}", vis.near.count_ones());

    if let Some(path) = mask_out {
        vis.full.to_gray_image().save(path)?;
        tracing::info!("Visibility mask written to {}", path.display());
    }
    Ok(())
}

fn run_process(args: &CliProcessArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let config = PerceptionConfig {
        render_vision_image: config.render_vision_image || args.vision_out.is_some(),
        ..config
    };
    let perception = Perception::new(config)?;

    tracing::info!("Loading image: {}", args.image.display());
    let frame = image::open(&args.image)
        .map_err(|e| -> CliError {
            format!("Failed to open image {}: {}", args.image.display(), e).into()
        })?
        .to_rgb8();
    let (w, h) = frame.dimensions();
    tracing::info!("Image size: {}x{}", w, h);

    let mut map = match &args.map_in {
        Some(path) => {
            let snapshot = image::open(path)
                .map_err(|e| -> CliError {
                    format!("Failed to open map {}: {}", path.display(), e).into()
                })?
                .to_rgb8();
            WorldMap::from_rgb_image(&snapshot)?
        }
        None => perception.new_world_map(),
    };

    let pose = RoverPose::new(args.x, args.y, args.yaw);
    let out = perception.process(&CycleInput { frame: &frame, pose }, &mut map)?;

    tracing::info!(
        "Map now holds {} navigable, {} obstacle, {} rock cells",
        map.count(EvidenceChannel::Navigable),
        map.count(EvidenceChannel::Obstacle),
        map.count(EvidenceChannel::Rock),
    );
    if let Some(angle) = out.navigation.mean_angle_deg() {
        tracing::info!("Mean heading: {:.1} deg", angle);
    }

    if let Some(path) = &args.map_out {
        map.to_rgb_image().save(path)?;
        tracing::info!("Map written to {}", path.display());
    }

    if let Some(path) = &args.summary_out {
        let summary = CycleSummary {
            pose: [pose.x, pose.y, pose.yaw_deg],
            counts: out.counts,
            map_update: out.map_update,
            mean_angle_deg: out.navigation.mean_angle_deg(),
            mean_distance: out.navigation.mean_distance(),
            navigation: &out.navigation,
        };
        std::fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        tracing::info!("Summary written to {}", path.display());
    }

    if let (Some(path), Some(vision)) = (&args.vision_out, &out.vision_image) {
        vision.save(path)?;
        tracing::info!("Vision image written to {}", path.display());
    }

    Ok(())
}
