//! Cartogen CLI - seeded terrain-graph map generator.
//!
//! Builds a complete map (mesh, height field, coastlines, climate, rivers,
//! biomes) from a seed string and optionally renders PNG previews.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use cartogen::biomes::Biome;
use cartogen::climate::ClimateConfig;
use cartogen::export::{PngExportOptions, export_biome_png, export_height_png};
use cartogen::heightmap::{HeightmapConfig, Template};
use cartogen::hydrology::HydrologyConfig;
use cartogen::map::{Cell, FeatureGroup, Map};
use cartogen::noise::FractalNoiseConfig;
use cartogen::pipeline::{GenerateOptions, Pipeline, StageContext};
use cartogen::rng::AleaRng;

/// Seeded terrain-graph map generator.
#[derive(Parser)]
#[command(name = "cartogen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new map.
    Generate(GenerateArgs),

    /// List the built-in sculpting templates.
    Templates,

    /// Display mesh statistics for a configuration without generating.
    Info {
        /// Requested cell count.
        #[arg(short, long, default_value = "10000")]
        cells: usize,

        /// Domain width in map units.
        #[arg(long, default_value = "960")]
        width: f64,

        /// Domain height in map units.
        #[arg(long, default_value = "540")]
        height: f64,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Seed string for reproducible generation (default: nanosecond clock).
    #[arg(short, long)]
    seed: Option<String>,

    /// Requested cell count; the mesh rounds it to whole grid rows.
    #[arg(short, long, default_value = "10000")]
    cells: usize,

    /// Land/water elevation threshold in [0, 1].
    #[arg(short, long, default_value = "0.2")]
    water_level: f64,

    /// Domain width in map units.
    #[arg(long, default_value = "960")]
    width: f64,

    /// Domain height in map units.
    #[arg(long, default_value = "540")]
    height: f64,

    /// Built-in sculpting template (see `cartogen templates`).
    #[arg(short, long, default_value = "continents")]
    template: String,

    /// JSON template file; overrides --template.
    #[arg(long)]
    template_file: Option<PathBuf>,

    /// Climate preset.
    #[arg(long, default_value = "earth-like")]
    climate: ClimatePreset,

    /// Rainfall preset controlling how easily rivers form.
    #[arg(long, default_value = "normal")]
    rainfall: RainfallPreset,

    /// Number of noise octaves (1-16).
    #[arg(long, default_value = "6")]
    octaves: u32,

    /// Base noise frequency in cycles per map unit.
    #[arg(long, default_value = "0.004")]
    frequency: f64,

    /// Radial falloff toward the domain edges, 0 (none) to 1 (full).
    #[arg(long, default_value = "1.0")]
    falloff: f64,

    /// Print the generation summary table.
    #[arg(long)]
    stats: bool,

    /// Write a biome preview PNG to this path.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Write a grayscale height map PNG to this path.
    #[arg(long)]
    height_map: Option<PathBuf>,

    /// Pixels per map unit in exported previews.
    #[arg(long, default_value = "1.0")]
    preview_scale: f64,
}

#[derive(Clone, Copy, ValueEnum)]
enum ClimatePreset {
    /// Hot equator, frozen poles.
    EarthLike,
    /// Warm and wet everywhere.
    Tropical,
    /// Cold and dry everywhere.
    Arctic,
}

#[derive(Clone, Copy, ValueEnum)]
enum RainfallPreset {
    Wet,
    Normal,
    Arid,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => run_generate(&args),
        Commands::Templates => run_templates(),
        Commands::Info {
            cells,
            width,
            height,
        } => run_info(cells, width, height),
    }
}

fn run_generate(args: &GenerateArgs) {
    // Validate parameters
    if args.cells == 0 {
        eprintln!("Error: Cell count must be at least 1");
        std::process::exit(1);
    }

    if args.water_level < 0.0 || args.water_level > 1.0 {
        eprintln!("Error: Water level must be between 0.0 and 1.0");
        std::process::exit(1);
    }

    if args.width <= 0.0 || args.height <= 0.0 {
        eprintln!("Error: Domain dimensions must be positive");
        std::process::exit(1);
    }

    if args.octaves < 1 || args.octaves > 16 {
        eprintln!("Error: Octaves must be between 1 and 16");
        std::process::exit(1);
    }

    if args.falloff < 0.0 || args.falloff > 1.0 {
        eprintln!("Error: Falloff must be between 0.0 and 1.0");
        std::process::exit(1);
    }

    if args.preview_scale <= 0.0 {
        eprintln!("Error: Preview scale must be positive");
        std::process::exit(1);
    }

    let template = load_template(args);

    // Generate seed if not provided
    let seed = args.seed.clone().unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(1)
            .to_string()
    });

    println!("Cartogen - Seeded Terrain Graph Generator");
    println!("=========================================");
    println!("Seed: {}", seed);
    println!("Cells: {} over {}x{} units", args.cells, args.width, args.height);
    println!("Water level: {}", args.water_level);
    println!("Template: {}", template.name);

    let options = GenerateOptions {
        seed,
        cell_count: args.cells,
        water_level: args.water_level,
        width: args.width,
        height: args.height,
        template,
        heightmap: HeightmapConfig {
            noise: FractalNoiseConfig {
                octaves: args.octaves,
                frequency: args.frequency,
            },
            falloff: args.falloff,
        },
        climate: match args.climate {
            ClimatePreset::EarthLike => ClimateConfig::earth_like(),
            ClimatePreset::Tropical => ClimateConfig::tropical(),
            ClimatePreset::Arctic => ClimateConfig::arctic(),
        },
        hydrology: match args.rainfall {
            RainfallPreset::Wet => HydrologyConfig::wet(),
            RainfallPreset::Normal => HydrologyConfig::default(),
            RainfallPreset::Arid => HydrologyConfig::arid(),
        },
    };

    let start = Instant::now();
    let mut rng = AleaRng::new(&options.seed);
    let mut map = Map::new(
        &options.seed,
        options.width,
        options.height,
        options.water_level,
    );
    let mut ctx = StageContext {
        options: &options,
        rng: &mut rng,
    };

    println!("\nRunning generation pipeline...");
    Pipeline::standard()
        .run_with_callbacks(
            &mut map,
            &mut ctx,
            |name, i, total| {
                println!("  [{}/{}] Starting: {}", i, total, name);
            },
            |name, i, total| {
                println!("  [{}/{}] Completed: {}", i, total, name);
            },
        )
        .unwrap_or_else(|e| {
            eprintln!("Error during generation: {}", e);
            std::process::exit(1);
        });

    let gen_time = start.elapsed();
    println!("Generation completed in {:.2?}", gen_time);

    if let Some(report) = map.depressions {
        if report.unresolved > 0 {
            println!(
                "Warning: {} depressions left unresolved after {} passes",
                report.unresolved, report.passes
            );
        }
    }

    if args.stats {
        print_stats(&map);
    }

    if args.preview.is_some() || args.height_map.is_some() {
        println!("\nExporting previews...");
        let export_start = Instant::now();
        let export_options = PngExportOptions {
            scale: args.preview_scale,
            ..Default::default()
        };

        if let Some(path) = &args.preview {
            ensure_parent_dir(path);
            export_biome_png(&map, path, &export_options).unwrap_or_else(|e| {
                eprintln!("Error exporting biome preview: {}", e);
                std::process::exit(1);
            });
            println!("  Exported biome preview: {}", path.display());
        }

        if let Some(path) = &args.height_map {
            ensure_parent_dir(path);
            export_height_png(&map, path, &export_options).unwrap_or_else(|e| {
                eprintln!("Error exporting height map: {}", e);
                std::process::exit(1);
            });
            println!("  Exported height map: {}", path.display());
        }

        println!("Export completed in {:.2?}", export_start.elapsed());
    }

    println!("\nTotal time: {:.2?}", start.elapsed());
    println!("Done!");
}

fn load_template(args: &GenerateArgs) -> Template {
    if let Some(path) = &args.template_file {
        let json = std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Error reading template file {}: {}", path.display(), e);
            std::process::exit(1);
        });
        return Template::from_json(&json).unwrap_or_else(|e| {
            eprintln!("Error parsing template file {}: {}", path.display(), e);
            std::process::exit(1);
        });
    }
    Template::preset(&args.template).unwrap_or_else(|| {
        eprintln!(
            "Error: Unknown template '{}'. Available: {}",
            args.template,
            Template::preset_names().join(", ")
        );
        std::process::exit(1);
    })
}

fn ensure_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).unwrap_or_else(|e| {
                eprintln!("Error creating output directory: {}", e);
                std::process::exit(1);
            });
        }
    }
}

fn print_stats(map: &Map) {
    let total = map.cells.len();
    let land = map.land_cell_count();
    let land_pct = if total > 0 {
        land as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    println!();
    println!("Map statistics");
    println!("==============");
    println!("Cells:     {:>8} total, {} land ({:.1}%)", total, land, land_pct);

    println!("Features:  {:>8}", map.features.len());
    let groups = [
        FeatureGroup::Ocean,
        FeatureGroup::Sea,
        FeatureGroup::Gulf,
        FeatureGroup::Continent,
        FeatureGroup::Island,
        FeatureGroup::Isle,
        FeatureGroup::Freshwater,
        FeatureGroup::Salt,
    ];
    for group in groups {
        let count = map.features.iter().filter(|f| f.group == group).count();
        if count > 0 {
            println!("  {:<16} {:>6}", group.as_str(), count);
        }
    }

    println!("Rivers:    {:>8}", map.rivers.len());
    if let Some(longest) = map
        .rivers
        .iter()
        .max_by(|a, b| a.length.partial_cmp(&b.length).unwrap_or(std::cmp::Ordering::Equal))
    {
        println!(
            "  longest        river {} at {:.1} units, discharge {}",
            longest.id, longest.length, longest.discharge
        );
    }

    let mut by_biome = [0usize; 13];
    for cell in &map.cells {
        by_biome[usize::from(cell.biome.min(12))] += 1;
    }
    println!("Biomes:");
    let mut ranked: Vec<(u8, usize)> = (0u8..=12)
        .map(|id| (id, by_biome[usize::from(id)]))
        .filter(|&(_, count)| count > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (id, count) in ranked {
        let share = count as f64 / total as f64 * 100.0;
        println!(
            "  {:<28} {:>6} cells ({:>5.1}%)",
            Biome::from_id(id).name(),
            count,
            share
        );
    }
}

fn run_templates() {
    println!("Built-in sculpting templates:");
    for name in Template::preset_names() {
        let template = match Template::preset(name) {
            Some(t) => t,
            None => continue,
        };
        println!("  {:<16} {:>2} steps", name, template.steps.len());
    }
}

fn run_info(cells: usize, width: f64, height: f64) {
    if cells == 0 {
        eprintln!("Error: Cell count must be at least 1");
        std::process::exit(1);
    }
    if width <= 0.0 || height <= 0.0 {
        eprintln!("Error: Domain dimensions must be positive");
        std::process::exit(1);
    }

    // Mirrors the mesh's grid arithmetic without drawing any jitter.
    let spacing = ((width * height / cells as f64).sqrt() * 100.0).round() / 100.0;
    let radius = spacing / 2.0;
    let mut cols = 0usize;
    let mut x = radius;
    while x < width {
        cols += 1;
        x += spacing;
    }
    let mut rows = 0usize;
    let mut y = radius;
    while y < height {
        rows += 1;
        y += spacing;
    }
    let actual = cols * rows;

    let cell_struct = std::mem::size_of::<Cell>() as u64;
    let bytes_cells = actual as u64 * cell_struct;
    // Average Voronoi cell: ~6 polygon vertices and ~6 neighbor ids.
    let bytes_heap = actual as u64 * (6 * 16 + 6 * 4);
    let total_bytes = bytes_cells + bytes_heap;

    println!("Cartogen - Mesh Configuration Info");
    println!("==================================");
    println!();
    println!("Domain:     {}x{} map units", width, height);
    println!("Requested:  {:>8} cells", cells);
    println!("Actual:     {:>8} cells ({} cols x {} rows)", actual, cols, rows);
    println!("Spacing:    {:>8.2} units", spacing);
    println!();
    println!("Memory estimate (in-memory):");
    println!(
        "  Cell structs:  {:>12} bytes ({:.2} MB)",
        bytes_cells,
        bytes_cells as f64 / 1024.0 / 1024.0
    );
    println!(
        "  Geometry heap: {:>12} bytes ({:.2} MB)",
        bytes_heap,
        bytes_heap as f64 / 1024.0 / 1024.0
    );
    println!(
        "  Total:         {:>12} bytes ({:.2} MB)",
        total_bytes,
        total_bytes as f64 / 1024.0 / 1024.0
    );
}
