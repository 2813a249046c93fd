use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use solweave::config::{GrowthConfig, RoomConfig, SamplingConfig, SiteConfig};
use solweave::evaluator::{gene_bounds, DaylightEvaluator, GENOME_LEN, REPELLER_GENE_COUNT};
use solweave::geometry::GrowthEngine;
use solweave::io;
use solweave::optim::{Nsga2, Nsga2Config};
use solweave::shadow::ShadowRasterizer;
use solweave::solar::{sample_sun_vectors, solar_position};
use solweave::util::StageTimer;

/// Solweave - curtain-wall growth optimized against seasonal daylight
#[derive(Parser, Debug)]
#[command(name = "solweave", version, about)]
struct Cli {
    /// Starting curve positions CSV ({x, y, z} per line)
    #[arg(long, value_name = "FILE")]
    start_points: Option<PathBuf>,

    /// Repeller positions CSV
    #[arg(long, value_name = "FILE")]
    repellers: Option<PathBuf>,

    /// Repeller factors CSV for --simulate (one scalar per line)
    #[arg(long, value_name = "FILE")]
    factors: Option<PathBuf>,

    /// Run the growth + lighting pipeline once and exit (no optimization)
    #[arg(long)]
    simulate: bool,

    /// Uniform extrusion depth used by --simulate
    #[arg(long, default_value_t = 50.0)]
    extrusion: f64,

    /// Print the solar position at the given local hour and exit
    #[arg(long, value_name = "HOUR")]
    sun_position: Option<f64>,

    /// Random seed for the optimizer
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 50)]
    population: usize,

    #[arg(long, default_value_t = 100)]
    generations: usize,

    /// Worker threads for candidate evaluation
    #[arg(long)]
    workers: Option<usize>,

    /// Floor grid cell size
    #[arg(long, default_value_t = 50.0)]
    cell_size: f64,

    /// Output directory for result CSVs
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Per-generation optimizer log directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Some(hour) = cli.sun_position {
        print_sun_position(hour);
        return Ok(());
    }

    let start_points = io::load_points(
        cli.start_points
            .as_deref()
            .context("--start-points is required")?,
    )?;
    let repellers = match &cli.repellers {
        Some(path) => io::load_points(path)?,
        None => Vec::new(),
    };

    let site = SiteConfig::default();
    let sampling = SamplingConfig::default();
    let room = RoomConfig {
        cell_size: cli.cell_size,
        ..RoomConfig::default()
    };

    let timer = StageTimer::stage("sample sun vectors");
    let summer_suns = sample_sun_vectors(&sampling.summer, &site);
    let winter_suns = sample_sun_vectors(&sampling.winter, &site);
    timer.finish(format!(
        "{} summer, {} winter",
        summer_suns.len(),
        winter_suns.len()
    ));

    if cli.simulate {
        run_simulate(&cli, start_points, repellers, summer_suns, winter_suns, room)
    } else {
        run_optimize(&cli, start_points, repellers, summer_suns, winter_suns, room)
    }
}

fn print_sun_position(hour: f64) {
    let site = SiteConfig::default();
    let sampling = SamplingConfig::default();
    let pos = solar_position(sampling.summer.date, hour, &site, true);
    println!(
        "date={:?} hour={} lat={} lon={}",
        sampling.summer.date, hour, site.latitude_deg, site.longitude_deg
    );
    println!("  geometric elevation: {:.4} deg", pos.geometric_elevation_deg);
    println!("  apparent elevation:  {:.4} deg", pos.apparent_elevation_deg);
    println!("  azimuth (N, cw):     {:.4} deg", pos.azimuth_deg);
    println!("  declination:         {:.4} deg", pos.declination_deg);
    println!("  hour angle:          {:.4} deg", pos.hour_angle_deg);
    println!("  equation of time:    {:.4} min", pos.equation_of_time_min);
    println!("  solar noon:          {:.2} min after midnight", pos.solar_noon_min);
}

fn run_optimize(
    cli: &Cli,
    start_points: Vec<glam::DVec3>,
    repellers: Vec<glam::DVec3>,
    summer_suns: Vec<glam::DVec3>,
    winter_suns: Vec<glam::DVec3>,
    room: RoomConfig,
) -> Result<()> {
    let seed = cli.seed.unwrap_or_else(rand::random);
    println!(
        "Optimizing: seed={}, population={}, generations={}",
        seed, cli.population, cli.generations
    );

    let evaluator = DaylightEvaluator::new(
        start_points,
        repellers,
        summer_suns,
        winter_suns,
        GrowthConfig::default(),
        room,
    );

    let (lower, upper) = gene_bounds();
    let config = Nsga2Config {
        population: cli.population,
        generations: cli.generations,
        crossover_rate: 0.9,
        mutation_rate: 1.0 / GENOME_LEN as f64,
        eta_crossover: 20.0,
        eta_mutation: 20.0,
        lower,
        upper,
        seed,
        workers: cli.workers,
        log_dir: cli.log_dir.clone(),
    };

    let timer = StageTimer::stage("optimize");
    let mut optimizer = Nsga2::new(config)?;
    optimizer.run(|genes| evaluator.objectives(genes))?;
    timer.finish(format!(
        "front 0 holds {} individuals",
        optimizer.pareto_front().len()
    ));

    let best = optimizer
        .best_by_objective_sum()
        .context("optimizer returned an empty population")?;
    println!(
        "Best design: summer={}, winter={}",
        best.objectives[0], -best.objectives[1]
    );
    let best_genes = best.genes.clone();

    export_design(cli, &evaluator, &best_genes)
}

fn run_simulate(
    cli: &Cli,
    start_points: Vec<glam::DVec3>,
    repellers: Vec<glam::DVec3>,
    summer_suns: Vec<glam::DVec3>,
    winter_suns: Vec<glam::DVec3>,
    room: RoomConfig,
) -> Result<()> {
    let factors = match &cli.factors {
        Some(path) => io::load_factors(path)?,
        None => vec![1.0; repellers.len().max(1)],
    };

    let timer = StageTimer::stage("grow curve");
    let mut engine = GrowthEngine::new(
        start_points,
        repellers,
        factors,
        GrowthConfig::default(),
    );
    engine.run();
    timer.finish(format!("{} points", engine.points().len()));

    // Assemble a genome with the loaded factors implied and a uniform
    // extrusion, then reuse the evaluator's export path
    let mut genes = vec![1.0; REPELLER_GENE_COUNT];
    genes.extend(std::iter::repeat(cli.extrusion).take(GENOME_LEN - REPELLER_GENE_COUNT));

    let evaluator = DaylightEvaluator::new(
        engine.points().to_vec(),
        Vec::new(),
        summer_suns,
        winter_suns,
        // The curve is already grown; zero iterations keep it as-is
        GrowthConfig {
            max_iters: 0,
            ..GrowthConfig::default()
        },
        room,
    );
    export_design(cli, &evaluator, &genes)
}

/// Export the curtain curve and both seasonal lighting grids.
fn export_design(cli: &Cli, evaluator: &DaylightEvaluator, genes: &[f64]) -> Result<()> {
    let timer = StageTimer::stage("export");
    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("create {}", cli.out_dir.display()))?;

    let (facade, extruded) = evaluator.build_curtain(genes);
    io::write_curve(&cli.out_dir.join("resultsCrv.csv"), &extruded)?;

    for (suns, name) in [
        (evaluator.summer_suns(), "resultsLighting_summer.csv"),
        (evaluator.winter_suns(), "resultsLighting_winter.csv"),
    ] {
        let mut rasterizer = ShadowRasterizer::new(
            facade.clone(),
            extruded.clone(),
            evaluator.room(),
            true,
        )?;
        rasterizer.run_with_sun_vectors(suns);
        io::write_lighting(&cli.out_dir.join(name), rasterizer.grid())?;
        println!(
            "{}: total {} hours, average {:.2}",
            name,
            rasterizer.total_hours(),
            rasterizer.average_hours()
        );
    }

    timer.finish(format!("results in {}", cli.out_dir.display()));
    Ok(())
}
