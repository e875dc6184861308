use algoverse::algorithm::{random_array, HuffmanBuilder, JohnsonTrotter, Pathfinder, SortAlgorithm};
use algoverse::config::{Cli, Command, Config, OutputFormat};
use algoverse::map::GridLayout;
use algoverse::player::{tick_period, StepPlayer};
use algoverse::stat::Stats;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;
use std::time::{Duration, Instant};
use tokio::time::Interval;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = std::fs::read_to_string(config_file)
            .with_context(|| format!("cannot read config file {config_file}"))?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        Config::default()
    }
    .override_from_command_line(&cli)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("invalid log filter {:?}", config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    if cli.config.is_none() {
        info!("No config file specified, using default config");
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let start = Instant::now();

    match &cli.command {
        Command::Astar { .. } => run_astar(&config, &mut rng).await?,
        Command::Huffman { .. } => run_huffman(&config).await?,
        Command::Permutations { .. } => {
            let generator = JohnsonTrotter::new(config.permutations.n);
            emit(generator.steps(), &config).await?;
            info!(
                "{} permutations of {} values",
                generator.permutations().len(),
                config.permutations.n
            );
        }
        Command::Sort { .. } => {
            let values = if config.sort.values.is_empty() {
                random_array(&mut rng, config.sort.size, config.sort.min, config.sort.max)
            } else {
                config.sort.values.clone()
            };
            let algorithm: SortAlgorithm = config.sort.algorithm;
            info!("{algorithm} sort of {values:?}");
            emit(&algorithm.trace(&values), &config).await?;
        }
    }

    info!("Finished in {} microseconds", start.elapsed().as_micros());
    Ok(())
}

async fn run_astar(config: &Config, rng: &mut StdRng) -> anyhow::Result<()> {
    let grid = &config.grid;
    let layout = match &grid.map_path {
        Some(path) => GridLayout::from_file(path)?,
        None => GridLayout::random(grid.rows, grid.cols, grid.obstacle_density, rng),
    }
    .with_source(grid.source)
    .with_goal(grid.goal);

    let mut pathfinder = layout.to_pathfinder(grid.heuristic);
    if !pathfinder.initialize() {
        warn!("{}", pathfinder.status_text());
        return emit(&[pathfinder.state()], config).await;
    }

    let mut stats = Stats::seeded();
    let ticker = config.play.then(|| {
        tokio::time::interval(tick_period(
            Duration::from_millis(config.interval_ms),
            config.speed,
        ))
    });
    let written = stream_search(
        &mut pathfinder,
        &mut stats,
        config.format,
        ticker,
        &mut std::io::stdout(),
    )
    .await?;
    debug!("wrote {written} search states");
    stats.print();
    Ok(())
}

/// Writes the state before the first step and after every step as soon as it
/// is taken, one per tick when a ticker is given. Only step time counts
/// towards `stats.time_us`. Returns the number of states written.
async fn stream_search<W: Write>(
    pathfinder: &mut Pathfinder,
    stats: &mut Stats,
    format: OutputFormat,
    mut ticker: Option<Interval>,
    out: &mut W,
) -> anyhow::Result<usize> {
    let mut index = 0;
    loop {
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        }
        writeln!(out, "{}", render(format, index, &pathfinder.state())?)?;
        index += 1;
        if pathfinder.is_complete() {
            break;
        }
        let step_start = Instant::now();
        pathfinder.step_observed(stats);
        stats.time_us += step_start.elapsed().as_micros() as usize;
    }
    out.flush()?;
    Ok(index)
}

async fn run_huffman(config: &Config) -> anyhow::Result<()> {
    let huffman = &config.huffman;
    let builder = match &huffman.text {
        Some(text) => HuffmanBuilder::from_text(text),
        None if !huffman.frequencies.is_empty() => HuffmanBuilder::new(
            huffman
                .frequencies
                .iter()
                .map(|(&symbol, &frequency)| (symbol, frequency))
                .collect(),
        ),
        None => HuffmanBuilder::default(),
    };

    let steps = builder.generate_steps();
    emit(&steps, config).await?;

    let Some(last) = steps.last() else {
        return Ok(());
    };
    let table = last.code_table();
    info!("Weighted code length {} bits", table.weighted_length());

    if let (Some(text), Some(tree)) = (&huffman.text, &last.tree) {
        let bits = table.encode(text)?;
        let decoded = tree.decode(&bits)?;
        info!(
            "Encoded {} characters into {} bits (round trip {})",
            text.chars().count(),
            bits.len(),
            if decoded == *text { "ok" } else { "failed" }
        );
        write_bits(config.format, &bits, &mut std::io::stdout())?;
    }
    Ok(())
}

// In JSON mode stdout carries only step lines, so the bits go to the log.
fn write_bits<W: Write>(format: OutputFormat, bits: &str, out: &mut W) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => writeln!(out, "{bits}")?,
        OutputFormat::Json => info!("Encoded bits {bits}"),
    }
    Ok(())
}

fn render<T: Serialize + Display>(
    format: OutputFormat,
    index: usize,
    step: &T,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(format!("step {index}:\n{step}\n")),
        OutputFormat::Json => Ok(serde_json::to_string(step)?),
    }
}

/// Prints every step of a recorded log, or replays them one per tick in play mode.
async fn emit<T: Serialize + Display>(steps: &[T], config: &Config) -> anyhow::Result<()> {
    let rendered = steps
        .iter()
        .enumerate()
        .map(|(index, step)| render(config.format, index, step))
        .collect::<anyhow::Result<Vec<String>>>()?;

    if config.play {
        let mut player = StepPlayer::new(&rendered);
        player.set_speed(config.speed);
        player
            .autoplay(Duration::from_millis(config.interval_ms), |_, line| {
                println!("{line}")
            })
            .await;
    } else {
        for line in &rendered {
            println!("{line}");
        }
    }
    Ok(())
}
