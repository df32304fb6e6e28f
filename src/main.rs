//! Sliding puzzle solver CLI.
//!
//! Builds a goal (ordered unless given), a start (shuffled from the goal
//! unless given), solves it with the chosen strategy and replays the moves.

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::style::Stylize;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use slider_solver::{solve, Puzzle, Strategy, Tile, BLANK};

#[derive(Parser)]
#[command(name = "slider-solver")]
#[command(version)]
#[command(about = "Solve sliding-tile puzzles of any size")]
struct Cli {
    /// Number of rows
    #[arg(long, default_value = "3")]
    rows: usize,

    /// Number of columns
    #[arg(long, default_value = "3")]
    cols: usize,

    /// Strategy: bfs, astar, gbfs or strategic
    #[arg(long, env = "SLIDER_STRATEGY", default_value = "astar")]
    strategy: Strategy,

    /// Random seed for the shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Start layout as comma-separated row-major tiles, 0 for the blank.
    /// Shuffled from the goal when omitted
    #[arg(long, value_delimiter = ',')]
    start: Option<Vec<Tile>>,

    /// Goal layout as comma-separated row-major tiles, ordered when omitted
    #[arg(long, value_delimiter = ',')]
    goal: Option<Vec<Tile>>,

    /// Print only the summary and the move list
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Board with the blank dimmed and `highlight` (the tile that just moved) marked.
fn render(puzzle: &Puzzle, highlight: Option<(usize, usize)>) -> String {
    let width = (puzzle.rows() * puzzle.cols() - 1).to_string().len();
    let mut out = String::new();

    for row in 0..puzzle.rows() {
        for col in 0..puzzle.cols() {
            let value = puzzle.tile(row, col);
            let cell = if value == BLANK {
                format!("{:>width$}", ".").dark_grey().to_string()
            } else if highlight == Some((row, col)) {
                format!("{:>width$}", value).yellow().bold().to_string()
            } else {
                format!("{:>width$}", value)
            };
            out.push_str(&cell);
            out.push(' ');
        }
        out.push('\n');
    }
    out
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let goal = match cli.goal {
        Some(cells) => Puzzle::from_cells(cli.rows, cli.cols, cells).context("invalid goal layout")?,
        None => Puzzle::new(cli.rows, cli.cols)?,
    };
    let start = match cli.start {
        Some(cells) => Puzzle::from_cells(cli.rows, cli.cols, cells).context("invalid start layout")?,
        None => {
            let mut start = goal.clone();
            start.shuffle(&mut rng);
            start
        }
    };

    println!("Goal Puzzle:\n{}", render(&goal, None));
    println!("Start Puzzle:\n{}", render(&start, None));

    let result = solve(cli.strategy, &start, &goal)
        .with_context(|| format!("{} could not solve the puzzle", cli.strategy))?;
    println!("{}\n", result);

    if !result.is_solved() {
        info!("search exhausted without reaching the goal");
        return Ok(());
    }

    let mut replay = start.clone();
    for (idx, &direction) in result.moves.iter().enumerate() {
        let moved_tile = replay.blank();
        replay.slide(direction)?;
        if cli.quiet {
            println!("{}: {}", idx + 1, direction);
        } else {
            println!("{}: {}\n{}", idx + 1, direction, render(&replay, Some(moved_tile)));
        }
    }

    Ok(())
}
