//! Search tool - runs perft, single searches and a fixed benchmark.
//!
//! Protocol-style output (`info`, `bestmove`, perft counts) goes to stdout;
//! logs go to stderr and are filtered with `RUST_LOG`.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chess_engine::{
    line_to_san, perft, perft_divide, perft_staged, GameHistory, HistoryTables, Position,
};
use chess_search::{
    Engine, EngineConfig, NullSink, PieceSquareEvaluator, SearchLimits, StdoutSink,
};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "search-tool")]
#[command(about = "Chess engine search driver")]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count leaf nodes of the move tree
    Perft {
        depth: u32,
        #[command(flatten)]
        position: PositionArgs,
        /// Walk the staged generator instead of the legal move list
        #[arg(long)]
        staged: bool,
    },
    /// Perft split by root move
    Divide {
        depth: u32,
        #[command(flatten)]
        position: PositionArgs,
    },
    /// Search one position and print the best move
    Search {
        #[command(flatten)]
        position: PositionArgs,
        #[command(flatten)]
        limits: LimitArgs,
        /// Override the configured thread count
        #[arg(short, long)]
        threads: Option<usize>,
        /// Override the configured number of lines
        #[arg(long)]
        multipv: Option<usize>,
    },
    /// Search a fixed set of positions to a fixed depth
    Bench {
        #[arg(short, long, default_value = "6")]
        depth: u32,
    },
    /// Print the default configuration as TOML
    DefaultConfig,
}

#[derive(Args)]
struct PositionArgs {
    /// Start position in FEN (default: the initial position)
    #[arg(long)]
    fen: Option<String>,
    /// Moves played from the start position, in coordinate notation
    #[arg(long, num_args = 1..)]
    moves: Vec<String>,
}

impl PositionArgs {
    fn game(&self) -> Result<GameHistory> {
        let mut game = match &self.fen {
            Some(fen) => GameHistory::from_fen(fen).with_context(|| format!("invalid FEN: {fen}"))?,
            None => GameHistory::new(),
        };
        for text in &self.moves {
            game.push_uci(text)
                .with_context(|| format!("cannot play {text} in {}", game.fen()))?;
        }
        Ok(game)
    }
}

#[derive(Args)]
struct LimitArgs {
    /// Search depth in plies
    #[arg(short, long)]
    depth: Option<u32>,
    /// Search time in milliseconds
    #[arg(long)]
    movetime: Option<u64>,
    /// Node budget
    #[arg(long)]
    nodes: Option<u64>,
}

impl LimitArgs {
    fn limits(&self) -> SearchLimits {
        let mut limits = SearchLimits {
            depth: self.depth,
            movetime: self.movetime,
            nodes: self.nodes,
            ..Default::default()
        };
        if limits.depth.is_none() && limits.movetime.is_none() && limits.nodes.is_none() {
            limits.depth = Some(DEFAULT_DEPTH);
        }
        limits
    }
}

const DEFAULT_DEPTH: u32 = 8;

/// Middlegame and endgame positions for `bench`.
const BENCH_POSITIONS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4",
    "r2q1rk1/ppp2ppp/2npbn2/2b1p3/2B1P3/2NP1N2/PPP1QPPP/R1B2RK1 w - - 0 8",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
    "6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("cannot use configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Perft {
            depth,
            position,
            staged,
        } => run_perft(depth, &position, staged),
        Commands::Divide { depth, position } => run_divide(depth, &position),
        Commands::Search {
            position,
            limits,
            threads,
            multipv,
        } => {
            let mut config = config;
            if let Some(threads) = threads {
                config.threads = threads;
            }
            if let Some(multipv) = multipv {
                config.multi_pv = multipv;
            }
            run_search(config, &position, &limits)
        }
        Commands::Bench { depth } => run_bench(config, depth),
        Commands::DefaultConfig => {
            print!("{}", EngineConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn run_perft(depth: u32, args: &PositionArgs, staged: bool) -> Result<()> {
    let game = args.game()?;
    let start = Instant::now();
    let nodes = if staged {
        perft_staged(&mut game.position(), depth, &HistoryTables::new())
    } else {
        perft(&game.position(), depth)
    };
    let elapsed = start.elapsed();
    let nps = (nodes as f64 / elapsed.as_secs_f64().max(1e-9)) as u64;
    println!("perft {depth}: {nodes} nodes in {} ms ({nps} nps)", elapsed.as_millis());
    Ok(())
}

fn run_divide(depth: u32, args: &PositionArgs) -> Result<()> {
    if depth == 0 {
        bail!("divide needs a depth of at least 1");
    }
    let game = args.game()?;
    let counts = perft_divide(&game.position(), depth);
    let total: u64 = counts.iter().map(|(_, n)| n).sum();
    for (mv, nodes) in &counts {
        println!("{mv}: {nodes}");
    }
    println!();
    println!("moves: {}", counts.len());
    println!("nodes: {total}");
    Ok(())
}

fn run_search(config: EngineConfig, args: &PositionArgs, limits: &LimitArgs) -> Result<()> {
    let game = args.game()?;
    let position = game.position();
    let mut engine = Engine::new(config, PieceSquareEvaluator::new());
    let result = engine.think(&position, &limits.limits(), &StdoutSink::default());

    let san = line_to_san(&position, &result.pv);
    info!(
        depth = result.depth,
        nodes = result.nodes,
        line = %san.join(" "),
        "principal variation"
    );
    Ok(())
}

fn run_bench(config: EngineConfig, depth: u32) -> Result<()> {
    let mut engine = Engine::new(config, PieceSquareEvaluator::new());
    let limits = SearchLimits::depth(depth);
    let start = Instant::now();
    let mut total = 0;

    for fen in BENCH_POSITIONS {
        let position =
            Position::from_fen(fen).with_context(|| format!("invalid bench position: {fen}"))?;
        engine.new_game();
        let result = engine.think(&position, &limits, &NullSink);
        println!(
            "{:<72} {:>6} {:>10}",
            fen,
            position.move_to_uci(result.best_move),
            result.nodes
        );
        total += result.nodes;
    }

    let elapsed = start.elapsed();
    let nps = (total as f64 / elapsed.as_secs_f64().max(1e-9)) as u64;
    println!();
    println!("nodes: {total}");
    println!("time: {} ms", elapsed.as_millis());
    println!("nps: {nps}");
    Ok(())
}
