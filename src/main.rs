use anyhow::{Context, Result, bail};
use batchrand::{
    AssignmentDb, PackPlan, RunConfig, RunOutcome, RunReport, SeedMode, SubjectRecord,
    SubjectTable, generate, run, summarize, summarize_without_leftover, write_json,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "batchrand")]
#[command(about = "Randomized capacity-constrained batch assignment with covariate balance")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and score trials, then assign subjects from the best one
    Assign {
        #[command(flatten)]
        run: RunArgs,

        /// Output file for the assignment (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append the assignment and score table to this SQLite file (created if missing)
        #[arg(long)]
        sqlite: Option<PathBuf>,
    },

    /// Generate trials only and print the progress report
    Pack {
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Subject table (JSON array of {id, weight, covariates})
    #[arg(short, long)]
    input: PathBuf,

    /// Run configuration (JSON). Flags below override its fields.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Number of randomized trials
    #[arg(long)]
    trials: Option<usize>,

    /// Maximum total weight per batch
    #[arg(long)]
    capacity: Option<u64>,

    /// Number of capacity batches
    #[arg(long)]
    batches: Option<usize>,

    /// Covariate used for balance scoring (repeatable)
    #[arg(long = "covariate")]
    covariates: Vec<String>,

    /// per-trial or shared-stream
    #[arg(long)]
    seed_mode: Option<SeedMode>,

    /// Stop scoring after this many seconds
    #[arg(long)]
    deadline_secs: Option<f64>,

    /// Threads (0 = auto)
    #[arg(long)]
    threads: Option<usize>,
}

impl RunArgs {
    fn load(&self) -> Result<(SubjectTable, RunConfig)> {
        let json = std::fs::read_to_string(&self.input)
            .context(format!("Failed to read {}", self.input.display()))?;
        let records: Vec<SubjectRecord> =
            serde_json::from_str(&json).context("Failed to parse subject table")?;
        let table = SubjectTable::from_records(records)?;

        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .context(format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&json).context("Failed to parse run config")?
            }
            None => RunConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(trials) = self.trials {
            config.trials = trials;
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(batches) = self.batches {
            config.batches = batches;
        }
        if !self.covariates.is_empty() {
            config.covariates = self.covariates.clone();
        }
        if let Some(mode) = self.seed_mode {
            config.seed_mode = mode;
        }
        if self.deadline_secs.is_some() {
            config.deadline_secs = self.deadline_secs;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }

        config.validate_against(&table)?;
        Ok((table, config))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Assign {
            run,
            output,
            sqlite,
        } => cmd_assign(&run, output.as_deref(), sqlite.as_deref()),
        Commands::Pack { run } => cmd_pack(&run),
    }
}

fn cmd_assign(args: &RunArgs, output: Option<&Path>, sqlite: Option<&Path>) -> Result<()> {
    let (table, config) = args.load()?;
    let started = Instant::now();
    let result = run(&table, &config)?;
    eprintln!("{}", result.report);

    match &result.outcome {
        RunOutcome::Complete(assignment) => {
            eprintln!(
                "Ran in {:.1} minutes",
                started.elapsed().as_secs_f64() / 60.0
            );
            eprintln!(
                "Lowest balance score: {:.4} (trial #{})\n",
                assignment.winner_score, assignment.winner
            );
            for summary in summarize(assignment) {
                eprintln!("  {}", summary);
            }

            let leftover: Vec<&str> = assignment
                .leftover_rows()
                .map(|r| r.record.id.as_str())
                .collect();
            if !leftover.is_empty() {
                eprintln!("\nWithout leftover ({}):", leftover.join(", "));
                for summary in summarize_without_leftover(assignment) {
                    eprintln!("  {}", summary);
                }
            }

            if let Some(path) = sqlite {
                let db = AssignmentDb::open(&path.to_string_lossy())?;
                let run_id = db.insert_run(&config, assignment)?;
                eprintln!("\nSaved run {} to {}", run_id, path.display());
            }

            write_json(output, assignment)
        }
        RunOutcome::Partial {
            completed,
            requested,
            ..
        } => {
            write_json(output, &result.outcome)?;
            bail!(
                "deadline expired after scoring {} of {} trials; no assignment selected",
                completed,
                requested
            )
        }
        RunOutcome::Unscorable { .. } => {
            write_json(output, &result.outcome)?;
            bail!("no trial had a scorable batch; check capacity against subject weights")
        }
    }
}

fn cmd_pack(args: &RunArgs) -> Result<()> {
    let (table, config) = args.load()?;
    let started = Instant::now();
    let trials = generate(&table.weights(), &PackPlan::from(&config));
    let report = RunReport::new(&table, &trials, started.elapsed());
    println!("{}", report);

    let with_leftover = trials
        .trials()
        .iter()
        .filter(|t| t.leftover().is_some())
        .count();
    println!(
        "Trials with leftover subjects: {} of {}",
        with_leftover,
        trials.len()
    );
    Ok(())
}
