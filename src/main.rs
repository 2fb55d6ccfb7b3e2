mod report;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use tracing::info;
use tracing_subscriber::EnvFilter;

use liftcheck::{Arm, BayesianParams, Config, PlanningInput};

use report::Matchup;

/// Labels for the variants after Control A.
const VARIANT_LABELS: [&str; 4] = ["B", "C", "D", "E"];

#[derive(Parser)]
#[command(name = "liftcheck", about = "Plan and evaluate conversion A/B tests")]
struct Cli {
    /// Read defaults from this file instead of searching for liftcheck.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ignore any liftcheck.toml
    #[arg(long, global = true, conflicts_with = "config")]
    no_config: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    Frequentist,
    Bayesian,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the sample size and duration needed before starting a test
    Plan {
        /// Baseline conversion rate, in percent
        #[arg(long)]
        baseline: f64,

        /// Minimum detectable effect, relative, in percent
        #[arg(long)]
        mde: f64,

        /// Confidence level (0.90, 0.95 or 0.99)
        #[arg(long)]
        confidence: Option<f64>,

        /// Statistical power (0.90, 0.95 or 0.99)
        #[arg(long)]
        power: Option<f64>,

        /// Number of arms, control included
        #[arg(long)]
        variants: Option<u32>,

        /// Visitors entering the test per day
        #[arg(long)]
        daily_traffic: u64,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a finished test; with several variants the best one is compared to control
    Analyze {
        /// Control arm as VISITORS:CONVERSIONS
        #[arg(long)]
        control: Arm,

        /// Variant arm as VISITORS:CONVERSIONS (repeat for up to four variants)
        #[arg(long = "variant", required = true)]
        variants: Vec<Arm>,

        #[arg(long, value_enum, default_value_t = Method::Frequentist)]
        method: Method,

        /// Beta prior alpha (Bayesian only)
        #[arg(long)]
        prior_alpha: Option<f64>,

        /// Beta prior beta (Bayesian only)
        #[arg(long)]
        prior_beta: Option<f64>,

        /// Monte Carlo draws (Bayesian only)
        #[arg(long)]
        samples: Option<usize>,

        /// Seed for reproducible Monte Carlo draws
        #[arg(long)]
        seed: Option<u64>,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a shell completion script
    Completions {
        shell: Shell,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::Plan {
            baseline,
            mde,
            confidence,
            power,
            variants,
            daily_traffic,
            json,
        } => {
            let config = load_config(cli.config.as_deref(), cli.no_config);
            let input = PlanningInput {
                baseline_rate: baseline / 100.0,
                minimum_detectable_effect: mde / 100.0,
                confidence_level: confidence.unwrap_or(config.planning.confidence),
                power: power.unwrap_or(config.planning.power),
                variant_count: variants.unwrap_or(config.planning.variants),
                daily_traffic,
            };
            let result = liftcheck::plan(&input).unwrap_or_else(|e| fail(e));
            if json {
                report::print_plan_json(&input, &result);
            } else {
                report::print_plan(&input, &result);
            }
        }
        Commands::Analyze {
            control,
            variants,
            method,
            prior_alpha,
            prior_beta,
            samples,
            seed,
            json,
        } => {
            let config = load_config(cli.config.as_deref(), cli.no_config);
            if variants.len() > VARIANT_LABELS.len() {
                eprintln!(
                    "error: at most {} variants can be analyzed against control",
                    VARIANT_LABELS.len()
                );
                std::process::exit(1);
            }
            if let Err(e) = control.validate("control") {
                fail(e);
            }
            let (best_idx, best) =
                liftcheck::select_best_variant(&variants).unwrap_or_else(|e| fail(e));
            info!(
                variant = VARIANT_LABELS[best_idx],
                rate = best.rate(),
                "selected best variant"
            );

            let matchup = Matchup {
                control,
                variant: best,
                variant_label: VARIANT_LABELS[best_idx].to_string(),
                candidate_count: variants.len(),
            };

            match method {
                Method::Frequentist => {
                    let result =
                        liftcheck::analyze_frequentist(&control, &best).unwrap_or_else(|e| fail(e));
                    if json {
                        report::print_frequentist_json(&matchup, &result);
                    } else {
                        report::print_frequentist(&matchup, &result);
                    }
                }
                Method::Bayesian => {
                    let defaults = config.bayesian.params();
                    let params = BayesianParams {
                        prior_alpha: prior_alpha.unwrap_or(defaults.prior_alpha),
                        prior_beta: prior_beta.unwrap_or(defaults.prior_beta),
                        samples: samples.unwrap_or(defaults.samples),
                    };
                    let seed = seed.or(config.bayesian.seed);
                    let result = liftcheck::analyze_bayesian_seeded(&control, &best, &params, seed)
                        .unwrap_or_else(|e| fail(e));
                    if json {
                        report::print_bayesian_json(&matchup, &result, &config.verdict);
                    } else {
                        report::print_bayesian(&matchup, &result, &config.verdict);
                    }
                }
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "liftcheck", &mut std::io::stdout());
        }
    }

    info!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "completed"
    );
}

/// Config for the commands that use it; `completions` never reads a file.
fn load_config(path: Option<&Path>, disabled: bool) -> Config {
    let loaded = if disabled {
        Ok(Config::default())
    } else if let Some(path) = path {
        Config::load(path)
    } else {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Config::discover(&cwd)
    };
    loaded.unwrap_or_else(|e| fail(e))
}

/// Log to stderr so JSON on stdout stays clean. Filter via `LIFTCHECK_LOG`.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("LIFTCHECK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(err: liftcheck::Error) -> ! {
    eprintln!("error: {err}");
    std::process::exit(1);
}
