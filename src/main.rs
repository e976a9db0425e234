use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ppm_tool_finder::bumpers::{BumperCoordinator, BumperKind, JsonFileStore};
use ppm_tool_finder::catalog::{Catalog, Criterion, RatingAssignment};
use ppm_tool_finder::clock::{millis, Clock, ManualClock, SystemClock};
use ppm_tool_finder::config::{Config, ConfigOverrides};
use ppm_tool_finder::filter::{filter_catalog, filter_ranked, FilterCondition, FilterMode};
use ppm_tool_finder::guided::{default_questions, GuidedRankingFlow};
use ppm_tool_finder::output::csv::{
    bumper_status_to_csv, comparison_to_csv, ranking_to_csv, tools_to_csv,
};
use ppm_tool_finder::output::json::{render_json, render_json_lines};
use ppm_tool_finder::output::table::{
    render_bumper_status_table, render_comparison_table, render_criteria_table,
    render_ranking_table, render_rating_changes_table, render_tools_table,
};
use ppm_tool_finder::scoring::{compare_tools, rank_tools, ranked_ids, RankedTool};
use ppm_tool_finder::server::run_server;
use ppm_tool_finder::shuffle::{OrderWatcher, ShuffleCoordinator, ShuffleSettings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "ppm-finder",
    about = "Rank project portfolio management tools against weighted criteria"
)]
struct Cli {
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// JSON catalog to use instead of the built-in one.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    output: OutputFormat,
    /// Criterion importance, e.g. `--rating scalability=4`. Repeatable.
    #[arg(short, long = "rating", global = true)]
    ratings: Vec<RatingAssignment>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args, Clone, Default)]
struct FilterArgs {
    /// Keep tools tagged with this methodology. Repeatable.
    #[arg(short, long = "methodology")]
    methodologies: Vec<String>,
    /// Criterion condition such as `reporting>=4`. Repeatable.
    #[arg(short = 'w', long = "where")]
    conditions: Vec<String>,
    /// How conditions combine: and | or.
    #[arg(long, default_value = "and")]
    mode: FilterMode,
}

impl FilterArgs {
    fn conditions(&self) -> Result<Vec<FilterCondition>> {
        let mut out = self
            .methodologies
            .iter()
            .enumerate()
            .map(|(idx, name)| FilterCondition::methodology(format!("methodology-{idx}"), name))
            .collect::<Vec<_>>();
        for (idx, expression) in self.conditions.iter().enumerate() {
            let condition =
                FilterCondition::parse_criteria_expression(format!("criteria-{idx}"), expression)
                    .with_context(|| format!("invalid filter condition: {expression}"))?;
            out.push(condition);
        }
        Ok(out)
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the catalog with per-criterion ratings.
    Tools,
    /// Show criteria with their effective importance.
    Criteria,
    /// Rank every tool by match score.
    Rank {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        top: Option<usize>,
    },
    /// Narrow the catalog without ranking it.
    Filter {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Side-by-side criterion breakdown for the named tools.
    Compare {
        #[arg(required = true)]
        tools: Vec<String>,
    },
    /// Answer the guided questionnaire to set criterion importance.
    Guided {
        /// `question=answer` with answers 1 through 5. Repeatable.
        #[arg(short, long = "answer")]
        answers: Vec<String>,
        /// Print the questions and exit.
        #[arg(long)]
        list: bool,
    },
    /// Inspect or change persisted nudge state.
    Bumpers {
        #[command(subcommand)]
        action: BumperAction,
    },
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[derive(Debug, Subcommand)]
enum BumperAction {
    Status {
        /// Seconds of page presence to assume when evaluating gates.
        #[arg(long, default_value_t = 0)]
        presence_secs: i64,
    },
    Dismiss {
        bumper: BumperKind,
    },
    Reset,
    Check {
        bumper: BumperKind,
        #[arg(long, default_value_t = 0)]
        presence_secs: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        catalog_path: cli.catalog.clone(),
        ratings: cli.ratings.clone(),
    });
    init_logging(&config.logging.level)?;

    if let Commands::Config { init, show } = &cli.command {
        return handle_config_command(*init, *show, &config, &config_path);
    }

    let catalog = Catalog::load_or_default(config.resolved_catalog_path().as_deref())?;
    let criteria = catalog.criteria_with(&config.rating_assignments())?;

    match &cli.command {
        Commands::Tools => print_tools(&catalog, cli.output)?,
        Commands::Criteria => print_criteria(&criteria, cli.output)?,
        Commands::Rank { filter, top } => {
            let ranked = rank_tools(&catalog, &criteria);
            let mut ranked = filter_ranked(&catalog, &ranked, &filter.conditions()?, filter.mode);
            if let Some(top) = top {
                ranked.truncate(*top);
            }
            print_ranking(&ranked, cli.output)?;
        }
        Commands::Filter { filter } => {
            let tools = filter_catalog(&catalog, &filter.conditions()?, filter.mode)
                .into_iter()
                .cloned()
                .collect::<Vec<_>>();
            info!("{} of {} tools match", tools.len(), catalog.tools().len());
            print_tools(&Catalog::new(tools, criteria), cli.output)?;
        }
        Commands::Compare { tools } => {
            let breakdowns = compare_tools(&catalog, tools, &criteria)?;
            match cli.output {
                OutputFormat::Table => println!("{}", render_comparison_table(&breakdowns)),
                OutputFormat::Json => println!("{}", render_json(&breakdowns)?),
                OutputFormat::Csv => println!("{}", comparison_to_csv(&breakdowns)?),
            }
        }
        Commands::Guided { answers, list } => {
            if *list {
                println!("{}", render_json(&default_questions())?);
                return Ok(());
            }
            run_guided(&config, &catalog, &criteria, answers, cli.output).await?;
        }
        Commands::Bumpers { action } => handle_bumpers(action, &config, cli.output)?,
        Commands::Serve { host, port } => {
            let host = host.clone().unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let bind = format!("{host}:{port}");
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
            run_server(config, catalog, addr).await?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level/filter: {level}"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed installing log subscriber: {e}"))
}

fn handle_config_command(init: bool, show: bool, config: &Config, config_path: &Path) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn open_coordinator(config: &Config, clock: Arc<dyn Clock>) -> Result<BumperCoordinator> {
    let path = config.resolved_state_path();
    let store = JsonFileStore::open(&path)
        .with_context(|| format!("failed opening state store: {}", path.display()))?;
    Ok(BumperCoordinator::new(
        Arc::new(store),
        clock,
        config.bumpers.clone(),
    ))
}

/// Coordinator whose session began `presence_secs` ago.
fn coordinator_with_presence(config: &Config, presence_secs: i64) -> Result<BumperCoordinator> {
    let clock = ManualClock::new(SystemClock.now());
    let coordinator = open_coordinator(config, Arc::new(clock.clone()))?;
    let presence_ms = u64::try_from(presence_secs).unwrap_or(0).saturating_mul(1_000);
    clock.advance(millis(presence_ms));
    Ok(coordinator)
}

fn handle_bumpers(action: &BumperAction, config: &Config, format: OutputFormat) -> Result<()> {
    match action {
        BumperAction::Status { presence_secs } => {
            let coordinator = coordinator_with_presence(config, *presence_secs)?;
            let status = coordinator.status();
            match format {
                OutputFormat::Table => println!("{}", render_bumper_status_table(&status)),
                OutputFormat::Json => println!("{}", render_json(&status)?),
                OutputFormat::Csv => println!("{}", bumper_status_to_csv(&status)?),
            }
        }
        BumperAction::Dismiss { bumper } => {
            let mut coordinator = open_coordinator(config, Arc::new(SystemClock))?;
            coordinator.dismiss(*bumper);
            println!("{bumper} dismissed");
        }
        BumperAction::Reset => {
            let mut coordinator = open_coordinator(config, Arc::new(SystemClock))?;
            coordinator.reset();
            println!("Bumper state cleared");
        }
        BumperAction::Check {
            bumper,
            presence_secs,
        } => {
            let coordinator = coordinator_with_presence(config, *presence_secs)?;
            match coordinator.check(*bumper) {
                Ok(()) => println!("{bumper}: can show"),
                Err(reason) => println!("{bumper}: blocked ({reason})"),
            }
        }
    }
    Ok(())
}

fn parse_answers(raw: &[String]) -> Result<BTreeMap<String, u8>> {
    let mut answers = BTreeMap::new();
    for entry in raw {
        let (question, answer) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("expected <question>=<answer>, got: {entry}"))?;
        let answer = answer
            .trim()
            .parse::<u8>()
            .with_context(|| format!("answer must be a number in: {entry}"))?;
        answers.insert(question.trim().to_string(), answer);
    }
    Ok(answers)
}

async fn run_guided(
    config: &Config,
    catalog: &Catalog,
    criteria: &[Criterion],
    raw_answers: &[String],
    format: OutputFormat,
) -> Result<()> {
    let answers = parse_answers(raw_answers)?;
    if answers.is_empty() {
        bail!("no answers given; use --list to see the questions");
    }
    let before = rank_tools(catalog, criteria);

    let mut coordinator = open_coordinator(config, Arc::new(SystemClock))?;
    let mut flow = GuidedRankingFlow::open(&mut coordinator, default_questions());
    for (question, answer) in &answers {
        flow.answer(question, *answer)?;
    }
    let outcome = flow.complete(criteria)?;
    let after = rank_tools(catalog, &outcome.criteria);
    animate_reorder(&before, &after, &config.shuffle).await;

    match format {
        OutputFormat::Table => {
            println!("{}", render_rating_changes_table(&outcome.changes));
            println!("{}", render_ranking_table(&after));
        }
        OutputFormat::Json => println!("{}", render_json(&outcome)?),
        OutputFormat::Csv => println!("{}", ranking_to_csv(&after)?),
    }
    Ok(())
}

/// Plays the shuffle state machine against the wall clock when the ranking
/// order changed, logging each phase.
async fn animate_reorder(before: &[RankedTool], after: &[RankedTool], settings: &ShuffleSettings) {
    let mut watcher = OrderWatcher::new();
    let mut shuffle = ShuffleCoordinator::new(Arc::new(SystemClock), settings.clone());
    watcher.observe(&ranked_ids(before));
    if watcher
        .observe_and_trigger(&ranked_ids(after), &mut shuffle)
        .is_none()
    {
        return;
    }

    while let Some(deadline) = shuffle.next_deadline() {
        let wait = (deadline - SystemClock.now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        tokio::time::sleep(wait).await;
        let events = shuffle.tick();
        match render_json_lines(&events) {
            Ok(lines) if !lines.is_empty() => info!("shuffle: {lines}"),
            Ok(_) => {}
            Err(err) => warn!("failed encoding shuffle events: {err}"),
        }
    }
    shuffle.dispose();
}

fn print_tools(catalog: &Catalog, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_tools_table(catalog)),
        OutputFormat::Json => println!("{}", render_json(catalog.tools())?),
        OutputFormat::Csv => println!("{}", tools_to_csv(catalog)?),
    }
    Ok(())
}

fn print_criteria(criteria: &[Criterion], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_criteria_table(criteria)),
        OutputFormat::Json => println!("{}", render_json(criteria)?),
        OutputFormat::Csv => {
            warn!("CSV output for criteria not implemented, using JSON");
            println!("{}", render_json(criteria)?);
        }
    }
    Ok(())
}

fn print_ranking(ranked: &[RankedTool], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_ranking_table(ranked)),
        OutputFormat::Json => println!("{}", render_json(ranked)?),
        OutputFormat::Csv => println!("{}", ranking_to_csv(ranked)?),
    }
    Ok(())
}
