use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use hb_generator::{generate_configs, GenerationPolicy, SearchSpace, SpaceRenderer};
use hb_plan::{unit_time_for, HbSearch, SearchParams};
use hb_status::SearchStatus;
use hb_writer::{SearchWriter, TemplateNames, TemplateSet, WriterOptions};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Search space looked up next to the templates when `--space` is not given.
const SPACE_FILE: &str = "space.json";

#[derive(Parser, Debug)]
#[command(name = "hyperband", about = "Plan, materialize and track hyperband searches")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute a search plan and optionally write its configuration tree.
    Generate(GenerateArgs),
    /// Report the progress of a materialized search.
    Status(StatusArgs),
}

#[derive(ClapArgs, Debug)]
struct GenerateArgs {
    /// Maximum bracket index; the search has SMAX + 1 brackets.
    #[arg(value_name = "SMAX")]
    s_max: u32,
    /// Reduction factor between stages.
    #[arg(value_name = "ETA")]
    eta: u32,
    /// Cost of one epoch on the full dataset, used for cost estimates.
    #[arg(short = 't', long)]
    cost_one_epoch_full_dataset: Option<f64>,
    /// Cross-validation repetitions.
    #[arg(short = 'r', long, default_value_t = 1)]
    repetitions: u32,
    /// Cross-validation folds.
    #[arg(short = 'k', long, default_value_t = 5)]
    folds: u32,
    /// Seed for configuration sampling; entropy when omitted.
    #[arg(long)]
    random_seed: Option<u64>,
    /// Budget added to every stage on top of the computed one.
    #[arg(long, default_value_t = 0)]
    guaranteed_budget: u64,
    /// Directory to write the search into.
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,
    /// Replace files that already exist.
    #[arg(long)]
    overwrite: bool,
    /// Directory holding the templates and support files.
    #[arg(long)]
    template_dir: Option<PathBuf>,
    #[arg(long, default_value = "config")]
    config_template: String,
    #[arg(long, default_value = "run.sh")]
    run_template: String,
    #[arg(long, default_value = "Snakefile")]
    snakefile_template: String,
    /// JSON search-space definition.
    #[arg(long)]
    space: Option<PathBuf>,
    /// Only keep these brackets (repeatable).
    #[arg(short = 'b', long = "bracket")]
    brackets: Vec<u32>,
    /// Cap every bracket at this stage index.
    #[arg(long)]
    last_stage: Option<u32>,
    /// Consecutive duplicate draws tolerated before giving up.
    #[arg(long, default_value_t = hb_generator::DEFAULT_MAX_RETRIES)]
    max_retries: u32,
}

#[derive(ClapArgs, Debug)]
struct StatusArgs {
    /// Directory written by `hyperband generate`.
    #[arg(value_name = "SEARCH_DIR")]
    search_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Status(args) => run_status(&args),
    }
}

fn search_params(args: &GenerateArgs) -> SearchParams {
    let unit_time = unit_time_for(args.cost_one_epoch_full_dataset, args.folds, args.repetitions);
    let mut params = SearchParams::new(args.s_max, args.eta)
        .with_unit_time(unit_time)
        .with_guaranteed_budget(args.guaranteed_budget)
        .with_cross_validation(args.folds, args.repetitions);
    if !args.brackets.is_empty() {
        params = params.with_brackets(args.brackets.clone());
    }
    if let Some(stage) = args.last_stage {
        params = params.with_last_stage(stage);
    }
    params
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let search = HbSearch::new(&search_params(&args)).context("invalid search parameters")?;
    print!("{search}");

    let Some(output_dir) = &args.output_dir else {
        println!("Not saving configurations (specify target directory with --output-dir)");
        return Ok(());
    };

    let names = TemplateNames {
        config: args.config_template.clone(),
        run: args.run_template.clone(),
        snakefile: args.snakefile_template.clone(),
    };
    let (templates, options) = match &args.template_dir {
        Some(dir) => (
            TemplateSet::load(dir, &names)
                .with_context(|| format!("loading templates from {}", dir.display()))?,
            WriterOptions::default().with_template_dir(dir, names),
        ),
        None => (TemplateSet::builtin(), WriterOptions::default()),
    };
    let options = options.with_overwrite(args.overwrite);

    let space = load_space(args.space.as_deref(), args.template_dir.as_deref())?;
    let mut renderer = SpaceRenderer::new(space)?;
    if let Some(template) = templates.config.clone() {
        renderer = renderer.with_template(template);
    }

    let mut rng = match args.random_seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let policy = GenerationPolicy::default().with_max_retries(args.max_retries);
    let configs = generate_configs(&search, &renderer, &mut rng, &policy)
        .context("generating configurations")?;

    println!("{}", saving_message(output_dir));
    let report = SearchWriter::new(templates, options)
        .write_search(&search, &configs, output_dir)
        .with_context(|| format!("writing search to {}", output_dir.display()))?;
    debug!("{:?}", report);
    Ok(())
}

fn saving_message(output_dir: &Path) -> String {
    format!("Saving random configurations to {}", output_dir.display())
}

/// `--space` first, then `space.json` in the template directory, then the
/// built-in space.
fn load_space(explicit: Option<&Path>, template_dir: Option<&Path>) -> Result<SearchSpace> {
    if let Some(path) = explicit {
        return SearchSpace::from_file(path)
            .with_context(|| format!("loading search space {}", path.display()));
    }
    if let Some(path) = template_dir.map(|dir| dir.join(SPACE_FILE)) {
        if path.is_file() {
            debug!("Using search space {}", path.display());
            return SearchSpace::from_file(&path)
                .with_context(|| format!("loading search space {}", path.display()));
        }
    }
    Ok(SearchSpace::builtin())
}

fn run_status(args: &StatusArgs) -> Result<()> {
    let status = SearchStatus::scan(&args.search_dir)
        .with_context(|| format!("reading status of {}", args.search_dir.display()))?;
    print!("{status}");
    Ok(())
}
