use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use testplanner_loader::{ProjectConfig, ResourceMap, ResultSet, TestplanLoader, TestplanSpec};
use testplanner_model::Testplan;
use testplanner_reconcile::{map_covergroups, reconcile, summary_row, StageProgress, TableOptions};
use testplanner_render::{OutputFormat, RenderConfig, Renderer, SummaryEntry};
use tracing::{debug, info};

/// Testplan and simulation result reporting
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Project configuration file (defaults to ./testplanner.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project root that imports and source globs are relative to
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Resource map used for documentation and source links
    #[arg(long, global = true)]
    resource_map: Option<PathBuf>,

    /// Prefix for links to source files
    #[arg(long, global = true)]
    source_url_prefix: Option<String>,

    /// Prefix for links to documentation pages
    #[arg(long, global = true)]
    docs_url_prefix: Option<String>,

    /// Output directory
    #[arg(short, long, global = true, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Write Markdown documentation for testplans
    Doc {
        /// Testplans, each optionally followed by `:tag` filters
        #[arg(required = true)]
        testplans: Vec<TestplanSpec>,

        /// Result sets used to link tests to their source, paired by position
        #[arg(long = "sim")]
        sims: Vec<PathBuf>,
    },

    /// Write a results page per testplan
    Results {
        /// Testplans, each optionally followed by `:tag` filters
        #[arg(long = "testplan", required = true)]
        testplans: Vec<TestplanSpec>,

        /// Result sets, paired with testplans by position
        #[arg(long = "sim", required = true)]
        sims: Vec<PathBuf>,

        /// Page format (md or html)
        #[arg(short, long, default_value = "md", value_parser = parse_page_format)]
        format: OutputFormat,

        /// Leave out tests that were never run
        #[arg(long)]
        hide_not_run: bool,

        /// Also export the results and progress tables as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Write results pages and a summary page linking them
    Summary {
        /// Testplans, each optionally followed by `:tag` filters
        #[arg(long = "testplan", required = true)]
        testplans: Vec<TestplanSpec>,

        /// Result sets, paired with testplans by position
        #[arg(long = "sim", required = true)]
        sims: Vec<PathBuf>,

        /// Page format (md or html)
        #[arg(short, long, default_value = "md", value_parser = parse_page_format)]
        format: OutputFormat,

        /// Summary page title
        #[arg(long, default_value = "Simulation Summary")]
        title: String,
    },

    /// Print reconciled progress figures as JSON
    Progress {
        /// Testplans, each optionally followed by `:tag` filters
        #[arg(long = "testplan", required = true)]
        testplans: Vec<TestplanSpec>,

        /// Result sets, paired with testplans by position
        #[arg(long = "sim", required = true)]
        sims: Vec<PathBuf>,
    },
}

fn parse_page_format(value: &str) -> std::result::Result<OutputFormat, String> {
    match OutputFormat::parse(value) {
        Some(OutputFormat::Csv) => Err("csv is not a page format, use --csv".to_string()),
        Some(format) => Ok(format),
        None => Err(format!("unknown format '{}', use 'md' or 'html'", value)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let config = project_config(&cli)?;

    match &cli.command {
        Commands::Doc { testplans, sims } => {
            write_docs(&config, testplans, sims, &cli.output_dir)?;
        }

        Commands::Results {
            testplans,
            sims,
            format,
            hide_not_run,
            csv,
        } => {
            let table = TableOptions {
                map_full_testplan: !hide_not_run,
            };
            let renderer = renderer(&config, *format, table)?;
            let reconciled = load_reconciled(&config, testplans, sims)?;
            write_results(&renderer, &reconciled, None, &cli.output_dir)?;
            if *csv {
                write_csv(&renderer, &reconciled, &cli.output_dir)?;
            }
        }

        Commands::Summary {
            testplans,
            sims,
            format,
            title,
        } => {
            let renderer = renderer(&config, *format, TableOptions::default())?;
            let reconciled = load_reconciled(&config, testplans, sims)?;
            write_summary(&renderer, &reconciled, title, &cli.output_dir)?;
        }

        Commands::Progress { testplans, sims } => {
            let reconciled = load_reconciled(&config, testplans, sims)?;
            print_progress(&reconciled)?;
        }
    }

    Ok(())
}

/// Project configuration with command line overrides applied
fn project_config(cli: &Cli) -> Result<ProjectConfig> {
    let mut config = match &cli.config {
        Some(path) => ProjectConfig::from_path(path)
            .with_context(|| format!("Failed to read config {:?}", path))?,
        None => ProjectConfig::discover(Path::new("."))
            .context("Failed to read project config")?
            .unwrap_or_default(),
    };

    if let Some(root) = &cli.project_root {
        config.project_root = Some(root.clone());
    }
    if let Some(map) = &cli.resource_map {
        config.resource_map = Some(map.clone());
    }
    if let Some(prefix) = &cli.source_url_prefix {
        config.source_url_prefix = Some(prefix.clone());
    }
    if let Some(prefix) = &cli.docs_url_prefix {
        config.docs_url_prefix = Some(prefix.clone());
    }
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

fn renderer(config: &ProjectConfig, format: OutputFormat, table: TableOptions) -> Result<Renderer> {
    let render_config = RenderConfig {
        project_root: config
            .project_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(".")),
        source_url_prefix: config.source_url_prefix.clone().unwrap_or_default(),
        docs_url_prefix: config.docs_url_prefix.clone().unwrap_or_default(),
        format,
        table,
    };

    let renderer = Renderer::new(render_config);
    match &config.resource_map {
        Some(path) => {
            let map = ResourceMap::from_path(path)
                .with_context(|| format!("Failed to load resource map {:?}", path))?;
            Ok(renderer.with_resource_map(map))
        }
        None => Ok(renderer),
    }
}

fn load_testplan(loader: &TestplanLoader, spec: &TestplanSpec) -> Result<Testplan> {
    loader
        .load_spec(spec)
        .with_context(|| format!("Failed to load testplan {:?}", spec.path))
}

fn load_results(path: &Path) -> Result<ResultSet> {
    ResultSet::from_path(path).with_context(|| format!("Failed to load results {:?}", path))
}

fn check_pairing(testplans: &[TestplanSpec], sims: &[PathBuf]) -> Result<()> {
    if testplans.len() != sims.len() {
        bail!(
            "Got {} testplans and {} result sets; they are paired by position",
            testplans.len(),
            sims.len()
        );
    }
    Ok(())
}

/// Load each testplan and reconcile it with the result set at the same position
fn load_reconciled(
    config: &ProjectConfig,
    testplans: &[TestplanSpec],
    sims: &[PathBuf],
) -> Result<Vec<(Testplan, ResultSet)>> {
    check_pairing(testplans, sims)?;
    let loader = TestplanLoader::new(config.loader_config());

    testplans
        .iter()
        .zip(sims)
        .map(|(spec, sim)| {
            let mut plan = load_testplan(&loader, spec)?;
            let results = load_results(sim)?;
            reconcile(&mut plan, results.test_results.clone())
                .with_context(|| format!("Failed to reconcile {} with {:?}", plan.name, sim))?;
            map_covergroups(&mut plan, &results.covergroups);
            Ok((plan, results))
        })
        .collect()
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))?;
    info!("Wrote {:?}", path);
    println!("📄 Output: {:?}", path);
    Ok(())
}

fn write_docs(
    config: &ProjectConfig,
    testplans: &[TestplanSpec],
    sims: &[PathBuf],
    output_dir: &Path,
) -> Result<()> {
    if !sims.is_empty() {
        check_pairing(testplans, sims)?;
    }
    let loader = TestplanLoader::new(config.loader_config());
    let renderer = renderer(config, OutputFormat::Markdown, TableOptions::default())?;

    for (i, spec) in testplans.iter().enumerate() {
        let plan = load_testplan(&loader, spec)?;
        let results = sims.get(i).map(|path| load_results(path)).transpose()?;
        let doc = renderer.testplan_doc(&plan, results.as_ref())?;
        write_output(&output_dir.join(format!("{}_testplan.md", plan.name)), &doc)?;
    }
    Ok(())
}

fn results_file_name(plan: &Testplan, format: OutputFormat) -> String {
    format!("{}_results.{}", plan.name, format.extension())
}

fn write_results(
    renderer: &Renderer,
    reconciled: &[(Testplan, ResultSet)],
    summary_link: Option<&str>,
    output_dir: &Path,
) -> Result<()> {
    let format = renderer.config().format;
    for (plan, results) in reconciled {
        let page = renderer
            .results_page(plan, results, summary_link)
            .with_context(|| format!("Failed to render results of {}", plan.name))?;
        write_output(&output_dir.join(results_file_name(plan, format)), &page)?;
    }
    Ok(())
}

fn create_output(path: &Path) -> Result<fs::File> {
    let file = fs::File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    info!("Writing {:?}", path);
    println!("📄 Output: {:?}", path);
    Ok(file)
}

/// Export the results and progress tables of each testplan as CSV
fn write_csv(
    renderer: &Renderer,
    reconciled: &[(Testplan, ResultSet)],
    output_dir: &Path,
) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory {:?}", output_dir))?;
    for (plan, _) in reconciled {
        let path = output_dir.join(results_file_name(plan, OutputFormat::Csv));
        renderer.write_results_csv(plan, create_output(&path)?)?;

        let path = output_dir.join(format!("{}_progress.csv", plan.name));
        renderer.write_progress_csv(plan, create_output(&path)?)?;
    }
    Ok(())
}

fn write_summary(
    renderer: &Renderer,
    reconciled: &[(Testplan, ResultSet)],
    title: &str,
    output_dir: &Path,
) -> Result<()> {
    let format = renderer.config().format;
    let summary_name = format!("summary.{}", format.extension());
    write_results(renderer, reconciled, Some(&summary_name), output_dir)?;

    let mut stages = StageProgress::new();
    let mut entries = Vec::with_capacity(reconciled.len());
    for (plan, _) in reconciled {
        stages.update(plan)?;
        entries.push(SummaryEntry {
            row: summary_row(plan)?,
            link: Some(results_file_name(plan, format)),
        });
    }

    let page = renderer.summary_page(title, &entries, &stages)?;
    write_output(&output_dir.join(summary_name), &page)
}

fn print_progress(reconciled: &[(Testplan, ResultSet)]) -> Result<()> {
    let mut stages = StageProgress::new();
    let mut testplans = serde_json::Map::new();
    for (plan, _) in reconciled {
        stages.update(plan)?;
        testplans.insert(plan.name.clone(), serde_json::to_value(&plan.progress)?);
    }

    let report = json!({
        "testplans": testplans,
        "stages": stages,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
