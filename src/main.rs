//! # Itemforge Command Line
//!
//! Imports, validates and generates item batches against runtime profiles.

use clap::{Parser, Subcommand};
use itemforge::{
    load_profile, parse_object_fragment, split_top_level_objects, validate_record, DynamicRecord,
    ForgeError, ForgeResult, ImportReport, InMemoryAssetStore, ItemIdentity, PipelineContext,
    PipelineSettings, ProfileRegistry, ValidationMode,
};
use log::{error, info};
use std::path::PathBuf;

/// Command line arguments for Itemforge.
#[derive(Parser, Debug)]
#[command(name = "itemforge")]
#[command(about = "Profile-driven import and validation of generated game items")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Settings file
    #[arg(long, default_value = itemforge::config::DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Override the profile directory
    #[arg(long)]
    profiles_dir: Option<PathBuf>,

    /// Override the asset output root
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Override the validation mode (off, warn, strict)
    #[arg(long, value_parser = parse_validation_mode)]
    validation: Option<ValidationMode>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a generator output file
    Import {
        json: PathBuf,
        #[arg(long)]
        profile: String,
        /// Item type; defaults to the profile's item type
        #[arg(long, default_value = "")]
        item_type: String,
        /// Import into memory only
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a generator output file without writing anything
    Validate {
        json: PathBuf,
        #[arg(long)]
        profile: String,
    },
    /// Check a profile file for structural problems
    Profile { path: PathBuf },
    /// Run the generator and import its output
    Generate {
        #[arg(long)]
        item_type: String,
        #[arg(long)]
        profile: String,
        #[arg(long)]
        count: Option<u32>,
        #[arg(long)]
        model: Option<String>,
    },
    /// List imported items of one type
    List {
        #[arg(long)]
        item_type: String,
    },
}

fn parse_validation_mode(value: &str) -> Result<ValidationMode, String> {
    match value.to_lowercase().as_str() {
        "off" => Ok(ValidationMode::Off),
        "warn" => Ok(ValidationMode::Warn),
        "strict" => Ok(ValidationMode::Strict),
        other => Err(format!("unknown validation mode '{}'", other)),
    }
}

#[tokio::main]
async fn main() -> ForgeResult<()> {
    let args = Args::parse();

    initialize_logging(&args.log_level);
    info!("Starting Itemforge v{}", itemforge::VERSION);

    let settings = load_settings(&args)?;

    let result = match args.command {
        Command::Import {
            json,
            profile,
            item_type,
            dry_run,
        } => run_import(settings, json, &profile, &item_type, dry_run),
        Command::Validate { json, profile } => run_validate(&settings, json, &profile),
        Command::Profile { path } => run_profile_check(path),
        Command::Generate {
            item_type,
            profile,
            count,
            model,
        } => run_generate(settings, &item_type, &profile, count, model.as_deref()).await,
        Command::List { item_type } => run_list(settings, &item_type),
    };

    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

/// Initializes `env_logger`; `RUST_LOG` takes precedence over `log_level`.
fn initialize_logging(log_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_target(false)
        .init();
}

fn load_settings(args: &Args) -> ForgeResult<PipelineSettings> {
    let mut settings = PipelineSettings::load(&args.settings)?;
    if let Some(dir) = &args.profiles_dir {
        settings.profiles_dir = dir.clone();
    }
    if let Some(root) = &args.output_root {
        settings.output_root = root.clone();
    }
    if let Some(mode) = args.validation {
        settings.validation = mode;
    }
    Ok(settings)
}

fn run_import(
    settings: PipelineSettings,
    json: PathBuf,
    profile_id: &str,
    item_type: &str,
    dry_run: bool,
) -> ForgeResult<()> {
    let report = if dry_run {
        let profiles = ProfileRegistry::load_dir(&settings.profiles_dir)?;
        let mut ctx = PipelineContext::new(settings, profiles, InMemoryAssetStore::new());
        ctx.import_from_json(&json, profile_id, item_type)?
    } else {
        let mut ctx = PipelineContext::from_settings(settings)?;
        ctx.import_from_json(&json, profile_id, item_type)?
    };

    print_report(&report, dry_run);
    Ok(())
}

fn print_report(report: &ImportReport, dry_run: bool) {
    println!(
        "{} {} {} item(s) (batch {})",
        if dry_run { "Would import" } else { "Imported" },
        report.imported_count(),
        report.item_type_name,
        report.batch_id
    );
    for skipped in &report.skipped {
        println!("  skipped {}", skipped);
    }
    for issue in &report.issues {
        println!("  '{}' {}", issue.id, issue.issue);
    }
}

fn run_validate(settings: &PipelineSettings, json: PathBuf, profile_id: &str) -> ForgeResult<()> {
    let profiles = ProfileRegistry::load_dir(&settings.profiles_dir)?;
    let profile = profiles.require(profile_id)?;

    if !json.is_file() {
        return Err(ForgeError::FileNotFound(json));
    }
    let text = std::fs::read_to_string(&json)?;

    let mut clean = 0;
    for (index, fragment) in split_top_level_objects(&text).iter().enumerate() {
        let record = match DynamicRecord::build(
            parse_object_fragment(fragment),
            &profile.id,
            &profile.item_type_name,
        ) {
            Ok(record) => record,
            Err(e) => {
                println!("#{}: {}", index, e);
                continue;
            }
        };

        let issues = validate_record(profile, &record);
        if issues.is_empty() {
            clean += 1;
        }
        for issue in issues {
            println!("#{} '{}': {}", index, record.id(), issue);
        }
    }

    println!("{} record(s) passed validation", clean);
    Ok(())
}

fn run_profile_check(path: PathBuf) -> ForgeResult<()> {
    let profile = load_profile(&path)?;
    let problems = profile.check_invariants();

    println!(
        "Profile '{}' ({}) for {}: {} field(s)",
        profile.id,
        profile.display_name,
        profile.item_type_name,
        profile.fields.len()
    );
    if problems.is_empty() {
        println!("No problems found");
        return Ok(());
    }

    for problem in &problems {
        println!("  {}", problem);
    }
    Err(ForgeError::InvalidProfile(format!(
        "{} problem(s) in {}",
        problems.len(),
        path.display()
    )))
}

async fn run_generate(
    settings: PipelineSettings,
    item_type: &str,
    profile_id: &str,
    count: Option<u32>,
    model: Option<&str>,
) -> ForgeResult<()> {
    let mut ctx = PipelineContext::from_settings(settings)?;
    let request = ctx.generation_request(item_type, profile_id, count, model);

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let report = ctx.generate_and_import(&request, cancel).await?;
    print_report(&report, false);
    Ok(())
}

fn run_list(settings: PipelineSettings, item_type: &str) -> ForgeResult<()> {
    let ctx = PipelineContext::from_settings(settings)?;
    let items = ctx.list_items(item_type)?;

    for item in &items {
        println!("{}\t{}\t{}", item.id(), item.display_name(), item.rarity());
    }
    println!("{} {} item(s)", items.len(), item_type);
    Ok(())
}
