use anyhow::{bail, Context};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use model_transform::{
    descriptor::SubsystemDescriptor,
    diagnose, document,
    reporter::{ReportFormat, TransformationReporter},
    subsystem, validate_instance, ResourceSchema, SchemaVersion, TransformFailure, TransformationEngine,
    TransformationRegistry,
};

#[derive(Parser, Debug)]
#[command(name = "model-transform")]
#[command(about = "Transform a subsystem resource tree for a legacy management model version")]
struct Args {
    /// Path to the resource tree (YAML) to transform
    instance_file: PathBuf,

    /// Model version of the legacy peer (e.g., 1.1.0)
    #[arg(long, value_name = "VERSION")]
    target_version: SchemaVersion,

    /// Subsystem descriptor (YAML); the built-in cluster-transport subsystem is used if omitted
    #[arg(long, value_name = "FILE")]
    descriptor: Option<PathBuf>,

    /// Where to write the transformed tree; stdout if omitted
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    format: ReportFormat,

    /// List every rejection in the tree instead of stopping at the first
    #[arg(long)]
    diagnose: bool,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let mut builder = TransformationRegistry::builder();
    let (subsystem_name, schema): (String, ResourceSchema) = match &args.descriptor {
        Some(path) => {
            let descriptor = SubsystemDescriptor::load(path)?;
            let schema = descriptor.register(&mut builder)?;
            (descriptor.subsystem, schema)
        }
        None => {
            let schema = subsystem::initialize(&mut builder)?;
            (subsystem::SUBSYSTEM_NAME.to_string(), schema)
        }
    };
    let engine = TransformationEngine::new(builder.publish());

    let raw = fs::read_to_string(&args.instance_file)
        .with_context(|| format!("Failed to read {}", args.instance_file.display()))?;
    let instance = document::parse_instance(&raw)
        .with_context(|| format!("Failed to parse {}", args.instance_file.display()))?;
    info!(subsystem = %subsystem_name, resources = instance.size(), "Loaded resource tree");

    let validation = validate_instance(&schema, &instance);
    for warning in &validation.warnings {
        eprintln!("  ⚠ {}: {}", warning.path, warning.message);
    }
    if validation.has_errors() {
        for error in &validation.errors {
            eprintln!("  ✗ {}: {}", error.path, error.message);
        }
        bail!("{} does not match the current {} schema", args.instance_file.display(), subsystem_name);
    }

    let reporter = TransformationReporter::new().with_format(args.format);

    if args.diagnose {
        let failures = match engine.registry().lookup(&subsystem_name, &args.target_version) {
            Some(rule_set) => diagnose(&instance, &rule_set),
            None => Vec::new(),
        };
        debug!(failures = failures.len(), "Diagnosis complete");
        if !failures.is_empty() {
            let report = reporter.generate_failure_report(&subsystem_name, args.target_version, &instance, &failures);
            println!("{}", reporter.format_report(&report)?);
            return Ok(ExitCode::from(2));
        }
    }

    match engine.transform_for(&subsystem_name, &args.target_version, &instance) {
        Ok(result) => {
            let rendered = document::render_instance(&result.transformed)?;
            match &args.output {
                Some(path) => fs::write(path, rendered)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", rendered),
            }
            let report = reporter.generate_report(&instance, &result);
            eprintln!("{}", reporter.format_report(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(failure @ TransformFailure::UnknownSubsystem(_)) => Err(failure.into()),
        Err(failure) => {
            let report = reporter.generate_failure_report(
                &subsystem_name,
                args.target_version,
                &instance,
                std::slice::from_ref(&failure),
            );
            eprintln!("{}", reporter.format_report(&report)?);
            Ok(ExitCode::from(2))
        }
    }
}
