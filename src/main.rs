mod cli;

use addenda::{
    cfdi::CfdiParser,
    template::{ContextBuilder, ResolveMode, Resolver, TemplateRenderer},
    xsd::{SchemaState, XsdValidator},
    AddendaConfig, AddendaGenerator, AddendaTemplate, AddendaType, GenerationRequest,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use std::{collections::BTreeMap, fs, path::Path};
use tracing_subscriber::EnvFilter;

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_fields(path: Option<&Path>) -> Result<BTreeMap<String, String>> {
    match path {
        Some(path) => serde_json::from_str(&read(path)?)
            .with_context(|| format!("{} is not a JSON object of strings", path.display())),
        None => Ok(BTreeMap::new()),
    }
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => AddendaConfig::from_file(path)?,
        None => AddendaConfig::default(),
    };

    match cli.command {
        Command::Render(args) => {
            let mut builder = ContextBuilder::new()
                .system_time(chrono::Local::now().naive_local())
                .fields(read_fields(args.fields.as_deref())?);
            if let Some(cfdi) = &args.cfdi {
                let document = CfdiParser::new(config.parser.clone()).parse(&read(cfdi)?)?;
                builder = builder
                    .cfdi_data(document.extract_data())
                    .conceptos(serde_json::to_value(document.line_items())?);
            }
            let mode = if args.strict {
                ResolveMode::Strict
            } else {
                config.render.mode
            };
            let mut renderer = TemplateRenderer::new(Resolver::new(mode))
                .with_parse_options(config.parser.parse_options());
            if let Some(namespace) = args.namespace {
                renderer = renderer.with_namespace(namespace);
            }
            let xml = renderer.render(&read(&args.template)?, &builder.build())?;
            println!("{xml}");
        }
        Command::Validate(args) => {
            let state = SchemaState::compile_with_options(
                &read(&args.schema)?,
                config.parser.parse_options(),
            );
            let mut all_valid = true;
            for path in &args.documents {
                let report = state.create_validation_report(&read(path)?, args.schema_info);
                all_valid &= report.valid;
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    continue;
                }
                let verdict = if report.valid { "valid" } else { "invalid" };
                println!("{}: {verdict}", path.display());
                for error in &report.errors {
                    println!("  error: {error}");
                }
                for warning in &report.warnings {
                    println!("  warning: {warning}");
                }
                for suggestion in report.suggestions.iter().flatten() {
                    println!("  suggestion: {suggestion}");
                }
            }
            if !all_valid {
                bail!("validation failed");
            }
        }
        Command::Insert(args) => {
            let parser = CfdiParser::new(config.parser.clone());
            let xml = parser.insert(&read(&args.cfdi)?, &read(&args.addenda)?)?;
            write_output(args.output.as_deref(), &xml)?;
        }
        Command::Extract(args) => {
            let document = CfdiParser::new(config.parser.clone()).parse(&read(&args.cfdi)?)?;
            let mut json = serde_json::json!({ "data": document.extract_data() });
            if args.items {
                json["items"] = serde_json::to_value(document.line_items())?;
            }
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Command::SchemaInfo(args) => {
            let validator =
                XsdValidator::with_options(&read(&args.schema)?, config.parser.parse_options())?;
            println!("{}", serde_json::to_string_pretty(validator.schema_info())?);
        }
        Command::Generate(args) => {
            let addenda_type: AddendaType = serde_json::from_str(&read(&args.addenda_type)?)
                .with_context(|| format!("invalid addenda type {}", args.addenda_type.display()))?;
            let template = AddendaTemplate {
                name: args.template.display().to_string(),
                addenda_type: addenda_type.id.clone(),
                content: read(&args.template)?,
                is_default: true,
            };
            let mut config = config;
            if let Some(policy) = args.policy {
                config.validation.policy = policy;
            }

            let cfdi = read(&args.cfdi)?;
            let request = GenerationRequest::new(&cfdi, &addenda_type, &template)
                .with_fields(read_fields(args.fields.as_deref())?);
            let outcome = AddendaGenerator::new(config).generate(&request)?;
            if let Some(report) = outcome.report.as_ref().filter(|r| !r.valid) {
                for error in &report.errors {
                    eprintln!("warning: addenda {error}");
                }
            }
            write_output(args.output.as_deref(), &outcome.cfdi_xml)?;
        }
    }
    Ok(())
}
