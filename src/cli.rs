use addenda::ValidationPolicy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[clap(version, about)]
pub struct Cli {
    #[clap(long, global = true, help = "Configuration file (TOML)")]
    pub config: Option<PathBuf>,

    #[clap(short, long, global = true, action = clap::ArgAction::Count, help = "More logging, repeat for more")]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render a template against field values and, optionally, a CFDI
    Render(RenderArgs),
    /// Validate XML documents against an XSD schema
    Validate(ValidateArgs),
    /// Insert a rendered addenda into a CFDI
    Insert(InsertArgs),
    /// Print the data extracted from a CFDI as JSON
    Extract(ExtractArgs),
    /// Describe the declarations of an XSD schema as JSON
    SchemaInfo(SchemaInfoArgs),
    /// Render, validate and insert in one go
    Generate(GenerateArgs),
}

#[derive(Args)]
pub struct RenderArgs {
    #[clap(value_parser, help = "The template file")]
    pub template: PathBuf,

    #[clap(long, help = "JSON object with field values")]
    pub fields: Option<PathBuf>,

    #[clap(long, help = "CFDI whose data is made available to the template")]
    pub cfdi: Option<PathBuf>,

    #[clap(long, help = "Namespace URI set on the addenda root element")]
    pub namespace: Option<String>,

    #[clap(long, help = "Fail on unresolved variables instead of rendering them empty")]
    pub strict: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    #[clap(long, value_parser, help = "The XSD schema")]
    pub schema: PathBuf,

    #[clap(value_parser, required = true, help = "XML documents to validate")]
    pub documents: Vec<PathBuf>,

    #[clap(long, help = "Print the reports as JSON")]
    pub json: bool,

    #[clap(long, help = "Include the schema description in JSON reports")]
    pub schema_info: bool,
}

#[derive(Args)]
pub struct InsertArgs {
    #[clap(value_parser, help = "The signed CFDI")]
    pub cfdi: PathBuf,

    #[clap(value_parser, help = "The rendered addenda")]
    pub addenda: PathBuf,

    #[clap(short, long, help = "Write the result here instead of stdout")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ExtractArgs {
    #[clap(value_parser, help = "The signed CFDI")]
    pub cfdi: PathBuf,

    #[clap(long, help = "Also print every line item with its taxes")]
    pub items: bool,
}

#[derive(Args)]
pub struct SchemaInfoArgs {
    #[clap(value_parser, help = "The XSD schema")]
    pub schema: PathBuf,
}

#[derive(Args)]
pub struct GenerateArgs {
    #[clap(value_parser, help = "The signed CFDI")]
    pub cfdi: PathBuf,

    #[clap(long = "type", help = "Addenda type record (JSON)")]
    pub addenda_type: PathBuf,

    #[clap(long, help = "Template file")]
    pub template: PathBuf,

    #[clap(long, help = "JSON object with field values")]
    pub fields: Option<PathBuf>,

    #[clap(long, value_enum, help = "Overrides the configured validation policy")]
    pub policy: Option<ValidationPolicy>,

    #[clap(short, long, help = "Write the CFDI here instead of stdout")]
    pub output: Option<PathBuf>,
}
