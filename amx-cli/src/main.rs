use std::io::Write;
use std::path::PathBuf;

use amx_axml::{axml_to_xml, AttributeValue, AxmlDocument, Event};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use xml::EmitterConfig;

#[derive(Parser)]
#[command(version, long_about = None)]
#[command(arg_required_else_help = true)]
#[command(about = "Inspect and edit Android binary XML files such as AndroidManifest.xml")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints the given binary XML file as readable XML text
    Print { input: PathBuf },
    /// Increments android:versionCode on the manifest element by one
    BumpVersion {
        input: PathBuf,
        /// Output path; the input is overwritten when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Injects a uses-permission element after the manifest start tag
    AddPermission {
        input: PathBuf,
        /// Output path; the input is overwritten when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// The permission to request
        #[arg(short, long, default_value = "android.permission.INTERNET")]
        permission: String,
    },
    /// Parses and re-serializes the file without modification
    Copy { input: PathBuf, output: PathBuf },
}

fn load_document(path: &PathBuf) -> Result<AxmlDocument> {
    let buf = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.to_string_lossy()))?;
    AxmlDocument::new(buf).context("Parsing binary XML document")
}

fn save_document(doc: &AxmlDocument, path: &PathBuf) -> Result<()> {
    std::fs::write(path, doc.to_bytes()?)
        .with_context(|| format!("Failed to write {}", path.to_string_lossy()))
}

fn print_document(input: PathBuf) -> Result<()> {
    let mut doc = load_document(&input)?;

    let stdout = std::io::stdout();
    let mut writer = EmitterConfig::new()
        .perform_indent(true)
        .create_writer(stdout.lock());
    axml_to_xml(&mut writer, &mut doc)?;

    let mut sink = writer.into_inner();
    writeln!(sink)?;
    Ok(())
}

fn bump_version(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let mut doc = load_document(&input)?;

    let mut bumped = None;
    while doc.has_next() {
        if let Event::StartElement(id) = doc.next_event()? {
            if doc.element(id)?.name() != Some("manifest") {
                continue;
            }
            let view = doc.element_mut(id)?;
            for attr in view.element.attributes.iter_mut() {
                if attr.qualified_name(view.namespaces).as_deref() == Some("android:versionCode") {
                    let current = attr.typed_value.raw_data();
                    attr.typed_value.set_data(current + 1, view.pool)?;
                    bumped = Some(current + 1);
                }
            }
        }
    }

    match bumped {
        Some(version) => info!("Bumped android:versionCode to {version}"),
        None => return Err(anyhow!("No android:versionCode attribute found")),
    }
    save_document(&doc, &output.unwrap_or(input))
}

fn add_permission(input: PathBuf, output: Option<PathBuf>, permission: String) -> Result<()> {
    let mut doc = load_document(&input)?;

    let mut added = false;
    while doc.has_next() {
        if let Event::StartElement(id) = doc.next_event()? {
            if !added && doc.element(id)?.name() == Some("manifest") {
                let mut inserter = doc.insert()?;
                inserter.write_start_element(
                    "uses-permission",
                    &[("name", AttributeValue::String(permission.clone()))],
                    None,
                )?;
                inserter.write_end_element("uses-permission", None)?;
                added = true;
            }
        }
    }

    if !added {
        return Err(anyhow!("No manifest element found"));
    }
    info!("Added uses-permission for {permission}");
    save_document(&doc, &output.unwrap_or(input))
}

fn copy(input: PathBuf, output: PathBuf) -> Result<()> {
    let mut doc = load_document(&input)?;
    while doc.has_next() {
        doc.next_event()?;
    }
    save_document(&doc, &output)
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Print { input } => print_document(input),
        Commands::BumpVersion { input, output } => bump_version(input, output),
        Commands::AddPermission {
            input,
            output,
            permission,
        } => add_permission(input, output, permission),
        Commands::Copy { input, output } => copy(input, output),
    }
}
