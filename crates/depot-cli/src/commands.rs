use anyhow::{bail, Context};
use colored::Colorize;
use depot_loader::{load_core, CancelToken, CoreOutcome, LoaderConfig, ProgressEvent};
use depot_package::{Package, PackageBuilder, TagWriter};
use depot_types::{ObjectFlags, PackageIndex, PropertyType};
use serde::Deserialize;
use serde_json::json;

use crate::cli::{Cli, Command, InfoArgs, OutputFormat, PackArgs, ScanArgs, TreeArgs};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Info(args) => info(args, &cli.format),
        Command::Tree(args) => tree(args, &cli.format),
        Command::Scan(args) => scan(args),
        Command::Pack(args) => pack(args),
    }
}

fn info(args: InfoArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let package = Package::open(&args.package)
        .with_context(|| format!("opening {}", args.package.display()))?;
    let summary = package.summary();

    match format {
        OutputFormat::Json => {
            let report = json!({
                "name": package.name(),
                "path": package.path(),
                "version": summary.file_version,
                "guid": summary.guid.to_string(),
                "compressed": summary.is_compressed(),
                "names": package.names().len(),
                "imports": package.imports().len(),
                "exports": package.exports().len(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("{}  {}", "package".bold(), package.name());
            println!("  version    {}", summary.file_version);
            println!("  guid       {}", summary.guid);
            println!("  compressed {}", summary.is_compressed());
            println!("  names      {}", package.names().len());
            println!("  imports    {}", package.imports().len());
            println!("  exports    {}", package.exports().len());
        }
    }
    Ok(())
}

fn tree(args: TreeArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let package = Package::open(&args.package)
        .with_context(|| format!("opening {}", args.package.display()))?;

    match format {
        OutputFormat::Json => {
            let exports: Vec<_> = (0..package.exports().len() as u32)
                .map(|i| {
                    json!({
                        "index": i,
                        "path": package.export_path(i).map(|p| p.to_string()).ok(),
                        "class": package.export_class_name(i).ok(),
                        "size": package.exports()[i as usize].serial_size,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "exports": exports }))?);
        }
        OutputFormat::Text => {
            for i in 0..package.exports().len() as u32 {
                let path = package
                    .export_path(i)
                    .map(|p| p.to_string())
                    .unwrap_or_else(|_| "<bad path>".into());
                let class = package
                    .export_class_name(i)
                    .unwrap_or_else(|_| "<bad class>".into());
                println!(
                    "{i:4}  {}  {}",
                    class.cyan(),
                    path
                );
            }
        }
    }
    Ok(())
}

fn scan(args: ScanArgs) -> anyhow::Result<()> {
    let mut config = LoaderConfig::new(args.root.clone());
    if let Some(packages) = args.class_packages {
        config = config.with_class_packages(packages);
    }

    let cancel = CancelToken::new();
    let depot = match load_core(config, &cancel, &|event: ProgressEvent| {
        eprintln!("{} {}", "::".dimmed(), event.stage);
    })? {
        CoreOutcome::Ready(depot) => depot,
        CoreOutcome::Cancelled => bail!("scan cancelled"),
    };

    let mappers = depot
        .registry()
        .mappers()
        .context("mapper tables missing after load")?;
    println!("{}", "core loaded".green().bold());
    println!("  classes    {}", depot.classes().len());
    println!("  packages   {}", mappers.package.len());
    println!("  composites {}", mappers.composite.len());
    println!("  redirects  {}", mappers.redirector.len());
    Ok(())
}

/// Manifest consumed by `depot pack`.
#[derive(Debug, Deserialize)]
struct PackManifest {
    name: String,
    #[serde(default)]
    imports: Vec<ManifestImport>,
    #[serde(default)]
    exports: Vec<ManifestExport>,
}

#[derive(Debug, Deserialize)]
struct ManifestImport {
    class_package: String,
    class_name: String,
    object_name: String,
    source_package: String,
}

#[derive(Debug, Deserialize)]
struct ManifestExport {
    /// Raw package index of the class (negative = import, 0 = class def).
    class: i32,
    #[serde(default)]
    outer: i32,
    name: String,
    #[serde(default)]
    properties: Vec<ManifestProperty>,
}

#[derive(Debug, Deserialize)]
struct ManifestProperty {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    value: serde_json::Value,
}

fn pack(args: PackArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.manifest)
        .with_context(|| format!("reading {}", args.manifest.display()))?;
    let manifest: PackManifest = serde_json::from_str(&text).context("parsing manifest")?;

    let mut builder = PackageBuilder::new();
    if args.compress {
        builder = builder.with_compression();
    }
    for import in &manifest.imports {
        builder.add_import(
            &import.class_package,
            &import.class_name,
            &import.object_name,
            &import.source_package,
        );
    }
    for export in &manifest.exports {
        let class = PackageIndex::from_raw(export.class);
        let outer = PackageIndex::from_raw(export.outer);
        let properties = &export.properties;
        builder.add_object(class, outer, &export.name, ObjectFlags::PUBLIC, |mut w| {
            for property in properties {
                w = write_manifest_property(w, property);
            }
            w
        });
    }

    builder
        .finish(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!(
        "{} {} ({} from {})",
        "packed".green().bold(),
        args.output.display(),
        manifest.exports.len(),
        manifest.name
    );
    Ok(())
}

fn write_manifest_property<'a>(w: TagWriter<'a>, property: &ManifestProperty) -> TagWriter<'a> {
    let name = property.name.as_str();
    let value = &property.value;
    match property.ty.as_str() {
        "Int" => w.int(name, value.as_i64().unwrap_or(0) as i32),
        "Float" => w.float(name, value.as_f64().unwrap_or(0.0) as f32),
        "Bool" => w.bool(name, value.as_bool().unwrap_or(false)),
        "Str" => w.str(name, value.as_str().unwrap_or("")),
        "Name" => w.name(name, value.as_str().unwrap_or("None")),
        "Object" => w.object(
            name,
            PackageIndex::from_raw(value.as_i64().unwrap_or(0) as i32),
        ),
        other => {
            tracing::warn!(property = %name, ty = %other, "unsupported manifest property type; writing empty Str");
            w.raw(name, PropertyType::Str, vec![0, 0, 0, 0], 0)
        }
    }
}
