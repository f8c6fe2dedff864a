// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! objrt-dump - Dump class catalogs and RTTI tables
//!
//! Lists every builtin class with its size, factory and flattened ancestor
//! table. `--smoke` additionally creates each class, casts it to every
//! relative and destroys it again under a tracking allocator.

use clap::Parser;
use colored::*;
use objrt::{ClassCatalog, ClassDef, ClassId, CreateFlags, Runtime, RuntimeConfig, TrackingAllocator};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Dump objrt class metadata
#[derive(Parser, Debug)]
#[command(name = "objrt-dump")]
#[command(version)]
#[command(about = "Dump objrt class catalogs and RTTI tables")]
struct Args {
    /// Output format: pretty, json
    #[arg(short, long, default_value = "pretty")]
    format: OutputFormat,

    /// Only show this class id (hex "0xaa1d70" or decimal)
    #[arg(short, long, value_parser = parse_class_id)]
    class: Option<ClassId>,

    /// Create, cast and destroy every listed class
    #[arg(long)]
    smoke: bool,

    /// Runtime config (YAML) used by --smoke
    #[arg(long)]
    config: Option<PathBuf>,

    /// Quiet mode - compact output
    #[arg(long)]
    quiet: bool,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "p" => Ok(OutputFormat::Pretty),
            "json" | "j" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

fn parse_class_id(s: &str) -> Result<ClassId, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed
        .map(ClassId)
        .map_err(|e| format!("invalid class id {:?}: {}", s, e))
}

/// Outcome of the create/cast/destroy check for one class.
struct SmokeResult {
    class: ClassId,
    outcome: Result<(), String>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = ClassCatalog::builtin();
    let classes: Vec<&'static ClassDef> = catalog
        .iter()
        .filter(|def| args.class.map_or(true, |id| def.id == id))
        .collect();

    if let Some(id) = args.class {
        if classes.is_empty() {
            return Err(format!("class {} is not in the catalog", id).into());
        }
    }

    let smoke = if args.smoke {
        let config = match &args.config {
            Some(path) => RuntimeConfig::from_yaml_file(path)?,
            None => RuntimeConfig::default(),
        }
        .with_env_overrides();
        Some(
            classes
                .iter()
                .map(|def| SmokeResult {
                    class: def.id,
                    outcome: smoke_test(def, &config),
                })
                .collect::<Vec<_>>(),
        )
    } else {
        None
    };

    match args.format {
        OutputFormat::Pretty => print_pretty(&classes, smoke.as_deref(), args),
        OutputFormat::Json => print_json(&classes, smoke.as_deref()),
    }

    if smoke
        .iter()
        .flatten()
        .any(|result| result.outcome.is_err())
    {
        return Err("smoke test failed".into());
    }
    Ok(())
}

fn smoke_test(def: &'static ClassDef, config: &RuntimeConfig) -> Result<(), String> {
    let tracker = Arc::new(TrackingAllocator::new());
    let mut rt = Runtime::builder()
        .allocator(Arc::clone(&tracker))
        .config(config.clone())
        .build()
        .map_err(|e| e.to_string())?;

    let id = rt
        .create_by_id(def.id, None, CreateFlags::NONE)
        .map_err(|e| format!("create: {}", e))?;

    let base = rt
        .cast(id, def.id)
        .ok_or_else(|| "cast to own class failed".to_string())?;
    for entry in def.relatives() {
        let segment = rt
            .cast(id, entry.class.id)
            .ok_or_else(|| format!("cast to {} failed", entry.class.id))?;
        let offset = segment.as_ptr() as usize - base.as_ptr() as usize;
        if offset != entry.offset {
            return Err(format!(
                "{} segment at {} bytes, table says {}",
                entry.class.id, offset, entry.offset
            ));
        }
    }

    rt.destroy(id).map_err(|e| format!("destroy: {}", e))?;
    drop(rt);
    if !tracker.is_balanced() {
        return Err(format!("allocator not balanced: {:?}", tracker.stats()));
    }
    Ok(())
}

fn print_pretty(classes: &[&'static ClassDef], smoke: Option<&[SmokeResult]>, args: &Args) {
    println!();
    println!("{}", "=== objrt Class Catalog ===".bold());
    println!();
    println!("{} {} class(es)", "Classes:".cyan().bold(), classes.len());
    println!();

    for (i, def) in classes.iter().enumerate() {
        if args.quiet {
            println!(
                "  [{}] {} {} ({}B, {} relatives)",
                i + 1,
                def.id,
                def.display_name(),
                def.size,
                def.relatives().len()
            );
            continue;
        }

        println!(
            "  {} {} {}",
            format!("[{}]", i + 1).yellow(),
            def.display_name().green().bold(),
            def.id.to_string().dimmed()
        );
        println!("      Size: {}B  Align: {}", def.size, def.align);
        println!("      Relatives:");
        for (depth, entry) in def.relatives().iter().enumerate() {
            println!(
                "        {} {:<12} {}  @ +{}",
                format!("{}.", depth).dimmed(),
                entry.class.display_name(),
                entry.class.id.to_string().dimmed(),
                entry.offset
            );
        }
        println!();
    }

    if let Some(results) = smoke {
        println!("{}", "--- Smoke ---".dimmed());
        for result in results {
            match &result.outcome {
                Ok(()) => println!("  {} {}", "ok".green(), result.class),
                Err(e) => println!("  {} {}: {}", "FAIL".red().bold(), result.class, e),
            }
        }
        println!();
    }
}

fn print_json(classes: &[&'static ClassDef], smoke: Option<&[SmokeResult]>) {
    println!("{}", json_report(classes, smoke));
}

fn json_report(classes: &[&'static ClassDef], smoke: Option<&[SmokeResult]>) -> Value {
    let classes: Vec<Value> = classes
        .iter()
        .map(|def| {
            let relatives: Vec<Value> = def
                .relatives()
                .iter()
                .map(|entry| {
                    json!({
                        "id": entry.class.id.to_string(),
                        "name": entry.class.display_name(),
                        "offset": entry.offset,
                    })
                })
                .collect();
            json!({
                "id": def.id.to_string(),
                "name": def.display_name(),
                "size": def.size,
                "align": def.align,
                "relatives": relatives,
            })
        })
        .collect();

    let mut report = json!({
        "version": objrt::VERSION,
        "classes": classes,
    });

    if let Some(results) = smoke {
        let smoke: Vec<Value> = results
            .iter()
            .map(|result| match &result.outcome {
                Ok(()) => json!({ "id": result.class.to_string(), "ok": true }),
                Err(e) => json!({ "id": result.class.to_string(), "ok": false, "error": e }),
            })
            .collect();
        report["smoke"] = Value::Array(smoke);
    }
    report
}
