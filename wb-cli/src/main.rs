//! weightbridge: CLI for cross-format model checkpoint conversion.
//!
//! Subcommands:
//! - convert
//! - run
//! - schemas

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use wb_convert::{ConversionPlan, ConvertReport, ConvertRequest, convert};
use wb_graph::{ArchParams, NetworkKind, PolicyActivation};

fn parse_policy_activation(s: &str) -> PolicyActivation {
    match s {
        "softmax" => PolicyActivation::Softmax,
        "log-softmax" => PolicyActivation::LogSoftmax,
        other => {
            eprintln!("Invalid --policy-activation value: {other} (expected softmax or log-softmax)");
            process::exit(1);
        }
    }
}

fn print_report(source: &str, report: &ConvertReport) {
    println!("Converted {} -> {}", source, report.target.display());
    println!();
    println!("Architecture ({}):", report.meta.network_kind);
    for (i, layer) in report.layers.iter().enumerate() {
        println!(
            "  - layer {}: {} -> {}, {}",
            i,
            layer.in_features,
            layer.out_features,
            layer.activation.as_str()
        );
    }
    println!();
    println!("Artifact: {}", report.target.display());
    println!("Sidecar:  {}", wb_export::meta_path(&report.target).display());
}

fn cmd_convert(args: &[String]) {
    let mut schema: Option<String> = None;
    let mut source_path: Option<String> = None;
    let mut target_path: Option<String> = None;
    let mut kind: Option<String> = None;
    let mut input_size: Option<usize> = None;
    let mut hidden_size: Option<usize> = None;
    let mut policy_size: Option<usize> = None;
    let mut policy_activation: Option<String> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"weightbridge convert

USAGE:
    weightbridge convert --schema ID --in SRC --out DST --kind value|policy --input-size N --hidden-size N [--policy-size N] [--policy-activation softmax|log-softmax]

OPTIONS:
    --schema ID               Source schema id, see `weightbridge schemas` (required)
    --in SRC                  Source checkpoint path (required)
    --out DST                 Artifact destination path (required)
    --kind KIND               Network kind: value or policy (required)
    --input-size N            Input feature count (required)
    --hidden-size N           Hidden layer width (required)
    --policy-size N           Action count (required for policy networks)
    --policy-activation ACT   Policy head: softmax or log-softmax (required for policy networks)
"#
                );
                return;
            }
            "--schema" => {
                schema = Some(args.get(i + 1).cloned().unwrap_or_default());
                i += 2;
            }
            "--in" => {
                source_path = Some(args.get(i + 1).cloned().unwrap_or_default());
                i += 2;
            }
            "--out" => {
                target_path = Some(args.get(i + 1).cloned().unwrap_or_default());
                i += 2;
            }
            "--kind" => {
                kind = Some(args.get(i + 1).cloned().unwrap_or_default());
                i += 2;
            }
            "--input-size" => {
                input_size = Some(
                    args.get(i + 1)
                        .and_then(|s| s.parse().ok())
                        .unwrap_or_else(|| {
                            eprintln!("Invalid --input-size value");
                            process::exit(1);
                        }),
                );
                i += 2;
            }
            "--hidden-size" => {
                hidden_size = Some(
                    args.get(i + 1)
                        .and_then(|s| s.parse().ok())
                        .unwrap_or_else(|| {
                            eprintln!("Invalid --hidden-size value");
                            process::exit(1);
                        }),
                );
                i += 2;
            }
            "--policy-size" => {
                policy_size = Some(
                    args.get(i + 1)
                        .and_then(|s| s.parse().ok())
                        .unwrap_or_else(|| {
                            eprintln!("Invalid --policy-size value");
                            process::exit(1);
                        }),
                );
                i += 2;
            }
            "--policy-activation" => {
                policy_activation = Some(args.get(i + 1).cloned().unwrap_or_default());
                i += 2;
            }
            other => {
                eprintln!("Unknown option for `weightbridge convert`: {}", other);
                eprintln!("Run `weightbridge convert --help` for usage.");
                process::exit(1);
            }
        }
    }

    let schema = schema.unwrap_or_else(|| {
        eprintln!("Missing --schema");
        process::exit(1);
    });
    let source_path = source_path.unwrap_or_else(|| {
        eprintln!("Missing --in");
        process::exit(1);
    });
    let target_path = target_path.unwrap_or_else(|| {
        eprintln!("Missing --out");
        process::exit(1);
    });
    let kind = kind.unwrap_or_else(|| {
        eprintln!("Missing --kind");
        process::exit(1);
    });
    let input_size = input_size.unwrap_or_else(|| {
        eprintln!("Missing --input-size");
        process::exit(1);
    });
    let hidden_size = hidden_size.unwrap_or_else(|| {
        eprintln!("Missing --hidden-size");
        process::exit(1);
    });

    let kind: NetworkKind = kind.parse().unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });
    let policy_activation = policy_activation.as_deref().map(parse_policy_activation);

    let source = fs::read(&source_path).unwrap_or_else(|e| {
        eprintln!("Failed to read {source_path}: {e}");
        process::exit(1);
    });

    let target = PathBuf::from(&target_path);
    let req = ConvertRequest {
        schema_id: &schema,
        source: &source,
        arch: ArchParams {
            input_size,
            hidden_size,
            policy_output_size: policy_size,
        },
        kind,
        policy_activation,
        target: &target,
    };
    match convert(&req) {
        Ok(report) => print_report(&source_path, &report),
        Err(e) => {
            eprintln!("Conversion failed: {e}");
            process::exit(1);
        }
    }
}

fn cmd_run(args: &[String]) {
    let mut config_path: Option<String> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"weightbridge run

USAGE:
    weightbridge run --config plan.yaml

OPTIONS:
    --config PATH    Path to YAML conversion plan (required)
"#
                );
                return;
            }
            "--config" => {
                config_path = Some(args.get(i + 1).cloned().unwrap_or_default());
                i += 2;
            }
            other => {
                eprintln!("Unknown option for `weightbridge run`: {}", other);
                eprintln!("Run `weightbridge run --help` for usage.");
                process::exit(1);
            }
        }
    }

    let config_path = config_path.unwrap_or_else(|| {
        eprintln!("Missing --config");
        process::exit(1);
    });
    let plan = ConversionPlan::load(&config_path).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });
    if plan.conversions.is_empty() {
        println!("Plan has no conversions.");
        return;
    }

    let total = plan.conversions.len();
    let mut failed = 0usize;
    for (idx, entry) in plan.conversions.iter().enumerate() {
        let label = format!(
            "[{}/{}] {} ({})",
            idx + 1,
            total,
            entry.source.display(),
            entry.schema
        );
        let source = match fs::read(&entry.source) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("{label} FAILED: io: {e}");
                failed += 1;
                continue;
            }
        };
        let req = ConvertRequest {
            schema_id: &entry.schema,
            source: &source,
            arch: entry.arch(),
            kind: entry.kind,
            policy_activation: entry.policy_activation,
            target: &entry.target,
        };
        match convert(&req) {
            Ok(report) => {
                println!("{label} -> {}", report.target.display());
            }
            Err(e) => {
                eprintln!("{label} FAILED: {e}");
                failed += 1;
            }
        }
    }

    println!();
    println!("Plan complete: {} ok, {} failed", total - failed, failed);
    if failed > 0 {
        process::exit(1);
    }
}

fn cmd_schemas() {
    println!("Registered source schemas:");
    for desc in wb_checkpoint::schemas() {
        println!();
        println!("{}  ({})", desc.id, desc.source_kind.as_str());
        for (i, layer) in desc.layers.iter().enumerate() {
            println!("  layer {}: weight={}  bias={}", i, layer.weight, layer.bias);
        }
    }
}

fn print_help() {
    eprintln!(
        r#"weightbridge - model checkpoint conversion

USAGE:
    weightbridge <COMMAND> [OPTIONS]

COMMANDS:
    convert             Convert one checkpoint into a graph artifact
    run                 Execute every conversion in a YAML plan
    schemas             List registered source schemas

OPTIONS:
    -h, --help          Print this help message
    -V, --version       Print version

Run `weightbridge <COMMAND> --help` for command options.
"#
    );
}

fn print_version() {
    println!("weightbridge {}", env!("CARGO_PKG_VERSION"));
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        process::exit(0);
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => {
            print_help();
        }
        "-V" | "--version" => {
            print_version();
        }
        "convert" => {
            cmd_convert(&args[2..]);
        }
        "run" => {
            cmd_run(&args[2..]);
        }
        "schemas" => {
            cmd_schemas();
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            eprintln!("Run `weightbridge --help` for usage.");
            process::exit(1);
        }
    }
}
