//! # treecfg demo application
//!
//! A small CLI that loads, edits and converts configuration files with
//! treecfg. It exists to demonstrate and manually verify the library.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example treecfg_demo -- seed demo.toml
//! cargo run --example treecfg_demo -- show demo.toml --define USER=alice --paths '*_dir' --paths 'server.log_file'
//! cargo run --example treecfg_demo -- config -f demo.toml set server.port 9090
//! RUST_LOG=treecfg=debug cargo run --example treecfg_demo -- config -f demo.toml convert demo.json
//! ```
//!
//! | Feature                  | How to exercise it                                      |
//! |--------------------------|---------------------------------------------------------|
//! | Ingest host data         | `seed FILE`                                             |
//! | Placeholder substitution | `show FILE --define USER=alice` replaces `%USER%`       |
//! | Relative path rewriting  | `show FILE --paths '*_dir'` prefixes with the file's dir |
//! | Matrix bridge            | `show FILE --matrix calibration`                        |
//! | `config list/get`        | `config -f FILE list`, `config -f FILE get servers[1].name` |
//! | `config set/unset`       | `config -f FILE set server.port 9090`                   |
//! | `config convert`         | `config -f FILE convert out.json`                       |

mod seed;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

use treecfg::{Config, ConfigArgs, Matrix, ParameterNames};

use seed::SeedConfig;

/// treecfg demo: inspect and edit configuration files.
#[derive(Parser, Debug)]
#[command(name = "treecfg-demo")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a sample configuration built from a Rust struct.
    Seed {
        /// Output file; the extension selects the format.
        output: PathBuf,
    },
    /// Load a file, apply rewrites and print every parameter.
    Show {
        file: PathBuf,
        /// Replace `%NAME%` with VALUE in every string (NAME=VALUE).
        #[arg(long = "define", value_parser = parse_define)]
        defines: Vec<(String, String)>,
        /// Name pattern of parameters holding paths relative to the file.
        #[arg(long = "paths")]
        path_patterns: Vec<String>,
        /// Print the list at this key as a float matrix.
        #[arg(long)]
        matrix: Option<String>,
    },
    /// Manage a configuration file (list, get, set, unset, convert).
    Config(ConfigArgs),
}

fn parse_define(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    Ok((format!("%{name}%"), value.to_string()))
}

fn seed(output: &Path) -> treecfg::Result<()> {
    let config = Config::from_serialize(&SeedConfig::default())?;
    config.save(output)?;
    println!("Wrote {}", output.display());
    Ok(())
}

fn show(
    file: &Path,
    defines: &[(String, String)],
    path_patterns: &[String],
    matrix: Option<&str>,
) -> treecfg::Result<()> {
    let config = treecfg::load(file)?;
    if !defines.is_empty() {
        config.replace_placeholders(defines)?;
    }
    if !path_patterns.is_empty() {
        let base = file.parent().unwrap_or(Path::new(""));
        config.adjust_relative_paths(base, path_patterns)?;
    }

    let names = config.list_parameter_names(ParameterNames::default())?;
    let width = names.iter().map(String::len).max().unwrap_or(0);
    for name in names {
        let value = config.get(&name)?;
        if !value.is_container() {
            println!("{name:<width$}  {value}");
        }
    }

    if let Some(key) = matrix {
        let m: Matrix<f64> = config.get_matrix(key)?;
        let (rows, cols) = m.shape();
        println!();
        println!("{key}: {rows}x{cols}");
        for r in 0..rows {
            let row: Vec<String> = (0..cols)
                .filter_map(|c| m.get(r, c))
                .map(|v| format!("{v:8.3}"))
                .collect();
            println!("{}", row.join(" "));
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "treecfg=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Seed { output } => seed(&output),
        Commands::Show {
            file,
            defines,
            path_patterns,
            matrix,
        } => show(&file, &defines, &path_patterns, matrix.as_deref()),
        Commands::Config(args) => {
            let (file, action) = args.into_action();
            treecfg::handle_and_print(&file, &action)
        }
    };

    if let Err(e) = result {
        eprintln!("Error:\n{e}");
        std::process::exit(1);
    }
}
