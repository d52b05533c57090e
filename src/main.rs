use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use httpd_confedit::parser::probe_installation;
use httpd_confedit::{
    parse_defines, parse_includes, parse_modules, DumpKind, HttpdCtl, ParserOptions, RuntimeSource,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "httpd-confedit")]
#[command(about = "Inspect httpd configuration roots and runtime state", long_about = None)]
#[command(version)]
struct Cli {
    /// Options file (TOML); built-in defaults apply when omitted
    #[arg(short, long)]
    options: Option<PathBuf>,

    /// Override the server control binary from the options
    #[arg(long)]
    ctl: Option<String>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a configuration root and report its entry file
    Check {
        /// Server root directory (e.g. /etc/apache2)
        root: PathBuf,
    },

    /// Show runtime variables defined by the running server
    Defines,

    /// Show modules loaded by the running server
    Modules,

    /// Show include files resolved by the running server
    Includes,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("HTTPD_CONFEDIT_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut options = match &cli.options {
        Some(path) => httpd_confedit::load_from_path(path)?,
        None => ParserOptions::default(),
    };
    if let Some(ctl) = &cli.ctl {
        options.ctl = ctl.clone();
    }

    match cli.command {
        Commands::Check { root } => cmd_check(&root, &options, cli.json),
        Commands::Defines => cmd_defines(&options, cli.json),
        Commands::Modules => cmd_modules(&options, cli.json),
        Commands::Includes => cmd_includes(&options, cli.json),
    }
}

fn cmd_check(root: &PathBuf, options: &ParserOptions, json: bool) -> Result<()> {
    match probe_installation(root, options) {
        Ok((normalized, entry)) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "root": normalized,
                        "entry_file": entry,
                    })
                );
            } else {
                println!("{} {}", "✓".green(), normalized.display());
                println!("  entry file: {}", entry.display());
            }
            Ok(())
        }
        Err(err) => {
            if json {
                println!("{}", serde_json::json!({ "error": err.to_string() }));
            } else {
                println!("{} {}", "✗".red(), err);
            }
            std::process::exit(1);
        }
    }
}

fn cmd_defines(options: &ParserOptions, json: bool) -> Result<()> {
    let output = HttpdCtl::new(&options.ctl).dump(DumpKind::RunCfg)?;
    let variables: BTreeMap<String, String> = parse_defines(&output)?.into_iter().collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&variables)?);
        return Ok(());
    }
    if variables.is_empty() {
        println!("no runtime variables defined");
        return Ok(());
    }
    for (name, value) in variables {
        if value.is_empty() {
            println!("{}", name.bold());
        } else {
            println!("{} = {}", name.bold(), value);
        }
    }
    Ok(())
}

fn cmd_modules(options: &ParserOptions, json: bool) -> Result<()> {
    let output = HttpdCtl::new(&options.ctl).dump(DumpKind::Modules)?;
    let modules = parse_modules(&output);

    if json {
        println!("{}", serde_json::to_string_pretty(&modules)?);
        return Ok(());
    }
    for module in &modules {
        let kind = if module.shared {
            "shared".yellow()
        } else {
            "static".green()
        };
        println!("{:<40} {}", module.identifier, kind);
    }
    println!("{} modules loaded", modules.len());
    Ok(())
}

fn cmd_includes(options: &ParserOptions, json: bool) -> Result<()> {
    let output = HttpdCtl::new(&options.ctl).dump(DumpKind::Includes)?;
    let includes = parse_includes(&output);

    if json {
        println!("{}", serde_json::to_string_pretty(&includes)?);
        return Ok(());
    }
    for path in &includes {
        println!("{}", path.display());
    }
    println!("{} files resolved", includes.len());
    Ok(())
}
