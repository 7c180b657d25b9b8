//! Repository definition CLI tool
//!
//! Compiles the methods declared in a repository definition file, reporting every
//! declaration that would fail when the repository is built. Suitable for CI pipelines:
//! the exit code is non-zero when any method fails to compile.

use clap::{Parser, Subcommand};
use colored::Colorize;
use repoquery::RepositoryConfig;
use repoquery_cli::{report, Definition};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "repoquery")]
#[command(about = "Checks and explains repository method declarations")]
#[command(version = "0.1.0")]
struct Cli {
    /// Repository definition file
    #[arg(long, default_value = "repository.toml")]
    file: PathBuf,

    /// Repository configuration file
    #[arg(long, default_value = repoquery::config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every declared method and report failures
    Check,

    /// Show how methods compile
    Explain {
        /// Only explain this method
        method: Option<String>,

        /// Print the compiled descriptors as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if cli.quiet {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();
    } else if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let config = match RepositoryConfig::load_from(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let definition = match Definition::load(&cli.file) {
        Ok(definition) => definition,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Check => handle_check(&definition, &config, cli.quiet),
        Commands::Explain { method, json } => handle_explain(&definition, &config, method.as_deref(), json),
    };

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn handle_check(definition: &Definition, config: &RepositoryConfig, quiet: bool) -> anyhow::Result<()> {
    let compiled = definition.compile_all(&[]);
    let mut failures = 0;

    for entry in &compiled {
        match &entry.result {
            Ok(_) => {
                if !quiet {
                    println!("{} {}", "✓".green(), entry.signature.name);
                }
            }
            Err(err) => {
                failures += 1;
                eprintln!("{}", report::failure(&entry.signature.name, err));
            }
        }
    }

    if !quiet {
        println!(
            "\n📈 Summary: {} compiled, {} failed",
            compiled.len() - failures,
            failures
        );
    }
    if failures > 0 {
        if !config.eager_compile {
            log::warn!("eager compilation is disabled; these methods would fail on first call");
        }
        anyhow::bail!("{} method(s) failed to compile", failures);
    }
    Ok(())
}

fn handle_explain(
    definition: &Definition,
    config: &RepositoryConfig,
    method: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let metadata = definition.metadata();
    let mut found = false;

    for signature in definition.find_methods(method) {
        found = true;
        let descriptor = match repoquery::QueryDescriptor::compile(signature, &metadata, &[]) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                eprintln!("{}", report::failure(&signature.name, &err));
                continue;
            }
        };
        if json {
            let mut value = serde_json::to_value(&descriptor)?;
            if let Some(object) = value.as_object_mut() {
                object.insert("fingerprint".to_string(), descriptor.fingerprint()?.into());
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            println!("{}", report::explain(&descriptor, config));
        }
    }

    if !found {
        match method {
            Some(name) => anyhow::bail!("no method named `{}` in the definition", name),
            None => println!("No methods declared"),
        }
    }
    Ok(())
}
