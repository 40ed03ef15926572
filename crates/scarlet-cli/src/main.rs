//! Scarlet CLI entry point.

use std::io::Read;
use std::path::Path;

use clap::{Parser, Subcommand, ValueEnum};
use rhizome_scarlet_ir::{ScriptObj, validate};
use rhizome_scarlet_runtime_lua::{LuaRuntime, emit};
use rhizome_scarlet_runtime_memory::{MemoryConfig, MemoryRuntime};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scarlet")]
#[command(about = "Check, compile and run Scarlet scripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a compiled script
    Check {
        /// Input script file (or - for stdin)
        file: String,
    },

    /// Compile a script to Lua
    Emit {
        /// Input script file (or - for stdin)
        file: String,

        /// Write to stdout instead of file
        #[arg(long)]
        stdout: bool,
    },

    /// Execute a script
    Exec {
        /// Input script file (or - for stdin)
        file: String,

        /// Key names, in declaration order
        #[arg(short, long = "key")]
        keys: Vec<String>,

        /// JSON arguments, in declaration order
        #[arg(short, long = "arg")]
        args: Vec<String>,

        /// Runtime to execute with
        #[arg(short, long, value_enum, default_value_t = Backend::Memory)]
        backend: Backend,

        /// Iteration limit for while loops in the memory runtime (0 disables it)
        #[arg(long)]
        max_iterations: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Memory,
    Lua,
}

fn read_input(file: &str) -> Result<String, std::io::Error> {
    if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(file)
    }
}

fn read_script(file: &str) -> Result<ScriptObj, Box<dyn std::error::Error>> {
    let input = read_input(file)?;
    Ok(serde_json::from_str(&input)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("scarlet=info".parse()?)
                .add_directive("rhizome_scarlet=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { file } => {
            let script = read_script(&file)?;
            validate(&script)?;
            println!(
                "ok: {} commands, {} args, {} keys",
                script.cmds.len(),
                script.argv.len(),
                script.keyv.len()
            );
        }

        Commands::Emit { file, stdout } => {
            let script = read_script(&file)?;
            validate(&script)?;
            let lua_code = emit(&script)?;

            if stdout {
                print!("{}", lua_code);
            } else {
                let out_path = if file == "-" {
                    "output.lua".to_string()
                } else {
                    Path::new(&file)
                        .with_extension("lua")
                        .to_string_lossy()
                        .into_owned()
                };
                std::fs::write(&out_path, &lua_code)?;
                println!("Wrote: {}", out_path);
            }
        }

        Commands::Exec {
            file,
            keys,
            args,
            backend,
            max_iterations,
        } => {
            let script = read_script(&file)?;
            let args = args
                .iter()
                .map(|arg| serde_json::from_str(arg))
                .collect::<Result<Vec<Value>, _>>()?;

            let result = match backend {
                Backend::Memory => {
                    let mut config = MemoryConfig::default();
                    if let Some(max) = max_iterations {
                        config.max_iterations = (max > 0).then_some(max);
                    }
                    info!(max_iterations = ?config.max_iterations, "running in memory");
                    MemoryRuntime::new(config).execute(&script, &keys, &args)?
                }
                Backend::Lua => {
                    info!("running in luajit");
                    LuaRuntime::new()?.execute(&script, &keys, &args)?
                }
            };

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
