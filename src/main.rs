//! embed-bridge CLI entry point.
//!
//! Drives the embedded-module pipeline against script files on disk, which
//! stand in for payloads the linker would otherwise embed.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use embed_bridge_common::{BridgeConfig, ConfigFile};
use embed_bridge_core::naming::{PAYLOAD_TERMINATOR, resource_identifier};
use embed_bridge_core::{CallArg, EmbeddedResource, SymbolConvention, call_embedded};

#[derive(Debug, Parser)]
#[command(name = "embed-bridge", version, about)]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "EMBED_BRIDGE_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a script as an embedded module and call its entry function.
    Call {
        /// Script file to load. Looked up in the config file when omitted.
        #[arg(long)]
        script: Option<PathBuf>,

        /// Module name; defaults to the identifier derived from the file name.
        #[arg(long)]
        module: Option<String>,

        /// TOML configuration file.
        #[arg(long, env = "EMBED_BRIDGE_CONFIG")]
        config: Option<PathBuf>,

        /// Integer arguments passed to the entry function.
        #[arg(last = true, allow_hyphen_values = true)]
        args: Vec<i32>,
    },

    /// Print resource identifiers and linker symbol names for file names.
    Ident {
        #[arg(required = true)]
        files: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,embed_bridge=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    match cli.command {
        Command::Call {
            script,
            module,
            config,
            args,
        } => run_call(script, module, config.as_deref(), &args),
        Command::Ident { files } => {
            for file in &files {
                print_ident(file);
            }
            Ok(())
        }
    }
}

fn run_call(
    script: Option<PathBuf>,
    module: Option<String>,
    config_path: Option<&Path>,
    args: &[i32],
) -> anyhow::Result<()> {
    let config_file = config_path
        .map(|path| {
            ConfigFile::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        })
        .transpose()?;

    let (script, module) = match (script, module) {
        (Some(script), module) => {
            let module = match module {
                Some(module) => module,
                None => identifier_for(&script)?,
            };
            (script, module)
        }
        (None, Some(module)) => {
            let Some(config_file) = &config_file else {
                bail!("--module without --script requires --config");
            };
            let entry = config_file
                .script(&module)
                .with_context(|| format!("No script registered for module '{module}'"))?;
            // Relative script paths are resolved against the config file.
            let base = config_path.and_then(Path::parent).unwrap_or(Path::new("."));
            (base.join(&entry.path), module)
        }
        (None, None) => bail!("Either --script or --module must be given"),
    };

    let config: BridgeConfig = config_file.map(|file| file.runtime).unwrap_or_default();
    let resource = load_as_embedded(&script)?;

    info!(
        script = %script.display(),
        module = %module,
        argc = args.len(),
        "Calling embedded module"
    );

    let call_args: Vec<CallArg> = args.iter().copied().map(CallArg::from).collect();
    let result = call_embedded(&config, &resource, &module, &call_args).map_err(|err| {
        let stage = err.stage();
        anyhow::Error::new(err).context(format!("Call failed after stage '{stage}'"))
    })?;

    println!("{result}");
    Ok(())
}

/// Read a script and shape it like a linked payload.
///
/// The bytes are leaked: an embedded payload lives for the whole process.
fn load_as_embedded(script: &Path) -> anyhow::Result<EmbeddedResource> {
    let mut bytes = std::fs::read(script)
        .with_context(|| format!("Failed to read script {}", script.display()))?;
    bytes.push(PAYLOAD_TERMINATOR);

    let name = identifier_for(script)?;
    debug!(resource = %name, len = bytes.len(), "Script loaded");

    Ok(EmbeddedResource::from_static(
        Box::leak(name.into_boxed_str()),
        Box::leak(bytes.into_boxed_slice()),
    ))
}

fn identifier_for(script: &Path) -> anyhow::Result<String> {
    let file_name = script
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Script path has no usable file name: {}", script.display()))?;
    Ok(resource_identifier(file_name))
}

fn print_ident(file: &str) {
    let convention = SymbolConvention::CURRENT;
    let ident = resource_identifier(file);

    println!("{file}");
    println!("  identifier:  {ident}");
    println!("  convention:  {convention}");
    println!("  start:       {}", convention.start_symbol(&ident));
    if let Some(end) = convention.end_symbol(&ident) {
        println!("  end:         {end}");
    }
    if let Some((segment, section)) = convention.section(&ident) {
        println!("  section:     {segment},{section}");
    }
}
