use ahk_bridge::hotkey::registration_script;
use ahk_bridge::{Automation, Config, HotkeyAction, Positioning, Session};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ahkb")]
#[command(about = "Drive an AutoHotkey engine over its stdio protocol")]
#[command(version)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// AutoHotkey executable, overrides the configuration
    #[arg(long, global = true)]
    exe: Option<PathBuf>,

    /// Directory holding the runner scripts
    #[arg(long, global = true)]
    script_dir: Option<PathBuf>,

    /// Use the AutoHotkey v1 runner script
    #[arg(long, global = true)]
    ahkv1: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the generated hotkey registration script
    Script,
    /// Send one raw command line and print the response
    Exec {
        /// Command line, e.g. "getMousePos" or "winExist;Notepad;"
        line: String,
    },
    /// Print the current cursor position
    MousePos {
        /// Report the position as a percentage of the screen
        #[arg(long)]
        percent: bool,
    },
    /// Log every configured hotkey as it fires until interrupted
    Watch,
    /// Write a default configuration file
    InitConfig {
        path: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let level = if config.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command, config).await {
        error!("{:#}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(exe) = &cli.exe {
        config.executable = exe.clone();
    }
    if let Some(dir) = &cli.script_dir {
        config.script_dir = dir.clone();
    }
    if cli.ahkv1 {
        config.ahkv1 = true;
    }
    if cli.verbose {
        config.verbose = true;
    }

    Ok(config)
}

async fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Script => {
            config.validate()?;
            print!("{}", registration_script(&config.hotkeys));
        }
        Commands::InitConfig { path } => {
            Config::default()
                .save_to_file(&path)
                .with_context(|| format!("writing {}", path))?;
            println!("{} {}", "Wrote".green(), path);
        }
        Commands::Exec { line } => {
            let session = Session::open(config).await?;
            let response = session.commands().request(&line).await?;
            session.shutdown();
            if response.is_empty() {
                println!("{}", "(empty response)".dimmed());
            } else {
                println!("{}", response);
            }
        }
        Commands::MousePos { percent } => {
            let ahk = Automation::open(config).await?;
            let positioning = if percent {
                Positioning::Percent
            } else {
                Positioning::Pixels
            };
            let position = ahk.get_mouse_pos(positioning).await?;
            ahk.session().shutdown();
            match position {
                Some(p) => println!("{} {}", p.x, p.y),
                None => println!("{}", "(unknown)".dimmed()),
            }
        }
        Commands::Watch => watch(config).await?,
    }
    Ok(())
}

async fn watch(mut config: Config) -> Result<()> {
    config.handle_interrupt = true;
    let keys: Vec<String> = config.hotkeys.iter().map(|h| h.canonical_key()).collect();
    if keys.is_empty() {
        anyhow::bail!("no hotkeys configured");
    }

    let session = Session::open(config).await?;
    for key in &keys {
        let label = key.clone();
        let action = HotkeyAction::new(move || {
            let label = label.clone();
            async move {
                println!("{} {}", "hotkey".cyan().bold(), label);
                anyhow::Ok(())
            }
        });
        session.set_hotkey_action(key.clone(), action, true)?;
    }

    info!(hotkeys = keys.len(), "watching hotkeys, press Ctrl-C to stop");
    session.terminated().await;
    Ok(())
}
