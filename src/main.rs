// src/main.rs
//! quarry - CLI Entry Point

use anyhow::Result;
use clap::{ArgGroup, Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use quarry::query::ConfigMode;
use quarry::Environment;
use std::io;

mod commands;

// =============================================================================
// CLI Definitions
// =============================================================================

#[derive(Parser)]
#[command(name = "quarry")]
#[command(version)]
#[command(about = "Source-based package manager client", long_about = None)]
struct Cli {
    /// Answer yes to every prompt
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the client root with one or more remotes
    Init {
        /// Remote URLs (git remotes use a git:// or git+ scheme)
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// List all known packages
    List,

    /// Show details for one package
    Info {
        /// Package name
        name: String,
    },

    /// Search packages by name or description
    Search {
        /// Case-insensitive substring
        pattern: String,
    },

    /// Install a package
    Install {
        /// Package name, or name-version to pin an exact release
        package: String,
    },

    /// Remove an installed package
    Remove {
        /// Package name
        name: String,
    },

    /// Refresh the index from all configured remotes
    Update,

    /// Upgrade every installed package
    Upgrade,

    /// Publish a package to the configured remotes
    Upload {
        /// Spec file (the .spec suffix may be omitted)
        spec: String,
    },

    /// Print compiler and linker flags for installed packages
    Config(ConfigArgs),

    /// Manage the remote list
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
#[command(group(ArgGroup::new("mode").required(true)))]
struct ConfigArgs {
    /// Also emit flags for every dependency, dependencies first
    #[arg(short, long)]
    recursive: bool,

    /// Emit include directives only
    #[arg(long, group = "mode")]
    include: bool,

    /// Emit bytecode link lines
    #[arg(long, group = "mode")]
    bytelink: bool,

    /// Emit native link lines
    #[arg(long, group = "mode")]
    asmlink: bool,

    /// Installed package names
    #[arg(required = true)]
    names: Vec<String>,
}

#[derive(Subcommand)]
enum RemoteCommands {
    /// List configured remotes
    List,

    /// Add a plain remote
    Add {
        /// Remote URL
        url: String,
    },

    /// Add a git remote
    AddGit {
        /// Repository URL
        url: String,
    },

    /// Remove remotes matching a URL or hostname
    Rm {
        /// Rendered URL or bare hostname
        url_or_host: String,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let env = Environment::from_env();

    match cli.command {
        Some(Commands::Init { urls }) => commands::cmd_init(&env, &urls),

        Some(Commands::List) => commands::cmd_list(&env),

        Some(Commands::Info { name }) => commands::cmd_info(&env, &name),

        Some(Commands::Search { pattern }) => commands::cmd_search(&env, &pattern),

        Some(Commands::Install { package }) => commands::cmd_install(&env, &package, cli.yes),

        Some(Commands::Remove { name }) => commands::cmd_remove(&env, &name, cli.yes),

        Some(Commands::Update) => commands::cmd_update(&env),

        Some(Commands::Upgrade) => commands::cmd_upgrade(&env, cli.yes),

        Some(Commands::Upload { spec }) => commands::cmd_upload(&env, &spec, cli.yes),

        Some(Commands::Config(args)) => {
            let mode = if args.include {
                ConfigMode::Include
            } else if args.bytelink {
                ConfigMode::Bytelink
            } else {
                ConfigMode::Asmlink
            };
            commands::cmd_config(&env, args.recursive, mode, &args.names)
        }

        Some(Commands::Remote { command }) => match command {
            RemoteCommands::List => commands::cmd_remote_list(&env),
            RemoteCommands::Add { url } => commands::cmd_remote_add(&env, &url),
            RemoteCommands::AddGit { url } => commands::cmd_remote_add_git(&env, &url),
            RemoteCommands::Rm { url_or_host } => commands::cmd_remote_rm(&env, &url_or_host),
        },

        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "quarry", &mut io::stdout());
            Ok(())
        }

        None => {
            println!("quarry v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'quarry --help' for usage information");
            Ok(())
        }
    }
}
