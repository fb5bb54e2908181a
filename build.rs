// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("quarry")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Source-based package manager client")
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Answer yes to every prompt"),
        )
        .subcommand(
            Command::new("init")
                .about("Initialize the client root with one or more remotes")
                .arg(Arg::new("urls").required(true).num_args(1..).help("Remote URLs")),
        )
        .subcommand(Command::new("list").about("List all known packages"))
        .subcommand(
            Command::new("info")
                .about("Show details for one package")
                .arg(Arg::new("name").required(true).help("Package name")),
        )
        .subcommand(
            Command::new("search")
                .about("Search packages by name or description")
                .arg(Arg::new("pattern").required(true).help("Case-insensitive substring")),
        )
        .subcommand(
            Command::new("install")
                .about("Install a package")
                .arg(Arg::new("package").required(true).help("Package name or name-version")),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove an installed package")
                .arg(Arg::new("name").required(true).help("Package name")),
        )
        .subcommand(Command::new("update").about("Refresh the index from all configured remotes"))
        .subcommand(Command::new("upgrade").about("Upgrade every installed package"))
        .subcommand(
            Command::new("upload")
                .about("Publish a package to the configured remotes")
                .arg(Arg::new("spec").required(true).help("Spec file")),
        )
        .subcommand(
            Command::new("config")
                .about("Print compiler and linker flags for installed packages")
                .arg(
                    Arg::new("recursive")
                        .short('r')
                        .long("recursive")
                        .action(ArgAction::SetTrue)
                        .help("Also emit flags for every dependency"),
                )
                .arg(Arg::new("include").long("include").action(ArgAction::SetTrue))
                .arg(Arg::new("bytelink").long("bytelink").action(ArgAction::SetTrue))
                .arg(Arg::new("asmlink").long("asmlink").action(ArgAction::SetTrue))
                .arg(Arg::new("names").required(true).num_args(1..)),
        )
        .subcommand(
            Command::new("remote")
                .about("Manage the remote list")
                .subcommand(Command::new("list").about("List configured remotes"))
                .subcommand(
                    Command::new("add")
                        .about("Add a plain remote")
                        .arg(Arg::new("url").required(true)),
                )
                .subcommand(
                    Command::new("add-git")
                        .about("Add a git remote")
                        .arg(Arg::new("url").required(true)),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Remove remotes matching a URL or hostname")
                        .arg(Arg::new("url_or_host").required(true)),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("quarry.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
