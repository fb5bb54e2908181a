// src/commands/mod.rs
//! Command handlers for the quarry CLI

mod init;
mod install;
mod query;
mod remote;
mod update;
mod upload;

pub use init::cmd_init;
pub use install::{cmd_install, cmd_remove, cmd_upgrade};
pub use query::{cmd_config, cmd_info, cmd_list, cmd_search};
pub use remote::{cmd_remote_add, cmd_remote_add_git, cmd_remote_list, cmd_remote_rm};
pub use update::cmd_update;
pub use upload::cmd_upload;

use quarry::{AssumeYes, Environment, Prompter, Snapshot, StdinPrompter};

/// Pick the prompter: `--yes` accepts everything without asking
pub fn make_prompter(yes: bool) -> Box<dyn Prompter> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinPrompter)
    }
}

/// Load the snapshot for the configured root
fn load_snapshot(env: &Environment) -> anyhow::Result<Snapshot> {
    Ok(quarry::state::load(env)?)
}

/// Print the new-package notifications of an update run
fn report_update(report: &quarry::repository::UpdateReport) {
    for nv in &report.new_packages {
        println!("New package available: {nv}");
    }
    for (remote, reason) in &report.failed {
        eprintln!("warning: remote {remote} failed: {reason}");
    }
}
