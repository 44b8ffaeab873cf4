//! Shell completions and man pages, generated from the clap definition.

use std::io::Write;
use std::path::PathBuf;

use clap::{Command, CommandFactory};

use crate::Cli;

/// The command tree after `build`, which fills in the hyphenated display
/// names (`steward-gitlab-bulk`) the man pages are titled with.
fn built_cli() -> Command {
    let mut cmd = Cli::command().disable_help_subcommand(true);
    cmd.build();
    cmd
}

/// Follow `path` (e.g. `["gitlab", "bulk"]`) down from `root`.
fn find_command<'a>(root: &'a Command, path: &[String]) -> Option<&'a Command> {
    path.iter()
        .try_fold(root, |cmd, name| cmd.find_subcommand(name))
}

/// `root` and every visible command below it, parents before children.
fn command_tree(root: &Command) -> Vec<&Command> {
    let mut commands = vec![root];
    for sub in root.get_subcommands().filter(|s| !s.is_hide_set()) {
        commands.extend(command_tree(sub));
    }
    commands
}

fn completion_script(shell: clap_complete::Shell) -> Vec<u8> {
    let mut out = Vec::new();
    clap_complete::generate(shell, &mut Cli::command(), "steward", &mut out);
    out
}

fn man_page(cmd: &Command) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    clap_mangen::Man::new(cmd.clone()).render(&mut out)?;
    Ok(out)
}

pub(crate) fn handle_completions(
    shell: clap_complete::Shell,
) -> Result<(), Box<dyn std::error::Error>> {
    std::io::stdout().write_all(&completion_script(shell))?;
    Ok(())
}

/// Print the page for `command` (the whole CLI when empty), or with
/// `output` write it and every page below it into that directory.
pub(crate) fn handle_man(
    output: Option<PathBuf>,
    command: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let root = built_cli();
    let target = find_command(&root, command)
        .ok_or_else(|| format!("no such command: {}", command.join(" ")))?;

    let Some(dir) = output else {
        std::io::stdout().write_all(&man_page(target)?)?;
        return Ok(());
    };

    std::fs::create_dir_all(&dir)?;
    let pages = command_tree(target);
    for cmd in &pages {
        let path = clap_mangen::Man::new((*cmd).clone()).generate_to(&dir)?;
        tracing::debug!(page = %path.display(), "Wrote man page");
    }
    println!("Wrote {} man pages to {}", pages.len(), dir.display());

    Ok(())
}
