//! `callbridge native`: call an ahead-of-time compiled export directly

use super::call::result_line;
use crate::locator;
use crate::GlobalOpts;
use anyhow::Context;
use callbridge_host::{load_export, SystemLoader, DEFAULT_EXPORT};
use callbridge_logger as logger;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
pub struct NativeCommand {
    /// Regex matched against file names, e.g. '^libnative.*\.so$'
    pub pattern: String,

    /// First operand
    #[arg(default_value_t = 1, allow_negative_numbers = true)]
    pub a: i32,

    /// Second operand
    #[arg(default_value_t = 1, allow_negative_numbers = true)]
    pub b: i32,

    /// Directory to search (default: the directory of this executable)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Exported symbol to call
    #[arg(long, default_value = DEFAULT_EXPORT)]
    pub symbol: String,
}

pub fn handle_native(cmd: NativeCommand, _opts: &GlobalOpts) -> anyhow::Result<()> {
    let dir = match cmd.dir {
        Some(dir) => dir,
        None => default_search_dir()?,
    };
    logger::debug(&format!(
        "Searching {} for '{}'",
        dir.display(),
        cmd.pattern
    ));

    let library = locator::locate(&dir, &cmd.pattern)?;
    let callable = load_export(&SystemLoader, &library, &cmd.symbol)?;
    let result = callable.invoke(cmd.a, cmd.b)?;
    println!("{}", result_line(result));
    Ok(())
}

fn default_search_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to resolve the executable path")?;
    Ok(exe
        .parent()
        .map_or_else(|| PathBuf::from("."), PathBuf::from))
}
