use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use vfs_alias_kit::{Shell, VirtualDirectory};

/// Interactive virtual directory over reference-counted host files.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Host directory holding the physical files.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Reject reads and writes past the current end of a file.
    #[arg(long, default_value_t = false)]
    bounds_check: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let mut vd = VirtualDirectory::new(&args.root)
        .with_context(|| format!("cannot open store at {}", args.root.display()))?;
    vd.set_bounds_check(args.bounds_check);

    let stdin = std::io::stdin();
    let mut shell = Shell::new(vd);
    shell.run(stdin.lock(), &mut std::io::stdout(), &mut std::io::stderr())
}
