//! Command-line interface (§6), matching the teacher's `apps/skit-cli`
//! conventions: a config path, `--print-default-config`, and `-v`/`--verbose`.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Digital-cinema sync-signal server", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "dcsync-server.toml")]
    pub config: String,

    /// Print the default configuration as TOML and exit.
    #[arg(long)]
    pub print_default_config: bool,

    /// Raise the log level by one step (overrides the configured level).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
