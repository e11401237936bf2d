use clap::Parser;
use serde::Serialize;

fn is_false(b: &bool) -> bool { !b }

#[derive(Debug, Default, Parser, Serialize)]
#[command(name = "scoreboard", about = "Points and wins leaderboard over Redis")]
pub struct Cli {
    /// Simulate some activity at startup to seed the leaderboard
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub seed: bool,

    /// Port to listen on
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Keep scores in process memory instead of Redis
    #[arg(long)]
    #[serde(skip_serializing)]
    pub memory: bool,

    // Derived from `memory`, only forwarded to the settings when the flag is set.
    #[arg(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_backend: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        let mut cli = Cli::parse();
        if cli.memory {
            cli.store_backend = Some("memory".to_string());
        }
        cli
    }
}
