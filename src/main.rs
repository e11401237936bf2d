use scoreboard::cli::Cli;
use scoreboard::config::Settings;
use scoreboard::core::{leaderboard::Leaderboard, mutations::Scorekeeper};
use scoreboard::scheduler::{JobProcess, Scheduler};
use scoreboard::server::{self, AppState};
use scoreboard::store::Stores;

use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Settings::new(Cli::parse_args())?;

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(settings.get_trace_level())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // One store handle for the whole process, shared by every request.
    let stores = Stores::connect(&settings).await?;
    let state = AppState {
        leaderboard: Leaderboard::new(&stores, settings.win_lookup_policy),
        scorekeeper: Scorekeeper::new(&stores),
    };
    info!(
        "Leaderboard ready, win lookup policy is {}.",
        state.leaderboard.policy()
    );

    // Kept alive until the server stops so the seeding job can finish.
    let _scheduler = match settings.seed {
        true => {
            let sched = Scheduler::new(state.scorekeeper.clone()).await?;
            sched.add_job(JobProcess::SeedLeaderboard).await?;
            info!("Starting scheduler to seed the leaderboard.");
            sched.start().await?;
            Some(sched)
        }
        false => None,
    };

    server::serve(&settings, state).await?;

    Ok(())
}
