use tokio_cron_scheduler::{Job, JobScheduler};

use std::time::Duration;
use tokio::time;
use tracing::{error, info};

use crate::core::mutations::Scorekeeper;
use crate::error::BoardResult;

// Simulated activity used to seed an empty leaderboard.
pub const SEED_USERS: [&'static str; 5] = ["user1", "user2", "user3", "user4", "user5"];
pub const SEED_EVENTS_PER_USER: usize = 10;
const SEED_ACTIVITY_DELAY: Duration = Duration::from_millis(100);

pub struct Scheduler {
    scheduler: JobScheduler,
    scorekeeper: Scorekeeper,
}

pub enum JobProcess {
    SeedLeaderboard,
}

impl Scheduler {
    pub async fn new(scorekeeper: Scorekeeper) -> BoardResult<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Scheduler {
            scheduler,
            scorekeeper,
        })
    }

    pub async fn add_job(&self, job_process: JobProcess) -> BoardResult<uuid::Uuid> {
        let job = match job_process {
            JobProcess::SeedLeaderboard => seed_leaderboard_job(self.scorekeeper.clone()).await?,
        };
        Ok(self.scheduler.add(job).await?)
    }

    pub async fn start(&self) -> BoardResult<()> {
        Ok(self.scheduler.start().await?)
    }
}

//////////////////
// Jobs definition
//////////////////

async fn seed_leaderboard_job(scorekeeper: Scorekeeper) -> BoardResult<Job> {
    // Only runs once, right after the scheduler starts.
    let job = Job::new_one_shot_async(Duration::from_secs(0), move |_uuid, _l| {
        let scorekeeper = scorekeeper.clone();
        Box::pin(async move {
            let recorded = seed_leaderboard(&scorekeeper, SEED_ACTIVITY_DELAY).await;
            info!("Seeded leaderboard with {recorded} score events.");
        })
    })?;
    Ok(job)
}

// Returns how many score events were recorded. Failures are logged and
// skipped, seeding never stops the service.
pub async fn seed_leaderboard(scorekeeper: &Scorekeeper, delay: Duration) -> usize {
    let mut recorded = 0;
    for user in SEED_USERS {
        for _ in 0..SEED_EVENTS_PER_USER {
            match scorekeeper.record_score_event(user).await {
                Ok(()) => recorded += 1,
                Err(e) => error!("Could not seed points for '{user}'. {e}"),
            }
            time::sleep(delay).await;
        }
    }
    recorded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::leaderboard::{Leaderboard, WinLookupPolicy};
    use crate::store::{MemoryStore, Stores};

    #[tokio::test]
    async fn seeding_gives_every_seed_user_the_same_points() {
        let stores = Stores::memory(MemoryStore::new());
        let recorded = seed_leaderboard(&Scorekeeper::new(&stores), Duration::ZERO).await;
        assert_eq!(recorded, SEED_USERS.len() * SEED_EVENTS_PER_USER);

        let rows = Leaderboard::new(&stores, WinLookupPolicy::Strict)
            .build()
            .await
            .unwrap();
        assert_eq!(rows.len(), SEED_USERS.len());
        assert!(rows
            .iter()
            .all(|r| r.points == SEED_EVENTS_PER_USER as i64 && r.wins == 0));
    }
}
