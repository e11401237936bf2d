pub mod display;
pub mod leaderboard;
pub mod mutations;
