use minijinja::{context, Environment};
use once_cell::sync::Lazy;
use tracing::{error, info};

use crate::core::leaderboard::LeaderboardRow;
use crate::error::BoardResult;

const LEADERBOARD_TEMPLATE: &str = "leaderboard.txt";

// `.txt` templates are not auto-escaped, usernames are rendered verbatim.
static TEMPLATES_ENVIRONMENT: Lazy<Environment> = Lazy::new(|| {
    info!("Initializing templating engine environment.");
    let mut env = Environment::new();
    if let Err(e) = env.add_template(
        LEADERBOARD_TEMPLATE,
        "Leaderboard:\n\
        {% for row in rows -%}\n\
            {{ row.user }}: Points: {{ row.points }}, Wins: {{ row.wins }}\n\
        {% endfor %}",
    ) {
        error!("Could not load '{LEADERBOARD_TEMPLATE}' template. {e}");
    }
    env
});

// Plain text body: a header, then one line per row in leaderboard order.
pub fn leaderboard(rows: &[LeaderboardRow]) -> BoardResult<String> {
    let template = TEMPLATES_ENVIRONMENT.get_template(LEADERBOARD_TEMPLATE)?;
    Ok(template.render(context! { rows => rows })?)
}
