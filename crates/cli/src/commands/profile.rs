//! `doki profile`: what a learner has studied so far.

use crate::runtime;

pub async fn run(user: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = runtime::load_config()?;
    let brain = runtime::build_brain(&config).await?;
    let overview = brain.overview(user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    println!("📊 Study profile for {user}");
    println!("  Interactions:    {}", overview.total_interactions);
    println!("  Stored answers:  {}", overview.knowledge_summary.total_entries);
    println!();

    if overview.profile.is_empty() {
        println!("  Nothing studied yet. Try `doki chat`.");
        return Ok(());
    }

    for row in overview.leaderboard() {
        println!(
            "  {:>2}. {} {:<20} {:>5.1}  {:<13} {} interações",
            row.position,
            row.icon,
            row.display_name,
            row.score,
            row.level.label(),
            row.interactions
        );
    }
    Ok(())
}
