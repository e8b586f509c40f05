//! Default attribute definitions.
//!
//! The starter set mirrors what a capable assistant keeps track of about
//! the person they support: who they are, what they are working on, what
//! they know, and what they have decided.

use keepsake_core::attribute::AttributeDefinition;
use keepsake_core::store::AttributeStore;
use keepsake_core::Result;
use tracing::info;

fn default_definitions() -> Vec<(&'static str, &'static str, &'static str)> {
    vec![
        (
            "User Profile",
            "Extract user profile information from the text, including occupation, position, and personal details. Example: I am an engineer → engineer",
            "Does answering the following text require information about the user's profile, occupation, or personal details? Answer with 'yes' or 'no'.",
        ),
        (
            "Current Tasks & Projects",
            "Extract information about current tasks, projects, schedules, or goals from the text. Example: Meeting next Monday → Next Monday: Meeting",
            "Does answering the following text require information about the user's current tasks, projects, or schedules? Answer with 'yes' or 'no'.",
        ),
        (
            "Expertise & Skills",
            "Extract information about user's expertise, skills, or areas of interest from the text. Example: I often go hiking on weekends → hiking",
            "Does answering the following text require information about the user's expertise, skills, or interests? Answer with 'yes' or 'no'.",
        ),
        (
            "Past Decisions & Policies",
            "Extract information about user's past decisions, preferences, or policies from the text. Example: I prefer tea over coffee → prefers tea",
            "Does answering the following text require information about the user's past decisions, preferences, or policies? Answer with 'yes' or 'no'.",
        ),
    ]
}

/// Inserts the default definitions into `store`, returning how many were
/// added. Does not check for duplicates; callers decide whether seeding
/// an already-populated store makes sense.
pub async fn seed_default_definitions(store: &dyn AttributeStore) -> Result<usize> {
    let defaults = default_definitions();
    let mut inserted = 0;
    for (name, extraction_prompt, judgment_prompt) in &defaults {
        let definition = AttributeDefinition::new(*name, *extraction_prompt, *judgment_prompt)?;
        store.insert_definition(&definition).await?;
        inserted += 1;
    }
    info!("Seeded {inserted} default attribute definitions");
    Ok(inserted)
}
