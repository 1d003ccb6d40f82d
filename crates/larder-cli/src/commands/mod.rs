pub mod barcode;
pub mod completions;
pub mod donation;
pub mod init;
pub mod item;
pub mod login;
pub mod man_pages;
pub mod user;
pub mod verify_store;

use dialoguer::Password;
use larder_core::{DonationRecord, Engine, Permissions, StatusFilter, UserRecord};
use std::io::{stdin, IsTerminal};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_AUTH: u8 = 2;
pub const EXIT_STORE_ERROR: u8 = 3;

/// The `--user` / `--password` pair given on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Actor<'a> {
    pub user: Option<&'a str>,
    pub password: Option<&'a str>,
}

impl Actor<'_> {
    pub fn require_user(&self) -> Result<&str, String> {
        self.user
            .ok_or_else(|| "permission denied: this command needs --user".to_owned())
    }

    /// The acting user's password, prompting for it on a terminal.
    pub fn password(&self) -> Result<String, String> {
        let user = self.require_user()?;
        match self.password {
            Some(p) => Ok(p.to_owned()),
            None => prompt_password(&format!("password for {user}"), false)
                .map_err(|e| format!("permission denied: {e}")),
        }
    }
}

pub fn prompt_password(prompt: &str, confirm: bool) -> Result<String, String> {
    if !stdin().is_terminal() {
        return Err(format!("{prompt} required and stdin is not a terminal"));
    }
    let mut input = Password::new().with_prompt(prompt);
    if confirm {
        input = input.with_confirmation("confirm", "passwords do not match");
    }
    input.interact().map_err(|e| format!("prompt failed: {e}"))
}

/// Check the actor's credentials and required role before any engine call.
pub fn authorize(
    engine: &Engine,
    actor: &Actor<'_>,
    required: Permissions,
) -> Result<UserRecord, String> {
    let user = actor.require_user()?;
    let password = actor.password()?;
    engine
        .authorize(user, &password, required)
        .map_err(|e| e.to_string())
}

/// Listing flags: neither flag means both.
pub fn status_filter(pending: bool, completed: bool) -> StatusFilter {
    if !pending && !completed {
        StatusFilter::ALL
    } else {
        StatusFilter { pending, completed }
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "pending" => Style::new().yellow().apply_to(state).to_string(),
        "claimed" => Style::new().cyan().bold().apply_to(state).to_string(),
        "completed" => Style::new().green().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}

/// Donation as reported: the stored record plus its derived state.
pub fn donation_json(d: &DonationRecord) -> serde_json::Value {
    serde_json::json!({
        "id": d.id,
        "provider": d.provider,
        "receiver": d.receiver,
        "state": d.state().to_string(),
        "created_at": d.created_at,
        "completed_at": d.completed_at,
    })
}

pub fn print_donations(donations: &[DonationRecord], json: bool) -> Result<(), String> {
    if json {
        let payload: Vec<_> = donations.iter().map(donation_json).collect();
        println!("{}", json_pretty(&payload)?);
    } else if donations.is_empty() {
        println!("no donations found");
    } else {
        println!(
            "{:<6} {:<16} {:<16} {:<10} CREATED",
            "ID", "PROVIDER", "RECEIVER", "STATE"
        );
        for d in donations {
            let state = d.state().to_string();
            // Padded by hand: escape codes would skew `{:<10}`.
            let pad = " ".repeat(10usize.saturating_sub(state.len()));
            let state_col = format!("{}{pad}", colorize_state(&state));
            println!(
                "{:<6} {:<16} {:<16} {} {}",
                d.id,
                d.provider,
                d.receiver.as_deref().unwrap_or("-"),
                state_col,
                d.created_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
    Ok(())
}
