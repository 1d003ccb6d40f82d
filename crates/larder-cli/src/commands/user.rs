use super::{authorize, json_pretty, prompt_password, Actor, EXIT_SUCCESS};
use larder_core::{Engine, Permissions, UserRecord};
use serde::Serialize;

/// A user as reported; the password hash never leaves the store.
#[derive(Serialize)]
struct UserView<'a> {
    user_id: &'a str,
    parent_id: Option<&'a str>,
    permissions: String,
    roles: Vec<&'static str>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl<'a> From<&'a UserRecord> for UserView<'a> {
    fn from(u: &'a UserRecord) -> Self {
        Self {
            user_id: &u.user_id,
            parent_id: u.parent_id.as_deref(),
            permissions: u.permissions.to_string(),
            roles: u.permissions.names(),
            created_at: u.created_at,
        }
    }
}

pub fn add(
    engine: &Engine,
    actor: &Actor<'_>,
    user_id: &str,
    permissions: &str,
    new_password: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let requested = permissions
        .parse::<Permissions>()
        .map_err(|e| e.to_string())?;
    let bootstrapped = engine.is_bootstrapped().map_err(|e| e.to_string())?;

    // The root user needs no parent; everyone after it is created by an
    // authenticated parent.
    let parent = if bootstrapped {
        Some(authorize(engine, actor, Permissions::NONE)?.user_id)
    } else {
        None
    };

    let existing = bootstrapped && engine.get_user(user_id).is_ok();
    let password = match new_password {
        Some(p) => p.to_owned(),
        // Updates never touch the password.
        None if existing => String::new(),
        None => prompt_password(&format!("password for new user {user_id}"), true)?,
    };

    let outcome = engine
        .write_user(parent.as_deref(), user_id, requested, &password)
        .map_err(|e| e.to_string())?;
    let user = engine.get_user(user_id).map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "outcome": outcome,
            "user": UserView::from(&user),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "{outcome} user '{}' with mask {} ({})",
            user.user_id,
            user.permissions,
            user.permissions.names().join("+")
        );
    }
    Ok(EXIT_SUCCESS)
}

pub fn list(engine: &Engine, json: bool) -> Result<u8, String> {
    let users = engine.list_users().map_err(|e| e.to_string())?;
    if json {
        let views: Vec<UserView<'_>> = users.iter().map(UserView::from).collect();
        println!("{}", json_pretty(&views)?);
    } else if users.is_empty() {
        println!("no users found");
    } else {
        println!("{:<16} {:<16} {:<6} ROLES", "USER", "PARENT", "MASK");
        for u in &users {
            println!(
                "{:<16} {:<16} {:<6} {}",
                u.user_id,
                u.parent_id.as_deref().unwrap_or("-"),
                u.permissions.to_string(),
                u.permissions.names().join("+")
            );
        }
    }
    Ok(EXIT_SUCCESS)
}

pub fn passwd(
    engine: &Engine,
    actor: &Actor<'_>,
    new_password: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let user = actor.require_user()?;
    let old = actor.password()?;
    let new = match new_password {
        Some(p) => p.to_owned(),
        None => prompt_password("new password", true)?,
    };
    engine
        .change_password(user, &old, &new)
        .map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&serde_json::json!({ "user_id": user }))?);
    } else {
        println!("password changed for '{user}'");
    }
    Ok(EXIT_SUCCESS)
}
