use super::{authorize, json_pretty, Actor, EXIT_SUCCESS};
use larder_core::{Engine, Permissions};

pub fn run(engine: &Engine, actor: &Actor<'_>, json: bool) -> Result<u8, String> {
    let user = authorize(engine, actor, Permissions::NONE)?;

    if json {
        let payload = serde_json::json!({
            "user_id": user.user_id,
            "permissions": user.permissions.to_string(),
            "roles": user.permissions.names(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "logged in as '{}' ({})",
            user.user_id,
            user.permissions.names().join("+")
        );
    }
    Ok(EXIT_SUCCESS)
}
