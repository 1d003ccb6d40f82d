use super::{json_pretty, EXIT_SUCCESS};
use larder_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    engine.initialize().map_err(|e| e.to_string())?;
    let bootstrapped = engine.is_bootstrapped().map_err(|e| e.to_string())?;
    let root = engine.store_layout().root();

    if json {
        let payload = serde_json::json!({
            "store": root.display().to_string(),
            "bootstrapped": bootstrapped,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("initialized store at {}", root.display());
        if !bootstrapped {
            println!("no users yet: run 'larder user add <id>' to create the root user");
        }
    }
    Ok(EXIT_SUCCESS)
}
