use super::{
    authorize, colorize_state, donation_json, json_pretty, print_donations, Actor, EXIT_SUCCESS,
};
use larder_core::{DonationId, Engine, Permissions, StatusFilter};

pub fn start(
    engine: &Engine,
    actor: &Actor<'_>,
    receiver: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let provider = authorize(engine, actor, Permissions::PROVIDER)?;
    let id = engine
        .start_donation(&provider.user_id, receiver)
        .map_err(|e| e.to_string())?;

    if json {
        let donation = engine.get_donation(id).map_err(|e| e.to_string())?;
        println!("{}", json_pretty(&donation_json(&donation))?);
    } else {
        println!("started donation {id}");
    }
    Ok(EXIT_SUCCESS)
}

pub fn list(
    engine: &Engine,
    provider: Option<&str>,
    filter: StatusFilter,
    json: bool,
) -> Result<u8, String> {
    let provider = provider.ok_or_else(|| "donation list needs --provider or --user".to_owned())?;
    let donations = engine
        .list_donations(provider, filter)
        .map_err(|e| e.to_string())?;
    print_donations(&donations, json)?;
    Ok(EXIT_SUCCESS)
}

pub fn open(engine: &Engine, json: bool) -> Result<u8, String> {
    let donations = engine.list_open_donations().map_err(|e| e.to_string())?;
    print_donations(&donations, json)?;
    Ok(EXIT_SUCCESS)
}

pub fn history(
    engine: &Engine,
    actor: &Actor<'_>,
    filter: StatusFilter,
    json: bool,
) -> Result<u8, String> {
    let receiver = authorize(engine, actor, Permissions::RECEIVER)?;
    let donations = engine
        .list_receiver_donations(&receiver.user_id, filter)
        .map_err(|e| e.to_string())?;
    print_donations(&donations, json)?;
    Ok(EXIT_SUCCESS)
}

pub fn show(engine: &Engine, id: DonationId, json: bool) -> Result<u8, String> {
    let donation = engine.get_donation(id).map_err(|e| e.to_string())?;
    let items = engine.get_items(id).map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "donation": donation_json(&donation),
            "items": items,
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("donation:  {}", donation.id);
    println!("state:     {}", colorize_state(&donation.state().to_string()));
    println!("provider:  {}", donation.provider);
    println!(
        "receiver:  {}",
        donation.receiver.as_deref().unwrap_or("(unclaimed)")
    );
    println!("created:   {}", donation.created_at.to_rfc3339());
    if let Some(done) = donation.completed_at {
        println!("completed: {}", done.to_rfc3339());
    }
    if items.is_empty() {
        println!("items:     (none)");
    } else {
        println!("items:");
        for item in &items {
            let barcode = item
                .barcode
                .as_deref()
                .map(|b| format!(" [{b}]"))
                .unwrap_or_default();
            println!(
                "  {:>4}  {:>6} {:<8} {}{barcode}",
                item.id, item.count, item.unit, item.title
            );
        }
    }
    Ok(EXIT_SUCCESS)
}

pub fn claim(engine: &Engine, actor: &Actor<'_>, id: DonationId, json: bool) -> Result<u8, String> {
    let receiver = authorize(engine, actor, Permissions::RECEIVER)?;
    engine
        .claim(id, &receiver.user_id)
        .map_err(|e| e.to_string())?;

    if json {
        let donation = engine.get_donation(id).map_err(|e| e.to_string())?;
        println!("{}", json_pretty(&donation_json(&donation))?);
    } else {
        println!("donation {id} claimed by '{}'", receiver.user_id);
    }
    Ok(EXIT_SUCCESS)
}

pub fn complete(
    engine: &Engine,
    actor: &Actor<'_>,
    id: DonationId,
    json: bool,
) -> Result<u8, String> {
    let user = authorize(engine, actor, Permissions::NONE)?;
    let at = engine
        .complete_as(id, &user.user_id)
        .map_err(|e| e.to_string())?;

    if json {
        let donation = engine.get_donation(id).map_err(|e| e.to_string())?;
        println!("{}", json_pretty(&donation_json(&donation))?);
    } else {
        println!("donation {id} completed at {}", at.to_rfc3339());
    }
    Ok(EXIT_SUCCESS)
}
