use super::{authorize, json_pretty, Actor, EXIT_SUCCESS};
use larder_core::{DonationId, Engine, ItemId, Permissions};

fn report(engine: &Engine, donation: DonationId, item_id: ItemId, json: bool) -> Result<(), String> {
    let items = engine.get_items(donation).map_err(|e| e.to_string())?;
    let Some(item) = items.into_iter().find(|i| i.id == item_id) else {
        return Err(format!("item {item_id} vanished from donation {donation}"));
    };
    if json {
        println!("{}", json_pretty(&item)?);
    } else {
        println!(
            "donation {donation}: item {} '{}' now {} {}",
            item.id, item.title, item.count, item.unit
        );
    }
    Ok(())
}

/// Authorize a provider and check that `donation` is theirs. A donation's
/// provider is fixed when it starts, so the check holds through the add.
fn own_donation(engine: &Engine, actor: &Actor<'_>, donation: DonationId) -> Result<(), String> {
    let provider = authorize(engine, actor, Permissions::PROVIDER)?;
    let record = engine.get_donation(donation).map_err(|e| e.to_string())?;
    if record.provider != provider.user_id {
        return Err(format!(
            "permission denied: donation {donation} belongs to provider '{}'",
            record.provider
        ));
    }
    Ok(())
}

pub fn add(
    engine: &Engine,
    actor: &Actor<'_>,
    donation: DonationId,
    title: &str,
    count: i64,
    unit: &str,
    json: bool,
) -> Result<u8, String> {
    own_donation(engine, actor, donation)?;
    let item = engine
        .add_item_manual(donation, title, count, unit)
        .map_err(|e| e.to_string())?;
    report(engine, donation, item, json)?;
    Ok(EXIT_SUCCESS)
}

pub fn scan(
    engine: &Engine,
    actor: &Actor<'_>,
    donation: DonationId,
    code: &str,
    count: i64,
    json: bool,
) -> Result<u8, String> {
    own_donation(engine, actor, donation)?;
    let item = engine
        .add_item_barcode(donation, code, count)
        .map_err(|e| e.to_string())?;
    report(engine, donation, item, json)?;
    Ok(EXIT_SUCCESS)
}
