use super::{json_pretty, EXIT_SUCCESS};
use larder_core::Engine;

pub fn add(engine: &Engine, code: &str, title: &str, unit: &str, json: bool) -> Result<u8, String> {
    let barcode = engine
        .add_barcode(code, title, unit)
        .map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&barcode)?);
    } else {
        println!(
            "registered {} as '{}' ({})",
            barcode.code, barcode.title, barcode.unit
        );
    }
    Ok(EXIT_SUCCESS)
}

pub fn list(engine: &Engine, json: bool) -> Result<u8, String> {
    let barcodes = engine.list_barcodes().map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&barcodes)?);
    } else if barcodes.is_empty() {
        println!("no barcodes registered");
    } else {
        println!("{:<20} {:<24} UNIT", "CODE", "TITLE");
        for b in &barcodes {
            println!("{:<20} {:<24} {}", b.code, b.title, b.unit);
        }
    }
    Ok(EXIT_SUCCESS)
}
