use super::{json_pretty, EXIT_STORE_ERROR, EXIT_SUCCESS};
use larder_core::Engine;
use larder_store::verify_store_integrity;

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    let report = verify_store_integrity(engine.store_layout()).map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        println!(
            "store integrity: {}/{} records passed",
            report.passed(),
            report.checked()
        );
        for (table, t) in [
            ("users", report.users),
            ("barcodes", report.barcodes),
            ("donations", report.donations),
            ("items", report.items),
        ] {
            println!("  {table:<10} {}/{}", t.passed, t.checked);
        }
        for f in &report.failed {
            println!("  FAIL {}/{}: {}", f.table, f.key, f.reason);
        }
    }

    if report.failed.is_empty() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_STORE_ERROR)
    }
}
