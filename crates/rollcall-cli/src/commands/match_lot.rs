use std::path::Path;

use rollcall_core::error::RollcallError;
use rollcall_core::matching::lots::find_matching_lot;
use rollcall_core::roster::load_roster;

pub fn run(detected: &str, roster_file: &Path) -> Result<(), RollcallError> {
    let roster = load_roster(roster_file)?;

    let found = find_matching_lot(detected, &roster.lots).ok_or_else(|| {
        RollcallError::LotNotMatched {
            detected: detected.to_string(),
        }
    })?;

    println!(
        "{} ({})  via {:?}",
        found.lot.name, found.lot.id, found.strategy
    );
    Ok(())
}
