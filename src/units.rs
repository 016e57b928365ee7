use log::info;

use crate::data::model::PanelTable;

/// TWh → kWh.
const TWH_TO_KWH: f64 = 1.0e9;

/// Rescale energy indicator columns from terawatt-hours to kilowatt-hours,
/// in place.  Columns are matched by a case-insensitive "energy" substring
/// in their name.
///
/// Runs strictly before log transformation: in log space the rescale is a
/// constant intercept shift, so applying it post-log would corrupt values
/// instead of shifting them.
pub fn convert_energy_units(table: &mut PanelTable) {
    let energy_columns: Vec<String> = table
        .columns
        .iter()
        .filter(|c| c.to_ascii_lowercase().contains("energy"))
        .cloned()
        .collect();

    if energy_columns.is_empty() {
        return;
    }
    info!("units: converting TWh → kWh for {energy_columns:?}");

    for row in &mut table.rows {
        for col in &energy_columns {
            if let Some(cell) = row.values.get_mut(col) {
                *cell = cell.map(|v| v * TWH_TO_KWH);
            }
        }
    }
}
