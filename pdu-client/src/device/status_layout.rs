//! Positional layout of the PDU status document.
//!
//! The device answers `statusjsn.js?components=16384` with an object whose
//! `sensor_values[1].values` array holds one element per outlet. Every outlet
//! element is an array of eight sensor entries `{"v": <number>, ...}` in a
//! fixed order, described by [`SensorSlot`].

use serde_json::Value;

use crate::device::error::ParseError;
use crate::domain::{Measurement, OutletReading, Snapshot};

/// Index into `sensor_values` of the per-outlet power sensor block.
pub const OUTLET_SENSOR_BLOCK: usize = 1;

/// Number of sensor entries reported for each outlet.
pub const SLOTS_PER_OUTLET: usize = 8;

/// Meaning of each sensor entry within an outlet element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorSlot {
    /// U [V]
    Voltage = 0,
    /// I [A]
    Current = 1,
    /// f [Hz], not persisted.
    Frequency = 2,
    /// arg(U) - arg(I) [deg], not persisted.
    Phase = 3,
    /// P [W]
    ActivePower = 4,
    /// Q [var], not persisted.
    ReactivePower = 5,
    /// |S| [VA], not persisted.
    ApparentPower = 6,
    /// cos(phi) = P / |S|
    PowerFactor = 7,
}

impl SensorSlot {
    pub const fn index(self) -> usize {
        self as usize
    }
}

fn field<'a>(value: &'a Value, key: &str, path: &str) -> Result<&'a Value, ParseError> {
    value
        .get(key)
        .ok_or_else(|| ParseError::MissingField(format!("{path}.{key}")))
}

fn array<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>, ParseError> {
    value
        .as_array()
        .ok_or_else(|| ParseError::NotAnArray(path.to_string()))
}

fn slot_value(
    entries: &[Value],
    outlet: usize,
    slot: SensorSlot,
) -> Result<Measurement, ParseError> {
    entries[slot.index()]
        .get("v")
        .and_then(Value::as_number)
        .map(|n| Measurement::from(n.clone()))
        .ok_or(ParseError::NonNumeric {
            outlet,
            slot: slot.index(),
        })
}

/// Locate the per-outlet array inside a parsed status document.
pub fn outlet_values(doc: &Value) -> Result<&Vec<Value>, ParseError> {
    let sensor_values = array(field(doc, "sensor_values", "$")?, "$.sensor_values")?;
    let block_path = format!("$.sensor_values[{OUTLET_SENSOR_BLOCK}]");
    let block = sensor_values
        .get(OUTLET_SENSOR_BLOCK)
        .ok_or_else(|| ParseError::MissingField(block_path.clone()))?;
    let values_path = format!("{block_path}.values");
    array(field(block, "values", &block_path)?, &values_path)
}

/// Map one outlet element to a reading. `outlet` is its position in the array.
pub fn outlet_reading(outlet: usize, element: &Value) -> Result<OutletReading, ParseError> {
    let entries = array(element, &format!("outlet[{outlet}]"))?;
    if entries.len() != SLOTS_PER_OUTLET {
        return Err(ParseError::SlotCount {
            outlet,
            expected: SLOTS_PER_OUTLET,
            found: entries.len(),
        });
    }

    let outlet_id = u32::try_from(outlet).map_err(|_| ParseError::OutletIndex(outlet))?;

    Ok(OutletReading {
        outlet_id,
        voltage: slot_value(entries, outlet, SensorSlot::Voltage)?,
        current: slot_value(entries, outlet, SensorSlot::Current)?,
        active_power: slot_value(entries, outlet, SensorSlot::ActivePower)?,
        power_factor: slot_value(entries, outlet, SensorSlot::PowerFactor)?,
    })
}

/// Parse a status body into a snapshot stamped with `timestamp`.
///
/// Only the first line of `body` is considered. Any deviation from the
/// expected layout is reported as a [`ParseError`]; nothing is partially
/// returned.
pub fn extract_snapshot(timestamp: i64, body: &str) -> Result<Snapshot, ParseError> {
    let line = body.lines().next().unwrap_or("");
    let doc: Value = serde_json::from_str(line)?;

    let readings = outlet_values(&doc)?
        .iter()
        .enumerate()
        .map(|(outlet, element)| outlet_reading(outlet, element))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Snapshot {
        timestamp,
        readings,
    })
}
