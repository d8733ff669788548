//! Validation of hover payloads reported by the host session.
//!
//! Accepted shapes:
//!
//! ```text
//! null
//! {"kind": "genome_position", "refName": "chr1", "coord": 1200}
//! {"hoverPosition": {"refName": "chr1", "coord": 1200}}
//! {"refName": "chr1", "coord": 1200}
//! {"residue": 42, "structureId": "1abc"}
//! ```
//!
//! Objects matching none of these are treated as "nothing hovered".

use crate::error::CrosswalkError;
use crosswalk_protocol::HoverState;
use serde_json::Value;

fn genome_position(obj: &serde_json::Map<String, Value>) -> Result<HoverState, CrosswalkError> {
    let ref_name = obj
        .get("refName")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| CrosswalkError::invalid_input("Hovered genome position has no refName"))?;
    let coord = obj.get("coord").and_then(Value::as_u64).ok_or_else(|| {
        CrosswalkError::invalid_input(format!(
            "Hovered genome position on '{ref_name}' has no non-negative integer coord"
        ))
    })?;
    Ok(HoverState::GenomePosition {
        ref_name: ref_name.to_string(),
        coord,
    })
}

fn structure_residue(obj: &serde_json::Map<String, Value>) -> Result<HoverState, CrosswalkError> {
    let residue = obj
        .get("residue")
        .and_then(Value::as_u64)
        .and_then(|r| usize::try_from(r).ok())
        .ok_or_else(|| {
            CrosswalkError::invalid_input("Hovered structure residue must be a non-negative integer")
        })?;
    let structure_id = obj
        .get("structureId")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(HoverState::StructureResidue {
        structure_id,
        residue,
    })
}

pub fn parse_host_hover(value: &Value) -> Result<HoverState, CrosswalkError> {
    let obj = match value {
        Value::Null => return Ok(HoverState::None),
        Value::Object(obj) => obj,
        other => {
            return Err(CrosswalkError::invalid_input(format!(
                "Hover payload must be an object or null, got {other}"
            )));
        }
    };

    if obj.contains_key("kind") {
        return serde_json::from_value(value.clone()).map_err(|e| {
            CrosswalkError::invalid_input(format!("Invalid tagged hover payload: {e}"))
        });
    }
    if let Some(position) = obj.get("hoverPosition") {
        return match position {
            Value::Null => Ok(HoverState::None),
            Value::Object(inner) => genome_position(inner),
            other => Err(CrosswalkError::invalid_input(format!(
                "hoverPosition must be an object, got {other}"
            ))),
        };
    }
    if obj.contains_key("coord") {
        return genome_position(obj);
    }
    if obj.contains_key("residue") {
        return structure_residue(obj);
    }
    log::debug!("ignoring unrecognised hover payload {value}");
    Ok(HoverState::None)
}
