//! Id lookup by exact match or unique prefix.

use anyhow::{Result, bail};

use gears_core::{GearId, GearSystem, OutputId};

fn resolve<'a>(kind: &str, query: &str, ids: impl Iterator<Item = &'a str>) -> Result<&'a str> {
    let query = query.trim();
    if query.is_empty() {
        bail!("empty {kind} id");
    }

    let mut matches = Vec::new();
    for id in ids {
        if id == query {
            return Ok(id);
        }
        if id.starts_with(query) {
            matches.push(id);
        }
    }

    match matches.as_slice() {
        [] => bail!("no {kind} matches '{query}'"),
        [one] => Ok(*one),
        many => bail!(
            "'{query}' is ambiguous: matches {} {kind}s ({})",
            many.len(),
            many.join(", ")
        ),
    }
}

pub fn resolve_gear(system: &GearSystem, query: &str) -> Result<GearId> {
    let ids = system.gears().iter().map(|g| g.id.as_str());
    // Ids may be written with or without the `gear_` prefix
    let found = resolve("gear", query, ids.clone())
        .or_else(|e| resolve("gear", &format!("gear_{query}"), ids).map_err(|_| e))?;
    Ok(GearId::from(found))
}

pub fn resolve_output(system: &GearSystem, query: &str) -> Result<OutputId> {
    let ids = system.outputs().iter().map(|o| o.id.as_str());
    let found = resolve("output", query, ids.clone())
        .or_else(|e| resolve("output", &format!("output_{query}"), ids).map_err(|_| e))?;
    Ok(OutputId::from(found))
}
