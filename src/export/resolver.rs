//! Dependency resolution for exporter/importer units.

use super::unit::{ProjectExporter, UnitId};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Which direction's dependency declarations drive the ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Order by [`ProjectExporter::export_dependencies`].
    Export,
    /// Order by [`ProjectExporter::import_dependencies`].
    Import,
}

fn dependencies_of(unit: &dyn ProjectExporter, direction: Direction) -> Vec<UnitId> {
    match direction {
        Direction::Export => unit.export_dependencies(),
        Direction::Import => unit.import_dependencies(),
    }
}

/// Topologically orders `units` so every unit runs after all of its
/// dependencies that are present in the run.
///
/// Dependencies on units absent from the run are ignored, so partial
/// pipelines resolve. Ties are broken by registration order, so the same
/// unit set always yields the same order. A cycle among present units is a
/// configuration error reported before anything executes.
pub(crate) fn resolve_order(
    units: &[Arc<dyn ProjectExporter>],
    direction: Direction,
) -> Result<Vec<Arc<dyn ProjectExporter>>> {
    let position: HashMap<UnitId, usize> = units
        .iter()
        .enumerate()
        .map(|(index, unit)| (unit.id(), index))
        .collect();

    // In-degrees over the dependency relation restricted to present units.
    let mut in_degree = vec![0_usize; units.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); units.len()];
    for (index, unit) in units.iter().enumerate() {
        for dependency in dependencies_of(unit.as_ref(), direction) {
            if let Some(&dep_index) = position.get(dependency) {
                in_degree[index] += 1;
                dependents[dep_index].push(index);
            }
        }
    }

    // Kahn's algorithm; always extract the lowest registration index among
    // the ready units to keep the order deterministic.
    let mut ready: Vec<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(index, _)| index)
        .collect();
    let mut ordered = Vec::with_capacity(units.len());

    while !ready.is_empty() {
        let slot = ready
            .iter()
            .enumerate()
            .min_by_key(|&(_, &index)| index)
            .map_or(0, |(slot, _)| slot);
        let index = ready.swap_remove(slot);
        ordered.push(Arc::clone(&units[index]));
        for &dependent in &dependents[index] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(dependent);
            }
        }
    }

    if ordered.len() < units.len() {
        let cycle: Vec<UnitId> = units
            .iter()
            .enumerate()
            .filter(|(index, _)| in_degree[*index] > 0)
            .map(|(_, unit)| unit.id())
            .collect();
        return Err(Error::CyclicDependency {
            cycle: cycle.join(" -> "),
        });
    }

    Ok(ordered)
}

/// Validates that every dependency declared by any registered unit, in both
/// directions, names a registered unit.
///
/// Runs once at service construction; the registry fails closed instead of
/// silently skipping an unknown id at run time.
pub(crate) fn validate_registry(units: &[Arc<dyn ProjectExporter>]) -> Result<()> {
    let known: Vec<UnitId> = units.iter().map(|unit| unit.id()).collect();
    for unit in units {
        for dependency in unit
            .export_dependencies()
            .into_iter()
            .chain(unit.import_dependencies())
        {
            if !known.contains(&dependency) {
                return Err(Error::UnknownDependency {
                    unit: unit.id().to_string(),
                    dependency: dependency.to_string(),
                });
            }
        }
    }
    Ok(())
}
