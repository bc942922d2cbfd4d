//! Dependency resolution between units.
//!
//! Runs once every unit exists and the [`OutputIndex`] is built. Paths a unit
//! consumes that another unit produces become unit-level dependencies, so the
//! sorter can place producers first.

use super::output_index::OutputIndex;
use super::shell::quote_arg;
use super::{BuildUnit, CommandStep};
use crate::hasher::short_hash;

/// Resolve compile batch, command and link inputs of every unit.
pub(crate) fn resolve_units(units: &mut [BuildUnit], index: &OutputIndex, shell: &str) {
    for unit in units.iter_mut() {
        resolve_batches(unit, index);
        resolve_command_inputs(unit, index);
        resolve_link_inputs(unit, index);
        add_object_dependency_steps(unit, shell);
    }
}

fn resolve_batches(unit: &mut BuildUnit, index: &OutputIndex) {
    let unit_name = unit.name.clone();
    let mut found = Vec::new();
    for batch in &mut unit.compile_batches {
        batch.extra_dependencies.retain(|path| {
            if index.resolve(path).is_none() {
                return true;
            }
            if let Some(producer) = index.resolve_for(&unit_name, path) {
                tracing::debug!(
                    unit = %unit_name,
                    batch = %batch.name,
                    path = %path,
                    producer = %producer.unit,
                    "object dependency resolved to another unit"
                );
                batch.pre_build_dependencies.insert(producer.unit.clone());
                found.push(producer.unit.clone());
            }
            false
        });
    }
    unit.dependencies.extend(found);
}

fn resolve_command_inputs(unit: &mut BuildUnit, index: &OutputIndex) {
    let found: Vec<String> = unit
        .all_commands()
        .flat_map(|step| step.inputs.iter())
        .filter_map(|input| index.resolve_for(&unit.name, input))
        .map(|producer| producer.unit.clone())
        .collect();
    for producer in found {
        tracing::debug!(unit = %unit.name, producer = %producer, "command input produced elsewhere");
        unit.dependencies.insert(producer);
    }
}

fn resolve_link_inputs(unit: &mut BuildUnit, index: &OutputIndex) {
    let Some(link) = &unit.link else { return };
    let found: Vec<String> = link
        .libraries
        .iter()
        .filter_map(|library| index.resolve_for(&unit.name, library))
        .map(|producer| producer.unit.clone())
        .collect();
    unit.dependencies.extend(found);
}

/// Touch each source of a batch whose dependencies nothing builds, so a
/// change to them still triggers recompilation.
fn add_object_dependency_steps(unit: &mut BuildUnit, shell: &str) {
    let mut steps = Vec::new();
    for batch in &unit.compile_batches {
        if batch.extra_dependencies.is_empty() {
            continue;
        }
        for input in &batch.inputs {
            let name = format!(
                "object-dependencies-{}",
                short_hash(&format!("{input}{}", batch.name))
            );
            steps.push(CommandStep {
                executable: shell.to_owned(),
                arguments: format!("-c \"touch {}\"", quote_arg(input)),
                inputs: batch.extra_dependencies.iter().cloned().collect(),
                output: format!("dummy-{name}.txt"),
                use_stdout_as_output: true,
                name,
                ..CommandStep::default()
            });
        }
    }
    unit.commands.extend(steps);
}
