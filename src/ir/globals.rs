//! Built-in units every build file carries.

use std::collections::BTreeSet;

use super::shell::command_line;
use super::{AliasGroup, BuildUnit, CommandStep};
use crate::ast::RegenerateSpec;
use crate::paths::PathTools;

/// Unit doing nothing, used when a group would otherwise be empty.
pub const NOOP_UNIT: &str = "noop";
/// Unit building every non-excluded target.
pub const ALL_UNIT: &str = "all";
/// Unit regenerating the build file.
pub const REBUILD_UNIT: &str = "rebuild-bff";

/// The `noop` unit: a shell no-op capturing its empty output.
pub(crate) fn noop_unit(shell: &str) -> BuildUnit {
    let mut unit = BuildUnit::new(NOOP_UNIT);
    unit.is_global = true;
    unit.commands.push(CommandStep {
        name: NOOP_UNIT.to_owned(),
        executable: shell.to_owned(),
        arguments: String::from("-c :"),
        output: String::from("noop.txt"),
        use_stdout_as_output: true,
        always_run: true,
        ..CommandStep::default()
    });
    unit
}

/// The `all` unit over the products of `units`.
///
/// Global and excluded units are skipped. Without any remaining unit the
/// alias falls back to `noop`.
pub(crate) fn all_unit(units: &[BuildUnit]) -> BuildUnit {
    let mut targets: BTreeSet<String> = units
        .iter()
        .filter(|unit| !unit.is_global && !unit.is_excluded)
        .map(BuildUnit::products_alias)
        .collect();
    if targets.is_empty() {
        targets.insert(NOOP_UNIT.to_owned());
    }
    let mut unit = BuildUnit::new(ALL_UNIT);
    unit.is_global = true;
    unit.dependencies.extend(
        units
            .iter()
            .filter(|unit| !unit.is_global && !unit.is_excluded)
            .map(|unit| unit.name.clone()),
    );
    unit.aliases.push(AliasGroup {
        name: ALL_UNIT.to_owned(),
        targets,
    });
    unit
}

/// The `rebuild-bff` unit re-running the generator when a model input
/// changes.
pub(crate) fn rebuild_unit(spec: &RegenerateSpec, tools: &PathTools, build_file: &str) -> Option<BuildUnit> {
    let (program, args) = spec.command.split_first()?;
    let inputs: BTreeSet<String> = spec
        .inputs
        .iter()
        .map(|input| tools.to_build_relative(input))
        .collect();
    let mut unit = BuildUnit::new(REBUILD_UNIT);
    unit.is_global = true;
    unit.commands.push(CommandStep {
        name: REBUILD_UNIT.to_owned(),
        executable: program.clone(),
        arguments: command_line(args),
        always_run: inputs.is_empty(),
        inputs: inputs.into_iter().collect(),
        output: build_file.to_owned(),
        ..CommandStep::default()
    });
    Some(unit)
}
