//! Lowering of custom commands and build-event steps.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::cycle;
use super::layout::TargetLayout;
use super::shell::{command_line, quote_arg};
use super::{CommandStep, IrGenError, Script};
use crate::ast::CommandSpec;
use crate::diagnostics::{Diagnostics, GenWarning};
use crate::hasher::{CommandDeduplicator, short_hash};
use crate::toposort::{DependencyMap, sort_by_dependencies};

/// Directory under a target's binary directory that receives step scripts.
const SCRIPT_DIR: &str = ".bffgen";

/// Point in a unit's build at which build-event steps run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuildStage {
    PreBuild,
    PreLink,
    PostBuild,
}

impl BuildStage {
    const fn as_str(self) -> &'static str {
        match self {
            Self::PreBuild => "PreBuild",
            Self::PreLink => "PreLink",
            Self::PostBuild => "PostBuild",
        }
    }
}

/// Lowers the command specs of one target.
pub(crate) struct CommandLowering<'a> {
    unit: &'a str,
    layout: &'a TargetLayout<'a>,
    dedup: &'a mut CommandDeduplicator,
    shell: &'a str,
    multi_output: bool,
}

impl<'a> CommandLowering<'a> {
    pub(crate) fn new(
        unit: &'a str,
        layout: &'a TargetLayout<'a>,
        dedup: &'a mut CommandDeduplicator,
        shell: &'a str,
        multi_output: bool,
    ) -> Self {
        Self {
            unit,
            layout,
            dedup,
            shell,
            multi_output,
        }
    }

    /// Lower build-event steps. Each step runs after the one before it.
    pub(crate) fn build_steps(
        &mut self,
        stage: BuildStage,
        specs: &[CommandSpec],
    ) -> Result<Vec<CommandStep>, IrGenError> {
        let prefix = self.layout.generated(self.unit);
        let mut steps: Vec<CommandStep> = Vec::new();
        let mut previous: Option<String> = None;
        for (index, spec) in specs.iter().enumerate() {
            let disambiguator = format!("{prefix}_{}_{}", stage.as_str(), index + 1);
            let mut lowered = self.lower(&disambiguator, spec)?;
            if let (Some(prev), Some(first)) = (&previous, lowered.first_mut()) {
                first.pre_build_dependencies.insert(prev.clone());
            }
            previous = lowered.first().map(|step| step.name.clone());
            steps.append(&mut lowered);
        }
        link_local_inputs(&mut steps);
        Ok(steps)
    }

    /// Lower custom commands and order them by the files they exchange.
    pub(crate) fn custom_commands(
        &mut self,
        specs: &[CommandSpec],
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<CommandStep>, IrGenError> {
        let prefix = self.layout.generated(self.unit);
        let mut unique: IndexMap<String, CommandStep> = IndexMap::new();
        for (index, spec) in specs.iter().enumerate() {
            let disambiguator = if spec.outputs.is_empty() && spec.byproducts.is_empty() {
                format!("{prefix}_Command_{}", index + 1)
            } else {
                String::new()
            };
            for step in self.lower(&disambiguator, spec)? {
                if unique.contains_key(&step.name) {
                    tracing::debug!(unit = %self.unit, step = %step.name, "dropping repeated command");
                    continue;
                }
                unique.insert(step.name.clone(), step);
            }
        }
        let mut steps: Vec<CommandStep> = unique.into_values().collect();
        link_local_inputs(&mut steps);

        let deps: DependencyMap<String> = steps
            .iter()
            .flat_map(|step| {
                step.pre_build_dependencies
                    .iter()
                    .map(|dep| (step.name.clone(), dep.clone()))
            })
            .collect();
        let mut names: Vec<String> = steps.iter().map(|step| step.name.clone()).collect();
        let outcome = sort_by_dependencies(&mut names, &deps);
        if !outcome.is_acyclic() {
            let found = cycle::analyse(&outcome.flushed, &deps).cycle;
            diagnostics.push(GenWarning::CyclicDependency {
                scope: format!("custom commands of unit '{}'", self.unit),
                cycle: found.unwrap_or_else(|| outcome.flushed.clone()),
                flushed: outcome.flushed,
            });
        }
        let mut by_name: HashMap<String, CommandStep> = steps
            .into_iter()
            .map(|step| (step.name.clone(), step))
            .collect();
        Ok(names
            .into_iter()
            .filter_map(|name| by_name.remove(&name))
            .collect())
    }

    fn lower(&mut self, disambiguator: &str, spec: &CommandSpec) -> Result<Vec<CommandStep>, IrGenError> {
        let declared: Vec<String> = spec
            .outputs
            .iter()
            .chain(&spec.byproducts)
            .map(|path| self.layout.generated(path))
            .collect();
        let name = self.dedup.identity(disambiguator, &declared)?;
        let symbolic: Vec<String> = spec.symbolic.iter().map(|path| self.layout.generated(path)).collect();
        let outputs: Vec<String> = declared
            .into_iter()
            .filter(|path| !symbolic.contains(path))
            .collect();
        let inputs: Vec<String> = spec.depends.iter().map(|path| self.layout.generated(path)).collect();
        let working_dir = spec.working_dir.as_deref().map_or_else(
            || self.layout.binary_dir(),
            |dir| self.layout.generated(dir),
        );
        let argvs: Vec<&Vec<String>> = spec.commands.iter().filter(|argv| !argv.is_empty()).collect();
        let is_noop = argvs.is_empty();

        let mut step = CommandStep {
            name: name.clone(),
            always_run: inputs.is_empty(),
            inputs,
            working_dir: Some(working_dir.clone()),
            is_noop,
            ..CommandStep::default()
        };
        if !is_noop {
            let script_path = self.layout.generated(&format!("{SCRIPT_DIR}/{name}.sh"));
            let mut lines = vec![format!("cd {}", quote_arg(&working_dir))];
            lines.extend(argvs.iter().map(|argv| command_line(argv)));
            step.executable = self.shell.to_owned();
            step.arguments = quote_arg(&script_path);
            step.script = Some(Script {
                path: script_path,
                lines,
            });
        }

        let mut outputs = outputs.into_iter();
        let Some(first) = outputs.next() else {
            step.output = format!("dummy-out-{name}.txt");
            step.use_stdout_as_output = true;
            return Ok(vec![step]);
        };
        step.output = first.clone();
        let rest: Vec<String> = outputs.collect();
        if self.multi_output {
            step.extra_outputs = rest;
            return Ok(vec![step]);
        }
        let touches = rest.iter().map(|output| self.touch_step(&name, &first, output));
        Ok(std::iter::once(step).chain(touches).collect())
    }

    /// Step standing in for one extra output of `producer`.
    fn touch_step(&self, producer: &str, producer_output: &str, output: &str) -> CommandStep {
        let mut step = CommandStep {
            name: format!("{producer}-{}", short_hash(output)),
            executable: self.shell.to_owned(),
            arguments: format!("-c \"touch {}\"", quote_arg(output)),
            inputs: vec![producer_output.to_owned()],
            output: output.to_owned(),
            ..CommandStep::default()
        };
        step.pre_build_dependencies.insert(producer.to_owned());
        step
    }
}

/// Make steps depend on siblings producing their inputs.
fn link_local_inputs(steps: &mut [CommandStep]) {
    let producers: HashMap<String, String> = steps
        .iter()
        .flat_map(|step| {
            step.outputs()
                .map(|output| (output.to_owned(), step.name.clone()))
                .collect::<Vec<_>>()
        })
        .collect();
    for step in steps.iter_mut() {
        let found: Vec<String> = step
            .inputs
            .iter()
            .filter_map(|input| producers.get(input))
            .filter(|producer| **producer != step.name)
            .cloned()
            .collect();
        step.pre_build_dependencies.extend(found);
    }
}
