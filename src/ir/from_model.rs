//! Model-to-graph lowering.
//!
//! One call to [`BuildGraph::from_model`] owns every piece of pass state: the
//! compiler registry, the command identity table, the output index and the
//! collected warnings. Nothing survives the call, so repeated passes in one
//! process never share identities.

use std::collections::{HashMap, HashSet};

use super::commands::{BuildStage, CommandLowering};
use super::compile::compile_batches;
use super::compilers::CompilerRegistry;
use super::cycle;
use super::globals::{all_unit, noop_unit, rebuild_unit};
use super::layout::TargetLayout;
use super::link::{link_step, linked_object_libraries, objects_alias};
use super::output_index::OutputIndex;
use super::pch::PchReuseTracker;
use super::resolve::resolve_units;
use super::{AliasGroup, BuildGraph, BuildUnit, GenerationOptions, IrGenError, Settings};
use crate::ast::{TargetKind, TargetModel, TargetSpec};
use crate::diagnostics::{Diagnostics, GenWarning};
use crate::hasher::CommandDeduplicator;
use crate::paths::PathTools;
use crate::toposort::{DependencyMap, sort_by_dependencies};

/// Name of the FASTBuild object cache directory inside the build root.
const DEFAULT_CACHE_DIR: &str = "fbuild.cache";

struct Pass<'a> {
    model: &'a TargetModel,
    options: &'a GenerationOptions,
    tools: PathTools,
    registry: CompilerRegistry,
    dedup: CommandDeduplicator,
    object_libraries: HashSet<&'a str>,
}

impl BuildGraph {
    /// Lower a target model into an ordered [`BuildGraph`].
    ///
    /// Recoverable findings such as dependency cycles are pushed onto
    /// `diagnostics`; lowering carries on past them.
    ///
    /// # Errors
    ///
    /// Returns [`IrGenError`] when unit names clash, a command identity
    /// collides, a source language has no compiler, a command cannot be split
    /// or a linked target has no link command.
    pub fn from_model(
        model: &TargetModel,
        options: &GenerationOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, IrGenError> {
        let mut pass = Pass::new(model, options);
        let shell = model.settings.shell.as_str();

        let mut units = vec![noop_unit(shell)];
        for target in &model.targets {
            units.push(pass.lower_target(target, diagnostics)?);
        }
        units.push(all_unit(&units));
        if let Some(spec) = &model.regenerate
            && let Some(unit) = rebuild_unit(spec, &pass.tools, &options.build_file)
        {
            units.push(unit);
        }
        check_unique_names(&units)?;

        let index = OutputIndex::build(&units);
        resolve_units(&mut units, &index, shell);
        let mut ordered = order_units(units, diagnostics);
        report_unresolved(&ordered, diagnostics);
        PchReuseTracker::new().apply(&mut ordered);
        pass.dedup.retain_first(&mut ordered);

        Ok(Self {
            build_dir: pass.tools.build_dir().to_string(),
            settings: pass.settings(),
            compilers: pass.registry.into_map(),
            units: ordered,
        })
    }
}

impl<'a> Pass<'a> {
    fn new(model: &'a TargetModel, options: &'a GenerationOptions) -> Self {
        let object_libraries = model
            .targets
            .iter()
            .filter(|target| target.kind == TargetKind::ObjectLibrary && !target.sources.is_empty())
            .map(|target| target.name.as_str())
            .collect();
        Self {
            model,
            options,
            tools: PathTools::new(&model.build_dir),
            registry: CompilerRegistry::from_specs(&model.compilers),
            dedup: CommandDeduplicator::new(),
            object_libraries,
        }
    }

    fn lower_target(
        &mut self,
        target: &TargetSpec,
        diagnostics: &mut Diagnostics,
    ) -> Result<BuildUnit, IrGenError> {
        tracing::debug!(target = %target.name, kind = ?target.kind, "lowering target");
        let layout = TargetLayout::new(&self.tools, self.model, target);
        let mut unit = BuildUnit::new(target.name.clone());
        unit.variables.clone_from(&target.variables);
        unit.is_global = target.kind == TargetKind::Global;
        unit.is_excluded = target.excluded;
        unit.dependencies.extend(target.depends.iter().cloned());
        if let Some(reuse) = target.pch.as_ref().and_then(|pch| pch.reuse_from.as_ref()) {
            unit.dependencies.insert(reuse.clone());
        }
        unit.dependencies.extend(
            linked_object_libraries(target, &self.object_libraries)
                .into_iter()
                .map(str::to_owned),
        );

        {
            let mut lowering = CommandLowering::new(
                &target.name,
                &layout,
                &mut self.dedup,
                &self.model.settings.shell,
                self.options.multi_output_steps,
            );
            unit.pre_build = lowering.build_steps(BuildStage::PreBuild, &target.pre_build)?;
            unit.commands = lowering.custom_commands(&target.custom_commands, diagnostics)?;
            unit.pre_link = lowering.build_steps(BuildStage::PreLink, &target.pre_link)?;
            unit.post_build = lowering.build_steps(BuildStage::PostBuild, &target.post_build)?;
        }

        unit.compile_batches = compile_batches(target, &layout, &mut self.registry, diagnostics)?;
        unit.link = link_step(target, &layout, &unit.compile_batches, &self.object_libraries)?;
        if !unit.compile_batches.is_empty() {
            unit.aliases.push(AliasGroup::new(
                objects_alias(&unit.name),
                unit.compile_batches.iter().map(|batch| batch.name.clone()),
            ));
        }
        Ok(unit)
    }

    fn settings(&self) -> Settings {
        let cache_path = self
            .options
            .cache_path
            .clone()
            .or_else(|| self.model.settings.cache_path.clone())
            .unwrap_or_else(|| PathTools::join(self.tools.build_dir().as_str(), DEFAULT_CACHE_DIR));
        let mut environment = self.model.settings.environment.clone();
        environment.extend(self.options.environment.iter().cloned());
        Settings {
            cache_path,
            environment,
            shell: self.model.settings.shell.clone(),
        }
    }
}

fn check_unique_names(units: &[BuildUnit]) -> Result<(), IrGenError> {
    let mut seen = HashSet::new();
    for unit in units {
        if !seen.insert(unit.name.as_str()) {
            return Err(IrGenError::DuplicateUnit {
                name: unit.name.clone(),
            });
        }
    }
    Ok(())
}

/// Sort units so dependencies come first and report what could not be
/// ordered.
fn order_units(units: Vec<BuildUnit>, diagnostics: &mut Diagnostics) -> Vec<BuildUnit> {
    let deps: DependencyMap<String> = units
        .iter()
        .flat_map(|unit| {
            unit.dependencies
                .iter()
                .map(|dep| (unit.name.clone(), dep.clone()))
        })
        .collect();
    let mut names: Vec<String> = units.iter().map(|unit| unit.name.clone()).collect();
    let outcome = sort_by_dependencies(&mut names, &deps);
    if !outcome.is_acyclic() {
        let found = cycle::analyse(&outcome.flushed, &deps).cycle;
        diagnostics.push(GenWarning::CyclicDependency {
            scope: String::from("units"),
            cycle: found.unwrap_or_else(|| outcome.flushed.clone()),
            flushed: outcome.flushed,
        });
    }

    let mut by_name: HashMap<String, BuildUnit> = units
        .into_iter()
        .map(|unit| (unit.name.clone(), unit))
        .collect();
    let ordered: Vec<BuildUnit> = names
        .into_iter()
        .filter_map(|name| by_name.remove(&name))
        .collect();
    check_order(&ordered, diagnostics);
    ordered
}

/// Warn about every dependency emitted at or after its dependent.
fn check_order(units: &[BuildUnit], diagnostics: &mut Diagnostics) {
    let position: HashMap<&str, usize> = units
        .iter()
        .enumerate()
        .map(|(index, unit)| (unit.name.as_str(), index))
        .collect();
    for (index, unit) in units.iter().enumerate() {
        for dep in &unit.dependencies {
            if position.get(dep.as_str()).is_some_and(|found| *found >= index) {
                diagnostics.push(GenWarning::OrderViolation {
                    unit: unit.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
}

fn report_unresolved(units: &[BuildUnit], diagnostics: &mut Diagnostics) {
    let known: HashSet<&str> = units.iter().map(|unit| unit.name.as_str()).collect();
    for unit in units {
        for dep in &unit.dependencies {
            if !known.contains(dep.as_str()) {
                diagnostics.push(GenWarning::UnresolvedDependency {
                    unit: unit.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
}
