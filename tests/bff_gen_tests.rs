//! Tests for FASTBuild file generation from lowered models.

use anyhow::{Context, Result, ensure};
use bffgen::bff_gen::{self, BuildFileFormat, DISCLAIMER, Fastbuild};
use bffgen::diagnostics::Diagnostics;
use bffgen::ir::{BuildGraph, GenerationOptions};
use bffgen::model;

fn generate(yaml: &str) -> Result<String> {
    let target_model = model::from_str(yaml).context("parse model")?;
    let mut diagnostics = Diagnostics::new();
    let graph = BuildGraph::from_model(&target_model, &GenerationOptions::default(), &mut diagnostics)
        .context("lower model")?;
    Ok(bff_gen::generate(&graph).into_string())
}

fn section<'a>(text: &'a str, unit: &str) -> Result<&'a str> {
    let marker = format!("// Target definition: {unit}\n");
    let start = text.find(&marker).with_context(|| format!("no section for {unit}"))?;
    let rest = text.get(start..).context("section start")?;
    let end = rest
        .get(marker.len()..)
        .and_then(|tail| tail.find("// Target definition: "))
        .map_or(rest.len(), |offset| offset + marker.len());
    rest.get(..end).context("section end")
}

#[test]
fn file_starts_with_header_and_settings() -> Result<()> {
    let text = generate(include_str!("data/app.yml"))?;
    ensure!(text.starts_with(DISCLAIMER), "missing disclaimer");
    ensure!(
        text.contains(".FB_INPUT_1_PLACEHOLDER = '\"%1\"'"),
        "missing input placeholder"
    );
    ensure!(
        text.contains(".CachePath = '/work/build/fbuild.cache'"),
        "missing cache path"
    );
    ensure!(text.contains("Compiler('Compiler-CXX')"), "missing compiler");
    Ok(())
}

#[test]
fn units_appear_in_dependency_order() -> Result<()> {
    let text = generate(include_str!("data/app.yml"))?;
    let position = |unit: &str| text.find(&format!("// Target definition: {unit}\n"));
    let order = ["noop", "core", "version", "app", "all"].map(position);
    ensure!(order.iter().all(Option::is_some), "missing section: {order:?}");
    ensure!(
        order.windows(2).all(|pair| matches!(pair, [a, b] if a < b)),
        "sections out of order: {order:?}"
    );
    Ok(())
}

#[test]
fn consumer_waits_for_producer_units() -> Result<()> {
    let text = generate(include_str!("data/app.yml"))?;
    let app = section(&text, "app")?;
    ensure!(app.contains("  ObjectList('CXX_ObjectGroup_app--1')"), "{app}");
    ensure!(app.contains("  Executable('app')"), "{app}");
    ensure!(app.contains("'version-products'"), "{app}");
    ensure!(app.contains("'core-products'"), "{app}");
    let core = section(&text, "core")?;
    ensure!(core.contains("  Library('core')"), "{core}");
    Ok(())
}

#[test]
fn all_alias_lists_every_target() -> Result<()> {
    let text = generate(include_str!("data/app.yml"))?;
    let all = section(&text, "all")?;
    ensure!(all.contains("Alias('all')"), "{all}");
    for product in ["'app-products'", "'core-products'", "'version-products'"] {
        ensure!(all.contains(product), "missing {product} in {all}");
    }
    Ok(())
}

#[test]
fn fastbuild_splits_multi_output_steps() {
    assert!(!Fastbuild.supports_multi_output_steps());
}
