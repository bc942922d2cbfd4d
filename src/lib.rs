//! bffgen core library.
//!
//! This library lowers a resolved target model into a dependency-ordered
//! build graph and serializes that graph as a FASTBuild (`.bff`) file. The
//! command line interface definitions and the runner that ties loading,
//! lowering and writing together live here too.

pub mod ast;
pub mod bff_gen;
pub mod cli;
pub mod diagnostics;
pub mod hasher;
pub mod ir;
pub mod model;
pub mod paths;
pub mod runner;
pub mod toposort;
