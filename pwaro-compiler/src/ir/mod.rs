//! Intermediate Representation (IR) module.
//!
//! This module contains the AST, the LLVM-shaped IR with its builder and
//! verifier, and the AST-to-IR lowering engine.

pub mod ast;
pub mod builder;
pub mod error_utils;
pub mod ir;
pub mod ir_generator;
pub mod symbol_table;
pub mod types;
pub mod verify;

pub use ir::*;
pub use types::Ty;
