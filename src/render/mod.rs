//! Layout and SVG rendering
//!
//! This module is organized into submodules:
//! - `object`: the per-object record every statement fills in
//! - `shapes`: per-class behavior (sizing, chopping, drawing)
//! - `path_builder`: accumulates line movements into a path
//! - `context`: [`RenderContext`], the document state statements act on
//! - `eval`: expressions, positions and object references
//! - `layout`: attributes and object placement
//! - `text`: label slots, measurement and escaping
//! - `svg`: number formatting and SVG generation
//! - `variables`, `colors`: built-in tables

pub mod colors;
pub mod context;
mod eval;
mod layout;
pub mod object;
pub(crate) mod path_builder;
pub mod shapes;
pub mod svg;
pub mod text;
pub mod variables;

pub use context::{Output, RenderContext};
pub use svg::{DocumentOptions, PIKCHR_DATE};
