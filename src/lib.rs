//! svgsqueeze - a multipass SVG optimizer
//!
//! svgsqueeze parses SVG into an arena tree, runs a configurable pipeline of
//! plugins over it (CSS inlining, path merging, attribute hoisting and the
//! usual cleanups), and serializes the result, repeating while that keeps
//! making the output smaller.

mod ast;
mod collections;
mod config;
mod css;
mod datauri;
mod error;
mod geometry;
mod optimize;
mod parse;
mod path;
mod plugin;
pub mod plugins;
mod select;
mod serialize;
mod style;

pub use ast::*;
pub use collections::*;
pub use config::*;
pub use css::*;
pub use datauri::*;
pub use error::*;
pub use geometry::*;
pub use optimize::*;
pub use parse::*;
pub use path::*;
pub use plugin::*;
pub use select::*;
pub use serialize::*;
pub use style::*;

/// Optimize an SVG string with the default preset.
pub fn optimize(svg: &str) -> Result<String, SqueezeError> {
    let optimizer = Optimizer::new(Config::default())?;
    Ok(optimizer.optimize(svg, Info::default())?.data)
}
