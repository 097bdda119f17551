//! Builds the North America map pack: fetch public datasets, burn them onto a
//! fixed raster grid, derive terrain and biome layers, and package the result
//! for the terrain editor.
//!
//! Stage order:
//!   fetch → vector → raster → terrain → biomes → locations → package.

pub mod archive;
pub mod biomes;
pub mod config;
pub mod dem;
pub mod error;
pub mod fetch;
pub mod georaster;
pub mod grid;
pub mod highpoints;
pub mod legend;
pub mod locations;
pub mod names;
pub mod package;
pub mod pipeline;
pub mod raster;
pub mod terrain;
pub mod vector;

pub use error::{MapPackError, Result};
pub use grid::{BBox, Grid, Layer, PixelCoord};
