//! Scene snapshot model and parser
//!
//! Strongly-typed scene state for the convergence loop:
//! - [`SceneState`] and its entity types (objects, lights, cameras, materials)
//! - [`SceneParser`], a total parser over the 3D tool's scene descriptions
//!
//! # Example
//!
//! ```rust
//! use sca_scene::SceneParser;
//!
//! let parser = SceneParser::new();
//! let state = parser.parse("Object: Chair\nLocation: (1.0, 2.0, 0.0)\n");
//! assert_eq!(state.objects[0].name, "Chair");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod parser;
pub mod types;

pub use parser::SceneParser;
pub use types::{
    BoundingBox, Color, SceneCamera, SceneLight, SceneMaterial, SceneObject, SceneState, Vec3,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
