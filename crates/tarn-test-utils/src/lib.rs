//! Shared test tooling for the workspace: lattice law assertions, a
//! concrete reference interpreter, and a seeded random program generator.

pub mod exec;
pub mod gen;
pub mod lattice;

pub use exec::{execute, Trace};
pub use gen::{random_function, GenConfig};
pub use lattice::{assert_lattice_laws, assert_widening_laws};
