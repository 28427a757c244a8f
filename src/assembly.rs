//! Element-level evaluation and parallel global assembly.
//!
//! - [`cache`] precomputes per-element basis data once.
//! - [`global`] scatters element quantities into global vectors and CSR matrices.
//! - [`stokes`], [`convection`] and [`mixed`] build the blocks of (Navier-)Stokes systems.
pub mod cache;
pub mod convection;
pub mod global;
pub mod mixed;
pub mod stokes;

pub use cache::{AssemblyValuesCache, ElementAssemblyValues};
