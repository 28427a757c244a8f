//! Nonlinear finite element solve core.
//!
//! The crate provides parallel element assembly on Lagrange discretizations of quadrilateral
//! and hexahedral meshes, interchangeable sparse linear solver backends and a transient
//! Navier-Stokes solver combining Picard and Newton iterations. Hyperelastic material models
//! live in the `tangent-solid` crate, and dual numbers for automatic differentiation in
//! `tangent-autodiff` (re-exported as [`autodiff`]).
pub mod assembly;
pub mod basis;
pub mod linear;
pub mod mesh;
pub mod quadrature;
pub mod solver;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

pub use tangent_autodiff as autodiff;
