//! Nonlinear solvers and constraint handling.
pub mod constraints;
pub mod navier_stokes;

pub use navier_stokes::{
    NavierStokesError, NavierStokesSettings, SolverDiagnostics, StokesBlocks, TransientNavierStokesSolver,
};
