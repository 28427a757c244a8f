//! One implicit time step of the incompressible Navier-Stokes equations.
//!
//! The mixed system is solved by Picard iterations to a loose tolerance, followed by Newton
//! iterations to the final tolerance. Both phases use the full nonlinear residual
//!
//! ```text
//! r(x) = b - A_picard(x) x
//! ```
//!
//! and update `x <- x + dx` where `A dx = r`, with `A` the Picard matrix or the Newton
//! Jacobian respectively.
use crate::assembly::cache::AssemblyValuesCache;
use crate::assembly::convection::{assemble_convection_matrix, Linearization};
use crate::assembly::mixed::{merge_mixed_matrices, MixedLayout};
use crate::assembly::stokes::{
    assemble_divergence, assemble_pressure_stabilization, assemble_vector_laplacian, assemble_vector_mass,
};
use crate::linear::{
    create_linear_solver, spmv, LinearSolveError, LinearSolver, LinearSolverKind, LinearSolverSettings,
    PreconditionerKind,
};
use crate::solver::constraints::{
    compute_residual, dirichlet_solve, find_singular_columns, merge_sorted_unique, zero_entries, DirichletBoundary,
    SINGULAR_COLUMN_TOLERANCE,
};
use log::{debug, error, info, warn};
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavierStokesSettings {
    /// Residual norm at which Newton iterations stop.
    pub tolerance: f64,
    /// Maximum number of iterations of each phase.
    pub max_iterations: usize,
    /// Residual norm at which Picard iterations hand over to Newton.
    pub picard_tolerance: f64,
    /// Factor applied to the `M / dt` block by the time integrator.
    pub time_integration_coefficient: f64,
    pub linear_solver: LinearSolverKind,
    pub preconditioner: PreconditionerKind,
    pub linear_solver_settings: LinearSolverSettings,
}

impl Default for NavierStokesSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 100,
            picard_tolerance: 1e-3,
            time_integration_coefficient: 1.0,
            linear_solver: LinearSolverKind::default(),
            preconditioner: PreconditionerKind::default(),
            linear_solver_settings: LinearSolverSettings::default(),
        }
    }
}

/// Timings and convergence history of a solve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverDiagnostics {
    pub linear_solver: String,
    /// Total number of nonlinear iterations (Picard and Newton).
    pub iteration_count: usize,
    pub picard_iterations: usize,
    pub newton_iterations: usize,
    pub final_residual_norm: f64,
    /// Total time spent assembling nonlinear systems.
    pub assembly_time_seconds: f64,
    /// Total time spent in linear solves of the nonlinear iterations.
    pub solve_time_seconds: f64,
    pub stokes_assembly_time_seconds: f64,
    pub stokes_solve_time_seconds: f64,
    /// Residual norms of the Picard phase, starting with the initial residual.
    pub picard_residuals: Vec<f64>,
    /// Residual norms of the Newton phase, starting with the initial residual.
    pub newton_residuals: Vec<f64>,
}

impl SolverDiagnostics {
    pub fn mean_assembly_time_seconds(&self) -> f64 {
        self.assembly_time_seconds / self.iteration_count.max(1) as f64
    }

    pub fn mean_solve_time_seconds(&self) -> f64 {
        self.solve_time_seconds / self.iteration_count.max(1) as f64
    }

    /// Summary of the solve as JSON.
    ///
    /// Keys follow the field names of [`SolverDiagnostics`]. The short aliases `iterations`,
    /// `time_assembly` and `time_solving` are kept for existing report scripts.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "linear_solver": self.linear_solver,
            "iteration_count": self.iteration_count,
            "iterations": self.iteration_count,
            "picard_iterations": self.picard_iterations,
            "newton_iterations": self.newton_iterations,
            "final_residual_norm": self.final_residual_norm,
            "assembly_time_seconds": self.assembly_time_seconds,
            "solve_time_seconds": self.solve_time_seconds,
            "time_assembly": self.assembly_time_seconds,
            "time_solving": self.solve_time_seconds,
            "mean_time_assembly": self.mean_assembly_time_seconds(),
            "mean_time_solving": self.mean_solve_time_seconds(),
            "time_stokes_assembly": self.stokes_assembly_time_seconds,
            "time_stokes_solve": self.stokes_solve_time_seconds,
            "picard_residuals": self.picard_residuals,
            "newton_residuals": self.newton_residuals,
        })
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum NavierStokesError {
    InvalidInput(String),
    Assembly(eyre::Report),
    LinearSolve {
        iteration: usize,
        residual_norm: f64,
        source: LinearSolveError,
    },
    MaximumIterationsReached {
        phase: Linearization,
        iterations: usize,
        residual_norm: f64,
    },
    NonFiniteResidual {
        phase: Linearization,
        iteration: usize,
    },
}

impl fmt::Display for NavierStokesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "Invalid input: {}", message),
            Self::Assembly(report) => write!(f, "Assembly failed: {}", report),
            Self::LinearSolve {
                iteration,
                residual_norm,
                source,
            } => write!(
                f,
                "Linear solve failed in iteration {} (residual norm {:e}): {}",
                iteration, residual_norm, source
            ),
            Self::MaximumIterationsReached {
                phase,
                iterations,
                residual_norm,
            } => write!(
                f,
                "{} iteration did not converge within {} iterations (residual norm {:e})",
                phase, iterations, residual_norm
            ),
            Self::NonFiniteResidual { phase, iteration } => {
                write!(f, "Non-finite residual in {} iteration {}", phase, iteration)
            }
        }
    }
}

impl Error for NavierStokesError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Assembly(report) => Some(report.as_ref()),
            Self::LinearSolve { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<eyre::Report> for NavierStokesError {
    fn from(report: eyre::Report) -> Self {
        Self::Assembly(report)
    }
}

/// The linear blocks of the Navier-Stokes system.
#[derive(Debug, Clone, PartialEq)]
pub struct StokesBlocks {
    /// Viscous block `K` (`n_v x n_v`).
    pub stiffness: CsrMatrix<f64>,
    /// Coupling block `B` (`n_p x n_v`).
    pub mixed: CsrMatrix<f64>,
    /// Pressure block `C` (`n_p x n_p`).
    pub pressure: CsrMatrix<f64>,
    /// Velocity mass matrix `M` (`n_v x n_v`).
    pub mass: CsrMatrix<f64>,
}

impl StokesBlocks {
    /// Assembles the blocks for the given velocity and pressure discretizations.
    ///
    /// `pressure_stabilization` is the coefficient of the Brezzi-Pitkaranta term, needed for
    /// equal-order velocity-pressure pairs. Zero disables it.
    pub fn assemble(
        velocity: &AssemblyValuesCache,
        pressure: &AssemblyValuesCache,
        viscosity: f64,
        pressure_stabilization: f64,
    ) -> eyre::Result<Self> {
        Ok(Self {
            stiffness: assemble_vector_laplacian(velocity, viscosity)?,
            mixed: assemble_divergence(velocity, pressure)?,
            pressure: assemble_pressure_stabilization(pressure, pressure_stabilization)?,
            mass: assemble_vector_mass(velocity, 1.0)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct PhaseOutcome {
    iterations: usize,
    residual_norm: f64,
    converged: bool,
}

/// Transient Navier-Stokes solver for one time step.
#[derive(Debug)]
pub struct TransientNavierStokesSolver<'a> {
    settings: NavierStokesSettings,
    velocity_cache: &'a AssemblyValuesCache,
    layout: MixedLayout,
    blocks: StokesBlocks,
}

impl<'a> TransientNavierStokesSolver<'a> {
    pub fn new(
        settings: NavierStokesSettings,
        velocity_cache: &'a AssemblyValuesCache,
        layout: MixedLayout,
        blocks: StokesBlocks,
    ) -> Result<Self, NavierStokesError> {
        let n_v = layout.num_velocity_dofs();
        let n_p = layout.num_pressure_dofs();
        let expected_n_v = velocity_cache.dimension() * velocity_cache.num_bases();
        if n_v != expected_n_v {
            return Err(NavierStokesError::InvalidInput(format!(
                "layout has {} velocity dofs, the velocity discretization has {}",
                n_v, expected_n_v
            )));
        }
        let check = |name: &str, matrix: &CsrMatrix<f64>, shape: (usize, usize)| {
            if (matrix.nrows(), matrix.ncols()) == shape {
                Ok(())
            } else {
                Err(NavierStokesError::InvalidInput(format!(
                    "{} block is {}x{}, expected {}x{}",
                    name,
                    matrix.nrows(),
                    matrix.ncols(),
                    shape.0,
                    shape.1
                )))
            }
        };
        check("stiffness", &blocks.stiffness, (n_v, n_v))?;
        check("mass", &blocks.mass, (n_v, n_v))?;
        check("mixed", &blocks.mixed, (n_p, n_v))?;
        check("pressure", &blocks.pressure, (n_p, n_p))?;

        Ok(Self {
            settings,
            velocity_cache,
            layout,
            blocks,
        })
    }

    pub fn settings(&self) -> &NavierStokesSettings {
        &self.settings
    }

    pub fn layout(&self) -> &MixedLayout {
        &self.layout
    }

    fn validate_inputs(
        &self,
        time_step: f64,
        previous_solution: &DVector<f64>,
        forcing: &DVector<f64>,
        boundary: &DirichletBoundary,
    ) -> Result<(), NavierStokesError> {
        let n = self.layout.system_size();
        let invalid = |message: String| Err(NavierStokesError::InvalidInput(message));
        if !(time_step.is_finite() && time_step > 0.0) {
            return invalid(format!("time step must be positive and finite, got {}", time_step));
        }
        if previous_solution.len() != n {
            return invalid(format!(
                "previous solution has length {}, expected {}",
                previous_solution.len(),
                n
            ));
        }
        if forcing.len() != n {
            return invalid(format!("forcing has length {}, expected {}", forcing.len(), n));
        }
        if let Some(&dof) = boundary.dofs().iter().find(|&&dof| dof >= n) {
            return invalid(format!("Dirichlet dof {} out of bounds for system of size {}", dof, n));
        }
        Ok(())
    }

    /// Solves one time step, starting from the solution of the previous step.
    ///
    /// `previous_solution` and `forcing` are full mixed vectors (velocity, pressure and, if the
    /// layout has a gauge, the multiplier). Dirichlet values are imposed on `boundary.dofs()`.
    pub fn solve(
        &self,
        time_step: f64,
        previous_solution: &DVector<f64>,
        forcing: &DVector<f64>,
        boundary: &DirichletBoundary,
    ) -> Result<(DVector<f64>, SolverDiagnostics), NavierStokesError> {
        self.validate_inputs(time_step, previous_solution, forcing, boundary)?;

        let mut solver = create_linear_solver(self.settings.linear_solver, self.settings.preconditioner);
        solver.set_settings(&self.settings.linear_solver_settings);
        debug!("Navier-Stokes: using linear solver {}", solver.name());

        let mut diagnostics = SolverDiagnostics {
            linear_solver: solver.name().to_string(),
            ..Default::default()
        };

        let n = self.layout.system_size();
        let n_v = self.layout.num_velocity_dofs();

        let timer = Instant::now();
        let mut velocity_mass = scaled(&self.blocks.mass, 1.0 / time_step);
        let mut previous_mass = DVector::zeros(n);
        previous_mass
            .rows_mut(0, n_v)
            .copy_from(&spmv(&velocity_mass, &previous_solution.rows(0, n_v).clone_owned()));
        zero_entries(&mut previous_mass, boundary.dofs());
        scale_in_place(&mut velocity_mass, self.settings.time_integration_coefficient);

        let velocity_block = &self.blocks.stiffness + &velocity_mass;
        let stokes = merge_mixed_matrices(&self.layout, &velocity_block, &self.blocks.mixed, &self.blocks.pressure)?;
        diagnostics.stokes_assembly_time_seconds = timer.elapsed().as_secs_f64();
        debug!(
            "Navier-Stokes: Stokes assembly took {:.3e} s",
            diagnostics.stokes_assembly_time_seconds
        );

        let mut rhs = forcing + previous_mass;
        boundary.write_values_into(&mut rhs);
        if let Some(gauge) = self.layout.gauge_index() {
            rhs[gauge] = 0.0;
        }

        let skipping = find_singular_columns(&stokes, SINGULAR_COLUMN_TOLERANCE);
        if !skipping.is_empty() {
            debug!("Navier-Stokes: pinning {} singular columns", skipping.len());
        }
        let constrained = merge_sorted_unique(boundary.dofs(), &skipping);

        // Singular dofs keep their previous values
        let mut stokes_rhs = rhs.clone();
        for &dof in skipping.iter().filter(|&&dof| !boundary.contains(dof)) {
            stokes_rhs[dof] = previous_solution[dof];
        }

        let timer = Instant::now();
        let mut x = dirichlet_solve(solver.as_mut(), &stokes, &stokes_rhs, &constrained).map_err(|source| {
            NavierStokesError::LinearSolve {
                iteration: 0,
                residual_norm: stokes_rhs.norm(),
                source,
            }
        })?;
        diagnostics.stokes_solve_time_seconds = timer.elapsed().as_secs_f64();
        debug!(
            "Navier-Stokes: Stokes solve took {:.3e} s, error {:.3e}",
            diagnostics.stokes_solve_time_seconds,
            compute_residual(&stokes, &x, &stokes_rhs, &constrained).norm()
        );

        let picard = self.iterate(
            Linearization::Picard,
            self.settings.picard_tolerance,
            &velocity_block,
            &rhs,
            &constrained,
            solver.as_mut(),
            &mut x,
            &mut diagnostics,
        )?;
        if !picard.converged {
            warn!(
                "Navier-Stokes: Picard iteration stopped after {} iterations with residual norm {:e}, continuing with Newton",
                picard.iterations, picard.residual_norm
            );
        }

        let newton = self.iterate(
            Linearization::Newton,
            self.settings.tolerance,
            &velocity_block,
            &rhs,
            &constrained,
            solver.as_mut(),
            &mut x,
            &mut diagnostics,
        )?;

        diagnostics.picard_iterations = picard.iterations;
        diagnostics.newton_iterations = newton.iterations;
        diagnostics.iteration_count = picard.iterations + newton.iterations;
        diagnostics.final_residual_norm = newton.residual_norm;

        if !newton.converged {
            error!(
                "Navier-Stokes: Newton iteration did not converge within {} iterations, residual norm {:e}",
                newton.iterations, newton.residual_norm
            );
            return Err(NavierStokesError::MaximumIterationsReached {
                phase: Linearization::Newton,
                iterations: newton.iterations,
                residual_norm: newton.residual_norm,
            });
        }

        info!(
            "Navier-Stokes: converged after {} Picard and {} Newton iterations, residual norm {:e}",
            picard.iterations, newton.iterations, newton.residual_norm
        );
        Ok((x, diagnostics))
    }

    /// Assembles the mixed system matrix for the current velocity.
    fn assemble_system(
        &self,
        velocity_block: &CsrMatrix<f64>,
        x: &DVector<f64>,
        linearization: Linearization,
    ) -> eyre::Result<CsrMatrix<f64>> {
        let n_v = self.layout.num_velocity_dofs();
        let convection = assemble_convection_matrix(self.velocity_cache, x.rows(0, n_v), linearization)?;
        let velocity = velocity_block + &convection;
        merge_mixed_matrices(&self.layout, &velocity, &self.blocks.mixed, &self.blocks.pressure)
    }

    #[allow(clippy::too_many_arguments)]
    fn iterate(
        &self,
        linearization: Linearization,
        tolerance: f64,
        velocity_block: &CsrMatrix<f64>,
        rhs: &DVector<f64>,
        constrained: &[usize],
        solver: &mut dyn LinearSolver,
        x: &mut DVector<f64>,
        diagnostics: &mut SolverDiagnostics,
    ) -> Result<PhaseOutcome, NavierStokesError> {
        let timer = Instant::now();
        let mut picard_matrix = self.assemble_system(velocity_block, x, Linearization::Picard)?;
        diagnostics.assembly_time_seconds += timer.elapsed().as_secs_f64();

        let mut residual = compute_residual(&picard_matrix, x, rhs, constrained);
        let mut residual_norm = residual.norm();
        let mut history = vec![residual_norm];
        debug!("{} phase: initial residual norm {:e}", linearization, residual_norm);

        let mut iterations = 0;
        while residual_norm > tolerance && iterations < self.settings.max_iterations {
            let jacobian = match linearization {
                Linearization::Picard => None,
                Linearization::Newton => {
                    let timer = Instant::now();
                    let jacobian = self.assemble_system(velocity_block, x, Linearization::Newton)?;
                    diagnostics.assembly_time_seconds += timer.elapsed().as_secs_f64();
                    Some(jacobian)
                }
            };
            let system = jacobian.as_ref().unwrap_or(&picard_matrix);

            let timer = Instant::now();
            let dx = dirichlet_solve(solver, system, &residual, constrained).map_err(|source| {
                NavierStokesError::LinearSolve {
                    iteration: iterations + 1,
                    residual_norm,
                    source,
                }
            })?;
            diagnostics.solve_time_seconds += timer.elapsed().as_secs_f64();

            *x += &dx;
            iterations += 1;

            let timer = Instant::now();
            picard_matrix = self.assemble_system(velocity_block, x, Linearization::Picard)?;
            diagnostics.assembly_time_seconds += timer.elapsed().as_secs_f64();

            residual = compute_residual(&picard_matrix, x, rhs, constrained);
            residual_norm = residual.norm();
            history.push(residual_norm);
            debug!(
                "{} iteration {}: ||r||_2 = {:e}, ||dx||_2 = {:e}",
                linearization,
                iterations,
                residual_norm,
                dx.norm()
            );

            if !residual_norm.is_finite() {
                return Err(NavierStokesError::NonFiniteResidual {
                    phase: linearization,
                    iteration: iterations,
                });
            }
        }

        match linearization {
            Linearization::Picard => diagnostics.picard_residuals.extend(history),
            Linearization::Newton => diagnostics.newton_residuals.extend(history),
        }

        Ok(PhaseOutcome {
            iterations,
            residual_norm,
            converged: residual_norm <= tolerance,
        })
    }
}

fn scaled(matrix: &CsrMatrix<f64>, factor: f64) -> CsrMatrix<f64> {
    let mut result = matrix.clone();
    scale_in_place(&mut result, factor);
    result
}

fn scale_in_place(matrix: &mut CsrMatrix<f64>, factor: f64) {
    matrix.values_mut().iter_mut().for_each(|v| *v *= factor);
}
