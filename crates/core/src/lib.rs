//! Method-of-Characteristics Core Library
//!
//! Solves the 2-D multi-group k-eigenvalue neutron transport problem on reactor
//! cross-sections described by constructive solid geometry.
//!
//! ## Pipeline
//!
//! 1. [`geometry::Geometry`]: surfaces, cells, universes and lattices, flattened
//!    into flat source regions (FSRs) by [`geometry::Geometry::finalize`]
//! 2. [`tracking::TrackGenerator`]: cyclic tracks over a corrected azimuthal
//!    quadrature, segmented by FSR and linked at the domain boundary
//! 3. [`solver::CpuSolver`]: power iteration with a parallel transport sweep
//!
//! Each stage produces an owned value that the next one borrows; there is no
//! global state, and a failed solve leaves the geometry and tracks reusable.

// Core types and utilities
pub mod config;
pub mod core_types;
pub mod error;
pub mod timer;

// Pipeline stages
pub mod geometry;
pub mod materials;
pub mod solver;
pub mod tracking;

// Re-export the main entry points
pub use config::{RunOptions, SolverOptions, TrackOptions};
pub use core_types::{CellId, FsrId, LatticeId, MaterialId, SurfaceId, TrackId, UniverseId, Vec2};
pub use error::{ConfigurationError, MocError, NumericError, Result, TracingError};
pub use geometry::{
    BoundaryType, Cell, Fill, Geometry, Halfspace, Lattice, RasterKind, RasterMap, Surface,
    Universe,
};
pub use materials::{CrossSections, Material, MaterialLibrary};
pub use solver::{
    create_transport_solver, CpuSolver, EigenvalueResult, ExpEvaluator, InitialGuess,
    SolutionSnapshot, SolverState, TransportSolver,
};
pub use timer::Timer;
pub use tracking::{PolarQuadrature, TrackGenerator, TrackSet};
