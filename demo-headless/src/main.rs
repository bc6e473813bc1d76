use clap::{Parser, ValueEnum};
use moc_core::geometry::{BoundaryType, Cell, Fill, Halfspace, Lattice, RasterKind, Surface, Universe};
use moc_core::{
    create_transport_solver, CrossSections, Geometry, Material, MaterialId, MocError, RunOptions,
    SurfaceId, TrackGenerator, UniverseId,
};
use std::error::Error;
use std::path::PathBuf;
use tracing::info;

/// Built-in test problems
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Reflective 200 cm box of one-group material, k = k∞
    Homogeneous,
    /// Two-group fuel pin in water with reflective sides
    Pin,
    /// 9×9 water lattice with a 3×3 fuel block, vacuum on all sides
    Lattice,
}

/// Headless MOC eigenvalue solve of a built-in problem
#[derive(Parser, Debug)]
#[command(name = "moc-demo")]
#[command(about = "2-D method of characteristics k-eigenvalue demo", long_about = None)]
struct Args {
    /// Problem to solve
    #[arg(short, long, value_enum, default_value_t = Scenario::Lattice)]
    scenario: Scenario,

    /// Run options as JSON; flags below override individual fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads, 0 for all cores
    #[arg(short, long)]
    threads: Option<usize>,

    /// Track spacing in cm
    #[arg(long)]
    spacing: Option<f64>,

    /// Number of azimuthal angles (multiple of 4)
    #[arg(short = 'a', long)]
    num_azim: Option<usize>,

    /// Convergence tolerance on k and the fission source
    #[arg(long)]
    tolerance: Option<f64>,

    /// Maximum power iterations
    #[arg(short, long)]
    max_iters: Option<usize>,

    /// Write the solution snapshot as JSON
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Print a material map of the geometry with this many columns
    #[arg(long)]
    raster: Option<usize>,
}

impl Args {
    fn run_options(&self) -> Result<RunOptions, MocError> {
        let mut options = match &self.config {
            Some(path) => RunOptions::from_json_file(path)?,
            None => RunOptions::default(),
        };
        if let Some(threads) = self.threads {
            options.num_threads = threads;
        }
        if let Some(spacing) = self.spacing {
            options.track_spacing = spacing;
        }
        if let Some(num_azim) = self.num_azim {
            options.num_azim = num_azim;
        }
        if let Some(tolerance) = self.tolerance {
            options.tolerance = tolerance;
        }
        if let Some(max_iters) = self.max_iters {
            options.max_iterations = max_iters;
        }
        options.validate()?;
        Ok(options)
    }
}

fn fuel() -> Result<Material, MocError> {
    let fission = vec![1.0 / 480.0, 1.0 / 16.0];
    Ok(Material::new(
        "fuel",
        CrossSections {
            total: vec![2.0 / 9.0, 5.0 / 6.0],
            scatter: vec![71.0 / 360.0, 0.02, 0.0, 11.0 / 15.0],
            nu_fission: fission.iter().map(|f| 2.4 * f).collect(),
            fission,
            chi: vec![1.0, 0.0],
        },
    )?)
}

fn water() -> Result<Material, MocError> {
    Ok(Material::new(
        "water",
        CrossSections {
            total: vec![2.0 / 9.0, 5.0 / 3.0],
            scatter: vec![71.0 / 360.0, 0.025, 0.0, 47.0 / 30.0],
            fission: vec![0.0, 0.0],
            nu_fission: vec![0.0, 0.0],
            chi: vec![0.0, 0.0],
        },
    )?)
}

/// Square box `[-half, half]²` as left, right, bottom, top planes
fn box_planes(
    geometry: &mut Geometry,
    half: f64,
    boundary: BoundaryType,
) -> Result<[SurfaceId; 4], MocError> {
    Ok([
        geometry.add_surface(Surface::x_plane(-half).with_boundary(boundary))?,
        geometry.add_surface(Surface::x_plane(half).with_boundary(boundary))?,
        geometry.add_surface(Surface::y_plane(-half).with_boundary(boundary))?,
        geometry.add_surface(Surface::y_plane(half).with_boundary(boundary))?,
    ])
}

fn inside(planes: [SurfaceId; 4]) -> Cell {
    Cell::new()
        .with_surface(planes[0], Halfspace::Positive)
        .with_surface(planes[1], Halfspace::Negative)
        .with_surface(planes[2], Halfspace::Positive)
        .with_surface(planes[3], Halfspace::Negative)
}

/// Root universe of one cell bounded by `planes` and filled with `fill`
fn set_root(geometry: &mut Geometry, planes: [SurfaceId; 4], fill: Fill) -> Result<(), MocError> {
    let cell = geometry.add_cell(inside(planes).with_fill(fill))?;
    let root = geometry.add_universe(Universe::new().named("root").with_cell(cell))?;
    geometry.set_root_universe(root);
    Ok(())
}

fn material_universe(geometry: &mut Geometry, material: MaterialId) -> Result<UniverseId, MocError> {
    let cell = geometry.add_cell(Cell::new().with_fill(Fill::Material(material)))?;
    Ok(geometry.add_universe(Universe::new().with_cell(cell))?)
}

fn homogeneous() -> Result<Geometry, MocError> {
    let mut geometry = Geometry::new();
    let medium = geometry.add_material(Material::one_group(
        "medium",
        0.452648699,
        0.383259177,
        0.0994076580,
    )?);
    let planes = box_planes(&mut geometry, 100.0, BoundaryType::Reflective)?;
    set_root(&mut geometry, planes, Fill::Material(medium))?;
    Ok(geometry)
}

fn pin() -> Result<Geometry, MocError> {
    let mut geometry = Geometry::new();
    let fuel = geometry.add_material(fuel()?);
    let water = geometry.add_material(water()?);
    let radius = geometry.add_surface(Surface::circle(0.0, 0.0, 0.54).named("pin"))?;

    let pin = geometry.add_cell(
        Cell::new()
            .named("fuel")
            .with_surface(radius, Halfspace::Negative)
            .with_fill(Fill::Material(fuel))
            .with_rings(3)
            .with_sectors(8),
    )?;
    let moderator = geometry.add_cell(
        Cell::new()
            .named("moderator")
            .with_surface(radius, Halfspace::Positive)
            .with_fill(Fill::Material(water))
            .with_sectors(8),
    )?;
    let pin_universe = geometry.add_universe(Universe::new().with_cells([pin, moderator]))?;

    let planes = box_planes(&mut geometry, 0.63, BoundaryType::Reflective)?;
    set_root(&mut geometry, planes, Fill::Universe(pin_universe))?;
    Ok(geometry)
}

fn lattice() -> Result<Geometry, MocError> {
    let mut geometry = Geometry::new();
    let fuel = geometry.add_material(fuel()?);
    let water = geometry.add_material(water()?);
    let fuel = material_universe(&mut geometry, fuel)?;
    let water = material_universe(&mut geometry, water)?;

    let rows = (0..9)
        .map(|j| {
            (0..9)
                .map(|i| {
                    if (3..6).contains(&i) && (3..6).contains(&j) {
                        fuel
                    } else {
                        water
                    }
                })
                .collect()
        })
        .collect();
    let lattice = geometry.add_lattice(Lattice::new(4.0 / 9.0, 4.0 / 9.0, rows)?.named("core"));

    let planes = box_planes(&mut geometry, 2.0, BoundaryType::Vacuum)?;
    set_root(&mut geometry, planes, Fill::Lattice(lattice))?;
    Ok(geometry)
}

fn print_raster(geometry: &Geometry, columns: usize) -> Result<(), MocError> {
    let bounds = geometry.bounds()?;
    let aspect = (bounds.max.y - bounds.min.y) / (bounds.max.x - bounds.min.x);
    // Terminal cells are about twice as tall as wide
    let rows = ((columns as f64 * aspect / 2.0).round() as usize).max(1);
    let map = geometry.rasterize(columns, rows, RasterKind::Material)?;

    println!("\nMaterial map ({}x{}):", map.nx, map.ny);
    for j in (0..map.ny).rev() {
        let line: String = (0..map.nx)
            .map(|i| match map.get(i, j) {
                Some(id) => char::from_digit(id % 36, 36).unwrap_or('?'),
                None => ' ',
            })
            .collect();
        println!("  {line}");
    }
    println!();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let options = args.run_options()?;

    println!("=== MOC Eigenvalue Demo ===\n");
    println!("Scenario: {:?}", args.scenario);
    println!(
        "Tracks: {} azimuthal angles, {:.4} cm spacing, {:?} polar quadrature",
        options.num_azim, options.track_spacing, options.polar
    );
    println!(
        "Solver: tolerance {:.1E}, at most {} iterations, {} threads\n",
        options.tolerance,
        options.max_iterations,
        if options.num_threads == 0 {
            "all".to_string()
        } else {
            options.num_threads.to_string()
        }
    );

    let mut geometry = match args.scenario {
        Scenario::Homogeneous => homogeneous()?,
        Scenario::Pin => pin()?,
        Scenario::Lattice => lattice()?,
    };
    geometry.finalize()?;
    println!(
        "Geometry: {} flat source regions, {} groups",
        geometry.num_fsrs(),
        geometry.num_groups()
    );
    if let Some(columns) = args.raster {
        print_raster(&geometry, columns)?;
    }

    let tracks = TrackGenerator::new(options.track_options()).generate(&geometry)?;
    println!(
        "Tracks: {} tracks, {} segments",
        tracks.num_tracks(),
        tracks.num_segments()
    );

    let mut solver = create_transport_solver(&geometry, &tracks, options.solver_options())?;
    let result = solver.compute_eigenvalue(options.max_iterations, options.tolerance)?;

    println!("\n=== Solve Complete ===");
    println!("k_eff:      {:.6}", result.k_eff);
    println!("Converged:  {} after {} iterations", result.converged, result.iterations);
    println!("Residual:   {:.3E}", result.residual);
    println!("Leakage:    {:.6}", result.leakage);
    println!("Balance k:  {:.6}", result.balance_k);

    println!("\nTimings:");
    print!("{}", tracks.timer().report());
    print!("{}", solver.timer().report());

    if let Some(path) = &args.snapshot {
        solver.snapshot().write_json(path)?;
        info!("Wrote solution snapshot to {}", path.display());
    }
    Ok(())
}
