//! End-to-end support and pad generation.
//!
//! Every scenario runs over a plain 20 mm cube and a cube with a vertical
//! through hole, checking that the generated geometry is printable and sits
//! where it should.
//!
//! Run with: cargo test -p sla --test sla_print
//! Set `RUST_LOG=debug` to see the pipeline stages.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use sla::prelude::*;
use tracing_subscriber::EnvFilter;

const CLOSING_RADIUS: f64 = 0.005;
const LAYER_HEIGHT: f64 = 0.05;

// =============================================================================
// Fixtures
// =============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn cube_20mm() -> TriangleMesh {
    cube(20.0)
}

/// 20 mm cube with a 10 mm square hole through it along Z.
fn cube_with_hole() -> TriangleMesh {
    let outer = [(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0)];
    let inner = [(5.0, 5.0), (15.0, 5.0), (15.0, 15.0), (5.0, 15.0)];
    let mut mesh = TriangleMesh::new();
    for z in [0.0, 20.0] {
        for (x, y) in outer.iter().chain(inner.iter()) {
            mesh.vertices.push(Vertex::from_coords(*x, *y, z));
        }
    }
    // Bottom outer 0..4, bottom inner 4..8, top outer 8..12, top inner 12..16.
    for i in 0..4u32 {
        let j = (i + 1) % 4;
        let (ob, ib, ot, it) = (i, 4 + i, 8 + i, 12 + i);
        let (obn, ibn, otn, itn) = (j, 4 + j, 8 + j, 12 + j);
        mesh.faces.push([ot, otn, itn]);
        mesh.faces.push([ot, itn, it]);
        mesh.faces.push([ob, ibn, obn]);
        mesh.faces.push([ob, ib, ibn]);
        mesh.faces.push([ob, obn, otn]);
        mesh.faces.push([ob, otn, ot]);
        mesh.faces.push([ib, itn, ibn]);
        mesh.faces.push([ib, it, itn]);
    }
    mesh
}

fn test_objects() -> Vec<(&'static str, TriangleMesh)> {
    vec![("20mm_cube", cube_20mm()), ("cube_with_hole", cube_with_hole())]
}

// =============================================================================
// Checks
// =============================================================================

/// Structurally valid, closed and in no need of repair.
fn check_validity(name: &str, mesh: &TriangleMesh, allow_empty: bool) {
    if mesh.faces.is_empty() {
        assert!(allow_empty, "{name}: mesh is empty");
        return;
    }
    assert!(validate_stl(mesh).is_ok(), "{name}: invalid mesh");
    assert!(!needs_repair(mesh), "{name}: {}", validate_mesh(mesh));
    assert!(is_manifold(mesh), "{name}: not manifold");
}

struct PadByproducts {
    model_contours: ExPolygons,
    mesh: TriangleMesh,
}

fn test_pad(name: &str, model: &TriangleMesh, config: &PadConfig) -> PadByproducts {
    assert!(!model.faces.is_empty());

    // Pad skeleton from the model only.
    let model_contours = pad_blueprint(model);
    assert!(!model_contours.is_empty(), "{name}: empty blueprint");

    let mesh = create_pad(&[], &model_contours, config).unwrap();
    check_validity(name, &mesh, false);

    let b = mesh.bounds();
    approx::assert_relative_eq!(b.max.z - b.min.z, config.full_height());

    PadByproducts {
        model_contours,
        mesh,
    }
}

struct SupportByproducts {
    slice_grid: Vec<f64>,
    model_slices: Vec<ExPolygons>,
    tree: SupportTree,
}

fn test_supports(name: &str, model: &TriangleMesh, config: &SupportConfig) -> SupportByproducts {
    assert!(!model.faces.is_empty());

    let (zmin, zmax) = model.z_range().unwrap();
    let ground = zmin - config.object_elevation_mm;
    let slice_grid = grid(ground, zmax, LAYER_HEIGHT);
    let model_slices = MeshSlicer::new(model)
        .slice(&slice_grid, CLOSING_RADIUS, &NoControl)
        .unwrap();

    let index = IndexedMesh::new(model).unwrap();
    let auto = AutoSupportConfig::default().with_head_diameter(2.0 * config.head_front_radius_mm);
    let mut points = AutoSupports::new(&index, &model_slices, &slice_grid, &auto, &NoControl)
        .unwrap()
        .into_output();

    // Without elevation the pad carries the bottom, so the bottom points go.
    let on_floor = config.object_elevation_mm < f64::EPSILON;
    if on_floor {
        remove_bottom_points(&mut points, zmin, config.base_height_mm);
    } else {
        assert!(!points.is_empty(), "{name}: no support points");
    }

    let tree = SupportTree::new(&points, &index, config).unwrap();
    let output = tree.merged_mesh();
    check_validity(name, output, on_floor);

    // Primitives overlap as solids but never meet at a vertex.
    let mut welded = output.clone();
    let epsilon = RepairParams::default().weld_epsilon;
    assert_eq!(
        sla::repair::weld_vertices(&mut welded, epsilon),
        0,
        "{name}: support primitives share vertices"
    );

    if !output.faces.is_empty() {
        let b = output.bounds();
        assert_eq!(b.min.z, ground, "{name}: supports do not reach the ground");
        assert!(b.max.z <= zmax, "{name}: supports above the model");
    }

    SupportByproducts {
        slice_grid,
        model_slices,
        tree,
    }
}

fn test_support_model_collision(name: &str, model: &TriangleMesh, config: &SupportConfig) {
    // A slightly negative penetration keeps the heads off the model.
    let config = config.clone().with_head_penetration(-0.1);
    let byproducts = test_supports(name, model, &config);

    let support_slices = byproducts
        .tree
        .slice(&byproducts.slice_grid, CLOSING_RADIUS)
        .unwrap();
    assert_eq!(support_slices.len(), byproducts.model_slices.len());

    for (n, (sup, model_slice)) in support_slices
        .iter()
        .zip(&byproducts.model_slices)
        .enumerate()
    {
        let touch = intersection(sup, model_slice);
        assert!(
            touch.is_empty(),
            "{name}: supports pierce the model at z = {}",
            byproducts.slice_grid[n]
        );
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn pad_flat() {
    init_tracing();
    for (name, model) in test_objects() {
        test_pad(name, &model, &PadConfig::default());
    }
}

#[test]
fn pad_winged() {
    init_tracing();
    // Wings around the pad give it a cavity.
    let config = PadConfig::default().with_wall_height(1.0);
    for (name, model) in test_objects() {
        let out = test_pad(name, &model, &config);
        assert!(out.mesh.bounds().max.z > 0.0);
    }
}

#[test]
fn supports_elevated() {
    init_tracing();
    for (name, model) in test_objects() {
        let out = test_supports(name, &model, &SupportConfig::default());
        assert!(out.tree.pillar_count() > 0);
        assert_eq!(out.slice_grid.len(), out.model_slices.len());
    }
}

#[test]
fn supports_floor() {
    init_tracing();
    let config = SupportConfig::on_floor();
    for (name, model) in test_objects() {
        test_supports(name, &model, &config);
    }
}

#[test]
fn supports_should_not_pierce_model() {
    init_tracing();
    for (name, model) in test_objects() {
        test_support_model_collision(name, &model, &SupportConfig::default());
    }
}

#[test]
fn pad_under_supports() {
    init_tracing();
    let config = SupportConfig::default();
    let pad_config = PadConfig::default();
    for (name, model) in test_objects() {
        let pad = test_pad(name, &model, &pad_config);
        let supports = test_supports(name, &model, &config);

        let support_contours = pad_blueprint(supports.tree.merged_mesh());
        assert!(!support_contours.is_empty(), "{name}: no pillar bases");

        let mesh = create_pad(&support_contours, &pad.model_contours, &pad_config).unwrap();
        check_validity(name, &mesh, false);

        // The pad covers every pillar base.
        let cut = slice_mesh(&mesh, &[-pad_config.wall_thickness_mm / 2.0], 0.0).unwrap();
        let uncovered = sla::slice::difference(&support_contours, &cut[0]);
        assert!(sla::slice::area(&uncovered) < 1e-6, "{name}: pillar base off the pad");
    }
}

#[test]
fn moved_tree_keeps_its_mesh() {
    init_tracing();
    let model = cube_20mm();
    let mut out = test_supports("20mm_cube", &model, &SupportConfig::default());
    let faces = out.tree.merged_mesh().faces.len();

    let tree = out.tree.take();
    assert!(out.tree.is_empty());
    assert_eq!(tree.merged_mesh().faces.len(), faces);
}
