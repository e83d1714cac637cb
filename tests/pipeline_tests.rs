#![cfg(feature = "obj")]

use image::{Rgba, RgbaImage};
use std::fmt::Write as _;
use std::path::Path;

use voxblock::palette::{save_palette, scan_directory};
use voxblock::pipeline::{preview_file, voxelize_file, PreviewOptions};
use voxblock::{load_table, ClusterConfig, RenderConfig, SmoothConfig, TableSchema, VoxelError, VoxelizeConfig};

/// A 4x4 grid of vertex-colored vertices at z = 0.5, red on the left half.
fn write_quad_obj(dir: &Path) -> std::path::PathBuf {
    let mut obj = String::new();
    for y in 0..4 {
        for x in 0..4 {
            let (r, g, b) = if x < 2 { (1.0, 0.0, 0.0) } else { (0.0, 0.0, 1.0) };
            writeln!(obj, "v {}.5 {}.5 0.5 {} {} {}", x, y, r, g, b).unwrap();
        }
    }
    for y in 0..3 {
        for x in 0..3 {
            let i = y * 4 + x + 1;
            writeln!(obj, "f {} {} {}", i, i + 1, i + 5).unwrap();
            writeln!(obj, "f {} {} {}", i, i + 5, i + 4).unwrap();
        }
    }
    let path = dir.join("quad.obj");
    std::fs::write(&path, obj).unwrap();
    path
}

fn write_palette(dir: &Path) -> std::path::PathBuf {
    let textures = dir.join("textures");
    std::fs::create_dir(&textures).unwrap();
    for (name, color) in [("red_wool", [200, 20, 20, 255]), ("blue_wool", [20, 20, 200, 255])] {
        RgbaImage::from_pixel(2, 2, Rgba(color))
            .save(textures.join(format!("{}.png", name)))
            .unwrap();
    }
    let json = dir.join("palette.json");
    save_palette(&json, &scan_directory(&textures).unwrap()).unwrap();
    json
}

#[test]
fn test_voxelize_then_preview() {
    let dir = tempfile::tempdir().unwrap();
    let mesh = write_quad_obj(dir.path());
    let table = dir.path().join("quad.csv");

    let report = voxelize_file(&mesh, &table, &VoxelizeConfig::new(1.0)).unwrap();
    assert_eq!(report.points, 16);
    assert_eq!(report.voxels, 16);
    let stages: Vec<&str> = report.stages.iter().map(|s| s.stage).collect();
    assert_eq!(stages, vec!["load", "colorize", "voxelize", "export"]);

    let loaded = load_table(&table).unwrap();
    assert_eq!(loaded.schema, TableSchema::ColorVariance);
    assert_eq!(loaded.len(), 16);

    let palette = write_palette(dir.path());
    let png = dir.path().join("quad.png");
    let obj = dir.path().join("blocks.obj");
    let options = PreviewOptions {
        render: RenderConfig::default().with_size(128, 96),
        obj_output: Some(obj.clone()),
        ..PreviewOptions::default()
    };

    let report = preview_file(&table, &palette, &png, &options).unwrap();
    assert_eq!(report.voxels, 16);
    assert_eq!(report.palette_entries, 2);
    // A 4x4 slab: 16 faces on each side plus 16 around the rim.
    assert_eq!(report.faces, 48);

    let image = image::open(&png).unwrap();
    assert_eq!((image.width(), image.height()), (128, 96));
    assert!(obj.is_file());
    assert!(obj.with_extension("mtl").is_file());
}

#[test]
fn test_single_resolution_has_no_variance_column() {
    let dir = tempfile::tempdir().unwrap();
    let mesh = write_quad_obj(dir.path());
    let table = dir.path().join("quad.csv");

    voxelize_file(&mesh, &table, &VoxelizeConfig::new(2.0).single_resolution()).unwrap();
    let text = std::fs::read_to_string(&table).unwrap();
    assert_eq!(text.lines().next(), Some("x,y,z,r,g,b"));
    assert_eq!(text.lines().count(), 1 + 4);
}

#[test]
fn test_smoothing_in_preview() {
    let dir = tempfile::tempdir().unwrap();
    let mesh = write_quad_obj(dir.path());
    let table = dir.path().join("quad.csv");
    voxelize_file(&mesh, &table, &VoxelizeConfig::new(1.0)).unwrap();

    let options = PreviewOptions {
        smoothing: Some(SmoothConfig::default()),
        render: RenderConfig::default().with_size(32, 32),
        ..PreviewOptions::default()
    };
    let report = preview_file(&table, write_palette(dir.path()), dir.path().join("s.png"), &options)
        .unwrap();
    assert!(report.stages.iter().any(|s| s.stage == "smooth"));
}

/// The two-color slab forms two color clusters; matching still sees both.
#[test]
fn test_clustering_in_preview() {
    let dir = tempfile::tempdir().unwrap();
    let mesh = write_quad_obj(dir.path());
    let table = dir.path().join("quad.csv");
    voxelize_file(&mesh, &table, &VoxelizeConfig::new(1.0)).unwrap();

    let options = PreviewOptions {
        clustering: Some(ClusterConfig::default()),
        render: RenderConfig::default().with_size(32, 32),
        obj_output: Some(dir.path().join("c.obj")),
        ..PreviewOptions::default()
    };
    let report = preview_file(&table, write_palette(dir.path()), dir.path().join("c.png"), &options)
        .unwrap();
    let stages: Vec<&str> = report.stages.iter().map(|s| s.stage).collect();
    assert_eq!(
        stages,
        vec!["load table", "load palette", "cluster", "match", "faces", "export obj", "render", "save"]
    );

    let mtl = std::fs::read_to_string(dir.path().join("c.mtl")).unwrap();
    assert_eq!(mtl.matches("newmtl").count(), 2);
}

#[test]
fn test_invalid_cluster_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let options = PreviewOptions {
        clustering: Some(ClusterConfig::default().with_min_points(0)),
        ..PreviewOptions::default()
    };
    let err = preview_file(
        dir.path().join("missing.csv"),
        dir.path().join("missing.json"),
        dir.path().join("out.png"),
        &options,
    )
    .unwrap_err();
    assert!(matches!(err, VoxelError::Configuration(_)));
}

#[test]
fn test_invalid_voxel_size_fails_before_loading() {
    let dir = tempfile::tempdir().unwrap();
    let err = voxelize_file(
        dir.path().join("missing.obj"),
        dir.path().join("out.csv"),
        &VoxelizeConfig::new(-1.0),
    )
    .unwrap_err();
    assert!(matches!(err, VoxelError::Configuration(_)));
    assert!(!dir.path().join("out.csv").exists());
}
