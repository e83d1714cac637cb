#![cfg(all(feature = "gltf", feature = "obj"))]

use image::{Rgba, RgbaImage};
use std::path::Path;

use voxblock::{load_mesh, voxelize, ColorSource, MeshLoader, PointCloud, Rgb, VoxelError};

fn close(a: Rgb, b: Rgb) -> bool {
    a.distance(b) < 1e-6
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

const TRIANGLE_OBJ: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
";

/// OBJ without materials reads as a single white part.
#[test]
fn test_obj_without_material_is_white() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "tri.obj", TRIANGLE_OBJ);

    let mesh = load_mesh(&path).unwrap();
    assert_eq!(mesh.parts.len(), 1);
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.face_count(), 1);
    assert!(matches!(mesh.parts[0].colors, ColorSource::None));
    assert_eq!(mesh.parts[0].vertex_colors(), vec![Rgb::WHITE; 3]);
}

/// The MTL diffuse color is used when the material has no texture.
#[test]
fn test_obj_material_diffuse_color() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "tri.mtl", "newmtl clay\nKd 0.8 0.2 0.1\n");
    let path = write(
        dir.path(),
        "tri.obj",
        &format!("mtllib tri.mtl\nusemtl clay\n{}", TRIANGLE_OBJ),
    );

    let mesh = load_mesh(&path).unwrap();
    let colors = mesh.parts[0].vertex_colors();
    assert!(colors.iter().all(|&c| close(c, Rgb::new(0.8, 0.2, 0.1))));
}

/// Texture lookups use the vertex UV with the V axis flipped to image rows.
#[test]
fn test_obj_material_texture() {
    let dir = tempfile::tempdir().unwrap();
    let mut tex = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]));
    tex.put_pixel(0, 1, Rgba([255, 0, 0, 255])); // bottom-left
    tex.put_pixel(1, 0, Rgba([0, 255, 0, 255])); // top-right
    tex.save(dir.path().join("tex.png")).unwrap();
    write(dir.path(), "tri.mtl", "newmtl tex\nKd 1 1 1\nmap_Kd tex.png\n");
    let path = write(
        dir.path(),
        "tri.obj",
        "mtllib tri.mtl\nusemtl tex\n\
         v 0 0 0\nv 1 0 0\nv 0 1 0\n\
         vt 0.25 0.25\nvt 0.75 0.75\nvt 0.75 0.25\n\
         f 1/1 2/2 3/3\n",
    );

    let mesh = load_mesh(&path).unwrap();
    let colors = mesh.parts[0].vertex_colors();
    assert_eq!(colors.len(), 3);
    assert!(close(colors[0], Rgb::new(1.0, 0.0, 0.0)));
    assert!(close(colors[1], Rgb::new(0.0, 1.0, 0.0)));
    assert!(close(colors[2], Rgb::new(0.0, 0.0, 1.0)));
}

/// An unreadable texture falls back to the material color instead of failing.
#[test]
fn test_obj_missing_texture_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "tri.mtl", "newmtl tex\nKd 0.5 0.5 0.5\nmap_Kd nowhere.png\n");
    let path = write(
        dir.path(),
        "tri.obj",
        &format!("mtllib tri.mtl\nusemtl tex\n{}", TRIANGLE_OBJ),
    );

    let mesh = load_mesh(&path).unwrap();
    let colors = mesh.parts[0].vertex_colors();
    assert!(colors.iter().all(|&c| close(c, Rgb::new(0.5, 0.5, 0.5))));
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// glTF vertex colors are read per vertex and node transforms are applied.
#[test]
fn test_gltf_vertex_colors_and_transform() {
    let dir = tempfile::tempdir().unwrap();
    let mut bin = f32_bytes(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    bin.extend(f32_bytes(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]));
    std::fs::write(dir.path().join("tri.bin"), &bin).unwrap();

    let path = write(
        dir.path(),
        "tri.gltf",
        r#"{
  "asset": {"version": "2.0"},
  "scene": 0,
  "scenes": [{"nodes": [0]}],
  "nodes": [{"mesh": 0, "translation": [10.0, 0.0, 0.0]}],
  "meshes": [{"name": "tri", "primitives": [{"attributes": {"POSITION": 0, "COLOR_0": 1}}]}],
  "buffers": [{"uri": "tri.bin", "byteLength": 72}],
  "bufferViews": [
    {"buffer": 0, "byteOffset": 0, "byteLength": 36},
    {"buffer": 0, "byteOffset": 36, "byteLength": 36}
  ],
  "accessors": [
    {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
     "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
    {"bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3"}
  ]
}"#,
    );

    let mesh = load_mesh(&path).unwrap();
    assert_eq!(mesh.parts.len(), 1);
    let part = &mesh.parts[0];
    assert_eq!(part.name.as_deref(), Some("tri"));
    assert_eq!(part.positions[0], [10.0, 0.0, 0.0]);
    assert_eq!(part.positions[2], [10.0, 1.0, 0.0]);
    assert_eq!(part.faces, vec![[0, 1, 2]]);

    let cloud = PointCloud::from_mesh(&mesh);
    let grid = voxelize(&cloud, 1.0).unwrap();
    assert_eq!(grid.len(), 3);
    assert_eq!(grid.records()[0].color, Rgb::new(1.0, 0.0, 0.0));
}

#[test]
fn test_unsupported_and_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "model.ply", "ply\n");

    let err = load_mesh(&path).unwrap_err();
    assert!(matches!(err, VoxelError::Resource { .. }));
    assert!(err.to_string().contains("unsupported mesh format"));

    let err = load_mesh(dir.path().join("absent.obj")).unwrap_err();
    assert!(matches!(err, VoxelError::Resource { .. }));
}

#[test]
fn test_default_loader_extensions() {
    let extensions = MeshLoader::default().supported_extensions();
    assert_eq!(extensions, vec!["glb", "gltf", "obj"]);
    assert!(MeshLoader::new().supported_extensions().is_empty());
}
