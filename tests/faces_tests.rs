use voxblock::{expose_faces, read_table, Direction, GridIndex, TexturedVoxel};

fn voxel(x: i32, y: i32, z: i32) -> TexturedVoxel {
    TexturedVoxel::new(GridIndex::new(x, y, z), 0)
}

/// An isolated voxel shows all six faces, centered half a cell out.
#[test]
fn test_isolated_voxel_has_six_faces() {
    let faces = expose_faces(&[voxel(0, 0, 0)]);
    assert_eq!(faces.len(), 6);

    let centers: Vec<[f64; 3]> = faces.iter().map(|f| f.center()).collect();
    assert_eq!(
        centers,
        vec![
            [0.5, 0.0, 0.0],
            [-0.5, 0.0, 0.0],
            [0.0, 0.5, 0.0],
            [0.0, -0.5, 0.0],
            [0.0, 0.0, 0.5],
            [0.0, 0.0, -0.5],
        ]
    );
    for face in &faces {
        assert_eq!(face.normal(), face.direction.normal());
    }
}

/// A voxel with all six neighbors occupied contributes nothing.
#[test]
fn test_enclosed_voxel_has_no_faces() {
    let mut voxels = vec![TexturedVoxel::new(GridIndex::new(0, 0, 0), 1)];
    voxels.extend(
        Direction::ALL
            .iter()
            .map(|&d| TexturedVoxel::new(GridIndex::new(0, 0, 0).neighbor(d).unwrap(), 0)),
    );

    let faces = expose_faces(&voxels);
    assert!(faces.iter().all(|f| f.texture == 0));
    // Each of the six arms exposes 5 faces.
    assert_eq!(faces.len(), 30);
}

/// Two adjacent voxels hide the pair of faces they share.
#[test]
fn test_two_adjacent_voxels_have_ten_faces() {
    let faces = expose_faces(&[voxel(0, 0, 0), voxel(1, 0, 0)]);
    assert_eq!(faces.len(), 10);
    assert!(!faces
        .iter()
        .any(|f| f.voxel == GridIndex::new(0, 0, 0) && f.direction == Direction::PosX));
    assert!(!faces
        .iter()
        .any(|f| f.voxel == GridIndex::new(1, 0, 0) && f.direction == Direction::NegX));
}

/// A solid n^3 block exposes only its outer shell.
#[test]
fn test_solid_block_exposes_surface_only() {
    let n = 4;
    let mut voxels = Vec::new();
    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                voxels.push(voxel(x, y, z));
            }
        }
    }
    let faces = expose_faces(&voxels);
    assert_eq!(faces.len(), (6 * n * n) as usize);
}

/// Faces come out in voxel order, then direction order.
#[test]
fn test_face_order_follows_input() {
    let faces = expose_faces(&[voxel(5, 0, 0), voxel(-5, 0, 0)]);
    assert_eq!(faces.len(), 12);
    assert!(faces[..6].iter().all(|f| f.voxel.x == 5));
    assert!(faces[6..].iter().all(|f| f.voxel.x == -5));
    let directions: Vec<Direction> = faces[..6].iter().map(|f| f.direction).collect();
    assert_eq!(directions, Direction::ALL.to_vec());
}

#[test]
fn test_empty_input() {
    assert!(expose_faces(&[]).is_empty());
}

/// Voxels on the edge of the integer grid keep their outward faces, and the
/// two ends of an axis are not neighbors.
#[test]
fn test_voxels_at_grid_edges() {
    let table = read_table("x,y,z,r,g,b\n2147483647,0,0,1,1,1\n-2147483648,0,0,0,0,0\n".as_bytes())
        .unwrap();
    let voxels: Vec<TexturedVoxel> = table
        .records
        .iter()
        .map(|r| TexturedVoxel::new(r.index, 0))
        .collect();

    let faces = expose_faces(&voxels);
    assert_eq!(faces.len(), 12);
    assert!(faces
        .iter()
        .any(|f| f.voxel.x == i32::MAX && f.direction == Direction::PosX));
    assert!(faces
        .iter()
        .any(|f| f.voxel.x == i32::MIN && f.direction == Direction::NegX));
}
