//! Globe mesh generation
//!
//! Two meshes make up the globe layer:
//! - a whole-Earth WGS84 ellipsoid built from a subdivided icosahedron
//! - a finely tessellated patch around the reference site, built in f64
//!   relative to the floating origin so it stays precise at street level

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use std::collections::HashMap;

use crate::core::coordinates::{Coordinates, GeodeticPoint, WGS84_A, WGS84_B};
use crate::core::space::{GlobeOrigin, geocentric_dir_to_render};

/// Equatorial and polar radii in globe render units (km).
const RADIUS_EQUATOR_KM: f32 = (WGS84_A / 1000.0) as f32;
const RADIUS_POLE_KM: f32 = (WGS84_B / 1000.0) as f32;

/// Ellipsoid surface point for a unit direction in the globe render frame
/// (Y toward the pole), relative to the Earth's centre.
fn ellipsoid_point(direction: Vec3) -> Vec3 {
    Vec3::new(
        direction.x * RADIUS_EQUATOR_KM,
        direction.y * RADIUS_POLE_KM,
        direction.z * RADIUS_EQUATOR_KM,
    )
}

/// Outward surface normal of the ellipsoid at `point`.
fn ellipsoid_normal(point: Vec3) -> Vec3 {
    let a2 = RADIUS_EQUATOR_KM * RADIUS_EQUATOR_KM;
    let b2 = RADIUS_POLE_KM * RADIUS_POLE_KM;
    Vec3::new(point.x / a2, point.y / b2, point.z / a2).normalize()
}

/// Generate the Earth ellipsoid from an icosphere with the given subdivision level.
/// Each level quadruples the triangle count; level 5 gives about 20k triangles.
///
/// Vertices are relative to the Earth's centre, in km.
pub fn generate_ellipsoid(subdivisions: u32) -> Mesh {
    let phi = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let mut directions = vec![
        Vec3::new(-1.0, phi, 0.0).normalize(),
        Vec3::new(1.0, phi, 0.0).normalize(),
        Vec3::new(-1.0, -phi, 0.0).normalize(),
        Vec3::new(1.0, -phi, 0.0).normalize(),
        Vec3::new(0.0, -1.0, phi).normalize(),
        Vec3::new(0.0, 1.0, phi).normalize(),
        Vec3::new(0.0, -1.0, -phi).normalize(),
        Vec3::new(0.0, 1.0, -phi).normalize(),
        Vec3::new(phi, 0.0, -1.0).normalize(),
        Vec3::new(phi, 0.0, 1.0).normalize(),
        Vec3::new(-phi, 0.0, -1.0).normalize(),
        Vec3::new(-phi, 0.0, 1.0).normalize(),
    ];

    let mut indices: Vec<u32> = vec![
        0, 11, 5, 0, 5, 1, 0, 1, 7, 0, 7, 10, 0, 10, 11, 1, 5, 9, 5, 11, 4, 11, 10, 2, 10, 7, 6, 7,
        1, 8, 3, 9, 4, 3, 4, 2, 3, 2, 6, 3, 6, 8, 3, 8, 9, 4, 9, 5, 2, 4, 11, 6, 2, 10, 8, 6, 7, 9,
        8, 1,
    ];

    let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
    for _ in 0..subdivisions {
        let mut next = Vec::with_capacity(indices.len() * 4);
        midpoints.clear();

        for tri in indices.chunks(3) {
            let (v1, v2, v3) = (tri[0], tri[1], tri[2]);
            let a = midpoint(&mut directions, &mut midpoints, v1, v2);
            let b = midpoint(&mut directions, &mut midpoints, v2, v3);
            let c = midpoint(&mut directions, &mut midpoints, v3, v1);

            next.extend_from_slice(&[v1, a, c]);
            next.extend_from_slice(&[v2, b, a]);
            next.extend_from_slice(&[v3, c, b]);
            next.extend_from_slice(&[a, b, c]);
        }
        indices = next;
    }

    let mut positions = Vec::with_capacity(directions.len());
    let mut normals = Vec::with_capacity(directions.len());
    let mut uvs = Vec::with_capacity(directions.len());
    for direction in directions {
        let point = ellipsoid_point(direction);
        let normal = ellipsoid_normal(point);
        positions.push(point);
        normals.push(normal);
        // The ellipsoid normal carries the geodetic latitude.
        uvs.push(Coordinates::from(normal).texture_uv());
    }

    fix_texture_seams(&mut positions, &mut uvs, &mut normals, &mut indices);

    build_mesh(positions, normals, uvs, indices)
}

/// Get or create the midpoint (on the unit sphere) between two vertices.
fn midpoint(
    directions: &mut Vec<Vec3>,
    cache: &mut HashMap<(u32, u32), u32>,
    v1: u32,
    v2: u32,
) -> u32 {
    let key = if v1 < v2 { (v1, v2) } else { (v2, v1) };
    if let Some(&index) = cache.get(&key) {
        return index;
    }

    let mid = ((directions[v1 as usize] + directions[v2 as usize]) / 2.0).normalize();
    directions.push(mid);
    let index = directions.len() as u32 - 1;
    cache.insert(key, index);
    index
}

/// Duplicate vertices of triangles that straddle the antimeridian so their
/// u coordinate does not wrap across the whole texture.
fn fix_texture_seams(
    positions: &mut Vec<Vec3>,
    uvs: &mut Vec<[f32; 2]>,
    normals: &mut Vec<Vec3>,
    indices: &mut Vec<u32>,
) {
    let mut fixed = Vec::with_capacity(indices.len());

    for tri in indices.chunks(3) {
        let u = [
            uvs[tri[0] as usize][0],
            uvs[tri[1] as usize][0],
            uvs[tri[2] as usize][0],
        ];
        let max_du = (u[0] - u[1])
            .abs()
            .max((u[0] - u[2]).abs())
            .max((u[1] - u[2]).abs());

        if max_du <= 0.5 {
            fixed.extend_from_slice(tri);
            continue;
        }

        for (j, &index) in tri.iter().enumerate() {
            let idx = index as usize;
            if u[j] < 0.25 {
                positions.push(positions[idx]);
                normals.push(normals[idx]);
                uvs.push([u[j] + 1.0, uvs[idx][1]]);
                fixed.push(positions.len() as u32 - 1);
            } else {
                fixed.push(index);
            }
        }
    }

    *indices = fixed;
}

/// Generate a square surface patch centred on `center`, `half_extent_m` to
/// each side along east and north, at height zero.
///
/// Vertices are in globe render km relative to `origin`. Positions are
/// computed in f64 before the origin is subtracted.
pub fn generate_local_patch(
    center: GeodeticPoint,
    half_extent_m: f64,
    segments: u32,
    origin: &GlobeOrigin,
) -> Mesh {
    let segments = segments.max(1);
    let stride = segments + 1;

    let mut positions = Vec::with_capacity((stride * stride) as usize);
    let mut normals = Vec::with_capacity((stride * stride) as usize);
    let mut uvs = Vec::with_capacity((stride * stride) as usize);

    let metres_per_deg_lat = WGS84_A.to_radians();
    let metres_per_deg_lon = metres_per_deg_lat * center.latitude_deg.to_radians().cos().max(1e-6);

    for row in 0..stride {
        for col in 0..stride {
            let e = (col as f64 / segments as f64 * 2.0 - 1.0) * half_extent_m;
            let n = (row as f64 / segments as f64 * 2.0 - 1.0) * half_extent_m;

            // Small-offset degrees per metre; the vertex itself sits on the ellipsoid.
            let point = GeodeticPoint::new(
                center.longitude_deg + e / metres_per_deg_lon,
                (center.latitude_deg + n / metres_per_deg_lat).clamp(-90.0, 90.0),
                0.0,
            );
            let (_, _, up) = point.enu_basis();
            let normal = geocentric_dir_to_render(up);

            positions.push(origin.to_render(point.to_geocentric()));
            normals.push(normal);
            uvs.push(Coordinates::from(normal).texture_uv());
        }
    }

    let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
    for row in 0..segments {
        for col in 0..segments {
            let i0 = row * stride + col;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;
            // East is +col and north is +row; wind counter-clockwise seen from above.
            indices.extend_from_slice(&[i0, i1, i3, i0, i3, i2]);
        }
    }

    build_mesh(positions, normals, uvs, indices)
}

fn build_mesh(positions: Vec<Vec3>, normals: Vec<Vec3>, uvs: Vec<[f32; 2]>, indices: Vec<u32>) -> Mesh {
    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    );
    mesh.insert_indices(Indices::U32(indices));
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh
}
