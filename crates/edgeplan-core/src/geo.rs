//! Distances and S2 cell tokens.
//!
//! The runtime agent identifies locations by S2 cell tokens, so snapshot
//! records carry the token of the leaf cell containing each point. Only the
//! forward mapping (point → cell id → token) is implemented here.

use crate::types::{DistanceMetric, Location};

/// Deepest S2 subdivision level (leaf cells).
pub const MAX_LEVEL: u32 = 30;

const MAX_SIZE: u32 = 1 << MAX_LEVEL;
const POS_BITS: u32 = 2 * MAX_LEVEL + 1;

const SWAP_MASK: usize = 0x01;
const INVERT_MASK: usize = 0x02;

/// Hilbert curve position of each (i, j) quadrant, per orientation.
const IJ_TO_POS: [[u64; 4]; 4] = [
    [0, 1, 3, 2], // canonical
    [0, 3, 1, 2], // axes swapped
    [2, 3, 1, 0], // bits inverted
    [2, 1, 3, 0], // swapped & inverted
];

const POS_TO_ORIENTATION: [usize; 4] = [SWAP_MASK, 0, 0, INVERT_MASK | SWAP_MASK];

/// Distance between two locations under the given metric.
pub fn distance(metric: DistanceMetric, a: &Location, b: &Location) -> f64 {
    match metric {
        DistanceMetric::GreatCircle => great_circle(a, b),
        DistanceMetric::Euclidean => (a.lat - b.lat).hypot(a.lng - b.lng),
    }
}

/// Angular distance in radians (haversine).
pub fn great_circle(a: &Location, b: &Location) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// S2 cell id of the leaf cell containing `loc` (read as degrees).
pub fn leaf_cell_id(loc: &Location) -> u64 {
    let lat = loc.lat.to_radians();
    let lng = loc.lng.to_radians();
    let x = lat.cos() * lng.cos();
    let y = lat.cos() * lng.sin();
    let z = lat.sin();

    let (face, u, v) = xyz_to_face_uv(x, y, z);
    let i = st_to_ij(uv_to_st(u));
    let j = st_to_ij(uv_to_st(v));
    cell_id_from_face_ij(face, i, j)
}

/// Ancestor of `id` at `level` (0 = face cell).
pub fn parent_cell_id(id: u64, level: u32) -> u64 {
    let lsb = 1u64 << (2 * (MAX_LEVEL - level.min(MAX_LEVEL)));
    (id & lsb.wrapping_neg()) | lsb
}

/// Compact hex form of a cell id, trailing zeros stripped.
pub fn cell_token(id: u64) -> String {
    if id == 0 {
        return "X".to_string();
    }
    let hex = format!("{id:016x}");
    hex.trim_end_matches('0').to_string()
}

/// Token of the leaf cell containing `loc`.
pub fn location_token(loc: &Location) -> String {
    cell_token(leaf_cell_id(loc))
}

/// Token of the cell at `level` containing `loc`.
pub fn location_token_at_level(loc: &Location, level: u32) -> String {
    cell_token(parent_cell_id(leaf_cell_id(loc), level))
}

fn xyz_to_face_uv(x: f64, y: f64, z: f64) -> (u64, f64, f64) {
    let (ax, ay, az) = (x.abs(), y.abs(), z.abs());
    let axis = if ax > ay {
        if ax > az { 0 } else { 2 }
    } else if ay > az {
        1
    } else {
        2
    };
    let negative = match axis {
        0 => x < 0.0,
        1 => y < 0.0,
        _ => z < 0.0,
    };
    let face = if negative { axis + 3 } else { axis };

    let (u, v) = match face {
        0 => (y / x, z / x),
        1 => (-x / y, z / y),
        2 => (-x / z, -y / z),
        3 => (z / x, y / x),
        4 => (z / y, -x / y),
        _ => (-y / z, -x / z),
    };
    (face, u, v)
}

/// Quadratic projection used by S2 to even out cell areas.
fn uv_to_st(u: f64) -> f64 {
    if u >= 0.0 {
        0.5 * (1.0 + 3.0 * u).sqrt()
    } else {
        1.0 - 0.5 * (1.0 - 3.0 * u).sqrt()
    }
}

fn st_to_ij(s: f64) -> u32 {
    let scaled = (f64::from(MAX_SIZE) * s).floor();
    scaled.clamp(0.0, f64::from(MAX_SIZE - 1)) as u32
}

fn cell_id_from_face_ij(face: u64, i: u32, j: u32) -> u64 {
    let mut orientation = (face as usize) & SWAP_MASK;
    let mut pos: u64 = 0;

    for bit in (0..MAX_LEVEL).rev() {
        let quadrant = ((((i >> bit) & 1) << 1) | ((j >> bit) & 1)) as usize;
        let step = IJ_TO_POS[orientation][quadrant];
        pos = (pos << 2) | step;
        orientation ^= POS_TO_ORIENTATION[step as usize];
    }

    (face << POS_BITS) | (pos << 1) | 1
}
