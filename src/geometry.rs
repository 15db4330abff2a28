//! Planar geometry helpers: centroids and point-in-polygon tests

use crate::projection::Coordinate;

/// Ray-casting point-in-ring test. Points exactly on an edge may fall either way.
pub fn ring_contains(ring: &[Coordinate], point: Coordinate) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;

    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

/// Signed area and area-weighted centroid sum of a ring (shoelace formula)
fn ring_moments(ring: &[Coordinate]) -> (f64, f64, f64) {
    let mut area2 = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;

    for pair in ring.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let cross = a.x * b.y - b.x * a.y;
        area2 += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }

    // close the ring if the file didn't
    if let (Some(&last), Some(&first)) = (ring.last(), ring.first()) {
        if last != first {
            let cross = last.x * first.y - first.x * last.y;
            area2 += cross;
            cx += (last.x + first.x) * cross;
            cy += (last.y + first.y) * cross;
        }
    }

    (area2 / 2.0, cx, cy)
}

/// Arithmetic mean of a set of points
pub fn mean_point(points: &[Coordinate]) -> Option<Coordinate> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Coordinate::new(sx / n, sy / n))
}

/// Area-weighted centroid of one or more polygons, each given as rings
/// (exterior first, then holes). Falls back to the vertex mean when the
/// total area is zero.
pub fn polygons_centroid<'a, I>(polygons: I) -> Option<Coordinate>
where
    I: IntoIterator<Item = &'a [Vec<Coordinate>]>,
{
    let mut total_area = 0.0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut vertices = Vec::new();

    for rings in polygons {
        for (index, ring) in rings.iter().enumerate() {
            let (area, cx, cy) = ring_moments(ring);
            // exterior counts positive, holes negative, regardless of winding
            let hole = if index == 0 { 1.0 } else { -1.0 };
            let weight = hole * area.signum();
            total_area += weight * area;
            sum_x += weight * cx;
            sum_y += weight * cy;
            if index == 0 {
                vertices.extend_from_slice(ring);
            }
        }
    }

    if total_area.abs() < f64::EPSILON {
        return mean_point(&vertices);
    }

    Some(Coordinate::new(
        sum_x / (6.0 * total_area),
        sum_y / (6.0 * total_area),
    ))
}
