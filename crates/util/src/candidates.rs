use geo::Rect;
use log::debug;
use types::{validate_level, CoverageError, Result};

use crate::geohash_helper::{axis_bits, encode, tile_size};

/// Geohashes at `level` whose tiles together cover `bbox`.
///
/// The bbox corners are snapped to the tile grid and every cell of the
/// resulting rectangle is emitted, row by row from the south-west corner.
/// Tiles that merely touch `bbox` from the outside are left out. Boxes
/// crossing the antimeridian cannot be expressed as a single `Rect` and are
/// not supported.
pub fn candidate_geohashes(bbox: &Rect, level: usize) -> Result<Vec<String>> {
    validate_level(level)?;
    let (min, max) = (bbox.min(), bbox.max());
    if ![min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
        return Err(CoverageError::InvalidGeometry(format!(
            "bounding box has non-finite coordinates: {bbox:?}"
        )));
    }

    let (dlon, dlat) = tile_size(level)?;
    let (lon_bits, lat_bits) = axis_bits(level);
    let columns = grid_span(min.x + 180.0, max.x + 180.0, dlon, 1u64 << lon_bits);
    let rows = grid_span(min.y + 90.0, max.y + 90.0, dlat, 1u64 << lat_bits);

    let mut hashes =
        Vec::with_capacity(((columns.1 - columns.0 + 1) * (rows.1 - rows.0 + 1)) as usize);
    for row in rows.0..=rows.1 {
        let lat = -90.0 + (row as f64 + 0.5) * dlat;
        for column in columns.0..=columns.1 {
            let lon = -180.0 + (column as f64 + 0.5) * dlon;
            hashes.push(encode(lat, lon, level)?);
        }
    }

    debug!(
        "{} candidate geohashes at level {} for {:?}",
        hashes.len(),
        level,
        bbox
    );
    Ok(hashes)
}

/// Inclusive range of cells touching [low, high] on one axis, measured from
/// the axis origin. An upper bound sitting exactly on a grid line does not
/// pull in the next cell.
fn grid_span(low: f64, high: f64, step: f64, cells: u64) -> (u64, u64) {
    let last = cells as f64 - 1.0;
    let first = (low / step).floor().clamp(0.0, last);
    let end = ((high / step).ceil() - 1.0).clamp(first, last);
    (first as u64, end as u64)
}
