use geo::{Coord, Polygon, Rect};
use types::{validate_level, CoverageError, Result, MAX_GEOHASH_LEVEL};

pub const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

const INVALID: u8 = u8::MAX;

const fn build_decode_table() -> [u8; 128] {
    let mut table = [INVALID; 128];
    let mut i = 0;
    while i < BASE32.len() {
        table[BASE32[i] as usize] = i as u8;
        i += 1;
    }
    table
}

static DECODE_TABLE: [u8; 128] = build_decode_table();

/// Index of `c` in the geohash alphabet, if it belongs to it.
pub fn base32_index(c: char) -> Option<u8> {
    if !c.is_ascii() {
        return None;
    }
    match DECODE_TABLE[c as usize] {
        INVALID => None,
        index => Some(index),
    }
}

pub fn validate_geohash(hash: &str) -> Result<()> {
    if hash.is_empty() {
        return Err(CoverageError::invalid_code(hash, "empty geohash"));
    }
    if hash.len() > MAX_GEOHASH_LEVEL {
        return Err(CoverageError::invalid_code(
            hash,
            format!("longer than {MAX_GEOHASH_LEVEL} characters"),
        ));
    }
    if let Some(c) = hash.chars().find(|c| base32_index(*c).is_none()) {
        return Err(CoverageError::invalid_code(
            hash,
            format!("character {c:?} is not in the geohash alphabet"),
        ));
    }
    Ok(())
}

pub fn encode(lat: f64, lon: f64, level: usize) -> Result<String> {
    validate_level(level)?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(CoverageError::InvalidGeometry(format!(
            "coordinate out of range: lat {lat}, lon {lon}"
        )));
    }
    geohash::encode(Coord { x: lon, y: lat }, level)
        .map_err(|e| CoverageError::InvalidGeometry(e.to_string()))
}

/// Bounding box of a geohash, `min` is (lon_min, lat_min).
pub fn decode_bbox(hash: &str) -> Result<Rect> {
    validate_geohash(hash)?;
    geohash::decode_bbox(hash).map_err(|e| CoverageError::invalid_code(hash, e.to_string()))
}

pub fn geohash_to_polygon(hash: &str) -> Result<Polygon> {
    Ok(decode_bbox(hash)?.to_polygon())
}

/// The 32 geohashes one level below `hash`, in alphabet order.
pub fn children(hash: &str) -> Result<Vec<String>> {
    validate_geohash(hash)?;
    if hash.len() >= MAX_GEOHASH_LEVEL {
        return Err(CoverageError::invalid_range(
            hash.len() + 1,
            hash.len() + 1,
            format!("children of {hash:?} are finer than level {MAX_GEOHASH_LEVEL}"),
        ));
    }
    Ok(BASE32
        .iter()
        .map(|c| {
            let mut child = String::with_capacity(hash.len() + 1);
            child.push_str(hash);
            child.push(*c as char);
            child
        })
        .collect())
}

/// Number of bits spent on (longitude, latitude) at `level`.
///
/// Bits alternate starting with longitude, so longitude gets the extra bit
/// on odd totals.
pub fn axis_bits(level: usize) -> (u32, u32) {
    let bits = 5 * level as u32;
    (bits.div_ceil(2), bits / 2)
}

/// Degrees spanned by a tile at `level`, as (dlon, dlat).
pub fn tile_size(level: usize) -> Result<(f64, f64)> {
    validate_level(level)?;
    let (lon_bits, lat_bits) = axis_bits(level);
    Ok((
        360.0 / 2f64.powi(lon_bits as i32),
        180.0 / 2f64.powi(lat_bits as i32),
    ))
}

/// Union of the bounding boxes of `hashes`.
pub fn bbox_of_geohashes<S: AsRef<str>>(hashes: &[S]) -> Result<Rect> {
    let mut bbox: Option<Rect> = None;
    for hash in hashes {
        let rect = decode_bbox(hash.as_ref())?;
        bbox = Some(match bbox {
            None => rect,
            Some(acc) => Rect::new(
                Coord {
                    x: acc.min().x.min(rect.min().x),
                    y: acc.min().y.min(rect.min().y),
                },
                Coord {
                    x: acc.max().x.max(rect.max().x),
                    y: acc.max().y.max(rect.max().y),
                },
            ),
        });
    }
    bbox.ok_or_else(|| CoverageError::InvalidGeometry("no geohashes given".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, BooleanOps, Contains, MultiPolygon};
    use proptest::prelude::*;

    #[test]
    fn alphabet_lookup() {
        assert_eq!(base32_index('0'), Some(0));
        assert_eq!(base32_index('b'), Some(10));
        assert_eq!(base32_index('z'), Some(31));
        for c in ['a', 'i', 'l', 'o', 'A', 'é', '-'] {
            assert_eq!(base32_index(c), None, "{c}");
        }
    }

    #[test]
    fn rejects_codes_outside_alphabet() {
        for hash in ["u4pa", "i", "u4pl", "o", "U4PR", ""] {
            assert!(
                matches!(decode_bbox(hash), Err(CoverageError::InvalidCode { .. })),
                "{hash}"
            );
        }
        assert!(matches!(
            children("u4pO"),
            Err(CoverageError::InvalidCode { .. })
        ));
    }

    #[test]
    fn known_encoding() {
        assert_eq!(encode(57.64911, 10.40744, 11).unwrap(), "u4pruydqqvj");
        assert_eq!(encode(0.0, 0.0, 1).unwrap(), "s");
    }

    #[test]
    fn encode_rejects_bad_input() {
        assert!(matches!(
            encode(0.0, 0.0, 0),
            Err(CoverageError::InvalidRange { .. })
        ));
        assert!(matches!(
            encode(91.0, 0.0, 5),
            Err(CoverageError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn tile_size_alternates_axes() {
        assert_eq!(tile_size(1).unwrap(), (45.0, 45.0));
        assert_eq!(tile_size(2).unwrap(), (11.25, 5.625));
        let (dlon, dlat) = tile_size(5).unwrap();
        assert_eq!(dlon, 360.0 / 2f64.powi(13));
        assert_eq!(dlat, 180.0 / 2f64.powi(12));
        assert!(tile_size(0).is_err());
    }

    #[test]
    fn decoded_box_matches_tile_size() {
        let rect = decode_bbox("u4pr").unwrap();
        let (dlon, dlat) = tile_size(4).unwrap();
        assert!((rect.width() - dlon).abs() < 1e-12);
        assert!((rect.height() - dlat).abs() < 1e-12);
    }

    #[test]
    fn children_tile_the_parent() {
        let parent = decode_bbox("u4pr").unwrap();
        let kids = children("u4pr").unwrap();
        assert_eq!(kids.len(), 32);
        assert!(kids.iter().all(|k| k.len() == 5 && k.starts_with("u4pr")));

        let boxes: Vec<Rect> = kids.iter().map(|k| decode_bbox(k).unwrap()).collect();
        let total: f64 = boxes.iter().map(|b| b.unsigned_area()).sum();
        assert!((total - parent.unsigned_area()).abs() < 1e-12);

        let parent_poly = parent.to_polygon();
        for b in &boxes {
            assert!(parent_poly.contains(&b.center()));
        }

        for (i, a) in boxes.iter().enumerate() {
            for b in boxes.iter().skip(i + 1) {
                let overlap = MultiPolygon::new(vec![a.to_polygon()])
                    .intersection(&MultiPolygon::new(vec![b.to_polygon()]));
                assert!(overlap.unsigned_area() < 1e-15);
            }
        }
    }

    #[test]
    fn children_beyond_max_level_fail() {
        let deepest = encode(10.0, 10.0, MAX_GEOHASH_LEVEL).unwrap();
        assert!(matches!(
            children(&deepest),
            Err(CoverageError::InvalidRange { .. })
        ));
    }

    #[test]
    fn bbox_of_neighbours() {
        let a = decode_bbox("u4pr").unwrap();
        let bbox = bbox_of_geohashes(&["u4pr", "u4px"]).unwrap();
        let b = decode_bbox("u4px").unwrap();
        assert_eq!(bbox.min().x, a.min().x.min(b.min().x));
        assert_eq!(bbox.max().y, a.max().y.max(b.max().y));
        assert!(bbox_of_geohashes::<&str>(&[]).is_err());
    }

    proptest! {
        #[test]
        fn decoded_box_contains_encoded_point(
            lat in -90.0f64..=90.0,
            lon in -180.0f64..=180.0,
            level in 1usize..=MAX_GEOHASH_LEVEL,
        ) {
            let hash = encode(lat, lon, level).unwrap();
            prop_assert_eq!(hash.len(), level);
            let rect = decode_bbox(&hash).unwrap();
            prop_assert!(rect.min().x <= lon && lon <= rect.max().x);
            prop_assert!(rect.min().y <= lat && lat <= rect.max().y);
        }

        #[test]
        fn grandchildren_reconstruct_parent_area(
            lat in -80.0f64..80.0,
            lon in -170.0f64..170.0,
            level in 1usize..=6,
        ) {
            let hash = encode(lat, lon, level).unwrap();
            let parent = decode_bbox(&hash).unwrap().unsigned_area();
            let mut total = 0.0;
            for child in children(&hash).unwrap() {
                for grandchild in children(&child).unwrap() {
                    total += decode_bbox(&grandchild).unwrap().unsigned_area();
                }
            }
            prop_assert!((total - parent).abs() <= parent * 1e-9);
        }
    }
}
