use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use types::{
    validate_level_range, validate_threshold, CoverageError, CoverageResult, CoverageTile,
    Result,
};
use util::{children, decode_bbox};

use crate::single_level::{check_target, seed_candidates, TileClass};
use crate::target::{overlap_floor, CoverageTarget, TilePiece};

/// A tile waiting to be measured.
///
/// `piece` is the geometry clipped to the tile's parent. Seed tiles have
/// none and are measured against the whole target.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontierTile {
    pub hash: String,
    pub piece: Option<Arc<TilePiece>>,
}

impl From<String> for FrontierTile {
    fn from(hash: String) -> Self {
        FrontierTile { hash, piece: None }
    }
}

/// Result of evaluating one frontier.
#[derive(Debug, Clone, Default)]
pub struct LevelOutcome {
    pub level: usize,
    pub accepted: Vec<CoverageTile>,
    /// Number of tiles that were partially covered at this level.
    pub partial: usize,
    /// Children of the partial tiles, empty at the last level.
    pub next_frontier: Vec<FrontierTile>,
}

/// Classifies `frontier` at `level` and expands partial tiles.
///
/// Covering tiles are accepted and never refined. Partial tiles are split
/// into their 32 children unless `level` is `max_level`, where they are
/// dropped. Tiles without overlap are pruned; the overlap floor is scaled
/// to `max_level` tiles so small features survive coarse levels.
pub fn refine_level<T>(
    target: &T,
    frontier: Vec<FrontierTile>,
    level: usize,
    max_level: usize,
    threshold: f64,
) -> Result<LevelOutcome>
where
    T: CoverageTarget + ?Sized,
{
    let floor = overlap_floor(level, max_level);
    let measured = frontier
        .into_par_iter()
        .map(|tile| {
            let bbox = decode_bbox(&tile.hash)?;
            let ratio = match &tile.piece {
                Some(piece) => piece.coverage_ratio(&bbox),
                None => target.coverage_ratio(&bbox),
            };
            let class = TileClass::with_floor(ratio, threshold, floor);
            let piece = match (class, &tile.piece) {
                (TileClass::Partial, Some(piece)) if level < max_level => {
                    Some(Arc::new(piece.clip(&bbox)))
                }
                (TileClass::Partial, None) if level < max_level => target.clip(&bbox).map(Arc::new),
                _ => None,
            };
            Ok::<_, CoverageError>((tile.hash, bbox, class, piece))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut outcome = LevelOutcome {
        level,
        ..Default::default()
    };

    for (hash, bbox, class, piece) in measured {
        match class {
            TileClass::Covering => outcome.accepted.push(CoverageTile { hash, level, bbox }),
            TileClass::Partial => {
                outcome.partial += 1;
                if level < max_level {
                    outcome
                        .next_frontier
                        .extend(children(&hash)?.into_iter().map(|child| FrontierTile {
                            hash: child,
                            piece: piece.clone(),
                        }));
                }
            }
            TileClass::Outside => {}
        }
    }

    Ok(outcome)
}

/// Breadth-first refinement from `min_level` down to `max_level`.
///
/// Returns the accepted geohashes per level and the same tiles as a flat
/// list tagged with their level.
pub fn adaptive_coverage_for_target<T>(
    target: &T,
    min_level: usize,
    max_level: usize,
    threshold: f64,
) -> Result<(CoverageResult, Vec<CoverageTile>)>
where
    T: CoverageTarget + ?Sized,
{
    validate_level_range(min_level, max_level)?;
    validate_threshold(threshold)?;
    check_target(target)?;

    let start = Instant::now();
    let mut result = CoverageResult::new();
    let mut tiles = Vec::<CoverageTile>::new();

    let seeds = seed_candidates(target, min_level)?;
    let mut queue = VecDeque::<(usize, Vec<FrontierTile>)>::new();
    queue.push_back((min_level, seeds.into_iter().map(FrontierTile::from).collect()));

    while let Some((level, frontier)) = queue.pop_front() {
        let frontier_size = frontier.len();
        let outcome = refine_level(target, frontier, level, max_level, threshold)?;

        debug!(
            "level {}: frontier {}, accepted {}, partial {}",
            level,
            frontier_size,
            outcome.accepted.len(),
            outcome.partial
        );

        let accepted = result.ensure_level(level);
        accepted.extend(outcome.accepted.iter().map(|tile| tile.hash.clone()));
        tiles.extend(outcome.accepted);

        if !outcome.next_frontier.is_empty() {
            queue.push_back((level + 1, outcome.next_frontier));
        }
    }

    info!(
        "adaptive coverage levels {}-{}: {} tiles in {:.2?}",
        min_level,
        max_level,
        tiles.len(),
        start.elapsed()
    );
    Ok((result, tiles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetGeometry;
    use geo::{coord, polygon, Rect};
    use util::{candidate_geohashes, decode_bbox};

    fn l_shape() -> TargetGeometry {
        TargetGeometry::new(
            polygon![
                (x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0),
                (x: 1.0, y: 1.0), (x: 1.0, y: 3.0), (x: 0.0, y: 3.0)
            ],
            true,
        )
        .unwrap()
    }

    #[test]
    fn frontier_grows_by_32_per_partial_tile() {
        let target = l_shape();
        let bbox = target.bounding_box().unwrap();
        let frontier: Vec<FrontierTile> = candidate_geohashes(&bbox, 3)
            .unwrap()
            .into_iter()
            .map(FrontierTile::from)
            .collect();

        let outcome = refine_level(&target, frontier.clone(), 3, 5, 0.95).unwrap();
        assert!(outcome.partial > 0);
        assert_eq!(outcome.next_frontier.len(), 32 * outcome.partial);
        assert!(outcome.next_frontier.iter().all(|tile| tile.piece.is_some()));

        let last = refine_level(&target, frontier, 3, 3, 0.95).unwrap();
        assert_eq!(last.partial, outcome.partial);
        assert!(last.next_frontier.is_empty());
    }

    #[test]
    fn accepted_tiles_are_never_refined() {
        let target = l_shape();
        let (result, tiles) = adaptive_coverage_for_target(&target, 2, 5, 0.95).unwrap();
        assert_eq!(tiles.len(), result.total_tiles());

        for tile in &tiles {
            assert_eq!(tile.hash.len(), tile.level);
            for coarser in &tiles {
                if coarser.level < tile.level {
                    assert!(!tile.hash.starts_with(&coarser.hash));
                }
            }
        }
    }

    #[test]
    fn single_level_range_matches_single_level_engine() {
        let target = l_shape();
        let (adaptive, _) = adaptive_coverage_for_target(&target, 4, 4, 0.95).unwrap();
        let single = crate::single_level::coverage_for_target(&target, 4, 0.95).unwrap();
        assert_eq!(adaptive, single);
    }

    #[test]
    fn exact_tile_is_accepted_at_its_level() {
        let target = TargetGeometry::new(decode_bbox("u4pr").unwrap().to_polygon(), true).unwrap();
        let (result, tiles) = adaptive_coverage_for_target(&target, 1, 6, 0.95).unwrap();
        assert_eq!(result.total_tiles(), 1);
        assert!(result.contains(4, "u4pr"));
        assert_eq!(tiles[0].level, 4);
        assert!(result.get(5).is_none());
    }

    #[test]
    fn small_island_survives_coarse_seed_levels() {
        let island = Rect::new(coord! { x: 10.0, y: 57.0 }, coord! { x: 10.001, y: 57.001 });
        let target = TargetGeometry::new(island, true).unwrap();

        let single = crate::single_level::coverage_for_target(&target, 8, 0.95).unwrap();
        let (adaptive, tiles) = adaptive_coverage_for_target(&target, 1, 8, 0.95).unwrap();
        assert!(!single.is_empty());
        assert!(!tiles.is_empty());
        for hash in single.geohashes() {
            assert!(
                (1..=8).any(|level| adaptive.contains(level, &hash[..level])),
                "{hash} lost"
            );
        }
    }

    #[test]
    fn deep_exact_tiles_are_found_from_level_one() {
        for hash in ["u4prstv", "dr5rs14", "7zzzzzzzm", "s0000000000p"] {
            let bbox = decode_bbox(hash).unwrap();
            let target = TargetGeometry::new(bbox.to_polygon(), true).unwrap();
            let (result, tiles) =
                adaptive_coverage_for_target(&target, 1, hash.len(), 0.95).unwrap();
            assert_eq!(result.total_tiles(), 1, "{hash}");
            assert!(result.contains(hash.len(), hash), "{hash}");
            assert_eq!(tiles[0].bbox, bbox);
        }
    }

    #[test]
    fn rejects_inverted_range() {
        let target = l_shape();
        assert!(matches!(
            adaptive_coverage_for_target(&target, 5, 2, 0.95),
            Err(CoverageError::InvalidRange { .. })
        ));
    }
}
