//! Dataflow string construction (spec.md §4.3).
//!
//! A dataflow string is a comma-separated sequence of tokens describing a
//! hierarchical mapping: `T<dim>|<size>` (temporal tile), `S<dim>|<size>`
//! (spatial unroll), `C` (cluster/level boundary).

use crate::constraints::LevelConfig;
use crate::space::software::{LayerShape, DIM_ORDER};

/// Build the dataflow string for the `searched` family (spec.md §4.3).
///
/// `levels` is in the crate's canonical DRAM-closest-first order (index 0
/// farthest from the PE). Walking it forward therefore visits levels
/// outer-to-inner: for each level, emit the spatial unroll token, then a
/// temporal tile token for every other dimension in canonical order, then
/// a cluster boundary unless this is the innermost (PE-closest) level.
/// Each step clamps the next (more PE-ward) level's spatial-dim tile to
/// not exceed the current one's, which is what keeps tile sizes
/// non-increasing from DRAM to PE.
pub fn build_searched(levels: &mut [LevelConfig]) -> String {
    let mut tokens = Vec::new();
    let n = levels.len();
    for i in 0..n {
        let spatial = levels[i].spatial_dim;
        if let Some(s_dim) = spatial {
            let tile = *levels[i].tile_sizes.get(s_dim).unwrap_or(&1);
            tokens.push(format!("S{s_dim}|{tile}"));
            for dim in DIM_ORDER {
                if dim == s_dim {
                    continue;
                }
                let t = *levels[i].tile_sizes.get(dim).unwrap_or(&1);
                tokens.push(format!("T{dim}|{t}"));
            }
            if i + 1 < n {
                let next_tile = *levels[i + 1].tile_sizes.get(s_dim).unwrap_or(&1);
                let clamped = next_tile.min(tile);
                levels[i + 1].tile_sizes.insert(s_dim, clamped);
                tokens.push("C".to_string());
            }
        } else {
            for dim in DIM_ORDER {
                let t = *levels[i].tile_sizes.get(dim).unwrap_or(&1);
                tokens.push(format!("T{dim}|{t}"));
            }
            if i + 1 < n {
                tokens.push("C".to_string());
            }
        }
    }
    tokens.join(",")
}

/// Hard-coded baseline dataflow templates (spec.md §4.3, §6). These are
/// fixed token sequences parameterized only by the layer shape and the two
/// level configs' tile sizes / sub-cluster counts — not enumerated by the
/// software space.
pub fn build_fixed(name: &str, shape: &LayerShape, levels: &[LevelConfig]) -> Option<String> {
    let l0 = levels.first()?;
    let l1 = levels.get(1)?;
    let tokens: Vec<String> = match name {
        "eye" => vec![
            format!("TC|{}", l0.tile_sizes.get("C").unwrap_or(&1)),
            format!("TK|{}", l0.tile_sizes.get("K").unwrap_or(&1)),
            format!("SY'|{}", l1.num_sub_clusters),
            format!("TX'|{}", shape.s),
            format!("TR|{}", shape.r),
            format!("TS|{}", shape.s),
            "C".to_string(),
            "TC|1".to_string(),
            "SY'|1".to_string(),
            "SX'|1".to_string(),
            format!("TR|{}", shape.r),
            format!("TS|{}", shape.s),
        ],
        "shi" => vec![
            format!("TK|{}", l0.tile_sizes.get("K").unwrap_or(&1)),
            format!("SY'|{}", shape.r),
            format!("TX|{}", l1.num_sub_clusters),
            format!("TC|{}", l0.tile_sizes.get("C").unwrap_or(&1)),
            format!("TR|{}", shape.r),
            format!("TS|{}", shape.s),
            "C".to_string(),
            "TC|1".to_string(),
            "TY'|1".to_string(),
            "SX'|1".to_string(),
            format!("TR|{}", shape.r),
            format!("TS|{}", shape.s),
        ],
        "dla" => vec![
            format!("SK|{}", l0.tile_sizes.get("K").unwrap_or(&1)),
            format!("TC|{}", l1.num_sub_clusters),
            format!("TR|{}", shape.r),
            format!("TS|{}", shape.s),
            format!("TY|{}", shape.r),
            format!("TX|{}", shape.s),
            "C".to_string(),
            "SC|1".to_string(),
            format!("TY|{}", shape.r),
            format!("TX|{}", shape.s),
            format!("TR|{}", shape.r),
            format!("TS|{}", shape.s),
        ],
        _ => return None,
    };
    Some(tokens.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn tiles(entries: &[(&'static str, i64)]) -> HashMap<&'static str, i64> {
        entries.iter().cloned().collect()
    }

    #[test]
    fn searched_emits_spatial_token_before_temporal_tokens() {
        let mut levels = vec![
            LevelConfig::new(
                "L0",
                1024,
                2,
                tiles(&[("N", 1), ("K", 4), ("C", 2), ("X", 8), ("Y", 8), ("R", 3), ("S", 3)]),
                Some("K"),
            ),
            LevelConfig::new(
                "L1",
                1024,
                2,
                tiles(&[("N", 1), ("K", 2), ("C", 2), ("X", 4), ("Y", 4), ("R", 3), ("S", 3)]),
                Some("X"),
            ),
        ];
        let dataflow = build_searched(&mut levels);
        assert!(dataflow.starts_with("SK|4"));
        assert!(dataflow.contains(",C,"));
        assert!(!dataflow.ends_with(",C"));
    }

    #[test]
    fn searched_clamps_next_level_spatial_tile() {
        let mut levels = vec![
            LevelConfig::new("L0", 1024, 2, tiles(&[("K", 4)]), Some("K")),
            LevelConfig::new("L1", 1024, 2, tiles(&[("K", 8)]), Some("K")),
        ];
        build_searched(&mut levels);
        assert_eq!(*levels[1].tile_sizes.get("K").unwrap(), 4);
    }

    #[test]
    fn fixed_templates_round_trip_token_count() {
        let shape = LayerShape { n: 1, k: 4, c: 2, x: 8, y: 8, r: 3, s: 3 };
        let levels = vec![
            LevelConfig::new("L0", 1024, 2, tiles(&[("K", 4), ("C", 2)]), None),
            LevelConfig::new("L1", 1024, 2, tiles(&[]), None),
        ];
        for name in ["eye", "shi", "dla"] {
            let dataflow = build_fixed(name, &shape, &levels).unwrap();
            assert_eq!(dataflow.split(',').count(), 12);
        }
    }

    #[test]
    fn unknown_template_name_returns_none() {
        let shape = LayerShape { n: 1, k: 1, c: 1, x: 1, y: 1, r: 1, s: 1 };
        let levels = vec![LevelConfig::new("L0", 1, 1, tiles(&[]), None), LevelConfig::new("L1", 1, 1, tiles(&[]), None)];
        assert!(build_fixed("bogus", &shape, &levels).is_none());
    }
}
