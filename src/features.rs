//! Deterministic, low-dimensional feature-vector extraction for the
//! Bayesian sampler's GP surrogate (spec.md §4.6).

use crate::space::software::DataflowKind;
use crate::space::Point;

/// Hardware feature vector (spec.md §4.6): `[num_simd_lane, bit_width,
/// bandwidth, Σ_i l{i}_buf_size/32768, Π subclusters, subclusters[0]]`.
pub fn hw_point_feats(hw_point: &Point, num_levels: usize) -> Vec<f64> {
    let mut feats = Vec::with_capacity(6);
    feats.push(hw_point.get_int("num_simd_lane").unwrap_or(0) as f64);
    feats.push(hw_point.get_int("bit_width").unwrap_or(0) as f64);
    feats.push(hw_point.get_int("bandwidth").unwrap_or(0) as f64);

    let buf_sum: f64 = (0..num_levels)
        .map(|i| hw_point.get_int(&format!("l{i}_buf_size")).unwrap_or(0) as f64 / 32768.0)
        .sum();
    feats.push(buf_sum);

    let subclusters = hw_point.get_int_tuple("subclusters").unwrap_or(&[]);
    feats.push(subclusters.iter().product::<i64>() as f64);
    feats.push(*subclusters.first().unwrap_or(&0) as f64);

    feats
}

/// Which software feature categories to include (spec.md §4.6's
/// `exclude_feat` selector, inverted to an inclusion set for clarity).
#[derive(Debug, Clone, Copy)]
pub struct SwFeatureSelector {
    pub original: bool,
    pub intuitive: bool,
    pub data_driven: bool,
    pub raw: bool,
}

impl Default for SwFeatureSelector {
    fn default() -> Self {
        SwFeatureSelector {
            original: true,
            intuitive: true,
            data_driven: true,
            raw: true,
        }
    }
}

/// Software feature vector (spec.md §4.6). For [`DataflowKind::Fixed`],
/// features reduce to just the `K`/`C` tile factors (spec.md's explicit
/// note that `fixed` mode has no spatial_dim/original/intuitive/
/// data-driven terms).
pub fn sw_point_feats(
    hw_point: &Point,
    sw_point: &Point,
    num_levels: usize,
    selector: &SwFeatureSelector,
    dataflow: DataflowKind,
) -> Vec<f64> {
    let mut feats = Vec::new();

    match dataflow {
        DataflowKind::Fixed => {
            for dim in ["K", "C"] {
                let tiles = sw_point.get_int_tuple(dim).unwrap_or(&[]);
                feats.extend(tiles.iter().map(|&v| v as f64));
            }
        }
        DataflowKind::Searched => {
            let mut spatial_dim_shapes: Vec<(String, f64)> = Vec::new();
            let mut subcluster_utilization = Vec::new();
            let mut iterations = Vec::new();

            for i in 0..num_levels {
                let spatial_dim = sw_point
                    .get_str(&format!("l{i}_spatial_dim"))
                    .unwrap_or("N")
                    .to_string();
                let spatial_tiles = sw_point.get_int_tuple(&spatial_dim).unwrap_or(&[]);

                if !spatial_dim_shapes.iter().any(|(d, _)| *d == spatial_dim) {
                    let product: i64 = spatial_tiles.iter().product();
                    spatial_dim_shapes.push((spatial_dim.clone(), product as f64));
                }

                if selector.original {
                    let subclusters = hw_point.get_int_tuple("subclusters").unwrap_or(&[]);
                    let num_subclusters = *subclusters.get(i).unwrap_or(&1) as f64;

                    let tile_i = *spatial_tiles.get(i).unwrap_or(&1) as f64;
                    let tile_i1 = *spatial_tiles.get(i + 1).unwrap_or(&1) as f64;

                    let degree_parallelism = (tile_i1 / tile_i).floor();
                    let actual_utilization = (degree_parallelism / num_subclusters).min(1.0);
                    subcluster_utilization.push(actual_utilization);

                    let spatial_width = tile_i1 * tile_i;
                    iterations.push((spatial_width / num_subclusters).ceil());
                }
            }

            if selector.original {
                feats.push(iterations.iter().product());
                feats.push(subcluster_utilization.iter().product());
                let r = sw_point.get_int_tuple("R").unwrap_or(&[0]);
                let s = sw_point.get_int_tuple("S").unwrap_or(&[0]);
                feats.push((*r.last().unwrap_or(&0) * *s.last().unwrap_or(&0)) as f64);
            }

            if selector.original || selector.intuitive {
                let shape_product: f64 = spatial_dim_shapes.iter().map(|(_, v)| *v).product();
                feats.push(shape_product);
            }

            if selector.data_driven {
                let x = sw_point.get_int_tuple("X").unwrap_or(&[0]);
                let y = sw_point.get_int_tuple("Y").unwrap_or(&[0]);
                let k = sw_point.get_int_tuple("K").unwrap_or(&[0]);
                let subclusters = hw_point.get_int_tuple("subclusters").unwrap_or(&[0, 0]);

                let k_last = *k.last().unwrap_or(&0) as f64;
                let k_second_last = k.get(k.len().wrapping_sub(2)).copied().unwrap_or(0) as f64;
                let k_third_last = k.get(k.len().wrapping_sub(3)).copied().unwrap_or(0) as f64;

                feats.push(
                    2.0 * *x.last().unwrap_or(&0) as f64
                        + 3.0 * *y.last().unwrap_or(&0) as f64
                        + 5.0 * k_last
                        + 7.0 * k_second_last
                        + 11.0 * k_third_last,
                );

                let x_ratio = *x.last().unwrap_or(&1) as f64 / *x.first().unwrap_or(&1) as f64;
                let y_ratio = *y.last().unwrap_or(&1) as f64 / *y.first().unwrap_or(&1) as f64;
                let subcluster_sum = (*subclusters.first().unwrap_or(&0)
                    + *subclusters.get(1).unwrap_or(&0)) as f64;
                feats.push(x_ratio * y_ratio * subcluster_sum);
            }

            if selector.raw {
                for dim in ["N", "K", "C", "X", "Y", "R", "S"] {
                    let tiles = sw_point.get_int_tuple(dim).unwrap_or(&[]);
                    feats.extend(tiles.iter().map(|&v| v as f64));
                }
                for i in 0..num_levels {
                    let spatial_dim = sw_point.get_str(&format!("l{i}_spatial_dim")).unwrap_or("N");
                    let code = spatial_dim.chars().next().map(|c| c as u32).unwrap_or(0);
                    feats.push(code as f64);
                }
            }
        }
    }

    feats
}
