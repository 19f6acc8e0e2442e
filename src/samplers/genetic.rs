//! Genetic-algorithm sampler: batches of points bred from the previous
//! generation's valid, fitter members (spec.md §4.4).

use super::Sampler;
use crate::results::Results;
use crate::space::{Point, Space};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

/// Probability of crossing a father with a promising mother.
pub const CROSS_RATE: f64 = 0.8;
/// Per-gene mutation probability.
pub const MUTATION_RATE: f64 = 0.05;
/// Parameter of the geometric distribution used to pick how far down the
/// fitness-sorted prior generation the mother comes from.
pub const PARENT_P: f64 = 0.2;

/// Maintains a generation of `batch_size` points plus a parallel validity
/// bitmap; breeds the next generation from the previous one's valid
/// members once the batch is exhausted (spec.md §4.4).
pub struct GeneticSampler {
    batch_size: usize,
    batch: Vec<Point>,
    validity: Vec<bool>,
    cursor: usize,
    rng: StdRng,
}

impl GeneticSampler {
    pub fn new(batch_size: usize, seed: u64) -> Self {
        assert!(batch_size > 0, "genetic sampler batch size must be positive");
        GeneticSampler {
            batch_size,
            batch: Vec::new(),
            validity: Vec::new(),
            cursor: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn regenerate(&mut self, space: &Space, prev_fitness: Option<&[f64]>) {
        let prev_gen: Option<Vec<Point>> = if self.batch.is_empty() {
            None
        } else {
            Some(
                self.batch
                    .iter()
                    .zip(self.validity.iter())
                    .filter_map(|(point, &valid)| if valid { Some(point.clone()) } else { None })
                    .collect(),
            )
        };

        self.batch = generate_batch(
            space,
            self.batch_size,
            prev_gen.as_deref(),
            prev_fitness,
            &mut self.rng,
        );
        self.validity = vec![true; self.batch_size];
        self.cursor = 0;
    }
}

impl Sampler for GeneticSampler {
    fn reset(&mut self, space: &Space) {
        self.batch.clear();
        self.validity.clear();
        self.regenerate(space, None);
    }

    fn next(&mut self, space: &Space, results: &Results<Point>) -> Point {
        if self.cursor >= self.batch.len() {
            let valid_count = self.validity.iter().filter(|&&v| v).count();
            let fitness = if valid_count > 0 && results.values.len() >= valid_count {
                let start = results.values.len() - valid_count;
                Some(&results.values[start..])
            } else {
                None
            };
            self.regenerate(space, fitness);
        }
        self.batch[self.cursor].clone()
    }

    fn notify(&mut self, success: bool) {
        if self.cursor < self.validity.len() {
            self.validity[self.cursor] = success;
        }
        self.cursor += 1;
    }
}

/// Sample from a geometric distribution with success probability `p` via
/// repeated Bernoulli trials (support starts at 1), matching
/// `numpy.random.geometric`.
fn sample_geometric<R: Rng + ?Sized>(rng: &mut R, p: f64) -> u64 {
    let mut k = 1u64;
    while !rng.gen_bool(p) {
        k += 1;
    }
    k
}

/// Breed one offspring from `father`, optionally crossing with a fitness-
/// weighted mother and applying per-gene mutation (spec.md §4.4).
fn crossover_and_mutate<R: Rng + ?Sized>(
    father: &Point,
    pop: &[Point],
    pop_fitness: &[f64],
    rng: &mut R,
) -> Point {
    let mut genes: Vec<_> = father.iter().map(|(l, v)| (l.to_string(), v.clone())).collect();
    let dna_length = genes.len();

    if rng.gen_bool(CROSS_RATE) && !pop.is_empty() {
        let mut sort_idx: Vec<usize> = (0..pop_fitness.len()).collect();
        sort_idx.sort_by(|&a, &b| {
            pop_fitness[a]
                .partial_cmp(&pop_fitness[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut p = sample_geometric(rng, PARENT_P) as usize - 1;
        while p >= pop.len() {
            p = sample_geometric(rng, PARENT_P) as usize - 1;
        }
        let mother = &pop[sort_idx[p]];

        for i in 0..dna_length {
            if rng.gen_bool(0.5) {
                if let Some((_, mv)) = mother.iter().nth(i) {
                    genes[i].1 = mv.clone();
                }
            }
        }
    }

    for i in 0..dna_length {
        if rng.gen_bool(MUTATION_RATE) && !pop.is_empty() {
            let donor_idx = rng.gen_range(0..pop.len());
            let donor = &pop[donor_idx];
            if let Some((_, dv)) = donor.iter().nth(i) {
                genes[i].1 = dv.clone();
            }
        }
    }

    let mut offspring = Point::new();
    for (label, value) in genes {
        offspring.set(label, value);
    }
    offspring
}

/// Build a batch of `batch_size` points: bred from `last_gen`/`last_gen_f`
/// if present, else uniformly random (spec.md §4.4).
fn generate_batch<R: Rng + ?Sized>(
    space: &Space,
    batch_size: usize,
    last_gen: Option<&[Point]>,
    last_gen_f: Option<&[f64]>,
    rng: &mut R,
) -> Vec<Point> {
    let mut points = Vec::with_capacity(batch_size);
    match (last_gen, last_gen_f) {
        (Some(pop), Some(pop_f)) if !pop.is_empty() => {
            let mut order: Vec<usize> = (0..pop.len()).collect();
            let mut member_idx = pop.len();
            while points.len() < batch_size {
                if member_idx >= pop.len() {
                    member_idx = 0;
                    shuffle(&mut order, rng);
                }
                let father = &pop[order[member_idx]];
                points.push(crossover_and_mutate(father, pop, pop_f, rng));
                member_idx += 1;
            }
        }
        _ => {
            for _ in 0..batch_size {
                points.push(space.random_point(rng));
            }
        }
    }
    points
}

fn shuffle<R: Rng + ?Sized>(order: &mut [usize], rng: &mut R) {
    for i in (1..order.len()).rev() {
        let j = rng.gen_range(0..=i);
        order.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{ParamValue, Parameter};

    fn tiny_space() -> Space {
        Space::new(
            vec![
                Parameter::new("a", vec![ParamValue::Int(0), ParamValue::Int(1)]),
                Parameter::new("b", vec![ParamValue::Int(10), ParamValue::Int(20)]),
            ],
            1,
        )
    }

    #[test]
    fn empty_population_skips_crossover_and_mutation() {
        let space = tiny_space();
        let mut rng = StdRng::seed_from_u64(42);
        let father = space.random_point(&mut rng);
        let pop_f: Vec<f64> = Vec::new();

        let offspring = crossover_and_mutate(&father, &[], &pop_f, &mut rng);
        assert_eq!(offspring, father);
    }

    #[test]
    fn generate_batch_without_prior_generation_is_random_fill() {
        let space = tiny_space();
        let mut rng = StdRng::seed_from_u64(1);
        let batch = generate_batch(&space, 5, None, None, &mut rng);
        assert_eq!(batch.len(), 5);
    }

    #[test]
    fn sampler_produces_full_batch_before_regenerating() {
        let space = tiny_space();
        let mut sampler = GeneticSampler::new(3, 5);
        sampler.reset(&space);
        let results = Results::new();
        for _ in 0..3 {
            let _ = sampler.next(&space, &results);
            sampler.notify(true);
        }
        // A 4th call must trigger a fresh generation without panicking.
        let _ = sampler.next(&space, &results);
    }
}
