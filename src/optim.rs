//! NSGA-II multi-objective optimizer.
//!
//! Real-coded genomes with SBX crossover and polynomial mutation, fast
//! non-dominated sorting, crowding-distance selection. All objectives are
//! minimized. The evaluator is injected as a closure; evaluations within
//! a generation are independent and run on a scoped rayon pool, while all
//! genetic-operator randomness stays on the driver thread so a fixed seed
//! reproduces the run.

use std::cmp::Ordering;
use std::path::PathBuf;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use thiserror::Error;

use crate::io;
use crate::util::StageTimer;

/// Parents closer than this per gene pass through SBX unchanged.
const SBX_EQUAL_EPS: f64 = 1e-14;

#[derive(Debug, Error)]
pub enum OptimError {
    #[error("population size must be positive")]
    EmptyPopulation,
    #[error("gene bounds are empty")]
    EmptyBounds,
    #[error("bound arrays differ in length: lower {lower} vs upper {upper}")]
    BoundsLengthMismatch { lower: usize, upper: usize },
    #[error("lower bound exceeds upper bound at gene {index}")]
    InvertedBound { index: usize },
}

/// Driver configuration. Validated by [`Nsga2::new`].
#[derive(Debug, Clone)]
pub struct Nsga2Config {
    pub population: usize,
    pub generations: usize,
    /// Probability that a parent pair undergoes SBX at all.
    pub crossover_rate: f64,
    /// Per-gene mutation probability.
    pub mutation_rate: f64,
    /// SBX distribution index.
    pub eta_crossover: f64,
    /// Polynomial-mutation distribution index.
    pub eta_mutation: f64,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub seed: u64,
    /// Evaluation worker threads; `None` uses the rayon default.
    pub workers: Option<usize>,
    /// When set, front-0 and best-genes CSVs are written here per
    /// generation.
    pub log_dir: Option<PathBuf>,
}

impl Default for Nsga2Config {
    fn default() -> Self {
        Self {
            population: 50,
            generations: 100,
            crossover_rate: 0.9,
            mutation_rate: 0.01,
            eta_crossover: 20.0,
            eta_mutation: 20.0,
            lower: Vec::new(),
            upper: Vec::new(),
            seed: 0,
            workers: None,
            log_dir: None,
        }
    }
}

/// One member of the population.
#[derive(Debug, Clone)]
pub struct Individual {
    pub genes: Vec<f64>,
    pub objectives: Vec<f64>,
    /// Non-domination rank; 0 is the Pareto front.
    pub rank: usize,
    /// Crowding distance within its front; +inf at front boundaries.
    pub crowding: f64,
}

impl Individual {
    fn new(genes: Vec<f64>) -> Self {
        Self {
            genes,
            objectives: Vec::new(),
            rank: usize::MAX,
            crowding: 0.0,
        }
    }

    /// Strict Pareto dominance under minimization: no objective worse,
    /// at least one strictly better.
    pub fn dominates(&self, other: &Individual) -> bool {
        let mut strictly_better = false;
        for (a, b) in self.objectives.iter().zip(&other.objectives) {
            if a > b {
                return false;
            }
            if a < b {
                strictly_better = true;
            }
        }
        strictly_better
    }

    fn objective_sum(&self) -> f64 {
        self.objectives.iter().sum()
    }
}

/// NSGA-II driver.
pub struct Nsga2 {
    config: Nsga2Config,
    rng: ChaCha8Rng,
    population: Vec<Individual>,
}

impl Nsga2 {
    pub fn new(config: Nsga2Config) -> Result<Self, OptimError> {
        if config.population == 0 {
            return Err(OptimError::EmptyPopulation);
        }
        if config.lower.is_empty() {
            return Err(OptimError::EmptyBounds);
        }
        if config.lower.len() != config.upper.len() {
            return Err(OptimError::BoundsLengthMismatch {
                lower: config.lower.len(),
                upper: config.upper.len(),
            });
        }
        if let Some(index) = (0..config.lower.len()).find(|&g| config.lower[g] > config.upper[g])
        {
            return Err(OptimError::InvertedBound { index });
        }
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            rng,
            population: Vec::new(),
        })
    }

    /// Run the configured number of generations against `evaluate`, which
    /// maps a genome to the objective vector (minimization). Evaluations
    /// never feed errors back into the loop; the evaluator must return a
    /// legal objective vector for any in-bounds genome.
    pub fn run<F>(&mut self, evaluate: F) -> anyhow::Result<()>
    where
        F: Fn(&[f64]) -> Vec<f64> + Sync,
    {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(workers) = self.config.workers {
            builder = builder.num_threads(workers);
        }
        let pool = builder.build()?;

        if let Some(dir) = &self.config.log_dir {
            std::fs::create_dir_all(dir)?;
        }

        self.initialize();
        evaluate_all(&pool, &mut self.population, &evaluate);
        let fronts = fast_non_dominated_sort(&mut self.population);
        assign_crowding(&mut self.population, &fronts);

        for generation in 0..self.config.generations {
            let timer = StageTimer::inner("generation");
            let mut offspring = self.make_offspring();
            evaluate_all(&pool, &mut offspring, &evaluate);
            self.select(offspring);

            if let Some(dir) = self.config.log_dir.clone() {
                self.write_generation_logs(&dir, generation)?;
            }
            timer.finish(format!(
                "{} of {}: front 0 holds {} of {}",
                generation + 1,
                self.config.generations,
                self.population.iter().filter(|i| i.rank == 0).count(),
                self.population.len()
            ));
        }
        Ok(())
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Rank-0 individuals of the current population.
    pub fn pareto_front(&self) -> Vec<&Individual> {
        self.population.iter().filter(|i| i.rank == 0).collect()
    }

    /// Individual with the lowest objective sum, used for the
    /// per-generation "best genes" log and the exported design.
    pub fn best_by_objective_sum(&self) -> Option<&Individual> {
        self.population.iter().min_by(|a, b| {
            a.objective_sum()
                .partial_cmp(&b.objective_sum())
                .unwrap_or(Ordering::Equal)
        })
    }

    fn initialize(&mut self) {
        let genome_len = self.config.lower.len();
        let mut population = Vec::with_capacity(self.config.population);
        for _ in 0..self.config.population {
            let mut genes = Vec::with_capacity(genome_len);
            for g in 0..genome_len {
                genes.push(
                    self.rng
                        .gen_range(self.config.lower[g]..=self.config.upper[g]),
                );
            }
            population.push(Individual::new(genes));
        }
        self.population = population;
    }

    /// Binary tournament: lower rank wins, ties go to the more isolated
    /// individual.
    fn tournament(&mut self) -> usize {
        let a = self.rng.gen_range(0..self.population.len());
        let b = self.rng.gen_range(0..self.population.len());
        let ia = &self.population[a];
        let ib = &self.population[b];
        if ia.rank != ib.rank {
            if ia.rank < ib.rank {
                a
            } else {
                b
            }
        } else if ia.crowding >= ib.crowding {
            a
        } else {
            b
        }
    }

    fn make_offspring(&mut self) -> Vec<Individual> {
        let target = self.config.population;
        let mut offspring = Vec::with_capacity(target);
        while offspring.len() < target {
            let p1 = self.tournament();
            let p2 = self.tournament();
            let (mut c1, mut c2) = self.crossover(p1, p2);
            self.mutate(&mut c1);
            self.mutate(&mut c2);
            offspring.push(Individual::new(c1));
            if offspring.len() < target {
                offspring.push(Individual::new(c2));
            }
        }
        offspring
    }

    /// SBX over one parent pair. The whole pair is cloned through when the
    /// crossover trial fails; equal genes pass through unchanged.
    fn crossover(&mut self, p1: usize, p2: usize) -> (Vec<f64>, Vec<f64>) {
        let mut c1 = self.population[p1].genes.clone();
        let mut c2 = self.population[p2].genes.clone();
        if self.rng.gen::<f64>() > self.config.crossover_rate {
            return (c1, c2);
        }

        let eta = self.config.eta_crossover;
        for g in 0..c1.len() {
            let (x1, x2) = (c1[g], c2[g]);
            if (x1 - x2).abs() <= SBX_EQUAL_EPS {
                continue;
            }
            let lo = self.config.lower[g];
            let hi = self.config.upper[g];
            let y1 = x1.min(x2);
            let y2 = x1.max(x2);

            let u: f64 = self.rng.gen();
            let beta = 1.0 + 2.0 * (y1 - lo) / (y2 - y1);
            let alpha = 2.0 - beta.powf(-(eta + 1.0));
            let beta_q = if u <= 1.0 / alpha {
                (u * alpha).powf(1.0 / (eta + 1.0))
            } else {
                (1.0 / (2.0 - u * alpha)).powf(1.0 / (eta + 1.0))
            };

            let mut lower_child = 0.5 * ((y1 + y2) - beta_q * (y2 - y1));
            let mut upper_child = 0.5 * ((y1 + y2) + beta_q * (y2 - y1));
            if self.rng.gen::<f64>() < 0.5 {
                std::mem::swap(&mut lower_child, &mut upper_child);
            }
            c1[g] = lower_child.clamp(lo, hi);
            c2[g] = upper_child.clamp(lo, hi);
        }
        (c1, c2)
    }

    /// Deb & Goyal polynomial mutation, per gene.
    fn mutate(&mut self, genes: &mut [f64]) {
        let eta = self.config.eta_mutation;
        for g in 0..genes.len() {
            if self.rng.gen::<f64>() > self.config.mutation_rate {
                continue;
            }
            let lo = self.config.lower[g];
            let hi = self.config.upper[g];
            let span = hi - lo;
            if span <= 0.0 {
                continue;
            }
            let x = genes[g];
            let d1 = (x - lo) / span;
            let d2 = (hi - x) / span;

            let u: f64 = self.rng.gen();
            let dq = if u < 0.5 {
                let v = 2.0 * u + (1.0 - 2.0 * u) * (1.0 - d1).powf(eta + 1.0);
                v.powf(1.0 / (eta + 1.0)) - 1.0
            } else {
                let v = 2.0 * (1.0 - u) + 2.0 * (u - 0.5) * (1.0 - d2).powf(eta + 1.0);
                1.0 - v.powf(1.0 / (eta + 1.0))
            };
            genes[g] = (x + dq * span).clamp(lo, hi);
        }
    }

    /// Environmental selection over parents plus offspring: fill front by
    /// front, truncating the first overflowing front by decreasing
    /// crowding distance.
    fn select(&mut self, mut offspring: Vec<Individual>) {
        let mut combined = std::mem::take(&mut self.population);
        combined.append(&mut offspring);

        let fronts = fast_non_dominated_sort(&mut combined);
        assign_crowding(&mut combined, &fronts);

        let target = self.config.population;
        let mut next = Vec::with_capacity(target);
        for front in fronts {
            if next.len() == target {
                break;
            }
            if next.len() + front.len() <= target {
                for idx in front {
                    next.push(combined[idx].clone());
                }
            } else {
                let mut overflow = front;
                overflow.sort_by(|&a, &b| {
                    combined[b]
                        .crowding
                        .partial_cmp(&combined[a].crowding)
                        .unwrap_or(Ordering::Equal)
                });
                for idx in overflow.into_iter().take(target - next.len()) {
                    next.push(combined[idx].clone());
                }
            }
        }
        self.population = next;
    }

    fn write_generation_logs(&self, dir: &std::path::Path, generation: usize) -> anyhow::Result<()> {
        let front = self.pareto_front();
        io::write_front_csv(&dir.join(format!("gen_{}_front0.csv", generation)), &front)?;
        if let Some(best) = self.best_by_objective_sum() {
            io::write_best_genes_csv(
                &dir.join(format!("gen_{}_bestGenes.csv", generation)),
                &best.genes,
            )?;
        }
        Ok(())
    }
}

/// Evaluate every individual that has no objectives yet. Order of
/// evaluation is unspecified; results land in layout order.
fn evaluate_all<F>(pool: &rayon::ThreadPool, individuals: &mut [Individual], evaluate: &F)
where
    F: Fn(&[f64]) -> Vec<f64> + Sync,
{
    pool.install(|| {
        individuals.par_iter_mut().for_each(|ind| {
            if ind.objectives.is_empty() {
                ind.objectives = evaluate(&ind.genes);
            }
        });
    });
}

/// Fast non-dominated sort. Assigns ranks in place and returns the fronts
/// as index lists, best first.
fn fast_non_dominated_sort(population: &mut [Individual]) -> Vec<Vec<usize>> {
    let n = population.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if population[i].dominates(&population[j]) {
                dominated_by[i].push(j);
                domination_count[j] += 1;
            } else if population[j].dominates(&population[i]) {
                dominated_by[j].push(i);
                domination_count[i] += 1;
            }
        }
    }

    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();
    let mut rank = 0;
    while !current.is_empty() {
        for &i in &current {
            population[i].rank = rank;
        }
        let mut next = Vec::new();
        for &i in &current {
            for &j in &dominated_by[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next.push(j);
                }
            }
        }
        fronts.push(current);
        current = next;
        rank += 1;
    }
    fronts
}

/// Crowding distance per front; boundary individuals get +inf so they are
/// always preserved over interior ones.
fn assign_crowding(population: &mut [Individual], fronts: &[Vec<usize>]) {
    for ind in population.iter_mut() {
        ind.crowding = 0.0;
    }
    let objectives = match population.first() {
        Some(ind) => ind.objectives.len(),
        None => return,
    };

    for front in fronts {
        if front.len() <= 2 {
            for &i in front {
                population[i].crowding = f64::INFINITY;
            }
            continue;
        }
        let mut order = front.clone();
        for m in 0..objectives {
            order.sort_by(|&a, &b| {
                population[a].objectives[m]
                    .partial_cmp(&population[b].objectives[m])
                    .unwrap_or(Ordering::Equal)
            });
            let first = order[0];
            let last = order[order.len() - 1];
            population[first].crowding = f64::INFINITY;
            population[last].crowding = f64::INFINITY;

            let f_min = population[first].objectives[m];
            let f_max = population[last].objectives[m];
            let range = if (f_max - f_min).abs() > 1e-12 {
                f_max - f_min
            } else {
                1.0
            };
            for w in 1..order.len() - 1 {
                let spread = population[order[w + 1]].objectives[m]
                    - population[order[w - 1]].objectives[m];
                if population[order[w]].crowding.is_finite() {
                    population[order[w]].crowding += spread / range;
                }
            }
        }
    }
}
