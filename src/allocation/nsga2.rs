//! Hand-rolled NSGA-II over a binary candidate-selection chromosome (spec
//! §4.5 "Algorithm selection").
//!
//! Genes are real values in `[0, 1]`; a candidate is selected when its gene
//! exceeds `0.5`. This mirrors how a mixed-variable GA (e.g. pymoo's
//! `MixedVariableGA` wrapping a binary `Problem`) represents a binary
//! decision as a thresholded float so that SBX crossover and polynomial
//! mutation — both real-valued operators — apply directly.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::allocation::assign_capabilities;
use crate::config::defaults::{NSGA2_COVERAGE_CONSTRAINT, NSGA2_GENERATIONS, NSGA2_POPULATION, NSGA2_SEED};
use crate::types::{AllocationSolution, PipelineError, ResourceAssignment, ResourceCandidate};

const SBX_ETA: f64 = 20.0;
const MUTATION_ETA: f64 = 20.0;
const INFEASIBLE_PENALTY: [f64; 3] = [1000.0, 0.0, 1000.0];

#[derive(Clone)]
struct Individual {
    genes: Vec<f64>,
    objectives: [f64; 3],
    coverage_rate: f64,
    rank: usize,
    crowding: f64,
}

fn selected_indices(genes: &[f64]) -> Vec<usize> {
    genes.iter().enumerate().filter(|(_, g)| **g > 0.5).map(|(i, _)| i).collect()
}

fn evaluate(genes: &[f64], candidates: &[ResourceCandidate], required: &HashSet<String>) -> Individual {
    let indices = selected_indices(genes);

    if indices.is_empty() {
        return Individual {
            genes: genes.to_vec(),
            objectives: INFEASIBLE_PENALTY,
            coverage_rate: 0.0,
            rank: 0,
            crowding: 0.0,
        };
    }

    let covered: HashSet<&str> = indices
        .iter()
        .flat_map(|&i| candidates[i].capabilities.iter().filter(|c| required.contains(*c)).map(String::as_str))
        .collect();
    let coverage_rate = if required.is_empty() {
        1.0
    } else {
        covered.len() as f64 / required.len() as f64
    };

    if coverage_rate < NSGA2_COVERAGE_CONSTRAINT {
        return Individual {
            genes: genes.to_vec(),
            objectives: INFEASIBLE_PENALTY,
            coverage_rate,
            rank: 0,
            crowding: 0.0,
        };
    }

    let max_eta = indices.iter().map(|&i| candidates[i].eta_minutes).fold(0.0_f64, f64::max);
    let teams_count = indices.len() as f64;

    Individual {
        genes: genes.to_vec(),
        objectives: [max_eta, -coverage_rate, teams_count],
        coverage_rate,
        rank: 0,
        crowding: 0.0,
    }
}

fn dominates(a: &[f64; 3], b: &[f64; 3]) -> bool {
    let all_le = a.iter().zip(b.iter()).all(|(x, y)| x <= y);
    let any_lt = a.iter().zip(b.iter()).any(|(x, y)| x < y);
    all_le && any_lt
}

fn fast_non_dominated_sort(population: &mut [Individual]) -> Vec<Vec<usize>> {
    let n = population.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![vec![]; n];
    let mut domination_count = vec![0usize; n];
    let mut fronts: Vec<Vec<usize>> = vec![vec![]];

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if dominates(&population[i].objectives, &population[j].objectives) {
                dominated_by[i].push(j);
            } else if dominates(&population[j].objectives, &population[i].objectives) {
                domination_count[i] += 1;
            }
        }
        if domination_count[i] == 0 {
            population[i].rank = 0;
            fronts[0].push(i);
        }
    }

    let mut current = 0;
    while !fronts[current].is_empty() {
        let mut next_front = vec![];
        for &i in &fronts[current] {
            for &j in &dominated_by[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    population[j].rank = current + 1;
                    next_front.push(j);
                }
            }
        }
        current += 1;
        fronts.push(next_front);
    }
    fronts.pop();
    fronts
}

fn assign_crowding_distance(population: &mut [Individual], front: &[usize]) {
    let m = 3;
    for &i in front {
        population[i].crowding = 0.0;
    }
    for obj in 0..m {
        let mut sorted = front.to_vec();
        sorted.sort_by(|&a, &b| population[a].objectives[obj].partial_cmp(&population[b].objectives[obj]).unwrap());

        let min = population[sorted[0]].objectives[obj];
        let max = population[*sorted.last().unwrap()].objectives[obj];
        let range = if (max - min).abs() < 1e-12 { 1.0 } else { max - min };

        population[sorted[0]].crowding = f64::INFINITY;
        population[*sorted.last().unwrap()].crowding = f64::INFINITY;

        for w in 1..sorted.len().saturating_sub(1) {
            let prev = population[sorted[w - 1]].objectives[obj];
            let next = population[sorted[w + 1]].objectives[obj];
            population[sorted[w]].crowding += (next - prev) / range;
        }
    }
}

fn crowded_comparison_wins(a: &Individual, b: &Individual) -> bool {
    a.rank < b.rank || (a.rank == b.rank && a.crowding > b.crowding)
}

fn tournament_select<'a>(population: &'a [Individual], rng: &mut StdRng) -> &'a Individual {
    let a = &population[rng.gen_range(0..population.len())];
    let b = &population[rng.gen_range(0..population.len())];
    if crowded_comparison_wins(a, b) {
        a
    } else {
        b
    }
}

/// Simulated binary crossover on the `[0, 1]`-encoded chromosome.
fn sbx_crossover(parent_a: &[f64], parent_b: &[f64], rng: &mut StdRng) -> (Vec<f64>, Vec<f64>) {
    let mut child_a = vec![0.0; parent_a.len()];
    let mut child_b = vec![0.0; parent_a.len()];
    for i in 0..parent_a.len() {
        if rng.gen_bool(0.5) {
            let (p1, p2) = (parent_a[i], parent_b[i]);
            let u: f64 = rng.gen_range(0.0..1.0);
            let beta = if u <= 0.5 {
                (2.0 * u).powf(1.0 / (SBX_ETA + 1.0))
            } else {
                (1.0 / (2.0 * (1.0 - u))).powf(1.0 / (SBX_ETA + 1.0))
            };
            child_a[i] = (0.5 * ((1.0 + beta) * p1 + (1.0 - beta) * p2)).clamp(0.0, 1.0);
            child_b[i] = (0.5 * ((1.0 - beta) * p1 + (1.0 + beta) * p2)).clamp(0.0, 1.0);
        } else {
            child_a[i] = parent_a[i];
            child_b[i] = parent_b[i];
        }
    }
    (child_a, child_b)
}

/// Polynomial mutation applied gene-by-gene with probability `1 / n`.
fn polynomial_mutate(genes: &mut [f64], rng: &mut StdRng) {
    let prob = 1.0 / genes.len() as f64;
    for gene in genes.iter_mut() {
        if !rng.gen_bool(prob) {
            continue;
        }
        let u: f64 = rng.gen_range(0.0..1.0);
        let delta = if u < 0.5 {
            (2.0 * u).powf(1.0 / (MUTATION_ETA + 1.0)) - 1.0
        } else {
            1.0 - (2.0 * (1.0 - u)).powf(1.0 / (MUTATION_ETA + 1.0))
        };
        *gene = (*gene + delta).clamp(0.0, 1.0);
    }
}

fn decode(individual: &Individual, candidates: &[ResourceCandidate], required: &HashSet<String>) -> AllocationSolution {
    let indices = selected_indices(&individual.genes);
    let mut covered = HashSet::new();
    let mut assignments = vec![];
    for &i in &indices {
        let candidate = &candidates[i];
        let assigned = assign_capabilities(candidate, required, &covered, false);
        covered.extend(assigned.iter().cloned());
        assignments.push(ResourceAssignment {
            team_id: candidate.team_id.clone(),
            team_name: candidate.team_name.clone(),
            assigned_capabilities: assigned,
            distance_km: candidate.distance_km,
            eta_minutes: candidate.eta_minutes,
            match_score: candidate.match_score,
        });
    }
    AllocationSolution::build(format!("nsga2-{}", indices.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("-")), assignments, required)
}

/// Runs NSGA-II to completion (spec §4.5): population 50, 50 generations,
/// fixed seed 42. Returns the decoded, deduplicated non-dominated front.
pub fn optimize(
    candidates: &[ResourceCandidate],
    required: &HashSet<String>,
) -> Result<Vec<AllocationSolution>, PipelineError> {
    if candidates.is_empty() {
        return Err(PipelineError::OptimizationFailed("no candidates to select from".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(NSGA2_SEED);
    let n_genes = candidates.len();

    let mut population: Vec<Individual> = (0..NSGA2_POPULATION)
        .map(|_| {
            let genes: Vec<f64> = (0..n_genes).map(|_| rng.gen_range(0.0..1.0)).collect();
            evaluate(&genes, candidates, required)
        })
        .collect();

    for _ in 0..NSGA2_GENERATIONS {
        let fronts = fast_non_dominated_sort(&mut population);
        for front in &fronts {
            assign_crowding_distance(&mut population, front);
        }

        let mut offspring = Vec::with_capacity(NSGA2_POPULATION);
        while offspring.len() < NSGA2_POPULATION {
            let parent_a = tournament_select(&population, &mut rng).genes.clone();
            let parent_b = tournament_select(&population, &mut rng).genes.clone();
            let (mut child_a, mut child_b) = sbx_crossover(&parent_a, &parent_b, &mut rng);
            polynomial_mutate(&mut child_a, &mut rng);
            polynomial_mutate(&mut child_b, &mut rng);
            offspring.push(evaluate(&child_a, candidates, required));
            if offspring.len() < NSGA2_POPULATION {
                offspring.push(evaluate(&child_b, candidates, required));
            }
        }

        let mut combined: Vec<Individual> = population.into_iter().chain(offspring).collect();
        let fronts = fast_non_dominated_sort(&mut combined);
        for front in &fronts {
            assign_crowding_distance(&mut combined, front);
        }

        let mut next_generation = Vec::with_capacity(NSGA2_POPULATION);
        for front in &fronts {
            if next_generation.len() + front.len() <= NSGA2_POPULATION {
                next_generation.extend(front.iter().map(|&i| combined[i].clone()));
            } else {
                let mut remaining: Vec<usize> = front.clone();
                remaining.sort_by(|&a, &b| combined[b].crowding.partial_cmp(&combined[a].crowding).unwrap());
                let slots = NSGA2_POPULATION - next_generation.len();
                next_generation.extend(remaining.into_iter().take(slots).map(|i| combined[i].clone()));
                break;
            }
        }
        population = next_generation;
    }

    let mut final_front = fast_non_dominated_sort(&mut population);
    let rank0: Vec<Individual> = final_front
        .drain(..1)
        .next()
        .unwrap_or_default()
        .into_iter()
        .map(|i| population[i].clone())
        .filter(|ind| ind.coverage_rate >= NSGA2_COVERAGE_CONSTRAINT)
        .collect();

    let mut seen: Vec<HashSet<usize>> = vec![];
    let mut solutions = vec![];
    for individual in &rank0 {
        let indices: HashSet<usize> = selected_indices(&individual.genes).into_iter().collect();
        if seen.contains(&indices) {
            continue;
        }
        seen.push(indices);
        solutions.push(decode(individual, candidates, required));
    }

    Ok(solutions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;

    fn candidate(id: &str, caps: Vec<&str>, distance_km: f64, score: f64) -> ResourceCandidate {
        ResourceCandidate {
            team_id: id.to_string(),
            team_name: format!("Team {id}"),
            resource_type: "RESCUE_TEAM".to_string(),
            capabilities: caps.into_iter().map(String::from).collect(),
            location: Location::new(31.0, 104.0),
            distance_km,
            eta_minutes: distance_km / 40.0 * 60.0,
            capability_level: 4,
            personnel: 10,
            match_score: score,
        }
    }

    fn sample_candidates(n: usize) -> Vec<ResourceCandidate> {
        (0..n)
            .map(|i| {
                let caps = if i % 3 == 0 { vec!["LIFE_DETECTION"] } else { vec!["MEDICAL_TRIAGE"] };
                candidate(&format!("t{i}"), caps, 5.0 + i as f64 * 2.0, 0.9 - i as f64 * 0.01)
            })
            .collect()
    }

    #[test]
    fn optimize_is_deterministic_for_fixed_seed() {
        let candidates = sample_candidates(15);
        let required: HashSet<String> = ["LIFE_DETECTION".to_string(), "MEDICAL_TRIAGE".to_string()].into();
        let first = optimize(&candidates, &required).unwrap();
        let second = optimize(&candidates, &required).unwrap();
        let first_sets: Vec<HashSet<&str>> =
            first.iter().map(|s| s.assignments.iter().map(|a| a.team_id.as_str()).collect()).collect();
        let second_sets: Vec<HashSet<&str>> =
            second.iter().map(|s| s.assignments.iter().map(|a| a.team_id.as_str()).collect()).collect();
        assert_eq!(first_sets, second_sets);
    }

    #[test]
    fn optimize_only_returns_solutions_meeting_coverage_constraint() {
        let candidates = sample_candidates(15);
        let required: HashSet<String> = ["LIFE_DETECTION".to_string(), "MEDICAL_TRIAGE".to_string()].into();
        let solutions = optimize(&candidates, &required).unwrap();
        for solution in &solutions {
            assert!(solution.coverage_rate >= NSGA2_COVERAGE_CONSTRAINT);
        }
    }

    #[test]
    fn empty_candidates_is_setup_failure() {
        assert!(optimize(&[], &HashSet::new()).is_err());
    }

    #[test]
    fn dominates_requires_strict_improvement_in_at_least_one_objective() {
        assert!(dominates(&[1.0, 1.0, 1.0], &[1.0, 1.0, 2.0]));
        assert!(!dominates(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0]));
        assert!(!dominates(&[2.0, 1.0, 1.0], &[1.0, 1.0, 1.0]));
    }
}
