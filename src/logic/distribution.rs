use super::graph::SwapPath;
use super::pools::{PoolId, PoolWrapper};
use super::types::Leg;
use alloy_primitives::Address;
use eyre::{Result, eyre};
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graphmap::DiGraphMap;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Remaining input below this share of the amount counts as placed.
const PLACEMENT_EPSILON: f64 = 1e-9;
/// A truncated step smaller than this share of the step is not worth a pool.
const MIN_TRUNCATED_SHARE: f64 = 1e-6;
const BISECTION_PRECISION: f64 = 1e-12;
const BISECTION_MAX_ROUNDS: usize = 200;
/// A bounded pool delivering this share of its capacity is reported as exhausted.
const CAPACITY_USED_SHARE: f64 = 1.0 - 1e-9;

/// Wall clock and iteration allowance shared by every distribution run of one search.
#[derive(Debug)]
pub struct SearchBudget {
    deadline: Option<Instant>,
    max_iterations: usize,
    iterations: AtomicUsize,
}

impl SearchBudget {
    pub fn new(deadline: Option<Duration>, max_iterations: usize) -> Self {
        Self { deadline: deadline.map(|d| Instant::now() + d), max_iterations, iterations: AtomicUsize::new(0) }
    }

    pub fn unlimited() -> Self {
        Self::new(None, usize::MAX)
    }

    /// Take one iteration. `false` once the deadline passed or the iterations are used up.
    pub fn consume(&self) -> bool {
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return false;
        }
        self.iterations.fetch_add(1, Ordering::Relaxed) < self.max_iterations
    }

    pub fn iterations(&self) -> usize {
        self.iterations.load(Ordering::Relaxed)
    }
}

/// Accumulated flow through one pool. A pool only ever carries flow in one direction.
#[derive(Clone, Debug)]
pub struct PoolFlow {
    pub pool: PoolWrapper,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: f64,
    pub amount_out: f64,
}

/// Placement of one hop of a path increment.
#[derive(Clone, Debug)]
struct HopFlow {
    pool_id: PoolId,
    amount_in: f64,
    amount_out: f64,
}

/// Effect of pushing an amount along a path on top of the current flows.
#[derive(Clone, Debug)]
struct PathIncrement {
    amount_in: f64,
    amount_out: f64,
    truncated: bool,
    new_gas_cost: f64,
    hops: Vec<HopFlow>,
}

impl PathIncrement {
    fn rate(&self) -> f64 {
        (self.amount_out - self.new_gas_cost) / self.amount_in
    }
}

/// Flows of one distribution run.
#[derive(Clone, Debug, Default)]
pub struct Distribution {
    /// Number of steps the amount was cut into
    pub steps: usize,
    pub flows: BTreeMap<PoolId, PoolFlow>,
    pub amount_placed: f64,
    pub amount_out: f64,
    pub gas_spent: u64,
    pub gas_cost: f64,
    /// The budget ran out and the rest was placed without optimization
    pub budget_expired: bool,
}

impl Distribution {
    fn new(steps: usize) -> Self {
        Self { steps, ..Default::default() }
    }

    pub fn net_output(&self) -> f64 {
        self.amount_out - self.gas_cost
    }

    pub fn is_fully_placed(&self, amount_in: f64) -> bool {
        amount_in - self.amount_placed <= amount_in * PLACEMENT_EPSILON
    }

    fn simulate(&self, path: &SwapPath, amount_in: f64, gas_unit_cost: f64) -> Option<PathIncrement> {
        let mut amount = amount_in;
        let mut truncated = false;
        let mut new_gas_cost = 0.0;
        let mut hops = Vec::with_capacity(path.len());

        for (token_from, pool, _) in path.hops() {
            let pool_id = pool.get_pool_id();
            let (base_in, base_out) = match self.flows.get(&pool_id) {
                // a pool never runs in both directions
                Some(flow) if flow.token_in != token_from.get_address() => return None,
                Some(flow) => (flow.amount_in, flow.amount_out),
                None => {
                    new_gas_cost += pool.gas_spent() as f64 * gas_unit_cost;
                    (0.0, 0.0)
                }
            };

            let quote = match pool.quote_output(token_from.get_address(), base_in + amount) {
                Ok(quote) => quote,
                Err(e) => {
                    trace!("Path skipped pool={} error={}", pool, e);
                    return None;
                }
            };
            truncated |= quote.capacity_exceeded;
            hops.push(HopFlow { pool_id, amount_in: base_in + amount, amount_out: quote.amount_out });

            amount = quote.amount_out - base_out;
            if amount.is_nan() || amount <= 0.0 {
                return None;
            }
        }

        Some(PathIncrement { amount_in, amount_out: amount, truncated, new_gas_cost, hops })
    }

    /// Largest increment not truncated by any pool, found by bisection.
    fn untruncated(&self, path: &SwapPath, amount_in: f64, gas_unit_cost: f64) -> Option<PathIncrement> {
        let increment = self.simulate(path, amount_in, gas_unit_cost)?;
        if !increment.truncated {
            return Some(increment);
        }

        let (mut low, mut high) = (0.0, amount_in);
        for _ in 0..BISECTION_MAX_ROUNDS {
            if high - low <= amount_in * BISECTION_PRECISION {
                break;
            }
            let middle = (low + high) / 2.0;
            match self.simulate(path, middle, gas_unit_cost) {
                Some(increment) if !increment.truncated => low = middle,
                _ => high = middle,
            }
        }

        if low < amount_in * MIN_TRUNCATED_SHARE {
            return None;
        }
        self.simulate(path, low, gas_unit_cost).filter(|increment| !increment.truncated)
    }

    /// Adding the path must keep the token flow graph acyclic.
    fn creates_cycle(&self, path: &SwapPath) -> bool {
        let mut token_flows = self.token_flow_graph();
        for (token_from, _, token_to) in path.hops() {
            token_flows.add_edge(token_from.get_address(), token_to.get_address(), ());
        }
        is_cyclic_directed(&token_flows)
    }

    fn token_flow_graph(&self) -> DiGraphMap<Address, ()> {
        let mut token_flows = DiGraphMap::new();
        for flow in self.flows.values() {
            token_flows.add_edge(flow.token_in, flow.token_out, ());
        }
        token_flows
    }

    fn best_increment(&self, paths: &[SwapPath], amount_in: f64, gas_unit_cost: f64) -> Option<(usize, PathIncrement)> {
        let mut best: Option<(usize, PathIncrement)> = None;
        for (index, path) in paths.iter().enumerate() {
            let Some(increment) = self.untruncated(path, amount_in, gas_unit_cost) else {
                continue;
            };
            if best.as_ref().is_some_and(|(_, current)| increment.rate() <= current.rate()) {
                continue;
            }
            if self.creates_cycle(path) {
                continue;
            }
            best = Some((index, increment));
        }
        best
    }

    fn apply(&mut self, path: &SwapPath, increment: PathIncrement) {
        for ((token_from, pool, token_to), hop) in path.hops().zip(increment.hops) {
            let flow = self.flows.entry(hop.pool_id).or_insert_with(|| PoolFlow {
                pool: pool.clone(),
                token_in: token_from.get_address(),
                token_out: token_to.get_address(),
                amount_in: 0.0,
                amount_out: 0.0,
            });
            flow.amount_in = hop.amount_in;
            flow.amount_out = hop.amount_out;
        }
        self.amount_placed += increment.amount_in;
        self.amount_out += increment.amount_out;
    }

    fn finish(mut self, gas_unit_cost: f64) -> Self {
        self.gas_spent = self.flows.values().map(|flow| flow.pool.gas_spent()).sum();
        self.gas_cost = self.gas_spent as f64 * gas_unit_cost;
        self
    }

    /// Legs in execution order. Tokens follow a topological order of the token flow graph,
    /// legs of one token go by descending input then by pool id.
    pub fn build_legs(&self) -> Result<Vec<Leg>> {
        let token_flows = self.token_flow_graph();
        let token_order = toposort(&token_flows, None).map_err(|cycle| eyre!("Token flow cycle at {:#}", cycle.node_id()))?;

        let mut legs = Vec::with_capacity(self.flows.len());
        for token in token_order {
            let mut outgoing: Vec<&PoolFlow> = self.flows.values().filter(|flow| flow.token_in == token).collect();
            if outgoing.is_empty() {
                continue;
            }
            outgoing.sort_by(|a, b| b.amount_in.total_cmp(&a.amount_in).then_with(|| a.pool.get_pool_id().cmp(&b.pool.get_pool_id())));

            let total: f64 = outgoing.iter().map(|flow| flow.amount_in).sum();
            let mut remaining = total;
            let last = outgoing.len() - 1;
            for (index, flow) in outgoing.into_iter().enumerate() {
                let (Some(token_to), Some(token_from)) = (flow.pool.token_out(flow.token_in), flow.pool.token_out(flow.token_out)) else {
                    return Err(eyre!("Pool {} does not hold the flow tokens", flow.pool));
                };
                let swap_portion = if index == last { 1.0 } else { flow.amount_in / remaining };
                remaining -= flow.amount_in;

                let capacity_exceeded = flow.pool.capacity().is_some_and(|capacity| flow.amount_out >= capacity * CAPACITY_USED_SHARE);
                legs.push(Leg {
                    pool_id: flow.pool.get_pool_id(),
                    pool_address: flow.pool.get_address(),
                    pool_class: flow.pool.get_class(),
                    provider: flow.pool.get_provider(),
                    token_from: token_from.clone(),
                    token_to: token_to.clone(),
                    assumed_amount_in: flow.amount_in,
                    assumed_amount_out: flow.amount_out,
                    swap_portion,
                    absolute_portion: flow.amount_in / total,
                    capacity_exceeded,
                });
            }
        }
        Ok(legs)
    }
}

/// Greedy flow distribution: cut the amount into `steps` equal parts and push each part along the
/// path with the best output per input given the flows already placed, net of the gas of newly used pools.
/// Repeated small steps equalize the marginal prices of parallel pools.
pub fn distribute(paths: &[SwapPath], amount_in: f64, steps: usize, gas_unit_cost: f64, budget: &SearchBudget) -> Distribution {
    let mut distribution = Distribution::new(steps);
    if paths.is_empty() || amount_in <= 0.0 || steps == 0 {
        return distribution;
    }
    let step_amount = amount_in / steps as f64;
    let epsilon = amount_in * PLACEMENT_EPSILON;

    loop {
        let remaining = amount_in - distribution.amount_placed;
        if remaining <= epsilon {
            break;
        }

        if !budget.consume() {
            // place the rest in one shot on the best path
            distribution.budget_expired = true;
            if let Some((index, increment)) = distribution.best_increment(paths, remaining, gas_unit_cost) {
                distribution.apply(&paths[index], increment);
            }
            break;
        }

        let Some((index, increment)) = distribution.best_increment(paths, step_amount.min(remaining), gas_unit_cost) else {
            debug!("No path takes more flow steps={} placed={} amount_in={}", steps, distribution.amount_placed, amount_in);
            break;
        };
        distribution.apply(&paths[index], increment);
    }

    distribution.finish(gas_unit_cost)
}

/// Run every step count and keep the best run: a fully placed run beats a partial one, then the
/// higher net output wins. Equal runs keep the earlier step count.
pub fn best_distribution(
    paths: &[SwapPath],
    amount_in: f64,
    distribution_steps: &[usize],
    gas_unit_cost: f64,
    parallel: bool,
    budget: &SearchBudget,
) -> Option<Distribution> {
    let runs: Vec<Distribution> = if parallel {
        distribution_steps.par_iter().map(|steps| distribute(paths, amount_in, *steps, gas_unit_cost, budget)).collect()
    } else {
        distribution_steps.iter().map(|steps| distribute(paths, amount_in, *steps, gas_unit_cost, budget)).collect()
    };

    let mut best: Option<Distribution> = None;
    for run in runs {
        if run.amount_placed <= 0.0 {
            continue;
        }
        let better = match &best {
            None => true,
            Some(current) => match (run.is_fully_placed(amount_in), current.is_fully_placed(amount_in)) {
                (true, false) => true,
                (false, true) => false,
                _ => run.net_output() > current.net_output(),
            },
        };
        if better {
            best = Some(run);
        }
    }
    best
}
