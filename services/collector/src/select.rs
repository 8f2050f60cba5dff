use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Chooses which discovered sources a run processes.
pub trait SourceSelector {
    /// Pick at most the configured number of links, in processing order.
    fn select(&mut self, links: &[String]) -> Vec<String>;
}

/// Takes the first `limit` links as listed.
#[derive(Debug, Clone)]
pub struct FirstN {
    limit: usize,
}

impl FirstN {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl SourceSelector for FirstN {
    fn select(&mut self, links: &[String]) -> Vec<String> {
        links.iter().take(self.limit).cloned().collect()
    }
}

/// Always takes the first listed link (the current publishing cycle), then
/// fills the remaining slots with a random sample of the older ones.
#[derive(Debug, Clone)]
pub struct LatestPlusRandom {
    limit: usize,
    rng: StdRng,
}

impl LatestPlusRandom {
    pub fn from_entropy(limit: usize) -> Self {
        Self {
            limit,
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sampling, for tests and re-runs.
    pub fn seeded(limit: usize, seed: u64) -> Self {
        Self {
            limit,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl SourceSelector for LatestPlusRandom {
    fn select(&mut self, links: &[String]) -> Vec<String> {
        let Some((latest, rest)) = links.split_first() else {
            return Vec::new();
        };
        if self.limit == 0 {
            return Vec::new();
        }

        let mut picked = vec![latest.clone()];
        picked.extend(rest.choose_multiple(&mut self.rng, self.limit - 1).cloned());
        picked
    }
}

/// Pick the selector for a run: listing order when `in_order` is set,
/// otherwise latest-plus-random, seeded when a seed is given.
pub fn build_selector(limit: usize, in_order: bool, seed: Option<u64>) -> Box<dyn SourceSelector> {
    match (in_order, seed) {
        (true, _) => Box::new(FirstN::new(limit)),
        (false, Some(seed)) => Box::new(LatestPlusRandom::seeded(limit, seed)),
        (false, None) => Box::new(LatestPlusRandom::from_entropy(limit)),
    }
}
