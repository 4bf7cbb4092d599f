use crate::config::{BLOCK_COUNT, TaskConfig};
use iatex_core::{Condition, Polarity, ResultStore};
use tracing::{debug, info, warn};

pub type BlockSequence = [Condition; BLOCK_COUNT];

/// Where the counterbalancing seed came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOrigin {
    Config,
    Store,
    Clock,
}

/// Resolved design for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchedule {
    pub blocks: BlockSequence,
    /// Seed and its origin; `None` for the fixed, non-counterbalanced design.
    pub seed: Option<(Condition, SeedOrigin)>,
}

/// Produces the seven-block condition sequence and persists it.
pub struct ConditionScheduler<'a> {
    config: &'a TaskConfig,
}

impl<'a> ConditionScheduler<'a> {
    pub fn new(config: &'a TaskConfig) -> Self {
        Self { config }
    }

    /// Resolves the sequence, writes it (and the seed, when counterbalanced)
    /// to the store.
    pub fn resolve<S: ResultStore + ?Sized>(
        &self,
        store: &mut S,
        epoch_ms: u64,
    ) -> ResolvedSchedule {
        let schedule = if self.config.counterbalancing {
            let (seed, origin) = self.pick_seed(store, epoch_ms);
            info!(seed = %seed, ?origin, "counterbalancing seed resolved");
            ResolvedSchedule {
                blocks: counterbalanced_sequence(seed, self.config.switch_attribute),
                seed: Some((seed, origin)),
            }
        } else {
            ResolvedSchedule {
                blocks: fixed_sequence(self.config.switch_attribute),
                seed: None,
            }
        };

        let joined = schedule
            .blocks
            .iter()
            .map(Condition::code)
            .collect::<Vec<_>>()
            .join("|");
        debug!(sequence = %joined, "block conditions resolved");
        store.store(&self.config.key("blockConditions"), &joined);
        if let Some((seed, _)) = schedule.seed {
            store.store(&self.config.key("firstCombination"), &seed.code());
        }
        schedule
    }

    fn pick_seed<S: ResultStore + ?Sized>(
        &self,
        store: &S,
        epoch_ms: u64,
    ) -> (Condition, SeedOrigin) {
        if let Some(seed) = self.config.first_combination {
            return (seed, SeedOrigin::Config);
        }
        let key = self.config.key("firstCombination");
        if let Some(raw) = store.fetch(&key) {
            match raw.trim().parse::<Condition>() {
                Ok(seed) if seed.is_combined() => return (seed, SeedOrigin::Store),
                Ok(seed) => {
                    warn!(%key, %seed, "stored first combination is not combined, ignoring")
                }
                Err(e) => {
                    warn!(%key, value = %raw, error = %e, "unparseable first combination, ignoring")
                }
            }
        }
        (seed_from_clock(epoch_ms), SeedOrigin::Clock)
    }
}

/// Picks one of `p+`, `p-`, `n+`, `n-` from the wall clock. Not random in any
/// strong sense; sufficient for assigning subjects to orders.
pub fn seed_from_clock(epoch_ms: u64) -> Condition {
    Condition::COMBINED[(epoch_ms % Condition::COMBINED.len() as u64) as usize]
}

/// The design used when counterbalancing is off.
pub fn fixed_sequence(switch_attribute: bool) -> BlockSequence {
    use Polarity::{Negative as N, Positive as P};
    if switch_attribute {
        [
            Condition::target_only(P),
            Condition::attribute_only(P),
            Condition::combined(P, P),
            Condition::combined(P, P),
            Condition::attribute_only(N),
            Condition::combined(P, N),
            Condition::combined(P, N),
        ]
    } else {
        [
            Condition::target_only(P),
            Condition::attribute_only(P),
            Condition::combined(P, P),
            Condition::combined(P, P),
            Condition::target_only(N),
            Condition::combined(N, P),
            Condition::combined(N, P),
        ]
    }
}

/// Builds the sequence from a combined seed `s0 s1`: single target, single
/// attribute, the seed twice, one axis flipped alone, then the seed with
/// that axis flipped twice.
pub fn counterbalanced_sequence(seed: Condition, switch_attribute: bool) -> BlockSequence {
    let (Some(t), Some(a)) = (seed.target(), seed.attribute()) else {
        // unreachable for validated configs
        warn!(seed = %seed, "single-axis seed, using fixed sequence");
        return fixed_sequence(switch_attribute);
    };
    let (block5, block67) = if switch_attribute {
        (
            Condition::attribute_only(a.opposite()),
            Condition::combined(t, a.opposite()),
        )
    } else {
        (
            Condition::target_only(t.opposite()),
            Condition::combined(t.opposite(), a),
        )
    };
    [
        Condition::target_only(t),
        Condition::attribute_only(a),
        seed,
        seed,
        block5,
        block67,
        block67,
    ]
}
