//! Generation of distinct stage-0 configurations for every bracket.

use std::collections::HashSet;

use hb_plan::HbSearch;
use hb_types::{GenerationError, HbResult};
use rand::RngCore;
use serde::Serialize;
use tracing::{debug, info};

use crate::render::{ConfigContext, ConfigRenderer};

/// Retries allowed for a single configuration before the space is declared
/// exhausted. With 97.5% of the space already used, about half of all draws
/// need more than this many retries.
pub const DEFAULT_MAX_RETRIES: u32 = 27;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationPolicy {
    pub max_retries: u32,
}

impl GenerationPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// A rendered configuration and where it lives in the search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedConfig {
    pub bracket: u32,
    pub index: u64,
    pub text: String,
}

/// Render `stage[0].n` configurations for every bracket of `search`, all
/// distinct across the whole search.
///
/// Output is fully determined by the renderer and the state of `rng`.
pub fn generate_configs<C, R>(
    search: &HbSearch,
    renderer: &C,
    rng: &mut R,
    policy: &GenerationPolicy,
) -> HbResult<Vec<GeneratedConfig>>
where
    C: ConfigRenderer + ?Sized,
    R: RngCore,
{
    let requested = search.initial_configs() as usize;
    let mut seen = HashSet::with_capacity(requested);
    let mut configs = Vec::with_capacity(requested);

    for bracket in &search.brackets {
        for index in 0..bracket.initial_configs() {
            let ctx = ConfigContext {
                search,
                bracket: bracket.id,
                index,
            };
            let text = render_distinct(renderer, &ctx, rng, &mut seen, policy, requested)?;
            configs.push(GeneratedConfig {
                bracket: bracket.id,
                index,
                text,
            });
        }
        debug!(
            "Bracket {}: generated {} configuration(s)",
            bracket.id,
            bracket.initial_configs()
        );
    }

    info!("Generated {} distinct configuration(s)", configs.len());
    Ok(configs)
}

fn render_distinct<C, R>(
    renderer: &C,
    ctx: &ConfigContext<'_>,
    rng: &mut R,
    seen: &mut HashSet<String>,
    policy: &GenerationPolicy,
    requested: usize,
) -> HbResult<String>
where
    C: ConfigRenderer + ?Sized,
    R: RngCore,
{
    let mut text = renderer.render(ctx, &mut *rng)?;
    let mut retries = 0;

    while seen.contains(&text) {
        if retries == policy.max_retries {
            return Err(GenerationError::SpaceExhausted {
                generated: seen.len(),
                requested,
                max_retries: policy.max_retries,
            }
            .into());
        }
        retries += 1;
        text = renderer.render(ctx, &mut *rng)?;
    }

    if retries > 0 {
        debug!(
            "Configuration {} of bracket {} needed {} retries",
            ctx.index, ctx.bracket, retries
        );
    }
    seen.insert(text.clone());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::SpaceRenderer;
    use crate::space::SearchSpace;
    use hb_plan::SearchParams;
    use hb_types::HbError;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::cell::Cell;

    /// Cycles through `size` distinct outputs, ignoring the rng.
    struct Cycle {
        size: u32,
        calls: Cell<u32>,
    }

    impl Cycle {
        fn new(size: u32) -> Self {
            Self {
                size,
                calls: Cell::new(0),
            }
        }
    }

    impl ConfigRenderer for Cycle {
        fn render(&self, _ctx: &ConfigContext<'_>, _rng: &mut dyn RngCore) -> HbResult<String> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            Ok(format!("value-{}", call % self.size))
        }
    }

    /// Draws one of `size` values from the rng.
    struct Draw {
        size: u32,
    }

    impl ConfigRenderer for Draw {
        fn render(&self, _ctx: &ConfigContext<'_>, rng: &mut dyn RngCore) -> HbResult<String> {
            Ok(rng.gen_range(0..self.size).to_string())
        }
    }

    fn search() -> HbSearch {
        // 4 + 3 + 3 initial configurations
        HbSearch::new(&SearchParams::new(2, 2)).unwrap()
    }

    #[test]
    fn generates_stage_zero_count_per_bracket() {
        let search = search();
        let configs = generate_configs(
            &search,
            &Draw { size: 1000 },
            &mut ChaCha8Rng::seed_from_u64(3),
            &GenerationPolicy::default(),
        )
        .unwrap();

        assert_eq!(configs.len(), 10);
        for bracket in &search.brackets {
            let indices: Vec<u64> = configs
                .iter()
                .filter(|c| c.bracket == bracket.id)
                .map(|c| c.index)
                .collect();
            let expected: Vec<u64> = (0..bracket.stages[0].n).collect();
            assert_eq!(indices, expected);
        }
    }

    #[test]
    fn configs_are_distinct_across_brackets() {
        let configs = generate_configs(
            &search(),
            &Draw { size: 20 },
            &mut ChaCha8Rng::seed_from_u64(11),
            &GenerationPolicy::default(),
        )
        .unwrap();

        let unique: HashSet<&str> = configs.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(unique.len(), configs.len());
    }

    #[test]
    fn same_seed_is_reproducible() {
        let search = search();
        let renderer = SpaceRenderer::new(SearchSpace::builtin()).unwrap();
        let policy = GenerationPolicy::default();

        let first =
            generate_configs(&search, &renderer, &mut ChaCha8Rng::seed_from_u64(42), &policy)
                .unwrap();
        let second =
            generate_configs(&search, &renderer, &mut ChaCha8Rng::seed_from_u64(42), &policy)
                .unwrap();
        let other =
            generate_configs(&search, &renderer, &mut ChaCha8Rng::seed_from_u64(43), &policy)
                .unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn exhausted_space_is_fatal() {
        // only 3 distinct outputs for 10 requested configurations
        let err = generate_configs(
            &search(),
            &Cycle::new(3),
            &mut ChaCha8Rng::seed_from_u64(0),
            &GenerationPolicy::default(),
        )
        .unwrap_err();

        match err {
            HbError::Generation(GenerationError::SpaceExhausted {
                generated,
                requested,
                max_retries,
            }) => {
                assert_eq!(generated, 3);
                assert_eq!(requested, 10);
                assert_eq!(max_retries, DEFAULT_MAX_RETRIES);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn retry_ceiling_counts_rerenders() {
        let search = HbSearch::new(&SearchParams::new(0, 2)).unwrap();
        let renderer = Cycle::new(1);
        let policy = GenerationPolicy::default().with_max_retries(5);

        // a single configuration renders once and never collides
        let configs =
            generate_configs(&search, &renderer, &mut ChaCha8Rng::seed_from_u64(0), &policy)
                .unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(renderer.calls.get(), 1);

        let two = HbSearch::new(&SearchParams::new(1, 2).with_brackets(vec![1])).unwrap();
        assert_eq!(two.initial_configs(), 2);
        let renderer = Cycle::new(1);
        assert!(
            generate_configs(&two, &renderer, &mut ChaCha8Rng::seed_from_u64(0), &policy).is_err()
        );
        // first config, then the colliding render plus five retries
        assert_eq!(renderer.calls.get(), 1 + 1 + 5);
    }

    #[test]
    fn collisions_within_ceiling_are_retried() {
        // outputs value-0, value-0, value-1, ... : every other render collides
        struct Stutter {
            calls: Cell<u32>,
        }
        impl ConfigRenderer for Stutter {
            fn render(&self, _: &ConfigContext<'_>, _: &mut dyn RngCore) -> HbResult<String> {
                let call = self.calls.get();
                self.calls.set(call + 1);
                Ok(format!("value-{}", call / 2))
            }
        }

        let renderer = Stutter {
            calls: Cell::new(0),
        };
        let configs = generate_configs(
            &search(),
            &renderer,
            &mut ChaCha8Rng::seed_from_u64(0),
            &GenerationPolicy::default().with_max_retries(1),
        )
        .unwrap();
        let texts: Vec<&str> = configs.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts[..3], ["value-0", "value-1", "value-2"]);
    }
}
