//! Rendering of a single random configuration.

use hb_plan::HbSearch;
use hb_types::HbResult;
use rand::RngCore;
use serde_json::{json, Value};

use crate::space::{Assignment, SearchSpace};
use crate::template::Template;

/// Coordinates of the configuration being rendered.
#[derive(Debug, Clone, Copy)]
pub struct ConfigContext<'a> {
    pub search: &'a HbSearch,
    /// Visible bracket id.
    pub bracket: u32,
    /// Index of the configuration within stage 0 of the bracket.
    pub index: u64,
}

impl ConfigContext<'_> {
    /// Template context exposing the coordinates next to the sampled values.
    pub fn to_value(&self, params: &Assignment) -> Value {
        json!({
            "folds": self.search.folds,
            "repetitions": self.search.repetitions,
            "search": self.search,
            "bracket": self.bracket,
            "index": self.index,
            "params": params,
        })
    }
}

/// Capability to render one configuration as text.
///
/// Implementations may draw from `rng`; given the same sequence of random
/// numbers they must return the same text.
pub trait ConfigRenderer {
    fn render(&self, ctx: &ConfigContext<'_>, rng: &mut dyn RngCore) -> HbResult<String>;
}

/// Samples a [`SearchSpace`] and renders the draw, either through a config
/// template or as a JSON document.
#[derive(Debug, Clone)]
pub struct SpaceRenderer {
    space: SearchSpace,
    template: Option<Template>,
}

impl SpaceRenderer {
    pub fn new(space: SearchSpace) -> HbResult<Self> {
        space.validate()?;
        Ok(Self {
            space,
            template: None,
        })
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.template = Some(template);
        self
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }
}

impl ConfigRenderer for SpaceRenderer {
    fn render(&self, ctx: &ConfigContext<'_>, rng: &mut dyn RngCore) -> HbResult<String> {
        let params = self.space.sample(rng);
        match &self.template {
            Some(template) => Ok(template.render(&ctx.to_value(&params))?),
            None => {
                let doc = json!({
                    "folds": ctx.search.folds,
                    "repetitions": ctx.search.repetitions,
                    "parameters": params,
                });
                let mut text = serde_json::to_string_pretty(&doc)?;
                text.push('\n');
                Ok(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::Distribution;
    use hb_plan::SearchParams;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn search() -> HbSearch {
        HbSearch::new(&SearchParams::new(1, 2).with_cross_validation(3, 2)).unwrap()
    }

    fn fixed_depth(depth: i64) -> SearchSpace {
        SearchSpace::new().with(
            "depth",
            Distribution::IntUniform {
                low: depth,
                high: depth,
            },
        )
    }

    #[test]
    fn json_rendering_without_template() {
        let search = search();
        let renderer = SpaceRenderer::new(fixed_depth(4)).unwrap();
        let ctx = ConfigContext {
            search: &search,
            bracket: 0,
            index: 1,
        };
        let text = renderer
            .render(&ctx, &mut ChaCha8Rng::seed_from_u64(0))
            .unwrap();

        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["folds"], 3);
        assert_eq!(doc["repetitions"], 2);
        assert_eq!(doc["parameters"]["depth"], 4);
        // coordinates must not leak into the content compared for uniqueness
        assert!(doc.get("index").is_none());
    }

    #[test]
    fn template_sees_params_and_coordinates() {
        let search = search();
        let template = Template::new(
            "config",
            "depth={{params.depth}} k={{folds}} b={{bracket}} i={{index}} eta={{search.eta}}",
        );
        let renderer = SpaceRenderer::new(fixed_depth(2))
            .unwrap()
            .with_template(template);
        let ctx = ConfigContext {
            search: &search,
            bracket: 1,
            index: 0,
        };
        let text = renderer
            .render(&ctx, &mut ChaCha8Rng::seed_from_u64(0))
            .unwrap();
        assert_eq!(text, "depth=2 k=3 b=1 i=0 eta=2");
    }

    #[test]
    fn rejects_invalid_space() {
        assert!(SpaceRenderer::new(SearchSpace::new()).is_err());

        let too_wide = SearchSpace::new().with(
            "x",
            Distribution::Uniform {
                low: -1e308,
                high: 1e308,
            },
        );
        assert!(matches!(
            SpaceRenderer::new(too_wide),
            Err(hb_types::HbError::Generation(hb_types::GenerationError::InvalidSpace { .. }))
        ));
    }
}
