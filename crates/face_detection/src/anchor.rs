use itertools::iproduct;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::ImageSize;

/// A single feature map level of the detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureLevel {
    /// Anchor sizes in input pixels, emitted in this order for every grid cell.
    pub min_sizes: Vec<u32>,
    /// Stride of the feature map in input pixels.
    pub step: u32,
}

impl FeatureLevel {
    #[must_use]
    pub fn new(min_sizes: impl Into<Vec<u32>>, step: u32) -> Self {
        Self {
            min_sizes: min_sizes.into(),
            step,
        }
    }

    /// Number of grid rows and columns of this level for the given input size.
    ///
    /// The input size is divided by the stride and rounded half to even.
    #[must_use]
    pub fn grid_size(&self, input_size: ImageSize) -> (usize, usize) {
        if self.step == 0 {
            return (0, 0);
        }

        let step = f64::from(self.step);
        let rows = (f64::from(input_size.height) / step).round_ties_even() as usize;
        let cols = (f64::from(input_size.width) / step).round_ties_even() as usize;
        (rows, cols)
    }
}

/// The feature levels of the detector: strides 8, 16 and 32, with two anchor sizes each.
#[must_use]
pub fn default_levels() -> Vec<FeatureLevel> {
    vec![
        FeatureLevel::new([16, 32], 8),
        FeatureLevel::new([64, 128], 16),
        FeatureLevel::new([256, 512], 32),
    ]
}

/// A prior box, with its center and size normalized by the input size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prior {
    pub cx: f32,
    pub cy: f32,
    pub s_kx: f32,
    pub s_ky: f32,
}

/// Generates the prior boxes the detector regresses its outputs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorBoxGenerator {
    levels: Vec<FeatureLevel>,
}

impl Default for PriorBoxGenerator {
    fn default() -> Self {
        Self::new(default_levels())
    }
}

impl PriorBoxGenerator {
    #[must_use]
    pub fn new(levels: Vec<FeatureLevel>) -> Self {
        Self { levels }
    }

    #[must_use]
    pub fn levels(&self) -> &[FeatureLevel] {
        &self.levels
    }

    /// Number of priors generated for the given input size.
    #[must_use]
    pub fn num_priors(&self, input_size: ImageSize) -> usize {
        self.levels
            .iter()
            .map(|level| {
                let (rows, cols) = level.grid_size(input_size);
                rows * cols * level.min_sizes.len()
            })
            .sum()
    }

    /// Iterate over the priors in the order the detector emits its outputs.
    ///
    /// Levels come first, then the grid cells of a level in row-major order, and finally the
    /// anchor sizes of that level.
    pub fn priors(&self, input_size: ImageSize) -> impl Iterator<Item = Prior> + '_ {
        let width = f64::from(input_size.width);
        let height = f64::from(input_size.height);

        self.levels.iter().flat_map(move |level| {
            let (rows, cols) = level.grid_size(input_size);
            let step = f64::from(level.step);

            iproduct!(0..rows, 0..cols, level.min_sizes.iter()).map(move |(row, col, &min_size)| {
                let min_size = f64::from(min_size);

                Prior {
                    cx: ((col as f64 + 0.5) * step / width) as f32,
                    cy: ((row as f64 + 0.5) * step / height) as f32,
                    s_kx: (min_size / width) as f32,
                    s_ky: (min_size / height) as f32,
                }
            })
        })
    }

    /// Generate all priors as a `(num_priors, 4)` array, with columns `cx, cy, s_kx, s_ky`.
    #[must_use]
    pub fn generate(&self, input_size: ImageSize) -> Array2<f32> {
        let mut priors = Array2::zeros((self.num_priors(input_size), 4));

        for (mut row, prior) in priors.rows_mut().into_iter().zip(self.priors(input_size)) {
            row[0] = prior.cx;
            row[1] = prior.cy;
            row[2] = prior.s_kx;
            row[3] = prior.s_ky;
        }

        priors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prior_count_640() {
        let generator = PriorBoxGenerator::default();
        let input = ImageSize::new(640, 640);

        let grids = generator
            .levels()
            .iter()
            .map(|level| level.grid_size(input))
            .collect::<Vec<_>>();
        assert_eq!(grids, vec![(80, 80), (40, 40), (20, 20)]);

        assert_eq!(generator.num_priors(input), 16800);
        assert_eq!(generator.generate(input).dim(), (16800, 4));
    }

    #[test]
    fn min_sizes_are_innermost() {
        let generator = PriorBoxGenerator::default();
        let priors = generator
            .priors(ImageSize::new(640, 640))
            .take(4)
            .collect::<Vec<_>>();

        // first cell, both sizes
        assert_eq!(priors[0].cx, 4.0 / 640.0);
        assert_eq!(priors[0].cy, 4.0 / 640.0);
        assert_eq!(priors[0].s_kx, 16.0 / 640.0);
        assert_eq!(priors[1].cx, priors[0].cx);
        assert_eq!(priors[1].s_kx, 32.0 / 640.0);

        // then the next column of the same row
        assert_eq!(priors[2].cx, 12.0 / 640.0);
        assert_eq!(priors[2].cy, 4.0 / 640.0);
        assert_eq!(priors[2].s_kx, 16.0 / 640.0);
        assert_eq!(priors[3].s_kx, 32.0 / 640.0);
    }

    #[test]
    fn levels_are_outermost() {
        let generator = PriorBoxGenerator::default();
        let input = ImageSize::new(640, 640);
        let first_of_level_two = generator.priors(input).nth(80 * 80 * 2).unwrap();

        assert_eq!(first_of_level_two.cx, 8.0 / 640.0);
        assert_eq!(first_of_level_two.s_kx, 64.0 / 640.0);
    }

    #[test]
    fn rows_follow_height_and_columns_follow_width() {
        let generator = PriorBoxGenerator::new(vec![FeatureLevel::new([16], 8)]);
        let input = ImageSize::new(32, 16);

        assert_eq!(generator.levels()[0].grid_size(input), (2, 4));

        let priors = generator.priors(input).collect::<Vec<_>>();
        assert_eq!(priors.len(), 8);

        // the fifth prior starts the second row
        assert_eq!(priors[4].cx, 4.0 / 32.0);
        assert_eq!(priors[4].cy, 12.0 / 16.0);
        assert_eq!(priors[4].s_kx, 0.5);
        assert_eq!(priors[4].s_ky, 1.0);
    }

    #[test]
    fn grid_size_rounds_half_to_even() {
        let level = FeatureLevel::new([16], 8);

        // 20 / 8 = 2.5 and 28 / 8 = 3.5
        assert_eq!(level.grid_size(ImageSize::new(20, 28)), (4, 2));
        // 21 / 8 = 2.625
        assert_eq!(level.grid_size(ImageSize::new(21, 21)), (3, 3));
    }

    #[test]
    fn generate_matches_priors() {
        let generator = PriorBoxGenerator::default();
        let input = ImageSize::new(96, 64);
        let array = generator.generate(input);

        for (row, prior) in array.rows().into_iter().zip(generator.priors(input)) {
            assert_eq!(row.to_vec(), vec![prior.cx, prior.cy, prior.s_kx, prior.s_ky]);
        }
    }
}
