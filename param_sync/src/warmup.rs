use std::num::NonZeroUsize;

/// Damps the contribution of a worker during its first rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Warmup {
    #[default]
    None,
    Linearly {
        coef: f32,
        rounds: NonZeroUsize,
    },
    Staircase {
        coef: f32,
        rounds: NonZeroUsize,
    },
}

impl Warmup {
    /// Computes the contribution factor of a round.
    ///
    /// # Arguments
    /// * `round` - The number of the round, starting at one.
    ///
    /// # Returns
    /// The factor in `[0, 1]`.
    pub fn coefficient(&self, round: usize) -> f32 {
        let f = match *self {
            Warmup::None => 1.,
            Warmup::Linearly { coef, rounds } => {
                coef + (1. - coef) / rounds.get() as f32 * round as f32
            }
            Warmup::Staircase { coef, rounds } => coef * (round / rounds.get() + 1) as f32,
        };

        f.clamp(0., 1.)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn none_is_always_one() {
        assert_eq!(Warmup::None.coefficient(1), 1.);
        assert_eq!(Warmup::None.coefficient(10_000), 1.);
    }

    #[test]
    fn linearly_is_monotonic_and_clamped() {
        let warmup = Warmup::Linearly {
            coef: 0.2,
            rounds: nz(600),
        };

        let factors: Vec<_> = (1..2000).map(|round| warmup.coefficient(round)).collect();

        assert!(factors.windows(2).all(|w| w[0] <= w[1]));
        assert!(factors.iter().all(|f| (0. ..=1.).contains(f)));
        assert_eq!(warmup.coefficient(600), 1.);
        assert!((warmup.coefficient(300) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn staircase_steps_every_period() {
        let warmup = Warmup::Staircase {
            coef: 0.25,
            rounds: nz(10),
        };

        assert_eq!(warmup.coefficient(1), 0.25);
        assert_eq!(warmup.coefficient(9), 0.25);
        assert_eq!(warmup.coefficient(10), 0.5);
        assert_eq!(warmup.coefficient(35), 1.);
        assert_eq!(warmup.coefficient(1000), 1.);
    }

    #[test]
    fn negative_coefficients_are_clamped() {
        let warmup = Warmup::Staircase {
            coef: -0.5,
            rounds: nz(1),
        };

        assert_eq!(warmup.coefficient(3), 0.);
    }
}
