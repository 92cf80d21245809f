use std::num::NonZeroUsize;

use comms::specs::sync::{SyncSpec, WarmupSpec};

use crate::{Result, SyncErr, Warmup};

/// How the local values and the server values are reconciled every round.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Correction {
    /// Push `local - baseline`, then adopt the server values.
    #[default]
    Plain,
    /// Push an accumulated velocity of the deltas.
    Momentum { rate: f32 },
    /// Pull the local and the server values towards each other.
    Elastic { rate: f32 },
}

/// Immutable configuration of a parameter synchronization client.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    workers: NonZeroUsize,
    pipeline: bool,
    correction: Correction,
    warmup: Warmup,
    table: u32,
}

impl SyncConfig {
    /// Validates a `SyncSpec` into a configuration.
    ///
    /// # Args
    /// * `spec` - The specification of the client.
    ///
    /// # Returns
    /// A `SyncConfig` or the first invalid setting found.
    pub fn new(spec: SyncSpec) -> Result<Self> {
        let SyncSpec {
            workers,
            pipeline,
            momentum,
            elastic,
            warmup,
            table,
        } = spec;

        check_rate("momentum", momentum)?;
        check_rate("elastic", elastic)?;

        let correction = match (momentum > 0., elastic > 0.) {
            (true, true) => return Err(SyncErr::ExclusiveCorrections { momentum, elastic }),
            (true, false) => Correction::Momentum { rate: momentum },
            (false, true) => Correction::Elastic { rate: elastic },
            (false, false) => Correction::Plain,
        };

        Ok(Self {
            workers,
            pipeline,
            correction,
            warmup: warmup_from_spec(warmup)?,
            table,
        })
    }

    /// The amount of workers sharing the table.
    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    pub fn pipeline(&self) -> bool {
        self.pipeline
    }

    /// The amount of buffer slots, two when exchanges overlap with training.
    pub fn slots(&self) -> usize {
        if self.pipeline { 2 } else { 1 }
    }

    pub fn correction(&self) -> Correction {
        self.correction
    }

    pub fn warmup(&self) -> Warmup {
        self.warmup
    }

    pub fn table(&self) -> u32 {
        self.table
    }
}

impl TryFrom<SyncSpec> for SyncConfig {
    type Error = SyncErr;

    fn try_from(spec: SyncSpec) -> Result<Self> {
        Self::new(spec)
    }
}

fn check_rate(what: &'static str, value: f32) -> Result<()> {
    if !value.is_finite() || value < 0. {
        return Err(SyncErr::InvalidRate { what, value });
    }

    Ok(())
}

fn warmup_from_spec(spec: WarmupSpec) -> Result<Warmup> {
    let make = |coef: f32, rounds: usize| -> Result<(f32, NonZeroUsize)> {
        check_rate("warmup coefficient", coef)?;
        let rounds = NonZeroUsize::new(rounds).ok_or(SyncErr::InvalidWarmup { rounds })?;
        Ok((coef, rounds))
    };

    let warmup = match spec {
        WarmupSpec::None => Warmup::None,
        WarmupSpec::Linearly { coef, rounds } => {
            let (coef, rounds) = make(coef, rounds)?;
            Warmup::Linearly { coef, rounds }
        }
        WarmupSpec::Staircase { coef, rounds } => {
            let (coef, rounds) = make(coef, rounds)?;
            Warmup::Staircase { coef, rounds }
        }
    };

    Ok(warmup)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(json: &str) -> SyncSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn momentum_and_elastic_are_exclusive() {
        let err = SyncConfig::new(spec(r#"{ "workers": 2, "momentum": 0.9, "elastic": 0.1 }"#))
            .unwrap_err();

        assert!(matches!(err, SyncErr::ExclusiveCorrections { .. }));
    }

    #[test]
    fn corrections_are_picked_from_the_rates() {
        let plain = SyncConfig::new(spec(r#"{ "workers": 1 }"#)).unwrap();
        let momentum = SyncConfig::new(spec(r#"{ "workers": 1, "momentum": 0.5 }"#)).unwrap();
        let elastic = SyncConfig::new(spec(r#"{ "workers": 1, "elastic": 0.25 }"#)).unwrap();

        assert_eq!(plain.correction(), Correction::Plain);
        assert_eq!(momentum.correction(), Correction::Momentum { rate: 0.5 });
        assert_eq!(elastic.correction(), Correction::Elastic { rate: 0.25 });
    }

    #[test]
    fn negative_rates_are_rejected() {
        let err = SyncConfig::new(spec(r#"{ "workers": 1, "elastic": -1.0 }"#)).unwrap_err();
        assert!(matches!(err, SyncErr::InvalidRate { what: "elastic", .. }));
    }

    #[test]
    fn empty_warmup_is_rejected() {
        let json = r#"{ "workers": 1, "warmup": { "policy": "linearly", "rounds": 0 } }"#;

        let err = SyncConfig::new(spec(json)).unwrap_err();
        assert!(matches!(err, SyncErr::InvalidWarmup { rounds: 0 }));
    }

    #[test]
    fn pipelining_uses_two_slots() {
        let on = SyncConfig::new(spec(r#"{ "workers": 1 }"#)).unwrap();
        let off = SyncConfig::new(spec(r#"{ "workers": 1, "pipeline": false }"#)).unwrap();

        assert_eq!(on.slots(), 2);
        assert_eq!(off.slots(), 1);
    }
}
