use std::sync::Arc;

use log::debug;
use parameter_server::ParamStore;

use crate::{Correction, DeviceBuffer, Layout, Result, ring::Slot};

/// The scratch buffers an exchange works on.
#[derive(Debug)]
pub(crate) struct Scratch {
    pub delta: Vec<f32>,
    pub velocity: Vec<f32>,
    /// The newest reconciled local values, elastic only.
    pub local: Vec<f32>,
}

impl Scratch {
    /// Allocates the scratch buffers, the delta seeded with `values`.
    pub fn seeded(values: &[f32], correction: Correction) -> Self {
        let (velocity, local) = match correction {
            Correction::Plain => (Vec::new(), Vec::new()),
            Correction::Momentum { .. } => (vec![0.; values.len()], Vec::new()),
            Correction::Elastic { .. } => (Vec::new(), values.to_vec()),
        };

        Self {
            delta: values.to_vec(),
            velocity,
            local,
        }
    }
}

/// What every exchange of a round needs to know, cheap to clone into a background task.
#[derive(Debug, Clone)]
pub(crate) struct Plan {
    pub table: u32,
    pub layout: Arc<Layout>,
    pub correction: Correction,
    pub factor: f32,
    pub round: usize,
}

/// A slot together with the buffers needed to exchange it with the server.
///
/// It owns everything it touches, so it can move into a background task and come back
/// through its join handle.
#[derive(Debug)]
pub(crate) struct Exchange<B> {
    pub idx: usize,
    pub slot: Slot<B>,
    pub scratch: Scratch,
}

impl<B: DeviceBuffer> Exchange<B> {
    /// Reconciles the slot's mirror with the server.
    ///
    /// On return the mirror and the baseline both hold the values the worker should continue
    /// training from.
    pub async fn run<S: ParamStore>(mut self, store: &S, plan: &Plan) -> Result<Self> {
        let idx = self.idx;
        let Self { slot, scratch, .. } = &mut self;
        let Slot { mirror, baseline } = slot;

        mirror.synchronize()?;
        mirror.copy_to_host(0, &mut scratch.delta)?;

        debug!(round = plan.round, slot = idx, factor = plan.factor; "exchanging");

        match plan.correction {
            Correction::Plain => {
                subtract(&mut scratch.delta, baseline);
                push(store, plan, &scratch.delta, plan.factor).await?;
                store.batch_load(plan.table, baseline).await?;
            }
            Correction::Momentum { rate } => {
                subtract(&mut scratch.delta, baseline);
                store.batch_load(plan.table, baseline).await?;

                scratch
                    .velocity
                    .iter_mut()
                    .zip(&scratch.delta)
                    .for_each(|(v, d)| *v = rate * *v + d);

                push(store, plan, &scratch.velocity, plan.factor).await?;

                baseline
                    .iter_mut()
                    .zip(&scratch.velocity)
                    .for_each(|(b, v)| *b += plan.factor * v);
            }
            Correction::Elastic { rate } => {
                // This slot's progress on top of the newest local values.
                subtract(&mut scratch.delta, baseline);
                scratch
                    .delta
                    .iter_mut()
                    .zip(&scratch.local)
                    .for_each(|(d, l)| *d += l);

                store.batch_load(plan.table, baseline).await?;
                subtract(&mut scratch.delta, baseline);
                push(store, plan, &scratch.delta, rate).await?;

                // `baseline + diff` is the local value, step it `rate` towards the server.
                baseline
                    .iter_mut()
                    .zip(&scratch.delta)
                    .for_each(|(b, d)| *b += (1. - rate) * d);
            }
        }

        mirror.copy_from_host(0, baseline)?;
        mirror.synchronize()?;

        Ok(self)
    }
}

/// Sends `weight * values` to the server, one add per shard.
async fn push<S: ParamStore>(store: &S, plan: &Plan, values: &[f32], weight: f32) -> Result<()> {
    for (shard, range) in plan.layout.shard_ranges().enumerate() {
        store
            .add(plan.table, shard as u32, &values[range], weight)
            .await?;
    }

    Ok(())
}

fn subtract(lhs: &mut [f32], rhs: &[f32]) {
    lhs.iter_mut().zip(rhs).for_each(|(l, r)| *l -= r);
}
