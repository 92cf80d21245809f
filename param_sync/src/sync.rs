use std::{mem, sync::Arc};

use log::{debug, info, warn};
use parameter_server::ParamStore;
use tokio::task::JoinHandle;

use crate::{
    Correction, DeviceBuffer, HostBuffer, Layout, Parameter, Result, SyncConfig, SyncErr,
    exchange::{Exchange, Plan, Scratch},
    ring::{Slot, SlotRing},
};

/// The lifecycle of a `ParamSync`.
enum State<B> {
    Uninitialized,
    Ready(Box<Session<B>>),
    Failed,
    Closed,
}

impl<B> State<B> {
    fn name(&self) -> &'static str {
        match self {
            State::Uninitialized => "uninitialized",
            State::Ready(_) => "initialized",
            State::Failed => "failed",
            State::Closed => "closed",
        }
    }
}

/// Everything allocated by `initialize`.
struct Session<B> {
    layout: Arc<Layout>,
    ring: SlotRing<B>,
    scratch: Option<Scratch>,
    in_flight: Option<JoinHandle<Result<Exchange<B>>>>,
    staging: Vec<f32>,
    stash: Option<Vec<f32>>,
    round: usize,
}

/// Keeps a worker's learnable parameters in sync with a shared parameter store.
///
/// Every round the live values are pushed to the store as a delta and the worker adopts the
/// reconciled values. With pipelining the exchange of a round runs in the background while the
/// worker keeps training on the result of the previous round, at most one exchange is ever in
/// flight.
pub struct ParamSync<S, B = HostBuffer> {
    config: SyncConfig,
    store: Arc<S>,
    state: State<B>,
}

impl<S, B> ParamSync<S, B>
where
    S: ParamStore + Sync + 'static,
    B: DeviceBuffer,
{
    /// Creates a new `ParamSync`, nothing is allocated until `initialize`.
    ///
    /// # Args
    /// * `config` - The validated configuration.
    /// * `store` - The store to synchronize with.
    ///
    /// # Returns
    /// A new `ParamSync` instance.
    pub fn new(config: SyncConfig, store: Arc<S>) -> Self {
        Self {
            config,
            store,
            state: State::Uninitialized,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The amount of rounds started since `initialize`.
    pub fn round(&self) -> usize {
        match &self.state {
            State::Ready(session) => session.round,
            _ => 0,
        }
    }

    /// The layout of the flat table, once initialized.
    pub fn layout(&self) -> Option<&Layout> {
        match &self.state {
            State::Ready(session) => Some(&session.layout),
            _ => None,
        }
    }

    /// Registers the parameters with the store and makes every worker start from the average
    /// of their initial values.
    ///
    /// Every worker of the store must call this, it waits on a store barrier.
    ///
    /// # Args
    /// * `params` - The learnable tensors, overwritten with the averaged values.
    pub async fn initialize<P: Parameter>(&mut self, params: &mut [P]) -> Result<()> {
        if !matches!(self.state, State::Uninitialized) {
            return Err(self.state_err("initialize"));
        }

        match Session::open(&self.config, &*self.store, params).await {
            Ok(session) => {
                self.state = State::Ready(Box::new(session));
                Ok(())
            }
            Err(e) => {
                warn!("initialization failed: {e}");
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    /// Runs a synchronization round.
    ///
    /// Without pipelining the exchange completes before returning and `params` hold the
    /// reconciled values. With pipelining the exchange is left running and `params` hold the
    /// values reconciled by the previous round.
    ///
    /// # Args
    /// * `params` - The learnable tensors, in the order given to `initialize`.
    pub async fn sync_round<P: Parameter>(&mut self, params: &mut [P]) -> Result<()> {
        let op = "synchronize";
        let State::Ready(session) = &mut self.state else {
            return Err(self.state_err(op));
        };

        session.check(params)?;

        match session.round(&self.config, &self.store, params).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("synchronization round failed: {e}");
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    /// Overwrites `params` with the current values of the store, keeping the local values
    /// aside until `restore_local`.
    ///
    /// Loading twice keeps the local values stashed by the first call.
    pub async fn load_server<P: Parameter>(&mut self, params: &mut [P]) -> Result<()> {
        let op = "load server values";
        let State::Ready(session) = &mut self.state else {
            return Err(self.state_err(op));
        };

        session.check(params)?;

        let Session {
            layout,
            staging,
            stash,
            ..
        } = session.as_mut();

        self.store.batch_load(self.config.table(), staging).await?;

        if stash.is_none() {
            let mut local = vec![0.; layout.total()];
            stage(layout, params, &mut local);
            *stash = Some(local);
        }

        unstage(layout, staging, params);
        Ok(())
    }

    /// Writes the values stashed by `load_server` back into `params`.
    pub fn restore_local<P: Parameter>(&mut self, params: &mut [P]) -> Result<()> {
        let op = "restore local values";
        let State::Ready(session) = &mut self.state else {
            return Err(self.state_err(op));
        };

        session.check(params)?;

        let Some(local) = session.stash.take() else {
            return Err(SyncErr::State {
                op,
                state: "no server values are loaded",
            });
        };

        unstage(&session.layout, &local, params);
        Ok(())
    }

    /// Waits for the exchange in flight, releases every buffer and closes the store.
    ///
    /// The values of a pending exchange reach the store but not the live parameters.
    pub async fn shutdown(&mut self) -> Result<()> {
        let drained = match mem::replace(&mut self.state, State::Closed) {
            State::Closed => return Ok(()),
            State::Ready(mut session) => session.drain().await,
            State::Uninitialized | State::Failed => Ok(()),
        };

        let closed = self.store.close().await.map_err(SyncErr::from);
        info!("parameter synchronization closed");

        drained.and(closed)
    }

    fn state_err(&self, op: &'static str) -> SyncErr {
        SyncErr::State {
            op,
            state: self.state.name(),
        }
    }
}

impl<B: DeviceBuffer> Session<B> {
    async fn open<S, P>(config: &SyncConfig, store: &S, params: &mut [P]) -> Result<Self>
    where
        S: ParamStore,
        P: Parameter,
    {
        let workers = config.workers();
        let table = config.table();
        let layout = Layout::new(params.iter().map(P::len), workers);

        let mut staging = vec![0.; layout.total()];
        stage(&layout, params, &mut staging);

        store.create_table(table, layout.shard_sizes()).await?;

        let weight = 1. / workers.get() as f32;
        for (shard, range) in layout.shard_ranges().enumerate() {
            store
                .add(table, shard as u32, &staging[range], weight)
                .await?;
        }

        store.barrier().await?;
        store.batch_load(table, &mut staging).await?;

        let first = Slot::seeded(&staging)?;
        let mut slots = (1..config.slots())
            .map(|_| first.replicate())
            .collect::<Result<Vec<_>>>()?;
        slots.insert(0, first);

        let scratch = Scratch::seeded(&staging, config.correction());
        unstage(&layout, &staging, params);

        info!(
            table = table,
            params = layout.total(),
            tensors = layout.spans().len(),
            shards = layout.shard_sizes().len(),
            slots = slots.len();
            "parameter synchronization initialized"
        );

        Ok(Self {
            layout: Arc::new(layout),
            ring: SlotRing::new(slots),
            scratch: Some(scratch),
            in_flight: None,
            staging,
            stash: None,
            round: 0,
        })
    }

    /// Checks that `params` match the layout registered by `initialize`.
    fn check<P: Parameter>(&self, params: &[P]) -> Result<()> {
        let spans = self.layout.spans();
        if params.len() != spans.len() {
            return Err(SyncErr::SizeMismatch {
                what: "parameter count",
                got: params.len(),
                expected: spans.len(),
            });
        }

        for (param, span) in params.iter().zip(spans) {
            if param.len() != span.len {
                return Err(SyncErr::SizeMismatch {
                    what: "parameter",
                    got: param.len(),
                    expected: span.len,
                });
            }
        }

        Ok(())
    }

    async fn round<S, P>(
        &mut self,
        config: &SyncConfig,
        store: &Arc<S>,
        params: &mut [P],
    ) -> Result<()>
    where
        S: ParamStore + Sync + 'static,
        P: Parameter,
    {
        self.join().await?;
        self.round += 1;

        let plan = Plan {
            table: config.table(),
            layout: Arc::clone(&self.layout),
            correction: config.correction(),
            factor: config.warmup().coefficient(self.round),
            round: self.round,
        };

        let prev = self.ring.current();
        let idx = self.ring.rotate();

        let mut scratch = self.scratch.take().ok_or(SyncErr::State {
            op: "synchronize",
            state: "the scratch buffers are in use",
        })?;

        if let Correction::Elastic { .. } = plan.correction {
            scratch.local.copy_from_slice(&self.ring.get(prev)?.baseline);
        }

        stage(&self.layout, params, &mut self.staging);
        let mut slot = self.ring.take(idx)?;
        slot.mirror.copy_from_host(0, &self.staging)?;

        let exchange = Exchange { idx, slot, scratch };

        if config.pipeline() {
            let staged = self.ring.get(prev)?;
            staged.mirror.synchronize()?;
            staged.mirror.copy_to_host(0, &mut self.staging)?;
            unstage(&self.layout, &self.staging, params);

            let store = Arc::clone(store);
            let handle = tokio::spawn(async move { exchange.run(&*store, &plan).await });
            self.in_flight = Some(handle);

            debug!(round = self.round, slot = idx; "exchange in flight");
        } else {
            let exchange = exchange.run(&**store, &plan).await?;
            exchange.slot.mirror.copy_to_host(0, &mut self.staging)?;
            unstage(&self.layout, &self.staging, params);
            self.restore(exchange)?;

            debug!(round = self.round; "exchange done");
        }

        Ok(())
    }

    /// Waits for the exchange in flight, if any, and takes its buffers back.
    async fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.in_flight.take() {
            let exchange = handle.await??;
            self.restore(exchange)?;
        }

        Ok(())
    }

    /// Waits for the exchange in flight and checks that every slot made it back.
    async fn drain(&mut self) -> Result<()> {
        self.join().await?;

        if !self.ring.is_complete() {
            return Err(SyncErr::State {
                op: "shutdown",
                state: "a slot was never returned",
            });
        }

        debug!(rounds = self.round; "exchanges drained");
        Ok(())
    }

    fn restore(&mut self, exchange: Exchange<B>) -> Result<()> {
        let Exchange { idx, slot, scratch } = exchange;
        self.ring.put(idx, slot)?;
        self.scratch = Some(scratch);
        Ok(())
    }
}

/// Copies every tensor into its span of `dst`.
fn stage<P: Parameter>(layout: &Layout, params: &[P], dst: &mut [f32]) {
    for (param, span) in params.iter().zip(layout.spans()) {
        param.read_into(&mut dst[span.range()]);
    }
}

/// Copies every span of `src` into its tensor.
fn unstage<P: Parameter>(layout: &Layout, src: &[f32], params: &mut [P]) {
    for (param, span) in params.iter_mut().zip(layout.spans()) {
        param.write_from(&src[span.range()]);
    }
}
