use crate::config::RunConfig;
use crate::deposit::RawEvent;
use crate::emission::EmissionTimeModel;
use crate::event::EventSimulator;
use crate::geometry::Sensor;
use crate::output::EventRecord;
use crate::statistics::stream_seed;
use crate::transport::{TransportParams, TransportTimeModel};
use crate::yields::YieldModel;
use bon::bon;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

pub use crate::error::{Error, Result};

/// Run settings.
pub mod config;
/// Energy deposits from the upstream particle-transport simulation.
pub mod deposit;
/// Drift and diffusion of ionization electrons.
pub mod diffusion;
/// Scintillation emission delays.
pub mod emission;
mod error;
/// Per-event simulation pipeline.
pub mod event;
/// Photosensor layout.
pub mod geometry;
/// Number of photons reaching a sensor.
pub mod hits;
/// Event records and the observers that write them.
pub mod output;
/// Random count realisation and per-event random streams.
pub mod statistics;
/// Photon propagation times.
pub mod transport;
/// Light and charge yields of energy deposits.
pub mod yields;

/// A trait that defines the interface for an observer of a simulation run.
///
/// The default implementation of all methods is a no-op. Users are expected to
/// override the methods they are interested in.
#[allow(unused_variables)]
pub trait Observer {
    /// Called once per event, in event order.
    fn on_event(&mut self, event: &EventRecord) -> Result<()> {
        Ok(())
    }
    /// Called after the last event has been handed over.
    fn on_finish(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct Simulation<O> {
    simulator: EventSimulator,
    seed: u64,
    batch_size: usize,
    pool: Option<rayon::ThreadPool>,
    observer: O,
}

#[bon]
impl<O> Simulation<O> {
    #[builder]
    pub fn new(
        #[builder(field)] sensors: Vec<Sensor>,
        config: RunConfig,
        #[builder(default)] transport: TransportParams,
        #[builder(default)] emission: EmissionTimeModel,
        yields: Option<YieldModel>,
        observer: O,
    ) -> Result<Self> {
        config.validate()?;
        if sensors.is_empty() {
            log::warn!("no sensors configured, only yields will be recorded");
        }

        let seed = config.seed.unwrap_or_else(|| {
            let seed = rand::random();
            log::info!("no seed configured, using {seed}");
            seed
        });
        let pool = config
            .threads
            .map(|n| rayon::ThreadPoolBuilder::new().num_threads(n).build())
            .transpose()?;

        let simulator = EventSimulator {
            sensors,
            yields: yields.unwrap_or_else(|| YieldModel::for_medium(config.medium)),
            diffusion: config.diffusion_model(),
            hits: config.hit_model(),
            transport: TransportTimeModel::new(transport)?,
            emission,
            config,
        };

        Ok(Self {
            batch_size: simulator.config.batch_size,
            simulator,
            seed,
            pool,
            observer,
        })
    }
}

impl<O, S: simulation_builder::State> SimulationBuilder<O, S> {
    /// Add a sensor to the [`Simulation`].
    pub fn add_sensor(mut self, sensor: Sensor) -> Self {
        self.sensors.push(sensor);
        self
    }
    /// Add every sensor of a geometry to the [`Simulation`].
    pub fn add_sensors<I>(mut self, sensors: I) -> Self
    where
        I: IntoIterator<Item = Sensor>,
    {
        self.sensors.extend(sensors);
        self
    }
}

impl<O> Simulation<O> {
    /// Seed of this run. Equal seeds give identical output.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn simulate_batch(&self, first: u64, batch: Vec<RawEvent>) -> Result<Vec<EventRecord>> {
        let simulator = &self.simulator;
        let seed = self.seed;
        let simulate = || {
            batch
                .into_par_iter()
                .enumerate()
                .map(|(offset, raw)| {
                    let index = first + offset as u64;
                    let mut rng = ChaCha8Rng::seed_from_u64(stream_seed(seed, index));
                    simulator.simulate(index, raw, &mut rng)
                })
                .collect::<Result<Vec<_>>>()
        };

        match &self.pool {
            Some(pool) => pool.install(simulate),
            None => simulate(),
        }
    }
}

impl<O: Observer> Simulation<O> {
    /// Simulate every event of `events` and hand the records to the observer
    /// in input order. The first error aborts the run.
    pub fn run<I>(mut self, events: I) -> Result<O>
    where
        I: IntoIterator<Item = Result<RawEvent>>,
    {
        let mut events = events.into_iter();
        let mut next = 0;
        loop {
            let batch = events
                .by_ref()
                .take(self.batch_size)
                .collect::<Result<Vec<_>>>()?;
            if batch.is_empty() {
                break;
            }
            let first = next;
            next += batch.len() as u64;

            for record in self.simulate_batch(first, batch)? {
                self.observer.on_event(&record)?;
            }
            log::debug!("simulated events {first}..{next}");
        }
        self.observer.on_finish()?;
        log::info!("simulated {next} events");

        Ok(self.observer)
    }
}
