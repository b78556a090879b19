use crate::config::RunConfig;
use crate::deposit::{RawEvent, Species};
use crate::diffusion::DiffusionModel;
use crate::emission::{EmissionClass, EmissionTimeModel};
use crate::error::Result;
use crate::geometry::Sensor;
use crate::hits::HitModel;
use crate::output::{EventRecord, SensorTimes};
use crate::transport::{AngleBin, TransportTimeModel};
use crate::yields::YieldModel;
use rand::Rng;
use std::collections::BTreeSet;
use uom::si::f64::Length;
use uom::si::length::centimeter;
use uom::si::time::microsecond;

/// Immutable per-run state shared by every event: the detector, the run
/// settings and the model tables.
#[derive(Clone, Debug)]
pub struct EventSimulator {
    pub sensors: Vec<Sensor>,
    pub config: RunConfig,
    pub yields: YieldModel,
    pub diffusion: DiffusionModel,
    pub hits: HitModel,
    pub transport: TransportTimeModel,
    pub emission: EmissionTimeModel,
}

impl EventSimulator {
    /// Simulate the light and charge collected from a single event.
    ///
    /// All randomness comes from `rng`, so the same stream always produces
    /// the same record.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        index: u64,
        raw: RawEvent,
        rng: &mut R,
    ) -> Result<EventRecord> {
        let deposits = raw.deposits(index)?;
        let config = &self.config;
        let half_width = config.charge_half_width.get::<centimeter>();
        let latency = config.wls_latency.get::<microsecond>();

        let mut sensors: Vec<_> = self
            .sensors
            .iter()
            .map(|sensor| SensorTimes {
                id: sensor.id,
                ..SensorTimes::default()
            })
            .collect();
        let mut light_yield = Vec::with_capacity(deposits.len());
        let mut charge_yield = Vec::with_capacity(deposits.len());
        let mut unknown = BTreeSet::new();

        for deposit in &deposits {
            let species = deposit.species();
            if let Species::Unknown(code) = species {
                if unknown.insert(code) {
                    log::warn!(
                        "event {index}: unknown particle code {code}, using heavy-like emission"
                    );
                }
            }

            let yields = self.yields.yields(deposit.energy, deposit.length, config.field);
            light_yield.push(yields.light);
            charge_yield.push(yields.charge);

            let electrons = config
                .count_sampling
                .realize(yields.charge * deposit.energy, rng)?;
            for _ in 0..electrons {
                let electron = self.diffusion.drift(deposit.position, rng);
                let drift_time = electron.drift_time.get::<microsecond>();
                for (sensor, times) in self.sensors.iter().zip(&mut sensors) {
                    let dx = electron.position.x - sensor.position.x;
                    let dy = electron.position.y - sensor.position.y;
                    if dx.abs() < half_width && dy.abs() < half_width {
                        times.charge_times_us.push(drift_time);
                    }
                }
            }

            let photons = config.count_sampling.realize(
                config.quantum_efficiency * yields.light * deposit.energy,
                rng,
            )?;
            if photons == 0 {
                continue;
            }
            let class = EmissionClass::from(species);
            let origin = deposit.time.get::<microsecond>() + latency;

            for (sensor, times) in self.sensors.iter().zip(&mut sensors) {
                let hits = self.hits.detected_hits(
                    photons,
                    &deposit.position,
                    sensor,
                    config.count_sampling,
                    rng,
                )?;
                if hits == 0 {
                    continue;
                }
                let distance =
                    Length::new::<centimeter>((deposit.position - sensor.position).norm());
                let angle = AngleBin::between(&deposit.position, sensor)?;

                for transit in self.transport.sample(distance, angle, hits, rng) {
                    let delay = self.emission.sample(config.medium, class, rng);
                    times
                        .photon_times_us
                        .push(origin + (transit + delay).get::<microsecond>());
                }
            }
        }

        Ok(EventRecord {
            index,
            sensors,
            light_yield,
            charge_yield,
            unknown_species: unknown.into_iter().collect(),
            input: config.include_input.then_some(raw),
        })
    }
}
