use crate::error::{Error, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::io::Read;
use uom::si::f64::Time;
use uom::si::time::nanosecond;

/// Scintillation response class of the particle that produced a deposit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Species {
    /// Photons, electrons, muons and neutrinos.
    ElectronLike,
    /// Protons, neutrons, alphas and heavier nuclei.
    HeavyLike,
    /// A PDG code this crate does not classify.
    Unknown(i64),
}

impl Species {
    /// Classify a PDG Monte Carlo particle code.
    ///
    /// # Examples
    ///
    /// ```
    /// use scint::deposit::Species;
    ///
    /// assert_eq!(Species::classify(-13), Species::ElectronLike);
    /// assert_eq!(Species::classify(1000020040), Species::HeavyLike);
    /// assert_eq!(Species::classify(211), Species::Unknown(211));
    /// ```
    pub fn classify(pdg: i64) -> Self {
        match pdg {
            22 => Species::ElectronLike,
            code if matches!(code.abs(), 11..=14) => Species::ElectronLike,
            2212 | 2112 => Species::HeavyLike,
            code if code >= 1_000_000_000 => Species::HeavyLike,
            code => Species::Unknown(code),
        }
    }
}

/// A single energy deposition from the upstream particle-transport
/// simulation. Lengths are in centimeters and energies in MeV.
#[derive(Clone, Debug, PartialEq)]
pub struct EnergyDeposit {
    pub position: Vector3<f64>,
    pub energy: f64,
    pub length: f64,
    pub time: Time,
    pub track_id: i64,
    pub pdg: i64,
}

impl EnergyDeposit {
    pub fn species(&self) -> Species {
        Species::classify(self.pdg)
    }
}

/// One event as written by the upstream simulation.
///
/// The `hit_*` vectors are parallel; `particle_pdg_code` is indexed by
/// `hit_track_id - 1`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub energy_deposit: f64,
    pub hit_start_x: Vec<f64>,
    pub hit_start_y: Vec<f64>,
    pub hit_start_z: Vec<f64>,
    pub hit_start_t: Vec<f64>,
    pub hit_energy_deposit: Vec<f64>,
    pub hit_length: Vec<f64>,
    pub hit_track_id: Vec<i64>,
    pub particle_pdg_code: Vec<i64>,
}

impl RawEvent {
    /// Validate the record and split it into deposits.
    ///
    /// `index` is only used to label errors.
    pub fn deposits(&self, index: u64) -> Result<Vec<EnergyDeposit>> {
        let n = self.hit_start_x.len();
        let columns = [
            ("hit_start_y", self.hit_start_y.len()),
            ("hit_start_z", self.hit_start_z.len()),
            ("hit_start_t", self.hit_start_t.len()),
            ("hit_energy_deposit", self.hit_energy_deposit.len()),
            ("hit_length", self.hit_length.len()),
            ("hit_track_id", self.hit_track_id.len()),
        ];
        if let Some((name, len)) = columns.into_iter().find(|&(_, len)| len != n) {
            return Err(Error::Event {
                index,
                reason: format!("`{name}` has {len} entries but `hit_start_x` has {n}"),
            });
        }

        (0..n)
            .map(|i| {
                let track_id = self.hit_track_id[i];
                let pdg = track_id
                    .checked_sub(1)
                    .and_then(|k| usize::try_from(k).ok())
                    .and_then(|k| self.particle_pdg_code.get(k))
                    .copied()
                    .ok_or_else(|| Error::Event {
                        index,
                        reason: format!(
                            "hit {i} belongs to track {track_id}, but only {} particles are listed",
                            self.particle_pdg_code.len()
                        ),
                    })?;

                Ok(EnergyDeposit {
                    position: Vector3::new(
                        self.hit_start_x[i],
                        self.hit_start_y[i],
                        self.hit_start_z[i],
                    ),
                    energy: self.hit_energy_deposit[i],
                    length: self.hit_length[i],
                    time: Time::new::<nanosecond>(self.hit_start_t[i]),
                    track_id,
                    pdg,
                })
            })
            .collect()
    }
}

/// Iterate over the [`RawEvent`]s of a JSON stream (one object per line, or
/// any whitespace separated sequence of objects).
pub fn read_events<R: Read>(reader: R) -> impl Iterator<Item = Result<RawEvent>> {
    serde_json::Deserializer::from_reader(reader)
        .into_iter::<RawEvent>()
        .map(|event| event.map_err(Error::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uom::si::time::microsecond;

    fn two_hits() -> RawEvent {
        RawEvent {
            energy_deposit: 3.0,
            hit_start_x: vec![1.0, 2.0],
            hit_start_y: vec![3.0, 4.0],
            hit_start_z: vec![5.0, 6.0],
            hit_start_t: vec![1000.0, 2000.0],
            hit_energy_deposit: vec![1.0, 2.0],
            hit_length: vec![0.1, 0.2],
            hit_track_id: vec![2, 1],
            particle_pdg_code: vec![11, 2212],
        }
    }

    #[test]
    fn classify_species() {
        for code in [22, 11, -11, 12, -12, 13, -13, 14, -14] {
            assert_eq!(Species::classify(code), Species::ElectronLike, "{code}");
        }
        for code in [2212, 2112, 1000020040, 1000180400] {
            assert_eq!(Species::classify(code), Species::HeavyLike, "{code}");
        }
        for code in [0, 15, -22, 211, -2212, 999_999_999] {
            assert_eq!(Species::classify(code), Species::Unknown(code), "{code}");
        }
    }

    #[test]
    fn deposits_from_raw_event() {
        let deposits = two_hits().deposits(0).unwrap();

        assert_eq!(deposits.len(), 2);
        assert_eq!(deposits[0].position, Vector3::new(1.0, 3.0, 5.0));
        assert_eq!(deposits[0].pdg, 2212);
        assert_eq!(deposits[0].species(), Species::HeavyLike);
        assert_eq!(deposits[1].pdg, 11);
        assert_eq!(deposits[1].energy, 2.0);
        assert!((deposits[1].time.get::<microsecond>() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn deposits_rejects_ragged_columns() {
        let mut event = two_hits();
        event.hit_length.pop();

        let error = event.deposits(4).unwrap_err();
        assert!(error.to_string().contains("event 4"));
        assert!(error.to_string().contains("hit_length"));
    }

    #[test]
    fn deposits_rejects_unknown_track() {
        let mut event = two_hits();
        event.hit_track_id[1] = 3;
        assert!(event.deposits(0).is_err());

        event.hit_track_id[1] = 0;
        assert!(event.deposits(0).is_err());

        event.hit_track_id[1] = i64::MIN;
        let error = event.deposits(5).unwrap_err();
        assert!(error.to_string().starts_with("event 5"));
    }

    #[test]
    fn read_events_stream() {
        let first = serde_json::to_string(&two_hits()).unwrap();
        let input = format!("{first}\n\n{}\n", serde_json::to_string(&RawEvent::default()).unwrap());

        let events: Vec<_> = read_events(input.as_bytes())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(events, vec![two_hits(), RawEvent::default()]);

        let mut broken = read_events("{\"energy_deposit\": 1.0".as_bytes());
        assert!(broken.next().unwrap().is_err());
    }
}
