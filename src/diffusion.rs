use nalgebra::Vector3;
use rand::Rng;
use rand_distr::StandardNormal;
use std::f64::consts::TAU;
use uom::si::f64::{Length, Time, Velocity};
use uom::si::length::centimeter;
use uom::si::time::second;

/// An ionization electron after drifting to the anode plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Electron {
    /// Landing position in centimeters.
    pub position: Vector3<f64>,
    pub drift_time: Time,
}

/// Drift of ionization electrons along the z axis towards the anode at
/// `z = 0`, with Gaussian transverse and longitudinal diffusion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiffusionModel {
    pub drift_velocity: Velocity,
    /// Transverse diffusion coefficient (cm^2/s).
    pub transverse: f64,
    /// Longitudinal diffusion coefficient (cm^2/s).
    pub longitudinal: f64,
    /// When `false`, electrons land exactly below their origin.
    pub enabled: bool,
}

impl DiffusionModel {
    /// Time an electron takes to drift `distance` to the anode.
    pub fn drift_time(&self, distance: Length) -> Time {
        distance / self.drift_velocity
    }
    /// Transverse spread (cm) after drifting for `drift_time`.
    pub fn sigma_transverse(&self, drift_time: Time) -> f64 {
        width(self.transverse, drift_time)
    }
    /// Longitudinal spread (cm) after drifting for `drift_time`.
    pub fn sigma_longitudinal(&self, drift_time: Time) -> f64 {
        width(self.longitudinal, drift_time)
    }

    /// Drift a single electron created at `origin` (cm).
    ///
    /// # Examples
    ///
    /// ```
    /// use nalgebra::Vector3;
    /// use rand::SeedableRng;
    /// use scint::diffusion::DiffusionModel;
    /// use uom::si::{f64::Velocity, time::microsecond, velocity::centimeter_per_second};
    ///
    /// let model = DiffusionModel {
    ///     drift_velocity: Velocity::new::<centimeter_per_second>(1.6e5),
    ///     transverse: 13.237,
    ///     longitudinal: 6.627,
    ///     enabled: false,
    /// };
    /// let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
    /// let electron = model.drift(Vector3::new(0.0, 0.0, 16.0), &mut rng);
    ///
    /// assert_eq!(electron.position, Vector3::new(0.0, 0.0, 16.0));
    /// assert!((electron.drift_time.get::<microsecond>() - 100.0).abs() < 1e-9);
    /// ```
    pub fn drift<R: Rng + ?Sized>(&self, origin: Vector3<f64>, rng: &mut R) -> Electron {
        let drift_time = self.drift_time(Length::new::<centimeter>(origin.z));
        if !self.enabled {
            return Electron {
                position: origin,
                drift_time,
            };
        }

        let sigma_t = self.sigma_transverse(drift_time);
        let sigma_l = self.sigma_longitudinal(drift_time);

        let radius = (sigma_t * rng.sample::<f64, _>(StandardNormal)).abs();
        let phi = rng.random_range(0.0..TAU);
        let dz = sigma_l * rng.sample::<f64, _>(StandardNormal);

        let position = origin + Vector3::new(radius * phi.cos(), radius * phi.sin(), dz);
        Electron {
            position,
            drift_time: self.drift_time(Length::new::<centimeter>(position.z)),
        }
    }
}

// sqrt(2 D t), with no spread for electrons created behind the anode.
fn width(coefficient: f64, drift_time: Time) -> f64 {
    (2.0 * coefficient * drift_time.get::<second>().max(0.0)).sqrt()
}
