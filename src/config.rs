use crate::diffusion::DiffusionModel;
use crate::emission::Medium;
use crate::error::{Error, Result};
use crate::hits::HitModel;
use crate::statistics::CountSampling;
use bon::Builder;
use uom::si::f64::{Length, Time, Velocity};
use uom::si::length::centimeter;
use uom::si::time::nanosecond;
use uom::si::velocity::centimeter_per_second;

/// Run-wide settings. Immutable once a [`Simulation`](crate::Simulation) is
/// built.
///
/// # Examples
///
/// ```
/// use scint::config::RunConfig;
/// use scint::emission::Medium;
/// use uom::si::{f64::Length, length::centimeter};
///
/// let config = RunConfig::builder()
///     .pixel_size(Length::new::<centimeter>(0.4))
///     .medium(Medium::Xenon)
///     .seed(42)
///     .build();
/// assert!(config.validate().is_ok());
/// assert!(config.diffusion);
/// ```
#[derive(Clone, Debug, PartialEq, Builder)]
pub struct RunConfig {
    /// Edge of the (square) sensor pixels.
    pub pixel_size: Length,
    #[builder(default)]
    pub medium: Medium,
    /// Apply transverse and longitudinal diffusion to drifting electrons.
    #[builder(default = true)]
    pub diffusion: bool,
    #[builder(default)]
    pub count_sampling: CountSampling,
    /// Photon detection efficiency applied before the geometric acceptance.
    #[builder(default = 0.4)]
    pub quantum_efficiency: f64,
    /// Drift field (kV/cm).
    #[builder(default = 0.5)]
    pub field: f64,
    #[builder(default = Velocity::new::<centimeter_per_second>(1.6e5))]
    pub drift_velocity: Velocity,
    /// Transverse diffusion coefficient (cm^2/s).
    #[builder(default = 13.237)]
    pub transverse_diffusion: f64,
    /// Longitudinal diffusion coefficient (cm^2/s).
    #[builder(default = 6.627)]
    pub longitudinal_diffusion: f64,
    /// Half-width of the square charge-collection footprint around a sensor.
    #[builder(default = Length::new::<centimeter>(5.0))]
    pub charge_half_width: Length,
    /// Wavelength-shifter re-emission latency added to every photon.
    #[builder(default = Time::new::<nanosecond>(2.5))]
    pub wls_latency: Time,
    /// Copy the raw input record into the event output.
    #[builder(default = true)]
    pub include_input: bool,
    /// Run seed. A random one is drawn (and logged) when unset.
    pub seed: Option<u64>,
    /// Size of a dedicated worker pool. Uses the global rayon pool when unset.
    pub threads: Option<usize>,
    /// Number of events simulated concurrently.
    #[builder(default = 64)]
    pub batch_size: usize,
}

impl RunConfig {
    /// Check every parameter is within its physical range.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("pixel_size", self.pixel_size.get::<centimeter>()),
            ("field", self.field),
            (
                "drift_velocity",
                self.drift_velocity.get::<centimeter_per_second>(),
            ),
            (
                "charge_half_width",
                self.charge_half_width.get::<centimeter>(),
            ),
        ];
        if let Some((name, value)) = positive.into_iter().find(|&(_, v)| !(v > 0.0 && v.is_finite())) {
            return Err(Error::parameter(name, format!("must be positive, got {value}")));
        }

        let non_negative = [
            ("transverse_diffusion", self.transverse_diffusion),
            ("longitudinal_diffusion", self.longitudinal_diffusion),
            ("wls_latency", self.wls_latency.get::<nanosecond>()),
        ];
        if let Some((name, value)) = non_negative.into_iter().find(|&(_, v)| !(v >= 0.0 && v.is_finite())) {
            return Err(Error::parameter(name, format!("must not be negative, got {value}")));
        }

        if !(0.0..=1.0).contains(&self.quantum_efficiency) {
            return Err(Error::parameter(
                "quantum_efficiency",
                format!("must be within [0, 1], got {}", self.quantum_efficiency),
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::parameter("batch_size", "must be at least 1"));
        }
        if self.threads == Some(0) {
            return Err(Error::parameter("threads", "must be at least 1"));
        }

        Ok(())
    }

    pub fn diffusion_model(&self) -> DiffusionModel {
        DiffusionModel {
            drift_velocity: self.drift_velocity,
            transverse: self.transverse_diffusion,
            longitudinal: self.longitudinal_diffusion,
            enabled: self.diffusion,
        }
    }

    pub fn hit_model(&self) -> HitModel {
        HitModel::new(self.pixel_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfig {
        RunConfig::builder()
            .pixel_size(Length::new::<centimeter>(0.4))
            .build()
    }

    #[test]
    fn config_defaults() {
        let config = config();
        assert_eq!(config.medium, Medium::Argon);
        assert_eq!(config.count_sampling, CountSampling::Truncate);
        assert_eq!(config.quantum_efficiency, 0.4);
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.seed, None);
        assert!(config.include_input);
        assert!((config.charge_half_width.get::<centimeter>() - 5.0).abs() < 1e-12);
        assert!((config.wls_latency.get::<nanosecond>() - 2.5).abs() < 1e-12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_out_of_range() {
        let mut bad = config();
        bad.pixel_size = Length::new::<centimeter>(0.0);
        assert!(bad.validate().unwrap_err().to_string().contains("pixel_size"));

        let mut bad = config();
        bad.quantum_efficiency = 1.5;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.field = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.transverse_diffusion = -1.0;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.batch_size = 0;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.threads = Some(0);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn config_derived_models() {
        let config = RunConfig::builder()
            .pixel_size(Length::new::<centimeter>(2.0))
            .diffusion(false)
            .build();
        assert!(!config.diffusion_model().enabled);
        assert_eq!(config.hit_model().pixel_size, config.pixel_size);
        assert_eq!(config.hit_model().efficiency, 1.0);
    }
}
