//! Propagation time of VUV photons from the scintillation point to a sensor.
//!
//! Arrival times follow a Landau-like peak of direct light with an exponential
//! tail of scattered light. The distribution is tabulated once per
//! (distance, incidence angle) bucket as an inverse CDF and sampled by
//! interpolation.
use crate::error::{Error, Result};
use crate::geometry::Sensor;
use nalgebra::Vector3;
use rand::Rng;
use uom::si::f64::{Length, Time};
use uom::si::length::centimeter;
use uom::si::time::nanosecond;

/// Width of an incidence angle bucket in degrees.
pub const ANGLE_BIN_WIDTH: f64 = 45.0;
/// Number of incidence angle buckets covering [0, 90) degrees.
pub const ANGLE_BINS: usize = 2;
// Largest angle that is still bucketed below 90 degrees.
const MAX_THETA: f64 = 89.99999;

/// Incidence angle bucket of a photon with respect to the sensor normal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct AngleBin(usize);

impl AngleBin {
    /// Bucket of an incidence angle in degrees. Angles at or above 90 degrees
    /// are clamped into the last bucket.
    ///
    /// # Examples
    ///
    /// ```
    /// use scint::transport::AngleBin;
    ///
    /// assert_eq!(AngleBin::from_degrees(0.0).index(), 0);
    /// assert_eq!(AngleBin::from_degrees(45.0).index(), 1);
    /// assert_eq!(AngleBin::from_degrees(90.000001).index(), 1);
    /// ```
    pub fn from_degrees(theta: f64) -> Self {
        let theta = theta.clamp(0.0, MAX_THETA);
        Self(((theta / ANGLE_BIN_WIDTH) as usize).min(ANGLE_BINS - 1))
    }

    /// Bucket of the angle whose cosine is `cosine`.
    pub fn from_cosine(cosine: f64) -> Result<Self> {
        if !(-1.0..=1.0).contains(&cosine) {
            return Err(Error::IncidenceCosine(cosine));
        }
        Ok(Self::from_degrees(cosine.acos().to_degrees()))
    }

    /// Bucket of light travelling from `source` (cm) to `sensor`.
    pub fn between(source: &Vector3<f64>, sensor: &Sensor) -> Result<Self> {
        let offset = source - sensor.position;
        let cosine = offset[sensor.axis.index()].abs() / offset.norm();
        Self::from_cosine(cosine)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Shape parameters of the tabulated arrival time distributions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransportParams {
    /// Distance discretisation step.
    pub step: Length,
    /// Largest tabulated distance. Longer distances use the last bucket.
    pub max_distance: Length,
    /// Number of time points per tabulated CDF.
    pub grid_points: usize,
    /// Mean group velocity of VUV light (cm/ns). Sets the peak position.
    pub group_velocity: f64,
    /// Fastest group velocity (cm/ns). No photon arrives earlier.
    pub max_group_velocity: f64,
    /// Width of the direct light peak (ns) at zero distance.
    pub width: f64,
    /// Growth of the peak width with distance (ns/cm).
    pub width_slope: f64,
    /// Relative broadening of the peak per angle bucket.
    pub angle_broadening: f64,
    /// Asymptotic fraction of scattered light.
    pub tail_fraction: f64,
    /// Distance (cm) over which the scattered fraction builds up.
    pub tail_distance: f64,
    /// Decay constant of the scattered light tail (ns) at zero distance.
    pub tail_tau: f64,
    /// Growth of the tail decay constant with distance (ns/cm).
    pub tail_tau_slope: f64,
}

impl Default for TransportParams {
    fn default() -> Self {
        Self {
            step: Length::new::<centimeter>(1.0),
            max_distance: Length::new::<centimeter>(1000.0),
            grid_points: 256,
            group_velocity: 13.5,
            max_group_velocity: 18.88,
            width: 0.2,
            width_slope: 0.01,
            angle_broadening: 0.3,
            tail_fraction: 0.3,
            tail_distance: 200.0,
            tail_tau: 1.0,
            tail_tau_slope: 0.02,
        }
    }
}

impl TransportParams {
    fn validate(&self) -> Result<()> {
        let positive = [
            ("step", self.step.get::<centimeter>()),
            ("max_distance", self.max_distance.get::<centimeter>()),
            ("group_velocity", self.group_velocity),
            ("width", self.width),
            ("tail_distance", self.tail_distance),
            ("tail_tau", self.tail_tau),
        ];
        if let Some((name, _)) = positive.into_iter().find(|&(_, v)| !(v > 0.0 && v.is_finite())) {
            return Err(Error::parameter(name, "must be positive"));
        }
        if !(self.max_group_velocity >= self.group_velocity) {
            return Err(Error::parameter(
                "max_group_velocity",
                "must not be smaller than group_velocity",
            ));
        }
        if !(0.0..=1.0).contains(&self.tail_fraction) {
            return Err(Error::parameter("tail_fraction", "must be within [0, 1]"));
        }
        if self.grid_points < 2 {
            return Err(Error::parameter("grid_points", "must be at least 2"));
        }
        if self.width_slope < 0.0 || self.tail_tau_slope < 0.0 || self.angle_broadening < 0.0 {
            return Err(Error::parameter("slopes", "must be non-negative"));
        }

        Ok(())
    }

    // Arrival time density (unnormalised) at `t` ns for distance `d` cm.
    fn density(&self, d: f64, angle: AngleBin, t: f64) -> f64 {
        let earliest = d / self.max_group_velocity;
        if t < earliest {
            return 0.0;
        }
        let peak = d / self.group_velocity;
        let width = (self.width + self.width_slope * d)
            * (1.0 + self.angle_broadening * angle.index() as f64);
        let tail = self.tail_fraction * (1.0 - (-d / self.tail_distance).exp());
        let tau = self.tail_tau + self.tail_tau_slope * d;

        // Moyal approximation of the Landau distribution.
        let lambda = (t - peak) / width;
        let direct = (-0.5 * (lambda + (-lambda).exp())).exp()
            / (width * (2.0 * std::f64::consts::PI).sqrt());
        let scattered = if t >= peak {
            (-(t - peak) / tau).exp() / tau
        } else {
            0.0
        };

        (1.0 - tail) * direct + tail * scattered
    }

    fn support(&self, d: f64, angle: AngleBin) -> (f64, f64) {
        let earliest = d / self.max_group_velocity;
        let width = (self.width + self.width_slope * d)
            * (1.0 + self.angle_broadening * angle.index() as f64);
        let tau = self.tail_tau + self.tail_tau_slope * d;
        let latest = d / self.group_velocity + 30.0 * width + 15.0 * tau;

        (earliest, latest)
    }
}

// Cumulative distribution on a uniform time grid.
#[derive(Clone, Debug)]
struct TimeCdf {
    start: f64,
    step: f64,
    cdf: Vec<f64>,
}

impl TimeCdf {
    fn tabulate(params: &TransportParams, d: f64, angle: AngleBin) -> Self {
        let (start, end) = params.support(d, angle);
        let n = params.grid_points;
        let step = (end - start) / (n - 1) as f64;

        let density: Vec<f64> = (0..n)
            .map(|i| params.density(d, angle, start + step * i as f64))
            .collect();
        let mut cdf = Vec::with_capacity(n);
        let mut total = 0.0;
        cdf.push(0.0);
        for pair in density.windows(2) {
            total += 0.5 * (pair[0] + pair[1]) * step;
            cdf.push(total);
        }
        for value in &mut cdf {
            *value /= total;
        }

        Self { start, step, cdf }
    }

    // Inverse CDF by linear interpolation.
    fn quantile(&self, u: f64) -> f64 {
        let upper = self.cdf.partition_point(|&c| c < u).clamp(1, self.cdf.len() - 1);
        let (lo, hi) = (self.cdf[upper - 1], self.cdf[upper]);
        let fraction = if hi > lo { (u - lo) / (hi - lo) } else { 0.0 };

        self.start + self.step * ((upper - 1) as f64 + fraction)
    }
}

/// Tabulated photon transport time distributions.
#[derive(Clone, Debug)]
pub struct TransportTimeModel {
    step: f64,
    // Indexed by `distance_bin * ANGLE_BINS + angle_bin`.
    table: Vec<TimeCdf>,
}

impl TransportTimeModel {
    /// Build the table. This is the expensive part and is done once per run.
    pub fn new(params: TransportParams) -> Result<Self> {
        params.validate()?;
        let step = params.step.get::<centimeter>();
        let bins = (params.max_distance.get::<centimeter>() / step).ceil().max(1.0) as usize;

        let table = (0..bins)
            .flat_map(|bin| {
                let d = (bin as f64 + 0.5) * step;
                (0..ANGLE_BINS).map(move |angle| TimeCdf::tabulate(&params, d, AngleBin(angle)))
            })
            .collect();
        log::debug!("tabulated transport times for {bins} distance buckets");

        Ok(Self { step, table })
    }

    /// Number of tabulated distance buckets.
    pub fn distance_bins(&self) -> usize {
        self.table.len() / ANGLE_BINS
    }

    /// Distance bucket used for `distance`. Distances past the table use the
    /// last bucket.
    pub fn distance_bin(&self, distance: Length) -> usize {
        let bin = (distance.get::<centimeter>() / self.step).max(0.0) as usize;
        bin.min(self.distance_bins() - 1)
    }

    /// Draw `count` independent transport times for photons travelling
    /// `distance` and arriving in `angle`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rand::SeedableRng;
    /// use scint::transport::{AngleBin, TransportParams, TransportTimeModel};
    /// use uom::si::{f64::Length, length::centimeter};
    ///
    /// let params = TransportParams {
    ///     max_distance: Length::new::<centimeter>(100.0),
    ///     ..TransportParams::default()
    /// };
    /// let model = TransportTimeModel::new(params)?;
    /// let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
    ///
    /// let distance = Length::new::<centimeter>(50.0);
    /// let times = model.sample(distance, AngleBin::from_degrees(10.0), 20, &mut rng);
    /// assert_eq!(times.len(), 20);
    /// # Ok::<(), scint::Error>(())
    /// ```
    pub fn sample<R: Rng + ?Sized>(
        &self,
        distance: Length,
        angle: AngleBin,
        count: u64,
        rng: &mut R,
    ) -> Vec<Time> {
        let cdf = &self.table[self.distance_bin(distance) * ANGLE_BINS + angle.index()];
        (0..count)
            .map(|_| Time::new::<nanosecond>(cdf.quantile(rng.random())))
            .collect()
    }
}
