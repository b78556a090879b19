//! Semi-analytic estimate of the number of scintillation photons reaching a
//! sensor, from the solid angle the sensor aperture subtends at the
//! scintillation point.
use crate::error::Result;
use crate::geometry::{Sensor, Shape};
use crate::statistics::CountSampling;
use nalgebra::Vector3;
use rand::Rng;
use std::f64::consts::{FRAC_PI_2, PI};
use uom::si::f64::Length;
use uom::si::length::centimeter;

/// Photon visibility model for a sensor array with a common pixel size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitModel {
    /// Edge of a rectangular pixel. Disk apertures have the same area.
    pub pixel_size: Length,
    /// Fraction of photons reaching the aperture that are detected.
    pub efficiency: f64,
}

impl HitModel {
    pub fn new(pixel_size: Length) -> Self {
        Self {
            pixel_size,
            efficiency: 1.0,
        }
    }

    /// Radius of a disk aperture with the same area as a square pixel.
    pub fn disk_radius(&self) -> f64 {
        let edge = self.pixel_size.get::<centimeter>();
        (edge * edge / PI).sqrt()
    }

    /// Solid angle (sr) subtended by the sensor aperture at `source` (cm).
    ///
    /// Zero for points behind, or in the plane of, the sensor face.
    pub fn solid_angle(&self, source: &Vector3<f64>, sensor: &Sensor) -> f64 {
        let offset = source - sensor.position;
        let distance = offset[sensor.axis.index()];
        if !(distance > 0.0) {
            return 0.0;
        }
        let (i, j) = sensor.axis.transverse();

        match sensor.shape {
            Shape::Rectangular => {
                let half = 0.5 * self.pixel_size.get::<centimeter>();
                rectangle_solid_angle(half, offset[i], offset[j], distance)
            }
            Shape::Disk => {
                let lateral = offset[i].hypot(offset[j]);
                disk_solid_angle(self.disk_radius(), lateral, distance)
            }
        }
    }

    /// Mean number of detected photons out of `photons` emitted isotropically
    /// at `source`.
    pub fn expected_hits(&self, photons: u64, source: &Vector3<f64>, sensor: &Sensor) -> f64 {
        if photons == 0 {
            return 0.0;
        }
        photons as f64 * self.solid_angle(source, sensor) / (4.0 * PI) * self.efficiency
    }

    /// Number of detected photons out of `photons` emitted at `source`.
    ///
    /// # Examples
    ///
    /// ```
    /// use nalgebra::Vector3;
    /// use rand::SeedableRng;
    /// use scint::geometry::{Axis, Sensor, Shape};
    /// use scint::hits::HitModel;
    /// use scint::statistics::CountSampling;
    /// use uom::si::{f64::Length, length::centimeter};
    ///
    /// let model = HitModel::new(Length::new::<centimeter>(10.0));
    /// let sensor = Sensor {
    ///     id: 0,
    ///     position: Vector3::zeros(),
    ///     shape: Shape::Rectangular,
    ///     axis: Axis::Z,
    /// };
    /// let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
    ///
    /// let front = Vector3::new(0.0, 0.0, 50.0);
    /// let behind = Vector3::new(0.0, 0.0, -50.0);
    /// let sampling = CountSampling::Truncate;
    /// assert!(model.detected_hits(10_000, &front, &sensor, sampling, &mut rng)? > 0);
    /// assert_eq!(model.detected_hits(10_000, &behind, &sensor, sampling, &mut rng)?, 0);
    /// # Ok::<(), scint::Error>(())
    /// ```
    pub fn detected_hits<R: Rng + ?Sized>(
        &self,
        photons: u64,
        source: &Vector3<f64>,
        sensor: &Sensor,
        sampling: CountSampling,
        rng: &mut R,
    ) -> Result<u64> {
        sampling.realize(self.expected_hits(photons, source, sensor), rng)
    }
}

/// Solid angle of a `2 half` x `2 half` square seen from a point at height
/// `distance` above the plane, displaced by `(u, v)` from the square centre.
pub fn rectangle_solid_angle(half: f64, u: f64, v: f64, distance: f64) -> f64 {
    // Signed solid angle of the rectangle spanned by the foot of the
    // perpendicular and the corner (x, y).
    let corner = |x: f64, y: f64| (x * y / (distance * (x * x + y * y + distance * distance).sqrt())).atan();

    let (x1, x2) = (-half - u, half - u);
    let (y1, y2) = (-half - v, half - v);

    corner(x2, y2) - corner(x1, y2) - corner(x2, y1) + corner(x1, y1)
}

/// Solid angle of a disk of `radius` seen from a point at height `distance`
/// above its plane and `lateral` away from its axis.
pub fn disk_solid_angle(radius: f64, lateral: f64, distance: f64) -> f64 {
    if !(radius > 0.0 && distance > 0.0) {
        return 0.0;
    }
    let far = (distance * distance + (radius + lateral).powi(2)).sqrt();
    let ratio = distance / far;
    if lateral <= radius * 1e-12 {
        let near = distance / distance.hypot(radius);
        return 2.0 * PI * (1.0 - near);
    }

    let m = 4.0 * radius * lateral / (far * far);
    let n = 4.0 * radius * lateral / (radius + lateral).powi(2);
    let k = complete_k(m);
    // weight * Pi(n, m) with weight = sqrt(1 - n). Near the rim n -> 1 and the
    // direct form cancels badly, so use Pi(n, m) + Pi(m / n, m) = K(m) +
    // pi / 2 * sqrt(n / ((1 - n)(n - m))) there.
    let weight = (radius - lateral).abs() / (radius + lateral);
    let weighted_pi = if n * n <= m {
        weight * complete_pi(n, m)
    } else {
        weight * (k - complete_pi(m / n, m)) + FRAC_PI_2 * (n / (n - m)).sqrt()
    };

    if lateral < radius {
        2.0 * PI - 2.0 * ratio * (k + weighted_pi)
    } else {
        2.0 * ratio * (weighted_pi - k)
    }
}

// Complete elliptic integral of the first kind, parameter m = k^2.
fn complete_k(m: f64) -> f64 {
    carlson_rf(0.0, 1.0 - m, 1.0)
}

// Complete elliptic integral of the third kind,
// \int_0^{pi/2} dt / ((1 - n sin^2 t) sqrt(1 - m sin^2 t)).
fn complete_pi(n: f64, m: f64) -> f64 {
    carlson_rf(0.0, 1.0 - m, 1.0) + n / 3.0 * carlson_rj(0.0, 1.0 - m, 1.0, 1.0 - n)
}

fn carlson_rf(mut x: f64, mut y: f64, mut z: f64) -> f64 {
    const TOLERANCE: f64 = 0.0025;

    let (mut ave, mut dx, mut dy, mut dz);
    loop {
        let (sx, sy, sz) = (x.sqrt(), y.sqrt(), z.sqrt());
        let lambda = sx * (sy + sz) + sy * sz;
        x = 0.25 * (x + lambda);
        y = 0.25 * (y + lambda);
        z = 0.25 * (z + lambda);
        ave = (x + y + z) / 3.0;
        dx = (ave - x) / ave;
        dy = (ave - y) / ave;
        dz = (ave - z) / ave;
        if dx.abs().max(dy.abs()).max(dz.abs()) <= TOLERANCE {
            break;
        }
    }
    let e2 = dx * dy - dz * dz;
    let e3 = dx * dy * dz;

    (1.0 + (e2 / 24.0 - 0.1 - 3.0 / 44.0 * e3) * e2 + e3 / 14.0) / ave.sqrt()
}

fn carlson_rc(mut x: f64, mut y: f64) -> f64 {
    const TOLERANCE: f64 = 0.0012;

    let (mut ave, mut s);
    loop {
        let lambda = 2.0 * x.sqrt() * y.sqrt() + y;
        x = 0.25 * (x + lambda);
        y = 0.25 * (y + lambda);
        ave = (x + 2.0 * y) / 3.0;
        s = (y - ave) / ave;
        if s.abs() <= TOLERANCE {
            break;
        }
    }

    (1.0 + s * s * (0.3 + s * (1.0 / 7.0 + s * (0.375 + s * 9.0 / 22.0)))) / ave.sqrt()
}

fn carlson_rj(mut x: f64, mut y: f64, mut z: f64, mut p: f64) -> f64 {
    const TOLERANCE: f64 = 0.0015;
    const C1: f64 = 3.0 / 14.0;
    const C2: f64 = 1.0 / 3.0;
    const C3: f64 = 3.0 / 22.0;
    const C4: f64 = 3.0 / 26.0;
    const C5: f64 = 0.75 * C3;
    const C6: f64 = 1.5 * C4;
    const C7: f64 = 0.5 * C2;
    const C8: f64 = C3 + C3;

    let mut sum = 0.0;
    let mut factor = 1.0;
    let (mut ave, mut dx, mut dy, mut dz, mut dp);
    loop {
        let (sx, sy, sz) = (x.sqrt(), y.sqrt(), z.sqrt());
        let lambda = sx * (sy + sz) + sy * sz;
        let alpha = (p * (sx + sy + sz) + sx * sy * sz).powi(2);
        let beta = p * (p + lambda).powi(2);
        sum += factor * carlson_rc(alpha, beta);
        factor *= 0.25;
        x = 0.25 * (x + lambda);
        y = 0.25 * (y + lambda);
        z = 0.25 * (z + lambda);
        p = 0.25 * (p + lambda);
        ave = 0.2 * (x + y + z + 2.0 * p);
        dx = (ave - x) / ave;
        dy = (ave - y) / ave;
        dz = (ave - z) / ave;
        dp = (ave - p) / ave;
        if dx.abs().max(dy.abs()).max(dz.abs()).max(dp.abs()) <= TOLERANCE {
            break;
        }
    }
    let ea = dx * (dy + dz) + dy * dz;
    let eb = dx * dy * dz;
    let ec = dp * dp;
    let ed = ea - 3.0 * ec;
    let ee = eb + 2.0 * dp * (ea - ec);

    3.0 * sum
        + factor
            * (1.0 + ed * (-C1 + C5 * ed - C6 * ee)
                + eb * (C7 + dp * (-C8 + dp * C4))
                + dp * ea * (C2 - dp * C3)
                - C2 * dp * ec)
            / (ave * ave.sqrt())
}
