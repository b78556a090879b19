//! Conversion of deposited energy into scintillation photons and ionization
//! electrons.
//!
//! Charge follows the modified box recombination model where it is valid and
//! Birks' law at lower stopping power, corrected for electrons that escape
//! recombination at low dE/dx. Light is whatever is left of the total number of
//! quanta.
//!
//! The stopping power is estimated from the segment length alone: a minimum
//! ionizing value, raised for short segments where ionization is dense. The
//! per-MeV yields therefore do not depend on the deposited energy, and expected
//! counts are proportional to it.
use crate::emission::Medium;

/// Expected quanta per MeV of deposited energy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Yields {
    /// Scintillation photons per MeV.
    pub light: f64,
    /// Ionization electrons per MeV.
    pub charge: f64,
}

/// Semi-empirical yield parameterisation. The recombination constants are
/// shared between media; work functions, density and stopping power are not.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YieldModel {
    /// Energy to create an electron-ion pair (MeV).
    pub w_ion: f64,
    /// Average energy per quantum, photon or electron (MeV).
    pub w_ph: f64,
    /// Liquid density (g/cm^3).
    pub density: f64,
    /// Stopping power (MeV/cm) of long segments.
    pub mip_dedx: f64,
    /// Segment length (cm) below which the stopping power rises as `1/length`.
    pub dense_length: f64,
    pub box_a: f64,
    /// (kV/cm)(g/cm^2)/MeV
    pub box_b: f64,
    /// Smallest box-model argument the box model is used for. It is not
    /// monotonic below this and Birks' law takes over.
    pub box_min_xi: f64,
    pub birks_a: f64,
    /// (kV/cm)(g/cm^2)/MeV
    pub birks_k: f64,
    /// Amplitude of the escaping-electron fraction.
    pub escape_amplitude: f64,
    /// Field (kV/cm) at which the escaping fraction halves.
    pub escape_field: f64,
    /// dE/dx scale (MeV/cm) over which escaping electrons vanish.
    pub escape_dedx: f64,
}

impl Default for YieldModel {
    fn default() -> Self {
        Self::argon()
    }
}

impl YieldModel {
    pub fn argon() -> Self {
        Self {
            w_ion: 23.6e-6,
            w_ph: 19.5e-6,
            density: 1.396,
            mip_dedx: 2.1,
            dense_length: 0.03,
            box_a: 0.930,
            box_b: 0.212,
            box_min_xi: 0.47,
            birks_a: 0.800,
            birks_k: 0.0486,
            escape_amplitude: 0.1,
            escape_field: 0.3,
            escape_dedx: 2.0,
        }
    }

    pub fn xenon() -> Self {
        Self {
            w_ion: 15.6e-6,
            w_ph: 13.7e-6,
            density: 2.953,
            mip_dedx: 3.9,
            ..Self::argon()
        }
    }

    pub fn for_medium(medium: Medium) -> Self {
        match medium {
            Medium::Argon => Self::argon(),
            Medium::Xenon => Self::xenon(),
        }
    }
}

// Segments shorter than this (cm) are treated as this long.
const MIN_SEGMENT_LENGTH: f64 = 1e-4;

impl YieldModel {
    /// Fraction of ionization electrons that survive recombination at the
    /// given stopping power (MeV/cm) and field (kV/cm).
    pub fn recombination(&self, dedx: f64, field: f64) -> f64 {
        let scale = self.density * field;
        let xi = self.box_b * dedx / scale;
        let survival = if xi >= self.box_min_xi {
            (self.box_a + xi).ln() / xi
        } else {
            self.birks_a / (1.0 + self.birks_k * dedx / scale)
        };
        let escape = self.escape_amplitude / (1.0 + field / self.escape_field)
            * (-dedx / self.escape_dedx).exp();

        (survival + escape * (1.0 - survival)).clamp(0.0, 1.0)
    }

    /// Stopping power (MeV/cm) assigned to a segment of `length` (cm).
    pub fn stopping_power(&self, length: f64) -> f64 {
        self.mip_dedx * (1.0 + self.dense_length / length.max(MIN_SEGMENT_LENGTH))
    }

    /// Light and charge yields per MeV for a segment of `length` (cm) in a
    /// drift field of `field` (kV/cm).
    ///
    /// `energy` (MeV) does not change the per-MeV values; multiply by it to get
    /// the expected number of quanta.
    ///
    /// # Examples
    ///
    /// ```
    /// use scint::yields::YieldModel;
    ///
    /// let model = YieldModel::default();
    /// let yields = model.yields(2.1, 1.0, 0.5);
    /// assert!(yields.light > 0.0 && yields.charge > 0.0);
    /// assert_eq!(model.yields(4.2, 1.0, 0.5), yields);
    /// ```
    pub fn yields(&self, _energy: f64, length: f64, field: f64) -> Yields {
        let charge = self.recombination(self.stopping_power(length), field) / self.w_ion;
        let light = (1.0 / self.w_ph - charge).max(0.0);

        Yields { light, charge }
    }
}
