use crate::deposit::Species;
use crate::error::{Error, Result};
use crate::statistics::truncated_exponential;
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use uom::si::f64::Time;
use uom::si::time::{microsecond, nanosecond, second};

/// Scintillating noble liquid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Medium {
    #[default]
    Argon,
    Xenon,
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Medium::Argon => write!(f, "argon"),
            Medium::Xenon => write!(f, "xenon"),
        }
    }
}

impl FromStr for Medium {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "argon" | "ar" | "lar" => Ok(Medium::Argon),
            "xenon" | "xe" | "lxe" => Ok(Medium::Xenon),
            other => Err(Error::parameter(
                "medium",
                format!("expected `argon` or `xenon`, got `{other}`"),
            )),
        }
    }
}

/// Particle class with its own singlet/triplet population.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmissionClass {
    ElectronLike,
    HeavyLike,
}

impl From<Species> for EmissionClass {
    /// Unclassified particles are given the heavy-like population.
    fn from(species: Species) -> Self {
        match species {
            Species::ElectronLike => EmissionClass::ElectronLike,
            Species::HeavyLike | Species::Unknown(_) => EmissionClass::HeavyLike,
        }
    }
}

/// Excimer state a photon was emitted from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Branch {
    Singlet,
    Triplet,
}

/// Biexponential de-excitation time profile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecayProfile {
    pub singlet_lifetime: Time,
    pub triplet_lifetime: Time,
    pub singlet_fraction: f64,
    pub triplet_fraction: f64,
    /// Delays are drawn within `[0, window)`.
    pub window: Time,
}

impl DecayProfile {
    fn validate(&self) -> Result<()> {
        for (name, time) in [
            ("singlet_lifetime", self.singlet_lifetime),
            ("triplet_lifetime", self.triplet_lifetime),
            ("window", self.window),
        ] {
            if !(time.get::<second>() > 0.0) {
                return Err(Error::parameter(name, "must be positive"));
            }
        }
        let fractions = [self.singlet_fraction, self.triplet_fraction];
        if !fractions.iter().all(|f| *f >= 0.0 && f.is_finite()) {
            return Err(Error::parameter("fractions", "must be finite and non-negative"));
        }
        if !(self.singlet_fraction + self.triplet_fraction > 0.0) {
            return Err(Error::parameter("fractions", "must not both be zero"));
        }

        Ok(())
    }

    /// Probability that a photon comes from the singlet state.
    pub fn singlet_probability(&self) -> f64 {
        self.singlet_fraction / (self.singlet_fraction + self.triplet_fraction)
    }

    /// Draw the emitting state and the de-excitation delay.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (Branch, Time) {
        let (branch, lifetime) = if rng.random_bool(self.singlet_probability()) {
            (Branch::Singlet, self.singlet_lifetime)
        } else {
            (Branch::Triplet, self.triplet_lifetime)
        };
        let delay = truncated_exponential(
            lifetime.get::<second>(),
            self.window.get::<second>(),
            rng,
        );

        (branch, Time::new::<second>(delay))
    }
}

/// Decay profiles of both particle classes in one medium.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MediumProfiles {
    pub electron_like: DecayProfile,
    pub heavy_like: DecayProfile,
}

impl MediumProfiles {
    /// Profiles sharing lifetimes and window but with their own populations.
    pub fn new(
        singlet_lifetime: Time,
        triplet_lifetime: Time,
        electron_fractions: (f64, f64),
        heavy_fractions: (f64, f64),
        window: Time,
    ) -> Self {
        let profile = |(singlet_fraction, triplet_fraction)| DecayProfile {
            singlet_lifetime,
            triplet_lifetime,
            singlet_fraction,
            triplet_fraction,
            window,
        };
        Self {
            electron_like: profile(electron_fractions),
            heavy_like: profile(heavy_fractions),
        }
    }

    pub fn argon() -> Self {
        Self::new(
            Time::new::<nanosecond>(6.0),
            Time::new::<microsecond>(1.5),
            (0.23, 0.77),
            (0.75, 0.25),
            Time::new::<microsecond>(10.0),
        )
    }

    pub fn xenon() -> Self {
        Self::new(
            Time::new::<nanosecond>(4.3),
            Time::new::<nanosecond>(22.0),
            (0.30, 0.70),
            (0.30, 0.70),
            Time::new::<microsecond>(10.0),
        )
    }

    pub fn profile(&self, class: EmissionClass) -> &DecayProfile {
        match class {
            EmissionClass::ElectronLike => &self.electron_like,
            EmissionClass::HeavyLike => &self.heavy_like,
        }
    }
}

/// Scintillation emission time sampler for argon and xenon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmissionTimeModel {
    argon: MediumProfiles,
    xenon: MediumProfiles,
}

impl EmissionTimeModel {
    pub fn new(argon: MediumProfiles, xenon: MediumProfiles) -> Result<Self> {
        for profiles in [&argon, &xenon] {
            profiles.electron_like.validate()?;
            profiles.heavy_like.validate()?;
        }

        Ok(Self { argon, xenon })
    }

    pub fn profiles(&self, medium: Medium) -> &MediumProfiles {
        match medium {
            Medium::Argon => &self.argon,
            Medium::Xenon => &self.xenon,
        }
    }

    /// Draw a scintillation delay for a photon emitted in `medium` by a
    /// particle of `class`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rand::SeedableRng;
    /// use scint::emission::{EmissionClass, EmissionTimeModel, Medium};
    /// use uom::si::time::microsecond;
    ///
    /// let model = EmissionTimeModel::default();
    /// let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
    /// let delay = model.sample(Medium::Argon, EmissionClass::HeavyLike, &mut rng);
    /// assert!((0.0..10.0).contains(&delay.get::<microsecond>()));
    /// ```
    pub fn sample<R: Rng + ?Sized>(&self, medium: Medium, class: EmissionClass, rng: &mut R) -> Time {
        self.profiles(medium).profile(class).sample(rng).1
    }
}

impl Default for EmissionTimeModel {
    fn default() -> Self {
        Self {
            argon: MediumProfiles::argon(),
            xenon: MediumProfiles::xenon(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn branch_ratio_matches_fraction() {
        let model = EmissionTimeModel::default();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let n = 40_000;

        for medium in [Medium::Argon, Medium::Xenon] {
            for class in [EmissionClass::ElectronLike, EmissionClass::HeavyLike] {
                let profile = model.profiles(medium).profile(class);
                let singlets = (0..n)
                    .filter(|_| profile.sample(&mut rng).0 == Branch::Singlet)
                    .count();
                let p = profile.singlet_probability();
                let ratio = singlets as f64 / f64::from(n);
                let sigma = (p * (1.0 - p) / f64::from(n)).sqrt();
                assert!(
                    (ratio - p).abs() < 5.0 * sigma,
                    "{medium} {class:?}: {ratio} vs {p}"
                );
            }
        }
    }

    #[test]
    fn branch_lifetimes() {
        let profile = MediumProfiles::argon().electron_like;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (mut singlet, mut triplet) = (Vec::new(), Vec::new());
        for _ in 0..40_000 {
            match profile.sample(&mut rng) {
                (Branch::Singlet, t) => singlet.push(t.get::<nanosecond>()),
                (Branch::Triplet, t) => triplet.push(t.get::<nanosecond>()),
            }
        }
        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        assert!((mean(&singlet) / 6.0 - 1.0).abs() < 0.05);
        // The 10 us window cuts a little of the 1.5 us tail.
        let truncated = 1500.0 - 10_000.0 / ((10_000.0_f64 / 1500.0).exp() - 1.0);
        assert!((mean(&triplet) / truncated - 1.0).abs() < 0.03);
    }

    #[test]
    fn delays_stay_within_window() {
        let window = Time::new::<nanosecond>(50.0);
        let profiles = MediumProfiles::new(
            Time::new::<nanosecond>(6.0),
            Time::new::<microsecond>(1.5),
            (0.5, 0.5),
            (0.5, 0.5),
            window,
        );
        let model = EmissionTimeModel::new(profiles, MediumProfiles::xenon()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..10_000 {
            let delay = model.sample(Medium::Argon, EmissionClass::ElectronLike, &mut rng);
            assert!(delay >= Time::new::<second>(0.0) && delay <= window);
        }
    }

    #[test]
    fn media_are_independent() {
        let model = EmissionTimeModel::default();
        assert_ne!(
            model.profiles(Medium::Argon).electron_like,
            model.profiles(Medium::Xenon).electron_like
        );
        assert_eq!(
            model.profiles(Medium::Xenon).heavy_like.singlet_fraction,
            0.30
        );
    }

    #[test]
    fn pure_triplet_profile() {
        let mut profiles = MediumProfiles::argon();
        profiles.heavy_like.singlet_fraction = 0.0;
        let model = EmissionTimeModel::new(profiles, MediumProfiles::xenon()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let profile = model.profiles(Medium::Argon).heavy_like;
        assert!((0..1000).all(|_| profile.sample(&mut rng).0 == Branch::Triplet));
    }

    #[test]
    fn rejects_invalid_profiles() {
        let mut profiles = MediumProfiles::argon();
        profiles.electron_like.singlet_fraction = 0.0;
        profiles.electron_like.triplet_fraction = 0.0;
        assert!(EmissionTimeModel::new(profiles, MediumProfiles::xenon()).is_err());

        let mut profiles = MediumProfiles::argon();
        profiles.heavy_like.singlet_fraction = f64::INFINITY;
        assert!(EmissionTimeModel::new(profiles, MediumProfiles::xenon()).is_err());

        let mut profiles = MediumProfiles::argon();
        profiles.electron_like.triplet_fraction = f64::NAN;
        assert!(EmissionTimeModel::new(profiles, MediumProfiles::xenon()).is_err());

        let mut profiles = MediumProfiles::xenon();
        profiles.heavy_like.window = Time::new::<second>(0.0);
        assert!(EmissionTimeModel::new(MediumProfiles::argon(), profiles).is_err());
    }

    #[test]
    fn unknown_species_use_heavy_profile() {
        assert_eq!(
            EmissionClass::from(Species::Unknown(211)),
            EmissionClass::HeavyLike
        );
        assert_eq!(
            EmissionClass::from(Species::classify(22)),
            EmissionClass::ElectronLike
        );
    }

    #[test]
    fn medium_from_str() {
        assert_eq!("Xenon".parse::<Medium>().unwrap(), Medium::Xenon);
        assert_eq!("lar".parse::<Medium>().unwrap(), Medium::Argon);
        assert!("neon".parse::<Medium>().is_err());
    }
}
