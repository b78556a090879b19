use crate::geometry::GeometryError;

/// The error type for all fallible operations in this crate.
///
/// Configuration problems and malformed input are reported before or while a
/// run is set up. The two model-consistency variants ([`Error::NegativeCount`]
/// and [`Error::IncidenceCosine`]) mean the models produced something
/// physically impossible; a run that hits one of them is aborted.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// An event record from the upstream simulation is inconsistent.
    #[error("event {index}: {reason}")]
    Event { index: u64, reason: String },
    /// A model or run parameter is outside its allowed range.
    #[error("invalid parameter `{name}`: {reason}")]
    Parameter { name: &'static str, reason: String },
    #[error("expected count must be a non-negative number, got {0}")]
    NegativeCount(f64),
    #[error("incidence cosine {0} is outside [-1, 1]")]
    IncidenceCosine(f64),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Parameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
