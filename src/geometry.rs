use annotate_snippets::{Level, Renderer, Snippet};
use nalgebra::Vector3;
use std::fmt;
use std::ops::Range;
use std::path::Path;
use winnow::ascii::{dec_int, float, space0, space1};
use winnow::combinator::{delimited, preceded};
use winnow::Parser;

/// Aperture shape of a photosensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// Square aperture with the pixel size as its edge.
    Rectangular,
    /// Circular aperture with the same area as a square pixel.
    Disk,
}

impl Shape {
    /// Map the integer code used in geometry files.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Shape::Rectangular),
            1 => Some(Shape::Disk),
            _ => None,
        }
    }
}

/// Principal axis a sensor face is perpendicular to. Sensors look towards
/// increasing coordinate along this axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Map the 1-based direction code used in geometry files.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Axis::X),
            2 => Some(Axis::Y),
            3 => Some(Axis::Z),
            _ => None,
        }
    }
    /// Component index of this axis in a 3-vector.
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
    /// Component indices spanning the plane of a face perpendicular to this
    /// axis.
    pub fn transverse(self) -> (usize, usize) {
        match self {
            Axis::X => (1, 2),
            Axis::Y => (2, 0),
            Axis::Z => (0, 1),
        }
    }
}

/// A photosensor. Positions are in centimeters.
#[derive(Clone, Debug, PartialEq)]
pub struct Sensor {
    pub id: i64,
    pub position: Vector3<f64>,
    pub shape: Shape,
    pub axis: Axis,
}

/// The error type returned when a geometry file contains an unrecoverable
/// record.
#[derive(Debug)]
pub struct GeometryError {
    line: String,
    line_number: usize,
    span: Range<usize>,
    message: String,
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = Level::Error.title(&self.message).snippet(
            Snippet::source(&self.line)
                .line_start(self.line_number)
                .fold(true)
                .annotation(Level::Error.span(self.span.clone())),
        );
        let renderer = Renderer::plain();
        let rendered = renderer.render(message);
        rendered.fmt(f)
    }
}

impl std::error::Error for GeometryError {}

struct Record {
    id: i64,
    position: [f64; 3],
    shape: i64,
    direction: i64,
}

fn parse_record(input: &mut &str) -> winnow::Result<Record> {
    let (id, x, y, z, shape, direction): (i64, f64, f64, f64, i64, i64) = (
        preceded(space0, dec_int),
        preceded(space1, float),
        preceded(space1, float),
        preceded(space1, float),
        preceded(space1, dec_int),
        delimited(space1, dec_int, space0),
    )
        .parse_next(input)?;

    Ok(Record {
        id,
        position: [x, y, z],
        shape,
        direction,
    })
}

// Byte range of the n-th whitespace separated field of a line.
fn field_span(line: &str, n: usize) -> Range<usize> {
    let mut fields = line
        .char_indices()
        .filter(|&(i, c)| {
            !c.is_whitespace()
                && line[..i]
                    .chars()
                    .next_back()
                    .map_or(true, char::is_whitespace)
        })
        .map(|(i, _)| i);
    let start = fields.nth(n).unwrap_or(0);
    let len = line[start..]
        .find(char::is_whitespace)
        .unwrap_or(line.len() - start);

    start..start + len
}

/// Parse a sensor placement file.
///
/// Every line holds `id x y z type direction`. Blank lines are skipped and
/// parsing stops at the first line that does not match the format. An unknown
/// `type` or `direction` code is an error.
///
/// # Examples
///
/// ```
/// use scint::geometry::{parse_geometry, Axis, Shape};
///
/// let sensors = parse_geometry("0 10.0 20.0 0.0 0 3\n1 10.4 20.0 0.0 1 3\n")?;
/// assert_eq!(sensors.len(), 2);
/// assert_eq!(sensors[1].shape, Shape::Disk);
/// assert_eq!(sensors[1].axis, Axis::Z);
/// # Ok::<(), scint::geometry::GeometryError>(())
/// ```
pub fn parse_geometry(input: &str) -> Result<Vec<Sensor>, GeometryError> {
    let mut sensors = Vec::new();

    for (n, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = match parse_record.parse(line) {
            Ok(record) => record,
            Err(error) => {
                let renderer = Renderer::plain();
                let rendered = renderer.render(
                    Level::Warning
                        .title("geometry parsing stopped at unrecognized line")
                        .snippet(
                            Snippet::source(line)
                                .line_start(n + 1)
                                .annotation(Level::Warning.span(error.char_span())),
                        ),
                );
                log::warn!("{rendered}");
                break;
            }
        };

        let shape = Shape::from_code(record.shape).ok_or_else(|| GeometryError {
            line: line.to_string(),
            line_number: n + 1,
            span: field_span(line, 4),
            message: format!(
                "unknown sensor type `{}` (expected 0 = rectangular, 1 = disk)",
                record.shape
            ),
        })?;
        let axis = Axis::from_code(record.direction).ok_or_else(|| GeometryError {
            line: line.to_string(),
            line_number: n + 1,
            span: field_span(line, 5),
            message: format!(
                "optical detector direction `{}` not defined (expected 1, 2 or 3)",
                record.direction
            ),
        })?;

        sensors.push(Sensor {
            id: record.id,
            position: Vector3::from(record.position),
            shape,
            axis,
        });
    }

    Ok(sensors)
}

/// Read and parse a sensor placement file.
pub fn load_geometry<P: AsRef<Path>>(path: P) -> crate::Result<Vec<Sensor>> {
    let input = std::fs::read_to_string(path)?;
    let sensors = parse_geometry(&input)?;
    log::info!("positions loaded: {} optical detectors", sensors.len());

    Ok(sensors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_geometry_records() {
        let input = "0 1.5 -2 3e1 0 1\n\n  7\t0.0 0.0 0.0 1 2  \n";
        let sensors = parse_geometry(input).unwrap();

        assert_eq!(
            sensors,
            vec![
                Sensor {
                    id: 0,
                    position: Vector3::new(1.5, -2.0, 30.0),
                    shape: Shape::Rectangular,
                    axis: Axis::X,
                },
                Sensor {
                    id: 7,
                    position: Vector3::new(0.0, 0.0, 0.0),
                    shape: Shape::Disk,
                    axis: Axis::Y,
                },
            ]
        );
    }

    #[test]
    fn parse_geometry_stops_at_first_mismatch() {
        let input = "0 0 0 0 0 3\n1 0 0 0 0 3\n# trailing comment\n2 0 0 0 0 3\n";
        let sensors = parse_geometry(input).unwrap();
        assert_eq!(sensors.len(), 2);

        let input = "0 0 0 0 0 3\n1 0 0 0 0\n2 0 0 0 0 3\n";
        assert_eq!(parse_geometry(input).unwrap().len(), 1);

        assert!(parse_geometry("").unwrap().is_empty());
    }

    #[test]
    fn parse_geometry_rejects_unknown_direction() {
        let input = "0 0 0 0 0 3\n1 5.0 5.0 0.0 0 4\n";
        let error = parse_geometry(input).unwrap_err();

        assert_eq!(error.line_number, 2);
        assert_eq!(&error.line[error.span.clone()], "4");
        let rendered = error.to_string();
        assert!(rendered.contains("direction `4` not defined"));
        assert!(rendered.contains("1 5.0 5.0 0.0 0 4"));
    }

    #[test]
    fn parse_geometry_rejects_unknown_type() {
        let error = parse_geometry("3 0.0 0.0 0.0 2 1").unwrap_err();

        assert_eq!(error.span, 14..15);
        assert!(error.to_string().contains("unknown sensor type `2`"));
    }

    #[test]
    fn field_span_finds_fields() {
        let line = "  12  3.5\t-1 0";
        assert_eq!(&line[field_span(line, 0)], "12");
        assert_eq!(&line[field_span(line, 1)], "3.5");
        assert_eq!(&line[field_span(line, 2)], "-1");
        assert_eq!(&line[field_span(line, 3)], "0");
    }

    #[test]
    fn axis_codes() {
        assert_eq!(Axis::from_code(1), Some(Axis::X));
        assert_eq!(Axis::from_code(3), Some(Axis::Z));
        assert_eq!(Axis::from_code(0), None);
        assert_eq!(Axis::Z.transverse(), (0, 1));
        assert_eq!(Axis::Y.index(), 1);
    }
}
