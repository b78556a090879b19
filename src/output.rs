use crate::deposit::RawEvent;
use crate::error::Result;
use crate::Observer;
use serde::Serialize;
use std::io::Write;

/// Arrival times collected by one sensor during an event.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SensorTimes {
    pub id: i64,
    /// Absolute photon arrival times (us), in the order they were generated.
    pub photon_times_us: Vec<f64>,
    /// Drift times (us) of electrons landing in the sensor footprint.
    pub charge_times_us: Vec<f64>,
}

/// Everything the simulation produced for a single event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventRecord {
    #[serde(rename = "event")]
    pub index: u64,
    /// One entry per sensor, in geometry order.
    pub sensors: Vec<SensorTimes>,
    /// Light yield (photons/MeV) of each deposit.
    pub light_yield: Vec<f64>,
    /// Charge yield (electrons/MeV) of each deposit.
    pub charge_yield: Vec<f64>,
    /// PDG codes seen in this event that could not be classified.
    pub unknown_species: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<RawEvent>,
}

impl EventRecord {
    /// Total number of photons detected by all sensors.
    pub fn photon_count(&self) -> usize {
        self.sensors.iter().map(|s| s.photon_times_us.len()).sum()
    }

    /// Total number of electrons collected by all sensors.
    pub fn charge_count(&self) -> usize {
        self.sensors.iter().map(|s| s.charge_times_us.len()).sum()
    }
}

/// Observer that writes every event as one JSON object per line.
pub struct JsonLinesWriter<W: Write> {
    writer: W,
    events: u64,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, events: 0 }
    }

    /// Number of events written so far.
    pub fn events(&self) -> u64 {
        self.events
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Observer for JsonLinesWriter<W> {
    fn on_event(&mut self, event: &EventRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.events += 1;

        Ok(())
    }

    fn on_finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        log::info!("wrote {} events", self.events);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn record(input: Option<RawEvent>) -> EventRecord {
        EventRecord {
            index: 7,
            sensors: vec![SensorTimes {
                id: 3,
                photon_times_us: vec![1.25, 0.5],
                charge_times_us: vec![625.0],
            }],
            light_yield: vec![20000.0],
            charge_yield: vec![30000.0],
            unknown_species: vec![211],
            input,
        }
    }

    #[test]
    fn json_lines_shape() {
        let mut writer = JsonLinesWriter::new(Vec::new());
        writer.on_event(&record(None)).unwrap();
        writer.on_event(&record(Some(RawEvent::default()))).unwrap();
        writer.on_finish().unwrap();
        assert_eq!(writer.events(), 2);

        let output = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);

        let first = &lines[0];
        assert_eq!(first["event"], 7);
        assert_eq!(first["sensors"][0]["id"], 3);
        assert_eq!(first["sensors"][0]["photon_times_us"][1], 0.5);
        assert_eq!(first["sensors"][0]["charge_times_us"][0], 625.0);
        assert_eq!(first["unknown_species"][0], 211);
        assert!(first.get("input").is_none());

        assert_eq!(lines[1]["input"]["energy_deposit"], 0.0);
    }

    #[test]
    fn record_counts() {
        let record = record(None);
        assert_eq!(record.photon_count(), 2);
        assert_eq!(record.charge_count(), 1);
    }
}
