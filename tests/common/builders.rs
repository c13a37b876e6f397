//! Test data builders for creating test objects

use ergrace::MonitorReading;

/// Builder for creating test readings
///
/// Starts from `{time: 10, distance: 50, spm: 20, power: 150, pace: 120}`.
pub struct ReadingBuilder {
    reading: MonitorReading,
}

impl ReadingBuilder {
    pub fn new() -> Self {
        Self {
            reading: MonitorReading::new(10.0, 50.0, 20, 150, 120.0),
        }
    }

    pub fn time(mut self, time: f64) -> Self {
        self.reading.time = time;
        self
    }

    pub fn distance(mut self, distance: f64) -> Self {
        self.reading.distance = distance;
        self
    }

    pub fn power(mut self, power: u32) -> Self {
        self.reading.power = power;
        self
    }

    pub fn build(self) -> MonitorReading {
        self.reading
    }
}

impl Default for ReadingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_builder() {
        let reading = ReadingBuilder::new().distance(60.0).power(180).build();

        assert_eq!(reading.time, 10.0);
        assert_eq!(reading.distance, 60.0);
        assert_eq!(reading.spm, 20);
        assert_eq!(reading.power, 180);
        assert_eq!(reading.pace, 120.0);
    }
}
