use std::collections::VecDeque;
use crate::drivers::BufferError;
use crate::types::Reading;
/// Rolling buffer that keeps the most recent readings of one channel.
#[derive(Clone, Debug)]
pub struct RollingBuffer {
    readings: VecDeque<Reading>,
    capacity: usize,
}
impl RollingBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::ZeroCapacity);
        }
        Ok(Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        })
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn len(&self) -> usize {
        self.readings.len()
    }
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
    /// Append a reading, evicting the oldest when full. Readings must arrive
    /// in strictly increasing time order.
    pub fn push(&mut self, reading: Reading) -> Result<(), BufferError> {
        if let Some(last) = self.readings.back() {
            if reading.timestamp <= last.timestamp {
                return Err(BufferError::NonMonotonic {
                    last: last.timestamp,
                    actual: reading.timestamp,
                });
            }
        }
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
        Ok(())
    }
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }
    /// Drop everything but the newest reading.
    pub fn retain_latest(&mut self) {
        let keep_from = self.readings.len().saturating_sub(1);
        self.readings.drain(..keep_from);
    }
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.readings.iter().map(Reading::point).collect()
    }
    /// Reading taken at exactly `timestamp`, if any.
    pub fn at(&self, timestamp: f64) -> Option<&Reading> {
        self.readings
            .binary_search_by(|r| r.timestamp.total_cmp(&timestamp))
            .ok()
            .and_then(|idx| self.readings.get(idx))
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelId;
    fn reading(n: u32) -> Reading {
        Reading {
            channel: ChannelId::Turbine1Voltage,
            raw: n as i16,
            timestamp: f64::from(n),
            value: f64::from(n) * 0.5,
        }
    }
    #[test]
    fn keeps_most_recent_readings_in_order() {
        let mut buffer = RollingBuffer::with_capacity(5).unwrap();
        for n in 1..=7 {
            buffer.push(reading(n)).unwrap();
            assert!(buffer.len() <= buffer.capacity());
        }
        let stamps: Vec<f64> = buffer.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(buffer.latest().map(|r| r.raw), Some(7));
    }
    #[test]
    fn rejects_zero_capacity() {
        assert_eq!(RollingBuffer::with_capacity(0).unwrap_err(), BufferError::ZeroCapacity);
    }
    #[test]
    fn rejects_readings_that_go_back_in_time() {
        let mut buffer = RollingBuffer::with_capacity(3).unwrap();
        buffer.push(reading(4)).unwrap();
        let err = buffer.push(reading(4)).unwrap_err();
        assert_eq!(err, BufferError::NonMonotonic { last: 4.0, actual: 4.0 });
        assert!(buffer.push(reading(2)).is_err());
        assert_eq!(buffer.len(), 1);
    }
    #[test]
    fn retain_latest_keeps_newest_point() {
        let mut buffer = RollingBuffer::with_capacity(4).unwrap();
        buffer.retain_latest();
        assert!(buffer.is_empty());
        for n in 1..=3 {
            buffer.push(reading(n)).unwrap();
        }
        buffer.retain_latest();
        assert_eq!(buffer.points(), vec![[3.0, 1.5]]);
    }
    #[test]
    fn lookup_by_timestamp() {
        let mut buffer = RollingBuffer::with_capacity(4).unwrap();
        for n in [1, 2, 5] {
            buffer.push(reading(n)).unwrap();
        }
        assert_eq!(buffer.at(2.0).map(|r| r.raw), Some(2));
        assert!(buffer.at(3.0).is_none());
    }
}
