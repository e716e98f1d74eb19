//! Report gate: a voltage is reported only when it moved more than the
//! threshold away from the last reported one.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisFilter {
    threshold: f32,
    last_reported: f32,
}

impl HysteresisFilter {
    /// `last_reported` starts at 0 V.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.max(0.0),
            last_reported: 0.0,
        }
    }

    /// Returns `Some(v)` and remembers it when `|v - last_reported| > threshold`.
    /// Suppressed values leave `last_reported` untouched.
    pub fn admit(&mut self, v: f32) -> Option<f32> {
        if (v - self.last_reported).abs() > self.threshold {
            self.last_reported = v;
            Some(v)
        } else {
            None
        }
    }

    pub fn last_reported(&self) -> f32 {
        self.last_reported
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_only_beyond_threshold() {
        let h = 0.2;
        let mut f = HysteresisFilter::new(h);
        assert_eq!(f.admit(0.0), None);
        assert_eq!(f.admit(0.5 * h), None);
        assert_eq!(f.admit(0.9 * h), None);
        assert_eq!(f.last_reported(), 0.0);
        assert_eq!(f.admit(1.5 * h), Some(1.5 * h));
        assert_eq!(f.last_reported(), 1.5 * h);
    }

    #[test]
    fn equal_to_threshold_is_suppressed() {
        let mut f = HysteresisFilter::new(0.25);
        assert_eq!(f.admit(0.25), None);
        assert_eq!(f.admit(-0.5), Some(-0.5));
    }
}
