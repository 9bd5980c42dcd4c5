use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Detections below this confidence are treated as noise.
pub const CONFIDENCE_FLOOR: f64 = 0.5;

/// Highest confidence seen per class label within a single frame.
///
/// Labels are upper-cased on insertion so that names differing only in case
/// share one entry. Entries are kept in label order, which makes the
/// best-class selection deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassConfidenceMap {
    entries: BTreeMap<String, f64>,
}

impl ClassConfidenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one detection. Returns `false` (and changes nothing) when the
    /// confidence is below [`CONFIDENCE_FLOOR`] or not a number.
    pub fn observe(&mut self, label: &str, confidence: f64) -> bool {
        if !(confidence >= CONFIDENCE_FLOOR) {
            return false;
        }

        let entry = self
            .entries
            .entry(label.to_uppercase())
            .or_insert(confidence);
        if confidence > *entry {
            *entry = confidence;
        }
        true
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries.get(&label.to_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(label, conf)| (label.as_str(), *conf))
    }

    /// Label with the highest confidence. On an exact tie the label that
    /// sorts first wins.
    pub fn best(&self) -> Option<(&str, f64)> {
        self.iter().fold(None, |best, (label, conf)| match best {
            Some((_, best_conf)) if conf <= best_conf => best,
            _ => Some((label, conf)),
        })
    }
}

impl<'a> FromIterator<(&'a str, f64)> for ClassConfidenceMap {
    fn from_iter<T: IntoIterator<Item = (&'a str, f64)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (label, conf) in iter {
            map.observe(label, conf);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_filtering() {
        let mut map = ClassConfidenceMap::new();
        assert!(!map.observe("paper", 0.49));
        assert!(!map.observe("paper", f64::NAN));
        assert!(map.observe("paper", 0.5));
        assert_eq!(map.get("PAPER"), Some(0.5));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_keeps_max_per_label_case_insensitive() {
        let map: ClassConfidenceMap =
            [("Plastic", 0.7), ("PLASTIC", 0.9), ("plastic", 0.6)].into_iter().collect();

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("plastic"), Some(0.9));
    }

    #[test]
    fn test_best_picks_highest() {
        let map: ClassConfidenceMap = [("METAL", 0.6), ("PLASTIC", 0.95)].into_iter().collect();
        assert_eq!(map.best(), Some(("PLASTIC", 0.95)));

        let reversed: ClassConfidenceMap =
            [("PLASTIC", 0.95), ("METAL", 0.6)].into_iter().collect();
        assert_eq!(reversed.best(), Some(("PLASTIC", 0.95)));
    }

    #[test]
    fn test_best_tie_prefers_first_label() {
        let map: ClassConfidenceMap =
            [("PLASTIC", 0.8), ("METAL", 0.8), ("PAPER", 0.8)].into_iter().collect();
        assert_eq!(map.best(), Some(("METAL", 0.8)));
    }

    #[test]
    fn test_empty_map_has_no_best() {
        assert_eq!(ClassConfidenceMap::new().best(), None);
    }
}
