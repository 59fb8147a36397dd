use std::collections::BTreeMap;

/// Something that shows named (x, y) series and redraws on demand.
pub trait DisplaySurface {
    fn upsert_series(&mut self, name: &str, points: Vec<[f64; 2]>);
    fn refresh(&mut self);
}

/// Series store behind the live window. The window draws whatever is here
/// every frame; `refresh` marks a new generation so it knows to repaint.
#[derive(Default, Debug)]
pub struct ChartSurface {
    series: BTreeMap<String, Vec<[f64; 2]>>,
    generation: u64,
}

impl ChartSurface {
    pub fn series(&self, name: &str) -> Option<&[[f64; 2]]> {
        self.series.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(Vec::is_empty)
    }
}

impl DisplaySurface for ChartSurface {
    fn upsert_series(&mut self, name: &str, points: Vec<[f64; 2]>) {
        match self.series.get_mut(name) {
            Some(existing) => *existing = points,
            None => {
                self.series.insert(name.to_owned(), points);
            }
        }
    }

    fn refresh(&mut self) {
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_replaces_points_and_refresh_bumps_generation() {
        let mut surface = ChartSurface::default();
        assert!(surface.is_empty());
        surface.upsert_series("Turbine 1 Voltage", vec![[0.0, 1.0]]);
        surface.upsert_series("Turbine 1 Voltage", vec![[0.0, 1.0], [1.0, 2.0]]);
        surface.refresh();
        assert_eq!(surface.series("Turbine 1 Voltage").map(|s| s.len()), Some(2));
        assert_eq!(surface.names().collect::<Vec<_>>(), vec!["Turbine 1 Voltage"]);
        assert_eq!(surface.generation(), 1);
        assert!(surface.series("Turbine 2 Voltage").is_none());
    }
}
