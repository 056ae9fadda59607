//! Service targets and the attributes used to seed runtime metrics.

use edgeplan_core::{Location, Service, ServiceSpec};
use rand::Rng;

const PROCESSING_TIME_RANGE: std::ops::RangeInclusive<u32> = 0..=10;
const CLIENT_LATENCY_RANGE: std::ops::RangeInclusive<u32> = 100..=1000;

pub fn random_processing_time<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(PROCESSING_TIME_RANGE)
}

pub fn random_client_latency<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(CLIENT_LATENCY_RANGE)
}

/// A service with a random target: latitude in `[-90, 90)`, longitude in
/// `[-180, 180]`, both integral.
pub fn random_service<R: Rng + ?Sized>(id: &str, rng: &mut R) -> Service {
    let processing_time = random_processing_time(rng);
    let client_latency = random_client_latency(rng);
    let lat: i32 = rng.gen_range(-90..90);
    let lng: i32 = rng.gen_range(-180..=180);
    Service {
        id: id.to_string(),
        target: Location::new(f64::from(lat), f64::from(lng)),
        processing_time,
        client_latency,
    }
}

/// How services are obtained for each generation attempt.
#[derive(Debug, Clone)]
pub enum ServiceSource {
    /// Named services with random targets.
    Random { ids: Vec<String> },
    /// Targets from a services file; missing attributes are drawn at random.
    Loaded(Vec<ServiceSpec>),
}

impl ServiceSource {
    pub fn materialize<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Service> {
        match self {
            ServiceSource::Random { ids } => ids.iter().map(|id| random_service(id, rng)).collect(),
            ServiceSource::Loaded(specs) => specs
                .iter()
                .map(|spec| Service {
                    id: spec.id.clone(),
                    target: spec.location,
                    processing_time: spec
                        .processing_time
                        .unwrap_or_else(|| random_processing_time(rng)),
                    client_latency: spec
                        .client_latency
                        .unwrap_or_else(|| random_client_latency(rng)),
                })
                .collect(),
        }
    }

    /// Whether targets change between attempts.
    pub fn is_randomized(&self) -> bool {
        matches!(self, ServiceSource::Random { .. })
    }

    pub fn len(&self) -> usize {
        match self {
            ServiceSource::Random { ids } => ids.len(),
            ServiceSource::Loaded(specs) => specs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn random_services_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for i in 0..200 {
            let s = random_service(&format!("s{i}"), &mut rng);
            assert!(s.processing_time <= 10);
            assert!((100..=1000).contains(&s.client_latency));
            assert!(s.target.lat >= -90.0 && s.target.lat < 90.0);
            assert!((-180.0..=180.0).contains(&s.target.lng));
        }
    }

    #[test]
    fn loaded_targets_are_kept_and_gaps_filled() {
        let source = ServiceSource::Loaded(vec![
            ServiceSpec {
                id: "A".to_string(),
                location: Location::new(10.0, 20.0),
                processing_time: Some(4),
                client_latency: Some(250),
            },
            ServiceSpec {
                id: "B".to_string(),
                location: Location::new(-5.0, 1.5),
                processing_time: None,
                client_latency: None,
            },
        ]);
        let services = source.materialize(&mut StdRng::seed_from_u64(9));

        assert_eq!(services[0].processing_time, 4);
        assert_eq!(services[0].client_latency, 250);
        assert_eq!(services[1].target, Location::new(-5.0, 1.5));
        assert!((100..=1000).contains(&services[1].client_latency));
        assert!(!source.is_randomized());
    }

    #[test]
    fn random_source_keeps_ids_in_order() {
        let source = ServiceSource::Random {
            ids: vec!["x".to_string(), "y".to_string()],
        };
        let services = source.materialize(&mut StdRng::seed_from_u64(1));
        let ids: Vec<_> = services.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["x", "y"]);
        assert_eq!(source.len(), 2);
        assert!(source.is_randomized());
    }
}
