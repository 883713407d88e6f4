use tracing::info;

use super::{
    PlaceCatalog, Result,
    records::{PlaceRecord, PlaceTranslation},
};

/// Configuration for test catalog generation
#[derive(Debug, Clone)]
pub struct TestDataConfig {
    /// Total number of places to generate
    pub place_rows: usize,
    /// Whether to start from the list of real space sites
    pub realistic_data: bool,
    /// Every n-th synthetic place is marked as featured (0 disables)
    pub featured_every: usize,
    /// Locales for which translations are generated
    pub locales: Vec<&'static str>,
}

impl Default for TestDataConfig {
    fn default() -> Self {
        Self {
            place_rows: 60,
            realistic_data: true,
            featured_every: 7,
            locales: vec!["en", "fr"],
        }
    }
}

impl TestDataConfig {
    /// Minimal data for unit tests
    pub fn minimal() -> Self {
        Self {
            place_rows: 3,
            realistic_data: false,
            featured_every: 0,
            locales: vec!["en"],
        }
    }

    /// Sample data for integration tests
    pub fn sample() -> Self {
        Self::default()
    }

    /// Enough places to switch a session to bounding-box scoped queries
    pub fn large() -> Self {
        Self {
            place_rows: 1_200,
            ..Self::default()
        }
    }
}

/// Real launch sites, agencies and museums used as the realistic base.
const SPACE_SITES: [(&str, f64, f64, &str, &str, bool); 20] = [
    ("Kennedy Space Center", 28.5729, -80.6490, "Merritt Island, FL, USA", "nasa,launch-site,museum", true),
    ("Baikonur Cosmodrome", 45.9650, 63.3050, "Baikonur, Kazakhstan", "roscosmos,launch-site", true),
    ("Guiana Space Centre", 5.2360, -52.7690, "Kourou, French Guiana", "esa,cnes,launch-site", true),
    ("Cité de l'espace", 43.5866, 1.4934, "Toulouse, France", "cnes,museum,planetarium", false),
    ("Vandenberg Space Force Base", 34.7420, -120.5724, "Lompoc, CA, USA", "launch-site", false),
    ("Tanegashima Space Center", 30.4000, 130.9700, "Minamitane, Japan", "jaxa,launch-site", false),
    ("Jiuquan Satellite Launch Center", 40.9600, 100.2900, "Ejin Banner, China", "cnsa,launch-site", false),
    ("Satish Dhawan Space Centre", 13.7200, 80.2300, "Sriharikota, India", "isro,launch-site", false),
    ("Plesetsk Cosmodrome", 62.9300, 40.5700, "Mirny, Russia", "roscosmos,launch-site", false),
    ("European Space Operations Centre", 49.8710, 8.6220, "Darmstadt, Germany", "esa", false),
    ("ESTEC", 52.2180, 4.4200, "Noordwijk, Netherlands", "esa,museum", false),
    ("National Air and Space Museum", 38.8880, -77.0200, "Washington, DC, USA", "nasa,museum", true),
    ("Johnson Space Center", 29.5593, -95.0900, "Houston, TX, USA", "nasa,museum", false),
    ("Cité des sciences et de l'industrie", 48.8957, 2.3879, "Paris, France", "museum,planetarium", false),
    ("Observatoire de Paris", 48.8365, 2.3364, "Paris, France", "observatory", false),
    ("Star City", 55.8780, 38.1100, "Zvyozdny gorodok, Russia", "roscosmos,museum", false),
    ("Rocket Lab Launch Complex 1", -39.2600, 177.8600, "Mahia Peninsula, New Zealand", "launch-site", false),
    ("Wallops Flight Facility", 37.9400, -75.4700, "Wallops Island, VA, USA", "nasa,launch-site", false),
    ("Arecibo Observatory", 18.3440, -66.7500, "Arecibo, Puerto Rico", "observatory", false),
    ("Paranal Observatory", -24.6270, -70.4040, "Antofagasta, Chile", "eso,observatory", true),
];

const SYNTHETIC_TAGS: [&str; 6] = ["museum", "observatory", "planetarium", "nasa", "esa", "launch-site"];

/// Small deterministic generator so test catalogs are identical across runs.
struct Lcg(u64);

impl Lcg {
    fn next_unit(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 11) as f64) / ((1u64 << 53) as f64)
    }
}

/// Generates the places and translations described by `config`.
pub fn create_test_records(config: &TestDataConfig) -> (Vec<PlaceRecord>, Vec<PlaceTranslation>) {
    info!("Creating test data with config: {:?}", config);

    let mut places = Vec::with_capacity(config.place_rows);
    let mut translations = Vec::new();

    if config.realistic_data {
        for (i, (title, lat, lng, address, tags, featured)) in
            SPACE_SITES.iter().take(config.place_rows).enumerate()
        {
            let id = i as u32 + 1;
            let mut record = PlaceRecord::new(id, *lat, *lng)
                .with_address(*address)
                .with_photo(format!("photos/{id}/main.jpg"))
                .with_tags(tags.split(','));
            if *featured {
                record = record.featured();
            }
            places.push(record);
            for locale in &config.locales {
                translations.push(
                    PlaceTranslation::new(id, *locale, *title)
                        .with_description(format!("{title} ({locale})")),
                );
            }
        }
    }

    let mut rng = Lcg(0x5eed_0f_5ace);
    while places.len() < config.place_rows {
        let id = places.len() as u32 + 1;
        let latitude = rng.next_unit().mul_add(140.0, -70.0);
        let longitude = rng.next_unit().mul_add(360.0, -180.0);
        let tag = SYNTHETIC_TAGS[id as usize % SYNTHETIC_TAGS.len()];
        let mut record = PlaceRecord::new(id, latitude, longitude).with_tags([tag]);
        if config.featured_every > 0 && id as usize % config.featured_every == 0 {
            record = record.featured();
        }
        places.push(record);
        // Synthetic places are only translated into the first locale.
        if let Some(locale) = config.locales.first() {
            translations.push(PlaceTranslation::new(id, *locale, format!("Place {id}")));
        }
    }

    (places, translations)
}

/// Builds an in-memory catalog from generated test data.
pub fn create_test_catalog(config: &TestDataConfig) -> Result<PlaceCatalog> {
    let (places, translations) = create_test_records(config);
    PlaceCatalog::from_records(&places, translations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let catalog = create_test_catalog(&TestDataConfig::minimal()).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.stats().featured_count, 0);
    }

    #[test]
    fn test_sample_config_contains_real_sites() {
        let catalog = create_test_catalog(&TestDataConfig::sample()).unwrap();
        assert_eq!(catalog.len(), 60);
        assert!(catalog.stats().featured_count >= 5);
        assert_eq!(
            catalog.translation(1, "fr").map(|t| t.title.as_str()),
            Some("Kennedy Space Center")
        );
        // Synthetic places only carry the first locale.
        assert!(catalog.translation(30, "fr").is_none());
        assert!(catalog.translation(30, "en").is_some());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let (a, _) = create_test_records(&TestDataConfig::sample());
        let (b, _) = create_test_records(&TestDataConfig::sample());
        assert_eq!(a, b);
    }

    #[test]
    fn test_generated_coordinates_are_valid() {
        let (places, _) = create_test_records(&TestDataConfig::large());
        assert_eq!(places.len(), 1_200);
        assert!(places.iter().all(|p| (-90.0..=90.0).contains(&p.latitude)
            && (-180.0..=180.0).contains(&p.longitude)));
    }
}
