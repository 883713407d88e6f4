//! Integration tests for the placemap exploration engine
//!
//! These run whole sessions through the public API: an [`ExplorePage`] over a
//! generated catalog and a [`SimulatedMapLayer`] standing in for the browser
//! map.

use std::sync::Arc;

use itertools::Itertools;
use placemap::{
    BoundingBox, ExploreConfig, ExploreConfigBuilder, ExplorePage, FilterInput, FilterState,
    FilterValidator, GeospatialSearch, Highlight, LatLng, ListDisplay, Mode, PlaceSource,
    MapLayer, RawFilters, SearchError, SimulatedMapLayer, Strategy, ViewAction,
    data::{PlaceCatalog, PlaceRecord, PlaceTranslation, TestDataConfig, create_test_catalog},
    geo::{METERS_PER_DEGREE, haversine_m},
    polars::prelude::LazyFrame,
    sync::{Event, ListComponent},
};
use pretty_assertions::assert_eq;

const PARIS: LatLng = LatLng::new(48.8566, 2.3522);

fn setup_test_env() {
    let _ = placemap::init_logging(tracing::Level::WARN);
}

fn sample_catalog() -> Arc<PlaceCatalog> {
    Arc::new(create_test_catalog(&TestDataConfig::sample()).expect("sample catalog"))
}

fn large_catalog() -> Arc<PlaceCatalog> {
    Arc::new(create_test_catalog(&TestDataConfig::large()).expect("large catalog"))
}

fn validated(raw: &RawFilters) -> FilterState {
    FilterValidator::default()
        .validate(raw, Strategy::Throw)
        .expect("valid filters")
}

fn open(
    source: Arc<dyn PlaceSource>,
    config: ExploreConfig,
    params: &[(&str, &str)],
) -> ExplorePage<SimulatedMapLayer> {
    ExplorePage::open(source, config, SimulatedMapLayer::new(), params.iter().copied())
        .expect("page opens")
}

/// Two places due north of Paris, 40 km and 60 km away.
fn paris_ring_catalog() -> Arc<PlaceCatalog> {
    let north = |meters: f64| PARIS.lat + meters / METERS_PER_DEGREE;
    let places = vec![
        PlaceRecord::new(1, north(40_000.0), PARIS.lng).with_tags(["observatory"]),
        PlaceRecord::new(2, north(60_000.0), PARIS.lng).with_tags(["museum"]),
    ];
    let translations = vec![
        PlaceTranslation::new(1, "en", "Near"),
        PlaceTranslation::new(2, "en", "Far"),
    ];
    Arc::new(PlaceCatalog::from_records(&places, translations).expect("catalog"))
}

#[test]
fn test_scenario_a_proximity_radius() {
    setup_test_env();

    let page = open(
        paris_ring_catalog(),
        ExploreConfig::default(),
        &[
            ("mode", "proximity"),
            ("lat", "48.8566"),
            ("lng", "2.3522"),
            ("radius", "50000"),
        ],
    );

    let places = page.list().places();
    assert_eq!(places.len(), 1, "only the 40 km place is inside the radius");
    assert_eq!(places[0].id, 1);
    let distance = places[0].distance.expect("proximity rows carry a distance");
    assert!((distance - 40_000.0).abs() < 1.0, "distance was {distance}");
    assert_eq!(places[0].title.as_deref(), Some("Near"));

    let map_ids = page.map().coordinates().iter().map(|c| c.id).collect_vec();
    assert_eq!(map_ids, vec![1]);
    assert!(matches!(
        page.layer().actions().first(),
        Some(ViewAction::CenterOnLocation { radius: 50_000, .. })
    ));
}

#[test]
fn test_scenario_b_worldwide_tag() {
    setup_test_env();

    let catalog = sample_catalog();
    let search = GeospatialSearch::new(catalog.clone(), "en");
    let filters = validated(&RawFilters::worldwide(["nasa"], false));
    let page = search
        .for_list(&filters, &BoundingBox::WORLD, 200, None)
        .expect("list query");

    assert!(!page.places.is_empty());
    assert!(page.places.iter().all(|p| p.tags.iter().any(|t| t == "nasa")));
    assert!(page.places.iter().all(|p| p.distance.is_none()));
    let ids = page.places.iter().map(|p| p.id).collect_vec();
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "stable id order: {ids:?}");

    // The same filters through a full session.
    let session = open(
        catalog,
        ExploreConfig::default(),
        &[("mode", "worldwide"), ("tags", "nasa")],
    );
    let session_ids = session.list().places().iter().map(|p| p.id).collect_vec();
    assert_eq!(session_ids, ids[..session_ids.len()].to_vec());
    assert_eq!(session.layer().actions(), [ViewAction::ShowWorldView]);
}

#[test]
fn test_scenarios_c_and_d_view_actions() {
    let previous = validated(&RawFilters::proximity(1.0, 1.0, 1_000));
    let next = validated(&RawFilters::worldwide(["x"], false));
    assert_eq!(ViewAction::resolve(&previous, &next), ViewAction::ShowWorldView);

    let previous = validated(&RawFilters::worldwide(Vec::<String>::new(), false));
    let next = validated(&RawFilters {
        mode: Some("proximity".into()),
        ..RawFilters::default()
    });
    assert_eq!(ViewAction::resolve(&previous, &next), ViewAction::NoChange);
}

#[test]
fn test_scenario_e_repeated_bounds_never_duplicate_rows() {
    setup_test_env();

    let search = GeospatialSearch::new(large_catalog(), "en");
    let validator = FilterValidator::default();
    let mut list = ListComponent::new(
        search,
        validator.clone(),
        Arc::new(placemap::MessageCatalog::new()),
        "en",
        10,
        false,
        validator.default_filters(),
    );
    let filters = validated(&RawFilters::worldwide(["museum"], false)).to_component_data();
    let bounds = BoundingBox::new(60.0, -60.0, 120.0, -120.0).expect("bounds");
    let update = Event::UpdateListBounds {
        bounds,
        filters: Some(filters),
    };

    list.handle(&update);
    assert!(list.load_more());
    assert_eq!(list.places().len(), 20);
    list.handle(&update);

    let ids = list.places().iter().map(|p| p.id).collect_vec();
    assert_eq!(ids.len(), 10, "a bounds update resets to the first page");
    assert!(ids.iter().all_unique());
}

#[test]
fn test_cursor_pages_are_continuous() {
    setup_test_env();

    let search = GeospatialSearch::new(large_catalog(), "en");
    let bounds = BoundingBox::new(70.0, -70.0, 180.0, -180.0).expect("bounds");

    for raw in [
        RawFilters::worldwide(["esa", "planetarium"], false),
        RawFilters::proximity(PARIS.lat, PARIS.lng, 500_000),
    ] {
        let filters = validated(&raw);
        let expected = search
            .for_map(&filters, Some(&bounds))
            .expect("map query")
            .coordinates
            .iter()
            .map(|c| c.id)
            .collect_vec();
        assert!(!expected.is_empty());

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = search
                .for_list(&filters, &bounds, 7, cursor.as_deref())
                .expect("list page");
            seen.extend(page.places.iter().map(|p| p.id));
            if !page.has_more_pages {
                assert!(page.next_cursor.is_none());
                break;
            }
            cursor = page.next_cursor;
        }
        assert_eq!(seen, expected, "pages for {:?} skipped or repeated rows", filters.mode());
    }
}

#[test]
fn test_cursor_from_other_filters_restarts() {
    setup_test_env();

    let search = GeospatialSearch::new(large_catalog(), "en");
    let nasa = validated(&RawFilters::worldwide(["nasa"], false));
    let esa = validated(&RawFilters::worldwide(["esa"], false));

    let first = search
        .for_list(&nasa, &BoundingBox::WORLD, 5, None)
        .expect("first page");
    let stale = first.next_cursor.expect("more than one page");

    let restarted = search
        .for_list(&esa, &BoundingBox::WORLD, 5, Some(&stale))
        .expect("stale cursor is not an error");
    let fresh = search
        .for_list(&esa, &BoundingBox::WORLD, 5, None)
        .expect("first page");
    assert_eq!(restarted, fresh);

    let garbage = search
        .for_list(&esa, &BoundingBox::WORLD, 5, Some("not a cursor"))
        .expect("malformed cursor is not an error");
    assert_eq!(garbage, fresh);
}

#[test]
fn test_list_rows_stay_inside_the_box() {
    setup_test_env();

    let search = GeospatialSearch::new(large_catalog(), "en");
    let europe = BoundingBox::new(60.0, 35.0, 30.0, -10.0).expect("bounds");
    let pacific = BoundingBox::new(30.0, -30.0, -150.0, 150.0).expect("wrapping bounds");

    for bounds in [europe, pacific] {
        let filters = validated(&RawFilters::worldwide(
            ["museum", "observatory", "launch-site"],
            false,
        ));
        let page = search
            .for_list(&filters, &bounds, 200, None)
            .expect("list query");
        assert!(!page.places.is_empty(), "no places in {bounds:?}");
        for place in &page.places {
            assert!(
                bounds.contains(LatLng::new(place.latitude, place.longitude)),
                "place {} outside {bounds:?}",
                place.id
            );
        }
    }
}

#[test]
fn test_proximity_distances_non_decreasing() {
    setup_test_env();

    let search = GeospatialSearch::new(large_catalog(), "en");
    let filters = validated(&RawFilters::proximity(PARIS.lat, PARIS.lng, 500_000));
    let page = search
        .for_list(&filters, &BoundingBox::around(PARIS, 500_000.0), 200, None)
        .expect("list query");

    let distances = page
        .places
        .iter()
        .map(|p| p.distance.expect("distance"))
        .collect_vec();
    assert!(!distances.is_empty());
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    for place in &page.places {
        let expected = haversine_m(PARIS, LatLng::new(place.latitude, place.longitude));
        assert!((place.distance.unwrap_or_default() - expected).abs() < 1.0);
        assert!(expected <= 500_000.0);
    }
}

/// Point `distance_m` from `from` along `bearing_deg`, on the sphere.
fn destination(from: LatLng, bearing_deg: f64, distance_m: f64) -> LatLng {
    let delta = distance_m / placemap::geo::EARTH_RADIUS_M;
    let (phi, lambda) = (from.lat.to_radians(), from.lng.to_radians());
    let theta = bearing_deg.to_radians();
    let lat = (phi.sin() * delta.cos() + phi.cos() * delta.sin() * theta.cos()).asin();
    let lng = lambda
        + (theta.sin() * delta.sin() * phi.cos()).atan2(delta.cos() - phi.sin() * lat.sin());
    LatLng::new(lat.to_degrees(), placemap::geo::wrap_longitude(lng.to_degrees()))
}

#[test]
fn test_proximity_finds_circle_edge_at_high_latitudes() {
    setup_test_env();

    let radius_m = 500_000.0;
    for center in [LatLng::new(60.0, 20.0), LatLng::new(85.0, 0.0)] {
        // A ring just inside the radius, including the longitude extremes.
        let places = (0..180u32)
            .map(|i| {
                let edge = destination(center, f64::from(i) * 2.0, 0.999 * radius_m);
                PlaceRecord::new(i + 1, edge.lat, edge.lng).with_tags(["observatory"])
            })
            .collect_vec();
        let catalog = Arc::new(PlaceCatalog::from_records(&places, vec![]).expect("catalog"));
        let search = GeospatialSearch::new(catalog, "en");
        let filters = validated(&RawFilters::proximity(center.lat, center.lng, 500_000));

        let map = search.for_map(&filters, None).expect("map query");
        assert_eq!(map.count, 180, "map missed ring places around {center:?}");

        let world = BoundingBox::new(90.0, -90.0, 180.0, -180.0).expect("world bounds");
        let page = search
            .for_list(&filters, &world, 200, None)
            .expect("list query");
        let ids = page.places.iter().map(|p| p.id).sorted().collect_vec();
        assert_eq!(ids, (1..=180).collect_vec(), "list missed ring places around {center:?}");
    }
}

#[test]
fn test_load_more_is_noop_when_exhausted() {
    setup_test_env();

    let mut page = open(
        sample_catalog(),
        ExploreConfig::default(),
        &[("mode", "worldwide"), ("tags", "launch-site")],
    );
    assert!(!page.list().has_more_pages());
    let before = page.list().places().to_vec();
    let display = page.list().display();

    assert!(!page.load_more());
    assert_eq!(page.list().places(), before.as_slice());
    assert_eq!(page.list().display(), display);
}

#[test]
fn test_infinite_scroll_through_page() {
    setup_test_env();

    let config = ExploreConfigBuilder::small_catalog()
        .page_size(4)
        .build()
        .expect("config");
    let mut page = open(sample_catalog(), config, &[("mode", "worldwide"), ("tags", "museum")]);
    assert_eq!(page.list().places().len(), 4);

    while page.load_more() {}
    let ids = page.list().places().iter().map(|p| p.id).collect_vec();
    assert!(ids.len() > 4);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    assert!(!page.list().has_more_pages());
}

struct FailingSource;

impl PlaceSource for FailingSource {
    fn places(&self) -> placemap::search::Result<LazyFrame> {
        Err(SearchError::Unavailable("connection refused".into()))
    }

    fn place(&self, _id: u32) -> placemap::search::Result<Option<PlaceRecord>> {
        Err(SearchError::Unavailable("connection refused".into()))
    }

    fn translation(&self, _id: u32, _locale: &str) -> Option<PlaceTranslation> {
        None
    }

    fn len(&self) -> usize {
        10
    }

    fn known_tags(&self) -> Vec<String> {
        vec!["nasa".into()]
    }
}

#[test]
fn test_technical_failure_clears_list() {
    setup_test_env();

    let params = [("mode", "worldwide"), ("tags", "nasa")];
    let page = open(Arc::new(FailingSource), ExploreConfig::default(), &params);
    assert_eq!(
        page.list().display(),
        ListDisplay::Error {
            message: "Something went wrong while loading places. Please try again.".into()
        }
    );
    assert!(page.list().places().is_empty());
    assert!(!page.list().has_more_pages());
    assert!(page.map().coordinates().is_empty());
    assert_eq!(
        page.map().error(),
        Some("Something went wrong while loading places. Please try again.")
    );

    let debug = ExploreConfigBuilder::new().debug(true).build().expect("config");
    let page = open(Arc::new(FailingSource), debug, &params);
    let ListDisplay::Error { message } = page.list().display() else {
        panic!("expected error display");
    };
    assert!(message.contains("[unavailable:"), "message was {message}");
    let map_message = page.map().error().expect("map error message");
    assert!(map_message.contains("[unavailable:"), "message was {map_message}");
}

#[test]
fn test_url_round_trip() {
    setup_test_env();

    let params = [
        ("mode", "proximity"),
        ("lat", "48.8566"),
        ("lng", "2.3522"),
        ("radius", "25000"),
        ("address", "Paris, France"),
        ("tags", "museum,observatory"),
    ];
    let page = open(sample_catalog(), ExploreConfig::default(), &params);

    let shared = page.url_params();
    let reopened = FilterValidator::default().from_url_params(shared.iter().map(|(k, v)| (*k, v.as_str())));
    assert_eq!(&reopened, page.current_filters());
    assert_eq!(reopened.address(), Some("Paris, France"));
    assert_eq!(reopened.tags(), ["museum", "observatory"]);
}

#[test]
fn test_malformed_link_never_fails() {
    setup_test_env();

    let page = open(
        sample_catalog(),
        ExploreConfig::default(),
        &[
            ("mode", "galactic"),
            ("lat", "123"),
            ("lng", "2.35"),
            ("radius", "-4"),
            ("tags", "not a slug,,nasa,unknown-tag"),
        ],
    );
    let filters = page.current_filters();
    assert_eq!(filters.mode(), Mode::Proximity);
    assert_eq!(filters.coordinates(), Some(LatLng::new(90.0, 2.35)));
    assert_eq!(filters.radius(), 1_000);
    assert_eq!(filters.tags(), ["nasa"]);
}

#[test]
fn test_user_session_switches_modes() {
    setup_test_env();

    let mut page = open(sample_catalog(), ExploreConfig::default(), &[]);
    assert!(matches!(
        page.list().display(),
        ListDisplay::MinimalConditionsNotMet { .. }
    ));

    assert!(page.user_input(FilterInput::Location {
        latitude: Some(PARIS.lat),
        longitude: Some(PARIS.lng),
        address: Some("Paris".into()),
    }));
    let ids = page.list().places().iter().map(|p| p.id).collect_vec();
    assert!(ids.contains(&14) && ids.contains(&15), "Paris sites: {ids:?}");

    assert!(page.user_input(FilterInput::Radius(100_000)));
    assert!(matches!(
        page.layer().actions().last(),
        Some(ViewAction::AdjustZoom { radius: 100_000, .. })
    ));

    assert!(!page.user_input(FilterInput::Radius(10)));
    assert!(page.filters().error_message().is_some());
    assert_eq!(page.current_filters().radius(), 100_000);

    page.user_input(FilterInput::Mode("worldwide".into()));
    assert_eq!(page.layer().actions().last(), Some(&ViewAction::ShowWorldView));
    assert!(matches!(
        page.list().display(),
        ListDisplay::MinimalConditionsNotMet { .. }
    ));

    page.user_input(FilterInput::Featured(true));
    assert!(page.list().places().iter().all(|p| p.featured));
    assert!(!page.list().places().is_empty());
}

#[test]
fn test_returning_to_proximity_recenters_the_map() {
    setup_test_env();

    let mut page = open(
        sample_catalog(),
        ExploreConfig::default(),
        &[("mode", "proximity"), ("lat", "48.8566"), ("lng", "2.3522")],
    );
    page.user_input(FilterInput::Mode("worldwide".into()));
    assert_eq!(page.layer().actions().last(), Some(&ViewAction::ShowWorldView));

    page.user_input(FilterInput::Mode("proximity".into()));
    assert_eq!(page.layer().actions().last(), Some(&ViewAction::NoChange));
    assert!(page.current_filters().coordinates().is_none());
    assert!(matches!(
        page.list().display(),
        ListDisplay::MinimalConditionsNotMet { .. }
    ));

    assert!(page.user_input(FilterInput::Location {
        latitude: Some(PARIS.lat),
        longitude: Some(PARIS.lng),
        address: Some("Paris".into()),
    }));
    assert!(matches!(
        page.layer().actions().last(),
        Some(ViewAction::CenterOnLocation { .. })
    ));
    assert!(page.layer().viewport().contains(PARIS));
    assert!(!page.list().places().is_empty());
}

#[test]
fn test_scoped_session_follows_viewport() {
    setup_test_env();

    let mut page = open(
        large_catalog(),
        ExploreConfig::default(),
        &[("mode", "worldwide"), ("tags", "observatory")],
    );
    assert_eq!(page.map().strategy(), placemap::BoundsStrategy::Scoped);
    assert!(page.history().contains(&"coordinates-updated"));

    let europe = BoundingBox::new(60.0, 35.0, 30.0, -10.0).expect("bounds");
    page.pan_to(europe);

    assert!(!page.map().coordinates().is_empty());
    for coordinate in page.map().coordinates() {
        assert!(europe.contains(LatLng::new(coordinate.lat, coordinate.lng)));
    }
    for place in page.list().places() {
        assert!(europe.contains(LatLng::new(place.latitude, place.longitude)));
    }
    assert_eq!(page.layer().rendered(), page.map().coordinates());
    assert!(!page.gate().is_busy());
}

#[test]
fn test_marker_click_and_hover() {
    setup_test_env();

    let config = ExploreConfigBuilder::new().locale("fr").build().expect("config");
    let mut page = open(sample_catalog(), config, &[("mode", "worldwide"), ("tags", "nasa")]);

    page.click_marker(1);
    let preview = page.preview().expect("preview").as_ref().expect("found");
    assert_eq!(preview.title, "Kennedy Space Center");
    assert_eq!(page.highlight().current(), Highlight::Marker(1));

    // Synthetic places are only translated into English.
    let synthetic = page
        .list()
        .places()
        .iter()
        .find(|p| p.id > 20)
        .map(|p| p.id)
        .expect("a synthetic nasa place");
    page.click_marker(synthetic);
    assert_eq!(
        page.preview().expect("preview").as_ref().err().map(String::as_str),
        Some("Ce lieu n'est pas encore disponible dans votre langue.")
    );

    page.hover_list_item(Some(12));
    assert_eq!(page.list().highlighted(), Some(12));
    assert_ne!(page.highlight().current(), Highlight::None);
    page.hover_list_item(None);
    assert_eq!(page.highlight().current(), Highlight::None);
}
