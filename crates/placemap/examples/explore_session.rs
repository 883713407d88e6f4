//! A complete exploration session
//!
//! This example walks through what a visitor does on the exploration page:
//! - Opening the page from a shared link
//! - Searching around a point and widening the radius
//! - Scrolling the list and clicking a marker
//! - Switching to a worldwide tag search and panning the map

use std::sync::Arc;

use placemap::{
    BoundingBox, ExploreConfigBuilder, ExplorePage, FilterInput, ListDisplay, SimulatedMapLayer,
    data::{TestDataConfig, create_test_catalog},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let catalog = create_test_catalog(&TestDataConfig::large())?;
    let config = ExploreConfigBuilder::large_catalog().page_size(5).build()?;

    // A shared link for a proximity search around Paris
    let link = [
        ("mode", "proximity"),
        ("lat", "48.8566"),
        ("lng", "2.3522"),
        ("radius", "200000"),
        ("address", "Paris, France"),
    ];
    let mut page = ExplorePage::open(Arc::new(catalog), config, SimulatedMapLayer::new(), link)?;
    println!("Opened with strategy {:?}", page.map().strategy());
    print_list(&page);

    println!("\nWidening the radius to 450 km:");
    page.user_input(FilterInput::Radius(450_000));
    println!("  camera: {:?}", page.layer().actions().last());
    print_list(&page);

    println!("\nScrolling:");
    while page.load_more() {
        println!("  loaded, {} rows", page.list().places().len());
    }

    if let Some(first) = page.list().places().first().map(|p| p.id) {
        page.click_marker(first);
        match page.preview() {
            Some(Ok(preview)) => println!("\nPreview of {}: {}", preview.id, preview.title),
            Some(Err(message)) => println!("\nPreview unavailable: {message}"),
            None => {}
        }
    }

    println!("\nWorldwide search for observatories:");
    page.user_input(FilterInput::Mode("worldwide".into()));
    page.user_input(FilterInput::ToggleTag("observatory".into()));
    print_list(&page);

    println!("\nPanning over the Americas:");
    page.pan_to(BoundingBox::new(60.0, -60.0, -30.0, -130.0)?);
    println!(
        "  {} map markers, {} clusters",
        page.clusterer().markers().len(),
        page.clusterer().clusters().len()
    );
    print_list(&page);

    if let Some(message) = page.filters().error_message() {
        println!("Filter error: {message}");
    }
    println!("\nShare link: {:?}", page.url_params());
    println!("Events routed: {}", page.history().len());
    Ok(())
}

fn print_list(page: &ExplorePage<SimulatedMapLayer>) {
    match page.list().display() {
        ListDisplay::Results {
            count,
            has_more_pages,
        } => {
            println!("  {count} places (more: {has_more_pages})");
            for place in page.list().places() {
                println!(
                    "    {} {} {}",
                    place.id,
                    place.title.as_deref().unwrap_or("-"),
                    place
                        .distance
                        .map_or_else(String::new, |d| format!("{:.1} km", d / 1000.0))
                );
            }
        }
        ListDisplay::Pending => println!("  waiting for the map"),
        ListDisplay::MinimalConditionsNotMet { message }
        | ListDisplay::NoResults { message }
        | ListDisplay::Error { message } => println!("  {message}"),
    }
}
