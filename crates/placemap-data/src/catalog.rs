use std::{collections::BTreeMap, path::Path};

use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use polars::prelude::*;
use tracing::{info, instrument, warn};

use crate::{
    DataError, Result,
    records::{PlaceRecord, PlaceTranslation, split_tags},
};

/// Column names of the places `DataFrame`.
pub mod columns {
    pub const ID: &str = "id";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const ADDRESS: &str = "address";
    pub const MAIN_PHOTO: &str = "main_photo";
    pub const TAGS: &str = "tags";
    pub const FEATURED: &str = "featured";
    /// Derived `",slug-a,slug-b,"` column used for literal tag membership tests.
    pub const TAG_KEY: &str = "tag_key";
    /// Computed per query in proximity mode.
    pub const DISTANCE: &str = "distance";
}

const PLACES_CSV_SCHEMA: [(PlSmallStr, DataType); 7] = [
    (PlSmallStr::from_static(columns::ID), DataType::UInt32),
    (PlSmallStr::from_static(columns::LATITUDE), DataType::Float64),
    (PlSmallStr::from_static(columns::LONGITUDE), DataType::Float64),
    (PlSmallStr::from_static(columns::ADDRESS), DataType::String),
    (PlSmallStr::from_static(columns::MAIN_PHOTO), DataType::String),
    (PlSmallStr::from_static(columns::TAGS), DataType::String),
    (PlSmallStr::from_static(columns::FEATURED), DataType::Boolean),
];

const TRANSLATIONS_CSV_SCHEMA: [(PlSmallStr, DataType); 4] = [
    (PlSmallStr::from_static("place_id"), DataType::UInt32),
    (PlSmallStr::from_static("locale"), DataType::String),
    (PlSmallStr::from_static("title"), DataType::String),
    (PlSmallStr::from_static("description"), DataType::String),
];

/// Summary figures computed once when the catalog is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub place_count: usize,
    pub featured_count: usize,
    /// Number of places per tag slug.
    pub tag_counts: BTreeMap<String, usize>,
}

impl CatalogStats {
    /// Every tag slug present in the catalog.
    pub fn known_tags(&self) -> impl Iterator<Item = &str> {
        self.tag_counts.keys().map(String::as_str)
    }
}

/// Read-only store of places and their translations.
#[derive(Debug, Clone)]
pub struct PlaceCatalog {
    places: DataFrame,
    translations: HashMap<(u32, String), PlaceTranslation>,
    stats: CatalogStats,
}

impl PlaceCatalog {
    /// Builds a catalog from in-memory records.
    pub fn from_records(
        records: &[PlaceRecord],
        translations: Vec<PlaceTranslation>,
    ) -> Result<Self> {
        Self::from_frames(PlaceRecord::to_df(records)?, translations)
    }

    /// Builds a catalog from a places frame.
    ///
    /// The frame must carry every column of [`PlaceRecord::field_names`]; they
    /// are cast to the canonical types, tags are normalized and the derived
    /// `tag_key` column is added.
    #[instrument(name = "Build PlaceCatalog", level = "info", skip_all)]
    pub fn from_frames(places: DataFrame, translations: Vec<PlaceTranslation>) -> Result<Self> {
        let names = places.get_column_names_str();
        for required in PlaceRecord::field_names() {
            if !names.contains(&required) {
                return Err(DataError::MissingColumn(required.to_string()));
            }
        }

        let mut places = places
            .lazy()
            .select([
                col(columns::ID).cast(DataType::UInt32),
                col(columns::LATITUDE).cast(DataType::Float64),
                col(columns::LONGITUDE).cast(DataType::Float64),
                col(columns::ADDRESS).cast(DataType::String),
                col(columns::MAIN_PHOTO).cast(DataType::String),
                col(columns::TAGS).cast(DataType::String).fill_null(lit("")),
                col(columns::FEATURED)
                    .cast(DataType::Boolean)
                    .fill_null(lit(false)),
            ])
            .sort([columns::ID], SortMultipleOptions::default())
            .collect()?;

        let stats = Self::check_rows(&places)?;

        let (tags, tag_keys): (Vec<String>, Vec<String>) = places
            .column(columns::TAGS)?
            .str()?
            .into_iter()
            .map(|raw| {
                let slugs = raw.map(split_tags).unwrap_or_default();
                (slugs.join(","), format!(",{},", slugs.join(",")))
            })
            .unzip();
        places.with_column(Series::new(columns::TAGS.into(), tags))?;
        places.with_column(Series::new(columns::TAG_KEY.into(), tag_keys))?;

        let mut lookup = HashMap::with_capacity(translations.len());
        for translation in translations {
            let key = (translation.place_id, translation.locale.clone());
            if lookup.insert(key, translation).is_some() {
                warn!("Duplicate place translation replaced by a later entry");
            }
        }

        info!(
            places = stats.place_count,
            featured = stats.featured_count,
            tags = stats.tag_counts.len(),
            translations = lookup.len(),
            "Place catalog ready"
        );

        Ok(Self {
            places,
            translations: lookup,
            stats,
        })
    }

    /// Validates ids and coordinates and tallies the catalog statistics.
    fn check_rows(places: &DataFrame) -> Result<CatalogStats> {
        let ids = places.column(columns::ID)?.u32()?;
        let latitudes = places.column(columns::LATITUDE)?.f64()?;
        let longitudes = places.column(columns::LONGITUDE)?.f64()?;
        let tags = places.column(columns::TAGS)?.str()?;
        let featured = places.column(columns::FEATURED)?.bool()?;

        let mut seen = HashSet::with_capacity(places.height());
        let mut stats = CatalogStats {
            place_count: places.height(),
            ..CatalogStats::default()
        };

        for (row, (id, latitude, longitude, tags, featured)) in itertools::izip!(
            ids.into_iter(),
            latitudes.into_iter(),
            longitudes.into_iter(),
            tags.into_iter(),
            featured.into_iter()
        )
        .enumerate()
        {
            let id = id.ok_or(DataError::NullValue {
                column: columns::ID,
                row,
            })?;
            if !seen.insert(id) {
                return Err(DataError::DuplicatePlaceId(id));
            }
            let latitude = latitude.unwrap_or(f64::NAN);
            let longitude = longitude.unwrap_or(f64::NAN);
            if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                return Err(DataError::InvalidCoordinates {
                    id,
                    latitude,
                    longitude,
                });
            }
            if featured == Some(true) {
                stats.featured_count += 1;
            }
            for slug in tags.map(split_tags).unwrap_or_default() {
                *stats.tag_counts.entry(slug).or_default() += 1;
            }
        }

        Ok(stats)
    }

    /// Loads places (and optionally translations) from CSV files with headers.
    #[instrument(name = "Load PlaceCatalog from CSV", level = "info", skip_all)]
    pub fn load_csv(
        places_path: impl AsRef<Path>,
        translations_path: Option<&Path>,
    ) -> Result<Self> {
        let t_load = std::time::Instant::now();
        let places = LazyCsvReader::new(places_path.as_ref())
            .with_has_header(true)
            .with_schema(Some(Schema::from_iter(PLACES_CSV_SCHEMA).into()))
            .finish()?
            .collect()?;

        let translations = match translations_path {
            Some(path) => {
                let df = LazyCsvReader::new(path)
                    .with_has_header(true)
                    .with_schema(Some(Schema::from_iter(TRANSLATIONS_CSV_SCHEMA).into()))
                    .finish()?
                    .collect()?;
                PlaceTranslation::from_df(&df)?
            }
            None => Vec::new(),
        };

        info!(elapsed = ?t_load.elapsed(), rows = places.height(), "Read places CSV");
        Self::from_frames(places, translations)
    }

    /// Loads places from a parquet file written by [`Self::write_parquet`].
    #[instrument(name = "Load PlaceCatalog from parquet", level = "info", skip_all)]
    pub fn load_parquet(
        places_path: impl AsRef<Path>,
        translations: Vec<PlaceTranslation>,
    ) -> Result<Self> {
        let places = LazyFrame::scan_parquet(places_path.as_ref(), ScanArgsParquet::default())?
            .collect()?;
        Self::from_frames(places, translations)
    }

    /// Loads places and translations from a JSON document
    /// `{"places": [...], "translations": [...]}`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        #[derive(serde::Deserialize)]
        struct Document {
            places: Vec<PlaceRecord>,
            #[serde(default)]
            translations: Vec<PlaceTranslation>,
        }

        let file = std::fs::File::open(path.as_ref())?;
        let doc: Document = serde_json::from_reader(std::io::BufReader::new(file))?;
        Self::from_records(&doc.places, doc.translations)
    }

    /// Writes the stored place columns to parquet.
    pub fn write_parquet(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.places.select(PlaceRecord::field_names())?;
        let mut file = std::fs::File::create(path.as_ref())?;
        ParquetWriter::new(&mut file).finish(&mut df)?;
        Ok(())
    }

    /// Lazy view over all places, including the derived `tag_key` column.
    #[must_use]
    pub fn lazy(&self) -> LazyFrame {
        self.places.clone().lazy()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stats.place_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.place_count == 0
    }

    #[must_use]
    pub const fn stats(&self) -> &CatalogStats {
        &self.stats
    }

    /// Looks up a single place by id.
    pub fn place(&self, id: u32) -> Result<Option<PlaceRecord>> {
        let df = self
            .lazy()
            .filter(col(columns::ID).eq(lit(id)))
            .collect()?;
        Ok(PlaceRecord::from_df(&df)?.into_iter().next())
    }

    /// Translation of a place for the given locale, if one exists.
    #[must_use]
    pub fn translation(&self, place_id: u32, locale: &str) -> Option<&PlaceTranslation> {
        self.translations.get(&(place_id, locale.to_string()))
    }
}
