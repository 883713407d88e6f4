use itertools::{Itertools, izip};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{DataError, Result, columns};

/// A single place as stored in the catalog.
///
/// Tags are kept as slugs (`"launch-site"`, `"nasa"`); order is preserved for
/// display, duplicates are removed when the catalog is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    /// Stable identifier, assigned in creation order.
    pub id: u32,
    /// Latitude in decimal degrees (WGS84).
    pub latitude: f64,
    /// Longitude in decimal degrees (WGS84).
    pub longitude: f64,
    /// Rendered postal address, if known.
    #[serde(default)]
    pub address: Option<String>,
    /// Reference to the main photo (storage key or URL).
    #[serde(default)]
    pub main_photo: Option<String>,
    /// Tag slugs attached to the place.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Editorially featured place.
    #[serde(default)]
    pub featured: bool,
}

impl PlaceRecord {
    #[must_use]
    pub fn new(id: u32, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            latitude,
            longitude,
            address: None,
            main_photo: None,
            tags: Vec::new(),
            featured: false,
        }
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn with_photo(mut self, photo: impl Into<String>) -> Self {
        self.main_photo = Some(photo.into());
        self
    }

    #[must_use]
    pub const fn featured(mut self) -> Self {
        self.featured = true;
        self
    }

    /// Builds the places `DataFrame` for a set of records.
    ///
    /// Tags are flattened into the comma separated `tags` column; the derived
    /// `tag_key` column is added later by [`PlaceCatalog`](crate::PlaceCatalog).
    pub fn to_df(records: &[Self]) -> Result<DataFrame> {
        let (ids, latitudes, longitudes): (Vec<u32>, Vec<f64>, Vec<f64>) = records
            .iter()
            .map(|r| (r.id, r.latitude, r.longitude))
            .multiunzip();
        let addresses: Vec<Option<String>> = records.iter().map(|r| r.address.clone()).collect();
        let photos: Vec<Option<String>> = records.iter().map(|r| r.main_photo.clone()).collect();
        let tags: Vec<String> = records.iter().map(|r| r.tags.join(",")).collect();
        let featured: Vec<bool> = records.iter().map(|r| r.featured).collect();

        Ok(df!(
            columns::ID => ids,
            columns::LATITUDE => latitudes,
            columns::LONGITUDE => longitudes,
            columns::ADDRESS => addresses,
            columns::MAIN_PHOTO => photos,
            columns::TAGS => tags,
            columns::FEATURED => featured
        )?)
    }

    /// Reads records back out of a places `DataFrame`.
    pub fn from_df(df: &DataFrame) -> Result<Vec<Self>> {
        let cols = df.select(Self::field_names())?.take_columns();

        izip!(
            cols[0].u32()?,
            cols[1].f64()?,
            cols[2].f64()?,
            cols[3].str()?,
            cols[4].str()?,
            cols[5].str()?,
            cols[6].bool()?,
        )
        .enumerate()
        .map(
            |(row, (id, latitude, longitude, address, main_photo, tags, featured))| {
                Ok(Self {
                    id: id.ok_or(DataError::NullValue {
                        column: columns::ID,
                        row,
                    })?,
                    latitude: latitude.ok_or(DataError::NullValue {
                        column: columns::LATITUDE,
                        row,
                    })?,
                    longitude: longitude.ok_or(DataError::NullValue {
                        column: columns::LONGITUDE,
                        row,
                    })?,
                    address: address.map(ToString::to_string),
                    main_photo: main_photo.map(ToString::to_string),
                    tags: tags.map(split_tags).unwrap_or_default(),
                    featured: featured.unwrap_or(false),
                })
            },
        )
        .collect()
    }

    /// Returns the column names expected in `DataFrames` for this record type.
    #[must_use]
    pub fn field_names() -> Vec<&'static str> {
        vec![
            columns::ID,
            columns::LATITUDE,
            columns::LONGITUDE,
            columns::ADDRESS,
            columns::MAIN_PHOTO,
            columns::TAGS,
            columns::FEATURED,
        ]
    }
}

/// Splits a stored comma separated tag list into normalized slugs.
pub(crate) fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .unique()
        .collect()
}

/// Localized title and description of a place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceTranslation {
    pub place_id: u32,
    pub locale: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl PlaceTranslation {
    #[must_use]
    pub fn new(place_id: u32, locale: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            place_id,
            locale: locale.into(),
            title: title.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub(crate) fn from_df(df: &DataFrame) -> Result<Vec<Self>> {
        let cols = df
            .select(["place_id", "locale", "title", "description"])?
            .take_columns();
        let place_ids = cols[0].cast(&DataType::UInt32)?;

        izip!(
            place_ids.u32()?,
            cols[1].str()?,
            cols[2].str()?,
            cols[3].str()?
        )
        .enumerate()
        .map(|(row, (place_id, locale, title, description))| {
            Ok(Self {
                place_id: place_id.ok_or(DataError::NullValue {
                    column: "place_id",
                    row,
                })?,
                locale: locale
                    .ok_or(DataError::NullValue {
                        column: "locale",
                        row,
                    })?
                    .to_string(),
                title: title
                    .ok_or(DataError::NullValue {
                        column: "title",
                        row,
                    })?
                    .to_string(),
                description: description.map(ToString::to_string),
            })
        })
        .collect()
    }
}
