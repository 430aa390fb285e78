//! Reference places resolved from the external place catalog.
//!
//! Places are immutable once loaded. Airports carry an IATA code and point at
//! their city through `parent_id`; cities and countries have no IATA code.
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Bitwise key used to collapse candidates sharing a coordinate.
    /// Negative zero is folded into positive zero.
    #[must_use]
    pub fn dedup_key(self) -> (u64, u64) {
        ((self.lat + 0.0).to_bits(), (self.lng + 0.0).to_bits())
    }
}

/// A place from the catalog (airport, city, or country).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iata: Option<String>,
    pub name: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub country_entity_id: String,
}

impl Place {
    /// Entity id of the city this place belongs to.
    ///
    /// Airports resolve to their parent city so that landing at LHR counts as
    /// returning to a London origin recorded as LGW or as the city itself.
    #[must_use]
    pub fn city_id(&self) -> &str {
        if self.iata.is_some() && !self.parent_id.is_empty() {
            &self.parent_id
        } else {
            &self.entity_id
        }
    }

    #[must_use]
    pub fn same_city(&self, other: &Place) -> bool {
        self.city_id() == other.city_id()
    }

    /// Identifiers directly attached to this place, nearest first.
    pub fn direct_ancestry(&self) -> impl Iterator<Item = &str> {
        [
            self.entity_id.as_str(),
            self.parent_id.as_str(),
            self.country_entity_id.as_str(),
        ]
        .into_iter()
        .filter(|id| !id.is_empty())
    }

    /// Whether `region_id` appears in this place's ancestry chain.
    ///
    /// The chain starts with the directly attached ids and, when a catalog is
    /// available, continues through every catalog parent.
    #[must_use]
    pub fn in_region(&self, region_id: &str, catalog: Option<&dyn PlaceCatalog>) -> bool {
        if self.direct_ancestry().any(|id| id == region_id) {
            return true;
        }
        catalog.is_some_and(|catalog| {
            catalog
                .ancestry(&self.parent_id)
                .iter()
                .any(|id| id == region_id)
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate place id: {0}")]
    Duplicate(String),
    #[error("unknown place id: {0}")]
    Unknown(String),
}

/// Lookup interface over the external place catalog.
pub trait PlaceCatalog {
    /// Resolve a place by entity id.
    fn place(&self, entity_id: &str) -> Option<&Place>;

    /// Entity ids from `entity_id` up through its parents, nearest first.
    ///
    /// Walking stops at unknown ids, empty parents, and cycles.
    fn ancestry(&self, entity_id: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = entity_id.to_string();
        while !cursor.is_empty() && seen.insert(cursor.clone()) {
            chain.push(cursor.clone());
            let Some(place) = self.place(&cursor) else {
                break;
            };
            if !place.country_entity_id.is_empty() && place.parent_id.is_empty() {
                chain.push(place.country_entity_id.clone());
            }
            cursor.clone_from(&place.parent_id);
        }
        chain
    }
}

/// Catalog held entirely in memory, typically parsed from a JSON asset.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    places: HashMap<String, Place>,
}

impl InMemoryCatalog {
    /// Build a catalog, rejecting duplicate entity ids.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Duplicate`] when two places share an id.
    pub fn new(places: impl IntoIterator<Item = Place>) -> Result<Self, CatalogError> {
        let mut map = HashMap::new();
        for place in places {
            if map.contains_key(&place.entity_id) {
                return Err(CatalogError::Duplicate(place.entity_id));
            }
            map.insert(place.entity_id.clone(), place);
        }
        Ok(Self { places: map })
    }

    /// Parse a JSON array of places.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or ids repeat.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let places: Vec<Place> = serde_json::from_str(json)?;
        Self::new(places)
    }

    /// Resolve a place, failing on unknown ids.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Unknown`] if the id is not in the catalog.
    pub fn require(&self, entity_id: &str) -> Result<&Place, CatalogError> {
        self.places
            .get(entity_id)
            .ok_or_else(|| CatalogError::Unknown(entity_id.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.places.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }
}

impl PlaceCatalog for InMemoryCatalog {
    fn place(&self, entity_id: &str) -> Option<&Place> {
        self.places.get(entity_id)
    }
}
