//! Categories: named volume / reverb buses
//!
//! Categories are flat. Track instances hold a [`CategoryIndex`] and read the
//! category's volume every time they recompose, so a change made here is heard
//! by every playing track on the next query.

use cf_core::clamp_volume_db;
use std::collections::HashMap;

/// Index into a [`CategoryTable`]
pub type CategoryIndex = usize;

/// Index of the always-present default category
pub const DEFAULT_CATEGORY: CategoryIndex = 0;

/// Name of the default category
pub const DEFAULT_CATEGORY_NAME: &str = "Default";

/// Named volume / reverb bus
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    name: String,
    volume_db: f32,
    reverb_volume_db: f32,
}

impl Category {
    /// Create a category at 0 dB
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            volume_db: 0.0,
            reverb_volume_db: 0.0,
        }
    }

    /// Builder: initial volume (clamped)
    pub fn with_volume(mut self, db: f32) -> Self {
        self.set_volume(db);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Volume in dB
    pub fn volume(&self) -> f32 {
        self.volume_db
    }

    /// Reverb send volume in dB
    pub fn reverb_volume(&self) -> f32 {
        self.reverb_volume_db
    }

    /// Set volume; out-of-range input is clamped to [-96, 6] dB
    pub fn set_volume(&mut self, db: f32) {
        self.volume_db = clamp_volume_db(db);
    }

    /// Set reverb send volume; out-of-range input is clamped to [-96, 6] dB
    pub fn set_reverb_volume(&mut self, db: f32) {
        self.reverb_volume_db = clamp_volume_db(db);
    }
}

/// All categories, addressable by index and by name
#[derive(Debug, Clone)]
pub struct CategoryTable {
    categories: Vec<Category>,
    by_name: HashMap<String, CategoryIndex>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        let mut table = Self {
            categories: Vec::new(),
            by_name: HashMap::new(),
        };
        table.add(Category::new(DEFAULT_CATEGORY_NAME));
        table
    }
}

impl CategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category, returning its index
    ///
    /// A name that already exists keeps its original index and settings.
    pub fn add(&mut self, category: Category) -> CategoryIndex {
        if let Some(&index) = self.by_name.get(category.name()) {
            return index;
        }
        let index = self.categories.len();
        self.by_name.insert(category.name().to_string(), index);
        self.categories.push(category);
        index
    }

    pub fn get(&self, index: CategoryIndex) -> Option<&Category> {
        self.categories.get(index)
    }

    pub fn get_mut(&mut self, index: CategoryIndex) -> Option<&mut Category> {
        self.categories.get_mut(index)
    }

    pub fn index_of(&self, name: &str) -> Option<CategoryIndex> {
        self.by_name.get(name).copied()
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut Category> {
        let index = self.index_of(name)?;
        self.categories.get_mut(index)
    }

    /// Live volume of a category (0 dB for an unknown index)
    #[inline]
    pub fn volume(&self, index: CategoryIndex) -> f32 {
        self.get(index).map_or(0.0, Category::volume)
    }

    /// Live reverb send volume of a category (0 dB for an unknown index)
    #[inline]
    pub fn reverb_volume(&self, index: CategoryIndex) -> f32 {
        self.get(index).map_or(0.0, Category::reverb_volume)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Never true: the default category always exists
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }
}
