//! Category metadata passed explicitly to every component that needs it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VocEvalError};

/// Immutable two-way mapping between category names and dense ids `0..len`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CategoryCatalog {
    names: Vec<String>,
    ids: HashMap<String, usize>,
}

impl CategoryCatalog {
    /// Build a catalog; ids follow the order of `names`.
    ///
    /// # Errors
    ///
    /// Returns [`VocEvalError::InvalidSettings`] for an empty list or duplicate names.
    ///
    /// # Example
    ///
    /// ```
    /// use voc_eval::category::CategoryCatalog;
    ///
    /// let catalog = CategoryCatalog::new(["cat", "dog"]).unwrap();
    /// assert_eq!(catalog.id("dog").unwrap(), 1);
    /// assert_eq!(catalog.name(0).unwrap(), "cat");
    /// assert!(catalog.id("horse").is_err());
    /// ```
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(VocEvalError::InvalidSettings(
                "category catalog must contain at least one category".to_string(),
            ));
        }

        let mut ids = HashMap::with_capacity(names.len());
        for (id, name) in names.iter().enumerate() {
            if ids.insert(name.clone(), id).is_some() {
                return Err(VocEvalError::InvalidSettings(format!(
                    "duplicate category name '{name}'"
                )));
            }
        }

        Ok(Self { names, ids })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn id(&self, name: &str) -> Result<usize> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| VocEvalError::UnknownCategory(format!("no category named '{name}'")))
    }

    pub fn name(&self, id: usize) -> Result<&str> {
        self.names
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| VocEvalError::UnknownCategory(format!("no category with id {id}")))
    }

    /// Probability-mass vector with all mass on `id`.
    pub fn one_hot(&self, id: usize) -> Result<Vec<f32>> {
        one_hot(id, self.len())
    }
}

impl TryFrom<Vec<String>> for CategoryCatalog {
    type Error = VocEvalError;

    fn try_from(names: Vec<String>) -> Result<Self> {
        Self::new(names)
    }
}

impl From<CategoryCatalog> for Vec<String> {
    fn from(catalog: CategoryCatalog) -> Self {
        catalog.names
    }
}

/// One-hot vector of length `size` with `1.0` at `id`.
pub fn one_hot(id: usize, size: usize) -> Result<Vec<f32>> {
    if id >= size {
        return Err(VocEvalError::UnknownCategory(format!(
            "category id {id} out of range for {size} categories"
        )));
    }
    let mut result = vec![0.0; size];
    result[id] = 1.0;
    Ok(result)
}
