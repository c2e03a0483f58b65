//! The fixed set of request fields.

/// Categorical request fields, in model order.
pub const CATEGORICAL_FEATURES: [&str; 6] = [
    "City Tax Rate Area",
    "Roll Year",
    "Property Use Type",
    "Zip Code.1",
    "Year Built",
    "Effective Year",
];

/// Numerical request fields, in model order.
pub const NUMERICAL_FEATURES: [&str; 11] = [
    "Number of Buildings",
    "Square Footage",
    "Number of Bedrooms",
    "Number of Bathrooms",
    "Number of Units",
    "num_nearby_arts_and_rec",
    "num_nearby_fire_stations",
    "num_nearby_hospitals",
    "num_nearby_physical_features",
    "num_nearby_transportation",
    "num_nearby_schools",
];

/// Ordered list of field names a request must carry.
///
/// Categorical fields come first, then numerical ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    categorical: Vec<String>,
    numerical: Vec<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::new(CATEGORICAL_FEATURES, NUMERICAL_FEATURES)
    }
}

impl FeatureSchema {
    pub fn new<C, N>(categorical: C, numerical: N) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        Self {
            categorical: categorical.into_iter().map(Into::into).collect(),
            numerical: numerical.into_iter().map(Into::into).collect(),
        }
    }

    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    pub fn numerical(&self) -> &[String] {
        &self.numerical
    }

    /// All field names in schema order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categorical
            .iter()
            .chain(&self.numerical)
            .map(String::as_str)
    }

    /// Position of `name` in schema order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names().position(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.categorical.len() + self.numerical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
