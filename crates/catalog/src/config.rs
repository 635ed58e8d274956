/// Catalog tunables.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Threshold given to new supplies (and their pool rows) when none is supplied.
    pub default_low_stock_threshold: u64,
    /// Name of the protected default location seeded at construction.
    pub default_location_name: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_low_stock_threshold: 0,
            default_location_name: "Unassigned".to_string(),
        }
    }
}

impl CatalogConfig {
    pub fn with_default_low_stock_threshold(mut self, threshold: u64) -> Self {
        self.default_low_stock_threshold = threshold;
        self
    }

    pub fn with_default_location_name(mut self, name: impl Into<String>) -> Self {
        self.default_location_name = name.into();
        self
    }
}
