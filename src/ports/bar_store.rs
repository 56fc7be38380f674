//! Historical-bar persistence port trait.

use crate::domain::bar::Bar;
use crate::domain::error::TradewindError;

pub trait BarStorePort {
    /// Load a cached dataset; empty when the key is absent.
    fn load(&self, dataset_key: &str) -> Result<Vec<Bar>, TradewindError>;

    /// Save a dataset under a key, replacing any previous contents.
    /// Saving the same bars twice is a no-op.
    fn save(&self, dataset_key: &str, bars: &[Bar]) -> Result<(), TradewindError>;
}
