use std::collections::HashMap;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;

/// Well-known `android:` attribute names and their fixed resource ids,
/// bundled into the binary. Needed when a mutation introduces an attribute
/// the document's resource map does not already carry.
const ANDROID_ATTRS_JSON: &str = include_str!("android-attrs.json");

static ATTR_IDS: OnceCell<AttrIds> = OnceCell::new();

/// The process-wide attribute-name to resource-id table.
pub fn attr_ids() -> Result<&'static AttrIds> {
    ATTR_IDS.get_or_try_init(AttrIds::load)
}

pub struct AttrIds {
    ids: HashMap<String, u32>,
}

impl AttrIds {
    fn load() -> Result<Self> {
        let ids = serde_json::from_str(ANDROID_ATTRS_JSON)
            .context("Parsing bundled attribute resource id table")?;
        Ok(AttrIds { ids })
    }

    /// The resource id for an attribute local name, or None if the table does
    /// not know it.
    pub fn get(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_loads_and_knows_common_attributes() -> Result<()> {
        let ids = attr_ids()?;
        assert_eq!(ids.get("versionCode"), Some(0x0101021b));
        assert_eq!(ids.get("versionName"), Some(0x0101021c));
        assert_eq!(ids.get("name"), Some(0x01010003));
        assert_eq!(ids.get("minSdkVersion"), Some(0x0101020c));
        assert_eq!(ids.get("definitely-not-an-attribute"), None);
        Ok(())
    }
}
