use std::{borrow::Cow, sync::OnceLock};

use ahash::AHashMap;
use regex::Regex;

use crate::bsp::textures::StringTable;

/// Material used by faces without texture information.
pub const DEFAULT_MATERIAL: &str = "Material";

/// `_<int>_<int>_<int>` runs, ints optionally negative.
fn coordinate_runs() -> Option<&'static Regex> {
    static RUNS: OnceLock<Option<Regex>> = OnceLock::new();
    RUNS.get_or_init(|| Regex::new(r"_-?\d+_-?\d+_-?\d+").ok()).as_ref()
}

/// Drop the final extension of the last path component, if it has one.
fn strip_extension(name: &str) -> &str {
    let file_start = name.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let file = &name[file_start..];
    match file.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < file.len() => &name[..file_start + dot],
        _ => name,
    }
}

/// Material name with cubemap-patched coordinates removed.
///
/// Patched materials are named `<material>_<x>_<y>_<z>`. Every such run is removed, and if
/// anything was removed the final extension is dropped too. Missing or empty names give
/// [`DEFAULT_MATERIAL`].
pub fn fix_material_name(name: Option<&str>) -> String {
    let name = match name {
        Some(name) if !name.is_empty() => name,
        _ => return DEFAULT_MATERIAL.to_owned(),
    };

    let Some(runs) = coordinate_runs() else {
        return name.to_owned();
    };
    match runs.replace_all(name, "") {
        Cow::Borrowed(_) => name.to_owned(),
        Cow::Owned(fixed) => strip_extension(&fixed).to_owned(),
    }
}

/// Material slots of one mesh.
///
/// Slots are keyed by fixed name, so every cubemap-patched variant of a material shares
/// one slot. Lookups by texture name id are cached.
#[derive(Debug, Default)]
pub struct MaterialSlots {
    names: Vec<String>,
    slots: AHashMap<String, u32>,
    by_name_id: AHashMap<i32, u32>,
}

impl MaterialSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for the texture name `name_id`, or for [`DEFAULT_MATERIAL`] when `None`.
    pub fn slot(&mut self, strings: &StringTable, name_id: Option<i32>) -> u32 {
        let Some(name_id) = name_id else {
            return self.slot_for_name(DEFAULT_MATERIAL.to_owned());
        };
        if let Some(&slot) = self.by_name_id.get(&name_id) {
            return slot;
        }
        let slot = self.slot_for_name(fix_material_name(Some(strings.get(name_id))));
        self.by_name_id.insert(name_id, slot);
        slot
    }

    fn slot_for_name(&mut self, name: String) -> u32 {
        if let Some(&slot) = self.slots.get(&name) {
            return slot;
        }
        let slot = self.names.len() as u32;
        self.slots.insert(name.clone(), slot);
        self.names.push(name);
        slot
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixes_patched_names() {
        assert_eq!(fix_material_name(Some("brick_-4_8_0")), "brick");
        assert_eq!(fix_material_name(Some("brick")), "brick");
        assert_eq!(
            fix_material_name(Some("maps/c17/concrete/wall_12_-340_96")),
            "maps/c17/concrete/wall"
        );
        assert_eq!(fix_material_name(Some("a_1_2_3b_4_5_6.vmt")), "ab");
        // extensions only go when something was removed
        assert_eq!(fix_material_name(Some("glass.vmt")), "glass.vmt");
        assert_eq!(fix_material_name(Some("glass_1_2_3.vmt")), "glass");
        // not a full run
        assert_eq!(fix_material_name(Some("metal_1_2")), "metal_1_2");
        assert_eq!(fix_material_name(Some("metal_1_2_x")), "metal_1_2_x");
        // any decimal digit counts
        assert_eq!(fix_material_name(Some("brick_\u{661}_-\u{662}_\u{663}")), "brick");

        assert_eq!(fix_material_name(None), DEFAULT_MATERIAL);
        assert_eq!(fix_material_name(Some("")), DEFAULT_MATERIAL);
    }

    #[test]
    fn extension_of_last_component_only() {
        assert_eq!(strip_extension("maps/v1.2/wall"), "maps/v1.2/wall");
        assert_eq!(strip_extension("maps/wall.vmt"), "maps/wall");
        assert_eq!(strip_extension(".hidden"), ".hidden");
    }

    #[test]
    fn patched_variants_share_a_slot() {
        let strings = StringTable::from_strings(["brick_1_2_3", "metal", "brick_4_5_6"]);
        let mut slots = MaterialSlots::new();

        assert_eq!(slots.slot(&strings, Some(0)), 0);
        assert_eq!(slots.slot(&strings, Some(1)), 1);
        assert_eq!(slots.slot(&strings, Some(2)), 0);
        assert_eq!(slots.slot(&strings, None), 2);
        assert_eq!(slots.slot(&strings, Some(1)), 1);
        // missing names resolve through the sentinel
        assert_eq!(slots.slot(&strings, Some(9)), 3);

        assert_eq!(slots.names(), &["brick", "metal", DEFAULT_MATERIAL, "NO_NAME"]);
    }
}
