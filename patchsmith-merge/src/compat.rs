//! Overhaul compatibility table for the leveled-list merger.
//!
//! When the Unofficial Oblivion Patch is loaded next to certain leveled-list
//! overhauls, its edits to the lists below conflict with the overhaul's and
//! must not be merged. This is a fixed table, not a rule.

use patchsmith_model::LoadOrder;
use patchsmith_types::{PluginName, RecordId};
use std::collections::BTreeSet;

/// The compatibility patch whose list edits get skipped.
pub const UNOFFICIAL_PATCH: &str = "Unofficial Oblivion Patch.esp";

const OOO_PLUGINS: &[&str] = &[
    "Oscuro's_Oblivion_Overhaul.esm",
    "Oscuro's_Oblivion_Overhaul.esp",
];

const FRANCESCO_PLUGINS: &[&str] = &[
    "Francesco's Leveled Creatures-Items Mod.esm",
    "Francesco.esp",
];

const WARCRY_PLUGINS: &[&str] = &["Oblivion Warcry.esp", "Oblivion Warcry EV.esp"];

const TIE_PLUGINS: &[&str] = &["TIE.esp"];

/// Object ids, in the game master, of the lists the patch must leave alone.
pub const OVERHAUL_SKIP_IDS: [u32; 25] = [
    0x03AB5D, // VendorWeaponBlunt
    0x03C7F1, // LL0LootWeapon0Magic4Dwarven100
    0x03C7F2, // LL0LootWeapon0Magic7Ebony100
    0x03C7F3, // LL0LootWeapon0Magic5Elven100
    0x03C7F4, // LL0LootWeapon0Magic6Glass100
    0x03C7F5, // LL0LootWeapon0Magic3Silver100
    0x03C7F7, // LL0LootWeapon0Magic2Steel100
    0x03E4D2, // LL0NPCWeapon0MagicClaymore100
    0x03E4D3, // LL0NPCWeapon0MagicClaymoreLvl100
    0x03E4DA, // LL0NPCWeapon0MagicWaraxe100
    0x03E4DB, // LL0NPCWeapon0MagicWaraxeLvl100
    0x03E4DC, // LL0NPCWeapon0MagicWarhammer100
    0x03E4DD, // LL0NPCWeapon0MagicWarhammerLvl100
    0x0733EA, // ArenaLeveledHeavyShield
    0x0C7615, // FGNPCWeapon0MagicClaymoreLvl100
    0x181C66, // SQ02LL0NPCWeapon0MagicClaymoreLvl100
    0x053877, // LL0NPCArmor0MagicLightGauntlets100
    0x053878, // LL0NPCArmor0MagicLightBoots100
    0x05387A, // LL0NPCArmor0MagicLightCuirass100
    0x053892, // LL0NPCArmor0MagicLightBootsLvl100
    0x053893, // LL0NPCArmor0MagicLightCuirassLvl100
    0x053894, // LL0NPCArmor0MagicLightGauntletsLvl100
    0x053D82, // LL0LootArmor0MagicLight5Elven100
    0x053D83, // LL0LootArmor0MagicLight6Glass100
    0x052D89, // LL0LootArmor0MagicLight4Mithril100
];

fn any_loaded(load_order: &LoadOrder, names: &[&str]) -> bool {
    names
        .iter()
        .any(|n| load_order.contains(&PluginName::new(*n)))
}

/// Returns true if the loaded plugins call for the skip table.
#[must_use]
pub fn overhaul_compat_active(load_order: &LoadOrder) -> bool {
    let with_unofficial_patch = load_order.contains(&PluginName::new(UNOFFICIAL_PATCH))
        && (any_loaded(load_order, OOO_PLUGINS) || any_loaded(load_order, WARCRY_PLUGINS));
    let francesco_without_tie =
        any_loaded(load_order, FRANCESCO_PLUGINS) && !any_loaded(load_order, TIE_PLUGINS);
    with_unofficial_patch || francesco_without_tie
}

/// The lists whose Unofficial Oblivion Patch versions must not be merged;
/// empty unless [`overhaul_compat_active`].
#[must_use]
pub fn overhaul_skips(load_order: &LoadOrder, game_master: &PluginName) -> BTreeSet<RecordId> {
    if !overhaul_compat_active(load_order) {
        return BTreeSet::new();
    }
    OVERHAUL_SKIP_IDS
        .iter()
        .map(|&object_id| RecordId::new(game_master.clone(), object_id))
        .collect()
}

/// Returns true if `plugin` is the compatibility patch.
#[must_use]
pub fn is_unofficial_patch(plugin: &PluginName) -> bool {
    *plugin == PluginName::new(UNOFFICIAL_PATCH)
}
