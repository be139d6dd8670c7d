//! Species-group catalog
//!
//! Group identifiers follow the waarneming.nl species-group codes. The
//! default harvesting set covers the insect groups; callers can configure
//! any other set of ids via [`crate::config::HarvestConfig::species_groups`].

use crate::types::GroupId;

/// Butterflies
pub const BUTTERFLIES: GroupId = GroupId(4);
/// Moths
pub const MOTHS: GroupId = GroupId(8);
/// Dragonflies
pub const DRAGONFLIES: GroupId = GroupId(5);
/// Locusts and crickets
pub const LOCUSTS_AND_CRICKETS: GroupId = GroupId(14);
/// Bees, wasps and ants
pub const BEES_WASPS_AND_ANTS: GroupId = GroupId(17);
/// Flies
pub const FLIES: GroupId = GroupId(18);
/// Beetles
pub const BEETLES: GroupId = GroupId(16);
/// Bugs, plant lice and cicadas
pub const BUGS_PLANT_LICE_AND_CICADAS: GroupId = GroupId(15);
/// Other insects
pub const OTHER_INSECTS: GroupId = GroupId(6);

/// The insect species groups harvested by default, in harvesting order
pub fn insect_groups() -> Vec<GroupId> {
    vec![
        BUTTERFLIES,
        MOTHS,
        DRAGONFLIES,
        LOCUSTS_AND_CRICKETS,
        BEES_WASPS_AND_ANTS,
        FLIES,
        BEETLES,
        BUGS_PLANT_LICE_AND_CICADAS,
        OTHER_INSECTS,
    ]
}

/// Human-readable label for a known group id, used in logs and reports
pub fn label(group: GroupId) -> Option<&'static str> {
    match group {
        BUTTERFLIES => Some("Butterflies"),
        MOTHS => Some("Moths"),
        DRAGONFLIES => Some("Dragonflies"),
        LOCUSTS_AND_CRICKETS => Some("Locusts and Crickets"),
        BEES_WASPS_AND_ANTS => Some("Bees, Wasps and Ants"),
        FLIES => Some("Flies"),
        BEETLES => Some("Beetles"),
        BUGS_PLANT_LICE_AND_CICADAS => Some("Bugs, Plant Lice and Cicadas"),
        OTHER_INSECTS => Some("Other Insects"),
        _ => None,
    }
}
