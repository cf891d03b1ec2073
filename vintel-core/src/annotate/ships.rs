//! Ship name pass.

use crate::types::{RichText, Segment};
use std::sync::OnceLock;

/// Hull names recognized in chat, upper-case.
pub const SHIP_NAMES: &[&str] = &[
    // Frigates
    "ATRON", "CONDOR", "EXECUTIONER", "INCURSUS", "KESTREL", "MERLIN", "NAVITAS", "PUNISHER",
    "RIFTER", "SLASHER", "TORMENTOR", "TRISTAN", "BREACHER", "BURST", "HERON", "IMICUS",
    "MAGNATE", "PROBE", "BANTAM", "INQUISITOR", "WORM", "DAREDEVIL", "GARMUR", "ASTERO",
    "SUCCUBUS", "CRUOR", "DRAMIEL", "CAPELLA",
    // Assault, interceptors, covert ops, bombers, EAF
    "RETRIBUTION", "VENGEANCE", "HARPY", "HAWK", "ENYO", "ISHKUR", "JAGUAR", "WOLF",
    "CRUSADER", "MALEDICTION", "CROW", "RAPTOR", "ARES", "TARANIS", "CLAW", "STILETTO",
    "ANATHEMA", "BUZZARD", "HELIOS", "CHEETAH", "PURIFIER", "MANTICORE", "NEMESIS", "HOUND",
    "SENTINEL", "KITSUNE", "KERES", "HYENA",
    // Destroyers
    "COERCER", "CORMORANT", "CATALYST", "THRASHER", "DRAGOON", "CORAX", "ALGOS", "TALWAR",
    "HERETIC", "FLYCATCHER", "ERIS", "SABRE", "PONTIFEX", "STORK", "MAGUS", "BIFROST",
    "CONFESSOR", "JACKDAW", "HECATE", "SVIPUL",
    // Cruisers
    "ARBITRATOR", "AUGOROR", "MALLER", "OMEN", "BLACKBIRD", "CARACAL", "MOA", "OSPREY",
    "CELESTIS", "EXEQUROR", "THORAX", "VEXOR", "BELLICOSE", "RUPTURE", "SCYTHE", "STABBER",
    "GILA", "ASHIMMU", "PHANTASM", "VIGILANT", "CYNABAL", "ORTHRUS", "STRATIOS",
    // Heavy assault, recons, logistics, HICs, strategic
    "SACRILEGE", "ZEALOT", "CERBERUS", "EAGLE", "DEIMOS", "ISHTAR", "MUNINN", "VAGABOND",
    "CURSE", "PILGRIM", "FALCON", "ROOK", "ARAZU", "LACHESIS", "HUGINN", "RAPIER",
    "GUARDIAN", "BASILISK", "ONEIROS", "SCIMITAR", "DEVOTER", "ONYX", "PHOBOS", "BROADSWORD",
    "LEGION", "TENGU", "PROTEUS", "LOKI",
    // Battlecruisers
    "HARBINGER", "PROPHECY", "DRAKE", "FEROX", "BRUTIX", "MYRMIDON", "CYCLONE", "HURRICANE",
    "ORACLE", "NAGA", "TALOS", "TORNADO", "ABSOLUTION", "DAMNATION", "NIGHTHAWK", "VULTURE",
    "ASTARTE", "EOS", "CLAYMORE", "SLEIPNIR", "GNOSIS",
    // Battleships
    "APOCALYPSE", "ARMAGEDDON", "ABADDON", "RAVEN", "ROKH", "SCORPION", "DOMINIX",
    "HYPERION", "MEGATHRON", "MAELSTROM", "TEMPEST", "TYPHOON", "PALADIN", "GOLEM", "KRONOS",
    "VARGUR", "REDEEMER", "WIDOW", "SIN", "PANTHER", "BHAALGORN", "NIGHTMARE", "RATTLESNAKE",
    "MACHARIEL", "VINDICATOR", "BARGHEST", "NESTOR", "LEVIATHAN",
    // Capitals
    "ARCHON", "CHIMERA", "THANATOS", "NIDHOGGUR", "REVELATION", "PHOENIX", "MOROS", "NAGLFAR",
    "APOSTLE", "MINOKAWA", "NINAZU", "LIF", "AEON", "WYVERN", "NYX", "HEL", "AVATAR",
    "RAGNAROK", "EREBUS", "THE EMPRESS", "VENDETTA", "VANQUISHER", "KOMODO", "MOLOK",
    "REVENANT", "VANGUARD",
    // Industrial and mining
    "VENTURE", "PROSPECT", "ENDURANCE", "PROCURER", "RETRIEVER", "COVETOR", "SKIFF",
    "MACKINAW", "HULK", "ORCA", "RORQUAL", "PORPOISE", "BUSTARD", "OCCATOR", "MASTODON",
    "IMPEL", "PROWLER", "CRANE", "VIATOR", "PROREOS", "NOMAD", "RHEA", "ARK", "ANSHAR",
    "CHARON", "FENRIR", "OBELISK", "PROVIDENCE", "BADGER", "EPITHAL", "ITERON", "BESTOWER",
    "SIGIL", "HOARDER", "MAMMOTH", "WREATHE", "TAYRA",
    // Navy and faction hulls with spaces
    "CARACAL NAVY ISSUE", "VEXOR NAVY ISSUE", "STABBER FLEET ISSUE", "OMEN NAVY ISSUE",
    "DRAKE NAVY ISSUE", "HURRICANE FLEET ISSUE", "BRUTIX NAVY ISSUE", "HARBINGER NAVY ISSUE",
    "RAVEN NAVY ISSUE", "TYPHOON FLEET ISSUE", "MEGATHRON NAVY ISSUE", "APOCALYPSE NAVY ISSUE",
    "ARMAGEDDON NAVY ISSUE", "SCORPION NAVY ISSUE", "DOMINIX NAVY ISSUE", "TEMPEST FLEET ISSUE",
    "FEDERATION NAVY COMET", "IMPERIAL NAVY SLICER", "CALDARI NAVY HOOKBILL",
    "REPUBLIC FLEET FIRETAIL", "MAGNATE NAVY ISSUE", "HERON NAVY ISSUE",
    "NAVITAS NAVY ISSUE", "PROBE FLEET ISSUE", "CORMORANT NAVY ISSUE", "CATALYST NAVY ISSUE",
    "COERCER NAVY ISSUE", "THRASHER FLEET ISSUE", "MARSHAL", "ENFORCER", "MONITOR",
    "CAPSULE", "POD", "SHUTTLE",
];

/// Ship names ordered longest first, so "Raven Navy Issue" wins over "Raven".
fn ships_by_length() -> &'static [&'static str] {
    static SORTED: OnceLock<Vec<&'static str>> = OnceLock::new();
    SORTED.get_or_init(|| {
        let mut names = SHIP_NAMES.to_vec();
        names.sort_by(|a, b| b.len().cmp(&a.len()));
        names.dedup();
        names
    })
}

/// Byte range of the first word-bounded, case-insensitive occurrence of `name`.
///
/// A trailing `s` directly after the name is taken as a plural and included.
fn find_ship(run: &str, name: &str) -> Option<(usize, usize)> {
    let bytes = run.as_bytes();
    let len = name.len();
    if len == 0 || bytes.len() < len {
        return None;
    }

    for start in 0..=bytes.len() - len {
        // Ship names are ASCII, so a match always sits on char boundaries.
        if !bytes[start..start + len].eq_ignore_ascii_case(name.as_bytes()) {
            continue;
        }
        if run[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_alphanumeric)
        {
            continue;
        }
        let mut end = start + len;
        if matches!(bytes.get(end), Some(b's') | Some(b'S')) {
            end += 1;
        }
        if run[end..].chars().next().is_some_and(char::is_alphanumeric) {
            continue;
        }
        return Some((start, end));
    }
    None
}

/// Mark the first ship found in a plain run.
pub fn mark_ship(text: &mut RichText) -> bool {
    let hit = text
        .segments()
        .iter()
        .enumerate()
        .find_map(|(index, segment)| match segment {
            Segment::Plain { text: run } => ships_by_length()
                .iter()
                .find_map(|name| find_ship(run, name))
                .map(|(start, end)| (index, start, end, run[start..end].to_string())),
            _ => None,
        });

    match hit {
        Some((index, start, end, ship)) => {
            text.split_plain(index, start, end, Segment::Ship { text: ship });
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_ship_word_bounded() {
        assert_eq!(find_ship("red Rifter near gate", "RIFTER"), Some((4, 10)));
        assert_eq!(find_ship("xrifter", "RIFTER"), None);
        assert_eq!(find_ship("rifterx", "RIFTER"), None);
        assert_eq!(find_ship("rifter1", "RIFTER"), None);
    }

    #[test]
    fn test_find_ship_plural() {
        assert_eq!(find_ship("3 RIFTERS!", "RIFTER"), Some((2, 9)));
        assert_eq!(find_ship("riftersx", "RIFTER"), None);
    }

    #[test]
    fn test_find_ship_skips_embedded_first_hit() {
        // first occurrence is inside a word, second is a real hit
        assert_eq!(find_ship("xsabre sabre", "SABRE"), Some((7, 12)));
    }

    #[test]
    fn test_find_ship_non_ascii_neighbours() {
        assert_eq!(find_ship("ürifter", "RIFTER"), None);
        assert_eq!(find_ship("» rifter «", "RIFTER"), Some((3, 9)));
    }

    #[test]
    fn test_mark_ship_prefers_longest_name() {
        let mut text = RichText::new("raven navy issue on gate");
        assert!(mark_ship(&mut text));
        assert_eq!(
            text.segments()[0],
            Segment::Ship {
                text: "raven navy issue".to_string()
            }
        );
    }

    #[test]
    fn test_mark_ship_keeps_typed_case() {
        let mut text = RichText::new("2x Sabres");
        assert!(mark_ship(&mut text));
        assert!(!mark_ship(&mut text));
        assert_eq!(text.segments()[1].label(), "Sabres");
    }
}
