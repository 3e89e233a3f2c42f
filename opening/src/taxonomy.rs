use bitflags::bitflags;
use serde::Serialize;
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

bitflags! {
    /// A player's opening, as a set of observed behaviors. Bits are grouped by age: dark age in
    /// the low byte, feudal from 0x100, castle from 0x100000.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct OpeningFlags: u32 {
        const PREMILL_DRUSH = 0x1;
        const POSTMILL_DRUSH = 0x2;
        const MAA = 0x100;
        const FEUDAL_ARCHER_OPENING = 0x200;
        const FEUDAL_SCOUT_OPENING = 0x400;
        const FEUDAL_SKIRM_OPENING = 0x800;
        const FEUDAL_ARCHER_FOLLOWUP = 0x1000;
        const FEUDAL_SCOUT_FOLLOWUP = 0x2000;
        const FEUDAL_SKIRM_FOLLOWUP = 0x4000;
        const FEUDAL_TOWERS = 0x8000;
        const FEUDAL_EAGLES = 0x10000;
        const FAST_CASTLE = 0x100000;
        const CASTLE_CROSSBOWS = 0x200000;
        const CASTLE_KNIGHTS = 0x400000;
        const CASTLE_SIEGE = 0x800000;
        const CASTLE_ELITE_SKIRM = 0x1000000;
        const CASTLE_PIKEMEN = 0x2000000;
        const CASTLE_EAGLES = 0x4000000;
        const CASTLE_CAMELS = 0x8000000;
        const CASTLE_UU = 0x10000000;
        /// Only ever set as part of [OpeningFlags::DID_NOTHING]
        const UNUSED = 0x80000000;
    }
}

impl OpeningFlags {
    /// Not yet classified
    pub const UNKNOWN: OpeningFlags = OpeningFlags::empty();
    /// The player did nothing that counts toward an opening
    pub const DID_NOTHING: OpeningFlags = OpeningFlags::from_bits_retain(u32::MAX);

    pub fn is_did_nothing(&self) -> bool {
        self.contains(Self::UNUSED)
    }

    /// Replaces an empty mask with [OpeningFlags::DID_NOTHING]
    pub fn normalized(self) -> Self {
        if self.is_empty() { Self::DID_NOTHING } else { self }
    }

    /// Bit `i` of the mask as the `i`th entry
    pub fn decompose(&self) -> [bool; 32] {
        std::array::from_fn(|i| self.bits() & (1 << i) != 0)
    }

    /// Names of every primitive and meta opening this mask matches, primitives first
    pub fn named_openings(&self) -> Vec<&'static str> {
        named_patterns()
            .into_iter()
            .filter(|named| named.pattern.matches(*self))
            .map(|named| named.name)
            .collect()
    }
}

impl Default for OpeningFlags {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

/// The primitive behaviors, one per bit
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
pub enum Opening {
    PremillDrush,
    PostmillDrush,
    Maa,
    FeudalArcherOpening,
    FeudalScoutOpening,
    FeudalSkirmOpening,
    FeudalArcherFollowup,
    FeudalScoutFollowup,
    FeudalSkirmFollowup,
    FeudalTowers,
    FeudalEagles,
    FastCastle,
    CastleCrossbows,
    CastleKnights,
    CastleSiege,
    CastleEliteSkirm,
    CastlePikemen,
    CastleEagles,
    CastleCamels,
    CastleUU,
}

impl Opening {
    pub fn flag(self) -> OpeningFlags {
        match self {
            Opening::PremillDrush => OpeningFlags::PREMILL_DRUSH,
            Opening::PostmillDrush => OpeningFlags::POSTMILL_DRUSH,
            Opening::Maa => OpeningFlags::MAA,
            Opening::FeudalArcherOpening => OpeningFlags::FEUDAL_ARCHER_OPENING,
            Opening::FeudalScoutOpening => OpeningFlags::FEUDAL_SCOUT_OPENING,
            Opening::FeudalSkirmOpening => OpeningFlags::FEUDAL_SKIRM_OPENING,
            Opening::FeudalArcherFollowup => OpeningFlags::FEUDAL_ARCHER_FOLLOWUP,
            Opening::FeudalScoutFollowup => OpeningFlags::FEUDAL_SCOUT_FOLLOWUP,
            Opening::FeudalSkirmFollowup => OpeningFlags::FEUDAL_SKIRM_FOLLOWUP,
            Opening::FeudalTowers => OpeningFlags::FEUDAL_TOWERS,
            Opening::FeudalEagles => OpeningFlags::FEUDAL_EAGLES,
            Opening::FastCastle => OpeningFlags::FAST_CASTLE,
            Opening::CastleCrossbows => OpeningFlags::CASTLE_CROSSBOWS,
            Opening::CastleKnights => OpeningFlags::CASTLE_KNIGHTS,
            Opening::CastleSiege => OpeningFlags::CASTLE_SIEGE,
            Opening::CastleEliteSkirm => OpeningFlags::CASTLE_ELITE_SKIRM,
            Opening::CastlePikemen => OpeningFlags::CASTLE_PIKEMEN,
            Opening::CastleEagles => OpeningFlags::CASTLE_EAGLES,
            Opening::CastleCamels => OpeningFlags::CASTLE_CAMELS,
            Opening::CastleUU => OpeningFlags::CASTLE_UU,
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// A query over opening masks: every `required` bit set, no `forbidden` bit set, and, when
/// `any_of` is non-empty, at least one of its bits set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct OpeningPattern {
    #[serde(serialize_with = "serialize_bits")]
    pub required: OpeningFlags,
    #[serde(serialize_with = "serialize_bits")]
    pub forbidden: OpeningFlags,
    #[serde(serialize_with = "serialize_bits")]
    pub any_of: OpeningFlags,
}

fn serialize_bits<S: serde::Serializer>(flags: &OpeningFlags, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u32(flags.bits())
}

/// Bitwise match. Callers wanting the `UNUSED` guard go through [OpeningPattern::matches].
pub fn matches(mask: OpeningFlags, required: OpeningFlags, forbidden: OpeningFlags) -> bool {
    mask.contains(required) && !mask.intersects(forbidden)
}

impl OpeningPattern {
    pub const fn all_of(required: OpeningFlags) -> Self {
        Self { required, forbidden: OpeningFlags::empty(), any_of: OpeningFlags::empty() }
    }

    pub const fn any_of(any_of: OpeningFlags) -> Self {
        Self { required: OpeningFlags::empty(), forbidden: OpeningFlags::empty(), any_of }
    }

    pub const fn excluding(self, forbidden: OpeningFlags) -> Self {
        Self { forbidden: self.forbidden.union(forbidden), ..self }
    }

    /// Every pattern except the one asking for `UNUSED` itself rejects the did-nothing sentinel,
    /// which has all bits set and would otherwise match everything.
    pub fn matches(&self, mask: OpeningFlags) -> bool {
        let forbidden = if self.required.contains(OpeningFlags::UNUSED) {
            self.forbidden
        } else {
            self.forbidden | OpeningFlags::UNUSED
        };
        matches(mask, self.required, forbidden)
            && (self.any_of.is_empty() || mask.intersects(self.any_of))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct NamedPattern {
    pub name: &'static str,
    pub pattern: OpeningPattern,
}

const fn meta(name: &'static str, a: OpeningFlags, b: OpeningFlags) -> NamedPattern {
    NamedPattern { name, pattern: OpeningPattern::all_of(a.union(b)) }
}

/// Common combinations of primitive behaviors
pub const META_OPENINGS: &[NamedPattern] = &[
    NamedPattern {
        name: "AnyDrush",
        pattern: OpeningPattern::any_of(OpeningFlags::PREMILL_DRUSH.union(OpeningFlags::POSTMILL_DRUSH)),
    },
    meta("PremillDrushFC", OpeningFlags::PREMILL_DRUSH, OpeningFlags::FAST_CASTLE),
    meta("PostmillDrushFC", OpeningFlags::POSTMILL_DRUSH, OpeningFlags::FAST_CASTLE),
    meta("PremillDrushArchers", OpeningFlags::PREMILL_DRUSH, OpeningFlags::FEUDAL_ARCHER_FOLLOWUP),
    meta("PostmillDrushArchers", OpeningFlags::POSTMILL_DRUSH, OpeningFlags::FEUDAL_ARCHER_FOLLOWUP),
    meta("PremillDrushSkirms", OpeningFlags::PREMILL_DRUSH, OpeningFlags::FEUDAL_SKIRM_FOLLOWUP),
    meta("PostmillDrushSkirms", OpeningFlags::POSTMILL_DRUSH, OpeningFlags::FEUDAL_SKIRM_FOLLOWUP),
    meta("PremillDrushScouts", OpeningFlags::PREMILL_DRUSH, OpeningFlags::FEUDAL_SCOUT_FOLLOWUP),
    meta("PostmillDrushScouts", OpeningFlags::POSTMILL_DRUSH, OpeningFlags::FEUDAL_SCOUT_FOLLOWUP),
    meta("PremillDrushMaa", OpeningFlags::PREMILL_DRUSH, OpeningFlags::MAA),
    meta("PostmillDrushMaa", OpeningFlags::POSTMILL_DRUSH, OpeningFlags::MAA),
    meta("MaaArchers", OpeningFlags::MAA, OpeningFlags::FEUDAL_ARCHER_FOLLOWUP),
    meta("MaaScouts", OpeningFlags::MAA, OpeningFlags::FEUDAL_SCOUT_FOLLOWUP),
    meta("MaaSkirms", OpeningFlags::MAA, OpeningFlags::FEUDAL_SKIRM_FOLLOWUP),
    meta("MaaTowers", OpeningFlags::MAA, OpeningFlags::FEUDAL_TOWERS),
    meta("MaaEagles", OpeningFlags::MAA, OpeningFlags::FEUDAL_EAGLES),
    meta("ScoutsArchers", OpeningFlags::FEUDAL_SCOUT_OPENING, OpeningFlags::FEUDAL_ARCHER_FOLLOWUP),
    meta("ScoutsSkirms", OpeningFlags::FEUDAL_SCOUT_OPENING, OpeningFlags::FEUDAL_SKIRM_FOLLOWUP),
];

pub const DID_NOTHING_PATTERN: NamedPattern = NamedPattern {
    name: "DidNothing",
    pattern: OpeningPattern::all_of(OpeningFlags::DID_NOTHING),
};

/// Every reportable pattern: each primitive, then the meta openings, then did-nothing
pub fn named_patterns() -> Vec<NamedPattern> {
    Opening::iter()
        .map(|opening| NamedPattern { name: opening.name(), pattern: OpeningPattern::all_of(opening.flag()) })
        .chain(META_OPENINGS.iter().copied())
        .chain(std::iter::once(DID_NOTHING_PATTERN))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_bits_are_distinct_single_bits() {
        let mut seen = OpeningFlags::empty();
        for opening in Opening::iter() {
            let flag = opening.flag();
            assert_eq!(flag.bits().count_ones(), 1, "{} is not a single bit", opening.name());
            assert!(!seen.intersects(flag));
            seen |= flag;
        }
        assert!(!seen.contains(OpeningFlags::UNUSED));
    }

    #[test]
    fn meta_values_are_unions_of_primitives() {
        let value = |name: &str| META_OPENINGS.iter()
            .find(|m| m.name == name)
            .map(|m| m.pattern.required.bits())
            .unwrap();
        assert_eq!(value("PremillDrushFC"), 0x100001);
        assert_eq!(value("PostmillDrushArchers"), 0x1002);
        assert_eq!(value("PremillDrushSkirms"), 0x4001);
        assert_eq!(value("MaaEagles"), 0x10100);
        assert_eq!(value("ScoutsSkirms"), 0x4400);
    }

    #[test]
    fn did_nothing_has_every_bit() {
        assert_eq!(OpeningFlags::DID_NOTHING.bits(), 0xffffffff);
        assert!(OpeningFlags::DID_NOTHING.is_did_nothing());
        assert_eq!(OpeningFlags::empty().normalized(), OpeningFlags::DID_NOTHING);
        assert_eq!(OpeningFlags::MAA.normalized(), OpeningFlags::MAA);
    }

    #[test]
    fn bitwise_match() {
        let mask = OpeningFlags::PREMILL_DRUSH | OpeningFlags::FAST_CASTLE;
        assert!(matches(mask, OpeningFlags::PREMILL_DRUSH, OpeningFlags::empty()));
        assert!(matches(mask, OpeningFlags::empty(), OpeningFlags::MAA));
        assert!(!matches(mask, OpeningFlags::PREMILL_DRUSH, OpeningFlags::FAST_CASTLE));
        assert!(!matches(mask, OpeningFlags::MAA, OpeningFlags::empty()));
    }

    #[test]
    fn patterns_reject_did_nothing() {
        let drush = OpeningPattern::all_of(OpeningFlags::PREMILL_DRUSH);
        assert!(drush.matches(OpeningFlags::PREMILL_DRUSH));
        assert!(!drush.matches(OpeningFlags::DID_NOTHING));
        assert!(DID_NOTHING_PATTERN.pattern.matches(OpeningFlags::DID_NOTHING));
        assert!(!DID_NOTHING_PATTERN.pattern.matches(OpeningFlags::PREMILL_DRUSH));
    }

    #[test]
    fn any_drush_accepts_either_drush() {
        let any_drush = META_OPENINGS[0];
        assert_eq!(any_drush.name, "AnyDrush");
        assert!(any_drush.pattern.matches(OpeningFlags::PREMILL_DRUSH));
        assert!(any_drush.pattern.matches(OpeningFlags::POSTMILL_DRUSH | OpeningFlags::MAA));
        assert!(!any_drush.pattern.matches(OpeningFlags::MAA));
    }

    #[test]
    fn excluding_adds_forbidden_bits() {
        let pure_fc = OpeningPattern::all_of(OpeningFlags::FAST_CASTLE)
            .excluding(OpeningFlags::PREMILL_DRUSH | OpeningFlags::POSTMILL_DRUSH);
        assert!(pure_fc.matches(OpeningFlags::FAST_CASTLE | OpeningFlags::CASTLE_KNIGHTS));
        assert!(!pure_fc.matches(OpeningFlags::FAST_CASTLE | OpeningFlags::POSTMILL_DRUSH));
    }

    #[test]
    fn named_openings_lists_primitives_then_metas() {
        let mask = OpeningFlags::PREMILL_DRUSH | OpeningFlags::FEUDAL_ARCHER_FOLLOWUP;
        assert_eq!(mask.named_openings(),
                   vec!["PremillDrush", "FeudalArcherFollowup", "AnyDrush", "PremillDrushArchers"]);
        assert_eq!(OpeningFlags::DID_NOTHING.named_openings(), vec!["DidNothing"]);
    }

    #[test]
    fn decompose_reads_bits_low_to_high() {
        let bits = (OpeningFlags::PREMILL_DRUSH | OpeningFlags::CASTLE_UU).decompose();
        assert!(bits[0]);
        assert!(bits[28]);
        assert_eq!(bits.iter().filter(|b| **b).count(), 2);
        assert!(OpeningFlags::DID_NOTHING.decompose().iter().all(|b| *b));
    }
}
