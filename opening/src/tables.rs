//! Hand-curated names for the objects the classifier cares about. These win over the game data
//! catalog so that classification never depends on localization.

pub const FEUDAL_AGE: i64 = 101;
pub const CASTLE_AGE: i64 = 102;
pub const IMPERIAL_AGE: i64 = 103;

pub(crate) const UNITS: &[(i64, &str)] = &[
    (4, "Archer"),
    (7, "Skirmisher"),
    (38, "Knight"),
    (39, "Cavalry Archer"),
    (74, "Militia"),
    (75, "MAA"),
    (83, "Villager"),
    (93, "Spearman"),
    (125, "Monk"),
    (279, "Scorpion"),
    (280, "Mangonel"),
    (329, "Camel"),
    (448, "Scout"),
    (751, "Eagle"),
    (1258, "Battering Ram"),
];

pub(crate) const UNIQUE_UNITS: &[(i64, &str)] = &[
    (8, "Longbowman"),
    (11, "Mangudai"),
    (25, "Teutonic Knight"),
    (40, "Cataphract"),
    (41, "Huskarl"),
    (46, "Janissary"),
    (73, "Chu Ko Nu"),
    (232, "Woad Raider"),
    (239, "War Elephant"),
    (281, "Throwing Axeman"),
    (282, "Mameluke"),
    (291, "Samurai"),
    (692, "Berserk"),
    (725, "Jaguar Warrior"),
    (755, "Tarkan"),
    (763, "Plumed Archer"),
    (771, "Conquistador"),
    (827, "War Wagon"),
    (866, "Genoese Crossbowman"),
    (869, "Huszar"),
    (873, "Elephant Archer"),
    (876, "Boyar"),
    (879, "Kamayuk"),
    (1001, "Organ Gun"),
    (1007, "Camel Archer"),
    (1013, "Gbeto"),
    (1016, "Shotel Warrior"),
    (1120, "Ballista Elephant"),
    (1123, "Karambit Warrior"),
    (1126, "Arambai"),
    (1129, "Rattan Archer"),
    (1225, "Konnik"),
    (1228, "Keshik"),
    (1231, "Kipchak"),
    (1234, "Leitis"),
    (1655, "Coustillier"),
    (1660, "Serjeant"),
    (1701, "Obuch"),
    (1704, "Hussite Wagon"),
];

pub(crate) const BUILDINGS: &[(i64, &str)] = &[
    (10, "Archery Range"),
    (12, "Barracks"),
    (18, "Blacksmith 2"),
    (19, "Blacksmith 3"),
    (30, "Monastery 2"),
    (31, "Monastery 3"),
    (32, "Monastery 4"),
    (49, "Siege Workshop"),
    (51, "Dock"),
    (68, "Mill"),
    (79, "Watch Tower"),
    (84, "Market"),
    (86, "Stable 2"),
    (87, "Archery Range"),
    (101, "Stable"),
    (103, "Blacksmith"),
    (104, "Monastery"),
    (109, "Town Center 2"),
    (621, "Town Center"),
];

/// Farms, houses, drop sites and gates say nothing about a player's strategy
pub(crate) const IGNORED_BUILDINGS: &[(i64, &str)] = &[
    (50, "Farm"),
    (70, "House"),
    (562, "Lumber Mill"),
    (584, "Mining Camp"),
    (792, "Palisade Gate"),
    (793, "Palisade Gate"),
    (794, "Palisade Gate"),
    (795, "Palisade Gate"),
    (796, "Palisade Gate"),
    (797, "Palisade Gate"),
    (798, "Palisade Gate"),
    (799, "Palisade Gate"),
    (800, "Palisade Gate"),
    (801, "Palisade Gate"),
    (802, "Palisade Gate"),
    (803, "Palisade Gate"),
    (804, "Palisade Gate"),
];

pub(crate) const TECHS: &[(i64, &str)] = &[
    (8, "Town Watch"),
    (13, "Heavy Plow"),
    (14, "Horse Collar"),
    (22, "Loom"),
    (55, "Gold Mining"),
    (67, "Forging"),
    (68, "Iron Casting"),
    (74, "Scale Mail Armor"),
    (75, "Blast Furnace"),
    (76, "Chain Mail Armor"),
    (77, "Plate Mail Armor"),
    (80, "Plate Barding Armor"),
    (81, "Scale Barding Armor"),
    (82, "Chain Barding Armor"),
    (93, "Ballistics"),
    (98, "Elite Skirmisher"),
    (100, "Crossbowman"),
    (FEUDAL_AGE, "Feudal Age"),
    (CASTLE_AGE, "Castle Age"),
    (IMPERIAL_AGE, "Imperial Age"),
    (182, "Gold Shaft Mining"),
    (197, "Pikeman"),
    (199, "Fletching"),
    (200, "Bodkin Arrow"),
    (202, "Double-Bit Axe"),
    (203, "Bow Saw"),
    (207, "Longsword"),
    (211, "Padded Archer Armor"),
    (212, "Leather Archer Armor"),
    (213, "Wheelbarrow"),
    (215, "Squires"),
    (222, "Man-at-Arms"),
    (278, "Stone Mining"),
    (280, "Town Patrol"),
    (384, "Eagle Warrior"),
    (428, "Hussar"),
    (429, "Halberdier"),
    (435, "Bloodlines"),
    (436, "Parthian Tactics"),
    (437, "Thumb Ring"),
    (602, "Arson"),
    (716, "Supplies"),
];

pub(crate) fn lookup(table: &[(i64, &'static str)], id: i64) -> Option<&'static str> {
    table.iter()
        .find(|(table_id, _)| *table_id == id)
        .map(|(_, name)| *name)
}

pub fn is_unique_unit(unit_id: i64) -> bool {
    lookup(UNIQUE_UNITS, unit_id).is_some()
}

pub fn is_ignored_building(building_id: i64) -> bool {
    lookup(IGNORED_BUILDINGS, building_id).is_some()
}
