use super::ship::ShipDef;

pub const BOARD_SIZE: u8 = 10;
pub const NUM_SHIPS: usize = 5;
pub const SHIPS: [ShipDef; NUM_SHIPS] = [
    ShipDef::new("5", 5),
    ShipDef::new("4", 4),
    ShipDef::new("3_a", 3),
    ShipDef::new("3_b", 3),
    ShipDef::new("2", 2),
];

/// Total number of ship segments used in the standard configuration.
/// A side wins once it has landed this many hits.
pub const TOTAL_SHIP_CELLS: usize = 5 + 4 + 3 + 3 + 2;
