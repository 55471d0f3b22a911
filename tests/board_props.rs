use proptest::prelude::*;
use rand::{rngs::SmallRng, SeedableRng};
use zk_battleships::{
    is_layout_valid, random_layout, ship_at, validate_layout, BoardError, Ship, BOARD_SIZE, SHIPS,
    TOTAL_SHIP_CELLS,
};

fn layout(seed: u64) -> [Ship; 5] {
    let mut rng = SmallRng::seed_from_u64(seed);
    random_layout(&mut rng).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_layouts_are_valid(seed in any::<u64>()) {
        let ships = layout(seed);
        let occupied = validate_layout(&ships).unwrap();
        prop_assert_eq!(occupied.len(), TOTAL_SHIP_CELLS);
    }

    #[test]
    fn ship_at_agrees_with_occupancy(seed in any::<u64>(), x in 0..BOARD_SIZE as usize, y in 0..BOARD_SIZE as usize) {
        let ships = layout(seed);
        let occupied = validate_layout(&ships).unwrap();
        prop_assert_eq!(ship_at(&ships, x, y).is_some(), occupied.contains(x, y));
    }

    #[test]
    fn pushing_a_ship_off_the_board_invalidates(seed in any::<u64>(), index in 0..5usize) {
        let mut ships = layout(seed);
        let n = BOARD_SIZE as usize;
        let len = SHIPS[index].length();
        ships[index] = if ships[index].horizontal {
            Ship::new(n - len + 1, ships[index].y, true)
        } else {
            Ship::new(ships[index].x, n - len + 1, false)
        };
        prop_assert!(!is_layout_valid(&ships));
    }

    #[test]
    fn stacking_two_ships_is_an_overlap(seed in any::<u64>(), a in 0..5usize, b in 0..5usize) {
        prop_assume!(a < b);
        let mut ships = layout(seed);
        ships[b] = ships[a];
        prop_assert_eq!(validate_layout(&ships), Err(BoardError::ShipOverlaps { ship: b }));
    }
}
