use super::*;

fn id(raw: &str) -> ContainerId {
    ContainerId(raw.to_string())
}

#[test]
fn default_board_is_six_by_four() {
    let board = Board::default();
    assert_eq!(board.columns(), 6);
    assert_eq!(board.rows(), 4);
    assert_eq!(board.len(), 24);
    assert!(board.slots().iter().all(Option::is_none));
}

#[test]
fn place_first_free_fills_in_order_and_is_idempotent() {
    let mut board = Board::new(2, 1);
    assert_eq!(board.place_first_free(&id("a")), Some(0));
    assert_eq!(board.place_first_free(&id("b")), Some(1));
    assert_eq!(board.place_first_free(&id("a")), Some(0));
    assert_eq!(board.place_first_free(&id("c")), None);
    assert_eq!(board.slot_of(&id("c")), None);
}

#[test]
fn move_to_frees_the_previous_slot() {
    let mut board = Board::new(3, 1);
    board.place_first_free(&id("a"));
    assert_eq!(board.move_to(&id("a"), 2), Ok(2));
    assert_eq!(board.occupant(0), None);
    assert_eq!(board.occupant(2), Some(&id("a")));
    assert_eq!(board.move_to(&id("a"), 2), Ok(2));
}

#[test]
fn move_to_rejects_occupied_and_out_of_range_slots() {
    let mut board = Board::new(2, 1);
    board.place_first_free(&id("aaaaaaaaaaaaaaaa"));
    board.place_first_free(&id("b"));

    assert_eq!(
        board.move_to(&id("b"), 0),
        Err(CommandError::SlotOccupied {
            slot: 0,
            container: "aaaaaaaaaaaa".into()
        })
    );
    assert_eq!(
        board.move_to(&id("b"), 5),
        Err(CommandError::SlotOutOfRange { slot: 5, slots: 2 })
    );
    assert_eq!(board.slot_of(&id("b")), Some(1));
}

#[test]
fn release_frees_a_slot_for_reuse() {
    let mut board = Board::new(2, 1);
    board.place_first_free(&id("a"));
    board.place_first_free(&id("b"));
    assert_eq!(board.release(&id("a")), Some(0));
    assert_eq!(board.release(&id("a")), None);
    assert_eq!(board.place_first_free(&id("c")), Some(0));
}

#[test]
fn oversized_dimensions_are_clamped() {
    let board = Board::new(usize::MAX / 2, 3);
    assert_eq!(board.columns(), MAX_GRID_SIDE);
    assert_eq!(board.rows(), 3);
    assert_eq!(board.len(), MAX_GRID_SIDE * 3);

    let huge = Board::new(usize::MAX, usize::MAX);
    assert_eq!(huge.len(), MAX_GRID_SIDE * MAX_GRID_SIDE);
}
