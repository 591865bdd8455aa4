use glam::{IVec2, Vec2};
use sgravoquest::motion::{BlockingTiles, MotionState, MoveError, Player};
use sgravoquest::tilemap::TileGrid;

fn settle(player: &mut Player) -> usize {
    let mut updates = 0;
    while player.is_moving() {
        player.update();
        updates += 1;
        assert!(updates < 1000, "interpolation never finished");
    }
    updates
}

// ── try_move ──────────────────────────────────────────────────────────────────

#[test]
fn walks_left_until_the_wall() {
    let grid = TileGrid::bordered(10, 10, 0, 14);
    let mut player = Player::new(5, 5);

    for _ in 0..4 {
        assert_eq!(player.try_move(-1, 0, &grid), Ok(()));
        settle(&mut player);
    }
    assert_eq!(player.tile_position(), IVec2::new(1, 5));

    assert_eq!(
        player.try_move(-1, 0, &grid),
        Err(MoveError::Blocked { x: 0, y: 5, tile: 14 })
    );
    assert_eq!(player.tile_position(), IVec2::new(1, 5));
    assert_eq!(player.state(), MotionState::Idle);
}

#[test]
fn decoration_tiles_block() {
    let mut grid = TileGrid::filled(5, 5, 1);
    grid.set(3, 2, 25);
    let mut player = Player::new(2, 2);
    assert_eq!(
        player.try_move(1, 0, &grid),
        Err(MoveError::Blocked { x: 3, y: 2, tile: 25 })
    );
}

#[test]
fn custom_blocking_set() {
    let grid = TileGrid::filled(5, 5, 7);
    let mut player = Player::new(2, 2).with_blocking_tiles(BlockingTiles::new([7]));
    assert!(matches!(player.try_move(0, 1, &grid), Err(MoveError::Blocked { tile: 7, .. })));

    let mut free = Player::new(2, 2).with_blocking_tiles(BlockingTiles::none());
    assert_eq!(free.try_move(0, 1, &grid), Ok(()));
}

#[test]
fn leaving_the_grid_is_rejected() {
    let grid = TileGrid::filled(3, 3, 1);
    let mut player = Player::new(0, 0);
    assert_eq!(player.try_move(-1, 0, &grid), Err(MoveError::OutOfBounds { x: -1, y: 0 }));
    assert_eq!(player.try_move(0, -1, &grid), Err(MoveError::OutOfBounds { x: 0, y: -1 }));
    assert_eq!(player.tile_position(), IVec2::ZERO);
}

#[test]
fn zero_direction_is_rejected() {
    let grid = TileGrid::filled(3, 3, 1);
    let mut player = Player::new(1, 1);
    assert_eq!(player.try_move(0, 0, &grid), Err(MoveError::NoDirection));
}

#[test]
fn moves_while_moving_are_dropped() {
    let grid = TileGrid::filled(5, 5, 1);
    let mut player = Player::new(1, 1);
    assert_eq!(player.try_move(1, 0, &grid), Ok(()));
    assert_eq!(player.try_move(1, 0, &grid), Err(MoveError::Busy));
    assert_eq!(player.tile_position(), IVec2::new(2, 1));
}

#[test]
fn logical_tile_changes_before_pixels_catch_up() {
    let grid = TileGrid::filled(5, 5, 1);
    let mut player = Player::new(1, 1);
    player.try_move(0, 1, &grid).unwrap();
    assert_eq!(player.tile_position(), IVec2::new(1, 2));
    assert_eq!(player.pixel_position(), Vec2::new(16.0, 16.0));
    assert_eq!(player.target_pixel(), Vec2::new(16.0, 32.0));
}

#[test]
fn large_steps_are_clamped_to_one_tile() {
    let grid = TileGrid::filled(5, 5, 1);
    let mut player = Player::new(1, 1);
    player.try_move(3, -7, &grid).unwrap();
    assert_eq!(player.tile_position(), IVec2::new(2, 0));
}

// ── Interpolation ─────────────────────────────────────────────────────────────

#[test]
fn default_speed_reaches_the_tile_in_eight_updates() {
    let grid = TileGrid::filled(5, 5, 1);
    let mut player = Player::new(0, 0);
    player.try_move(1, 0, &grid).unwrap();
    assert_eq!(settle(&mut player), 8);
    assert_eq!(player.pixel_position(), Vec2::new(16.0, 0.0));
}

#[test]
fn final_step_snaps_exactly_to_the_target() {
    let grid = TileGrid::filled(5, 5, 1);
    let mut player = Player::new(0, 0).with_speed(3.0);
    player.try_move(1, 0, &grid).unwrap();

    for _ in 0..5 {
        player.update();
    }
    assert!(player.is_moving());
    assert_eq!(player.pixel_position().x, 15.0);

    player.update();
    assert_eq!(player.state(), MotionState::Idle);
    assert_eq!(player.pixel_position(), player.target_pixel());
}

#[test]
fn update_while_idle_does_nothing() {
    let mut player = Player::new(3, 4);
    player.update();
    assert_eq!(player.pixel_position(), Vec2::new(48.0, 64.0));
    assert_eq!(player.state(), MotionState::Idle);
}

#[test]
fn set_position_cancels_a_move() {
    let grid = TileGrid::filled(5, 5, 1);
    let mut player = Player::new(0, 0);
    player.try_move(1, 0, &grid).unwrap();
    player.set_position(4, 4);
    assert_eq!(player.state(), MotionState::Idle);
    assert_eq!(player.tile_position(), IVec2::new(4, 4));
    assert_eq!(player.pixel_position(), Vec2::new(64.0, 64.0));
}

#[test]
fn tile_size_scales_pixel_positions() {
    let player = Player::new(2, 3).with_tile_size(32);
    assert_eq!(player.pixel_position(), Vec2::new(64.0, 96.0));
}
