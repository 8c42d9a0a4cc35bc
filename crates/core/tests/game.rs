//! End-to-end tic-tac-toe scenarios played through clicks and key presses.

mod support;

use std::time::Duration;

use playgodot::{Error, Godot, Variant};
use support::{GAME, RESTART, STATUS, cell, cell_position, connect_default};

async fn play(game: &Godot, cells: &[usize]) {
	for &index in cells {
		game.click(cell(index)).await.unwrap();
	}
}

async fn status(game: &Godot) -> String {
	game.get_property(STATUS, "text")
		.await
		.unwrap()
		.as_str()
		.unwrap_or_default()
		.to_string()
}

async fn board(game: &Godot) -> Vec<String> {
	game.call_as(GAME, "get_board_state", &[]).await.unwrap()
}

#[tokio::test]
async fn test_new_game_starts_with_x() {
	let (game, _target) = connect_default().await;

	assert_eq!(status(&game).await, "X's Turn");
	assert!(board(&game).await.iter().all(String::is_empty));
	assert_eq!(game.count_nodes("*Cell*").await.unwrap(), 9);
}

#[tokio::test]
async fn test_center_move_passes_turn() {
	let (game, _target) = connect_default().await;

	play(&game, &[4]).await;

	assert_eq!(board(&game).await[4], "X");
	let text = game.get_property(&cell(4), "text").await.unwrap();
	assert_eq!(text.as_str(), Some("X"));
	game.wait_for_condition(
		|| async { Ok::<_, Error>(status(&game).await == "O's Turn") },
		Duration::from_secs(1),
	)
	.await
	.unwrap();
}

#[tokio::test]
async fn test_occupied_cell_is_ignored() {
	let (game, _target) = connect_default().await;

	play(&game, &[4, 4]).await;

	let player: String = game.call_as(GAME, "get_current_player", &[]).await.unwrap();
	assert_eq!(player, "O");
	assert_eq!(board(&game).await.iter().filter(|c| !c.is_empty()).count(), 1);
}

#[tokio::test]
async fn test_x_wins_top_row() {
	let (game, _target) = connect_default().await;

	// X: 0 1 2, O: 3 4
	play(&game, &[0, 3, 1, 4, 2]).await;

	assert_eq!(status(&game).await, "X Wins!");
	let winner: String = game.call_as(GAME, "get_winner", &[]).await.unwrap();
	assert_eq!(winner, "X");
	let active: bool = game.call_as(GAME, "is_game_active", &[]).await.unwrap();
	assert!(!active);

	// Further clicks do nothing once the game is over.
	play(&game, &[8]).await;
	assert_eq!(board(&game).await[8], "");
}

#[tokio::test]
async fn test_o_wins_diagonal_by_position() {
	let (game, _target) = connect_default().await;

	// X: 1 3 8, O: 2 4 6
	for index in [1, 2, 3, 4, 8, 6] {
		let (x, y) = cell_position(index);
		game.click_at(x, y).await.unwrap();
	}

	assert_eq!(status(&game).await, "O Wins!");
	let board = board(&game).await;
	assert_eq!([&board[2], &board[4], &board[6]], ["O", "O", "O"]);
}

#[tokio::test]
async fn test_draw() {
	let (game, _target) = connect_default().await;

	// X O X / X O O / O X X
	play(&game, &[0, 1, 2, 4, 3, 5, 7, 6, 8]).await;

	assert_eq!(status(&game).await, "It's a Draw!");
	let winner: String = game.call_as(GAME, "get_winner", &[]).await.unwrap();
	assert!(winner.is_empty());
	assert!(board(&game).await.iter().all(|c| !c.is_empty()));
}

#[tokio::test]
async fn test_restart_button_and_key() {
	let (game, _target) = connect_default().await;

	play(&game, &[0, 4]).await;
	game.click(RESTART).await.unwrap();
	assert!(board(&game).await.iter().all(String::is_empty));
	assert_eq!(status(&game).await, "X's Turn");

	play(&game, &[8]).await;
	game.press_key("R").await.unwrap();
	assert!(board(&game).await.iter().all(String::is_empty));
}

#[tokio::test]
async fn test_reset_via_method_and_screenshot() {
	let (game, _target) = connect_default().await;

	play(&game, &[0, 4, 8]).await;
	let png = game.screenshot(None).await.unwrap();
	assert!(png.starts_with(&playgodot::PNG_SIGNATURE));

	assert_eq!(game.call(GAME, "reset_game", &[]).await.unwrap(), Variant::Nil);
	assert!(board(&game).await.iter().all(String::is_empty));
}
