//! End-to-end tests against the line-delimited JSON dispatcher, feeding
//! requests through an in-memory duplex stream the way a real client would
//! talk to the binary over stdio or a socket.

use mctsd::dispatcher::{self, Host};
use mctsd::schema::SchemaCache;
use mctsd::Registry;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

/// Drives one `serve()` session: writes every request line up front, then
/// reads back responses as they arrive. Good enough for tests that don't
/// care about response ordering across separate requests.
async fn run_session(requests: Vec<Value>) -> Vec<Value> {
    let (client, server) = tokio::io::duplex(1 << 20);
    let (server_read, server_write) = tokio::io::split(server);
    let (mut client_read, mut client_write) = tokio::io::split(client);

    let host = Arc::new(Host {
        registry: Registry::new(),
        schema: SchemaCache::load(std::path::Path::new("schema")).unwrap(),
    });

    let serving = tokio::spawn(dispatcher::serve(server_read, server_write, host));

    for request in &requests {
        let mut line = serde_json::to_vec(request).unwrap();
        line.push(b'\n');
        client_write.write_all(&line).await.unwrap();
    }
    client_write.shutdown().await.unwrap();

    let mut responses = Vec::new();
    let mut lines = tokio::io::BufReader::new(&mut client_read).lines();
    while let Some(line) = lines.next_line().await.unwrap() {
        responses.push(serde_json::from_str(&line).unwrap());
    }

    serving.await.unwrap().unwrap();
    responses
}

fn find_response<'a>(responses: &'a [Value], id: i64) -> &'a Value {
    responses
        .iter()
        .find(|r| r["id"] == json!(id))
        .unwrap_or_else(|| panic!("no response with id {id} in {responses:?}"))
}

#[tokio::test]
async fn plays_a_full_tic_tac_toe_game_to_a_terminal_result() {
    let responses = run_session(vec![
        json!({"id": 1, "type": "add_game", "data": {"type": "tic_tac_toe"}}),
        json!({"id": 2, "type": "add_state", "data": {"gameID": 0}}),
    ])
    .await;

    let game_id = find_response(&responses, 1)["data"]["gameID"].as_u64().unwrap() as u32;
    let state_id = find_response(&responses, 2)["data"]["stateID"].as_u64().unwrap() as u32;
    assert_eq!(game_id, 0);
    assert_eq!(state_id, 0);

    // X plays the top row, O plays the middle row; X wins on move 5.
    let moves = [(0, 0), (1, 0), (0, 1), (1, 1), (0, 2)];
    let mut last = Value::Null;
    for (i, (row, col)) in moves.iter().enumerate() {
        let responses = run_session(vec![json!({
            "id": 100 + i as i64,
            "type": "take_action",
            "data": {
                "gameID": game_id,
                "stateID": state_id,
                "action": {"row": row, "col": col},
            },
        })])
        .await;
        let response = find_response(&responses, 100 + i as i64);
        assert_eq!(response["success"], json!(true), "unexpected error: {response:?}");
        last = response["data"].clone();
    }

    assert_eq!(last["finished"], json!(true));
    let result = last["result"].as_array().expect("terminal result after the winning move");
    assert_eq!(result[0], json!(1.0));
    assert_eq!(result[1], json!(0.0));
}

#[tokio::test]
async fn take_action_rejects_an_occupied_cell() {
    let responses = run_session(vec![
        json!({"id": 1, "type": "add_game", "data": {"type": "tic_tac_toe"}}),
        json!({"id": 2, "type": "add_state", "data": {"gameID": 0}}),
        json!({"id": 3, "type": "take_action", "data": {"gameID": 0, "stateID": 0, "action": {"row": 0, "col": 0}}}),
        json!({"id": 4, "type": "take_action", "data": {"gameID": 0, "stateID": 0, "action": {"row": 0, "col": 0}}}),
    ])
    .await;

    assert_eq!(find_response(&responses, 3)["success"], json!(true));
    let rejected = find_response(&responses, 4);
    assert_eq!(rejected["success"], json!(false));
    assert!(rejected["errMsg"].as_str().unwrap().contains("invalid"));
}

#[tokio::test]
async fn mcts_player_returns_a_legal_move_on_an_empty_board() {
    let responses = run_session(vec![
        json!({"id": 1, "type": "add_game", "data": {"type": "tic_tac_toe"}}),
        json!({"id": 2, "type": "add_state", "data": {"gameID": 0}}),
        json!({
            "id": 3,
            "type": "add_player",
            "data": {
                "gameID": 0,
                "stateID": 0,
                "type": "mcts",
                "data": {
                    "explorationFactor": std::f64::consts::SQRT_2,
                    "parallel": false,
                    "iterations": 200,
                    "actionGenerator": {"type": "default", "data": {}},
                    "rolloutPlayer": {"type": "random_move", "data": {"actionGenerator": {"type": "default", "data": {}}}},
                },
            },
        }),
        json!({"id": 4, "type": "get_best_action", "data": {"gameID": 0, "stateID": 0, "playerID": 0}}),
    ])
    .await;

    let response = find_response(&responses, 4);
    assert_eq!(response["success"], json!(true), "unexpected error: {response:?}");
    let action = &response["data"]["action"];
    assert!(action["row"].as_u64().unwrap() < 3);
    assert!(action["col"].as_u64().unwrap() < 3);
}

#[tokio::test]
async fn unrecognized_opponent_move_rebuilds_the_tree_from_scratch() {
    let responses = run_session(vec![
        json!({"id": 1, "type": "add_game", "data": {"type": "tic_tac_toe"}}),
        json!({"id": 2, "type": "add_state", "data": {"gameID": 0}}),
        json!({
            "id": 3,
            "type": "add_player",
            "data": {
                "gameID": 0,
                "stateID": 0,
                "type": "mcts",
                "data": {
                    "parallel": false,
                    "iterations": 100,
                    "actionGenerator": {"type": "default", "data": {}},
                    "rolloutPlayer": {"type": "random_move", "data": {}},
                },
            },
        }),
        json!({"id": 4, "type": "get_best_action", "data": {"gameID": 0, "stateID": 0, "playerID": 0}}),
        json!({"id": 5, "type": "take_action", "data": {"gameID": 0, "stateID": 0, "action": {"row": 0, "col": 0}}}),
        json!({"id": 6, "type": "query_details", "data": {"gameID": 0, "stateID": 0, "playerID": 0, "data": {}}}),
    ])
    .await;

    let before = find_response(&responses, 4);
    assert_eq!(before["success"], json!(true), "unexpected error: {before:?}");

    let after = find_response(&responses, 6);
    assert_eq!(after["data"]["totalRollouts"], json!(0));
}

#[tokio::test]
async fn unknown_type_reports_an_error_without_killing_the_session() {
    let responses = run_session(vec![
        json!({"id": 1, "type": "not_a_real_type", "data": {}}),
        json!({"id": 2, "type": "add_game", "data": {"type": "tic_tac_toe"}}),
    ])
    .await;

    assert_eq!(find_response(&responses, 1)["success"], json!(false));
    assert_eq!(find_response(&responses, 2)["success"], json!(true));
}

#[tokio::test]
async fn remove_game_cascades_to_its_states() {
    let responses = run_session(vec![
        json!({"id": 1, "type": "add_game", "data": {"type": "tic_tac_toe"}}),
        json!({"id": 2, "type": "add_state", "data": {"gameID": 0}}),
        json!({"id": 3, "type": "remove_game", "data": {"gameID": 0}}),
        json!({"id": 4, "type": "take_action", "data": {"gameID": 0, "stateID": 0, "action": {"row": 0, "col": 0}}}),
    ])
    .await;

    assert_eq!(find_response(&responses, 3)["success"], json!(true));
    let after = find_response(&responses, 4);
    assert_eq!(after["success"], json!(false));
    assert!(after["errMsg"].as_str().unwrap().contains("unknown id"));
}

#[tokio::test]
async fn run_games_plays_random_vs_random_rounds() {
    let responses = run_session(vec![json!({
        "id": 1,
        "type": "run_games",
        "data": {
            "rounds": 5,
            "parallel": false,
            "game": {"type": "tic_tac_toe", "data": {}},
            "players": [
                {"type": "random_move", "data": {}, "allowBackgroundThinking": false},
                {"type": "random_move", "data": {}, "allowBackgroundThinking": false},
            ],
        },
    })])
    .await;

    let response = find_response(&responses, 1);
    assert_eq!(response["success"], json!(true), "unexpected error: {response:?}");
    let results = response["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 5);
    let final_result = response["data"]["finalResult"].as_array().unwrap();
    assert_eq!(final_result.len(), 2);
}

#[tokio::test]
async fn neighbor_generator_seeds_only_the_board_centre_on_a_fresh_gomoku_board() {
    let responses = run_session(vec![
        json!({"id": 1, "type": "add_game", "data": {"type": "gomoku"}}),
        json!({"id": 2, "type": "add_state", "data": {"gameID": 0}}),
        json!({"id": 3, "type": "add_action_generator", "data": {"gameID": 0, "stateID": 0, "type": "neighbor", "data": {}}}),
        json!({"id": 4, "type": "generate_actions", "data": {"gameID": 0, "stateID": 0, "actionGeneratorID": 0}}),
    ])
    .await;

    let response = find_response(&responses, 4);
    assert_eq!(response["success"], json!(true), "unexpected error: {response:?}");
    let actions = response["data"]["actions"].as_array().expect("actions array");
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0], json!({"row": 7, "col": 7}));
}

#[tokio::test]
async fn echo_returns_the_same_data_it_was_sent() {
    let responses = run_session(vec![json!({
        "id": 1,
        "type": "echo",
        "data": {"data": {"hello": "world"}},
    })])
    .await;

    let response = find_response(&responses, 1);
    assert_eq!(response["data"], json!({"hello": "world"}));
}
