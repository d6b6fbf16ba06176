use mctsd::actiongen;
use mctsd::game;
use mctsd::mcts::{sequential, MctsConfig};
use serde_json::json;

criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .noise_threshold(3.0)
        .significance_level(0.01)
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(1));
    targets =
        searching_tic_tac_toe_from_empty_board,
        searching_gomoku_from_empty_board,
        enumerating_gomoku_neighbor_candidates,
}

fn searching_tic_tac_toe_from_empty_board(c: &mut criterion::Criterion) {
    let game = game::create("tic_tac_toe", &json!(null)).unwrap();
    let config = MctsConfig {
        iterations: 500,
        ..Default::default()
    };
    c.bench_function("search 500 iterations on an empty tic_tac_toe board", |b| {
        b.iter(|| {
            let state = game.create_default_state();
            let generator = actiongen::create("default", &json!(null)).unwrap();
            sequential::search(game.clone(), generator, state, &config).unwrap()
        })
    });
}

fn searching_gomoku_from_empty_board(c: &mut criterion::Criterion) {
    let game = game::create("gomoku", &json!(null)).unwrap();
    let config = MctsConfig {
        iterations: 500,
        ..Default::default()
    };
    c.bench_function("search 500 iterations on an empty 15x15 gomoku board", |b| {
        b.iter(|| {
            let state = game.create_default_state();
            let generator = actiongen::create("neighbor", &json!(null)).unwrap();
            sequential::search(game.clone(), generator, state, &config).unwrap()
        })
    });
}

fn enumerating_gomoku_neighbor_candidates(c: &mut criterion::Criterion) {
    let game = game::create("gomoku", &json!(null)).unwrap();
    let generator = actiongen::create("neighbor", &json!(null)).unwrap();
    let state = game.create_default_state();
    let data = generator.create_data(game.as_ref(), state.as_ref());
    c.bench_function("enumerate neighbor candidates on an empty 15x15 board", |b| {
        b.iter(|| generator.enumerate(game.as_ref(), state.as_ref(), data.as_ref()))
    });
}
