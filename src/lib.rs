pub mod actiongen;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod game;
pub mod mcts;
pub mod player;
pub mod rand_engine;
pub mod registry;
pub mod runner;
pub mod schema;
pub mod wire;

pub use config::Config;
pub use error::ServiceError;
pub use registry::Registry;

/// initialize logging: a terminal sink plus a timestamped per-run log file,
/// minus a ctrl-c handler since the binary owns process lifetime, not the
/// library.
pub fn init_logging(log_dir: &std::path::Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)?;
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves forward")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(log_dir.join(format!("{time}.log")))?,
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).map_err(|e| anyhow::anyhow!(e))
}
