// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/utils/logging.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// log4rs setup for the ppminer binary: console appender plus an optional file
// appender, both with the same pattern.
//
// Tree Location:
// - src/utils/logging.rs (log4rs console and file setup)
// - Depends on: log4rs

use anyhow::{Context, Result};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;
use std::str::FromStr;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {h({l:5})} [{t}] {m}{n}";

pub fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let level = LevelFilter::from_str(level).with_context(|| format!("Invalid log level '{}'", level))?;

    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();
    let mut config = Config::builder().appender(Appender::builder().build("console", Box::new(console)));
    let mut root = Root::builder().appender("console");

    if let Some(path) = log_file {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build(path)
            .with_context(|| format!("Could not open log file {:?}", path))?;
        config = config.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    let config = config.build(root.build(level)).context("Invalid logging configuration")?;
    log4rs::init_config(config).context("Logging already initialised")?;
    Ok(())
}

// Changelog:
// - v1.0.0 (2025-07-02): Programmatic log4rs configuration.
