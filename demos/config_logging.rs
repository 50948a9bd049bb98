//! Configuration example
//!
//! Builds a logger from JSON configuration, including a custom transport
//! kind and an unknown one that is skipped with a warning.
//!
//! Run with: cargo run --example config_logging

use context_logger_system::prelude::*;

const CONFIG: &str = r#"{
    "console": { "level": "info", "colorize": true },
    "syslog": false,
    "global": { "call_site": "caller", "inspect_depth": 3 },
    "transports": [
        { "type": "file", "data": { "name": "audit", "path": "audit.log", "level": "warn", "timestamp": true } },
        { "type": "stderr", "data": { "level": "error" } },
        { "type": "kafka", "data": { "brokers": ["k1:9092"] } }
    ]
}"#;

fn main() -> Result<()> {
    println!("=== Context Logger System - Configuration Example ===\n");

    let config = LoggerConfig::from_json_str(CONFIG)?;
    let kinds =
        SinkKinds::builtin().with("stderr", |_| Ok(Box::new(StreamSink::stderr()) as Box<dyn Sink>));

    println!("1. Building (the kafka transport is reported and skipped):");
    let logger = config.build_with_kinds::<Syslog>(&kinds);
    println!("   sinks: {:?}", logger.sink_names());

    println!("\n2. Each sink filters on its own threshold:");
    logger.debug("hidden everywhere");
    logger.info("console only");
    logger.warn("console and audit");
    logger.error("console, audit and stderr");

    println!("\n3. Nested values stop at the configured depth:");
    logger.info((
        "payload",
        serde_json::json!({ "a": { "b": { "c": { "d": "deep" } } } }),
    ));

    println!("\n4. TOML works too:");
    let toml_logger = LoggerConfig::from_toml_str(
        r#"
        console = { level = "debug" }

        [global]
        call_site = "disabled"
        "#,
    )?
    .build::<Npm>();
    toml_logger.silly("below the console threshold");
    toml_logger.verbose("npm levels, no call-site tag");

    logger.flush();

    println!("\n=== Example completed successfully! ===");
    println!("Check 'audit.log' for warnings and worse");

    Ok(())
}
