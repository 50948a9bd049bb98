//! Basic logger usage example
//!
//! Demonstrates the syslog facade, call-site tags, request context and a
//! second sink with its own threshold.
//!
//! Run with: cargo run --example basic_usage

use context_logger_system::prelude::*;
use context_logger_system::{info, warn};

struct Checkout {
    order: u64,
    customer: Option<u64>,
}

impl WorkUnit for Checkout {
    fn acting_user_id(&self) -> Option<String> {
        self.customer.map(|id| id.to_string())
    }

    fn event_id(&self) -> Option<String> {
        Some(format!("order-{}", self.order))
    }
}

#[derive(Debug)]
struct Cart {
    items: u32,
    total_cents: u64,
}

fn main() -> Result<()> {
    println!("=== Context Logger System - Basic Usage Example ===\n");

    // Console at debug, plus a file that keeps warnings and worse
    let logger = Logger::<Syslog>::new();
    logger.add_sink(
        SinkConfig::new("file", "warn").with_timestamp(true),
        Box::new(FileSink::new("application.log")?),
    );

    println!("1. Logging at different levels:");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.notice("This is a notice");
    logger.warn("This is a warning message");
    logger.error("This is an error message");
    logger.crit("This is a critical message");

    println!("\n2. Mixed arguments:");
    logger.info(("user", 42, "logged in", true));
    let cart = Cart {
        items: 3,
        total_cents: 4599,
    };
    info!(logger, "cart", ?cart);

    println!("\n3. Logging inside a request context:");
    let checkout = Checkout {
        order: 1001,
        customer: Some(7),
    };
    logger.setup_context(&checkout, || {
        logger.info("charging card");
        warn!(logger, "card declined, retrying", 1);
    });

    let anonymous = Checkout {
        order: 1002,
        customer: None,
    };
    logger.setup_context(&anonymous, || logger.info("guest checkout"));

    logger.flush();

    println!("\n=== Example completed successfully! ===");
    println!("Check 'application.log' for warnings and worse");

    Ok(())
}
