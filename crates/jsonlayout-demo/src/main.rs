//! Prints a few events as JSON lines.
//!
//! The layout configuration is read as JSON, then the layout serves both as
//! the global `log` backend and directly for events carrying context and an
//! exception.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use jsonlayout::bridge::JsonLogger;
use jsonlayout::event::{Level, LogEvent, Marker, StackFrame, Throwable};
use jsonlayout::{JsonLayout, LayoutConfig};

const CONFIG: &str = r#"{
    "location_info": true,
    "time_zone": "UTC",
    "additional_fields": [
        {"key": "service", "value": "jsonlayout-demo"},
        {"key": "request", "value": "${ctx:request_id:-none}"}
    ],
    "main_args": ["--profile", "local"]
}"#;

fn config() -> Result<LayoutConfig> {
    serde_json::from_str(CONFIG).context("demo configuration is not valid")
}

fn failed_checkout() -> LogEvent {
    let cause = Throwable::new("std::io::Error")
        .with_message("connection refused")
        .with_frame(StackFrame::new("payments::client", "connect", Some("client.rs"), 88))
        .with_frame(StackFrame::new("shop::checkout", "run", Some("checkout.rs"), 14));
    let error = Throwable::new("shop::CheckoutError")
        .with_message("payment provider unavailable")
        .with_frame(StackFrame::new("shop::checkout", "pay", Some("checkout.rs"), 52))
        .with_frame(StackFrame::new("shop::checkout", "run", Some("checkout.rs"), 14))
        .with_cause(Arc::new(cause));

    LogEvent::new(Level::Error, "checkout failed")
        .with_logger("shop::checkout")
        .with_context("request_id", "req-7f3a")
        .with_context("cart_items", 3)
        .with_context_stack(["http", "checkout"])
        .with_marker(Marker::new("PAYMENT"))
        .with_source(StackFrame::new("shop::checkout", "run", Some("checkout.rs"), 14))
        .with_thrown(error)
}

fn main() -> Result<()> {
    let layout = JsonLayout::new(config()?).context("building the layout")?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&layout.to_bytes(&failed_checkout())?)?;
    stdout.write_all(b"\n")?;
    drop(stdout);

    let frames = JsonLayout::new(config()?.with_event_template(
        r#"{"error": "${json:exceptionRootCause:className}", "frames": "${json:exception:stackTrace}", "profile": "${json:main:--profile}"}"#,
    ))?;
    println!("{}", frames.to_string(&failed_checkout())?);

    JsonLogger::new(layout, io::stdout())
        .with_max_level(log::LevelFilter::Info)
        .init()
        .context("installing the logger")?;
    log::info!("demo started");
    log::warn!(target: "shop::inventory", "only {} items left", 2);
    log::debug!("not shown");
    log::logger().flush();

    Ok(())
}
