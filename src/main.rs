//! hookwire demo — routes a few messages through the hook pipeline.
//!
//! Wires configuration, logging and the hook engine together the same way a
//! flow runtime would: a tracer scope observes every routing stage, a
//! breakpoint halts delivery of selected messages, and an async audit hook
//! runs after delivery.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt};

use hookwire_core::config::AppConfig;
use hookwire_core::error::AppError;
use hookwire_hooks::prelude::*;

/// Routing stages a message passes through, in order.
const ROUTE: [HookPoint; 4] = [
    HookPoint::OnSend,
    HookPoint::PreRoute,
    HookPoint::PreDeliver,
    HookPoint::PostDeliver,
];

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Demo error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("HOOKWIRE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting hookwire demo v{}", env!("CARGO_PKG_VERSION"));

    let registry = Arc::new(HookRegistry::from_config(&config.hooks));
    let dispatcher = HookDispatcher::from_config(registry.clone(), &config.hooks);

    // ── Tracer: records every stage a message reaches ────────────
    let tracer = HookScope::new(registry.clone(), "tracer");
    for point in ROUTE {
        tracer.add(
            point,
            Handler::sync(move |p: &mut HookPayload| {
                p.append("trace", json!(point.as_str()));
                Ok(HookAction::Continue)
            }),
        )?;
    }

    // ── Breakpoint: holds back messages on a paused topic ────────
    registry.add(
        "preDeliver.breakpoint",
        Handler::callback(|payload: PayloadHandle, done: Done| {
            tokio::spawn(async move {
                let paused = payload.lock().await.get_string("topic") == Some("paused");
                if paused {
                    done.halt();
                } else {
                    done.proceed();
                }
            });
        }),
    )?;

    // ── Audit: slow async bookkeeping after delivery ─────────────
    registry.add(
        "postDeliver.audit",
        Handler::future(|payload: PayloadHandle| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let mut p = payload.lock().await;
            if p.get_string("topic").is_none() {
                return Err(AppError::validation("message has no topic"));
            }
            p.set("audited", json!(true));
            Ok(HookAction::Continue)
        }),
    )?;

    for topic in [Some("sensors"), Some("paused"), None] {
        let mut payload = HookPayload::new();
        if let Some(topic) = topic {
            payload.set("topic", json!(topic));
        }
        let payload = PayloadHandle::new(payload);

        match route(&dispatcher, &payload).await {
            Ok(outcome) => {
                let p = payload.lock().await;
                tracing::info!(
                    message_id = %p.id,
                    topic = topic.unwrap_or("-"),
                    outcome = ?outcome,
                    trace = ?p.strings("trace"),
                    audited = p.get_bool("audited").unwrap_or(false),
                    "Message routed"
                );
            }
            Err(e) => {
                tracing::warn!(topic = topic.unwrap_or("-"), error = %e, "Message dropped");
            }
        }
    }

    tracer.close()?;
    tracing::info!(active_points = ?registry.states(), "Demo finished");

    Ok(())
}

/// Runs a message through every routing stage, stopping at the first halt.
async fn route(
    dispatcher: &HookDispatcher,
    payload: &PayloadHandle,
) -> Result<TriggerOutcome, HookError> {
    for point in ROUTE {
        if !dispatcher.registry().is_active(point.as_str()) {
            continue;
        }
        if dispatcher.trigger(point.as_str(), payload).await?.is_halted() {
            return Ok(TriggerOutcome::Halted);
        }
    }
    Ok(TriggerOutcome::Completed)
}
