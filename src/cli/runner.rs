//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, ReplayMode};
use crate::error::{Error, Result};
use crate::fixture::{Fixture, FixturePager};
use crate::pager::PagerUpdate;
use crate::query::Query;
use crate::types::{Direction, JsonValue};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Replay {
                fixture,
                mode,
                max_pages,
                updates,
            } => self.replay(fixture, *mode, *max_pages, *updates).await,
            Commands::Validate { fixture } => self.validate(fixture),
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    async fn replay(
        &self,
        path: &Path,
        mode: ReplayMode,
        max_pages: Option<usize>,
        print_updates: bool,
    ) -> Result<()> {
        let fixture = Fixture::from_file(path)?;
        let (source, pager) = fixture.pager()?;
        info!(fixture = %path.display(), ?mode, "Replaying fixture");

        let format = self.cli.format;
        let _subscription = print_updates.then(|| {
            pager.subscribe(move |update| output(format, &update_message(update)))
        });

        let start = Instant::now();
        let outcome = drive(&pager, mode, max_pages).await;
        info!(
            pages = pager.page_count(),
            requests = source.total_requests(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Replay finished"
        );

        let mut report = report(&pager);
        report["requests"] = json!(source.total_requests());
        self.output_message(&report);

        outcome
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let fixture = Fixture::from_file(path)?;
        let directions: Vec<&str> = [
            fixture.pagination.forward.as_ref().map(|_| "forward"),
            fixture.pagination.backward.as_ref().map(|_| "backward"),
        ]
        .into_iter()
        .flatten()
        .collect();

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Fixture '{}' is valid with {} follow-up pages ({})",
                    fixture.initial_query().operation_name(),
                    fixture.pages.len(),
                    directions.join(", ")
                )
            }
        }));

        Ok(())
    }

    fn output_message(&self, msg: &Value) {
        output(self.cli.format, msg);
    }
}

// ============================================================================
// Replay
// ============================================================================

/// Load pages according to `mode`, stopping after `max_pages` follow-up pages
async fn drive(pager: &FixturePager, mode: ReplayMode, max_pages: Option<usize>) -> Result<()> {
    if mode == ReplayMode::All && max_pages.is_none() {
        return pager.load_all().await;
    }

    pager.fetch().await?;
    let limit = max_pages.unwrap_or(usize::MAX);

    for direction in [Direction::Forward, Direction::Backward] {
        let enabled = match direction {
            Direction::Forward => matches!(mode, ReplayMode::All | ReplayMode::Forward),
            Direction::Backward => matches!(mode, ReplayMode::All | ReplayMode::Backward),
        };
        if !enabled {
            continue;
        }

        while can_load(pager, direction) && pager.page_count() < limit {
            let before = pager.page_count();
            let loaded = match direction {
                Direction::Forward => pager.load_more().await,
                Direction::Backward => pager.load_previous().await,
            };
            match loaded {
                Err(Error::NoMoreContent { .. }) => break,
                other => other?,
            }
            if pager.page_count() == before {
                warn!(%direction, "Page load added no new page; stopping replay");
                break;
            }
        }
    }

    Ok(())
}

fn can_load(pager: &FixturePager, direction: Direction) -> bool {
    match direction {
        Direction::Forward => pager.can_load_next(),
        Direction::Backward => pager.can_load_previous(),
    }
}

/// Final aggregate and continuation state as a JSON message
fn report(pager: &FixturePager) -> Value {
    let mut message = match pager.current() {
        Some(update) => update_message(&update),
        None => json!({"type": "EMPTY"}),
    };
    message["type"] = json!("RESULT");
    message["page_count"] = json!(pager.page_count());
    message["can_load_next"] = json!(pager.can_load_next());
    message["can_load_previous"] = json!(pager.can_load_previous());
    message
}

fn update_message(update: &PagerUpdate<JsonValue, JsonValue>) -> Value {
    match update {
        Ok(output) => json!({
            "type": "UPDATE",
            "source": output.source,
            "initial": output.initial,
            "pages": output.pages,
        }),
        Err(error) => json!({
            "type": "ERROR",
            "error": error.to_string(),
        }),
    }
}

fn output(format: OutputFormat, msg: &Value) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(msg).unwrap_or_default());
        }
        OutputFormat::Pretty => {
            println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
        }
    }
}
