//! Per-session argument cache.
//!
//! A session owns one [`ArgumentSet`]: exactly one [`ArgumentCell`] per
//! [`ArgumentKind`]. Cells are rebuilt in the background by the session
//! manager's cache loop; the dispatcher only reads snapshots.

mod cell;

pub use cell::{ArgumentCell, ArgumentSnapshot, BuildContext, BuildStatus, parse_offset};

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use herald_plugin::{ArgumentKind, Command, ResolvedArgs};
use herald_types::response::{ErrorObject, ResponseCode, status};

pub struct ArgumentSet {
    cells: BTreeMap<ArgumentKind, ArgumentCell>,
    built_at: Mutex<Option<Instant>>,
    stale: AtomicBool,
}

impl Default for ArgumentSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgumentSet {
    pub fn new() -> Self {
        Self {
            cells: ArgumentKind::ALL
                .into_iter()
                .map(|kind| (kind, ArgumentCell::new(kind)))
                .collect(),
            built_at: Mutex::new(None),
            stale: AtomicBool::new(false),
        }
    }

    pub fn cell(&self, kind: ArgumentKind) -> Option<&ArgumentCell> {
        self.cells.get(&kind)
    }

    pub fn statuses(&self) -> Vec<(ArgumentKind, BuildStatus)> {
        self.cells.values().map(|c| (c.kind(), c.status())).collect()
    }

    /// Rebuild every cell. Returns the number of cells that failed.
    pub async fn build_all(&self, ctx: &BuildContext<'_>) -> usize {
        let mut failed = 0;
        for cell in self.cells.values() {
            if !cell.build(ctx).await.is_successful() {
                failed += 1;
            }
        }
        *self.built_at.lock() = Some(Instant::now());
        self.stale.store(false, Ordering::SeqCst);
        debug!(session_id = %ctx.session_id, failed, "argument set rebuilt");
        failed
    }

    /// Force the next staleness check to report a refresh is due.
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    pub fn built_at(&self) -> Option<Instant> {
        *self.built_at.lock()
    }

    /// Whether the cache is due for a rebuild at `now`.
    pub fn needs_refresh(&self, now: Instant, interval: Duration) -> bool {
        if self.is_stale() {
            return true;
        }
        match self.built_at() {
            Some(built) => now.saturating_duration_since(built) >= interval,
            None => true,
        }
    }

    /// Resolve `kinds` for `command`.
    ///
    /// If any declared kind is not `Successful`, returns the aggregated
    /// errors instead: an `ARGUMENT_BUILD_FAILED` summary followed by each
    /// failing cell's drained error log.
    pub fn resolve(
        &self,
        kinds: &[ArgumentKind],
        command: &Command,
    ) -> Result<ResolvedArgs, Vec<ErrorObject>> {
        let mut failing = Vec::new();
        let mut args = ResolvedArgs::new();
        for kind in kinds {
            let Some(cell) = self.cell(*kind) else {
                continue;
            };
            let snapshot = cell.snapshot();
            if !snapshot.status.is_successful() {
                failing.push((cell, snapshot.status.clone()));
                continue;
            }
            if let Some(value) = cell.value_from(&snapshot, command) {
                args.insert(*kind, value);
            }
        }

        if failing.is_empty() {
            return Ok(args);
        }

        let names: Vec<&str> = failing.iter().map(|(c, _)| c.kind().name()).collect();
        let mut errors = vec![ErrorObject::coded(
            ResponseCode::ArgumentBuildFailed,
            format!("Couldn't build arguments: {}", names.join(", ")),
            status::CONFLICT,
        )];
        let mut seen = HashSet::new();
        for (cell, status) in failing {
            let mut drained = cell.take_errors();
            if drained.is_empty() {
                drained.push(status_error(cell.kind(), &status));
            }
            for error in drained {
                if seen.insert((error.id.clone(), error.text.clone())) {
                    errors.push(error);
                }
            }
        }
        Err(errors)
    }

    /// Drain the error logs of every cell.
    pub fn errors(&self) -> Vec<ErrorObject> {
        self.cells.values().flat_map(|c| c.take_errors()).collect()
    }
}

fn status_error(kind: ArgumentKind, status: &BuildStatus) -> ErrorObject {
    match status {
        BuildStatus::Failed(text) => {
            ErrorObject::coded(ResponseCode::ArgumentBuildFailed, text.clone(), status::CONFLICT)
        }
        _ => ErrorObject::coded(
            ResponseCode::ArgumentBuildFailed,
            format!("Argument {kind} has not been built yet"),
            status::SERVICE_UNAVAILABLE,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKeyStore;
    use chrono::Utc;
    use herald_plugin::{ArgValue, ParsedText};
    use herald_types::records::{ApiKey, ClientRecord, UserRecord};

    fn build_ctx<'a>(
        user: &'a UserRecord,
        client: &'a ClientRecord,
        keys: &'a MemoryKeyStore,
    ) -> BuildContext<'a> {
        BuildContext {
            session_id: "s-1",
            username: &user.username,
            client_id: &client.client_id,
            created: Utc::now(),
            user: Some(user),
            client: Some(client),
            keys,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn one_cell_per_kind() {
        let set = ArgumentSet::new();
        assert_eq!(set.statuses().len(), ArgumentKind::ALL.len());
        assert!(
            set.statuses()
                .iter()
                .all(|(_, s)| *s == BuildStatus::Untried)
        );
        assert!(set.needs_refresh(Instant::now(), Duration::from_secs(900)));
    }

    #[tokio::test]
    async fn resolve_success() {
        let user = UserRecord::new("ada").with_setting("temp_unit", "celsius");
        let client = ClientRecord::new("cli");
        let keys = MemoryKeyStore::new(
            vec![ApiKey::new("weather", "w1", None)],
            Duration::from_secs(60),
        );
        let set = ArgumentSet::new();
        set.build_all(&build_ctx(&user, &client, &keys)).await;

        let cmd = Command::new("weather", ParsedText::default());
        let args = set
            .resolve(
                &[ArgumentKind::TempUnit, ArgumentKind::WeatherApi, ArgumentKind::CommandText],
                &cmd,
            )
            .unwrap();
        assert_eq!(args.text(ArgumentKind::TempUnit).unwrap(), "celsius");
        assert_eq!(args.key(ArgumentKind::WeatherApi).unwrap().value.expose(), "w1");
        assert_eq!(args.get(ArgumentKind::CommandText), Some(&ArgValue::Text("weather".into())));
        assert!(!set.needs_refresh(Instant::now(), Duration::from_secs(900)));
    }

    #[tokio::test]
    async fn resolve_aggregates_failures() {
        let user = UserRecord::new("ada");
        let client = ClientRecord::new("cli");
        let keys = MemoryKeyStore::new(Vec::new(), Duration::from_secs(60));
        let set = ArgumentSet::new();
        set.build_all(&build_ctx(&user, &client, &keys)).await;

        let cmd = Command::new("q", ParsedText::default());
        let errors = set
            .resolve(&[ArgumentKind::WolframApi, ArgumentKind::TempUnit], &cmd)
            .unwrap_err();
        let ids: Vec<&str> = errors.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["ARGUMENT_BUILD_FAILED", "KEY_NOT_AVAILABLE", "SETTING_ARGUMENT_INVALID"]
        );
        assert_eq!(errors[1].text, "No valid API keys found of type wolfram");

        // The logs are drained, but the status still fails the next request.
        let again = set.resolve(&[ArgumentKind::WolframApi], &cmd).unwrap_err();
        assert_eq!(again[1].text, "No valid API keys found of type wolfram");
        assert_eq!(again[1].id, "ARGUMENT_BUILD_FAILED");
    }

    #[tokio::test]
    async fn unbuilt_cells_fail_resolution() {
        let set = ArgumentSet::new();
        let cmd = Command::new("q", ParsedText::default());
        let errors = set.resolve(&[ArgumentKind::ClientId], &cmd).unwrap_err();
        assert_eq!(errors[1].status, status::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn stale_flag_forces_refresh() {
        let user = UserRecord::new("ada");
        let client = ClientRecord::new("cli");
        let keys = MemoryKeyStore::new(Vec::new(), Duration::from_secs(60));
        let set = ArgumentSet::new();
        set.build_all(&build_ctx(&user, &client, &keys)).await;
        assert!(!set.needs_refresh(Instant::now(), Duration::from_secs(900)));
        set.mark_stale();
        assert!(set.needs_refresh(Instant::now(), Duration::from_secs(900)));
        let later = Instant::now() + Duration::from_secs(901);
        set.build_all(&build_ctx(&user, &client, &keys)).await;
        assert!(set.needs_refresh(later, Duration::from_secs(900)));
    }
}
