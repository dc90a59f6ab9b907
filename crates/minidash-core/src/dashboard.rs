//! Dashboard state driven by the five user commands.
//!
//! This is the presentation-neutral half of the client: it owns the item
//! list, the selection and the last error, and runs every command through
//! its own [`SingleFlight`] guard. A front end renders [`Dashboard::snapshot`]
//! however it likes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::api::CatalogApi;
use crate::cache::{ClientError, ResilientClient};
use crate::command::{CommandError, SingleFlight};
use crate::models::Item;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Busy(#[from] CommandError),

    #[error("No item selected")]
    NoSelection,

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Everything a view needs to draw the dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub items: Vec<Item>,
    pub selected: Option<Item>,
    pub search_text: String,
    pub error_message: Option<String>,
    pub is_loading: bool,
    /// Set when `items` came from the offline snapshot.
    pub stale_since: Option<DateTime<Utc>>,
    in_flight: usize,
}

impl DashboardState {
    fn begin(&mut self) {
        self.in_flight += 1;
        self.is_loading = true;
        self.error_message = None;
    }

    fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.is_loading = self.in_flight > 0;
    }
}

pub struct Dashboard<A> {
    client: ResilientClient<A>,
    state: Mutex<DashboardState>,
    load_command: SingleFlight,
    search_command: SingleFlight,
    add_command: SingleFlight,
    update_command: SingleFlight,
    delete_command: SingleFlight,
}

impl<A: CatalogApi> Dashboard<A> {
    pub fn new(client: ResilientClient<A>) -> Self {
        Self {
            client,
            state: Mutex::new(DashboardState::default()),
            load_command: SingleFlight::new("Load"),
            search_command: SingleFlight::new("Search"),
            add_command: SingleFlight::new("Add"),
            update_command: SingleFlight::new("Update"),
            delete_command: SingleFlight::new("Delete"),
        }
    }

    pub fn client(&self) -> &ResilientClient<A> {
        &self.client
    }

    /// Copy of the current state for rendering.
    pub async fn snapshot(&self) -> DashboardState {
        self.state.lock().await.clone()
    }

    /// Commands that are not currently running, for enabling buttons.
    pub fn available_commands(&self) -> Vec<&'static str> {
        [
            &self.load_command,
            &self.search_command,
            &self.add_command,
            &self.update_command,
            &self.delete_command,
        ]
        .into_iter()
        .filter(|c| c.can_execute())
        .map(|c| c.name())
        .collect()
    }

    /// Select the listed item with `id`. Returns whether it was found.
    pub async fn select(&self, id: i64) -> bool {
        let mut state = self.state.lock().await;
        state.selected = state.items.iter().find(|i| i.id == id).cloned();
        state.selected.is_some()
    }

    /// Reload the full list.
    pub async fn load(&self) -> Result<usize, DashboardError> {
        self.load_command
            .run(|| self.refresh(None, "Failed to load items"))
            .await?
    }

    /// Reload the list narrowed to names containing `text`.
    pub async fn search(&self, text: &str) -> Result<usize, DashboardError> {
        self.search_command
            .run(|| async {
                self.state.lock().await.search_text = text.to_string();
                self.refresh(Some(text), "Search failed").await
            })
            .await?
    }

    async fn refresh(&self, search: Option<&str>, context: &str) -> Result<usize, DashboardError> {
        self.state.lock().await.begin();
        let result = self.client.get_items(search).await;

        let mut state = self.state.lock().await;
        state.finish();
        match result {
            Ok(fetched) => {
                state.stale_since = fetched.cached_at();
                state.items = fetched.into_data();
                if let Some(selected) = state.selected.as_ref().map(|s| s.id) {
                    state.selected = state.items.iter().find(|i| i.id == selected).cloned();
                }
                debug!(count = state.items.len(), stale = state.stale_since.is_some(), "Items refreshed");
                Ok(state.items.len())
            }
            Err(e) => {
                state.error_message = Some(format!("{}: {}", context, e));
                Err(DashboardError::from(e))
            }
        }
    }

    /// Create an item and select it.
    pub async fn add(
        &self,
        name: &str,
        description: &str,
        price: Decimal,
    ) -> Result<Item, DashboardError> {
        self.add_command
            .run(|| async {
                self.state.lock().await.begin();
                let result = self
                    .client
                    .add_item(&Item::new(name, description, price))
                    .await;

                let mut state = self.state.lock().await;
                state.finish();
                match result {
                    Ok(created) => {
                        state.items.push(created.clone());
                        state.selected = Some(created.clone());
                        Ok(created)
                    }
                    Err(e) => {
                        state.error_message = Some(format!("Add failed: {}", e));
                        Err(DashboardError::from(e))
                    }
                }
            })
            .await?
    }

    /// Save `item` and refresh its row.
    pub async fn update(&self, item: Item) -> Result<(), DashboardError> {
        self.update_command
            .run(|| async {
                self.state.lock().await.begin();
                let result = self.client.update_item(&item).await;

                let mut state = self.state.lock().await;
                state.finish();
                match result {
                    Ok(()) => {
                        if let Some(row) = state.items.iter_mut().find(|i| i.id == item.id) {
                            *row = item.clone();
                        }
                        state.selected = Some(item);
                        Ok(())
                    }
                    Err(e) => {
                        state.error_message = Some(format!("Update failed: {}", e));
                        Err(DashboardError::from(e))
                    }
                }
            })
            .await?
    }

    /// Delete the selected item.
    pub async fn delete(&self) -> Result<i64, DashboardError> {
        self.delete_command
            .run(|| async {
                let Some(id) = self.state.lock().await.selected.as_ref().map(|s| s.id) else {
                    return Err(DashboardError::NoSelection);
                };
                self.remove(id).await
            })
            .await?
    }

    /// Delete by id, whether or not the item is in the current list.
    /// The backend treats unknown ids as already deleted.
    pub async fn delete_id(&self, id: i64) -> Result<i64, DashboardError> {
        self.delete_command.run(|| self.remove(id)).await?
    }

    async fn remove(&self, id: i64) -> Result<i64, DashboardError> {
        self.state.lock().await.begin();
        let result = self.client.delete_item(id).await;

        let mut state = self.state.lock().await;
        state.finish();
        match result {
            Ok(()) => {
                state.items.retain(|i| i.id != id);
                if state.selected.as_ref().is_some_and(|s| s.id == id) {
                    state.selected = None;
                }
                Ok(id)
            }
            Err(e) => {
                state.error_message = Some(format!("Delete failed: {}", e));
                Err(DashboardError::from(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::cache::resilient::tests::{item_a, item_b, FakeApi};
    use crate::cache::CacheManager;
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    fn dashboard(api: FakeApi) -> (Dashboard<FakeApi>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        (Dashboard::new(ResilientClient::new(api, cache)), dir)
    }

    #[tokio::test]
    async fn test_load_then_offline_load_marks_stale() {
        let (dashboard, _dir) = dashboard(FakeApi::with_items(vec![item_a(), item_b()]));

        assert_eq!(dashboard.load().await.unwrap(), 2);
        let state = dashboard.snapshot().await;
        assert!(state.stale_since.is_none());
        assert!(!state.is_loading);

        dashboard.client().api().set_offline(true);
        assert_eq!(dashboard.load().await.unwrap(), 2);
        let state = dashboard.snapshot().await;
        assert!(state.stale_since.is_some());
        assert!(state.error_message.is_none());
    }

    #[tokio::test]
    async fn test_load_failure_without_snapshot_sets_error() {
        let api = FakeApi::with_items(vec![item_a()]);
        api.set_offline(true);
        let (dashboard, _dir) = dashboard(api);

        assert!(matches!(dashboard.load().await, Err(DashboardError::Client(_))));
        let state = dashboard.snapshot().await;
        assert!(state.error_message.unwrap().starts_with("Failed to load items:"));
        assert!(state.items.is_empty());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_search_records_text_and_filters() {
        let (dashboard, _dir) = dashboard(FakeApi::with_items(vec![item_a(), item_b()]));

        assert_eq!(dashboard.search("keyboard").await.unwrap(), 1);
        let state = dashboard.snapshot().await;
        assert_eq!(state.search_text, "keyboard");
        assert_eq!(state.items, vec![item_a()]);
    }

    #[tokio::test]
    async fn test_add_update_delete_flow() {
        let (dashboard, _dir) = dashboard(FakeApi::with_items(vec![item_a()]));
        dashboard.load().await.unwrap();

        let created = dashboard.add("Dock", "USB-C", Decimal::new(8900, 2)).await.unwrap();
        assert_eq!(created.id, 2);
        assert_eq!(dashboard.snapshot().await.selected, Some(created.clone()));

        let mut renamed = created.clone();
        renamed.name = "Dock Pro".to_string();
        dashboard.update(renamed.clone()).await.unwrap();
        assert_eq!(dashboard.snapshot().await.items[1], renamed);

        assert_eq!(dashboard.delete().await.unwrap(), 2);
        let state = dashboard.snapshot().await;
        assert_eq!(state.items, vec![item_a()]);
        assert!(state.selected.is_none());
    }

    #[tokio::test]
    async fn test_delete_without_selection() {
        let (dashboard, _dir) = dashboard(FakeApi::with_items(vec![item_a()]));
        dashboard.load().await.unwrap();

        assert!(matches!(dashboard.delete().await, Err(DashboardError::NoSelection)));
        assert!(dashboard.select(1).await);
        assert!(!dashboard.select(99).await);
    }

    #[tokio::test]
    async fn test_delete_id_goes_to_backend_without_listing() {
        let (dashboard, _dir) = dashboard(FakeApi::with_items(vec![item_a(), item_b()]));

        // Nothing loaded yet, so the item is not in the local list.
        assert_eq!(dashboard.delete_id(2).await.unwrap(), 2);
        assert_eq!(dashboard.client().api().writes.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(*dashboard.client().api().items.lock().unwrap(), vec![item_a()]);

        // Unknown ids are not an error either.
        assert_eq!(dashboard.delete_id(99).await.unwrap(), 99);
        assert!(dashboard.snapshot().await.error_message.is_none());
    }

    #[tokio::test]
    async fn test_delete_id_keeps_other_selection() {
        let (dashboard, _dir) = dashboard(FakeApi::with_items(vec![item_a(), item_b()]));
        dashboard.load().await.unwrap();
        dashboard.select(1).await;

        dashboard.delete_id(2).await.unwrap();
        let state = dashboard.snapshot().await;
        assert_eq!(state.items, vec![item_a()]);
        assert_eq!(state.selected, Some(item_a()));
    }

    #[tokio::test]
    async fn test_write_failure_is_explicit() {
        let (dashboard, _dir) = dashboard(FakeApi::with_items(vec![item_a()]));
        dashboard.load().await.unwrap();
        dashboard.select(1).await;
        dashboard.client().api().set_offline(true);

        let err = dashboard.delete().await.unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Client(ClientError::Transport(ApiError::Unavailable(_)))
        ));
        let state = dashboard.snapshot().await;
        assert!(state.error_message.unwrap().starts_with("Delete failed:"));
        assert_eq!(state.items, vec![item_a()]);
    }

    #[tokio::test]
    async fn test_rejected_search_keeps_search_text() {
        let gate = Arc::new(Semaphore::new(0));
        let dir = tempfile::tempdir().unwrap();
        let api = GatedApi {
            inner: FakeApi::with_items(vec![item_a(), item_b()]),
            gate: gate.clone(),
        };
        let dashboard = Dashboard::new(ResilientClient::new(
            api,
            CacheManager::new(dir.path().to_path_buf()).unwrap(),
        ));

        let first = dashboard.search("keyboard");
        tokio::pin!(first);
        assert!(futures::poll!(first.as_mut()).is_pending());
        assert_eq!(dashboard.snapshot().await.search_text, "keyboard");

        let second = dashboard.search("mouse").await;
        assert!(matches!(second, Err(DashboardError::Busy(CommandError::Busy("Search")))));
        assert_eq!(dashboard.snapshot().await.search_text, "keyboard");

        gate.add_permits(1);
        assert_eq!(first.await.unwrap(), 1);
        let state = dashboard.snapshot().await;
        assert_eq!(state.search_text, "keyboard");
        assert_eq!(state.items, vec![item_a()]);
    }

    /// Backend whose calls wait for a permit, so a command can be held open.
    struct GatedApi {
        inner: FakeApi,
        gate: Arc<Semaphore>,
    }

    impl CatalogApi for GatedApi {
        async fn fetch_items(&self, search: Option<&str>) -> Result<Vec<Item>, ApiError> {
            let _permit = self.gate.acquire().await.unwrap();
            self.inner.fetch_items(search).await
        }

        async fn fetch_item(&self, id: i64) -> Result<Item, ApiError> {
            self.inner.fetch_item(id).await
        }

        async fn add_item(&self, item: &Item) -> Result<Item, ApiError> {
            let _permit = self.gate.acquire().await.unwrap();
            self.inner.add_item(item).await
        }

        async fn update_item(&self, item: &Item) -> Result<(), ApiError> {
            self.inner.update_item(item).await
        }

        async fn delete_item(&self, id: i64) -> Result<(), ApiError> {
            self.inner.delete_item(id).await
        }
    }

    #[tokio::test]
    async fn test_double_add_is_rejected_while_pending() {
        let gate = Arc::new(Semaphore::new(0));
        let dir = tempfile::tempdir().unwrap();
        let api = GatedApi {
            inner: FakeApi::default(),
            gate: gate.clone(),
        };
        let dashboard = Dashboard::new(ResilientClient::new(
            api,
            CacheManager::new(dir.path().to_path_buf()).unwrap(),
        ));

        let first = dashboard.add("Tablet", "", Decimal::new(19900, 2));
        tokio::pin!(first);
        assert!(futures::poll!(first.as_mut()).is_pending());
        assert!(dashboard.snapshot().await.is_loading);
        assert!(!dashboard.available_commands().contains(&"Add"));

        let second = dashboard.add("Tablet", "", Decimal::new(19900, 2)).await;
        assert!(matches!(second, Err(DashboardError::Busy(CommandError::Busy("Add")))));

        // Other commands stay available while Add is pending.
        assert!(dashboard.available_commands().contains(&"Load"));

        gate.add_permits(1);
        let created = first.await.unwrap();
        assert_eq!(created.id, 1);
        // The permit went back to the gate when the add finished.
        assert_eq!(dashboard.load().await.unwrap(), 1);
        assert_eq!(dashboard.client().api().inner.writes.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(dashboard.available_commands().contains(&"Add"));
        assert!(!dashboard.snapshot().await.is_loading);
    }
}
