//! Backend access for tasks, status columns and priorities.
//!
//! `TaskGateway` is the seam between the board and whatever stores the
//! entities. `RestGateway` talks to the project-management REST API;
//! `InMemoryGateway` keeps everything in process for `--offline` use.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::db::Board;
use crate::error::{BoardError, Result};
use crate::fields::{Column, ItemId, Priority};
use crate::task::{Task, TaskDraft, TaskUpdate};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:5140/api";

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "TASKBOARD_API_URL";

/// Environment variable holding a bearer token.
pub const TOKEN_ENV: &str = "TASKBOARD_TOKEN";

/// Get the API base URL from the flag, then the environment, then the default.
pub fn get_api_url(flag: Option<&str>) -> String {
    if let Some(url) = flag {
        return url.to_string();
    }
    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.trim().is_empty() {
            return url;
        }
    }
    DEFAULT_API_URL.to_string()
}

/// Operations the board needs from its entity store.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    /// Fetch tasks, scoped to one project board when given.
    async fn fetch_tasks(&self, project_board: Option<&str>) -> Result<Vec<Task>>;
    async fn fetch_columns(&self) -> Result<Vec<Column>>;
    async fn fetch_priorities(&self) -> Result<Vec<Priority>>;
    async fn create_task(&self, draft: &TaskDraft) -> Result<Task>;
    async fn update_task(&self, id: &ItemId, update: &TaskUpdate) -> Result<()>;
    async fn delete_task(&self, id: &ItemId) -> Result<()>;
    async fn create_column(&self, column: &Column) -> Result<()>;
    async fn rename_column(&self, id: &ItemId, name: &str) -> Result<()>;
}

/// Fetch columns, tasks and priorities into a fresh board.
///
/// Priorities only decorate cards, so failing to load them is not fatal.
pub async fn fetch_board(gateway: &dyn TaskGateway, project_board: Option<&str>) -> Result<Board> {
    let columns = gateway.fetch_columns().await?;
    let tasks = gateway.fetch_tasks(project_board).await?;
    let priorities = gateway.fetch_priorities().await.unwrap_or_else(|e| {
        warn!(error = %e, "could not load priorities");
        Vec::new()
    });
    debug!(columns = columns.len(), tasks = tasks.len(), "board fetched");
    Ok(Board::new(columns, tasks).with_priorities(priorities))
}

/// Responses come either bare or wrapped in `{ "data": ... }` depending on the endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(data) => data,
        }
    }
}

/// Wire shape of a status column.
#[derive(Serialize)]
struct StatusBody<'a> {
    id: &'a str,
    name: &'a str,
}

/// Extract a human-readable message from an error body.
///
/// Tries `message`, then `title`, then falls back to the raw body.
fn extract_error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "title"] {
            if let Some(msg) = json.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    body.to_string()
}

/// Client for the project-management REST API.
pub struct RestGateway {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RestGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            token: std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map a non-success response to `BoardError::Api`.
    async fn check_response(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BoardError::Api {
            status: status.as_u16(),
            body: extract_error_message(&body),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self.authorize(self.client.get(&url)).send().await?;
        let response = Self::check_response(response).await?;
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.into_inner())
    }

    async fn send_json<B: Serialize + ?Sized>(&self, request: RequestBuilder, body: &B) -> Result<Response> {
        let response = self.authorize(request).json(body).send().await?;
        Self::check_response(response).await
    }
}

#[async_trait]
impl TaskGateway for RestGateway {
    async fn fetch_tasks(&self, project_board: Option<&str>) -> Result<Vec<Task>> {
        match project_board {
            Some(board) => self.get(&format!("TaskCard/projectBoard/{board}")).await,
            None => self.get("TaskCard").await,
        }
    }

    async fn fetch_columns(&self) -> Result<Vec<Column>> {
        self.get("Status").await
    }

    async fn fetch_priorities(&self) -> Result<Vec<Priority>> {
        self.get("Priority").await
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task> {
        let request = self.client.post(self.url("TaskCard"));
        let response = self.send_json(request, draft).await?;
        let envelope: Envelope<Task> = response.json().await?;
        Ok(envelope.into_inner())
    }

    async fn update_task(&self, id: &ItemId, update: &TaskUpdate) -> Result<()> {
        let request = self.client.put(self.url(&format!("TaskCard/{id}")));
        self.send_json(request, update).await?;
        Ok(())
    }

    async fn delete_task(&self, id: &ItemId) -> Result<()> {
        let request = self.client.delete(self.url(&format!("TaskCard/{id}")));
        let response = self.authorize(request).send().await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn create_column(&self, column: &Column) -> Result<()> {
        let body = StatusBody {
            id: column.id.as_str(),
            name: &column.title,
        };
        let request = self.client.post(self.url("Status"));
        self.send_json(request, &body).await?;
        Ok(())
    }

    async fn rename_column(&self, id: &ItemId, name: &str) -> Result<()> {
        let body = StatusBody { id: id.as_str(), name };
        let request = self.client.put(self.url(&format!("Status/{id}")));
        self.send_json(request, &body).await?;
        Ok(())
    }
}

#[derive(Default)]
struct MemoryState {
    columns: Vec<Column>,
    tasks: Vec<Task>,
    priorities: Vec<Priority>,
    updates: Vec<(ItemId, TaskUpdate)>,
    next_id: u64,
}

/// Entity store kept in process memory.
pub struct InMemoryGateway {
    state: Mutex<MemoryState>,
}

impl InMemoryGateway {
    pub fn new(columns: Vec<Column>, tasks: Vec<Task>, priorities: Vec<Priority>) -> Self {
        let next_id = tasks.len() as u64 + 1;
        Self {
            state: Mutex::new(MemoryState {
                columns,
                tasks,
                priorities,
                updates: Vec::new(),
                next_id,
            }),
        }
    }

    /// A small two-lane board for trying the interface without a backend.
    pub fn demo() -> Self {
        let columns = vec![Column::new("WIP", "WIP"), Column::new("done", "Done")];
        let priorities = vec![
            Priority { id: ItemId::from("high"), name: "High".into() },
            Priority { id: ItemId::from("low"), name: "Low".into() },
        ];
        let mut tasks = vec![
            Task::new("task-1", "WIP", "Sketch the board layout"),
            Task::new("task-2", "WIP", "Wire up the status endpoint"),
            Task::new("task-3", "WIP", "Keyboard drag and drop"),
            Task::new("task-4", "done", "Project skeleton"),
        ];
        tasks[0].priority_id = Some(ItemId::from("high"));
        tasks[2].priority_id = Some(ItemId::from("low"));
        Self::new(columns, tasks, priorities)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every update request received, in arrival order.
    #[cfg(test)]
    pub fn updates(&self) -> Vec<(ItemId, TaskUpdate)> {
        self.state().updates.clone()
    }
}

#[async_trait]
impl TaskGateway for InMemoryGateway {
    async fn fetch_tasks(&self, _project_board: Option<&str>) -> Result<Vec<Task>> {
        Ok(self.state().tasks.clone())
    }

    async fn fetch_columns(&self) -> Result<Vec<Column>> {
        Ok(self.state().columns.clone())
    }

    async fn fetch_priorities(&self) -> Result<Vec<Priority>> {
        Ok(self.state().priorities.clone())
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task> {
        let mut state = self.state();
        if !state.columns.iter().any(|c| c.id == draft.column_id) {
            return Err(BoardError::column_not_found(&draft.column_id));
        }
        let id = ItemId::new(format!("task-{}", state.next_id));
        state.next_id += 1;

        let mut task = Task::new(id, draft.column_id.clone(), draft.title.clone());
        task.description = draft.description.clone();
        task.priority_id = draft.priority_id.clone();
        task.due_date = draft.due_date.clone();
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &ItemId, update: &TaskUpdate) -> Result<()> {
        let mut state = self.state();
        state.updates.push((id.clone(), update.clone()));
        let task = state
            .tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| BoardError::task_not_found(id))?;
        task.title = update.title.clone();
        task.description = update.description.clone();
        task.priority_id = update.priority_id.clone();
        task.due_date = update.due_date.clone();
        task.column_id = update.status_id.clone();
        Ok(())
    }

    async fn delete_task(&self, id: &ItemId) -> Result<()> {
        let mut state = self.state();
        let before = state.tasks.len();
        state.tasks.retain(|t| &t.id != id);
        if state.tasks.len() == before {
            return Err(BoardError::task_not_found(id));
        }
        Ok(())
    }

    async fn create_column(&self, column: &Column) -> Result<()> {
        self.state().columns.push(column.clone());
        Ok(())
    }

    async fn rename_column(&self, id: &ItemId, name: &str) -> Result<()> {
        let mut state = self.state();
        let column = state
            .columns
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| BoardError::column_not_found(id))?;
        column.title = name.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_get_api_url_prefers_flag() {
        assert_eq!(get_api_url(Some("http://example.test/api")), "http://example.test/api");
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(extract_error_message(r#"{"message":"nope"}"#), "nope");
        assert_eq!(extract_error_message(r#"{"title":"Bad Request"}"#), "Bad Request");
        assert_eq!(extract_error_message("plain"), "plain");
    }

    #[tokio::test]
    async fn test_fetch_tasks_unwraps_data_envelope() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/TaskCard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": "t1", "statusId": "wip", "title": "One", "description": "d"},
                    {"id": "t2", "statusId": "done", "title": "Two", "description": ""}
                ]
            })))
            .mount(&mock_server)
            .await;

        let gateway = RestGateway::new(format!("{}/api/", mock_server.uri())).with_token(None);
        let tasks = gateway.fetch_tasks(None).await.unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].column_id, ItemId::from("done"));
    }

    #[tokio::test]
    async fn test_fetch_tasks_for_project_board_reads_bare_array() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/TaskCard/projectBoard/pb-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "t1", "statusId": "wip", "title": "One"}
            ])))
            .mount(&mock_server)
            .await;

        let gateway = RestGateway::new(mock_server.uri()).with_token(None);
        let tasks = gateway.fetch_tasks(Some("pb-1")).await.unwrap();

        assert_eq!(tasks, vec![Task::new("t1", "wip", "One")]);
    }

    #[tokio::test]
    async fn test_fetch_columns_maps_name_to_title() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "wip", "name": "In Progress"}]
            })))
            .mount(&mock_server)
            .await;

        let gateway = RestGateway::new(mock_server.uri()).with_token(None);
        let columns = gateway.fetch_columns().await.unwrap();

        assert_eq!(columns, vec![Column::new("wip", "In Progress")]);
    }

    #[tokio::test]
    async fn test_update_task_sends_full_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/TaskCard/t1"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(json!({
                "title": "One",
                "description": "",
                "priorityId": null,
                "dueDate": null,
                "statusId": "done"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let gateway = RestGateway::new(mock_server.uri()).with_token(Some("secret".into()));
        let task = Task::new("t1", "done", "One");
        gateway
            .update_task(&task.id, &TaskUpdate::from(&task))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_success_maps_to_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/TaskCard/t9"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "TaskCard not found"})),
            )
            .mount(&mock_server)
            .await;

        let gateway = RestGateway::new(mock_server.uri()).with_token(None);
        let err = gateway.delete_task(&ItemId::from("t9")).await.unwrap_err();

        match err {
            BoardError::Api { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "TaskCard not found");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_column_posts_name() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/Status"))
            .and(body_json(json!({"id": "c-1", "name": "Review"})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        let gateway = RestGateway::new(mock_server.uri()).with_token(None);
        gateway
            .create_column(&Column::new("c-1", "Review"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_task_returns_server_record() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/TaskCard"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {"id": "srv-1", "statusId": "wip", "title": "New"}
            })))
            .mount(&mock_server)
            .await;

        let gateway = RestGateway::new(mock_server.uri()).with_token(None);
        let draft = TaskDraft {
            title: "New".into(),
            description: String::new(),
            column_id: ItemId::from("wip"),
            priority_id: None,
            due_date: None,
            project_board_id: None,
        };
        let task = gateway.create_task(&draft).await.unwrap();

        assert_eq!(task.id, ItemId::from("srv-1"));
    }

    #[tokio::test]
    async fn test_in_memory_gateway_round() {
        let gateway = InMemoryGateway::demo();
        let draft = TaskDraft {
            title: "Extra".into(),
            description: String::new(),
            column_id: ItemId::from("done"),
            priority_id: None,
            due_date: None,
            project_board_id: None,
        };
        let created = gateway.create_task(&draft).await.unwrap();
        assert_eq!(created.id, ItemId::from("task-5"));

        let mut moved = created.clone();
        moved.column_id = ItemId::from("WIP");
        gateway
            .update_task(&moved.id, &TaskUpdate::from(&moved))
            .await
            .unwrap();

        let tasks = gateway.fetch_tasks(None).await.unwrap();
        assert_eq!(tasks.last().unwrap().column_id, ItemId::from("WIP"));
        assert_eq!(gateway.updates().len(), 1);

        gateway.delete_task(&moved.id).await.unwrap();
        assert!(gateway.delete_task(&moved.id).await.is_err());

        gateway.rename_column(&ItemId::from("done"), "Shipped").await.unwrap();
        assert_eq!(gateway.fetch_columns().await.unwrap()[1].title, "Shipped");
    }
    #[tokio::test]
    async fn test_fetch_board_tolerates_missing_priorities() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/Status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": "wip", "name": "WIP" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/TaskCard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": "t1", "statusId": "wip", "title": "one" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/Priority"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gateway = RestGateway::new(format!("{}/api", server.uri())).with_token(None);
        let board = fetch_board(&gateway, None).await.unwrap();
        assert_eq!(board.columns().len(), 1);
        assert_eq!(board.tasks()[0].title, "one");
        assert!(board.priorities().is_empty());
    }
}
