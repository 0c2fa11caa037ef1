use askama::Template;
use axum::{
    Form, Router,
    extract::{
        Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::{HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{any, get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::task::{Task, TaskService, TaskServiceError};

#[derive(Debug, Deserialize)]
pub struct TitleForm {
    title: Option<String>,
}

/// Query string of the task routes. `title` is read when the body carries none.
#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    id: Option<String>,
    title: Option<String>,
}

#[derive(Debug)]
pub struct TaskState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

/// Error type for task handler operations.
///
/// Every variant is answered with a plain-text body carrying its message.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The request was missing a required value or carried one that could not be parsed.
    #[error("{0}")]
    Validation(String),
    /// A statement against the tasks table failed.
    #[error("failed to {action}: {source}")]
    Storage {
        action: &'static str,
        #[source]
        source: TaskServiceError,
    },
    /// Represents an error during template rendering.
    #[error("failed to execute template: {0}")]
    Render(#[from] askama::Error),
}

impl TaskError {
    fn from_service(action: &'static str, err: TaskServiceError) -> Self {
        match err {
            TaskServiceError::EmptyTitle => {
                TaskError::Validation(format!("failed to validate form: {err}"))
            }
            TaskServiceError::Database(_) => TaskError::Storage {
                action,
                source: err,
            },
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            TaskError::Validation(_) => StatusCode::BAD_REQUEST,
            TaskError::Storage { .. } | TaskError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status_code, self.to_string()).into_response()
    }
}

/// The page shell. Bound without tasks it renders an empty container that
/// loads `/tasks`; bound with tasks it renders the list itself.
#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    tasks: Option<Vec<Task>>,
}

impl IndexTemplate {
    pub fn new(tasks: Option<Vec<Task>>) -> Self {
        Self { tasks }
    }
}

fn parse_query(query: Result<Query<TaskQuery>, QueryRejection>) -> Result<TaskQuery, TaskError> {
    query
        .map(|Query(query)| query)
        .map_err(|err| TaskError::Validation(format!("failed to parse query: {err}")))
}

/// Extracts the `id` query parameter as a task ID.
fn parse_id(query: &TaskQuery) -> Result<i32, TaskError> {
    let id = query
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| TaskError::Validation("failed to get id: empty string".to_string()))?;
    // `u32::from_str` tolerates a leading `+`; ids are plain digits only.
    if id.starts_with('+') {
        return Err(TaskError::Validation(
            "failed to parse id: invalid digit found in string".to_string(),
        ));
    }
    let id = id
        .parse::<u32>()
        .map_err(|err| TaskError::Validation(format!("failed to parse id: {err}")))?;
    i32::try_from(id).map_err(|err| TaskError::Validation(format!("failed to parse id: {err}")))
}

/// Resolves the submitted title: the body's `title` field wins, then the query's.
///
/// A body that is not form-encoded counts as an empty form.
fn parse_title(
    query: &TaskQuery,
    form: Result<Form<TitleForm>, FormRejection>,
) -> Result<String, TaskError> {
    let body_title = match form {
        Ok(Form(form)) => form.title,
        Err(FormRejection::InvalidFormContentType(_)) => None,
        Err(err) => {
            return Err(TaskError::Validation(format!(
                "failed to parse form: {err}"
            )));
        }
    };
    Ok(body_title
        .or_else(|| query.title.clone())
        .unwrap_or_default())
}

fn refresh_task_list() -> Response {
    (
        StatusCode::OK,
        [(
            HeaderName::from_static("hx-trigger"),
            HeaderValue::from_static("get-tasks"),
        )],
    )
        .into_response()
}

/// Handler for `/` that renders the page shell.
#[tracing::instrument]
async fn index_handler() -> Result<Html<String>, TaskError> {
    let template = IndexTemplate::new(None);
    template.render().map(Html).map_err(TaskError::from)
}

/// Handler for `/tasks` that renders every task.
#[tracing::instrument(skip(state))]
async fn list_tasks_handler(State(state): State<Arc<TaskState>>) -> Result<Html<String>, TaskError> {
    let task_service = TaskService::new(&state.db);
    let tasks = task_service
        .get_all_tasks()
        .await
        .map_err(|err| TaskError::from_service("get tasks", err))?;
    let template = IndexTemplate::new(Some(tasks));
    template.render().map(Html).map_err(TaskError::from)
}

/// Handler for `/task/create`.
#[tracing::instrument(skip(state))]
async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    query: Result<Query<TaskQuery>, QueryRejection>,
    form: Result<Form<TitleForm>, FormRejection>,
) -> Result<Response, TaskError> {
    let query = parse_query(query)?;
    let title = parse_title(&query, form)?;
    let task_service = TaskService::new(&state.db);
    task_service
        .create_task(&title)
        .await
        .map_err(|err| TaskError::from_service("create task", err))?;
    Ok(refresh_task_list())
}

/// Handler for `/task/edit?id=<id>`.
#[tracing::instrument(skip(state))]
async fn edit_task_handler(
    State(state): State<Arc<TaskState>>,
    query: Result<Query<TaskQuery>, QueryRejection>,
    form: Result<Form<TitleForm>, FormRejection>,
) -> Result<Response, TaskError> {
    let query = parse_query(query)?;
    let id = parse_id(&query)?;
    let title = parse_title(&query, form)?;
    let task_service = TaskService::new(&state.db);
    let updated = task_service
        .edit_task_by_id(id, &title)
        .await
        .map_err(|err| TaskError::from_service("edit task", err))?;
    if updated == 0 {
        tracing::info!(id, "no task matched the edit");
    }
    Ok(refresh_task_list())
}

/// Handler for `/task/delete?id=<id>`.
#[tracing::instrument(skip(state))]
async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> Result<Response, TaskError> {
    let query = parse_query(query)?;
    let id = parse_id(&query)?;
    let task_service = TaskService::new(&state.db);
    let deleted = task_service
        .delete_task_by_id(id)
        .await
        .map_err(|err| TaskError::from_service("delete task", err))?;
    if deleted == 0 {
        tracing::info!(id, "no task matched the delete");
    }
    Ok(refresh_task_list())
}

/// Creates and returns the task router with the page shell and all task routes.
pub fn create_task_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/tasks", get(list_tasks_handler))
        .route("/task/create", post(create_task_handler))
        .route("/task/edit", any(edit_task_handler))
        .route("/task/delete", any(delete_task_handler))
        .with_state(state)
}
