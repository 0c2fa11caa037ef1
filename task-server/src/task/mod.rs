use crate::entities::*;
use chrono::{SecondsFormat, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;

pub mod web;

#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct Task {
    id: i32,
    title: String,
    created_at: String,
    updated_at: Option<String>,
}

impl Task {
    pub fn new(id: i32, title: String, created_at: String, updated_at: Option<String>) -> Self {
        Self {
            id,
            title,
            created_at,
            updated_at,
        }
    }

    /// Returns the ID of the task.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Returns the title of the task.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the RFC 3339 timestamp at which the task was created.
    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    /// Returns the RFC 3339 timestamp of the last edit, if the task was ever edited.
    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }
}

impl From<tasks::Model> for Task {
    fn from(model: tasks::Model) -> Self {
        Task::new(model.id, model.title, model.created_at, model.updated_at)
    }
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// The submitted title was empty or only whitespace.
    #[error("empty string")]
    EmptyTitle,
    /// Represents a database error.
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}

pub struct TaskService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl TaskService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> TaskService<'_> {
        TaskService { db }
    }

    /// Retrieves all tasks in insertion order.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_tasks(&self) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = tasks::Entity::find()
            .order_by_asc(tasks::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    /// Creates a new task stamped with the current time.
    ///
    /// # Arguments
    ///
    /// * `title` - The title of the task, stored exactly as given.
    ///
    /// # Returns
    ///
    /// The number of rows inserted, or `TaskServiceError::EmptyTitle` when
    /// the title is empty or only whitespace.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, title: &str) -> Result<u64, TaskServiceError> {
        validate_title(title)?;
        let active_model = tasks::ActiveModel {
            title: ActiveValue::Set(title.to_string()),
            created_at: ActiveValue::Set(now()),
            ..Default::default()
        };
        let inserted = tasks::Entity::insert(active_model)
            .exec_without_returning(self.db)
            .await?;
        Ok(inserted)
    }

    /// Replaces the title of a task and stamps its `updated_at`.
    ///
    /// The row's existence is not checked: an unknown ID updates nothing and
    /// returns `Ok(0)`.
    #[tracing::instrument(skip(self))]
    pub async fn edit_task_by_id(&self, id: i32, new_title: &str) -> Result<u64, TaskServiceError> {
        validate_title(new_title)?;
        let result = tasks::Entity::update_many()
            .col_expr(tasks::Column::Title, Expr::value(new_title.to_string()))
            .col_expr(tasks::Column::UpdatedAt, Expr::value(now()))
            .filter(tasks::Column::Id.eq(id))
            .exec(self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Deletes a task permanently. An unknown ID deletes nothing and returns `Ok(0)`.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task_by_id(&self, id: i32) -> Result<u64, TaskServiceError> {
        let result = tasks::Entity::delete_by_id(id).exec(self.db).await?;
        Ok(result.rows_affected)
    }
}

fn validate_title(title: &str) -> Result<(), TaskServiceError> {
    if title.trim().is_empty() {
        return Err(TaskServiceError::EmptyTitle);
    }
    Ok(())
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
