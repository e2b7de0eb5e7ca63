//! Todo store queries.

use super::{DbPool, Todo};

pub async fn find_by_owner(db: &DbPool, owner_id: &str) -> Result<Vec<Todo>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM todos WHERE owner_id = ? ORDER BY created_at DESC")
        .bind(owner_id)
        .fetch_all(db)
        .await
}

pub async fn find_by_id(db: &DbPool, id: &str) -> Result<Option<Todo>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM todos WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_all(db: &DbPool) -> Result<Vec<Todo>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM todos ORDER BY created_at DESC")
        .fetch_all(db)
        .await
}

pub async fn insert(db: &DbPool, todo: &Todo) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO todos (id, title, description, priority, complete, owner_id, created_at, completed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&todo.id)
    .bind(&todo.title)
    .bind(&todo.description)
    .bind(todo.priority)
    .bind(todo.complete)
    .bind(&todo.owner_id)
    .bind(&todo.created_at)
    .bind(&todo.completed_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn update(db: &DbPool, todo: &Todo) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE todos
        SET title = ?, description = ?, priority = ?, complete = ?, completed_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&todo.title)
    .bind(&todo.description)
    .bind(todo.priority)
    .bind(todo.complete)
    .bind(&todo.completed_at)
    .bind(&todo.id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn delete(db: &DbPool, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM todos WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

/// The nightly purge. Deletes every todo for every owner, including rows
/// whose owner no longer exists.
pub async fn delete_all(db: &DbPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM todos").execute(db).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn make_todo(id: &str, owner: &str) -> Todo {
        Todo {
            id: id.to_string(),
            title: format!("todo {}", id),
            description: "something".to_string(),
            priority: 1,
            complete: 0,
            owner_id: owner.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_owner_scopes_to_owner() {
        let pool = db::init_with_url("sqlite::memory:").await.unwrap();
        insert(&pool, &make_todo("t1", "alice")).await.unwrap();
        insert(&pool, &make_todo("t2", "alice")).await.unwrap();
        insert(&pool, &make_todo("t3", "bob")).await.unwrap();

        let todos = find_by_owner(&pool, "alice").await.unwrap();
        assert_eq!(todos.len(), 2);
        assert!(todos.iter().all(|t| t.owner_id == "alice"));
    }

    #[tokio::test]
    async fn test_delete_all_counts_every_owner() {
        let pool = db::init_with_url("sqlite::memory:").await.unwrap();
        insert(&pool, &make_todo("t1", "alice")).await.unwrap();
        insert(&pool, &make_todo("t2", "bob")).await.unwrap();
        insert(&pool, &make_todo("t3", "nobody-anymore")).await.unwrap();

        let deleted = delete_all(&pool).await.unwrap();
        assert_eq!(deleted, 3);
        assert!(find_all(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_roundtrip() {
        let pool = db::init_with_url("sqlite::memory:").await.unwrap();
        let mut todo = make_todo("t1", "alice");
        insert(&pool, &todo).await.unwrap();

        todo.title = "renamed".to_string();
        todo.complete = 1;
        todo.completed_at = Some(chrono::Utc::now().to_rfc3339());
        update(&pool, &todo).await.unwrap();

        let stored = find_by_id(&pool, "t1").await.unwrap().unwrap();
        assert_eq!(stored.title, "renamed");
        assert!(stored.is_complete());
        assert!(stored.completed_at.is_some());
    }
}
