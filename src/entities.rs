//! Blog record types: users, blogs and comments.

use crate::model;
use crate::models::Value;
use crate::schema::{Field, Model};
use chrono::Utc;
use uuid::Uuid;

/// New primary key: 15-digit millisecond timestamp, uuid hex, then `000`.
///
/// Ids sort by creation time.
pub fn next_id() -> String {
    format!(
        "{:015}{}000",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// Current Unix time in seconds, with microsecond precision.
pub fn now_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1e6
}

fn id_field() -> Field {
    Field::string("id")
        .primary_key()
        .ddl("varchar(50)")
        .default_with(|| Value::String(next_id()))
}

fn created_at_field() -> Field {
    Field::float("created_at").default_with(|| Value::Float(now_secs()))
}

model! {
    pub struct User in "users" {
        id_field(),
        Field::string("email").ddl("varchar(50)"),
        Field::string("passwd").ddl("varchar(50)"),
        Field::boolean("admin"),
        Field::string("name").ddl("varchar(50)"),
        Field::string("image").ddl("varchar(500)"),
        created_at_field(),
    }
}

model! {
    pub struct Blog in "blogs" {
        id_field(),
        Field::string("user_id").ddl("varchar(50)"),
        Field::string("user_name").ddl("varchar(50)"),
        Field::string("user_image").ddl("varchar(500)"),
        Field::string("name").ddl("varchar(50)"),
        Field::string("summary").ddl("varchar(200)"),
        Field::text("content"),
        created_at_field(),
    }
}

model! {
    pub struct Comment in "comments" {
        id_field(),
        Field::string("blog_id").ddl("varchar(50)"),
        Field::string("user_id").ddl("varchar(50)"),
        Field::string("user_name").ddl("varchar(50)"),
        Field::string("user_image").ddl("varchar(500)"),
        Field::text("content"),
        created_at_field(),
    }
}

/// Register every blog schema up front, so a bad declaration fails at
/// startup instead of on first query.
pub fn register_all() {
    let _ = User::schema();
    let _ = Blog::schema();
    let _ = Comment::schema();
}
