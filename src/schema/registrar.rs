//! Model registration.
//!
//! [`register_schema`] turns a [`ModelDeclaration`] into an immutable
//! [`ModelSchema`]: it validates the key layout and precomputes the
//! select/insert/update/delete statements every CRUD call reuses.

use crate::error::{OrmError, OrmResult};
use crate::schema::field::Field;
use indexmap::IndexMap;
use tracing::info;

/// Fields of a record type as declared, before validation.
#[derive(Debug, Clone)]
pub struct ModelDeclaration {
    name: String,
    table: Option<String>,
    fields: Vec<Field>,
}

impl ModelDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    /// Override the table name (defaults to the model name).
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Precomputed mapping between a record type and its table.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    model_name: String,
    table_name: String,
    primary_key: String,
    fields: Vec<String>,
    field_map: IndexMap<String, Field>,
    select_sql: String,
    insert_sql: String,
    update_sql: String,
    delete_sql: String,
}

impl ModelSchema {
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Non-key column names in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// All fields (key included) in declaration order.
    pub fn field_map(&self) -> &IndexMap<String, Field> {
        &self.field_map
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.field_map.get(name)
    }

    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    pub fn update_sql(&self) -> &str {
        &self.update_sql
    }

    pub fn delete_sql(&self) -> &str {
        &self.delete_sql
    }
}

/// Validate a declaration and build its schema.
///
/// Fails when the declaration has no primary key, more than one, no other
/// field, or a field that is unnamed or declared twice.
pub fn register_schema(declaration: ModelDeclaration) -> OrmResult<ModelSchema> {
    let ModelDeclaration {
        name: model_name,
        table,
        fields: declared,
    } = declaration;
    let table_name = table.unwrap_or_else(|| model_name.clone());
    info!(model = %model_name, table = %table_name, "found model");

    let mut field_map = IndexMap::with_capacity(declared.len());
    let mut fields = Vec::new();
    let mut primary_key: Option<String> = None;

    for field in declared {
        let name = field.name().to_string();
        if name.is_empty() {
            return Err(OrmError::schema(&model_name, "Field name cannot be empty"));
        }
        info!(model = %model_name, field = %name, mapping = %field, "found mapping");

        if field.is_primary_key() {
            if let Some(existing) = &primary_key {
                return Err(OrmError::schema(
                    &model_name,
                    format!("Duplicate primary key for field: {} (already {})", name, existing),
                ));
            }
            primary_key = Some(name.clone());
        } else {
            fields.push(name.clone());
        }

        if field_map.insert(name.clone(), field).is_some() {
            return Err(OrmError::schema(
                &model_name,
                format!("Field '{}' declared more than once", name),
            ));
        }
    }

    let primary_key =
        primary_key.ok_or_else(|| OrmError::schema(&model_name, "Primary key not found"))?;
    if fields.is_empty() {
        return Err(OrmError::schema(
            &model_name,
            "At least one non-key field is required",
        ));
    }

    let escaped: Vec<String> = fields.iter().map(|f| quote_ident(f)).collect();
    let select_sql = format!(
        "select {}, {} from {}",
        quote_ident(&primary_key),
        escaped.join(","),
        quote_ident(&table_name)
    );
    let insert_sql = format!(
        "insert into {} ({}, {}) values ({})",
        quote_ident(&table_name),
        escaped.join(","),
        quote_ident(&primary_key),
        placeholders(escaped.len() + 1)
    );
    let update_sql = format!(
        "update {} set {} where {}=?",
        quote_ident(&table_name),
        escaped
            .iter()
            .map(|f| format!("{}=?", f))
            .collect::<Vec<_>>()
            .join(","),
        quote_ident(&primary_key)
    );
    let delete_sql = format!(
        "delete from {} where {}=?",
        quote_ident(&table_name),
        quote_ident(&primary_key)
    );

    Ok(ModelSchema {
        model_name,
        table_name,
        primary_key,
        fields,
        field_map,
        select_sql,
        insert_sql,
        update_sql,
        delete_sql,
    })
}

/// Backtick-quote an identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("`{}`", name)
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> ModelDeclaration {
        ModelDeclaration::new("User")
            .table("users")
            .field(Field::integer("id").primary_key())
            .field(Field::string("name"))
            .field(Field::string("email"))
    }

    #[test]
    fn test_templates() {
        let schema = register_schema(users()).unwrap();
        assert_eq!(schema.select_sql(), "select `id`, `name`,`email` from `users`");
        assert_eq!(
            schema.insert_sql(),
            "insert into `users` (`name`,`email`, `id`) values (?, ?, ?)"
        );
        assert_eq!(
            schema.update_sql(),
            "update `users` set `name`=?,`email`=? where `id`=?"
        );
        assert_eq!(schema.delete_sql(), "delete from `users` where `id`=?");
    }

    #[test]
    fn test_metadata() {
        let schema = register_schema(users()).unwrap();
        assert_eq!(schema.model_name(), "User");
        assert_eq!(schema.table_name(), "users");
        assert_eq!(schema.primary_key(), "id");
        assert_eq!(schema.fields(), &["name".to_string(), "email".to_string()]);
        let keys: Vec<&str> = schema.field_map().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "name", "email"]);
    }

    #[test]
    fn test_table_defaults_to_model_name() {
        let schema = register_schema(
            ModelDeclaration::new("Tag")
                .field(Field::string("id").primary_key())
                .field(Field::string("label")),
        )
        .unwrap();
        assert_eq!(schema.table_name(), "Tag");
    }

    #[test]
    fn test_missing_primary_key() {
        let err = register_schema(ModelDeclaration::new("NoKey").field(Field::string("name")))
            .unwrap_err();
        assert!(matches!(err, OrmError::Schema { .. }));
        assert!(err.to_string().contains("Primary key not found"));
    }

    #[test]
    fn test_duplicate_primary_key() {
        let err = register_schema(
            ModelDeclaration::new("TwoKeys")
                .field(Field::string("a").primary_key())
                .field(Field::string("b").primary_key()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Duplicate primary key"));
    }

    #[test]
    fn test_key_only_model_rejected() {
        let err = register_schema(
            ModelDeclaration::new("Bare").field(Field::string("id").primary_key()),
        )
        .unwrap_err();
        assert!(matches!(err, OrmError::Schema { .. }));
    }

    #[test]
    fn test_duplicate_field_name() {
        let err = register_schema(
            ModelDeclaration::new("Dup")
                .field(Field::string("id").primary_key())
                .field(Field::string("name"))
                .field(Field::text("name")),
        )
        .unwrap_err();
        assert!(err.to_string().contains("declared more than once"));
    }
}
