//! Naming conventions for tables and columns.

use convert_case::{Case, Casing};

/// Converts model and field names to table and column names.
pub trait NamingStrategy: Send + Sync {
    /// Table name for a model (e.g. `OrderItem` -> `order_items`).
    fn table_name(&self, model: &str) -> String;

    /// Column name for a field (e.g. `UserID` -> `user_id`).
    fn column_name(&self, field: &str) -> String;
}

/// Snake-case names with pluralized tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNamingStrategy;

impl NamingStrategy for DefaultNamingStrategy {
    fn table_name(&self, model: &str) -> String {
        pluralize(&model.to_case(Case::Snake))
    }

    fn column_name(&self, field: &str) -> String {
        field.to_case(Case::Snake)
    }
}

/// Pluralizes the last word of a snake_case name.
fn pluralize(name: &str) -> String {
    let (head, last) = match name.rsplit_once('_') {
        Some((head, last)) => (Some(head), last),
        None => (None, name),
    };

    let plural = match last {
        "" => String::new(),
        "person" => "people".to_string(),
        "child" => "children".to_string(),
        s if s.ends_with('s')
            || s.ends_with("sh")
            || s.ends_with("ch")
            || s.ends_with('x')
            || s.ends_with('z') =>
        {
            format!("{s}es")
        }
        s if s.ends_with('y')
            && !s.ends_with("ay")
            && !s.ends_with("ey")
            && !s.ends_with("oy")
            && !s.ends_with("uy") =>
        {
            format!("{}ies", &s[..s.len() - 1])
        }
        s => format!("{s}s"),
    };

    match head {
        Some(head) => format!("{head}_{plural}"),
        None => plural,
    }
}
