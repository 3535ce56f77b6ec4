use std::fmt::Display;

/// PostgREST filter builder. Every table in the schema carries a
/// `deleted_at` soft-delete column; reads go through [`TableQuery::active`]
/// so the not-deleted predicate lives in exactly one place.
#[derive(Debug, Clone)]
pub struct TableQuery {
    table: String,
    parts: Vec<String>,
}

impl TableQuery {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            parts: Vec::new(),
        }
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.parts.push(format!("{}=eq.{}", column, value));
        self
    }

    pub fn lt(mut self, column: &str, value: impl Display) -> Self {
        self.parts.push(format!("{}=lt.{}", column, value));
        self
    }

    pub fn gt(mut self, column: &str, value: impl Display) -> Self {
        self.parts.push(format!("{}=gt.{}", column, value));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Display) -> Self {
        self.parts.push(format!("{}=gte.{}", column, value));
        self
    }

    pub fn lte(mut self, column: &str, value: impl Display) -> Self {
        self.parts.push(format!("{}=lte.{}", column, value));
        self
    }

    pub fn is_true(mut self, column: &str) -> Self {
        self.parts.push(format!("{}=is.true", column));
        self
    }

    pub fn not_in(mut self, column: &str, values: &[&str]) -> Self {
        self.parts
            .push(format!("{}=not.in.({})", column, values.join(",")));
        self
    }

    /// Excludes soft-deleted rows.
    pub fn active(mut self) -> Self {
        self.parts.push("deleted_at=is.null".to_string());
        self
    }

    pub fn order(mut self, spec: &str) -> Self {
        self.parts.push(format!("order={}", spec));
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.parts.push(format!("limit={}", n));
        self
    }

    pub fn offset(mut self, n: i64) -> Self {
        self.parts.push(format!("offset={}", n));
        self
    }

    pub fn path(&self) -> String {
        if self.parts.is_empty() {
            format!("/rest/v1/{}", self.table)
        } else {
            format!("/rest/v1/{}?{}", self.table, self.parts.join("&"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_path_with_filters_in_order() {
        let path = TableQuery::new("appointments")
            .eq("clinic_id", 1)
            .lt("start_time", "2024-01-10T10:00:00")
            .active()
            .path();

        assert_eq!(
            path,
            "/rest/v1/appointments?clinic_id=eq.1&start_time=lt.2024-01-10T10:00:00&deleted_at=is.null"
        );
    }

    #[test]
    fn builds_not_in_filter() {
        let path = TableQuery::new("appointments")
            .not_in("status", &["Cancelled", "NoShow"])
            .path();

        assert_eq!(
            path,
            "/rest/v1/appointments?status=not.in.(Cancelled,NoShow)"
        );
    }

    #[test]
    fn bare_table_has_no_query_string() {
        assert_eq!(TableQuery::new("clinics").path(), "/rest/v1/clinics");
    }
}
