//! ObservationScope for begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` on `complete()`
//! - Logs `{name}_FAILED` on `fail()`
//! - Logs `{name}_INCOMPLETE` on drop otherwise

use super::logger::Logger;

/// A scope that logs begin and complete events around a unit of work
///
/// ```ignore
/// let scope = ObservationScope::with_fields("BATCH", &[("offset", "0")]);
/// // ... execute the batch ...
/// scope.complete_with_fields(&[("rows", "12")]);
/// ```
pub struct ObservationScope {
    name: &'static str,
    completed: bool,
    fields: Vec<(&'static str, String)>,
}

impl ObservationScope {
    /// Create a new observation scope
    pub fn new(name: &'static str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a new observation scope; `fields` are repeated on every
    /// event of the scope
    pub fn with_fields(name: &'static str, fields: &[(&'static str, &str)]) -> Self {
        let scope = Self {
            name,
            completed: false,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
        };
        scope.emit_info("BEGIN", &[]);
        scope
    }

    /// Mark the scope as completed
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope as completed with additional fields
    pub fn complete_with_fields(mut self, extra: &[(&str, &str)]) {
        self.completed = true;
        self.emit_info("COMPLETE", extra);
    }

    /// Mark the scope as failed
    pub fn fail(mut self, reason: &str) {
        self.completed = true;
        let event = format!("{}_FAILED", self.name);
        let mut fields = self.field_refs();
        fields.push(("reason", reason));
        Logger::error(&event, &fields);
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    fn emit_info(&self, suffix: &str, extra: &[(&str, &str)]) {
        let event = format!("{}_{}", self.name, suffix);
        let mut fields = self.field_refs();
        fields.extend(extra.iter().copied());
        Logger::info(&event, &fields);
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.completed {
            let event = format!("{}_INCOMPLETE", self.name);
            let mut fields = self.field_refs();
            fields.push(("reason", "scope dropped without completion"));
            Logger::warn(&event, &fields);
        }
    }
}
