use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single evidence value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EvidenceValue {
    Millis(i64),
    Number(f64),
    Text(String),
}

impl fmt::Display for EvidenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceValue::Millis(ms) => write!(f, "{}ms", ms),
            EvidenceValue::Number(n) => write!(f, "{}", n),
            EvidenceValue::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceField {
    pub name: String,
    pub value: EvidenceValue,
}

/// Ordered, named quantities that made a check fail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Evidence {
    fields: Vec<EvidenceField>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn millis(self, name: &str, value: i64) -> Self {
        self.with(name, EvidenceValue::Millis(value))
    }

    /// Adds a number rounded to two decimals
    pub fn number(self, name: &str, value: f64) -> Self {
        self.with(name, EvidenceValue::Number(crate::stats::round_to(value, 2)))
    }

    pub fn text(self, name: &str, value: impl Into<String>) -> Self {
        self.with(name, EvidenceValue::Text(value.into()))
    }

    fn with(mut self, name: &str, value: EvidenceValue) -> Self {
        self.fields.push(EvidenceField {
            name: name.to_string(),
            value,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&EvidenceValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    pub fn fields(&self) -> &[EvidenceField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name, field.value)?;
        }
        Ok(())
    }
}

/// Alert emitted when a check fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckAlert {
    pub check_name: String,
    pub description: String,
    pub experimental: bool,
    pub player_id: Uuid,
    pub player_name: String,
    pub violations: u32,
    pub max_violations: u32,
    /// Set once a punishable check reaches its max violations
    pub punish: bool,
    pub timestamp: i64,
    pub evidence: Evidence,
}
