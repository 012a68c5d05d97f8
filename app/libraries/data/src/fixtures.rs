use crate::entity::{Entity, Projection, Value};
use chrono::{DateTime, TimeZone, Utc};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Gadget {
    pub id: i64,
    pub name: String,
    pub serial: String,
    pub note: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for Gadget {
    fn table_name() -> &'static str {
        "lab.gadgets"
    }

    fn columns() -> &'static [&'static str] {
        &["name", "serial", "note", "active", "created_at"]
    }

    fn immutable_columns() -> &'static [&'static str] {
        &["created_at"]
    }

    fn unique_columns() -> &'static [&'static str] {
        &["serial"]
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(&self.name),
            Value::from(&self.serial),
            Value::from(self.note.clone()),
            Value::from(self.active),
            Value::from(self.created_at),
        ]
    }
}

#[derive(Debug, PartialEq, sqlx::FromRow)]
pub struct GadgetLabel {
    pub id: i64,
    pub name: String,
}

impl Projection<Gadget> for GadgetLabel {
    fn columns() -> &'static [&'static str] {
        &["id", "name"]
    }

    fn project(entity: &Gadget) -> Self {
        Self {
            id: entity.id,
            name: entity.name.clone(),
        }
    }
}

pub fn gadget(name: &str, serial: &str) -> Gadget {
    Gadget {
        id: 0,
        name: name.to_owned(),
        serial: serial.to_owned(),
        note: None,
        active: true,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    }
}
