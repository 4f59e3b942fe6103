//! Builders for schedule requests.

#![allow(dead_code)]

use crewplan::model::ScheduleStatus;
use crewplan::{ItemInput, SaveScheduleRequest, SubmitProgress};

pub struct ScheduleBuilder {
    note: Option<String>,
    items: Vec<ItemInput>,
    status: ScheduleStatus,
}

impl ScheduleBuilder {
    pub fn draft() -> Self {
        Self {
            note: None,
            items: Vec::new(),
            status: ScheduleStatus::Draft,
        }
    }

    pub fn active() -> Self {
        Self {
            status: ScheduleStatus::Active,
            ..Self::draft()
        }
    }

    pub fn note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    pub fn item(mut self, item: ItemInput) -> Self {
        self.items.push(item);
        self
    }

    pub fn build(self) -> SaveScheduleRequest {
        SaveScheduleRequest {
            note: self.note,
            items: self.items,
            status: self.status,
        }
    }
}

pub fn report(item_id: &str, worker_id: &str, percent: f64) -> SubmitProgress {
    SubmitProgress {
        item_id: item_id.to_string(),
        worker_id: worker_id.to_string(),
        percent,
        note: None,
    }
}
