
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// A page recorded in the index catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Page {
    pub id: i64,
    pub page_id: String,
    pub title: String,
    pub status: PageStatus,
    pub chunk_count: i64,
    pub content_complete: bool,
    pub error_message: Option<String>,
    pub indexed_date: Option<NaiveDateTime>,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum PageStatus {
    Pending,
    Indexing,
    Completed,
    Failed,
}

impl PageStatus {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            PageStatus::Pending => "pending",
            PageStatus::Indexing => "indexing",
            PageStatus::Completed => "completed",
            PageStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PageStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            PageStatus::Pending => write!(f, "Pending"),
            PageStatus::Indexing => write!(f, "Indexing"),
            PageStatus::Completed => write!(f, "Completed"),
            PageStatus::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPage {
    pub page_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub status: Option<PageStatus>,
    pub chunk_count: Option<i64>,
    pub content_complete: Option<bool>,
    pub error_message: Option<String>,
    pub indexed_date: Option<NaiveDateTime>,
}

impl Page {
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == PageStatus::Completed
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.status == PageStatus::Failed
    }
}
