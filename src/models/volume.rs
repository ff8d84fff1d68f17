//! Volume models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::{issue::Issue, journal::Journal};

/// Volume model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Volume {
    pub id: Uuid,
    pub number: i32,
    pub year: i32,
    pub journal_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Volume creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateVolume {
    #[validate(range(min = 0))]
    pub number: i32,
    #[validate(range(min = 1000, max = 9999, message = "Enter a four-digit year."))]
    pub year: i32,
    #[serde(alias = "journal")]
    pub journal_id: Uuid,
}

/// Volume partial update request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateVolume {
    #[validate(range(min = 0))]
    pub number: Option<i32>,
    #[validate(range(min = 1000, max = 9999, message = "Enter a four-digit year."))]
    pub year: Option<i32>,
    #[serde(alias = "journal")]
    pub journal_id: Option<Uuid>,
}

/// Volume with its journal and issues, for detail views
#[derive(Debug, Clone, Serialize)]
pub struct VolumeDetail {
    #[serde(flatten)]
    pub volume: Volume,
    pub journal: Journal,
    pub issues: Vec<Issue>,
}
