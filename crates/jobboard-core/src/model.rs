use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use ulid::Ulid;

pub type RecordId = String; // ULID string
pub type Document = JsonValue;

pub const JOBS: &str = "jobs";
pub const USERS: &str = "users";
pub const CATEGORIES: &str = "categories";

/// Attributes returned by the job listing and the single-job lookup.
pub const JOB_LISTING_SELECT: &str =
    "salary startDate duration address category subCategories status userId";
/// Owner attributes attached to a listed job when `userId` is expanded.
pub const OWNER_SELECT: &str = "firstName lastName email avatar";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Cleaning,
    Repairing,
    Plumbing,
    PetWalking,
    Ironing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Open,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Salary {
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub start_date: String,
    pub duration: String,
    pub salary: Salary,
    #[serde(default)]
    pub address: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub sub_categories: Vec<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub user_id: Option<RecordId>,
    #[serde(default)]
    pub candidates_list: Vec<RecordId>,
}

/// Body of a job creation request; the date and time arrive separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub start_date: String,
    pub start_time: String,
    pub duration: String,
    pub salary: f64,
    #[serde(default)]
    pub address: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub sub_categories: Vec<String>,
}

impl Job {
    pub fn create(req: NewJob, owner: Option<RecordId>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            start_date: format!("{}T{}", req.start_date, req.start_time),
            duration: req.duration,
            salary: Salary { cost: req.salary },
            address: req.address,
            category: req.category,
            sub_categories: req.sub_categories,
            status: JobStatus::Open,
            user_id: owner,
            candidates_list: Vec::new(),
        }
    }
}

pub fn record_id(doc: &Document) -> Option<&str> {
    doc.get("_id").and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_job_joins_date_and_time_and_nests_salary() {
        let job = Job::create(
            NewJob {
                start_date: "2022-05-05".into(),
                start_time: "10:30".into(),
                duration: "3".into(),
                salary: 15000.0,
                address: Some("Yerevan".into()),
                category: Category::PetWalking,
                sub_categories: vec![],
            },
            Some("owner-1".into()),
        );
        let doc = serde_json::to_value(&job).unwrap();
        assert_eq!(doc["startDate"], "2022-05-05T10:30");
        assert_eq!(doc["salary"]["cost"], 15000.0);
        assert_eq!(doc["category"], "petWalking");
        assert_eq!(doc["status"], "open");
        assert_eq!(doc["userId"], "owner-1");
        assert_eq!(record_id(&doc), Some(job.id.as_str()));
    }
}
