use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::biodata::{ApprovalStatus, TemplateChoice};
use crate::media::MediaStore;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Biodata {
    pub id: i64,
    pub title: String,
    pub data: serde_json::Value,
    /// Stored media names, relative to the media root.
    pub profile_image: Option<String>,
    pub payment_screenshot: Option<String>,
    pub template_choice: String,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
    pub is_approved: bool,
    pub download_link: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Biodata {
    pub fn template(&self) -> Result<TemplateChoice, String> {
        TemplateChoice::parse_stored(Some(&self.template_choice))
    }

    pub fn has_payment_proof(&self) -> bool {
        self.payment_screenshot
            .as_deref()
            .is_some_and(|name| !name.is_empty())
    }

    /// Lifecycle state. Rows carrying a selector this build does not know are
    /// treated as paid-tier.
    pub fn status(&self) -> ApprovalStatus {
        let template = self.template().unwrap_or(TemplateChoice::Classic);
        ApprovalStatus::derive(template, self.is_approved, self.has_payment_proof())
    }

    pub fn to_response(&self, media: &MediaStore) -> BiodataResponse {
        let media_url = |name: &Option<String>| {
            name.as_deref()
                .filter(|n| !n.is_empty())
                .map(|n| media.url(n))
        };
        BiodataResponse {
            id: self.id,
            title: self.title.clone(),
            data: self.data.clone(),
            profile_image: media_url(&self.profile_image),
            payment_screenshot: media_url(&self.payment_screenshot),
            template_choice: self.template_choice.clone(),
            user_name: self.user_name.clone(),
            user_email: self.user_email.clone(),
            user_phone: self.user_phone.clone(),
            is_approved: self.is_approved,
            download_link: self.download_link.clone(),
            status: self.status(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// API representation: media references become public URLs.
#[derive(Debug, Clone, Serialize)]
pub struct BiodataResponse {
    pub id: i64,
    pub title: String,
    pub data: serde_json::Value,
    pub profile_image: Option<String>,
    pub payment_screenshot: Option<String>,
    pub template_choice: String,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
    pub is_approved: bool,
    pub download_link: String,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
