//! Editable page-content sections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

/// The content areas edited from the admin console.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
  Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Section {
  Contact,
  Faq,
  News,
  Staff,
  Contracts,
  Navigation,
}

impl Section {
  pub fn as_str(self) -> &'static str { self.into() }

  /// Public page path that renders this section, used for the sitemap.
  pub fn page_path(self) -> &'static str {
    match self {
      Section::Contact => "/contact",
      Section::Faq => "/faq",
      Section::News => "/news",
      Section::Staff => "/staff",
      Section::Contracts => "/contracts",
      // Navigation is rendered on every page, not a page of its own.
      Section::Navigation => "/",
    }
  }
}

/// A stored section document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
  pub section:    Section,
  pub content:    Value,
  pub updated_at: DateTime<Utc>,
  /// User who last wrote the section.
  pub updated_by: Option<Uuid>,
}
