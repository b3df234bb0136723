// src/types/profile.rs
//! Candidate/employer profile records and their editable sections.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub educations: Vec<Education>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub portfolios: Vec<Portfolio>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub institution: String,
    pub degree: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub company: String,
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub current: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technologies: Vec<String>,
}

/// A list-valued part of a profile editable through
/// `/profiles/{userId}/{PATH}[/{itemId}]`.
pub trait ProfileSection:
    Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const PATH: &'static str;

    fn item_id(&self) -> Option<i64>;
    fn items(profile: &Profile) -> &Vec<Self>;
    fn items_mut(profile: &mut Profile) -> &mut Vec<Self>;
}

impl ProfileSection for Skill {
    const PATH: &'static str = "skills";

    fn item_id(&self) -> Option<i64> {
        self.id
    }
    fn items(profile: &Profile) -> &Vec<Self> {
        &profile.skills
    }
    fn items_mut(profile: &mut Profile) -> &mut Vec<Self> {
        &mut profile.skills
    }
}

impl ProfileSection for Education {
    const PATH: &'static str = "educations";

    fn item_id(&self) -> Option<i64> {
        self.id
    }
    fn items(profile: &Profile) -> &Vec<Self> {
        &profile.educations
    }
    fn items_mut(profile: &mut Profile) -> &mut Vec<Self> {
        &mut profile.educations
    }
}

impl ProfileSection for Experience {
    const PATH: &'static str = "experiences";

    fn item_id(&self) -> Option<i64> {
        self.id
    }
    fn items(profile: &Profile) -> &Vec<Self> {
        &profile.experiences
    }
    fn items_mut(profile: &mut Profile) -> &mut Vec<Self> {
        &mut profile.experiences
    }
}

impl ProfileSection for Portfolio {
    const PATH: &'static str = "portfolios";

    fn item_id(&self) -> Option<i64> {
        self.id
    }
    fn items(profile: &Profile) -> &Vec<Self> {
        &profile.portfolios
    }
    fn items_mut(profile: &mut Profile) -> &mut Vec<Self> {
        &mut profile.portfolios
    }
}
