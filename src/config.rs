//! YAML configuration.
//!
//! One file holds the screened user, the classifier endpoint, the seeded
//! whitelist, and the workflow definitions. Workflow entries are parsed
//! individually: a malformed workflow is logged and skipped so the rest of
//! the file still loads.

use crate::contacts::StaticContacts;
use crate::types::Contact;
use crate::types::Intent;
use crate::workflow::{ActionKind, Workflow, WorkflowAction, WorkflowCategory, WorkflowTrigger};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub id: String,
    /// Display name spoken in caller-facing messages.
    pub name: String,
    /// The user's own phone, dialed on pass-through.
    pub phone_number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Base URL of the remote classifier. Unset runs the local keyword
    /// classifier instead.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_classifier_timeout")]
    pub timeout_seconds: u64,
}

fn default_classifier_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_flush_interval")]
    pub flush_interval_seconds: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            path: None,
            flush_interval_seconds: default_flush_interval(),
        }
    }
}

fn default_flush_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactEntry {
    pub phone_number: String,
    pub display_name: String,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub auto_pass: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub user: UserConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub contacts: Vec<ContactEntry>,
    #[serde(default)]
    pub workflows: Vec<Workflow>,
}

/// Mirror of `Config` with workflows left unparsed, so one bad entry does
/// not reject the file.
#[derive(Deserialize)]
struct RawConfig {
    user: UserConfig,
    #[serde(default)]
    classifier: ClassifierConfig,
    #[serde(default)]
    stats: StatsConfig,
    #[serde(default)]
    contacts: Vec<ContactEntry>,
    #[serde(default)]
    workflows: Vec<serde_yaml::Value>,
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(content)?;

        let mut workflows = Vec::new();
        for (index, value) in raw.workflows.into_iter().enumerate() {
            match serde_yaml::from_value::<Workflow>(value) {
                Ok(workflow) => workflows.push(workflow),
                Err(e) => {
                    // Invalid entries must not take down the valid ones.
                    log::error!("skipping workflow entry {index}: {e}");
                }
            }
        }

        Ok(Config {
            user: raw.user,
            classifier: raw.classifier,
            stats: raw.stats,
            contacts: raw.contacts,
            workflows,
        })
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Seed the in-memory whitelist for this user.
    pub fn build_contacts(&self) -> StaticContacts {
        let mut contacts = StaticContacts::new();
        for entry in &self.contacts {
            contacts.insert(
                &self.user.id,
                Contact {
                    phone_number: entry.phone_number.clone(),
                    display_name: entry.display_name.clone(),
                    relationship: entry.relationship.clone(),
                    auto_pass: entry.auto_pass,
                },
            );
        }
        contacts
    }
}

impl Default for Config {
    fn default() -> Self {
        let user = UserConfig {
            id: "user_1".to_string(),
            name: "Sarah".to_string(),
            phone_number: "+15550100000".to_string(),
        };

        let workflows = vec![
            Workflow {
                id: "emergency-alert".to_string(),
                name: "Emergency escalation".to_string(),
                category: WorkflowCategory::Emergency,
                triggers: WorkflowTrigger {
                    keywords: Some(vec![
                        "emergency".to_string(),
                        "hospital".to_string(),
                        "urgent help".to_string(),
                    ]),
                    ..Default::default()
                },
                actions: vec![
                    WorkflowAction {
                        kind: ActionKind::RingUserImmediately,
                        params: params(&[("priority", json!("high"))]),
                        condition: None,
                    },
                    WorkflowAction {
                        kind: ActionKind::SendSmsAlert,
                        params: params(&[
                            ("to", json!(user.phone_number.clone())),
                            ("template", json!("emergency")),
                        ]),
                        condition: None,
                    },
                ],
                priority: 10,
                enabled: true,
            },
            Workflow {
                id: "friend-passthrough".to_string(),
                name: "Ring for friends".to_string(),
                category: WorkflowCategory::PersonalFriend,
                triggers: WorkflowTrigger {
                    intent: Some(Intent::Friend),
                    confidence: 0.7,
                    ..Default::default()
                },
                actions: vec![
                    WorkflowAction {
                        kind: ActionKind::RingUser,
                        params: HashMap::new(),
                        condition: None,
                    },
                    WorkflowAction {
                        kind: ActionKind::LogCall,
                        params: params(&[("outcome", json!("passed_through"))]),
                        condition: None,
                    },
                ],
                priority: 5,
                enabled: true,
            },
            Workflow {
                id: "scam-block".to_string(),
                name: "Block confirmed scams".to_string(),
                category: WorkflowCategory::Scam,
                triggers: WorkflowTrigger {
                    intent: Some(Intent::Scam),
                    confidence: 0.6,
                    keywords: Some(vec![
                        "irs".to_string(),
                        "warrant".to_string(),
                        "gift card".to_string(),
                    ]),
                    ..Default::default()
                },
                actions: vec![
                    WorkflowAction {
                        kind: ActionKind::BlockScam,
                        params: HashMap::new(),
                        condition: Some("scam_score >= 0.85".to_string()),
                    },
                    WorkflowAction {
                        kind: ActionKind::SendSms,
                        params: params(&[
                            ("to", json!(user.phone_number.clone())),
                            ("template", json!("scam_blocked")),
                        ]),
                        condition: Some("scam_score >= 0.85".to_string()),
                    },
                    WorkflowAction {
                        kind: ActionKind::LogCall,
                        params: params(&[("outcome", json!("screened"))]),
                        condition: Some("scam_score < 0.85".to_string()),
                    },
                ],
                priority: 8,
                enabled: true,
            },
            Workflow {
                id: "sales-log".to_string(),
                name: "Log declined sales calls".to_string(),
                category: WorkflowCategory::BusinessSales,
                triggers: WorkflowTrigger {
                    intent: Some(Intent::Sales),
                    confidence: 0.8,
                    ..Default::default()
                },
                actions: vec![WorkflowAction {
                    kind: ActionKind::LogCall,
                    params: params(&[("outcome", json!("declined"))]),
                    condition: None,
                }],
                priority: 4,
                enabled: true,
            },
        ];

        Config {
            user,
            classifier: ClassifierConfig::default(),
            stats: StatsConfig::default(),
            contacts: vec![ContactEntry {
                phone_number: "+15550200000".to_string(),
                display_name: "John Smith".to_string(),
                relationship: "friend".to_string(),
                auto_pass: true,
            }],
            workflows,
        }
    }
}

fn params(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
