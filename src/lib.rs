pub mod classifier;
pub mod config;
pub mod contacts;
pub mod decision;
pub mod gateway;
pub mod heuristic;
pub mod orchestrator;
pub mod screening;
pub mod stats;
pub mod types;
pub mod workflow;

pub use classifier::{HttpClassifier, KeywordClassifier, RemoteClassifier};
pub use config::Config;
pub use contacts::{ContactLookup, StaticContacts};
pub use decision::DecisionEngine;
pub use heuristic::{HeuristicResult, HeuristicScorer};
pub use orchestrator::{AnalysisOrchestrator, CallAssessment};
pub use screening::{CallMonitor, CallScreener};
pub use types::{CallContext, Contact, Decision, Intent, Recommendation, RouteAction};
pub use workflow::{Workflow, WorkflowEngine};
