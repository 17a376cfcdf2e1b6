//! Ad copy risk engine.
//!
//! Classifies advertising text into risk tiers against fixed keyword lists,
//! highlights the matched terms, counts them, and exports the verdicts as a
//! one-page PDF report or a BOM-prefixed CSV table.
//!
//! ```no_run
//! use ad_risk_engine::{Classifier, RiskTier};
//!
//! let classifier = Classifier::builtin()?;
//! let result = classifier.analyze("100% 보장! 의사 추천 제품입니다");
//! assert_eq!(result.tier, RiskTier::Mid);
//! assert_eq!(result.keyword_count, 2);
//! # Ok::<(), ad_risk_engine::AnalysisError>(())
//! ```

pub mod batch;
pub mod classifier;
pub mod config;
pub mod error;
pub mod keywords;
pub mod metrics;
pub mod models;
pub mod report;
pub mod server;
pub mod terminal;

pub use classifier::{analyze_single, Classifier, Marker};
pub use error::{AnalysisError, Result};
pub use keywords::KeywordLists;
pub use models::{AnalysisResult, RiskTier, TierDistribution};
