//! Descriptive analysis of stored series
//!
//! Pure functions over observations: trend fitting, IQR outliers, pairwise
//! correlation and the plain-language insights built from them.

pub mod correlation;
pub mod insights;
pub mod outliers;
pub mod stats;
pub mod trend;

pub use correlation::{Correlation, Direction, Strength, analyze_correlation};
pub use insights::generate_insights;
pub use outliers::{Outlier, OutlierKind, detect_outliers};
pub use trend::{TrendAnalysis, TrendDirection, analyze_trend};
