//! Indicator catalog
//!
//! Maps short indicator keys (`ipca`, `selic`, ...) to SGS series ids and
//! display metadata.

use crate::utils::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Monthly,
    Quarterly,
    Irregular,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Daily => "daily",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Irregular => "irregular",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub key: String,
    pub series_id: u32,
    pub name: String,
    pub unit: String,
    pub frequency: Frequency,
    #[serde(default)]
    pub description: String,
}

impl Indicator {
    fn builtin(
        key: &str,
        series_id: u32,
        name: &str,
        unit: &str,
        frequency: Frequency,
        description: &str,
    ) -> Self {
        Self {
            key: key.to_string(),
            series_id,
            name: name.to_string(),
            unit: unit.to_string(),
            frequency,
            description: description.to_string(),
        }
    }
}

pub fn default_indicators() -> Vec<Indicator> {
    use Frequency::*;
    vec![
        Indicator::builtin("ipca", 433, "Inflation (IPCA)", "%", Monthly,
            "Broad National Consumer Price Index"),
        Indicator::builtin("pib", 4380, "Real GDP", "index", Quarterly,
            "Gross Domestic Product at constant prices"),
        Indicator::builtin("divida_pib", 13761, "Debt/GDP", "%", Monthly,
            "Public sector net debt as a share of GDP"),
        Indicator::builtin("selic", 11, "Daily SELIC Rate", "% p.a.", Daily,
            "Over/Selic interest rate"),
        Indicator::builtin("selic_meta", 4189, "SELIC Target", "% p.a.", Irregular,
            "Selic target rate set by Copom"),
        Indicator::builtin("transacoes", 22707, "Current Account Balance", "US$ mn", Monthly,
            "Balance of payments, current account balance"),
        Indicator::builtin("resultado_primario", 7547, "Primary Balance", "R$ mn", Monthly,
            "Fiscal indicators, central government primary balance"),
        Indicator::builtin("igpm", 189, "IGP-M", "%", Monthly,
            "General Market Price Index"),
        Indicator::builtin("inpc", 188, "INPC", "%", Monthly,
            "National Consumer Price Index"),
        Indicator::builtin("cambio_usd", 1, "USD Exchange Rate", "R$/US$", Daily,
            "Commercial exchange rate, R$ per US$, buying"),
        Indicator::builtin("reservas_internacionais", 3546, "International Reserves", "US$ mn", Daily,
            "Total international reserves"),
    ]
}

/// Ordered set of known indicators
#[derive(Debug, Clone)]
pub struct Catalog {
    indicators: Vec<Indicator>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(default_indicators())
    }
}

impl Catalog {
    pub fn new(indicators: Vec<Indicator>) -> Self {
        Self { indicators }
    }

    /// Built-in indicators overlaid with user-defined ones; a user entry
    /// with an existing key replaces the built-in entry in place.
    pub fn with_extra(extra: &[Indicator]) -> Self {
        let mut catalog = Self::default();
        for indicator in extra {
            match catalog.indicators.iter_mut().find(|i| i.key == indicator.key) {
                Some(existing) => *existing = indicator.clone(),
                None => catalog.indicators.push(indicator.clone()),
            }
        }
        catalog
    }

    pub fn get(&self, key: &str) -> Option<&Indicator> {
        self.indicators.iter().find(|i| i.key == key)
    }

    pub fn require(&self, key: &str) -> AppResult<&Indicator> {
        self.get(key)
            .ok_or_else(|| AppError::NotFound(format!("Indicator '{}'", key)))
    }

    pub fn keys(&self) -> Vec<String> {
        self.indicators.iter().map(|i| i.key.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Indicator> {
        self.indicators.iter()
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    pub fn display_name(&self, key: &str) -> String {
        self.get(key)
            .map(|i| i.name.clone())
            .unwrap_or_else(|| key.to_string())
    }

    /// Resolve a list of keys, failing on the first unknown one
    pub fn resolve(&self, keys: &[String]) -> AppResult<Vec<Indicator>> {
        keys.iter().map(|k| self.require(k).cloned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_contents() {
        let catalog = Catalog::default();
        assert_eq!(catalog.len(), 11);
        assert_eq!(catalog.get("ipca").unwrap().series_id, 433);
        assert_eq!(catalog.get("cambio_usd").unwrap().frequency, Frequency::Daily);
        assert_eq!(catalog.get("pib").unwrap().frequency, Frequency::Quarterly);
    }

    #[test]
    fn test_display_name_falls_back_to_key() {
        let catalog = Catalog::default();
        assert_eq!(catalog.display_name("ipca"), "Inflation (IPCA)");
        assert_eq!(catalog.display_name("unknown"), "unknown");
    }

    #[test]
    fn test_with_extra_replaces_and_appends() {
        let extra = vec![
            Indicator::builtin("ipca", 433, "IPCA monthly", "%", Frequency::Monthly, ""),
            Indicator::builtin("ibc_br", 24363, "IBC-Br", "index", Frequency::Monthly, ""),
        ];
        let catalog = Catalog::with_extra(&extra);
        assert_eq!(catalog.len(), 12);
        assert_eq!(catalog.keys()[0], "ipca");
        assert_eq!(catalog.display_name("ipca"), "IPCA monthly");
        assert_eq!(catalog.get("ibc_br").unwrap().series_id, 24363);
    }

    #[test]
    fn test_resolve_rejects_unknown_key() {
        let catalog = Catalog::default();
        let ok = catalog.resolve(&["ipca".to_string(), "selic".to_string()]).unwrap();
        assert_eq!(ok.len(), 2);
        let err = catalog.resolve(&["nope".to_string()]).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
