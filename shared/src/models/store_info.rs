//! Store Info Model

use serde::{Deserialize, Serialize};

/// Establishment identity printed on receipt headers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// 营业时区 (IANA, e.g. "America/Sao_Paulo")
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "America/Sao_Paulo".to_string()
}
