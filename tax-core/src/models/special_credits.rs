use serde::{Deserialize, Serialize};

/// Taxpayer categories that qualify for a liability reduction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecialCredits {
    pub first_time_filer: bool,
    pub it_sector: bool,
    /// Accepted from the form but carries no reduction yet.
    pub export_industry: bool,
}

impl SpecialCredits {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn any(&self) -> bool {
        self.first_time_filer || self.it_sector || self.export_industry
    }
}
