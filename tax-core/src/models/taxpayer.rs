use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxpayer {
    pub name: String,
    /// Computerized National Identity Card number, as typed.
    pub cnic: String,
}
