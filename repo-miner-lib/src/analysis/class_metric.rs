use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// A per-class column produced by the analysis tool.
///
/// The string form is the column name in the tool's class table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ClassMetric {
    /// Lines of code
    Loc,

    /// Coupling between objects
    Cbo,

    /// Depth of inheritance tree
    Dit,

    /// Lack of cohesion of methods
    Lcom,

    /// Weighted methods per class
    Wmc,

    /// Response for a class
    Rfc,

    /// Number of children
    Noc,
}

impl ClassMetric {
    #[must_use]
    pub fn column(self) -> &'static str {
        self.into()
    }
}
