use serde::Serialize;
use std::fmt;

/// Anomaly counts above this value are critical.
pub const CRITICAL_THRESHOLD: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    #[serde(rename = "Cumpliendo")]
    Compliant,
    #[serde(rename = "Atención")]
    Attention,
    #[serde(rename = "Crítico")]
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Compliant => "Cumpliendo",
            Severity::Attention => "Atención",
            Severity::Critical => "Crítico",
        }
    }

    /// Remediation text only survives on non-compliant controls.
    pub fn keeps_required_action(&self) -> bool {
        !matches!(self, Severity::Compliant)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn classify(count: u64) -> Severity {
    match count {
        0 => Severity::Compliant,
        c if c > CRITICAL_THRESHOLD => Severity::Critical,
        _ => Severity::Attention,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(classify(0), Severity::Compliant);
        assert_eq!(classify(1), Severity::Attention);
        assert_eq!(classify(15), Severity::Attention);
        assert_eq!(classify(16), Severity::Critical);
        assert_eq!(classify(u64::MAX), Severity::Critical);
    }

    #[test]
    fn test_serialized_labels() {
        assert_eq!(serde_json::to_value(Severity::Compliant).unwrap(), "Cumpliendo");
        assert_eq!(serde_json::to_value(Severity::Attention).unwrap(), "Atención");
        assert_eq!(serde_json::to_value(Severity::Critical).unwrap(), "Crítico");
    }

    proptest! {
        #[test]
        fn prop_critical_iff_above_threshold(count in any::<u64>()) {
            prop_assert_eq!(classify(count) == Severity::Critical, count > 15);
        }

        #[test]
        fn prop_attention_iff_between_one_and_threshold(count in any::<u64>()) {
            prop_assert_eq!(classify(count) == Severity::Attention, count > 0 && count <= 15);
        }

        #[test]
        fn prop_compliant_iff_zero(count in 0u64..64) {
            prop_assert_eq!(classify(count) == Severity::Compliant, count == 0);
        }
    }
}
