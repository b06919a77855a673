use crate::models::Merchant;

/// Minimum learned confidence before a merchant default is applied
/// automatically. Below this, transactions stay uncategorized for manual
/// review: a wrong guess costs more than a missing one.
pub const CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Confidence recorded when a user explicitly confirms a categorization.
pub const MANUAL_CONFIDENCE: f64 = 1.0;

/// The category a new transaction from this merchant should get, or None.
///
/// Deterministic lookup plus threshold; no guessing. Only merchants whose
/// default was learned from a user confirmation carry confidence at all.
pub fn suggest_category(merchant: &Merchant) -> Option<i64> {
    match (merchant.default_category_id, merchant.confidence) {
        (Some(category_id), Some(confidence)) if confidence >= CONFIDENCE_THRESHOLD => {
            Some(category_id)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merchant(default_category_id: Option<i64>, confidence: Option<f64>) -> Merchant {
        Merchant {
            id: 1,
            household_id: 1,
            merchant_key: "starbucks".to_string(),
            display_name: "Starbucks".to_string(),
            default_category_id,
            confidence,
        }
    }

    #[test]
    fn test_confident_merchant_is_applied() {
        assert_eq!(suggest_category(&merchant(Some(7), Some(1.0))), Some(7));
        assert_eq!(suggest_category(&merchant(Some(7), Some(CONFIDENCE_THRESHOLD))), Some(7));
    }

    #[test]
    fn test_low_confidence_never_auto_assigns() {
        assert_eq!(suggest_category(&merchant(Some(7), Some(0.3))), None);
        assert_eq!(suggest_category(&merchant(Some(7), Some(0.59))), None);
    }

    #[test]
    fn test_unlearned_merchant_stays_uncategorized() {
        assert_eq!(suggest_category(&merchant(None, None)), None);
        // Default without recorded confidence is not trusted either
        assert_eq!(suggest_category(&merchant(Some(7), None)), None);
    }
}
