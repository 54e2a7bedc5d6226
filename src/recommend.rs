use dermacheck_vision::{PerZone, SkinLabel, Zone};
use serde::Serialize;

pub const DISCLAIMER: &str =
    "This analysis is indicative only and does not replace a consultation with a dermatologist.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub zone: Zone,
    pub advice: &'static str,
}

/// Skincare advice for one zone.
pub fn advice(zone: Zone, label: SkinLabel) -> &'static str {
    use SkinLabel::*;

    match (zone, label) {
        (Zone::TZone, Oily) => "Cleanse with salicylic acid, oil-free moisturizer, light sunscreen.",
        (Zone::TZone, Dry) => "Intense hydration, avoid harsh exfoliants.",
        (Zone::TZone, Combination) => "Shine control and gentle cleansing.",
        (Zone::TZone, Sensitive) => "Hypoallergenic, soothing products.",
        (Zone::TZone, Normal) => "Balanced routine and sun protection.",

        (Zone::Cheeks, Dry) => "Deep hydration with ceramides, avoid alcohol.",
        (Zone::Cheeks, Sensitive) => "Soothing products, mineral sunscreen.",
        (Zone::Cheeks, Oily) => "Oil-free cleansing and gentle exfoliation.",
        (Zone::Cheeks, Combination) => "Light hydration and shine control.",
        (Zone::Cheeks, Normal) => "Hydration and sun protection.",

        (Zone::Eyes, _) => {
            "Use a light cream with caffeine and peptides, daily lymphatic massage."
        }
        (Zone::Lips, _) => "Shea butter balm, gentle weekly exfoliation, sun protection.",

        (Zone::Chin, Oily) => "Retinoids or BHA and consistent cleansing.",
        (Zone::Chin, Dry) => "Hydration and avoiding irritants.",
        (Zone::Chin, Sensitive) => "Soothing products and sun protection.",
        (Zone::Chin, Combination) => "Sebum control and gentle cleansing.",
        (Zone::Chin, Normal) => "Balanced routine and sun protection.",
    }
}

/// One recommendation per zone, in zone order.
pub fn recommendations(labels: &PerZone<SkinLabel>) -> Vec<Recommendation> {
    labels
        .iter()
        .map(|(zone, &label)| Recommendation {
            zone,
            advice: advice(zone, label),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_line_per_zone() {
        let labels = PerZone::from_fn(|_| SkinLabel::Oily);
        let recs = recommendations(&labels);
        assert_eq!(recs.len(), 5);
        assert_eq!(recs[0].zone, Zone::TZone);
        assert!(recs[0].advice.contains("salicylic"));
        assert_eq!(recs[4].advice, advice(Zone::Chin, SkinLabel::Oily));
    }

    #[test]
    fn test_eye_and_lip_advice_is_fixed() {
        for label in SkinLabel::ALL {
            assert_eq!(advice(Zone::Eyes, label), advice(Zone::Eyes, SkinLabel::Normal));
            assert_eq!(advice(Zone::Lips, label), advice(Zone::Lips, SkinLabel::Normal));
        }
    }
}
