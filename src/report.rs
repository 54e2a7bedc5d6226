use std::fmt;

use dermacheck_vision::{Evidence, Prediction, SkinAnalysis};
use serde::Serialize;

use crate::recommend::{recommendations, Recommendation, DISCLAIMER};

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub analysis: SkinAnalysis,
    pub recommendations: Vec<Recommendation>,
    /// `None` when reference classification is off or the library is empty.
    pub reference: Option<Prediction>,
    pub disclaimer: &'static str,
}

impl Report {
    pub fn new(analysis: SkinAnalysis, reference: Option<Prediction>) -> Self {
        Self {
            recommendations: recommendations(&analysis.per_zone),
            analysis,
            reference,
            disclaimer: DISCLAIMER,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.analysis;
        writeln!(f, "Predominant skin type: {}", a.overall)?;
        writeln!(f, "Analysis confidence: {}%", a.confidence)?;

        writeln!(f, "\nRecommendations:")?;
        for rec in &self.recommendations {
            writeln!(f, "  {}: {}", rec.zone.name(), rec.advice)?;
        }

        writeln!(f, "\nZones:")?;
        for (zone, label) in a.per_zone.iter() {
            let m = a.metrics.get(zone);
            writeln!(
                f,
                "  {:<12} {:<12} brightness {:6.1}  redness {:6.1}  texture {:5.1}  uniformity {:5.1}",
                zone.name(),
                label.as_str(),
                m.brightness,
                m.redness,
                m.texture,
                m.uniformity
            )?;
        }

        writeln!(f)?;
        match &self.reference {
            Some(Prediction {
                category,
                evidence: Evidence::Distance(d),
            }) => writeln!(f, "Reference match: {} (distance {:.3})", category, d)?,
            Some(Prediction {
                category,
                evidence: Evidence::Confidence(c),
            }) => writeln!(f, "Reference match: {} ({}% confidence)", category, c)?,
            None => writeln!(f, "Reference classification inactive or library empty.")?,
        }

        writeln!(f, "\n{}", self.disclaimer)
    }
}
