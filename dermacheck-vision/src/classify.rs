use std::fmt;

use serde::{Deserialize, Serialize};

use crate::region::ZoneMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkinLabel {
    Normal,
    Dry,
    Oily,
    Combination,
    Sensitive,
}

impl SkinLabel {
    pub const ALL: [SkinLabel; 5] = [
        SkinLabel::Normal,
        SkinLabel::Dry,
        SkinLabel::Oily,
        SkinLabel::Combination,
        SkinLabel::Sensitive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SkinLabel::Normal => "normal",
            SkinLabel::Dry => "dry",
            SkinLabel::Oily => "oily",
            SkinLabel::Combination => "combination",
            SkinLabel::Sensitive => "sensitive",
        }
    }
}

impl fmt::Display for SkinLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map zone metrics to a skin label.
///
/// Rules are evaluated in order and the first match wins. The bands overlap,
/// so the order is part of the decision boundary.
pub fn classify(metrics: &ZoneMetrics) -> SkinLabel {
    let b = metrics.brightness.clamp(0.0, 255.0);
    let t = metrics.texture.clamp(0.0, 50.0);
    let r = metrics.redness.clamp(-50.0, 50.0);
    let u = metrics.uniformity.clamp(0.0, 50.0);

    if (r > 18.0 && t > 18.0) || r > 25.0 {
        return SkinLabel::Sensitive;
    }
    if b > 170.0 && t < 18.0 && u < 18.0 {
        return SkinLabel::Oily;
    }
    if b < 110.0 && t < 15.0 && u < 20.0 {
        return SkinLabel::Dry;
    }
    if ((130.0..=170.0).contains(&b) && t < 20.0 && u < 22.0)
        || ((120.0..=180.0).contains(&b) && t < 18.0 && u < 20.0 && r < 15.0)
    {
        return SkinLabel::Normal;
    }
    if ((120.0..=180.0).contains(&b) && (t > 18.0 || u > 20.0))
        || ((110.0..=190.0).contains(&b) && t > 15.0 && u > 18.0)
    {
        return SkinLabel::Combination;
    }

    // Outside every band above.
    if b > 180.0 {
        SkinLabel::Oily
    } else if b < 100.0 {
        SkinLabel::Dry
    } else if r > 20.0 {
        SkinLabel::Sensitive
    } else if t > 20.0 || u > 25.0 {
        SkinLabel::Combination
    } else {
        SkinLabel::Normal
    }
}
