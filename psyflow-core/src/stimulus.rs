use serde::{Deserialize, Serialize};

use crate::error::ConstructionError;

/// What a unit puts in front of the participant. The engine decides how to draw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StimulusType {
    Text { content: String },
    Html { markup: String },
    Fixation { symbol: String },
    DotMotion(DotMotion),
}

/// Random-dot kinematogram. Every per-aperture array must hold exactly
/// `number_of_apertures` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DotMotion {
    pub number_of_apertures: usize,
    pub coherent_direction_deg: Vec<f32>,
    pub coherence: Vec<f32>,
    pub number_of_dots: Vec<u32>,
    pub dot_color: Vec<String>,
}

/// One aperture of a validated [`DotMotion`].
#[derive(Debug, Clone, PartialEq)]
pub struct Aperture {
    pub direction_deg: f32,
    pub coherence: f32,
    pub dots: u32,
    pub color: String,
}

impl DotMotion {
    /// Single aperture with the usual defaults.
    pub fn single(direction_deg: f32, coherence: f32) -> Self {
        Self {
            number_of_apertures: 1,
            coherent_direction_deg: vec![direction_deg],
            coherence: vec![coherence],
            number_of_dots: vec![300],
            dot_color: vec!["white".to_string()],
        }
    }

    fn check(&self) -> Result<(), String> {
        if self.number_of_apertures == 0 {
            return Err("dot motion needs at least one aperture".into());
        }
        let n = self.number_of_apertures;
        let lengths = [
            ("coherent_direction_deg", self.coherent_direction_deg.len()),
            ("coherence", self.coherence.len()),
            ("number_of_dots", self.number_of_dots.len()),
            ("dot_color", self.dot_color.len()),
        ];
        for (field, len) in lengths {
            if len != n {
                return Err(format!("{field} has {len} entries for {n} apertures"));
            }
        }
        if let Some(c) = self.coherence.iter().find(|c| !(0.0..=1.0).contains(*c)) {
            return Err(format!("coherence {c} outside [0, 1]"));
        }
        Ok(())
    }

    pub fn apertures(&self) -> Vec<Aperture> {
        let n = [
            self.number_of_apertures,
            self.coherent_direction_deg.len(),
            self.coherence.len(),
            self.number_of_dots.len(),
            self.dot_color.len(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0);
        (0..n)
            .map(|i| Aperture {
                direction_deg: self.coherent_direction_deg[i],
                coherence: self.coherence[i],
                dots: self.number_of_dots[i],
                color: self.dot_color[i].clone(),
            })
            .collect()
    }
}

impl StimulusType {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn fixation() -> Self {
        Self::Fixation {
            symbol: "+".to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StimulusType::Text { .. } => "text",
            StimulusType::Html { .. } => "html",
            StimulusType::Fixation { .. } => "fixation",
            StimulusType::DotMotion(_) => "dot_motion",
        }
    }

    /// Structural checks. `trial` names the owning descriptor in the error.
    pub fn validate(&self, trial: &str) -> Result<(), ConstructionError> {
        match self {
            StimulusType::DotMotion(rdk) => rdk
                .check()
                .map_err(|reason| ConstructionError::malformed(trial, reason)),
            StimulusType::Html { markup } if markup.trim().is_empty() => {
                Err(ConstructionError::malformed(trial, "empty html stimulus"))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_aperture_arrays_are_rejected() {
        let mut rdk = DotMotion::single(0.0, 0.5);
        rdk.number_of_apertures = 2;
        rdk.coherent_direction_deg.push(180.0);
        rdk.coherence.push(0.5);
        rdk.number_of_dots.push(300);
        // dot_color still has one entry

        let err = StimulusType::DotMotion(rdk).validate("rdk_1").unwrap_err();
        assert_eq!(
            err,
            ConstructionError::malformed("rdk_1", "dot_color has 1 entries for 2 apertures")
        );
    }

    #[test]
    fn coherence_out_of_range_is_rejected() {
        let rdk = DotMotion::single(90.0, 1.5);
        assert!(StimulusType::DotMotion(rdk).validate("x").is_err());
    }

    #[test]
    fn valid_dot_motion_yields_apertures() {
        let rdk = DotMotion::single(90.0, 0.25);
        assert!(StimulusType::DotMotion(rdk.clone()).validate("x").is_ok());
        let aps = rdk.apertures();
        assert_eq!(aps.len(), 1);
        assert_eq!(aps[0].direction_deg, 90.0);
        assert_eq!(aps[0].dots, 300);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(StimulusType::fixation()).unwrap();
        assert_eq!(json["kind"], "fixation");
        assert_eq!(json["symbol"], "+");
    }
}
