use psyflow_core::{DotMotion, StimulusType, TrialDescriptor};
use psyflow_experiment::{ProceduralBlock, TimelineBuilder};

pub const LEFT_KEY: &str = "a";
pub const RIGHT_KEY: &str = "l";
const COHERENCES: [f32; 3] = [0.1, 0.3, 0.5];

fn fixation() -> TrialDescriptor {
    TrialDescriptor::new("fixation", StimulusType::fixation())
        .with_duration_ms(500)
        .with_task("fixation")
}

fn rdk(direction_deg: f32, coherence: f32, phase: &str) -> TrialDescriptor {
    let (label, key) = if direction_deg == 180.0 {
        ("left", LEFT_KEY)
    } else {
        ("right", RIGHT_KEY)
    };
    TrialDescriptor::new(
        format!("rdk_{label}_{coherence:.1}"),
        StimulusType::DotMotion(DotMotion::single(direction_deg, coherence)),
    )
    .with_duration_ms(2000)
    .with_choices([LEFT_KEY, RIGHT_KEY])
    .with_correct_response(key)
    .with_task("response")
    .with_tag("phase", phase)
    .with_tag("coherence", f64::from(coherence))
    .save_incrementally(true)
}

/// Fixation followed by one dot-motion trial, kept together when shuffled.
fn pair(direction_deg: f32, coherence: f32, phase: &str) -> ProceduralBlock {
    ProceduralBlock::new(format!("{phase}_{direction_deg:.0}_{coherence:.1}"))
        .with_member(fixation())
        .with_member(rdk(direction_deg, coherence, phase))
}

/// Welcome, instructions, a short practice block and the repeated test block.
pub fn timeline() -> TimelineBuilder {
    let practice = ProceduralBlock::new("practice")
        .with_members([pair(180.0, 0.5, "practice"), pair(0.0, 0.5, "practice")])
        .randomized();

    let test = ProceduralBlock::new("test")
        .with_members(
            COHERENCES
                .iter()
                .flat_map(|&c| [pair(180.0, c, "test"), pair(0.0, c, "test")]),
        )
        .repeat(2)
        .randomized();

    TimelineBuilder::new()
        .trial(
            TrialDescriptor::new("welcome", StimulusType::text("Welcome! Press ENTER to begin."))
                .with_choices([" "])
                .with_task("instructions"),
        )
        .trial(
            TrialDescriptor::new(
                "instructions",
                StimulusType::Html {
                    markup: format!(
                        "<p>Dots will move left or right.</p>\
                         <p>Press <b>{LEFT_KEY}</b> for left and <b>{RIGHT_KEY}</b> for right.</p>"
                    ),
                },
            )
            .with_choices([" "])
            .with_task("instructions"),
        )
        .block(practice)
        .block(test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_timeline_builds() {
        let builder = timeline();
        let t = builder.build_seeded(1).unwrap();
        // 2 intro screens, 2 practice pairs, 6 test pairs twice
        assert_eq!(t.len(), 2 + 2 * 2 + 6 * 2 * 2);
        assert_eq!(t.len(), builder.unit_count());
    }

    #[test]
    fn only_dot_motion_trials_save_incrementally() {
        let t = timeline().build_seeded(5).unwrap();
        for unit in t.iter() {
            let d = &unit.descriptor;
            assert_eq!(d.save_incrementally, d.task.as_deref() == Some("response"));
        }
    }
}
