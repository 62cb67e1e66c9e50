//! Pipeline simplification
//!
//! Flattening a concatenation member by member routinely produces step
//! sequences where one member undoes what the previous one just did (a
//! height/depth reversal followed by its mirror, a unit conversion and its
//! opposite, a pop right after the matching push). Those pairs are elided
//! until a fixed point; no-op steps vanish first.

use crate::step::{Pipeline, PipelineStep};

pub fn simplify(pipeline: Pipeline) -> Pipeline {
    let mut steps: Vec<PipelineStep> = pipeline
        .steps
        .into_iter()
        .filter(|s| !matches!(s, PipelineStep::NoOp))
        .collect();

    loop {
        let before = steps.len();
        let mut out: Vec<PipelineStep> = Vec::with_capacity(before);
        for step in steps {
            match out.last() {
                Some(prev) if cancels(prev, &step) => {
                    out.pop();
                }
                _ => out.push(step),
            }
        }
        steps = out;
        if steps.len() == before {
            break;
        }
    }
    Pipeline::new(steps)
}

/// Two adjacent steps cancel when the second is exactly the first's
/// inverse.
fn cancels(a: &PipelineStep, b: &PipelineStep) -> bool {
    a.inverse() == *b
}

#[cfg(test)]
mod tests {
    use super::*;
    use graticule_core::UnitOfMeasure;

    fn swap() -> PipelineStep {
        PipelineStep::AxisSwap {
            order: vec![1, 2, -3],
        }
    }

    #[test]
    fn mirrored_axis_swaps_cancel() {
        let pipeline = simplify(Pipeline::new(vec![swap(), swap()]));
        assert!(pipeline.is_empty());
    }

    #[test]
    fn unit_conversion_and_its_opposite_cancel() {
        let m_to_ft = PipelineStep::UnitConvert {
            xy: None,
            z: Some((UnitOfMeasure::metre(), UnitOfMeasure::foot())),
        };
        let ft_to_m = m_to_ft.inverse();
        let offset = PipelineStep::GeographicOffset {
            dlat: 0.0,
            dlon: 0.0,
            dh: 0.34,
        };
        let pipeline = simplify(Pipeline::new(vec![
            offset.clone(),
            m_to_ft,
            ft_to_m,
            swap(),
        ]));
        assert_eq!(pipeline.steps, vec![offset, swap()]);
    }

    #[test]
    fn cancellation_cascades() {
        let push = PipelineStep::Push { dims: vec![3] };
        let pop = PipelineStep::Pop { dims: vec![3] };
        // push [swap swap] pop collapses entirely, inner pair first.
        let pipeline = simplify(Pipeline::new(vec![push, swap(), swap(), pop]));
        assert!(pipeline.is_empty());
    }

    #[test]
    fn noops_vanish() {
        let pipeline = simplify(Pipeline::new(vec![
            PipelineStep::NoOp,
            swap(),
            PipelineStep::NoOp,
        ]));
        assert_eq!(pipeline.steps, vec![swap()]);
    }

    #[test]
    fn non_adjacent_steps_survive() {
        let offset = PipelineStep::GeographicOffset {
            dlat: 0.0,
            dlon: 0.0,
            dh: 0.34,
        };
        let pipeline = simplify(Pipeline::new(vec![swap(), offset.clone(), swap()]));
        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.steps[1], offset);
    }
}
