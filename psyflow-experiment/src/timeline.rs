use std::sync::Arc;

use psyflow_core::{ConstructionError, TrialDescriptor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// A declared piece of the experiment: a single trial or a block of them.
#[derive(Debug, Clone)]
pub enum TimelineNode {
    Trial(Arc<TrialDescriptor>),
    Block(ProceduralBlock),
}

impl TimelineNode {
    /// Units this node expands to once flattened.
    pub fn unit_count(&self) -> usize {
        match self {
            TimelineNode::Trial(_) => 1,
            TimelineNode::Block(b) => b.unit_count(),
        }
    }

    fn validate(&self) -> Result<(), ConstructionError> {
        match self {
            TimelineNode::Trial(t) => t.validate(),
            TimelineNode::Block(b) => b.validate(),
        }
    }
}

impl From<TrialDescriptor> for TimelineNode {
    fn from(t: TrialDescriptor) -> Self {
        TimelineNode::Trial(Arc::new(t))
    }
}

impl From<ProceduralBlock> for TimelineNode {
    fn from(b: ProceduralBlock) -> Self {
        TimelineNode::Block(b)
    }
}

/// Named group of nodes, repeated `repetitions` times, optionally shuffled
/// on each pass.
#[derive(Debug, Clone)]
pub struct ProceduralBlock {
    pub name: String,
    pub members: Vec<TimelineNode>,
    pub repetitions: usize,
    pub randomize_order: bool,
}

impl ProceduralBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            repetitions: 1,
            randomize_order: false,
        }
    }

    pub fn with_member(mut self, node: impl Into<TimelineNode>) -> Self {
        self.members.push(node.into());
        self
    }

    pub fn with_members<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<TimelineNode>,
    {
        self.members.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn repeat(mut self, n: usize) -> Self {
        self.repetitions = n;
        self
    }

    pub fn randomized(mut self) -> Self {
        self.randomize_order = true;
        self
    }

    pub fn unit_count(&self) -> usize {
        self.members.iter().map(TimelineNode::unit_count).sum::<usize>() * self.repetitions
    }

    fn validate(&self) -> Result<(), ConstructionError> {
        if self.members.is_empty() {
            return Err(ConstructionError::EmptyBlock(self.name.clone()));
        }
        if self.repetitions == 0 {
            return Err(ConstructionError::ZeroRepetitions(self.name.clone()));
        }
        self.members.iter().try_for_each(TimelineNode::validate)
    }
}

/// One executable item of a built timeline.
#[derive(Debug, Clone)]
pub struct Unit {
    pub descriptor: Arc<TrialDescriptor>,
    /// Slash-separated path of enclosing blocks, outermost first.
    pub block: Option<String>,
    /// Pass of the innermost enclosing block that produced this unit.
    pub repetition: usize,
}

impl Unit {
    /// True when the unit was produced by `block` or one of its sub-blocks.
    pub fn within(&self, block: &str) -> bool {
        self.block
            .as_deref()
            .is_some_and(|path| path.split('/').any(|seg| seg == block))
    }
}

/// Flat, ordered plan handed to the rendering engine. Only
/// [`TimelineBuilder::build`] produces one, so it is never empty.
#[derive(Debug, Clone)]
pub struct Timeline {
    units: Vec<Unit>,
}

impl Timeline {
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Unit> {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a Unit;
    type IntoIter = std::slice::Iter<'a, Unit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}

/// Declares the experiment top to bottom and flattens it into a [`Timeline`].
#[derive(Debug, Clone, Default)]
pub struct TimelineBuilder {
    nodes: Vec<TimelineNode>,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trial(mut self, trial: TrialDescriptor) -> Self {
        self.nodes.push(trial.into());
        self
    }

    pub fn block(mut self, block: ProceduralBlock) -> Self {
        self.nodes.push(block.into());
        self
    }

    pub fn push(&mut self, node: impl Into<TimelineNode>) {
        self.nodes.push(node.into());
    }

    pub fn unit_count(&self) -> usize {
        self.nodes.iter().map(TimelineNode::unit_count).sum()
    }

    /// Validates every node, then flattens depth-first. Fixed nodes keep
    /// declaration order; randomized blocks shuffle their members on each
    /// repetition.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Timeline, ConstructionError> {
        if self.nodes.is_empty() {
            return Err(ConstructionError::EmptyTimeline);
        }
        self.nodes.iter().try_for_each(TimelineNode::validate)?;

        let mut units = Vec::with_capacity(self.unit_count());
        for node in &self.nodes {
            flatten(node, None, 0, rng, &mut units);
        }
        tracing::debug!(units = units.len(), "timeline built");
        Ok(Timeline { units })
    }

    pub fn build_seeded(&self, seed: u64) -> Result<Timeline, ConstructionError> {
        self.build(&mut StdRng::seed_from_u64(seed))
    }
}

fn flatten<R: Rng + ?Sized>(
    node: &TimelineNode,
    parent: Option<&str>,
    repetition: usize,
    rng: &mut R,
    out: &mut Vec<Unit>,
) {
    match node {
        TimelineNode::Trial(t) => out.push(Unit {
            descriptor: Arc::clone(t),
            block: parent.map(str::to_string),
            repetition,
        }),
        TimelineNode::Block(b) => {
            let path = match parent {
                Some(p) => format!("{p}/{}", b.name),
                None => b.name.clone(),
            };
            let mut order: Vec<usize> = (0..b.members.len()).collect();
            for rep in 0..b.repetitions {
                if b.randomize_order {
                    order.shuffle(rng);
                }
                for &i in &order {
                    flatten(&b.members[i], Some(&path), rep, rng, out);
                }
            }
        }
    }
}
