//! Motion program payload model.
//!
//! The scheduler treats these types as opaque cargo. Only the raster pipeline
//! looks inside them, and only to split a program into segments, stitch
//! boundary states and concatenate results.

use serde::{Deserialize, Serialize};

/// Joint-space state a move drives towards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Joint names, parallel to `positions`.
    pub joint_names: Vec<String>,
    /// Joint positions.
    pub positions: Vec<f64>,
}

impl Waypoint {
    /// Creates a waypoint from joint names and positions.
    #[must_use]
    pub fn new(joint_names: Vec<String>, positions: Vec<f64>) -> Self {
        Self {
            joint_names,
            positions,
        }
    }
}

/// Motion type of a [`MoveInstruction`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    /// Unconstrained motion between states.
    #[default]
    Freespace,
    /// Straight-line Cartesian motion.
    Linear,
}

/// A single move to a waypoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveInstruction {
    /// Human-readable description.
    pub description: String,
    /// Planner profile name.
    #[serde(default)]
    pub profile: String,
    /// Motion type.
    #[serde(default)]
    pub kind: MoveKind,
    /// Target state.
    pub waypoint: Waypoint,
}

impl MoveInstruction {
    /// Creates a move of the given kind.
    #[must_use]
    pub fn new(description: impl Into<String>, kind: MoveKind, waypoint: Waypoint) -> Self {
        Self {
            description: description.into(),
            profile: String::new(),
            kind,
            waypoint,
        }
    }

    /// Sets the planner profile.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }
}

/// Manipulator a program is planned for.
///
/// Empty fields mean "inherit from the enclosing program or environment".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManipulatorInfo {
    /// Kinematic group name.
    #[serde(default)]
    pub manipulator: String,
    /// Frame the waypoints are expressed in.
    #[serde(default)]
    pub working_frame: String,
    /// Tool centre point frame.
    #[serde(default)]
    pub tcp_frame: String,
}

impl ManipulatorInfo {
    /// Creates a manipulator description.
    #[must_use]
    pub fn new(
        manipulator: impl Into<String>,
        working_frame: impl Into<String>,
        tcp_frame: impl Into<String>,
    ) -> Self {
        Self {
            manipulator: manipulator.into(),
            working_frame: working_frame.into(),
            tcp_frame: tcp_frame.into(),
        }
    }

    /// Returns `self` with every empty field filled from `parent`.
    #[must_use]
    pub fn combined(&self, parent: &ManipulatorInfo) -> ManipulatorInfo {
        let pick = |own: &String, inherited: &String| {
            if own.is_empty() {
                inherited.clone()
            } else {
                own.clone()
            }
        };
        ManipulatorInfo {
            manipulator: pick(&self.manipulator, &parent.manipulator),
            working_frame: pick(&self.working_frame, &parent.working_frame),
            tcp_frame: pick(&self.tcp_frame, &parent.tcp_frame),
        }
    }

    /// Returns `true` if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.manipulator.is_empty() && self.working_frame.is_empty() && self.tcp_frame.is_empty()
    }
}

/// One entry of a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    /// A single move.
    Move(MoveInstruction),
    /// A nested group.
    Composite(CompositeInstruction),
}

impl Instruction {
    /// Returns the nested composite, if this is one.
    #[must_use]
    pub fn as_composite(&self) -> Option<&CompositeInstruction> {
        match self {
            Self::Composite(composite) => Some(composite),
            Self::Move(_) => None,
        }
    }

    /// Returns the move, if this is one.
    #[must_use]
    pub fn as_move(&self) -> Option<&MoveInstruction> {
        match self {
            Self::Move(mv) => Some(mv),
            Self::Composite(_) => None,
        }
    }

    /// Returns `true` for [`Instruction::Composite`].
    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }
}

impl From<MoveInstruction> for Instruction {
    fn from(value: MoveInstruction) -> Self {
        Self::Move(value)
    }
}

impl From<CompositeInstruction> for Instruction {
    fn from(value: CompositeInstruction) -> Self {
        Self::Composite(value)
    }
}

/// An ordered group of instructions.
///
/// A raster program is a composite whose children are composites too:
/// `[from_start, raster, transition, raster, ..., raster, to_end]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeInstruction {
    /// Human-readable description.
    pub description: String,
    /// Planner profile name.
    #[serde(default)]
    pub profile: String,
    /// Manipulator override for this group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manipulator: Option<ManipulatorInfo>,
    #[serde(default)]
    instructions: Vec<Instruction>,
}

impl CompositeInstruction {
    /// Creates an empty composite.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Sets the planner profile.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Sets the manipulator override.
    #[must_use]
    pub fn with_manipulator(mut self, manipulator: ManipulatorInfo) -> Self {
        self.manipulator = Some(manipulator);
        self
    }

    /// Appends an instruction, builder style.
    #[must_use]
    pub fn with(mut self, instruction: impl Into<Instruction>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    /// Appends an instruction.
    pub fn push(&mut self, instruction: impl Into<Instruction>) {
        self.instructions.push(instruction.into());
    }

    /// Inserts an instruction at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, instruction: impl Into<Instruction>) {
        self.instructions.insert(index, instruction.into());
    }

    /// Removes and returns the instruction at `index`, if present.
    pub fn remove(&mut self, index: usize) -> Option<Instruction> {
        (index < self.instructions.len()).then(|| self.instructions.remove(index))
    }

    /// Removes every instruction, keeping description, profile and manipulator.
    pub fn clear(&mut self) {
        self.instructions.clear();
    }

    /// Number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if there are no direct children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Returns the direct child at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Returns the direct children.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Iterates over direct children.
    pub fn iter(&self) -> core::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// First move in depth-first order.
    #[must_use]
    pub fn first_move(&self) -> Option<&MoveInstruction> {
        self.instructions.iter().find_map(|instruction| match instruction {
            Instruction::Move(mv) => Some(mv),
            Instruction::Composite(composite) => composite.first_move(),
        })
    }

    /// Last move in depth-first order.
    #[must_use]
    pub fn last_move(&self) -> Option<&MoveInstruction> {
        self.instructions
            .iter()
            .rev()
            .find_map(|instruction| match instruction {
                Instruction::Move(mv) => Some(mv),
                Instruction::Composite(composite) => composite.last_move(),
            })
    }

    /// Mutable access to the first move in depth-first order.
    pub fn first_move_mut(&mut self) -> Option<&mut MoveInstruction> {
        self.instructions
            .iter_mut()
            .find_map(|instruction| match instruction {
                Instruction::Move(mv) => Some(mv),
                Instruction::Composite(composite) => composite.first_move_mut(),
            })
    }

    /// Mutable access to the last move in depth-first order.
    pub fn last_move_mut(&mut self) -> Option<&mut MoveInstruction> {
        self.instructions
            .iter_mut()
            .rev()
            .find_map(|instruction| match instruction {
                Instruction::Move(mv) => Some(mv),
                Instruction::Composite(composite) => composite.last_move_mut(),
            })
    }

    /// Total number of moves, recursively.
    #[must_use]
    pub fn move_count(&self) -> usize {
        self.instructions
            .iter()
            .map(|instruction| match instruction {
                Instruction::Move(_) => 1,
                Instruction::Composite(composite) => composite.move_count(),
            })
            .sum()
    }
}

impl<'a> IntoIterator for &'a CompositeInstruction {
    type Item = &'a Instruction;
    type IntoIter = core::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}
