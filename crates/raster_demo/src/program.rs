//! The example raster program.

use taskweave_data::{CompositeInstruction, ManipulatorInfo, MoveInstruction, MoveKind, Waypoint};

pub const FREESPACE_PROFILE: &str = "DEFAULT";
pub const PROCESS_PROFILE: &str = "PROCESS";

fn joint_names() -> Vec<String> {
    (1..=6).map(|i| format!("joint_{i}")).collect()
}

/// Joint-space stand-in for a tool pose at `(x, y)` on the work surface.
fn pose(x: f64, y: f64) -> Waypoint {
    Waypoint::new(joint_names(), vec![x, y, 0.8, 0.0, 0.0, -1.0])
}

fn freespace(description: &str, waypoint: Waypoint) -> MoveInstruction {
    MoveInstruction::new(description, MoveKind::Freespace, waypoint).with_profile(FREESPACE_PROFILE)
}

fn linear(x: f64, y: f64) -> MoveInstruction {
    MoveInstruction::new("raster", MoveKind::Linear, pose(x, y)).with_profile(PROCESS_PROFILE)
}

/// Four rasters across the surface, alternating direction, joined by three
/// freespace transitions.
pub fn raster_example_program() -> CompositeInstruction {
    let home = Waypoint::new(joint_names(), vec![0.0; 6]);
    let mut program = CompositeInstruction::new("raster_example")
        .with_manipulator(ManipulatorInfo::new("manipulator", "base_link", "tool0"));

    program.push(
        CompositeInstruction::new("from_start")
            .with_profile(FREESPACE_PROFILE)
            .with(freespace("Start", home.clone()))
            .with(freespace("from_start_plan", pose(0.8, -0.3))),
    );

    let forward_sweep = [-0.2, -0.1, 0.0, 0.1, 0.2, 0.3];
    let backward_sweep = [0.2, 0.1, 0.0, -0.1, -0.2, -0.3];
    for i in 0..4_u32 {
        let x = 0.8 + f64::from(i) * 0.1;
        let forward = i % 2 == 0;
        let mut raster = CompositeInstruction::new(format!("Raster #{}", i + 1))
            .with_profile(PROCESS_PROFILE);
        let sweep = if forward { forward_sweep } else { backward_sweep };
        for y in sweep {
            raster.push(linear(x, y));
        }
        program.push(raster);

        if i < 3 {
            let next_x = 0.8 + f64::from(i + 1) * 0.1;
            let y = if forward { 0.3 } else { -0.3 };
            program.push(
                CompositeInstruction::new(format!("Transition #{}", i + 1))
                    .with_profile(FREESPACE_PROFILE)
                    .with(freespace("transition_from_end_plan", pose(next_x, y))),
            );
        }
    }

    program.push(
        CompositeInstruction::new("to_end")
            .with_profile(FREESPACE_PROFILE)
            .with(freespace("to_end_plan", home)),
    );
    program
}
