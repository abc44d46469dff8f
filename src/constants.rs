//! # Robot Constants
//!
//! Names of the services, frames, motion groups and named poses the task states
//! address, plus the fixed per-behaviour geometric offsets.
//!
//! Offsets are expressed in the working frame (`/base_link`) in metres.

/// Service and action endpoints
pub mod services {
    pub const BASE_IS_MOVING: &str = "/base_controller/is_moving";
    pub const BASE_STOP: &str = "/base_controller/stop";
    pub const IK_SOLVER: &str = "/arm_kinematics/get_ik";
    pub const JOINT_STIFFNESS: &str = "/arm_controller/set_joint_stiffness";
    pub const OBJECT_DETECTION: &str = "/object_detection/detect_object";
    pub const TRAY_CHECK_OCCUPIED: &str = "/tray/check_occupied";
    pub const MOTION_MODE_START: &str = "/mm/start";
    pub const MOTION_MODE_STOP: &str = "/mm/stop";
    pub const DOOR_OPENING_ACTION: &str = "/moveCirc";
    pub const TRANSFORM: &str = "tf";
}

/// Coordinate frames
pub mod frames {
    pub const BASE_LINK: &str = "/base_link";
}

/// Motion groups understood by the motion command dispatcher
pub mod groups {
    pub const BASE: &str = "base";
    pub const ARM: &str = "arm";
    pub const TORSO: &str = "torso";
    pub const HEAD: &str = "head";
    pub const HAND: &str = "sdh";
    pub const TRAY: &str = "tray";
}

/// Link the IK solver plans for
pub const IK_LINK_NAME: &str = "sdh_grasp_link";

/// Named targets of the motion groups
pub mod poses {
    pub const HOME: &str = "home";
    pub const FRONT: &str = "front";
    pub const BACK: &str = "back";
    pub const UP: &str = "up";
    pub const DOWN: &str = "down";
    pub const NOD: &str = "nod";
    pub const SHAKE: &str = "shake";
    pub const HOLD: &str = "hold";
    pub const DOOR_RELEASE: &str = "door_release";
    pub const LOOK_AT_TABLE: &str = "folded-to-look_at_table";

    pub const HAND_CYL_OPEN: &str = "cylopen";
    pub const HAND_CYL_CLOSED: &str = "cylclosed";
    pub const HAND_CYL_TOTAL_OPEN: &str = "cyltotalopen";
    pub const HAND_SPHER_OPEN: &str = "spheropen";
    pub const HAND_SPHER_CLOSED: &str = "spherclosed";

    pub const GRASP_TO_TRAY: &str = "grasp-to-tray";
    pub const GRASP_TO_TRAY_TOP: &str = "grasp-to-tray_top";
    pub const TRAY_TO_FOLDED: &str = "tray-to-folded";
    pub const TRAY_TOP_TO_FOLDED: &str = "tray_top-to-folded";
}

/// Default base motion mode for approach moves
pub const DEFAULT_BASE_MODE: &str = "linear";

/// Side grasp geometry
pub mod side_grasp {
    pub const STIFFNESS: [f64; 7] = [300.0, 300.0, 300.0, 100.0, 100.0, 100.0, 100.0];
    /// Fixed hand orientation as roll, pitch, yaw
    pub const ORIENTATION_RPY: (f64, f64, f64) = (-1.552, -0.042, 2.481);
    pub const PRE_GRASP_OFFSET: (f64, f64, f64) = (0.10, 0.10, 0.15);
    pub const POST_GRASP_OFFSET: (f64, f64, f64) = (0.05, 0.0, 0.17);
}

/// Top grasp geometry
pub mod top_grasp {
    pub const STIFFNESS: [f64; 7] = [100.0; 7];
    pub const ORIENTATION_RPY: (f64, f64, f64) = (3.121, 0.077, -2.662);
    pub const PRE_GRASP_OFFSET: (f64, f64, f64) = (0.0, 0.0, 0.18);
    pub const POST_GRASP_OFFSET: (f64, f64, f64) = (0.05, 0.0, 0.15);
}

/// Door opening geometry
pub mod door {
    pub const STIFFNESS: [f64; 7] = [100.0; 7];
    /// Handle position relative to the detected door marker
    pub const HANDLE_OFFSET: (f64, f64, f64) = (0.06, 0.15, -0.04);
    /// Fixed handle orientation as quaternion (x, y, z, w)
    pub const HANDLE_ORIENTATION: (f64, f64, f64, f64) = (-0.495, -0.532, 0.452, 0.517);
    pub const PRE_DOOR_OFFSET: (f64, f64, f64) = (0.05, 0.0, 0.0);
}

/// Operator facing phrases
pub mod speech {
    pub const PATH_BLOCKED: &str =
        "I can not reach my target position because my path or target is blocked, I will abort.";
    pub const MANUAL_CONFIRMATION: &str = "If the task is completed, please confirm - Y/N";
}
