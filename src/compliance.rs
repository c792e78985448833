// src/compliance.rs

// Stiffness setup for hand guiding. The cartesian impedance controller keeps
// pulling the arm back to its target; with every stiffness gain at zero the
// operator can move the arm freely to each calibration hole.

use log::info;

use crate::RecorderError;

/// Stiffness parameters zeroed at startup, in the order they are sent
pub const STIFFNESS_PARAMETERS: [&str; 6] = [
    "translational_stiffness_X",
    "translational_stiffness_Y",
    "translational_stiffness_Z",
    "rotational_stiffness_X",
    "rotational_stiffness_Y",
    "rotational_stiffness_Z",
];

/// Runtime parameter service of the compliance controller
#[cfg_attr(test, mockall::automock)]
pub trait StiffnessConfigurator {
    /// Sets one numeric parameter
    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), RecorderError>;
}

/// Sets every stiffness gain to zero; stops at the first failure
pub fn zero_stiffness(service: &mut dyn StiffnessConfigurator) -> Result<(), RecorderError> {
    for name in STIFFNESS_PARAMETERS {
        service.set_parameter(name, 0.0)?;
    }
    info!("Compliance stiffness zeroed, arm is free for hand guiding");
    Ok(())
}
