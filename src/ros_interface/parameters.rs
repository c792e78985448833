// src/ros_interface/parameters.rs
// Remote parameter client for the compliance controller node, built on the
// standard `<node>/set_parameters` service.

use r2r::QosProfile;
use r2r::rcl_interfaces::msg::{Parameter, ParameterType, ParameterValue};
use r2r::rcl_interfaces::srv::SetParameters;

/// Service name for setting parameters on `node`
pub fn set_parameters_service(node: &str) -> String {
    format!("{}/set_parameters", node.trim_end_matches('/'))
}

/// Request setting a single double parameter
pub fn double_request(name: &str, value: f64) -> SetParameters::Request {
    SetParameters::Request {
        parameters: vec![Parameter {
            name: name.to_string(),
            value: ParameterValue {
                type_: ParameterType::PARAMETER_DOUBLE,
                double_value: value,
                ..Default::default()
            },
        }],
    }
}

/// Creates the client for the compliance node's parameter service
pub fn client(
    node: &mut r2r::Node,
    compliance_node: &str,
) -> Result<r2r::Client<SetParameters::Service>, r2r::Error> {
    node.create_client::<SetParameters::Service>(
        &set_parameters_service(compliance_node),
        QosProfile::default(),
    )
}
