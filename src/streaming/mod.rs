//! UDP side of the bridge
//!
//! - [`SensorPublisher`]: serial samples → XML telemetry datagrams
//! - [`ActuatorServer`]: XML command datagrams → serial torque writes

pub mod actuator_server;
pub mod sensor_publisher;
pub mod xml;

pub use actuator_server::{
    ActuatorServer, CommandHandler, CommandOutcome, ServerStats, ShutdownHandle,
};
pub use sensor_publisher::{PublisherStats, SensorPublisher};
pub use xml::TextEncoding;
