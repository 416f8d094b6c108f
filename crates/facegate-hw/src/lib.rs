//! facegate-hw: Hardware abstraction for camera capture and door I/O.
//!
//! Provides V4L2 camera access producing RGB frames, and GrovePi I2C
//! digital I/O for the door relay and push switch.

pub mod board;
pub mod camera;
pub mod feed;
pub mod frame;
pub mod grovepi;
pub mod relay;

pub use board::is_raspberry_pi;
pub use camera::{Camera, CameraError, PixelFormat};
pub use feed::{label_frame, CameraFeed};
pub use frame::Frame;
pub use grovepi::{BusError, GrovePi, I2cBus, LinuxI2c, PinMode};
pub use relay::{GroveRelay, GroveSwitch};
