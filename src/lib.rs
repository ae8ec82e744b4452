//! Safe access to the X Resize and Rotate extension through Xlib.
//!
//! Query results (screen resources, output and CRTC info, screen
//! configurations) are owned by [`Handle`]s that free the native allocation
//! exactly once. Their fields can be read through typed getters or projected
//! into dynamic [`Value`]s for untyped callers.

pub mod atoms;
pub mod codec;
pub mod conn;
pub mod crtc;
pub mod error;
pub mod geometry;
pub mod handle;
pub mod native;
pub mod output;
pub mod property;
pub mod resource;
pub mod screen;
pub mod screen_resources;
pub mod value;

pub use crate::{
    codec::{ChangeMode, ConfigStatus, ConnectionState, ModeFlags, NotifyMask, Rotation, SubpixelOrder},
    conn::{Connection, DisplayLock, ScreenSizeRange},
    crtc::{CrtcField, CrtcInfo, CrtcPlacement},
    error::{Error, Result},
    handle::Handle,
    native::{Atom, Drawable, RRCrtc, RRMode, RROutput, Time, Window},
    output::{OutputField, OutputInfo},
    property::{PropertyInfo, PropertyRequest, PropertyValue},
    resource::Resource,
    screen::{ScreenConfigField, ScreenConfiguration, ScreenSize},
    screen_resources::{ModeInfo, ScreenResources, ScreenResourcesField},
    value::{Record, Value},
};
