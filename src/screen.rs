use crate::{
    codec::{ConfigStatus, Rotation},
    conn::Connection,
    error::Result,
    geometry::{PhysicalSize, XSize},
    handle::{Handle, NativeResource},
    native::{Backend, Drawable, Time, Window, XRRScreenConfiguration, XRRScreenSize},
    value::{Record, Value},
};

use {
    log::{debug, trace, warn},
    std::{os::raw::c_int, rc::Rc},
};

pub enum ScreenConfigKind {}

impl NativeResource for ScreenConfigKind {
    type Raw = XRRScreenConfiguration;
    const KIND: &'static str = "screen configuration";

    unsafe fn release(backend: &dyn Backend, raw: *mut XRRScreenConfiguration) {
        backend.free_screen_config_info(raw)
    }
}

/// The pre-1.2 whole-screen configuration: a size table, refresh rates per
/// size, and the current choice.
pub type ScreenConfiguration = Handle<ScreenConfigKind>;

/// One entry of the size table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub pixels: XSize,
    pub physical: PhysicalSize,
}

impl ScreenSize {
    fn from_raw(raw: &XRRScreenSize) -> Self {
        ScreenSize {
            pixels: XSize::new(raw.width, raw.height),
            physical: PhysicalSize::new(raw.mwidth.max(0) as u64, raw.mheight.max(0) as u64),
        }
    }

    pub fn to_record(&self) -> Record {
        Record::with_capacity(4)
            .field("width", self.pixels.width)
            .field("height", self.pixels.height)
            .field("mwidth", self.physical.width)
            .field("mheight", self.physical.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenConfigField {
    Rotations,
    Rotation,
    Timestamp,
    ConfigTimestamp,
    Sizes,
    SizeIndex,
    Rate,
}

impl ScreenConfigField {
    pub const ALL: [ScreenConfigField; 7] = [
        ScreenConfigField::Rotations,
        ScreenConfigField::Rotation,
        ScreenConfigField::Timestamp,
        ScreenConfigField::ConfigTimestamp,
        ScreenConfigField::Sizes,
        ScreenConfigField::SizeIndex,
        ScreenConfigField::Rate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScreenConfigField::Rotations => "rotations",
            ScreenConfigField::Rotation => "rotation",
            ScreenConfigField::Timestamp => "timestamp",
            ScreenConfigField::ConfigTimestamp => "configTimestamp",
            ScreenConfigField::Sizes => "sizes",
            ScreenConfigField::SizeIndex => "sizeIndex",
            ScreenConfigField::Rate => "rate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

// The accessors below only read the client-side copy and never fail.
impl Handle<ScreenConfigKind> {
    fn backend(&self) -> &dyn Backend {
        self.connection().backend()
    }

    /// `(supported, current)`.
    pub fn rotations(&self) -> (Rotation, Rotation) {
        let (supported, current) = unsafe { self.backend().config_rotations(self.as_ptr()) };
        (Rotation::from_native(supported), Rotation::from_native(current))
    }

    /// `(timestamp, config_timestamp)`.
    pub fn times(&self) -> (Time, Time) {
        unsafe { self.backend().config_times(self.as_ptr()) }
    }

    pub fn sizes(&self) -> Vec<ScreenSize> {
        unsafe { self.backend().config_sizes(self.as_ptr()) }
            .iter()
            .map(ScreenSize::from_raw)
            .collect()
    }

    /// Refresh rates available at size `size_index`; empty when out of range.
    pub fn rates(&self, size_index: i32) -> Vec<i16> {
        unsafe { self.backend().config_rates(self.as_ptr(), size_index) }
    }

    /// `(size_index, rotation)`.
    pub fn current_configuration(&self) -> (u16, Rotation) {
        let (size_index, rotation) =
            unsafe { self.backend().config_current_configuration(self.as_ptr()) };
        (size_index, Rotation::from_native(rotation))
    }

    pub fn current_rate(&self) -> i16 {
        unsafe { self.backend().config_current_rate(self.as_ptr()) }
    }

    pub fn project(&self, field: ScreenConfigField) -> Value {
        trace!("projecting screen configuration field {}", field.name());
        match field {
            ScreenConfigField::Rotations => self.rotations().0.bits().into(),
            ScreenConfigField::Rotation => self.rotations().1.bits().into(),
            ScreenConfigField::Timestamp => self.times().0.into(),
            ScreenConfigField::ConfigTimestamp => self.times().1.into(),
            ScreenConfigField::Sizes => Value::List(
                self.sizes()
                    .iter()
                    .map(|s| Value::from(s.to_record()))
                    .collect(),
            ),
            ScreenConfigField::SizeIndex => self.current_configuration().0.into(),
            ScreenConfigField::Rate => self.current_rate().into(),
        }
    }

    pub fn to_record(&self) -> Record {
        ScreenConfigField::ALL
            .iter()
            .fold(Record::with_capacity(ScreenConfigField::ALL.len()), |record, f| {
                record.field(f.name(), self.project(*f))
            })
    }
}

impl Connection {
    /// `None` means the default root window.
    pub fn get_screen_info(self: &Rc<Self>, window: Option<Window>) -> Result<ScreenConfiguration> {
        let window = self.window_or_root(window)?;
        let raw = self.native()?.get_screen_info(window);
        Handle::acquire(self, raw, window)
    }

    pub fn set_screen_config(
        &self,
        config: &ScreenConfiguration,
        drawable: Drawable,
        size_index: c_int,
        rotation: Rotation,
        timestamp: Time,
    ) -> Result<ConfigStatus> {
        self.submit_screen_config(config, drawable, size_index, rotation, None, timestamp)
    }

    pub fn set_screen_config_and_rate(
        &self,
        config: &ScreenConfiguration,
        drawable: Drawable,
        size_index: c_int,
        rotation: Rotation,
        rate: i16,
        timestamp: Time,
    ) -> Result<ConfigStatus> {
        self.submit_screen_config(config, drawable, size_index, rotation, Some(rate), timestamp)
    }

    fn submit_screen_config(
        &self,
        config: &ScreenConfiguration,
        drawable: Drawable,
        size_index: c_int,
        rotation: Rotation,
        rate: Option<i16>,
        timestamp: Time,
    ) -> Result<ConfigStatus> {
        let native = self.native()?;
        debug!(
            "setting screen config of {} to size {} rotation {:?} rate {:?}",
            drawable, size_index, rotation, rate
        );
        let status = unsafe {
            native.set_screen_config(
                config.as_ptr(),
                drawable,
                size_index,
                rotation.bits(),
                rate,
                timestamp,
            )
        };
        let status = ConfigStatus::from_native(status);
        if !status.is_success() {
            warn!("server rejected screen configuration: {}", status.name());
        }
        Ok(status)
    }
}
