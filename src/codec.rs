//! Conversions between small native enumerations / flag words and their
//! named representations.
//!
//! Names follow the RandR protocol document.

use {
    bitflags::bitflags,
    log::warn,
    std::os::raw::c_int,
};

use crate::value::{Record, Value};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connected = 0,
    Disconnected = 1,
    Unknown = 2,
}

impl ConnectionState {
    pub const ALL: [ConnectionState; 3] = [
        ConnectionState::Connected,
        ConnectionState::Disconnected,
        ConnectionState::Unknown,
    ];

    /// Out-of-range values are a libXrandr defect; they read as `Unknown`.
    pub fn from_native(raw: u16) -> Self {
        match raw {
            0 => ConnectionState::Connected,
            1 => ConnectionState::Disconnected,
            2 => ConnectionState::Unknown,
            other => {
                warn!("connection state {} out of range, treating as unknown", other);
                ConnectionState::Unknown
            }
        }
    }

    pub fn to_native(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Unknown => "UnknownConnection",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubpixelOrder {
    Unknown = 0,
    HorizontalRgb = 1,
    HorizontalBgr = 2,
    VerticalRgb = 3,
    VerticalBgr = 4,
    NoSubpixel = 5,
}

impl SubpixelOrder {
    pub const ALL: [SubpixelOrder; 6] = [
        SubpixelOrder::Unknown,
        SubpixelOrder::HorizontalRgb,
        SubpixelOrder::HorizontalBgr,
        SubpixelOrder::VerticalRgb,
        SubpixelOrder::VerticalBgr,
        SubpixelOrder::NoSubpixel,
    ];

    /// Out-of-range values are a libXrandr defect; they read as `Unknown`.
    pub fn from_native(raw: u16) -> Self {
        match Self::ALL.get(usize::from(raw)) {
            Some(order) => *order,
            None => {
                warn!("subpixel order {} out of range, treating as unknown", raw);
                SubpixelOrder::Unknown
            }
        }
    }

    pub fn to_native(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            SubpixelOrder::Unknown => "SubPixelUnknown",
            SubpixelOrder::HorizontalRgb => "SubPixelHorizontalRGB",
            SubpixelOrder::HorizontalBgr => "SubPixelHorizontalBGR",
            SubpixelOrder::VerticalRgb => "SubPixelVerticalRGB",
            SubpixelOrder::VerticalBgr => "SubPixelVerticalBGR",
            SubpixelOrder::NoSubpixel => "SubPixelNone",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }
}

bitflags! {
    /// Mode timing flags. Only the low 14 bits are defined.
    pub struct ModeFlags: u32 {
        const HSYNC_POSITIVE   = 1 << 0;
        const HSYNC_NEGATIVE   = 1 << 1;
        const VSYNC_POSITIVE   = 1 << 2;
        const VSYNC_NEGATIVE   = 1 << 3;
        const INTERLACE        = 1 << 4;
        const DOUBLE_SCAN      = 1 << 5;
        const CSYNC            = 1 << 6;
        const CSYNC_POSITIVE   = 1 << 7;
        const CSYNC_NEGATIVE   = 1 << 8;
        const HSKEW_PRESENT    = 1 << 9;
        const BCAST            = 1 << 10;
        const PIXEL_MULTIPLEX  = 1 << 11;
        const DOUBLE_CLOCK     = 1 << 12;
        const CLOCK_DIVIDE_BY2 = 1 << 13;
    }
}

/// Record field names for the mode flags, indexed by bit position.
pub const MODE_FLAG_NAMES: [&str; 14] = [
    "HSyncPositive",
    "HSyncNegative",
    "VSyncPositive",
    "VSyncNegative",
    "Interlace",
    "DoubleScan",
    "CSync",
    "CSyncPositive",
    "CSyncNegative",
    "HSkewPresent",
    "BCast",
    "PixelMultiplex",
    "DoubleClock",
    "ClockDivideBy2",
];

impl ModeFlags {
    /// Undefined high bits of the native word are dropped.
    pub fn from_native(raw: u64) -> Self {
        ModeFlags::from_bits_truncate((raw & u64::from(ModeFlags::all().bits())) as u32)
    }

    /// Expands to a record of 14 booleans in bit order.
    pub fn to_record(self) -> Record {
        let mut record = Record::with_capacity(MODE_FLAG_NAMES.len());
        for (bit, name) in MODE_FLAG_NAMES.iter().enumerate() {
            record.set(*name, self.bits() & (1 << bit) != 0);
        }
        record
    }

    /// Packs a flag record back into a word. Missing fields count as unset.
    pub fn from_record(record: &Record) -> Self {
        MODE_FLAG_NAMES
            .iter()
            .enumerate()
            .filter(|(_, name)| record.get(name).truthy())
            .fold(ModeFlags::empty(), |acc, (bit, _)| {
                acc | ModeFlags::from_bits_truncate(1 << bit)
            })
    }
}

bitflags! {
    pub struct Rotation: u16 {
        const ROTATE_0   = 1 << 0;
        const ROTATE_90  = 1 << 1;
        const ROTATE_180 = 1 << 2;
        const ROTATE_270 = 1 << 3;
        const REFLECT_X  = 1 << 4;
        const REFLECT_Y  = 1 << 5;
    }
}

impl Rotation {
    pub fn from_native(raw: u16) -> Self {
        Rotation::from_bits_truncate(raw)
    }

    /// True when the rotation swaps width and height.
    pub fn is_transposed(self) -> bool {
        self.intersects(Rotation::ROTATE_90 | Rotation::ROTATE_270)
    }
}

bitflags! {
    /// Event selection mask for `XRRSelectInput`.
    pub struct NotifyMask: c_int {
        const SCREEN            = 1 << 0;
        const CRTC              = 1 << 1;
        const OUTPUT            = 1 << 2;
        const OUTPUT_PROPERTY   = 1 << 3;
        const PROVIDER          = 1 << 4;
        const PROVIDER_PROPERTY = 1 << 5;
        const RESOURCE          = 1 << 6;
    }
}

const NOTIFY_MASK_FIELDS: [(&str, NotifyMask); 7] = [
    ("screen", NotifyMask::SCREEN),
    ("crtc", NotifyMask::CRTC),
    ("output", NotifyMask::OUTPUT),
    ("output_property", NotifyMask::OUTPUT_PROPERTY),
    ("provider", NotifyMask::PROVIDER),
    ("provider_property", NotifyMask::PROVIDER_PROPERTY),
    ("resource", NotifyMask::RESOURCE),
];

impl NotifyMask {
    /// Builds a mask from a record of booleans such as `{screen = true, crtc = true}`.
    pub fn from_record(record: &Record) -> Self {
        NOTIFY_MASK_FIELDS
            .iter()
            .filter(|(name, _)| record.get(name).truthy())
            .fold(NotifyMask::empty(), |acc, (_, mask)| acc | *mask)
    }
}

/// How `XRRChangeOutputProperty` combines new data with the existing value.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeMode {
    Replace = 0,
    Prepend = 1,
    Append = 2,
}

impl ChangeMode {
    pub fn from_native(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(ChangeMode::Replace),
            1 => Some(ChangeMode::Prepend),
            2 => Some(ChangeMode::Append),
            _ => None,
        }
    }

    pub fn to_native(self) -> c_int {
        self as c_int
    }
}

/// Outcome of a configuration request, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStatus {
    Success,
    InvalidConfigTime,
    InvalidTime,
    Failed,
    Other(c_int),
}

impl ConfigStatus {
    pub fn from_native(raw: c_int) -> Self {
        match raw {
            0 => ConfigStatus::Success,
            1 => ConfigStatus::InvalidConfigTime,
            2 => ConfigStatus::InvalidTime,
            3 => ConfigStatus::Failed,
            other => ConfigStatus::Other(other),
        }
    }

    pub fn code(self) -> c_int {
        match self {
            ConfigStatus::Success => 0,
            ConfigStatus::InvalidConfigTime => 1,
            ConfigStatus::InvalidTime => 2,
            ConfigStatus::Failed => 3,
            ConfigStatus::Other(code) => code,
        }
    }

    pub fn is_success(self) -> bool {
        self == ConfigStatus::Success
    }

    pub fn name(self) -> &'static str {
        match self {
            ConfigStatus::Success => "Success",
            ConfigStatus::InvalidConfigTime => "InvalidConfigTime",
            ConfigStatus::InvalidTime => "InvalidTime",
            ConfigStatus::Failed => "Failed",
            ConfigStatus::Other(_) => "Other",
        }
    }

    /// `code` keeps RandR's numbering, where 0 is success; `success` carries
    /// the outcome as a boolean for callers that test truthiness.
    pub fn to_record(self) -> Record {
        Record::with_capacity(3)
            .field("code", self.code())
            .field("name", Value::string(self.name()))
            .field("success", self.is_success())
    }

    pub fn to_value(self) -> Value {
        self.to_record().into()
    }
}
