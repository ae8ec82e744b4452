use crate::{
    codec::ModeFlags,
    conn::Connection,
    error::Result,
    handle::{Handle, NativeResource},
    native::{self, Backend, RRCrtc, RRMode, RROutput, Time, Window, XRRModeInfo, XRRScreenResources},
    value::{Record, Value},
};

use {log::trace, std::rc::Rc};

pub enum ScreenResourcesKind {}

impl NativeResource for ScreenResourcesKind {
    type Raw = XRRScreenResources;
    const KIND: &'static str = "screen resources";

    unsafe fn release(backend: &dyn Backend, raw: *mut XRRScreenResources) {
        backend.free_screen_resources(raw)
    }
}

/// A snapshot of every CRTC, output and mode the server knows about.
pub type ScreenResources = Handle<ScreenResourcesKind>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenResourcesField {
    Timestamp,
    ConfigTimestamp,
    Crtcs,
    Outputs,
    Modes,
}

impl ScreenResourcesField {
    pub const ALL: [ScreenResourcesField; 5] = [
        ScreenResourcesField::Timestamp,
        ScreenResourcesField::ConfigTimestamp,
        ScreenResourcesField::Crtcs,
        ScreenResourcesField::Outputs,
        ScreenResourcesField::Modes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScreenResourcesField::Timestamp => "timestamp",
            ScreenResourcesField::ConfigTimestamp => "configTimestamp",
            ScreenResourcesField::Crtcs => "crtcs",
            ScreenResourcesField::Outputs => "outputs",
            ScreenResourcesField::Modes => "modes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// A display mode, copied out of its screen resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeInfo {
    pub id: RRMode,
    pub name: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub dot_clock: u64,
    pub h_sync_start: u32,
    pub h_sync_end: u32,
    pub h_total: u32,
    pub h_skew: u32,
    pub v_sync_start: u32,
    pub v_sync_end: u32,
    pub v_total: u32,
    pub flags: ModeFlags,
}

impl ModeInfo {
    /// # Safety
    ///
    /// `raw.name` must point at `raw.nameLength` bytes.
    pub(crate) unsafe fn from_raw(raw: &XRRModeInfo) -> Self {
        ModeInfo {
            id: raw.id,
            name: native::raw_slice(raw.name as *const u8, raw.nameLength as i32).to_vec(),
            width: raw.width,
            height: raw.height,
            dot_clock: u64::from(raw.dotClock),
            h_sync_start: raw.hSyncStart,
            h_sync_end: raw.hSyncEnd,
            h_total: raw.hTotal,
            h_skew: raw.hSkew,
            v_sync_start: raw.vSyncStart,
            v_sync_end: raw.vSyncEnd,
            v_total: raw.vTotal,
            flags: ModeFlags::from_native(u64::from(raw.modeFlags)),
        }
    }

    /// Vertical refresh in Hz, or `None` when the timings are degenerate.
    pub fn refresh_rate(&self) -> Option<f64> {
        let mut v_total = f64::from(self.v_total);
        if self.flags.contains(ModeFlags::DOUBLE_SCAN) {
            v_total *= 2.0;
        }
        if self.flags.contains(ModeFlags::INTERLACE) {
            v_total /= 2.0;
        }
        let pixels = f64::from(self.h_total) * v_total;
        if pixels > 0.0 {
            Some(self.dot_clock as f64 / pixels)
        } else {
            None
        }
    }

    pub fn to_record(&self) -> Record {
        Record::with_capacity(13)
            .field("id", self.id)
            .field("name", Value::string(&self.name))
            .field("width", self.width)
            .field("height", self.height)
            .field("dotClock", self.dot_clock)
            .field("hSyncStart", self.h_sync_start)
            .field("hSyncEnd", self.h_sync_end)
            .field("hTotal", self.h_total)
            .field("hSkew", self.h_skew)
            .field("vSyncStart", self.v_sync_start)
            .field("vSyncEnd", self.v_sync_end)
            .field("vTotal", self.v_total)
            .field("modeFlags", self.flags.to_record())
    }
}

impl Handle<ScreenResourcesKind> {
    pub fn timestamp(&self) -> Time {
        self.raw().timestamp
    }

    pub fn config_timestamp(&self) -> Time {
        self.raw().configTimestamp
    }

    pub fn crtcs(&self) -> Vec<RRCrtc> {
        let raw = self.raw();
        unsafe { native::raw_slice(raw.crtcs, raw.ncrtc) }.to_vec()
    }

    pub fn outputs(&self) -> Vec<RROutput> {
        let raw = self.raw();
        unsafe { native::raw_slice(raw.outputs, raw.noutput) }.to_vec()
    }

    /// Whether `crtc` is part of this snapshot. Asking the server about any
    /// other id is a protocol error, which Xlib's default handler turns into
    /// process exit.
    pub fn has_crtc(&self, crtc: RRCrtc) -> bool {
        let raw = self.raw();
        unsafe { native::raw_slice(raw.crtcs, raw.ncrtc) }.contains(&crtc)
    }

    pub fn has_output(&self, output: RROutput) -> bool {
        let raw = self.raw();
        unsafe { native::raw_slice(raw.outputs, raw.noutput) }.contains(&output)
    }

    pub fn modes(&self) -> Vec<ModeInfo> {
        let raw = self.raw();
        unsafe { native::raw_slice(raw.modes, raw.nmode) }
            .iter()
            .map(|m| unsafe { ModeInfo::from_raw(m) })
            .collect()
    }

    pub fn mode(&self, id: RRMode) -> Option<ModeInfo> {
        let raw = self.raw();
        unsafe { native::raw_slice(raw.modes, raw.nmode) }
            .iter()
            .find(|m| m.id == id)
            .map(|m| unsafe { ModeInfo::from_raw(m) })
    }

    /// Materializes one field. Lists are rebuilt on every call.
    pub fn project(&self, field: ScreenResourcesField) -> Value {
        trace!("projecting screen resources field {}", field.name());
        match field {
            ScreenResourcesField::Timestamp => self.timestamp().into(),
            ScreenResourcesField::ConfigTimestamp => self.config_timestamp().into(),
            ScreenResourcesField::Crtcs => Value::integers(self.crtcs()),
            ScreenResourcesField::Outputs => Value::integers(self.outputs()),
            ScreenResourcesField::Modes => Value::List(
                self.modes()
                    .iter()
                    .map(|m| Value::from(m.to_record()))
                    .collect(),
            ),
        }
    }

    pub fn to_record(&self) -> Record {
        ScreenResourcesField::ALL
            .iter()
            .fold(Record::with_capacity(5), |record, f| {
                record.field(f.name(), self.project(*f))
            })
    }
}

impl Connection {
    /// Full query; may make the server re-probe its outputs. `None` means the
    /// default root window.
    pub fn get_screen_resources(self: &Rc<Self>, window: Option<Window>) -> Result<ScreenResources> {
        let window = self.window_or_root(window)?;
        let raw = self.native()?.get_screen_resources(window);
        Handle::acquire(self, raw, window)
    }

    /// Like [`get_screen_resources`](Connection::get_screen_resources) but
    /// returns the server's cached view without probing.
    pub fn get_screen_resources_current(
        self: &Rc<Self>,
        window: Option<Window>,
    ) -> Result<ScreenResources> {
        let window = self.window_or_root(window)?;
        let raw = self.native()?.get_screen_resources_current(window);
        Handle::acquire(self, raw, window)
    }
}
