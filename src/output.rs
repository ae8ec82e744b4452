use crate::{
    codec::{ConnectionState, SubpixelOrder},
    conn::Connection,
    error::{Error, Result},
    geometry::PhysicalSize,
    handle::{Handle, NativeResource},
    native::{self, Backend, RRCrtc, RRMode, RROutput, Time, Window, XRROutputInfo},
    screen_resources::ScreenResources,
    value::{Record, Value},
};

use {
    log::{debug, trace},
    std::rc::Rc,
};

pub enum OutputInfoKind {}

impl NativeResource for OutputInfoKind {
    type Raw = XRROutputInfo;
    const KIND: &'static str = "output";

    unsafe fn release(backend: &dyn Backend, raw: *mut XRROutputInfo) {
        backend.free_output_info(raw)
    }
}

/// State of one output (connector) at the time of the query.
pub type OutputInfo = Handle<OutputInfoKind>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputField {
    Timestamp,
    Name,
    Crtc,
    NPreferred,
    MmWidth,
    MmHeight,
    Connection,
    SubpixelOrder,
    Crtcs,
    Clones,
    Modes,
}

impl OutputField {
    pub const ALL: [OutputField; 11] = [
        OutputField::Timestamp,
        OutputField::Name,
        OutputField::Crtc,
        OutputField::NPreferred,
        OutputField::MmWidth,
        OutputField::MmHeight,
        OutputField::Connection,
        OutputField::SubpixelOrder,
        OutputField::Crtcs,
        OutputField::Clones,
        OutputField::Modes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OutputField::Timestamp => "timestamp",
            OutputField::Name => "name",
            OutputField::Crtc => "crtc",
            OutputField::NPreferred => "npreferred",
            OutputField::MmWidth => "mm_width",
            OutputField::MmHeight => "mm_height",
            OutputField::Connection => "connection",
            OutputField::SubpixelOrder => "subpixel_order",
            OutputField::Crtcs => "crtcs",
            OutputField::Clones => "clones",
            OutputField::Modes => "modes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

impl Handle<OutputInfoKind> {
    pub fn timestamp(&self) -> Time {
        self.raw().timestamp
    }

    /// Connector name. Not guaranteed to be UTF-8.
    pub fn name(&self) -> Vec<u8> {
        let raw = self.raw();
        unsafe { native::raw_slice(raw.name as *const u8, raw.nameLen) }.to_vec()
    }

    /// The CRTC driving this output, if any.
    pub fn crtc(&self) -> Option<RRCrtc> {
        match self.raw().crtc {
            native::NONE => None,
            crtc => Some(crtc),
        }
    }

    pub fn mm_size(&self) -> PhysicalSize {
        let raw = self.raw();
        PhysicalSize::new(u64::from(raw.mm_width), u64::from(raw.mm_height))
    }

    pub fn connection_state(&self) -> ConnectionState {
        ConnectionState::from_native(self.raw().connection)
    }

    pub fn subpixel_order(&self) -> SubpixelOrder {
        SubpixelOrder::from_native(self.raw().subpixel_order)
    }

    /// CRTCs this output can be driven by.
    pub fn crtcs(&self) -> Vec<RRCrtc> {
        let raw = self.raw();
        unsafe { native::raw_slice(raw.crtcs, raw.ncrtc) }.to_vec()
    }

    pub fn clones(&self) -> Vec<RROutput> {
        let raw = self.raw();
        unsafe { native::raw_slice(raw.clones, raw.nclone) }.to_vec()
    }

    pub fn modes(&self) -> Vec<RRMode> {
        let raw = self.raw();
        unsafe { native::raw_slice(raw.modes, raw.nmode) }.to_vec()
    }

    /// Number of leading entries of [`modes`](Self::modes) the monitor prefers.
    pub fn npreferred(&self) -> i32 {
        self.raw().npreferred
    }

    pub fn preferred_modes(&self) -> Vec<RRMode> {
        let mut modes = self.modes();
        modes.truncate(self.npreferred().max(0) as usize);
        modes
    }

    pub fn project(&self, field: OutputField) -> Value {
        trace!("projecting output field {}", field.name());
        let raw = self.raw();
        match field {
            OutputField::Timestamp => raw.timestamp.into(),
            OutputField::Name => Value::string(self.name()),
            OutputField::Crtc => raw.crtc.into(),
            OutputField::NPreferred => raw.npreferred.into(),
            OutputField::MmWidth => raw.mm_width.into(),
            OutputField::MmHeight => raw.mm_height.into(),
            OutputField::Connection => Value::string(self.connection_state().name()),
            OutputField::SubpixelOrder => Value::string(self.subpixel_order().name()),
            OutputField::Crtcs => Value::integers(self.crtcs()),
            OutputField::Clones => Value::integers(self.clones()),
            OutputField::Modes => Value::integers(self.modes()),
        }
    }

    pub fn to_record(&self) -> Record {
        OutputField::ALL
            .iter()
            .fold(Record::with_capacity(OutputField::ALL.len()), |record, f| {
                record.field(f.name(), self.project(*f))
            })
    }
}

impl ScreenResources {
    pub fn output_info(&self, output: RROutput) -> Result<OutputInfo> {
        self.connection().get_output_info(self, output)
    }
}

impl Connection {
    pub fn get_output_info(
        self: &Rc<Self>,
        resources: &ScreenResources,
        output: RROutput,
    ) -> Result<OutputInfo> {
        if !resources.has_output(output) {
            return Err(Error::not_found(OutputInfoKind::KIND, output));
        }
        let raw = unsafe { self.native()?.get_output_info(resources.as_ptr(), output) };
        Handle::acquire(self, raw, output)
    }

    /// The primary output of `window`'s screen, or `None` when no output is primary.
    pub fn get_output_primary(&self, window: Option<Window>) -> Result<Option<RROutput>> {
        let window = self.window_or_root(window)?;
        let output = self.native()?.get_output_primary(window);
        trace!("primary output of {} is {}", window, output);
        Ok(match output {
            native::NONE => None,
            output => Some(output),
        })
    }

    /// Marks `output` as primary; `None` clears the primary output.
    pub fn set_output_primary(&self, window: Option<Window>, output: Option<RROutput>) -> Result<()> {
        let window = self.window_or_root(window)?;
        let output = output.unwrap_or(native::NONE);
        debug!("setting primary output of {} to {}", window, output);
        self.native()?.set_output_primary(window, output);
        Ok(())
    }
}
