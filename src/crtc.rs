use crate::{
    codec::{ConfigStatus, Rotation},
    conn::Connection,
    error::{Error, Result},
    geometry::{self, AsScreenBox, ScreenBox},
    handle::{Handle, NativeResource},
    native::{self, Backend, RRCrtc, RRMode, RROutput, RawCrtcConfig, Time, XRRCrtcInfo},
    screen_resources::ScreenResources,
    value::{Record, Value},
};

use {
    log::{debug, trace, warn},
    std::rc::Rc,
};

pub enum CrtcInfoKind {}

impl NativeResource for CrtcInfoKind {
    type Raw = XRRCrtcInfo;
    const KIND: &'static str = "crtc";

    unsafe fn release(backend: &dyn Backend, raw: *mut XRRCrtcInfo) {
        backend.free_crtc_info(raw)
    }
}

/// State of one CRTC at the time of the query.
pub type CrtcInfo = Handle<CrtcInfoKind>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrtcField {
    Timestamp,
    X,
    Y,
    Width,
    Height,
    Mode,
    Rotation,
    Rotations,
    Outputs,
    Possible,
}

impl CrtcField {
    pub const ALL: [CrtcField; 10] = [
        CrtcField::Timestamp,
        CrtcField::X,
        CrtcField::Y,
        CrtcField::Width,
        CrtcField::Height,
        CrtcField::Mode,
        CrtcField::Rotation,
        CrtcField::Rotations,
        CrtcField::Outputs,
        CrtcField::Possible,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CrtcField::Timestamp => "timestamp",
            CrtcField::X => "x",
            CrtcField::Y => "y",
            CrtcField::Width => "width",
            CrtcField::Height => "height",
            CrtcField::Mode => "mode",
            CrtcField::Rotation => "rotation",
            CrtcField::Rotations => "rotations",
            CrtcField::Outputs => "outputs",
            CrtcField::Possible => "possible",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

impl Handle<CrtcInfoKind> {
    pub fn timestamp(&self) -> Time {
        self.raw().timestamp
    }

    pub fn x(&self) -> i32 {
        self.raw().x
    }

    pub fn y(&self) -> i32 {
        self.raw().y
    }

    pub fn width(&self) -> u32 {
        self.raw().width
    }

    pub fn height(&self) -> u32 {
        self.raw().height
    }

    /// The mode being scanned out, or `None` when the CRTC is disabled.
    pub fn mode(&self) -> Option<RRMode> {
        match self.raw().mode {
            native::NONE => None,
            mode => Some(mode),
        }
    }

    pub fn rotation(&self) -> Rotation {
        Rotation::from_native(self.raw().rotation)
    }

    /// Rotations and reflections the CRTC supports.
    pub fn rotations(&self) -> Rotation {
        Rotation::from_native(self.raw().rotations)
    }

    pub fn outputs(&self) -> Vec<RROutput> {
        let raw = self.raw();
        unsafe { native::raw_slice(raw.outputs, raw.noutput) }.to_vec()
    }

    pub fn possible(&self) -> Vec<RROutput> {
        let raw = self.raw();
        unsafe { native::raw_slice(raw.possible, raw.npossible) }.to_vec()
    }

    /// The scan-out rectangle in root window coordinates.
    pub fn frame(&self) -> ScreenBox {
        self.as_screen_box()
    }

    pub fn project(&self, field: CrtcField) -> Value {
        trace!("projecting crtc field {}", field.name());
        let raw = self.raw();
        match field {
            CrtcField::Timestamp => raw.timestamp.into(),
            CrtcField::X => raw.x.into(),
            CrtcField::Y => raw.y.into(),
            CrtcField::Width => raw.width.into(),
            CrtcField::Height => raw.height.into(),
            CrtcField::Mode => raw.mode.into(),
            CrtcField::Rotation => raw.rotation.into(),
            CrtcField::Rotations => raw.rotations.into(),
            CrtcField::Outputs => Value::integers(self.outputs()),
            CrtcField::Possible => Value::integers(self.possible()),
        }
    }

    pub fn to_record(&self) -> Record {
        CrtcField::ALL
            .iter()
            .fold(Record::with_capacity(CrtcField::ALL.len()), |record, f| {
                record.field(f.name(), self.project(*f))
            })
    }
}

impl AsScreenBox for CrtcInfo {
    fn as_screen_box(&self) -> ScreenBox {
        geometry::screen_box(self.x(), self.y(), self.width(), self.height())
    }
}

/// Where and how a CRTC should scan out. A `mode` of `None` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrtcPlacement {
    pub timestamp: Time,
    pub x: i32,
    pub y: i32,
    pub mode: Option<RRMode>,
    pub rotation: Rotation,
}

impl CrtcPlacement {
    pub fn disabled(timestamp: Time) -> Self {
        CrtcPlacement {
            timestamp,
            x: 0,
            y: 0,
            mode: None,
            rotation: Rotation::ROTATE_0,
        }
    }

    fn to_native(self) -> RawCrtcConfig {
        RawCrtcConfig {
            timestamp: self.timestamp,
            x: self.x,
            y: self.y,
            mode: self.mode.unwrap_or(native::NONE),
            rotation: self.rotation.bits(),
        }
    }
}

/// An empty id buffer with room for `len` outputs.
fn reserve_outputs(len: usize) -> Result<Vec<RROutput>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| Error::AllocationFailed { what: "output", len })?;
    Ok(buffer)
}

/// Copies output ids into a transient buffer. Any element that is not an
/// integer rejects the whole list.
fn output_buffer(outputs: &[Value]) -> Result<Vec<RROutput>> {
    let mut buffer = reserve_outputs(outputs.len())?;
    for (i, value) in outputs.iter().enumerate() {
        match value.as_integer() {
            Some(id) if id >= 0 => buffer.push(id as RROutput),
            Some(_) => {
                return Err(Error::InvalidArgument {
                    index: i + 1,
                    expected: "non-negative integer",
                    actual: "negative integer",
                })
            }
            None => {
                return Err(Error::InvalidArgument {
                    index: i + 1,
                    expected: "integer",
                    actual: value.kind(),
                })
            }
        }
    }
    Ok(buffer)
}

impl ScreenResources {
    pub fn crtc_info(&self, crtc: RRCrtc) -> Result<CrtcInfo> {
        self.connection().get_crtc_info(self, crtc)
    }
}

impl Connection {
    /// Fails with `NotFound` without contacting the server when `crtc` is not
    /// in `resources`.
    pub fn get_crtc_info(self: &Rc<Self>, resources: &ScreenResources, crtc: RRCrtc) -> Result<CrtcInfo> {
        if !resources.has_crtc(crtc) {
            return Err(Error::not_found(CrtcInfoKind::KIND, crtc));
        }
        let raw = unsafe { self.native()?.get_crtc_info(resources.as_ptr(), crtc) };
        Handle::acquire(self, raw, crtc)
    }

    /// Reconfigures `crtc` in one request, driving the outputs listed as
    /// dynamic values.
    ///
    /// The list is validated before anything is sent; a bad element fails with
    /// `InvalidArgument` and no request is issued. Server rejection comes back
    /// as a non-success [`ConfigStatus`].
    pub fn set_crtc_config(
        &self,
        resources: &ScreenResources,
        crtc: RRCrtc,
        placement: CrtcPlacement,
        outputs: &[Value],
    ) -> Result<ConfigStatus> {
        let mut buffer = output_buffer(outputs)?;
        self.submit_crtc_config(resources, crtc, placement, &mut buffer)
    }

    /// [`set_crtc_config`](Connection::set_crtc_config) for callers that
    /// already hold typed ids.
    pub fn set_crtc_config_outputs(
        &self,
        resources: &ScreenResources,
        crtc: RRCrtc,
        placement: CrtcPlacement,
        outputs: &[RROutput],
    ) -> Result<ConfigStatus> {
        let mut buffer = outputs.to_vec();
        self.submit_crtc_config(resources, crtc, placement, &mut buffer)
    }

    /// Turns `crtc` off.
    pub fn disable_crtc(&self, resources: &ScreenResources, crtc: RRCrtc) -> Result<ConfigStatus> {
        let placement = CrtcPlacement::disabled(resources.timestamp());
        self.submit_crtc_config(resources, crtc, placement, &mut [])
    }

    fn submit_crtc_config(
        &self,
        resources: &ScreenResources,
        crtc: RRCrtc,
        placement: CrtcPlacement,
        outputs: &mut [RROutput],
    ) -> Result<ConfigStatus> {
        let native = self.native()?;
        debug!(
            "configuring crtc {} as {:?} with outputs {:?}",
            crtc, placement, outputs
        );
        let status = unsafe {
            native.set_crtc_config(resources.as_ptr(), crtc, placement.to_native(), outputs)
        };
        let status = ConfigStatus::from_native(status);
        if !status.is_success() {
            warn!("server rejected configuration of crtc {}: {}", crtc, status.name());
        }
        Ok(status)
    }
}
