//! The native client library, seen through a trait.
//!
//! Every method mirrors one libX11 / libXrandr entry point. Pointers returned
//! from the `get_*` calls are owned by the caller and must be handed back to
//! the matching `free_*` call on the same backend exactly once; the handle
//! types in [`crate::handle`] take care of that.

pub mod xlib;
#[cfg(test)]
pub mod fake;

use std::{
    ffi::{CStr, CString},
    os::raw::{c_char, c_int, c_long, c_short, c_uchar, c_ulong, c_void},
    slice,
};

pub use x11::{
    xlib::{Atom, Drawable, Status, Time, Window, XA_STRING},
    xrandr::{
        RRCrtc, RRMode, RROutput, SizeID, XRRCrtcInfo, XRRModeInfo, XRROutputInfo,
        XRRPropertyInfo, XRRScreenConfiguration, XRRScreenResources, XRRScreenSize,
    },
};

/// Native rotation word (`Rotation` in Xrandr.h).
pub type RawRotation = x11::xrandr::Rotation;

/// The `None` resource id.
pub const NONE: c_ulong = 0;

/// Every out-parameter of `XRRGetOutputProperty`.
#[derive(Debug)]
pub struct RawPropertyReply {
    pub status: c_int,
    pub actual_type: Atom,
    pub actual_format: c_int,
    pub nitems: c_ulong,
    pub bytes_after: c_ulong,
    pub data: *mut c_uchar,
}

/// Geometry arguments of `XRRSetCrtcConfig` that are passed by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCrtcConfig {
    pub timestamp: Time,
    pub x: c_int,
    pub y: c_int,
    pub mode: RRMode,
    pub rotation: RawRotation,
}

/// Geometry limits returned by `XRRGetScreenSizeRange`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSizeRange {
    pub status: Status,
    pub min_width: c_int,
    pub min_height: c_int,
    pub max_width: c_int,
    pub max_height: c_int,
}

/// A session with the display server plus the RandR entry points that use it.
///
/// The methods taking raw pointers are `unsafe`: the pointer must have been
/// returned by this backend and not released yet.
pub trait Backend {
    /// `XCloseDisplay`. Called at most once.
    fn close(&self);
    fn lock(&self);
    fn unlock(&self);

    fn default_screen(&self) -> c_int;
    fn root_window(&self, screen: c_int) -> Window;
    fn screen_count(&self) -> c_int;
    fn display_width(&self, screen: c_int) -> c_int;
    fn display_height(&self, screen: c_int) -> c_int;

    fn intern_atom(&self, name: &CStr, only_if_exists: bool) -> Atom;
    /// `XInternAtoms`; fills `atoms`, which has the same length as `names`.
    fn intern_atoms(&self, names: &mut [*mut c_char], only_if_exists: bool, atoms: &mut [Atom]) -> Status;
    /// `XGetAtomName`; the result is released with [`Backend::free`].
    fn get_atom_name(&self, atom: Atom) -> *mut c_char;
    /// `XGetAtomNames`; every non-null entry of `names` is released with [`Backend::free`].
    fn get_atom_names(&self, atoms: &mut [Atom], names: &mut [*mut c_char]) -> Status;

    fn query_extension(&self) -> Option<(c_int, c_int)>;
    fn query_version(&self) -> (Status, c_int, c_int);
    fn select_input(&self, window: Window, mask: c_int);
    fn get_screen_size_range(&self, window: Window) -> RawSizeRange;
    fn set_screen_size(&self, window: Window, width: c_int, height: c_int, mm_width: c_int, mm_height: c_int);

    fn get_screen_resources(&self, window: Window) -> *mut XRRScreenResources;
    fn get_screen_resources_current(&self, window: Window) -> *mut XRRScreenResources;
    unsafe fn free_screen_resources(&self, resources: *mut XRRScreenResources);

    unsafe fn get_output_info(&self, resources: *mut XRRScreenResources, output: RROutput) -> *mut XRROutputInfo;
    unsafe fn free_output_info(&self, info: *mut XRROutputInfo);

    unsafe fn get_crtc_info(&self, resources: *mut XRRScreenResources, crtc: RRCrtc) -> *mut XRRCrtcInfo;
    unsafe fn free_crtc_info(&self, info: *mut XRRCrtcInfo);

    /// `XRRSetCrtcConfig`. `outputs` is the transient id buffer.
    unsafe fn set_crtc_config(
        &self,
        resources: *mut XRRScreenResources,
        crtc: RRCrtc,
        config: RawCrtcConfig,
        outputs: &mut [RROutput],
    ) -> Status;

    fn get_output_primary(&self, window: Window) -> RROutput;
    fn set_output_primary(&self, window: Window, output: RROutput);

    fn get_screen_info(&self, window: Window) -> *mut XRRScreenConfiguration;
    unsafe fn free_screen_config_info(&self, config: *mut XRRScreenConfiguration);
    /// Returns `(supported, current)`.
    unsafe fn config_rotations(&self, config: *mut XRRScreenConfiguration) -> (RawRotation, RawRotation);
    /// Returns `(timestamp, config_timestamp)`.
    unsafe fn config_times(&self, config: *mut XRRScreenConfiguration) -> (Time, Time);
    unsafe fn config_sizes(&self, config: *mut XRRScreenConfiguration) -> Vec<XRRScreenSize>;
    unsafe fn config_rates(&self, config: *mut XRRScreenConfiguration, size_index: c_int) -> Vec<c_short>;
    /// Returns `(size_index, rotation)`.
    unsafe fn config_current_configuration(&self, config: *mut XRRScreenConfiguration) -> (SizeID, RawRotation);
    unsafe fn config_current_rate(&self, config: *mut XRRScreenConfiguration) -> c_short;
    unsafe fn set_screen_config(
        &self,
        config: *mut XRRScreenConfiguration,
        drawable: Drawable,
        size_index: c_int,
        rotation: RawRotation,
        rate: Option<c_short>,
        timestamp: Time,
    ) -> Status;

    /// `XRRListOutputProperties`; returns the array and its length. The array
    /// is released with [`Backend::free`] and may be null when empty.
    fn list_output_properties(&self, output: RROutput) -> (*mut Atom, c_int);
    /// Released with [`Backend::free`].
    fn query_output_property(&self, output: RROutput, property: Atom) -> *mut XRRPropertyInfo;
    fn configure_output_property(&self, output: RROutput, property: Atom, pending: bool, range: bool, values: &mut [c_long]);
    fn change_output_property(&self, output: RROutput, property: Atom, type_: Atom, format: c_int, mode: c_int, data: &[u8]);
    /// `XRRGetOutputProperty`. `reply.data` is released with [`Backend::free`].
    #[allow(clippy::too_many_arguments)]
    fn get_output_property(
        &self,
        output: RROutput,
        property: Atom,
        offset: c_long,
        length: c_long,
        delete: bool,
        pending: bool,
        req_type: Atom,
    ) -> RawPropertyReply;
    fn delete_output_property(&self, output: RROutput, property: Atom);

    /// `XFree`.
    unsafe fn free(&self, data: *mut c_void);
}

/// Views a native `(pointer, count)` pair as a slice; null or non-positive
/// counts yield an empty slice.
///
/// # Safety
///
/// When non-null, `ptr` must point at `len` initialized values that outlive `'a`.
pub(crate) unsafe fn raw_slice<'a, T>(ptr: *const T, len: c_int) -> &'a [T] {
    if ptr.is_null() || len <= 0 {
        &[]
    } else {
        slice::from_raw_parts(ptr, len as usize)
    }
}

/// Copies a NUL-terminated native string.
///
/// # Safety
///
/// `ptr` must be null or point at a NUL-terminated string.
pub(crate) unsafe fn raw_c_string(ptr: *const c_char) -> Vec<u8> {
    if ptr.is_null() {
        Vec::new()
    } else {
        CStr::from_ptr(ptr).to_bytes().to_vec()
    }
}

/// Owned C copy of a name, for calls that take `char*`.
pub(crate) fn c_string(name: &[u8]) -> crate::Result<CString> {
    CString::new(name).map_err(|_| crate::Error::InvalidString {
        value: String::from_utf8_lossy(name).into_owned(),
    })
}
