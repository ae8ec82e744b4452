//! `Backend` implementation on top of libX11 and libXrandr.

use {
    log::{debug, trace, warn},
    std::{
        ffi::CStr,
        os::raw::{c_char, c_int, c_long, c_short, c_ulong, c_void},
        ptr::{self, NonNull},
        sync::Once,
    },
    x11::{xlib, xrandr},
};

use super::{
    Atom, Backend, Drawable, RRCrtc, RROutput, RawCrtcConfig, RawPropertyReply, RawRotation,
    RawSizeRange, SizeID, Status, Time, Window, XRRCrtcInfo, XRROutputInfo, XRRPropertyInfo,
    XRRScreenConfiguration, XRRScreenResources, XRRScreenSize,
};

static INIT_THREADS: Once = Once::new();

fn to_bool(b: bool) -> xlib::Bool {
    if b {
        xlib::True
    } else {
        xlib::False
    }
}

/// An open Xlib display.
#[derive(Debug)]
pub struct XlibBackend {
    display: NonNull<xlib::Display>,
}

impl XlibBackend {
    /// Opens a display; `None` means `$DISPLAY`. On failure the error carries
    /// the name Xlib would have used.
    pub fn open(name: Option<&CStr>) -> Result<Self, String> {
        // XLockDisplay is a no-op unless threads were initialised before the first connection.
        INIT_THREADS.call_once(|| {
            let status = unsafe { xlib::XInitThreads() };
            if status == 0 {
                warn!("XInitThreads failed, display locking will be unavailable");
            }
        });

        let name_ptr = name.map_or(ptr::null(), CStr::as_ptr);
        let display = unsafe { xlib::XOpenDisplay(name_ptr) };
        match NonNull::new(display) {
            Some(display) => {
                debug!("opened X display {:p}", display);
                Ok(XlibBackend { display })
            }
            None => Err(Self::display_name(name)),
        }
    }

    /// `XDisplayName`: the name `XOpenDisplay` would try for `name`.
    pub fn display_name(name: Option<&CStr>) -> String {
        let name_ptr = name.map_or(ptr::null(), CStr::as_ptr);
        // The result points into static or environment storage and must not be freed.
        let resolved = unsafe { xlib::XDisplayName(name_ptr) };
        if resolved.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(resolved) }
            .to_string_lossy()
            .into_owned()
    }

    fn dpy(&self) -> *mut xlib::Display {
        self.display.as_ptr()
    }
}

impl Backend for XlibBackend {
    fn close(&self) {
        debug!("closing X display {:p}", self.display);
        unsafe { xlib::XCloseDisplay(self.dpy()) };
    }

    fn lock(&self) {
        trace!("XLockDisplay");
        unsafe { xlib::XLockDisplay(self.dpy()) }
    }

    fn unlock(&self) {
        trace!("XUnlockDisplay");
        unsafe { xlib::XUnlockDisplay(self.dpy()) }
    }

    fn default_screen(&self) -> c_int {
        unsafe { xlib::XDefaultScreen(self.dpy()) }
    }

    fn root_window(&self, screen: c_int) -> Window {
        unsafe { xlib::XRootWindow(self.dpy(), screen) }
    }

    fn screen_count(&self) -> c_int {
        unsafe { xlib::XScreenCount(self.dpy()) }
    }

    fn display_width(&self, screen: c_int) -> c_int {
        unsafe { xlib::XDisplayWidth(self.dpy(), screen) }
    }

    fn display_height(&self, screen: c_int) -> c_int {
        unsafe { xlib::XDisplayHeight(self.dpy(), screen) }
    }

    fn intern_atom(&self, name: &CStr, only_if_exists: bool) -> Atom {
        trace!("XInternAtom({:?})", name);
        unsafe { xlib::XInternAtom(self.dpy(), name.as_ptr(), to_bool(only_if_exists)) }
    }

    fn intern_atoms(&self, names: &mut [*mut c_char], only_if_exists: bool, atoms: &mut [Atom]) -> Status {
        trace!("XInternAtoms({} names)", names.len());
        debug_assert_eq!(names.len(), atoms.len());
        unsafe {
            xlib::XInternAtoms(
                self.dpy(),
                names.as_mut_ptr(),
                names.len() as c_int,
                to_bool(only_if_exists),
                atoms.as_mut_ptr(),
            )
        }
    }

    fn get_atom_name(&self, atom: Atom) -> *mut c_char {
        trace!("XGetAtomName({})", atom);
        unsafe { xlib::XGetAtomName(self.dpy(), atom) }
    }

    fn get_atom_names(&self, atoms: &mut [Atom], names: &mut [*mut c_char]) -> Status {
        trace!("XGetAtomNames({} atoms)", atoms.len());
        debug_assert_eq!(names.len(), atoms.len());
        unsafe {
            xlib::XGetAtomNames(
                self.dpy(),
                atoms.as_mut_ptr(),
                atoms.len() as c_int,
                names.as_mut_ptr(),
            )
        }
    }

    fn query_extension(&self) -> Option<(c_int, c_int)> {
        let mut event_base = 0;
        let mut error_base = 0;
        let present =
            unsafe { xrandr::XRRQueryExtension(self.dpy(), &mut event_base, &mut error_base) };
        if present == xlib::False {
            None
        } else {
            Some((event_base, error_base))
        }
    }

    fn query_version(&self) -> (Status, c_int, c_int) {
        let mut major = 0;
        let mut minor = 0;
        let status = unsafe { xrandr::XRRQueryVersion(self.dpy(), &mut major, &mut minor) };
        (status, major, minor)
    }

    fn select_input(&self, window: Window, mask: c_int) {
        trace!("XRRSelectInput({}, {:#x})", window, mask);
        unsafe { xrandr::XRRSelectInput(self.dpy(), window, mask) }
    }

    fn get_screen_size_range(&self, window: Window) -> RawSizeRange {
        let mut range = RawSizeRange::default();
        range.status = unsafe {
            xrandr::XRRGetScreenSizeRange(
                self.dpy(),
                window,
                &mut range.min_width,
                &mut range.min_height,
                &mut range.max_width,
                &mut range.max_height,
            )
        };
        range
    }

    fn set_screen_size(&self, window: Window, width: c_int, height: c_int, mm_width: c_int, mm_height: c_int) {
        trace!("XRRSetScreenSize({}, {}x{}, {}x{}mm)", window, width, height, mm_width, mm_height);
        unsafe { xrandr::XRRSetScreenSize(self.dpy(), window, width, height, mm_width, mm_height) }
    }

    fn get_screen_resources(&self, window: Window) -> *mut XRRScreenResources {
        trace!("XRRGetScreenResources({})", window);
        unsafe { xrandr::XRRGetScreenResources(self.dpy(), window) }
    }

    fn get_screen_resources_current(&self, window: Window) -> *mut XRRScreenResources {
        trace!("XRRGetScreenResourcesCurrent({})", window);
        unsafe { xrandr::XRRGetScreenResourcesCurrent(self.dpy(), window) }
    }

    unsafe fn free_screen_resources(&self, resources: *mut XRRScreenResources) {
        xrandr::XRRFreeScreenResources(resources)
    }

    unsafe fn get_output_info(&self, resources: *mut XRRScreenResources, output: RROutput) -> *mut XRROutputInfo {
        trace!("XRRGetOutputInfo({})", output);
        xrandr::XRRGetOutputInfo(self.dpy(), resources, output)
    }

    unsafe fn free_output_info(&self, info: *mut XRROutputInfo) {
        xrandr::XRRFreeOutputInfo(info)
    }

    unsafe fn get_crtc_info(&self, resources: *mut XRRScreenResources, crtc: RRCrtc) -> *mut XRRCrtcInfo {
        trace!("XRRGetCrtcInfo({})", crtc);
        xrandr::XRRGetCrtcInfo(self.dpy(), resources, crtc)
    }

    unsafe fn free_crtc_info(&self, info: *mut XRRCrtcInfo) {
        xrandr::XRRFreeCrtcInfo(info)
    }

    unsafe fn set_crtc_config(
        &self,
        resources: *mut XRRScreenResources,
        crtc: RRCrtc,
        config: RawCrtcConfig,
        outputs: &mut [RROutput],
    ) -> Status {
        trace!("XRRSetCrtcConfig({}, {:?}, {:?})", crtc, config, outputs);
        let outputs_ptr = if outputs.is_empty() {
            ptr::null_mut()
        } else {
            outputs.as_mut_ptr()
        };
        xrandr::XRRSetCrtcConfig(
            self.dpy(),
            resources,
            crtc,
            config.timestamp,
            config.x,
            config.y,
            config.mode,
            config.rotation,
            outputs_ptr,
            outputs.len() as c_int,
        )
    }

    fn get_output_primary(&self, window: Window) -> RROutput {
        unsafe { xrandr::XRRGetOutputPrimary(self.dpy(), window) }
    }

    fn set_output_primary(&self, window: Window, output: RROutput) {
        trace!("XRRSetOutputPrimary({}, {})", window, output);
        unsafe { xrandr::XRRSetOutputPrimary(self.dpy(), window, output) }
    }

    fn get_screen_info(&self, window: Window) -> *mut XRRScreenConfiguration {
        trace!("XRRGetScreenInfo({})", window);
        unsafe { xrandr::XRRGetScreenInfo(self.dpy(), window) }
    }

    unsafe fn free_screen_config_info(&self, config: *mut XRRScreenConfiguration) {
        xrandr::XRRFreeScreenConfigInfo(config)
    }

    unsafe fn config_rotations(&self, config: *mut XRRScreenConfiguration) -> (RawRotation, RawRotation) {
        let mut current = 0;
        let supported = xrandr::XRRConfigRotations(config, &mut current);
        (supported, current)
    }

    unsafe fn config_times(&self, config: *mut XRRScreenConfiguration) -> (Time, Time) {
        let mut config_timestamp = 0;
        let timestamp = xrandr::XRRConfigTimes(config, &mut config_timestamp);
        (timestamp, config_timestamp)
    }

    unsafe fn config_sizes(&self, config: *mut XRRScreenConfiguration) -> Vec<XRRScreenSize> {
        let mut nsizes = 0;
        // The table belongs to the configuration and is freed with it.
        let sizes = xrandr::XRRConfigSizes(config, &mut nsizes);
        super::raw_slice(sizes, nsizes).to_vec()
    }

    unsafe fn config_rates(&self, config: *mut XRRScreenConfiguration, size_index: c_int) -> Vec<c_short> {
        let mut nrates = 0;
        let rates = xrandr::XRRConfigRates(config, size_index, &mut nrates);
        super::raw_slice(rates, nrates).to_vec()
    }

    unsafe fn config_current_configuration(&self, config: *mut XRRScreenConfiguration) -> (SizeID, RawRotation) {
        let mut rotation = 0;
        let size_index = xrandr::XRRConfigCurrentConfiguration(config, &mut rotation);
        (size_index, rotation)
    }

    unsafe fn config_current_rate(&self, config: *mut XRRScreenConfiguration) -> c_short {
        xrandr::XRRConfigCurrentRate(config)
    }

    unsafe fn set_screen_config(
        &self,
        config: *mut XRRScreenConfiguration,
        drawable: Drawable,
        size_index: c_int,
        rotation: RawRotation,
        rate: Option<c_short>,
        timestamp: Time,
    ) -> Status {
        trace!("XRRSetScreenConfig(size {}, rotation {}, rate {:?})", size_index, rotation, rate);
        match rate {
            Some(rate) => xrandr::XRRSetScreenConfigAndRate(
                self.dpy(),
                config,
                drawable,
                size_index,
                rotation,
                rate,
                timestamp,
            ),
            None => xrandr::XRRSetScreenConfig(
                self.dpy(),
                config,
                drawable,
                size_index,
                rotation,
                timestamp,
            ),
        }
    }

    fn list_output_properties(&self, output: RROutput) -> (*mut Atom, c_int) {
        trace!("XRRListOutputProperties({})", output);
        let mut nprop = 0;
        let atoms = unsafe { xrandr::XRRListOutputProperties(self.dpy(), output, &mut nprop) };
        (atoms, nprop)
    }

    fn query_output_property(&self, output: RROutput, property: Atom) -> *mut XRRPropertyInfo {
        trace!("XRRQueryOutputProperty({}, {})", output, property);
        unsafe { xrandr::XRRQueryOutputProperty(self.dpy(), output, property) }
    }

    fn configure_output_property(&self, output: RROutput, property: Atom, pending: bool, range: bool, values: &mut [c_long]) {
        trace!("XRRConfigureOutputProperty({}, {}, {:?})", output, property, values);
        unsafe {
            xrandr::XRRConfigureOutputProperty(
                self.dpy(),
                output,
                property,
                to_bool(pending),
                to_bool(range),
                values.len() as c_int,
                values.as_mut_ptr(),
            )
        }
    }

    fn change_output_property(&self, output: RROutput, property: Atom, type_: Atom, format: c_int, mode: c_int, data: &[u8]) {
        trace!("XRRChangeOutputProperty({}, {}, {} bytes)", output, property, data.len());
        unsafe {
            xrandr::XRRChangeOutputProperty(
                self.dpy(),
                output,
                property,
                type_,
                format,
                mode,
                data.as_ptr(),
                data.len() as c_int,
            )
        }
    }

    fn get_output_property(
        &self,
        output: RROutput,
        property: Atom,
        offset: c_long,
        length: c_long,
        delete: bool,
        pending: bool,
        req_type: Atom,
    ) -> RawPropertyReply {
        trace!("XRRGetOutputProperty({}, {}, {}+{})", output, property, offset, length);
        let mut reply = RawPropertyReply {
            status: 0,
            actual_type: 0,
            actual_format: 0,
            nitems: 0,
            bytes_after: 0,
            data: ptr::null_mut(),
        };
        reply.status = unsafe {
            xrandr::XRRGetOutputProperty(
                self.dpy(),
                output,
                property,
                offset,
                length,
                to_bool(delete),
                to_bool(pending),
                req_type,
                &mut reply.actual_type,
                &mut reply.actual_format,
                &mut reply.nitems as *mut c_ulong,
                &mut reply.bytes_after as *mut c_ulong,
                &mut reply.data,
            )
        };
        reply
    }

    fn delete_output_property(&self, output: RROutput, property: Atom) {
        trace!("XRRDeleteOutputProperty({}, {})", output, property);
        unsafe { xrandr::XRRDeleteOutputProperty(self.dpy(), output, property) }
    }

    unsafe fn free(&self, data: *mut c_void) {
        xlib::XFree(data);
    }
}

