//! In-memory display server for unit tests.
//!
//! Hands out real `XRR*` structs backed by owned buffers and tracks every
//! allocation, so tests can assert that each one is released exactly once.

use std::{
    cell::RefCell,
    collections::HashMap,
    ffi::{CStr, CString},
    os::raw::{c_char, c_int, c_long, c_short, c_ulong, c_void},
    ptr,
    rc::Rc,
};

use super::{
    Atom, Backend, Drawable, RRCrtc, RRMode, RROutput, RawCrtcConfig, RawPropertyReply,
    RawRotation, RawSizeRange, SizeID, Status, Time, Window, XRRCrtcInfo, XRRModeInfo,
    XRROutputInfo, XRRPropertyInfo, XRRScreenConfiguration, XRRScreenResources, XRRScreenSize,
    XA_STRING,
};
use crate::conn::Connection;

pub const XA_INTEGER: Atom = 19;

#[derive(Debug, Clone)]
pub struct FakeMode {
    pub id: RRMode,
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub dot_clock: u64,
    pub h_total: u32,
    pub v_total: u32,
    pub flags: u64,
}

#[derive(Debug, Clone)]
pub struct FakeOutput {
    pub id: RROutput,
    pub name: &'static str,
    pub crtc: RRCrtc,
    pub mm_width: u64,
    pub mm_height: u64,
    pub connection: u16,
    pub subpixel_order: u16,
    pub crtcs: Vec<RRCrtc>,
    pub clones: Vec<RROutput>,
    pub modes: Vec<RRMode>,
    pub npreferred: c_int,
}

#[derive(Debug, Clone)]
pub struct FakeCrtc {
    pub id: RRCrtc,
    pub x: c_int,
    pub y: c_int,
    pub width: u32,
    pub height: u32,
    pub mode: RRMode,
    pub rotation: RawRotation,
    pub rotations: RawRotation,
    pub outputs: Vec<RROutput>,
    pub possible: Vec<RROutput>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeProperty {
    pub output: RROutput,
    pub atom: Atom,
    pub type_: Atom,
    pub format: c_int,
    pub data: Vec<u8>,
    pub pending: bool,
    pub range: bool,
    pub immutable: bool,
    pub values: Vec<c_long>,
}

#[derive(Debug, Clone)]
pub struct FakeScreenConfig {
    pub timestamp: Time,
    pub config_timestamp: Time,
    pub rotations: RawRotation,
    pub rotation: RawRotation,
    pub size_index: SizeID,
    pub rate: c_short,
    pub sizes: Vec<XRRScreenSize>,
    pub rates: Vec<Vec<c_short>>,
}

/// Server contents at connect time.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub root: Window,
    pub width: c_int,
    pub height: c_int,
    pub timestamp: Time,
    pub config_timestamp: Time,
    pub randr: Option<(c_int, c_int)>,
    pub modes: Vec<FakeMode>,
    pub outputs: Vec<FakeOutput>,
    pub crtcs: Vec<FakeCrtc>,
    pub primary: RROutput,
    pub atoms: Vec<(Atom, &'static str)>,
    pub properties: Vec<FakeProperty>,
    pub screen: FakeScreenConfig,
}

impl Scenario {
    pub const ROOT: Window = 0x1e3;
    pub const HDMI: RROutput = 0x41;
    pub const DP: RROutput = 0x42;
    pub const VGA: RROutput = 0x43;
    pub const CRTC_LEFT: RRCrtc = 0x3f;
    pub const CRTC_RIGHT: RRCrtc = 0x40;
    pub const MODE_1080P: RRMode = 0x46;
    pub const MODE_720P: RRMode = 0x47;
    pub const MODE_1080I: RRMode = 0x48;
    pub const EDID: Atom = 300;
    pub const BACKLIGHT: Atom = 301;
    pub const MONITOR_NAME: Atom = 302;

    /// Two 1080p monitors side by side and a disconnected VGA port.
    pub fn dual_head() -> Self {
        let edid: Vec<u8> = (0..128u32).map(|i| (i * 7 % 256) as u8).collect();
        Scenario {
            root: Self::ROOT,
            width: 3840,
            height: 1080,
            timestamp: 5000,
            config_timestamp: 4000,
            randr: Some((89, 147)),
            modes: vec![
                FakeMode {
                    id: Self::MODE_1080P,
                    name: "1920x1080",
                    width: 1920,
                    height: 1080,
                    dot_clock: 148_500_000,
                    h_total: 2200,
                    v_total: 1125,
                    flags: 0b101,
                },
                FakeMode {
                    id: Self::MODE_720P,
                    name: "1280x720",
                    width: 1280,
                    height: 720,
                    dot_clock: 74_250_000,
                    h_total: 1650,
                    v_total: 750,
                    flags: 0b101,
                },
                FakeMode {
                    id: Self::MODE_1080I,
                    name: "1920x1080i",
                    width: 1920,
                    height: 1080,
                    dot_clock: 74_250_000,
                    h_total: 2200,
                    v_total: 1125,
                    flags: 0b10101,
                },
            ],
            outputs: vec![
                FakeOutput {
                    id: Self::HDMI,
                    name: "HDMI-1",
                    crtc: Self::CRTC_LEFT,
                    mm_width: 527,
                    mm_height: 296,
                    connection: 0,
                    subpixel_order: 1,
                    crtcs: vec![Self::CRTC_LEFT, Self::CRTC_RIGHT],
                    clones: vec![],
                    modes: vec![Self::MODE_1080P, Self::MODE_720P, Self::MODE_1080I],
                    npreferred: 1,
                },
                FakeOutput {
                    id: Self::DP,
                    name: "DP-1",
                    crtc: Self::CRTC_RIGHT,
                    mm_width: 600,
                    mm_height: 340,
                    connection: 0,
                    subpixel_order: 0,
                    crtcs: vec![Self::CRTC_LEFT, Self::CRTC_RIGHT],
                    clones: vec![Self::HDMI],
                    modes: vec![Self::MODE_1080P, Self::MODE_720P],
                    npreferred: 1,
                },
                FakeOutput {
                    id: Self::VGA,
                    name: "VGA-1",
                    crtc: 0,
                    mm_width: 0,
                    mm_height: 0,
                    connection: 1,
                    subpixel_order: 0,
                    crtcs: vec![Self::CRTC_LEFT, Self::CRTC_RIGHT],
                    clones: vec![],
                    modes: vec![],
                    npreferred: 0,
                },
            ],
            crtcs: vec![
                FakeCrtc {
                    id: Self::CRTC_LEFT,
                    x: 0,
                    y: 0,
                    width: 1920,
                    height: 1080,
                    mode: Self::MODE_1080P,
                    rotation: 1,
                    rotations: 0x3f,
                    outputs: vec![Self::HDMI],
                    possible: vec![Self::HDMI, Self::DP, Self::VGA],
                },
                FakeCrtc {
                    id: Self::CRTC_RIGHT,
                    x: 1920,
                    y: 0,
                    width: 1920,
                    height: 1080,
                    mode: Self::MODE_1080P,
                    rotation: 1,
                    rotations: 0x0f,
                    outputs: vec![Self::DP],
                    possible: vec![Self::HDMI, Self::DP, Self::VGA],
                },
            ],
            primary: Self::HDMI,
            atoms: vec![
                (XA_INTEGER, "INTEGER"),
                (XA_STRING, "STRING"),
                (Self::EDID, "EDID"),
                (Self::BACKLIGHT, "Backlight"),
                (Self::MONITOR_NAME, "MonitorName"),
            ],
            properties: vec![
                FakeProperty {
                    output: Self::HDMI,
                    atom: Self::EDID,
                    type_: XA_INTEGER,
                    format: 8,
                    data: edid,
                    pending: false,
                    range: false,
                    immutable: true,
                    values: vec![],
                },
                FakeProperty {
                    output: Self::HDMI,
                    atom: Self::BACKLIGHT,
                    type_: XA_INTEGER,
                    format: 32,
                    data: 80u32.to_ne_bytes().to_vec(),
                    pending: false,
                    range: true,
                    immutable: false,
                    values: vec![0, 100],
                },
                FakeProperty {
                    output: Self::HDMI,
                    atom: Self::MONITOR_NAME,
                    type_: XA_STRING,
                    format: 8,
                    data: b"DELL U2719D reference panel".to_vec(),
                    pending: false,
                    range: false,
                    immutable: false,
                    values: vec![],
                },
            ],
            screen: FakeScreenConfig {
                timestamp: 5000,
                config_timestamp: 4000,
                rotations: 0x3f,
                rotation: 1,
                size_index: 0,
                rate: 60,
                sizes: vec![
                    XRRScreenSize {
                        width: 3840,
                        height: 1080,
                        mwidth: 1016,
                        mheight: 286,
                    },
                    XRRScreenSize {
                        width: 1920,
                        height: 1080,
                        mwidth: 508,
                        mheight: 286,
                    },
                ],
                rates: vec![vec![60, 50], vec![60, 30]],
            },
        }
    }
}

/// A `setCrtcConfig` request as the server saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrtcRequest {
    pub crtc: RRCrtc,
    pub config: RawCrtcConfig,
    pub outputs: Vec<RROutput>,
}

/// A `setScreenConfig` request as the server saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenRequest {
    pub drawable: Drawable,
    pub size_index: c_int,
    pub rotation: RawRotation,
    pub rate: Option<c_short>,
    pub timestamp: Time,
}

enum Allocation {
    ScreenResources {
        _raw: Box<XRRScreenResources>,
        _crtcs: Vec<RRCrtc>,
        _outputs: Vec<RROutput>,
        _modes: Vec<XRRModeInfo>,
        _names: Vec<CString>,
    },
    OutputInfo {
        _raw: Box<XRROutputInfo>,
        _name: CString,
        _lists: [Vec<c_ulong>; 3],
    },
    CrtcInfo {
        _raw: Box<XRRCrtcInfo>,
        _lists: [Vec<RROutput>; 2],
    },
    ScreenConfig(Box<FakeScreenConfig>),
    PropertyInfo {
        _raw: Box<XRRPropertyInfo>,
        _values: Vec<c_long>,
    },
    Bytes(Box<[u8]>),
    Atoms(Box<[Atom]>),
}

impl Allocation {
    fn kind(&self) -> &'static str {
        match self {
            Allocation::ScreenResources { .. } => "screen resources",
            Allocation::OutputInfo { .. } => "output info",
            Allocation::CrtcInfo { .. } => "crtc info",
            Allocation::ScreenConfig(_) => "screen config",
            Allocation::PropertyInfo { .. } | Allocation::Bytes(_) | Allocation::Atoms(_) => {
                "xfree"
            }
        }
    }
}

#[derive(Default)]
struct State {
    scenario: Option<Scenario>,
    closed: bool,
    close_calls: usize,
    lock_depth: usize,
    requests: Vec<&'static str>,
    live: HashMap<usize, Allocation>,
    released: usize,
    selected: HashMap<Window, c_int>,
    crtc_requests: Vec<CrtcRequest>,
    screen_requests: Vec<ScreenRequest>,
    screen_size: Option<(Window, c_int, c_int, c_int, c_int)>,
    next_atom: Atom,
}

impl State {
    fn scenario(&self) -> &Scenario {
        self.scenario.as_ref().expect("fake server has no scenario")
    }

    fn scenario_mut(&mut self) -> &mut Scenario {
        self.scenario.as_mut().expect("fake server has no scenario")
    }

    fn track(&mut self, addr: *const c_void, allocation: Allocation) {
        let previous = self.live.insert(addr as usize, allocation);
        assert!(previous.is_none(), "address {:p} handed out twice", addr);
    }

    fn release(&mut self, addr: *const c_void, kind: &'static str) {
        match self.live.remove(&(addr as usize)) {
            Some(allocation) => {
                assert_eq!(allocation.kind(), kind, "released {:p} with the wrong call", addr);
                self.released += 1;
            }
            None => panic!("double free or foreign pointer {:p} ({})", addr, kind),
        }
    }

    fn atom_name(&self, atom: Atom) -> Option<&'static str> {
        self.scenario()
            .atoms
            .iter()
            .find(|(a, _)| *a == atom)
            .map(|(_, name)| *name)
    }

    fn intern(&mut self, name: &CStr, only_if_exists: bool) -> Atom {
        let name = name.to_string_lossy();
        if let Some((atom, _)) = self.scenario().atoms.iter().find(|(_, n)| *n == name) {
            return *atom;
        }
        if only_if_exists {
            return 0;
        }
        let atom = self.next_atom;
        self.next_atom += 1;
        let leaked: &'static str = Box::leak(name.into_owned().into_boxed_str());
        self.scenario_mut().atoms.push((atom, leaked));
        atom
    }

    fn c_name(&mut self, name: &str) -> *mut c_char {
        let bytes = CString::new(name)
            .expect("atom names have no NUL")
            .into_bytes_with_nul()
            .into_boxed_slice();
        let ptr = bytes.as_ptr() as *mut c_char;
        self.track(ptr as *const c_void, Allocation::Bytes(bytes));
        ptr
    }

    fn property_mut(&mut self, output: RROutput, atom: Atom) -> Option<&mut FakeProperty> {
        self.scenario_mut()
            .properties
            .iter_mut()
            .find(|p| p.output == output && p.atom == atom)
    }

    fn screen_resources(&mut self) -> *mut XRRScreenResources {
        let scenario = self.scenario().clone();
        let mut crtcs: Vec<RRCrtc> = scenario.crtcs.iter().map(|c| c.id).collect();
        let mut outputs: Vec<RROutput> = scenario.outputs.iter().map(|o| o.id).collect();
        let names: Vec<CString> = scenario
            .modes
            .iter()
            .map(|m| CString::new(m.name).expect("mode names have no NUL"))
            .collect();
        let mut modes: Vec<XRRModeInfo> = scenario
            .modes
            .iter()
            .zip(&names)
            .map(|(m, name)| XRRModeInfo {
                id: m.id,
                width: m.width,
                height: m.height,
                dotClock: m.dot_clock as c_ulong,
                hSyncStart: m.width + 88,
                hSyncEnd: m.width + 132,
                hTotal: m.h_total,
                hSkew: 0,
                vSyncStart: m.height + 4,
                vSyncEnd: m.height + 9,
                vTotal: m.v_total,
                name: name.as_ptr() as *mut c_char,
                nameLength: m.name.len() as u32,
                modeFlags: m.flags as c_ulong,
            })
            .collect();
        let mut raw = Box::new(XRRScreenResources {
            timestamp: scenario.timestamp,
            configTimestamp: scenario.config_timestamp,
            ncrtc: crtcs.len() as c_int,
            crtcs: crtcs.as_mut_ptr(),
            noutput: outputs.len() as c_int,
            outputs: outputs.as_mut_ptr(),
            nmode: modes.len() as c_int,
            modes: modes.as_mut_ptr(),
        });
        let ptr: *mut XRRScreenResources = &mut *raw;
        self.track(
            ptr as *const c_void,
            Allocation::ScreenResources {
                _raw: raw,
                _crtcs: crtcs,
                _outputs: outputs,
                _modes: modes,
                _names: names,
            },
        );
        ptr
    }
}

/// The test's view of the fake server. Cloning shares the same server.
#[derive(Clone)]
pub struct FakeServer(Rc<RefCell<State>>);

struct FakeBackend(Rc<RefCell<State>>);

impl FakeServer {
    pub fn new(scenario: Scenario) -> Self {
        FakeServer(Rc::new(RefCell::new(State {
            scenario: Some(scenario),
            next_atom: 400,
            ..State::default()
        })))
    }

    /// Opens a connection to a fresh server running `scenario`.
    pub fn connect(scenario: Scenario) -> (Rc<Connection>, FakeServer) {
        let server = Self::new(scenario);
        let cm = Connection::with_backend(Box::new(FakeBackend(server.0.clone())));
        (cm, server)
    }

    pub fn is_closed(&self) -> bool {
        self.0.borrow().closed
    }

    pub fn close_calls(&self) -> usize {
        self.0.borrow().close_calls
    }

    pub fn lock_depth(&self) -> usize {
        self.0.borrow().lock_depth
    }

    /// Allocations handed out and not yet released.
    pub fn live_allocations(&self) -> usize {
        self.0.borrow().live.len()
    }

    pub fn released(&self) -> usize {
        self.0.borrow().released
    }

    /// Names of the requests issued so far, in order. Releases are not requests.
    pub fn requests(&self) -> Vec<&'static str> {
        self.0.borrow().requests.clone()
    }

    pub fn selected_mask(&self, window: Window) -> Option<c_int> {
        self.0.borrow().selected.get(&window).copied()
    }

    pub fn crtc_requests(&self) -> Vec<CrtcRequest> {
        self.0.borrow().crtc_requests.clone()
    }

    pub fn screen_requests(&self) -> Vec<ScreenRequest> {
        self.0.borrow().screen_requests.clone()
    }

    pub fn screen_size(&self) -> Option<(Window, c_int, c_int, c_int, c_int)> {
        self.0.borrow().screen_size
    }

    pub fn property(&self, output: RROutput, atom: Atom) -> Option<FakeProperty> {
        self.0
            .borrow()
            .scenario()
            .properties
            .iter()
            .find(|p| p.output == output && p.atom == atom)
            .cloned()
    }

    pub fn crtc(&self, crtc: RRCrtc) -> Option<FakeCrtc> {
        self.0
            .borrow()
            .scenario()
            .crtcs
            .iter()
            .find(|c| c.id == crtc)
            .cloned()
    }
}

impl FakeBackend {
    fn request(&self, name: &'static str) -> std::cell::RefMut<'_, State> {
        let mut state = self.0.borrow_mut();
        assert!(!state.closed, "{} issued on a closed display", name);
        state.requests.push(name);
        state
    }
}

impl Backend for FakeBackend {
    fn close(&self) {
        let mut state = self.0.borrow_mut();
        assert!(!state.closed, "display closed twice");
        state.closed = true;
        state.close_calls += 1;
    }

    fn lock(&self) {
        self.request("XLockDisplay").lock_depth += 1;
    }

    fn unlock(&self) {
        let mut state = self.request("XUnlockDisplay");
        assert!(state.lock_depth > 0, "unbalanced XUnlockDisplay");
        state.lock_depth -= 1;
    }

    fn default_screen(&self) -> c_int {
        self.request("XDefaultScreen");
        0
    }

    fn root_window(&self, screen: c_int) -> Window {
        let state = self.request("XRootWindow");
        if screen == 0 {
            state.scenario().root
        } else {
            0
        }
    }

    fn screen_count(&self) -> c_int {
        self.request("XScreenCount");
        1
    }

    fn display_width(&self, _screen: c_int) -> c_int {
        self.request("XDisplayWidth").scenario().width
    }

    fn display_height(&self, _screen: c_int) -> c_int {
        self.request("XDisplayHeight").scenario().height
    }

    fn intern_atom(&self, name: &CStr, only_if_exists: bool) -> Atom {
        self.request("XInternAtom").intern(name, only_if_exists)
    }

    fn intern_atoms(&self, names: &mut [*mut c_char], only_if_exists: bool, atoms: &mut [Atom]) -> Status {
        let mut state = self.request("XInternAtoms");
        let mut all_found = true;
        for (name, atom) in names.iter().zip(atoms.iter_mut()) {
            let name = unsafe { CStr::from_ptr(*name) };
            *atom = state.intern(name, only_if_exists);
            all_found &= *atom != 0;
        }
        all_found as Status
    }

    fn get_atom_name(&self, atom: Atom) -> *mut c_char {
        let mut state = self.request("XGetAtomName");
        match state.atom_name(atom) {
            Some(name) => state.c_name(name),
            None => ptr::null_mut(),
        }
    }

    fn get_atom_names(&self, atoms: &mut [Atom], names: &mut [*mut c_char]) -> Status {
        let mut state = self.request("XGetAtomNames");
        let mut all_found = true;
        for (atom, slot) in atoms.iter().zip(names.iter_mut()) {
            *slot = match state.atom_name(*atom) {
                Some(name) => state.c_name(name),
                None => {
                    all_found = false;
                    ptr::null_mut()
                }
            };
        }
        all_found as Status
    }

    fn query_extension(&self) -> Option<(c_int, c_int)> {
        self.request("XRRQueryExtension").scenario().randr
    }

    fn query_version(&self) -> (Status, c_int, c_int) {
        match self.request("XRRQueryVersion").scenario().randr {
            Some(_) => (1, 1, 6),
            None => (0, 0, 0),
        }
    }

    fn select_input(&self, window: Window, mask: c_int) {
        self.request("XRRSelectInput").selected.insert(window, mask);
    }

    fn get_screen_size_range(&self, window: Window) -> RawSizeRange {
        let state = self.request("XRRGetScreenSizeRange");
        if window != state.scenario().root {
            return RawSizeRange::default();
        }
        RawSizeRange {
            status: 1,
            min_width: 320,
            min_height: 200,
            max_width: 16384,
            max_height: 16384,
        }
    }

    fn set_screen_size(&self, window: Window, width: c_int, height: c_int, mm_width: c_int, mm_height: c_int) {
        let mut state = self.request("XRRSetScreenSize");
        state.screen_size = Some((window, width, height, mm_width, mm_height));
        let scenario = state.scenario_mut();
        scenario.width = width;
        scenario.height = height;
    }

    fn get_screen_resources(&self, window: Window) -> *mut XRRScreenResources {
        let mut state = self.request("XRRGetScreenResources");
        if window != state.scenario().root {
            return ptr::null_mut();
        }
        state.screen_resources()
    }

    fn get_screen_resources_current(&self, window: Window) -> *mut XRRScreenResources {
        let mut state = self.request("XRRGetScreenResourcesCurrent");
        if window != state.scenario().root {
            return ptr::null_mut();
        }
        state.screen_resources()
    }

    unsafe fn free_screen_resources(&self, resources: *mut XRRScreenResources) {
        self.0
            .borrow_mut()
            .release(resources as *const c_void, "screen resources");
    }

    unsafe fn get_output_info(&self, _resources: *mut XRRScreenResources, output: RROutput) -> *mut XRROutputInfo {
        let mut state = self.request("XRRGetOutputInfo");
        let found = state.scenario().outputs.iter().find(|o| o.id == output).cloned();
        let out = match found {
            Some(out) => out,
            None => return ptr::null_mut(),
        };
        let timestamp = state.scenario().timestamp;
        let name = CString::new(out.name).expect("output names have no NUL");
        let mut lists = [out.crtcs.clone(), out.clones.clone(), out.modes.clone()];
        let mut raw = Box::new(XRROutputInfo {
            timestamp,
            crtc: out.crtc,
            name: name.as_ptr() as *mut c_char,
            nameLen: out.name.len() as c_int,
            mm_width: out.mm_width as c_ulong,
            mm_height: out.mm_height as c_ulong,
            connection: out.connection,
            subpixel_order: out.subpixel_order,
            ncrtc: lists[0].len() as c_int,
            crtcs: lists[0].as_mut_ptr(),
            nclone: lists[1].len() as c_int,
            clones: lists[1].as_mut_ptr(),
            nmode: lists[2].len() as c_int,
            npreferred: out.npreferred,
            modes: lists[2].as_mut_ptr(),
        });
        let ptr: *mut XRROutputInfo = &mut *raw;
        state.track(
            ptr as *const c_void,
            Allocation::OutputInfo {
                _raw: raw,
                _name: name,
                _lists: lists,
            },
        );
        ptr
    }

    unsafe fn free_output_info(&self, info: *mut XRROutputInfo) {
        self.0.borrow_mut().release(info as *const c_void, "output info");
    }

    unsafe fn get_crtc_info(&self, _resources: *mut XRRScreenResources, crtc: RRCrtc) -> *mut XRRCrtcInfo {
        let mut state = self.request("XRRGetCrtcInfo");
        let found = state.scenario().crtcs.iter().find(|c| c.id == crtc).cloned();
        let info = match found {
            Some(info) => info,
            None => return ptr::null_mut(),
        };
        let timestamp = state.scenario().timestamp;
        let mut lists = [info.outputs.clone(), info.possible.clone()];
        let mut raw = Box::new(XRRCrtcInfo {
            timestamp,
            x: info.x,
            y: info.y,
            width: info.width,
            height: info.height,
            mode: info.mode,
            rotation: info.rotation,
            noutput: lists[0].len() as c_int,
            outputs: lists[0].as_mut_ptr(),
            rotations: info.rotations,
            npossible: lists[1].len() as c_int,
            possible: lists[1].as_mut_ptr(),
        });
        let ptr: *mut XRRCrtcInfo = &mut *raw;
        state.track(
            ptr as *const c_void,
            Allocation::CrtcInfo {
                _raw: raw,
                _lists: lists,
            },
        );
        ptr
    }

    unsafe fn free_crtc_info(&self, info: *mut XRRCrtcInfo) {
        self.0.borrow_mut().release(info as *const c_void, "crtc info");
    }

    unsafe fn set_crtc_config(
        &self,
        resources: *mut XRRScreenResources,
        crtc: RRCrtc,
        config: RawCrtcConfig,
        outputs: &mut [RROutput],
    ) -> Status {
        let mut state = self.request("XRRSetCrtcConfig");
        assert!(
            state.live.contains_key(&(resources as usize)),
            "XRRSetCrtcConfig with released screen resources"
        );
        state.crtc_requests.push(CrtcRequest {
            crtc,
            config,
            outputs: outputs.to_vec(),
        });
        let scenario = state.scenario_mut();
        if config.timestamp != 0 && config.timestamp < scenario.timestamp {
            return 2;
        }
        let (width, height) = match scenario.modes.iter().find(|m| m.id == config.mode) {
            Some(mode) => (mode.width, mode.height),
            None if config.mode == 0 => (0, 0),
            None => return 3,
        };
        let target = match scenario.crtcs.iter_mut().find(|c| c.id == crtc) {
            Some(target) => target,
            None => return 3,
        };
        target.x = config.x;
        target.y = config.y;
        target.width = width;
        target.height = height;
        target.mode = config.mode;
        target.rotation = config.rotation;
        target.outputs = outputs.to_vec();
        0
    }

    fn get_output_primary(&self, window: Window) -> RROutput {
        let state = self.request("XRRGetOutputPrimary");
        if window == state.scenario().root {
            state.scenario().primary
        } else {
            0
        }
    }

    fn set_output_primary(&self, window: Window, output: RROutput) {
        let mut state = self.request("XRRSetOutputPrimary");
        if window == state.scenario().root {
            state.scenario_mut().primary = output;
        }
    }

    fn get_screen_info(&self, window: Window) -> *mut XRRScreenConfiguration {
        let mut state = self.request("XRRGetScreenInfo");
        if window != state.scenario().root {
            return ptr::null_mut();
        }
        let mut config = Box::new(state.scenario().screen.clone());
        let ptr: *mut FakeScreenConfig = &mut *config;
        state.track(ptr as *const c_void, Allocation::ScreenConfig(config));
        ptr as *mut XRRScreenConfiguration
    }

    unsafe fn free_screen_config_info(&self, config: *mut XRRScreenConfiguration) {
        self.0
            .borrow_mut()
            .release(config as *const c_void, "screen config");
    }

    unsafe fn config_rotations(&self, config: *mut XRRScreenConfiguration) -> (RawRotation, RawRotation) {
        let config = &*(config as *const FakeScreenConfig);
        (config.rotations, config.rotation)
    }

    unsafe fn config_times(&self, config: *mut XRRScreenConfiguration) -> (Time, Time) {
        let config = &*(config as *const FakeScreenConfig);
        (config.timestamp, config.config_timestamp)
    }

    unsafe fn config_sizes(&self, config: *mut XRRScreenConfiguration) -> Vec<XRRScreenSize> {
        (*(config as *const FakeScreenConfig)).sizes.clone()
    }

    unsafe fn config_rates(&self, config: *mut XRRScreenConfiguration, size_index: c_int) -> Vec<c_short> {
        let config = &*(config as *const FakeScreenConfig);
        if size_index < 0 {
            return Vec::new();
        }
        config
            .rates
            .get(size_index as usize)
            .cloned()
            .unwrap_or_default()
    }

    unsafe fn config_current_configuration(&self, config: *mut XRRScreenConfiguration) -> (SizeID, RawRotation) {
        let config = &*(config as *const FakeScreenConfig);
        (config.size_index, config.rotation)
    }

    unsafe fn config_current_rate(&self, config: *mut XRRScreenConfiguration) -> c_short {
        (*(config as *const FakeScreenConfig)).rate
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
        let mut state = self.request(if rate.is_some() {
            "XRRSetScreenConfigAndRate"
        } else {
            "XRRSetScreenConfig"
        });
        assert!(
            state.live.contains_key(&(config as usize)),
            "XRRSetScreenConfig with a released configuration"
        );
        state.screen_requests.push(ScreenRequest {
            drawable,
            size_index,
            rotation,
            rate,
            timestamp,
        });
        let screen = &mut state.scenario_mut().screen;
        if timestamp != 0 && timestamp < screen.timestamp {
            return 2;
        }
        if size_index < 0 || size_index as usize >= screen.sizes.len() {
            return 3;
        }
        screen.size_index = size_index as SizeID;
        screen.rotation = rotation;
        if let Some(rate) = rate {
            screen.rate = rate;
        }
        0
    }

    fn list_output_properties(&self, output: RROutput) -> (*mut Atom, c_int) {
        let mut state = self.request("XRRListOutputProperties");
        let atoms: Box<[Atom]> = state
            .scenario()
            .properties
            .iter()
            .filter(|p| p.output == output)
            .map(|p| p.atom)
            .collect();
        if atoms.is_empty() {
            return (ptr::null_mut(), 0);
        }
        let len = atoms.len() as c_int;
        let ptr = atoms.as_ptr() as *mut Atom;
        state.track(ptr as *const c_void, Allocation::Atoms(atoms));
        (ptr, len)
    }

    fn query_output_property(&self, output: RROutput, property: Atom) -> *mut XRRPropertyInfo {
        let mut state = self.request("XRRQueryOutputProperty");
        let prop = match state.property_mut(output, property) {
            Some(prop) => prop.clone(),
            None => return ptr::null_mut(),
        };
        let mut values = prop.values.clone();
        let mut raw = Box::new(XRRPropertyInfo {
            pending: prop.pending as c_int,
            range: prop.range as c_int,
            immutable: prop.immutable as c_int,
            num_values: values.len() as c_int,
            values: values.as_mut_ptr(),
        });
        let ptr: *mut XRRPropertyInfo = &mut *raw;
        state.track(
            ptr as *const c_void,
            Allocation::PropertyInfo {
                _raw: raw,
                _values: values,
            },
        );
        ptr
    }

    fn configure_output_property(&self, output: RROutput, property: Atom, pending: bool, range: bool, values: &mut [c_long]) {
        let mut state = self.request("XRRConfigureOutputProperty");
        match state.property_mut(output, property) {
            Some(prop) => {
                prop.pending = pending;
                prop.range = range;
                prop.values = values.to_vec();
            }
            None => state.scenario_mut().properties.push(FakeProperty {
                output,
                atom: property,
                type_: 0,
                format: 0,
                data: vec![],
                pending,
                range,
                immutable: false,
                values: values.to_vec(),
            }),
        }
    }

    fn change_output_property(&self, output: RROutput, property: Atom, type_: Atom, format: c_int, mode: c_int, data: &[u8]) {
        let mut state = self.request("XRRChangeOutputProperty");
        match state.property_mut(output, property) {
            Some(prop) => {
                match mode {
                    1 if prop.type_ == type_ => {
                        let mut combined = data.to_vec();
                        combined.extend_from_slice(&prop.data);
                        prop.data = combined;
                    }
                    2 if prop.type_ == type_ => prop.data.extend_from_slice(data),
                    _ => prop.data = data.to_vec(),
                }
                prop.type_ = type_;
                prop.format = format;
            }
            None => state.scenario_mut().properties.push(FakeProperty {
                output,
                atom: property,
                type_,
                format,
                data: data.to_vec(),
                pending: false,
                range: false,
                immutable: false,
                values: vec![],
            }),
        }
    }

    fn get_output_property(
        &self,
        output: RROutput,
        property: Atom,
        offset: c_long,
        length: c_long,
        delete: bool,
        _pending: bool,
        req_type: Atom,
    ) -> RawPropertyReply {
        let mut state = self.request("XRRGetOutputProperty");
        let mut reply = RawPropertyReply {
            status: 0,
            actual_type: 0,
            actual_format: 0,
            nitems: 0,
            bytes_after: 0,
            data: ptr::null_mut(),
        };
        let prop = match state.property_mut(output, property) {
            Some(prop) if prop.type_ != 0 => prop.clone(),
            _ => return reply,
        };
        reply.actual_type = prop.type_;
        reply.actual_format = prop.format;

        let unit = (prop.format / 8).max(1) as usize;
        let total = prop.data.len();
        let mut bytes: Vec<u8> = Vec::new();
        if req_type != 0 && req_type != prop.type_ {
            reply.bytes_after = total as c_ulong;
        } else {
            let start = (offset.max(0) as usize) * 4;
            if start > total {
                // BadValue
                reply.status = 2;
                reply.actual_type = 0;
                reply.actual_format = 0;
                return reply;
            }
            let len = (total - start).min(length.max(0) as usize * 4);
            bytes.extend_from_slice(&prop.data[start..start + len]);
            reply.nitems = (len / unit) as c_ulong;
            reply.bytes_after = (total - start - len) as c_ulong;
            if delete && reply.bytes_after == 0 {
                state
                    .scenario_mut()
                    .properties
                    .retain(|p| !(p.output == output && p.atom == property));
            }
        }

        // Xlib always appends a terminator, so data is non-null whenever a type came back.
        bytes.push(0);
        let bytes = bytes.into_boxed_slice();
        reply.data = bytes.as_ptr() as *mut u8;
        state.track(reply.data as *const c_void, Allocation::Bytes(bytes));
        reply
    }

    fn delete_output_property(&self, output: RROutput, property: Atom) {
        self.request("XRRDeleteOutputProperty")
            .scenario_mut()
            .properties
            .retain(|p| !(p.output == output && p.atom == property));
    }

    unsafe fn free(&self, data: *mut c_void) {
        self.0.borrow_mut().release(data, "xfree");
    }
}
