//! Atom interning and the well-known output property names.

use crate::{
    conn::Connection,
    error::{Error, Result},
    handle::{Handle, NativeResource},
    native::{self, Atom, Backend, Status},
    value::Value,
};

use {
    log::trace,
    std::{ffi::CString, os::raw::c_char, ptr, rc::Rc},
};

/// Output property names defined by the RandR protocol.
pub mod rr_output {
    pub const BACKLIGHT: &str = "Backlight";
    pub const RANDR_EDID: &str = "EDID";
    pub const SIGNAL_FORMAT: &str = "SignalFormat";
    pub const SIGNAL_PROPERTIES: &str = "SignalProperties";
    pub const CONNECTOR_TYPE: &str = "ConnectorType";
    pub const CONNECTOR_NUMBER: &str = "ConnectorNumber";
    pub const COMPATIBILITY_LIST: &str = "CompatibilityList";
    pub const CLONE_LIST: &str = "CloneList";
    pub const BORDER: &str = "Border";
    pub const BORDER_DIMENSIONS: &str = "BorderDimensions";
    pub const GUID: &str = "GUID";
    pub const RANDR_TILE: &str = "TILE";
    pub const NON_DESKTOP: &str = "non-desktop";

    /// `(constant name, atom name)` for every entry above.
    pub const ALL: [(&str, &str); 13] = [
        ("BACKLIGHT", BACKLIGHT),
        ("RANDR_EDID", RANDR_EDID),
        ("SIGNAL_FORMAT", SIGNAL_FORMAT),
        ("SIGNAL_PROPERTIES", SIGNAL_PROPERTIES),
        ("CONNECTOR_TYPE", CONNECTOR_TYPE),
        ("CONNECTOR_NUMBER", CONNECTOR_NUMBER),
        ("COMPATIBILITY_LIST", COMPATIBILITY_LIST),
        ("CLONE_LIST", CLONE_LIST),
        ("BORDER", BORDER),
        ("BORDER_DIMENSIONS", BORDER_DIMENSIONS),
        ("GUID", GUID),
        ("RANDR_TILE", RANDR_TILE),
        ("NON_DESKTOP", NON_DESKTOP),
    ];
}

enum AtomNameKind {}

impl NativeResource for AtomNameKind {
    type Raw = c_char;
    const KIND: &'static str = "atom";

    unsafe fn release(backend: &dyn Backend, raw: *mut c_char) {
        backend.free(raw as *mut _)
    }
}

impl Connection {
    /// `0` when `only_if_exists` is set and the name was never interned.
    pub fn intern_atom(&self, name: &str, only_if_exists: bool) -> Result<Atom> {
        let name = native::c_string(name.as_bytes())?;
        Ok(self.native()?.intern_atom(&name, only_if_exists))
    }

    /// Interns every name in one round trip. The status is non-zero when all
    /// atoms were returned.
    pub fn intern_atoms(&self, names: &[Value], only_if_exists: bool) -> Result<(Status, Vec<Atom>)> {
        let names = names
            .iter()
            .enumerate()
            .map(|(i, value)| match value.as_bytes() {
                Some(bytes) => native::c_string(bytes),
                None => Err(Error::InvalidArgument {
                    index: i + 1,
                    expected: "string",
                    actual: value.kind(),
                }),
            })
            .collect::<Result<Vec<CString>>>()?;
        let native = self.native()?;
        // Xlib takes `char **` but does not write through it.
        let mut pointers: Vec<*mut c_char> = names.iter().map(|n| n.as_ptr() as *mut c_char).collect();
        let mut atoms = vec![0; names.len()];
        let status = native.intern_atoms(&mut pointers, only_if_exists, &mut atoms);
        Ok((status, atoms))
    }

    pub fn get_atom_name(self: &Rc<Self>, atom: Atom) -> Result<Vec<u8>> {
        let raw = self.native()?.get_atom_name(atom);
        let name = Handle::<AtomNameKind>::acquire(self, raw, atom)?;
        Ok(unsafe { native::raw_c_string(name.as_ptr()) })
    }

    /// Looks up several names at once. Atoms the server does not know come
    /// back as empty names and a zero status.
    pub fn get_atom_names(self: &Rc<Self>, atoms: &[Value]) -> Result<(Status, Vec<Vec<u8>>)> {
        let mut ids = atoms
            .iter()
            .enumerate()
            .map(|(i, value)| match value.as_integer() {
                Some(atom) if atom >= 0 => Ok(atom as Atom),
                Some(_) => Err(Error::InvalidArgument {
                    index: i + 1,
                    expected: "non-negative integer",
                    actual: "negative integer",
                }),
                None => Err(Error::InvalidArgument {
                    index: i + 1,
                    expected: "integer",
                    actual: value.kind(),
                }),
            })
            .collect::<Result<Vec<Atom>>>()?;
        let native = self.native()?;
        let mut raw_names: Vec<*mut c_char> = vec![ptr::null_mut(); ids.len()];
        let status = native.get_atom_names(&mut ids, &mut raw_names);
        // Take ownership of every returned string before copying any of them.
        let owned: Vec<_> = raw_names
            .into_iter()
            .map(|raw| Handle::<AtomNameKind>::adopt(self, raw))
            .collect();
        trace!("resolved {} atom names, status {}", owned.len(), status);
        let names = owned
            .iter()
            .map(|name| match name {
                Some(name) => unsafe { native::raw_c_string(name.as_ptr()) },
                None => Vec::new(),
            })
            .collect();
        Ok((status, names))
    }
}
