//! Output properties: metadata queries and the two-phase value protocol.
//!
//! A value of unknown length is read by first asking for zero units, which
//! reports how many bytes remain, and then asking for the whole range.
//! Offsets and lengths are counted in 32-bit units, as on the wire.

use crate::{
    codec::ChangeMode,
    conn::Connection,
    error::{Error, Result},
    handle::{Handle, NativeResource, XFreed},
    native::{self, Atom, Backend, RROutput, XRRPropertyInfo, XA_STRING},
    value::{Record, Value},
};

use {
    log::{debug, trace},
    std::{
        mem,
        os::raw::{c_long, c_short},
        rc::Rc,
        slice,
    },
};

enum PropertyInfoKind {}

impl NativeResource for PropertyInfoKind {
    type Raw = XRRPropertyInfo;
    const KIND: &'static str = "property";

    unsafe fn release(backend: &dyn Backend, raw: *mut XRRPropertyInfo) {
        backend.free(raw as *mut _)
    }
}

/// Metadata describing which values a property accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    pub pending: bool,
    /// When set, `values` holds exactly `[min, max]`.
    pub range: bool,
    pub immutable: bool,
    pub values: Vec<i64>,
}

impl PropertyInfo {
    pub fn to_record(&self) -> Record {
        Record::with_capacity(4)
            .field("pending", self.pending)
            .field("range", self.range)
            .field("immutable", self.immutable)
            .field("values", Value::integers(self.values.iter().copied()))
    }
}

/// One read of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyRequest {
    /// In 32-bit units.
    pub offset: i64,
    /// In 32-bit units.
    pub length: i64,
    /// Delete the property once the read reaches its end.
    pub delete: bool,
    /// Read the pending value instead of the current one.
    pub pending: bool,
}

impl PropertyRequest {
    /// Reads nothing; the reply only reports the value's size.
    pub fn probe() -> Self {
        PropertyRequest {
            offset: 0,
            length: 0,
            delete: false,
            pending: false,
        }
    }

    pub fn range(offset: i64, length: i64) -> Self {
        PropertyRequest {
            offset,
            length,
            ..Self::probe()
        }
    }
}

/// The bytes returned by one read, plus what is left after them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue {
    pub bytes: Vec<u8>,
    /// Number of `format`-bit items in `bytes`.
    pub item_count: u64,
    pub format: i32,
    pub actual_type: Atom,
    pub bytes_remaining: u64,
}

impl PropertyValue {
    pub fn to_record(&self) -> Record {
        Record::with_capacity(5)
            .field("data", Value::string(&self.bytes))
            .field("nitems", self.item_count)
            .field("format", self.format)
            .field("type", self.actual_type)
            .field("bytesRemaining", self.bytes_remaining)
    }
}

/// Size in client memory of one item of a `format`-bit property. Xlib widens
/// 16 and 32-bit items to `short` and `long`.
fn item_size(format: i32) -> usize {
    match format {
        16 => mem::size_of::<c_short>(),
        32 => mem::size_of::<c_long>(),
        _ => 1,
    }
}

/// 32-bit units needed to cover `bytes`.
fn units_for(bytes: u64) -> i64 {
    ((bytes + 3) / 4) as i64
}

impl Connection {
    pub fn list_output_properties(self: &Rc<Self>, output: RROutput) -> Result<Vec<Atom>> {
        let (atoms, count) = self.native()?.list_output_properties(output);
        let atoms = match Handle::<XFreed<Atom>>::adopt(self, atoms) {
            Some(atoms) => atoms,
            None => return Ok(Vec::new()),
        };
        let list = unsafe { native::raw_slice(atoms.as_ptr(), count) }.to_vec();
        trace!("output {} has {} properties", output, list.len());
        Ok(list)
    }

    pub fn query_output_property(
        self: &Rc<Self>,
        output: RROutput,
        property: Atom,
    ) -> Result<PropertyInfo> {
        let raw = self.native()?.query_output_property(output, property);
        let info = Handle::<PropertyInfoKind>::acquire(self, raw, property)?;
        let raw = info.raw();
        Ok(PropertyInfo {
            pending: raw.pending != 0,
            range: raw.range != 0,
            immutable: raw.immutable != 0,
            values: unsafe { native::raw_slice(raw.values, raw.num_values) }
                .iter()
                .map(|v| i64::from(*v))
                .collect(),
        })
    }

    pub fn configure_output_property(
        &self,
        output: RROutput,
        property: Atom,
        pending: bool,
        range: bool,
        values: &[i64],
    ) -> Result<()> {
        let native = self.native()?;
        let mut values: Vec<c_long> = values.iter().map(|v| *v as c_long).collect();
        native.configure_output_property(output, property, pending, range, &mut values);
        Ok(())
    }

    /// Replaces or extends a `STRING` property with `data`.
    pub fn change_output_property(
        &self,
        output: RROutput,
        property: Atom,
        mode: ChangeMode,
        data: &[u8],
    ) -> Result<()> {
        self.change_output_property_as(output, property, XA_STRING, mode, data)
    }

    /// Like [`change_output_property`](Connection::change_output_property)
    /// with an explicit type. Only `STRING` is supported.
    pub fn change_output_property_as(
        &self,
        output: RROutput,
        property: Atom,
        type_: Atom,
        mode: ChangeMode,
        data: &[u8],
    ) -> Result<()> {
        if type_ != XA_STRING {
            return Err(Error::TypeMismatch {
                atom: property,
                actual: type_,
            });
        }
        debug!(
            "changing property {} of output {} ({:?}, {} bytes)",
            property,
            output,
            mode,
            data.len()
        );
        self.native()?
            .change_output_property(output, property, type_, 8, mode.to_native(), data);
        Ok(())
    }

    /// One read of a `STRING` property.
    ///
    /// `None` when the property does not exist. A property of another type
    /// fails with `TypeMismatch`.
    pub fn get_output_property(
        self: &Rc<Self>,
        output: RROutput,
        property: Atom,
        request: PropertyRequest,
    ) -> Result<Option<PropertyValue>> {
        let reply = self.native()?.get_output_property(
            output,
            property,
            request.offset as c_long,
            request.length as c_long,
            request.delete,
            request.pending,
            XA_STRING,
        );
        // Owned before anything else so every path below releases it.
        let data = Handle::<XFreed<u8>>::adopt(self, reply.data);

        if reply.status != 0 {
            return Err(Error::not_found("property", property));
        }
        if reply.actual_type == native::NONE {
            trace!("output {} has no property {}", output, property);
            return Ok(None);
        }
        if reply.actual_type != XA_STRING {
            return Err(Error::TypeMismatch {
                atom: property,
                actual: reply.actual_type,
            });
        }

        let len = reply.nitems as usize * item_size(reply.actual_format);
        let bytes = match &data {
            Some(data) if len > 0 => unsafe { slice::from_raw_parts(data.as_ptr(), len) }.to_vec(),
            _ => Vec::new(),
        };
        Ok(Some(PropertyValue {
            bytes,
            item_count: u64::from(reply.nitems),
            format: reply.actual_format,
            actual_type: reply.actual_type,
            bytes_remaining: u64::from(reply.bytes_after),
        }))
    }

    /// Reads a whole `STRING` value: probes for its size, then fetches it.
    pub fn read_output_property(
        self: &Rc<Self>,
        output: RROutput,
        property: Atom,
        pending: bool,
    ) -> Result<Option<PropertyValue>> {
        let probe = PropertyRequest {
            pending,
            ..PropertyRequest::probe()
        };
        let size = match self.get_output_property(output, property, probe)? {
            Some(probe) => probe.bytes_remaining,
            None => return Ok(None),
        };
        let fetch = PropertyRequest {
            pending,
            ..PropertyRequest::range(0, units_for(size))
        };
        self.get_output_property(output, property, fetch)
    }

    pub fn delete_output_property(&self, output: RROutput, property: Atom) -> Result<()> {
        debug!("deleting property {} of output {}", property, output);
        self.native()?.delete_output_property(output, property);
        Ok(())
    }
}
