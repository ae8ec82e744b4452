//! Uniform access to every handle kind for callers that only know field names.

use crate::{
    crtc::{CrtcField, CrtcInfo},
    output::{OutputField, OutputInfo},
    screen::{ScreenConfigField, ScreenConfiguration},
    screen_resources::{ScreenResources, ScreenResourcesField},
    value::{Record, Value},
};

#[derive(Debug)]
pub enum Resource {
    ScreenResources(ScreenResources),
    OutputInfo(OutputInfo),
    CrtcInfo(CrtcInfo),
    ScreenConfiguration(ScreenConfiguration),
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::ScreenResources(_) => "ScreenResources",
            Resource::OutputInfo(_) => "OutputInfo",
            Resource::CrtcInfo(_) => "CrtcInfo",
            Resource::ScreenConfiguration(_) => "ScreenConfiguration",
        }
    }

    /// Names this kind of resource answers to, in projection order.
    pub fn field_names(&self) -> Vec<&'static str> {
        match self {
            Resource::ScreenResources(_) => ScreenResourcesField::ALL.iter().map(|f| f.name()).collect(),
            Resource::OutputInfo(_) => OutputField::ALL.iter().map(|f| f.name()).collect(),
            Resource::CrtcInfo(_) => CrtcField::ALL.iter().map(|f| f.name()).collect(),
            Resource::ScreenConfiguration(_) => ScreenConfigField::ALL.iter().map(|f| f.name()).collect(),
        }
    }

    /// Projects a field by name. Names the resource does not have give `Nil`.
    pub fn project_named(&self, name: &str) -> Value {
        let value = match self {
            Resource::ScreenResources(r) => ScreenResourcesField::from_name(name).map(|f| r.project(f)),
            Resource::OutputInfo(r) => OutputField::from_name(name).map(|f| r.project(f)),
            Resource::CrtcInfo(r) => CrtcField::from_name(name).map(|f| r.project(f)),
            Resource::ScreenConfiguration(r) => ScreenConfigField::from_name(name).map(|f| r.project(f)),
        };
        value.unwrap_or(Value::Nil)
    }

    pub fn to_record(&self) -> Record {
        match self {
            Resource::ScreenResources(r) => r.to_record(),
            Resource::OutputInfo(r) => r.to_record(),
            Resource::CrtcInfo(r) => r.to_record(),
            Resource::ScreenConfiguration(r) => r.to_record(),
        }
    }

    /// Frees the underlying allocation now.
    pub fn release(self) {
        match self {
            Resource::ScreenResources(r) => r.release(),
            Resource::OutputInfo(r) => r.release(),
            Resource::CrtcInfo(r) => r.release(),
            Resource::ScreenConfiguration(r) => r.release(),
        }
    }
}

impl From<ScreenResources> for Resource {
    fn from(r: ScreenResources) -> Self {
        Resource::ScreenResources(r)
    }
}

impl From<OutputInfo> for Resource {
    fn from(r: OutputInfo) -> Self {
        Resource::OutputInfo(r)
    }
}

impl From<CrtcInfo> for Resource {
    fn from(r: CrtcInfo) -> Self {
        Resource::CrtcInfo(r)
    }
}

impl From<ScreenConfiguration> for Resource {
    fn from(r: ScreenConfiguration) -> Self {
        Resource::ScreenConfiguration(r)
    }
}
