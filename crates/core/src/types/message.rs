//! Protobuf encoding of protocol messages
//!
//! Messages are stored in the CAS under the digest of their encoded bytes.
//! prost emits fields in tag order, so the encoding of a message without map
//! fields is deterministic.

use crate::errors::{Error, Result};
pub use prost_types::Any;

/// A protocol message that can be stored in the CAS or packed into an [`Any`]
pub trait ProtoMessage: prost::Message + prost::Name + Default + Sized {
    fn to_bytes(&self) -> Vec<u8> {
        prost::Message::encode_to_vec(self)
    }

    fn from_bytes(data: &[u8]) -> Result<Self> {
        <Self as prost::Message>::decode(data).map_err(|e| Error::decode(Self::full_name(), e.to_string()))
    }

    fn to_any(&self) -> Any {
        Any {
            type_url: Self::type_url(),
            value: self.to_bytes(),
        }
    }

    /// Decode `any`, rejecting payloads of a different type
    fn from_any(any: &Any) -> Result<Self> {
        any.to_msg::<Self>()
            .map_err(|e| Error::decode(Self::full_name(), e.to_string()))
    }
}

impl<M> ProtoMessage for M where M: prost::Message + prost::Name + Default {}

/// Declare the fully qualified protobuf name of a message
macro_rules! proto_name {
    ($package:expr => $($ty:ident),+ $(,)?) => {
        $(
            impl prost::Name for $ty {
                const NAME: &'static str = stringify!($ty);
                const PACKAGE: &'static str = $package;
            }
        )+
    };
}

pub(crate) use proto_name;

pub(crate) const REAPI_PACKAGE: &str = "build.bazel.remote.execution.v2";
