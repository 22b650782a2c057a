use super::serialize_u_int::SerializeUnsignedInt;
use serde::Serializer;

pub(crate) fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: std::fmt::LowerHex + SerializeUnsignedInt,
{
    if serializer.is_human_readable() {
        serializer.serialize_str(format!("{:#x}", value).as_str())
    } else {
        value.serialize_int(serializer)
    }
}
